//! Custom type handlers: bespoke representations for smart-handle templates.
//!
//! Handlers are consulted before the generic conversion rules. A template
//! instance is only supported when some registered handler claims it.

use std::fmt::Debug;

use anyhow::{Result, bail};

use crate::convert::method::FunctionBuilder;
use crate::descriptor::TypeDescriptor;

mod shared;
mod unique;

pub use shared::SharedHandle;
pub use unique::UniqueHandle;

/// A parameter as it appears in the generated prototype and in the
/// forwarding call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParam {
    /// `WFoo_shared_ptr* foo`
    pub declaration: String,
    /// `*reinterpret_cast<std::shared_ptr<ns::Foo>*>(foo)`
    pub argument: String,
}

/// Extension point for template instances that need their own C shape.
pub trait CustomTypeHandler: Debug {
    /// `true` if this handler owns the given template instance.
    fn matches(&self, descriptor: &TypeDescriptor) -> bool;

    /// Bind a parameter of the handled type, registering any auxiliary
    /// definitions on `out`.
    fn add_as_parameter(
        &self,
        name: &str,
        descriptor: &TypeDescriptor,
        out: &mut FunctionBuilder,
    ) -> Result<BoundParam>;

    /// Set the return type on `out` and wrap the forwarded call.
    fn add_as_return_type(&self, descriptor: &TypeDescriptor, out: &mut FunctionBuilder)
    -> Result<()>;
}

/// Ordered list of handlers; the first match wins.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn CustomTypeHandler>>,
}

impl HandlerRegistry {
    /// `std::shared_ptr` and `std::unique_ptr`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(SharedHandle::new("std", "shared_ptr")));
        registry.register(Box::new(UniqueHandle::new("std", "unique_ptr")));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn CustomTypeHandler>) {
        self.handlers.push(handler);
    }

    pub fn find(&self, descriptor: &TypeDescriptor) -> Option<&dyn CustomTypeHandler> {
        if !descriptor.is_template_instance() {
            return None;
        }
        self.handlers
            .iter()
            .find(|h| h.matches(descriptor))
            .map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The element a smart handle wraps. Only allow-listed classes held by value
/// can cross the boundary inside a wrapper.
fn wrapped_element<'d>(descriptor: &'d TypeDescriptor, wrapper: &str) -> Result<&'d TypeDescriptor> {
    let Some(element) = descriptor.template_arguments().first() else {
        bail!("`{wrapper}` instance without an element type");
    };
    if !element.is_by_value_record() || element.cast_spelling().is_empty() {
        bail!(
            "`{wrapper}` element `{}` is not an allow-listed class",
            element.target_spelling()
        );
    }
    Ok(element)
}

/// `ns::name`, or just `name` for wrappers at global scope.
fn qualified_template(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}::{name}")
    }
}
