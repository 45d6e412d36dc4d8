//! Exclusive-ownership wrappers (`std::unique_ptr`).
//!
//! No wrapper handle is synthesized: the element handle itself crosses the
//! boundary and ownership moves with it. A parameter hands the object to the
//! callee; a return releases it to the caller, who must `_destroy` it.

use anyhow::{Result, bail};

use super::{BoundParam, CustomTypeHandler, qualified_template, wrapped_element};
use crate::convert::method::{AuxDefinition, FunctionBuilder};
use crate::descriptor::TypeDescriptor;

#[derive(Debug, Clone)]
pub struct UniqueHandle {
    namespace: String,
    name: String,
}

impl UniqueHandle {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl CustomTypeHandler for UniqueHandle {
    fn matches(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor.template_name() == Some(self.name.as_str())
    }

    fn add_as_parameter(
        &self,
        name: &str,
        descriptor: &TypeDescriptor,
        out: &mut FunctionBuilder,
    ) -> Result<BoundParam> {
        if descriptor.is_reference() {
            bail!("`{}` passed by reference cannot transfer ownership", self.name);
        }
        let element = wrapped_element(descriptor, &self.name)?;
        out.add_auxiliary(
            element.handle_name(),
            AuxDefinition::declaration(element.auxiliary_declaration()),
        );
        // The owner is rebuilt from a mutable element pointer even for a
        // `const unique_ptr<T>` parameter; only the owner itself is const.
        Ok(BoundParam {
            declaration: element.declaration_with_name(name),
            argument: format!(
                "{}<{cast}>(reinterpret_cast<{cast}*>({name}))",
                qualified_template(&self.namespace, &self.name),
                cast = element.qualified_cast()
            ),
        })
    }

    fn add_as_return_type(
        &self,
        descriptor: &TypeDescriptor,
        out: &mut FunctionBuilder,
    ) -> Result<()> {
        if descriptor.is_reference() {
            bail!("`{}` returned by reference cannot transfer ownership", self.name);
        }
        let element = wrapped_element(descriptor, &self.name)?;
        out.add_auxiliary(
            element.handle_name(),
            AuxDefinition::declaration(element.auxiliary_declaration()),
        );
        let return_type = element.target_spelling();
        out.wrap(format!("reinterpret_cast<{return_type}>("), ")");
        out.wrap("", ".release()");
        out.return_type = return_type;
        Ok(())
    }
}
