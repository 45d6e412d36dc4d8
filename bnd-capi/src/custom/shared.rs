//! Reference-counted wrappers (`std::shared_ptr`, `android::sp`, `sk_sp` …).
//!
//! The wrapper object itself crosses the boundary behind a synthesized handle
//! `<Elem>_<name>`. Returning one heap-allocates a copy of the wrapper (one
//! extra reference owned by the caller), `_get` borrows the element and
//! `_delete` drops the caller's reference.

use anyhow::Result;

use super::{BoundParam, CustomTypeHandler, qualified_template, wrapped_element};
use crate::convert::method::{AuxDefinition, FunctionBuilder};
use crate::descriptor::TypeDescriptor;

#[derive(Debug, Clone)]
pub struct SharedHandle {
    namespace: String,
    name: String,
}

impl SharedHandle {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `ns::shared_ptr<ns::Foo>`
    fn wrapper_type(&self, element: &TypeDescriptor) -> String {
        format!(
            "{}<{}>",
            qualified_template(&self.namespace, &self.name),
            element.qualified_cast()
        )
    }

    /// `WFoo_shared_ptr`
    fn synthesized_name(&self, element: &TypeDescriptor) -> String {
        format!("{}_{}", element.handle_name(), self.name)
    }

    fn register_definitions(&self, element: &TypeDescriptor, out: &mut FunctionBuilder) {
        let handle = self.synthesized_name(element);
        let elem = element.target_spelling();
        let wrapper = self.wrapper_type(element);

        out.add_auxiliary(element.handle_name(), AuxDefinition::declaration(element.auxiliary_declaration()));

        let declaration = format!(
            "struct {handle};\n\
             typedef struct {handle} {handle};\n\
             {elem} {handle}_get({handle}* self);\n\
             void {handle}_delete({handle}* self);\n"
        );
        let implementation = format!(
            "{elem} {handle}_get({handle}* self) {{\n    \
             return reinterpret_cast<{elem}>(reinterpret_cast<{wrapper}*>(self)->get());\n\
             }}\n\
             void {handle}_delete({handle}* self) {{\n    \
             delete reinterpret_cast<{wrapper}*>(self);\n\
             }}\n"
        );
        out.add_auxiliary(
            &handle,
            AuxDefinition {
                declaration,
                implementation,
            },
        );
    }
}

impl CustomTypeHandler for SharedHandle {
    fn matches(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor.template_name() == Some(self.name.as_str())
    }

    fn add_as_parameter(
        &self,
        name: &str,
        descriptor: &TypeDescriptor,
        out: &mut FunctionBuilder,
    ) -> Result<BoundParam> {
        let element = wrapped_element(descriptor, &self.name)?;
        let handle = self.synthesized_name(element);
        let constness = if descriptor.is_const() { "const " } else { "" };
        self.register_definitions(element, out);
        Ok(BoundParam {
            declaration: format!("{constness}{handle}* {name}"),
            argument: format!(
                "*reinterpret_cast<{constness}{}*>({name})",
                self.wrapper_type(element)
            ),
        })
    }

    fn add_as_return_type(
        &self,
        descriptor: &TypeDescriptor,
        out: &mut FunctionBuilder,
    ) -> Result<()> {
        let element = wrapped_element(descriptor, &self.name)?;
        let return_type = format!("{}*", self.synthesized_name(element));
        out.wrap(format!("reinterpret_cast<{return_type}>("), ")");
        out.wrap(format!("new {}(", self.wrapper_type(element)), ")");
        out.return_type = return_type;
        self.register_definitions(element, out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allow_list::AllowList;
    use crate::convert::types::TypeConverter;
    use crate::custom::HandlerRegistry;
    use crate::model::HostType;

    fn shared_bar(allow: &AllowList, handlers: &HandlerRegistry) -> TypeDescriptor {
        TypeConverter::new(allow, handlers)
            .convert(&HostType::template(
                "shared_ptr",
                &["std"],
                vec![HostType::record("Bar", &["ns"])],
            ))
            .unwrap()
    }

    #[test]
    fn parameter_dereferences_wrapper() {
        let allow = AllowList::from_names(["Bar"]);
        let handlers = HandlerRegistry::with_defaults();
        let d = shared_bar(&allow, &handlers);
        let handler = SharedHandle::new("std", "shared_ptr");
        assert!(handler.matches(&d));

        let mut out = FunctionBuilder::default();
        let bound = handler.add_as_parameter("bar", &d, &mut out).unwrap();
        assert_eq!(bound.declaration, "WBar_shared_ptr* bar");
        assert_eq!(
            bound.argument,
            "*reinterpret_cast<std::shared_ptr<ns::Bar>*>(bar)"
        );
        let aux = &out.auxiliary["WBar_shared_ptr"];
        assert!(aux.declaration.contains("WBar* WBar_shared_ptr_get(WBar_shared_ptr* self);"));
        assert!(aux.declaration.contains("void WBar_shared_ptr_delete(WBar_shared_ptr* self);"));
        assert!(aux.implementation.contains("->get()"));
        assert!(out.auxiliary.contains_key("WBar"));
    }

    #[test]
    fn return_heap_allocates_wrapper_copy() {
        let allow = AllowList::from_names(["Bar"]);
        let handlers = HandlerRegistry::with_defaults();
        let d = shared_bar(&allow, &handlers);
        let handler = SharedHandle::new("std", "shared_ptr");

        let mut out = FunctionBuilder::default();
        handler.add_as_return_type(&d, &mut out).unwrap();
        assert_eq!(out.return_type, "WBar_shared_ptr*");
        assert_eq!(
            out.wrap_call("ns::Bar::make()"),
            "reinterpret_cast<WBar_shared_ptr*>(new std::shared_ptr<ns::Bar>(ns::Bar::make()))"
        );
    }

    #[test]
    fn global_wrapper_has_no_namespace() {
        let allow = AllowList::from_names(["Bar"]);
        let mut handlers = HandlerRegistry::default();
        handlers.register(Box::new(SharedHandle::new("", "sk_sp")));
        let d = TypeConverter::new(&allow, &handlers)
            .convert(&HostType::template("sk_sp", &[], vec![HostType::record("Bar", &[])]))
            .unwrap();
        let mut out = FunctionBuilder::default();
        let bound = SharedHandle::new("", "sk_sp")
            .add_as_parameter("p", &d, &mut out)
            .unwrap();
        assert_eq!(bound.declaration, "WBar_sk_sp* p");
        assert_eq!(bound.argument, "*reinterpret_cast<sk_sp<Bar>*>(p)");
    }

    #[test]
    fn element_must_be_allow_listed() {
        let allow = AllowList::default();
        let handlers = HandlerRegistry::with_defaults();
        let d = TypeConverter::new(&allow, &handlers)
            .convert(&HostType::template(
                "shared_ptr",
                &["std"],
                vec![HostType::record("Bar", &[])],
            ))
            .unwrap();
        let mut out = FunctionBuilder::default();
        assert!(
            SharedHandle::new("std", "shared_ptr")
                .add_as_parameter("p", &d, &mut out)
                .is_err()
        );
    }
}
