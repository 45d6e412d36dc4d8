//! TypeConverter: host type → [`TypeDescriptor`].

use anyhow::{Result, bail};

use crate::allow_list::AllowList;
use crate::custom::{CustomTypeHandler, HandlerRegistry};
use crate::descriptor::{TypeDescriptor, TypeShape};
use crate::model::{EnumVariant, HostType, HostTypeKind};

/// Converts host types using the allow list and the registered custom
/// handlers. Conversion has no side effects.
#[derive(Debug, Clone, Copy)]
pub struct TypeConverter<'a> {
    allow_list: &'a AllowList,
    handlers: &'a HandlerRegistry,
}

impl<'a> TypeConverter<'a> {
    pub fn new(allow_list: &'a AllowList, handlers: &'a HandlerRegistry) -> Self {
        Self {
            allow_list,
            handlers,
        }
    }

    /// Handler owning a template instance descriptor, if any.
    pub fn handler_for(&self, descriptor: &TypeDescriptor) -> Option<&'a dyn CustomTypeHandler> {
        self.handlers.find(descriptor)
    }

    /// Convert one host type. Rules are tried in order and the first match
    /// wins; unsupported shapes are reported as errors.
    pub fn convert(&self, ty: &HostType) -> Result<TypeDescriptor> {
        let mut descriptor = self.convert_shape(ty)?;
        // `T *const` is a const pointer to a mutable `T`; only the pointee or
        // referent qualifies the descriptor.
        descriptor.is_const = match &ty.kind {
            HostTypeKind::Pointer(inner) | HostTypeKind::Reference(inner) => {
                has_const_qualifier(&inner.spelling)
            }
            _ => has_const_qualifier(&ty.spelling),
        };
        Ok(descriptor)
    }

    fn convert_shape(&self, ty: &HostType) -> Result<TypeDescriptor> {
        match &ty.kind {
            HostTypeKind::Record {
                name,
                namespace,
                template_args: Some(args),
            } => self.template_instance(ty, name, namespace, args),
            HostTypeKind::Reference(inner) if is_template_instance(inner) => {
                let mut d = self.convert_shape(inner)?;
                d.is_reference = true;
                Ok(d)
            }
            HostTypeKind::Pointer(inner) if matches!(inner.kind, HostTypeKind::Function { .. }) => {
                function_pointer(inner)
            }
            HostTypeKind::Builtin { is_void } => {
                let mut d = TypeDescriptor::new(TypeShape::Primitive, ty.spelling.clone());
                d.is_void_type = *is_void;
                Ok(d)
            }
            HostTypeKind::Pointer(inner) if matches!(inner.kind, HostTypeKind::Builtin { .. }) => {
                let mut d = TypeDescriptor::new(TypeShape::Primitive, ty.spelling.clone());
                d.is_pointer = true;
                Ok(d)
            }
            HostTypeKind::Enum {
                name,
                namespace,
                variants,
            } => {
                let mut d = TypeDescriptor::new(TypeShape::Enum, name.clone());
                d.cast_spelling = name.clone();
                d.namespace_prefix = namespace.join("::");
                d.auxiliary_declaration = enum_definition(name, variants, namespace.is_empty());
                Ok(d)
            }
            HostTypeKind::Record {
                name, namespace, ..
            } => Ok(self.record(name, namespace)),
            HostTypeKind::Pointer(inner) | HostTypeKind::Reference(inner) => {
                let HostTypeKind::Record {
                    name,
                    namespace,
                    template_args: None,
                } = &inner.kind
                else {
                    bail!("unsupported indirection `{}`", ty.spelling);
                };
                let mut d = self.record(name, namespace);
                if matches!(ty.kind, HostTypeKind::Pointer(_)) {
                    d.is_pointer = true;
                } else {
                    d.is_reference = true;
                }
                Ok(d)
            }
            HostTypeKind::RValueReference(_) => {
                bail!("rvalue reference `{}` is not supported", ty.spelling)
            }
            HostTypeKind::Function { .. } => bail!("bare function type `{}`", ty.spelling),
            HostTypeKind::Unsupported { reason } => {
                bail!("unsupported type `{}`: {reason}", ty.spelling)
            }
        }
    }

    /// Allow-listed records become opaque `W<Name>*` handles; anything else is
    /// assumed to be C-compatible already and is used through a plain pointer.
    fn record(&self, name: &str, namespace: &[String]) -> TypeDescriptor {
        let mut d = if self.allow_list.contains(name) {
            let handle = handle_name(name);
            let mut d = TypeDescriptor::new(TypeShape::Record, format!("{handle}*"));
            d.cast_spelling = name.to_string();
            d.auxiliary_declaration = struct_declaration(&handle);
            d
        } else {
            TypeDescriptor::new(TypeShape::Record, format!("{name}*"))
        };
        d.namespace_prefix = namespace.join("::");
        d
    }

    fn template_instance(
        &self,
        ty: &HostType,
        name: &str,
        namespace: &[String],
        args: &[HostType],
    ) -> Result<TypeDescriptor> {
        // Wrappers are parametrized by their element type; trailing arguments
        // such as deleters or allocators are not represented.
        let Some(element) = args.first() else {
            bail!("template `{}` has no type arguments", ty.spelling);
        };
        let element = self.convert(element)?;
        let mut d = TypeDescriptor::new(
            TypeShape::TemplateInstance {
                name: name.to_string(),
                arguments: vec![element],
            },
            ty.spelling.clone(),
        );
        d.namespace_prefix = namespace.join("::");
        if self.handlers.find(&d).is_none() {
            bail!(
                "unsupported template `{}`: no custom type handler for `{name}`",
                ty.spelling
            );
        }
        Ok(d)
    }
}

fn is_template_instance(ty: &HostType) -> bool {
    matches!(
        ty.kind,
        HostTypeKind::Record {
            template_args: Some(_),
            ..
        }
    )
}

fn function_pointer(function: &HostType) -> Result<TypeDescriptor> {
    let HostTypeKind::Function { result, params } = &function.kind else {
        bail!("expected a function type, got `{}`", function.spelling);
    };
    let left = format!("{}(*", result.spelling);
    let right = format!(
        ") ({})",
        params
            .iter()
            .map(|p| p.spelling.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(TypeDescriptor::new(
        TypeShape::FunctionPointer { left, right },
        String::new(),
    ))
}

/// `const` as a whole word anywhere in the spelling.
fn has_const_qualifier(spelling: &str) -> bool {
    spelling
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "const")
}

/// Opaque handle name for a wrapped class.
pub fn handle_name(class_name: &str) -> String {
    format!("W{class_name}")
}

/// Forward declaration and typedef of an opaque handle struct.
pub fn struct_declaration(handle: &str) -> String {
    format!("struct {handle};\ntypedef struct {handle} {handle};\n")
}

/// C mirror of a host enum. A global-scope enum would collide with the host
/// definition in the C++ source, so it is only visible to C.
fn enum_definition(name: &str, variants: &[EnumVariant], global_scope: bool) -> String {
    let mut out = String::new();
    if global_scope {
        out.push_str("#ifndef __cplusplus\n");
    }
    out.push_str(&format!("enum {name} {{\n"));
    for v in variants {
        out.push_str(&format!("\t{} = {},\n", v.name, v.value));
    }
    out.push_str("};\n");
    out.push_str(&format!("typedef enum {name} {name};\n"));
    if global_scope {
        out.push_str("#endif\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter_fixture() -> (AllowList, HandlerRegistry) {
        (
            AllowList::from_names(["Bar", "Widget"]),
            HandlerRegistry::with_defaults(),
        )
    }

    #[test]
    fn primitives_are_used_verbatim() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        for spelling in ["int", "char", "double", "unsigned long", "bool", "uint32_t"] {
            let d = tc.convert(&HostType::builtin(spelling)).unwrap();
            assert_eq!(d.target_spelling(), spelling);
            assert_eq!(d.cast_spelling(), "");
            assert_eq!(*d.shape(), TypeShape::Primitive);
            assert!(!d.is_void_type());
        }
        let void = tc.convert(&HostType::builtin("void")).unwrap();
        assert!(void.is_void_type());
    }

    #[test]
    fn pointer_to_primitive_keeps_spelling() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::new(
            "const char *",
            HostTypeKind::Pointer(Box::new(HostType::builtin("const char"))),
        );
        let d = tc.convert(&ty).unwrap();
        assert_eq!(d.target_spelling(), "const char *");
        assert!(d.is_pointer());
        assert!(d.is_const());
        assert_eq!(d.cast_spelling(), "");
    }

    #[test]
    fn allow_listed_record_becomes_handle() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        for name in ["Bar", "Widget"] {
            let d = tc.convert(&HostType::record(name, &["ns"])).unwrap();
            assert_eq!(d.target_spelling(), format!("W{name}*"));
            assert_eq!(d.cast_spelling(), name);
            assert_eq!(d.namespace_prefix(), "ns");
            assert_eq!(
                d.auxiliary_declaration(),
                format!("struct W{name};\ntypedef struct W{name} W{name};\n")
            );
        }
    }

    #[test]
    fn other_records_are_not_wrapped() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let d = tc.convert(&HostType::record("Plain", &[])).unwrap();
        assert_eq!(d.target_spelling(), "Plain*");
        assert_eq!(d.cast_spelling(), "");
        assert_eq!(d.auxiliary_declaration(), "");
    }

    #[test]
    fn const_reference_to_record() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::reference_to(HostType::record("Bar", &[]).constified());
        let d = tc.convert(&ty).unwrap();
        assert!(d.is_reference());
        assert!(!d.is_pointer());
        assert!(d.is_const());
        assert_eq!(d.declaration_with_name("b"), "const WBar* b");
    }

    #[test]
    fn enum_is_mirrored() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::new(
            "ns::Mode",
            HostTypeKind::Enum {
                name: "Mode".to_string(),
                namespace: vec!["ns".to_string()],
                variants: vec![
                    EnumVariant {
                        name: "kIdle".to_string(),
                        value: 0,
                    },
                    EnumVariant {
                        name: "kBusy".to_string(),
                        value: 4,
                    },
                ],
            },
        );
        let d = tc.convert(&ty).unwrap();
        assert!(d.is_enum());
        assert_eq!(d.target_spelling(), "Mode");
        assert_eq!(d.qualified_cast(), "ns::Mode");
        assert_eq!(
            d.auxiliary_declaration(),
            "enum Mode {\n\tkIdle = 0,\n\tkBusy = 4,\n};\ntypedef enum Mode Mode;\n"
        );
    }

    #[test]
    fn global_enum_definition_is_hidden_from_cxx() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::new(
            "Level",
            HostTypeKind::Enum {
                name: "Level".to_string(),
                namespace: vec![],
                variants: vec![EnumVariant {
                    name: "kLow".to_string(),
                    value: 1,
                }],
            },
        );
        let d = tc.convert(&ty).unwrap();
        assert_eq!(d.qualified_cast(), "Level");
        assert_eq!(
            d.auxiliary_declaration(),
            "#ifndef __cplusplus\nenum Level {\n\tkLow = 1,\n};\ntypedef enum Level Level;\n#endif\n"
        );
    }

    #[test]
    fn function_pointer_halves() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let function = HostType::new(
            "void *(int)",
            HostTypeKind::Function {
                result: Box::new(HostType::builtin("void *")),
                params: vec![HostType::builtin("int")],
            },
        );
        let d = tc
            .convert(&HostType::new(
                "void *(*)(int)",
                HostTypeKind::Pointer(Box::new(function)),
            ))
            .unwrap();
        assert!(d.is_function_pointer());
        assert_eq!(d.left_spelling(), Some("void *(*"));
        assert_eq!(d.right_spelling(), Some(") (int)"));
        assert_eq!(d.declaration_with_name("foo"), "void *(*foo) (int)");
    }

    #[test]
    fn template_without_handler_is_unsupported() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::template("vector", &["std"], vec![HostType::builtin("int")]);
        let err = tc.convert(&ty).unwrap_err();
        assert!(err.to_string().contains("no custom type handler"));
    }

    #[test]
    fn template_with_handler_is_instance() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::template("shared_ptr", &["std"], vec![HostType::record("Bar", &[])]);
        let d = tc.convert(&ty).unwrap();
        assert!(d.is_template_instance());
        assert_eq!(d.template_name(), Some("shared_ptr"));
        assert_eq!(d.template_arguments()[0].target_spelling(), "WBar*");
        assert!(tc.handler_for(&d).is_some());
    }

    #[test]
    fn double_pointer_to_record_is_unsupported() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::pointer_to(HostType::pointer_to(HostType::record("Bar", &[])));
        assert!(tc.convert(&ty).is_err());
    }

    #[test]
    fn top_level_const_on_pointer_is_ignored() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);

        let record = HostType::new(
            "Bar *const",
            HostTypeKind::Pointer(Box::new(HostType::record("Bar", &[]))),
        );
        let d = tc.convert(&record).unwrap();
        assert!(d.is_pointer());
        assert!(!d.is_const());
        assert_eq!(d.declaration_with_name("b"), "WBar* b");

        let chars = HostType::new(
            "char *const",
            HostTypeKind::Pointer(Box::new(HostType::builtin("char"))),
        );
        let d = tc.convert(&chars).unwrap();
        assert!(!d.is_const());
        assert_eq!(d.declaration_with_name("s"), "char *const s");

        let both = HostType::new(
            "const Bar *const",
            HostTypeKind::Pointer(Box::new(HostType::record("Bar", &[]).constified())),
        );
        assert!(tc.convert(&both).unwrap().is_const());
    }

    #[test]
    fn rvalue_reference_is_unsupported() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::rvalue_reference_to(HostType::record("Bar", &[]));
        assert_eq!(ty.spelling, "Bar &&");
        let err = tc.convert(&ty).unwrap_err();
        assert!(err.to_string().contains("rvalue reference"));
    }

    #[test]
    fn conversion_is_idempotent() {
        let (allow, handlers) = converter_fixture();
        let tc = TypeConverter::new(&allow, &handlers);
        let ty = HostType::reference_to(HostType::record("Bar", &["a", "b"]).constified());
        assert_eq!(tc.convert(&ty).unwrap(), tc.convert(&ty).unwrap());
    }

    #[test]
    fn const_detection_is_word_based() {
        assert!(has_const_qualifier("const int"));
        assert!(!has_const_qualifier("constant_t"));
        assert!(!has_const_qualifier("MyConst"));
    }
}
