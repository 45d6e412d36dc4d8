//! [`TypeDescriptor`]: how one host type is represented in the generated C API.

/// The rule that produced a [`TypeDescriptor`]. Exactly one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    /// Builtin type or pointer to builtin, used verbatim.
    Primitive,
    /// Enum, mirrored as a C enum.
    Enum,
    /// Class or struct, by value, pointer or reference.
    Record,
    /// The declarator halves a parameter name is spliced between.
    FunctionPointer { left: String, right: String },
    /// Template specialization owned by a custom type handler.
    TemplateInstance {
        name: String,
        arguments: Vec<TypeDescriptor>,
    },
}

/// The immutable result of converting one host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub(crate) target_spelling: String,
    pub(crate) cast_spelling: String,
    pub(crate) namespace_prefix: String,
    pub(crate) auxiliary_declaration: String,
    pub(crate) shape: TypeShape,
    pub(crate) is_pointer: bool,
    pub(crate) is_reference: bool,
    pub(crate) is_const: bool,
    pub(crate) is_void_type: bool,
}

impl TypeDescriptor {
    pub(crate) fn new(shape: TypeShape, target_spelling: impl Into<String>) -> Self {
        Self {
            target_spelling: target_spelling.into(),
            cast_spelling: String::new(),
            namespace_prefix: String::new(),
            auxiliary_declaration: String::new(),
            shape,
            is_pointer: false,
            is_reference: false,
            is_const: false,
            is_void_type: false,
        }
    }

    /// The type as written in generated C code. For function pointers this is
    /// the unnamed declarator, e.g. `void *(*) (int)`.
    pub fn target_spelling(&self) -> String {
        match &self.shape {
            TypeShape::FunctionPointer { left, right } => format!("{left}{right}"),
            _ => self.target_spelling.clone(),
        }
    }

    /// Host type a handle is cast to inside generated bodies; empty when the
    /// value crosses the boundary unchanged.
    pub fn cast_spelling(&self) -> &str {
        &self.cast_spelling
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    /// Header text this type needs (opaque struct or enum definition).
    pub fn auxiliary_declaration(&self) -> &str {
        &self.auxiliary_declaration
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn is_enum(&self) -> bool {
        self.shape == TypeShape::Enum
    }

    pub fn is_record(&self) -> bool {
        self.shape == TypeShape::Record
    }

    pub fn is_pointer(&self) -> bool {
        self.is_pointer
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn is_void_type(&self) -> bool {
        self.is_void_type
    }

    pub fn is_function_pointer(&self) -> bool {
        matches!(self.shape, TypeShape::FunctionPointer { .. })
    }

    pub fn is_template_instance(&self) -> bool {
        matches!(self.shape, TypeShape::TemplateInstance { .. })
    }

    pub fn template_name(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::TemplateInstance { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn template_arguments(&self) -> &[TypeDescriptor] {
        match &self.shape {
            TypeShape::TemplateInstance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    pub fn left_spelling(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::FunctionPointer { left, .. } => Some(left),
            _ => None,
        }
    }

    pub fn right_spelling(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::FunctionPointer { right, .. } => Some(right),
            _ => None,
        }
    }

    /// `true` for a record passed or returned by value.
    pub fn is_by_value_record(&self) -> bool {
        self.is_record() && !self.is_pointer && !self.is_reference
    }

    /// Opaque handle name without the pointer, e.g. `WFoo` for `WFoo*`.
    pub fn handle_name(&self) -> &str {
        self.target_spelling.trim_end_matches('*').trim_end()
    }

    /// Cast spelling qualified with its namespace, e.g. `ns::Foo`.
    pub fn qualified_cast(&self) -> String {
        if self.namespace_prefix.is_empty() {
            self.cast_spelling.clone()
        } else {
            format!("{}::{}", self.namespace_prefix, self.cast_spelling)
        }
    }

    /// `"const "` when a const qualifier has to be added in front of the
    /// target spelling, empty otherwise.
    pub fn const_prefix(&self) -> &'static str {
        if self.is_const && !self.target_spelling.starts_with("const ") && !self.is_function_pointer() {
            "const "
        } else {
            ""
        }
    }

    /// Target spelling including any propagated `const`.
    pub fn declared_spelling(&self) -> String {
        format!("{}{}", self.const_prefix(), self.target_spelling())
    }

    /// Full C declarator for a parameter or variable called `name`.
    pub fn declaration_with_name(&self, name: &str) -> String {
        match &self.shape {
            TypeShape::FunctionPointer { left, right } => format!("{left}{name}{right}"),
            _ => format!("{} {name}", self.declared_spelling()),
        }
    }
}
