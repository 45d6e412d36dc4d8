//! Program model: the bridge between clang extraction and C wrapper generation.
//!
//! These types are clang-independent, so the converters and the driver can be
//! exercised with hand-built declarations in tests.

/// Everything extracted from the input headers, in traversal order.
///
/// Traversal order is headers in configuration order, then declaration order
/// within each header (depth-first through namespaces and nested classes).
#[derive(Debug, Default)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

/// A C++ class or struct definition.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    /// Enclosing namespaces (and classes, for nested types), outermost first.
    pub namespace: Vec<String>,
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    /// `a::b::Name`, or just `Name` at global scope.
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

/// Member access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// What kind of member function a [`MethodDecl`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor { is_copy: bool, is_move: bool },
    Destructor,
    /// Ordinary member function, including operators and conversion functions.
    Method,
}

/// A member function declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MethodKind,
    pub access: Access,
    pub is_static: bool,
    /// `int get() const;`
    pub is_const: bool,
    pub return_type: HostType,
    pub params: Vec<ParamDecl>,
}

impl MethodDecl {
    /// `operator+`, `operator[]`, `operator bool` …
    pub fn is_operator(&self) -> bool {
        match self.name.strip_prefix("operator") {
            Some(rest) => rest
                .chars()
                .next()
                .is_some_and(|c| !(c.is_alphanumeric() || c == '_')),
            None => false,
        }
    }
}

/// A function parameter. Unnamed parameters keep `name: None`.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Option<String>,
    pub ty: HostType,
}

/// A host (C++) type as written at its use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostType {
    /// Spelling at the use site, e.g. `const Foo &` or `uint32_t`.
    pub spelling: String,
    pub kind: HostTypeKind,
}

/// Structural classification of a [`HostType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTypeKind {
    /// Builtin arithmetic type, `bool`, or `void` (typedefs to these included).
    Builtin { is_void: bool },
    Enum {
        name: String,
        namespace: Vec<String>,
        variants: Vec<EnumVariant>,
    },
    /// A class or struct. `template_args` is `Some` for template specializations
    /// such as `std::shared_ptr<Foo>`, in which case `name` is the template name.
    Record {
        name: String,
        namespace: Vec<String>,
        template_args: Option<Vec<HostType>>,
    },
    Pointer(Box<HostType>),
    /// Lvalue reference.
    Reference(Box<HostType>),
    /// `T&&`; kept apart so it is never treated as an lvalue reference.
    RValueReference(Box<HostType>),
    /// A function type; only meaningful behind a [`HostTypeKind::Pointer`].
    Function {
        result: Box<HostType>,
        params: Vec<HostType>,
    },
    Unsupported { reason: String },
}

/// A single enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl HostType {
    pub fn new(spelling: impl Into<String>, kind: HostTypeKind) -> Self {
        Self {
            spelling: spelling.into(),
            kind,
        }
    }

    pub fn builtin(spelling: &str) -> Self {
        Self::new(
            spelling,
            HostTypeKind::Builtin {
                is_void: spelling == "void",
            },
        )
    }

    pub fn record(name: &str, namespace: &[&str]) -> Self {
        let namespace: Vec<String> = namespace.iter().map(|s| s.to_string()).collect();
        Self::new(
            qualify(&namespace, name),
            HostTypeKind::Record {
                name: name.to_string(),
                namespace,
                template_args: None,
            },
        )
    }

    pub fn template(name: &str, namespace: &[&str], args: Vec<HostType>) -> Self {
        let namespace: Vec<String> = namespace.iter().map(|s| s.to_string()).collect();
        let spelling = format!(
            "{}<{}>",
            qualify(&namespace, name),
            args.iter()
                .map(|a| a.spelling.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::new(
            spelling,
            HostTypeKind::Record {
                name: name.to_string(),
                namespace,
                template_args: Some(args),
            },
        )
    }

    pub fn pointer_to(pointee: HostType) -> Self {
        Self::new(
            format!("{} *", pointee.spelling),
            HostTypeKind::Pointer(Box::new(pointee)),
        )
    }

    pub fn reference_to(pointee: HostType) -> Self {
        Self::new(
            format!("{} &", pointee.spelling),
            HostTypeKind::Reference(Box::new(pointee)),
        )
    }

    pub fn rvalue_reference_to(pointee: HostType) -> Self {
        Self::new(
            format!("{} &&", pointee.spelling),
            HostTypeKind::RValueReference(Box::new(pointee)),
        )
    }

    /// Same type with a leading `const` in its spelling.
    pub fn constified(mut self) -> Self {
        self.spelling = format!("const {}", self.spelling);
        self
    }
}

/// Join a scope path and a name with `::`.
pub fn qualify(namespace: &[String], name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespace.join("::"), name)
    }
}
