//! MethodConverter: one public class method → one C function.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, bail};

use super::types::{TypeConverter, handle_name, struct_declaration};
use crate::custom::BoundParam;
use crate::descriptor::TypeDescriptor;
use crate::model::{ClassDecl, HostType, MethodDecl, MethodKind};

/// Header declaration plus optional implementation for a synthesized type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxDefinition {
    pub declaration: String,
    pub implementation: String,
}

impl AuxDefinition {
    /// Header-only definition (opaque struct, enum).
    pub fn declaration(text: &str) -> Self {
        Self {
            declaration: text.to_string(),
            implementation: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declaration.is_empty() && self.implementation.is_empty()
    }
}

/// Converter state for the function being generated. Custom type handlers
/// write into it.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    pub return_type: String,
    /// Keyed by synthesized type name so the driver can de-duplicate.
    pub auxiliary: BTreeMap<String, AuxDefinition>,
    prefix: String,
    suffix: String,
}

impl FunctionBuilder {
    /// Wrap the forwarded call. Earlier wraps end up outermost.
    pub fn wrap(&mut self, prefix: impl AsRef<str>, suffix: &str) {
        self.prefix.push_str(prefix.as_ref());
        self.suffix.insert_str(0, suffix);
    }

    /// Apply all wraps around `call`.
    pub fn wrap_call(&self, call: &str) -> String {
        format!("{}{call}{}", self.prefix, self.suffix)
    }

    /// First definition for a key wins; empty definitions are ignored.
    pub fn add_auxiliary(&mut self, key: &str, definition: AuxDefinition) {
        if definition.is_empty() {
            return;
        }
        self.auxiliary
            .entry(key.to_string())
            .or_insert(definition);
    }
}

/// Text artifacts for one converted method.
#[derive(Debug, Clone)]
pub struct GeneratedMethod {
    /// C function name, e.g. `Widget_setValue_1`.
    pub name: String,
    /// Prototype without the trailing `;`.
    pub signature: String,
    /// Full forwarding definition.
    pub body: String,
    pub auxiliary: BTreeMap<String, AuxDefinition>,
}

/// Why a method produced no output without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Operator,
    CopyOrMoveConstructor,
}

#[derive(Debug)]
pub enum Conversion {
    Generated(GeneratedMethod),
    Skipped(SkipReason),
}

/// Overload counters keyed by `"<Ret> <Class>_<method>"`. The C side has no
/// overloading, so each recurrence of a base name gets a numeric suffix.
#[derive(Debug, Default)]
pub struct NameCounter {
    counts: HashMap<String, usize>,
}

impl NameCounter {
    /// `None` the first time `base` is seen, then `Some(1)`, `Some(2)` …
    pub fn disambiguate(&mut self, base: &str) -> Option<usize> {
        match self.counts.get_mut(base) {
            Some(count) => {
                *count += 1;
                Some(*count)
            }
            None => {
                self.counts.insert(base.to_string(), 0);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MethodConverter<'a> {
    types: TypeConverter<'a>,
}

impl<'a> MethodConverter<'a> {
    pub fn new(types: TypeConverter<'a>) -> Self {
        Self { types }
    }

    /// Convert `method` of `class`. Any unsupported parameter or return type
    /// fails the whole method; `names` is only touched on success.
    pub fn convert(
        &self,
        class: &ClassDecl,
        method: &MethodDecl,
        names: &mut NameCounter,
    ) -> Result<Conversion> {
        if method.is_operator() {
            return Ok(Conversion::Skipped(SkipReason::Operator));
        }
        if let MethodKind::Constructor { is_copy, is_move } = method.kind
            && (is_copy || is_move)
        {
            return Ok(Conversion::Skipped(SkipReason::CopyOrMoveConstructor));
        }

        let qualified = class.qualified_name();
        let handle = handle_name(&class.name);
        let mut out = FunctionBuilder::default();
        out.add_auxiliary(&handle, AuxDefinition::declaration(&struct_declaration(&handle)));

        let mut declarations = Vec::new();
        let mut arguments = Vec::new();
        for (i, param) in method.params.iter().enumerate() {
            let name = match &param.name {
                Some(n) if !n.is_empty() => n.clone(),
                _ => format!("param{i}"),
            };
            let bound = self
                .bind_parameter(&name, &param.ty, &mut out)
                .with_context(|| format!("parameter `{name}`"))?;
            declarations.push(bound.declaration);
            arguments.push(bound.argument);
        }
        let arguments = arguments.join(", ");

        let (method_name, has_self, call, returns_value) = match method.kind {
            MethodKind::Constructor { .. } => {
                out.return_type = format!("{handle}*");
                out.wrap(format!("reinterpret_cast<{handle}*>("), ")");
                ("create", false, format!("new {qualified}({arguments})"), true)
            }
            MethodKind::Destructor => {
                out.return_type = "void".to_string();
                (
                    "destroy",
                    true,
                    format!("delete reinterpret_cast<{qualified}*>(self)"),
                    false,
                )
            }
            MethodKind::Method => {
                let returns_value = self
                    .bind_return(&method.return_type, &mut out)
                    .context("return type")?;
                let call = if method.is_static {
                    format!("{qualified}::{}({arguments})", method.name)
                } else {
                    let constness = if method.is_const { "const " } else { "" };
                    format!(
                        "reinterpret_cast<{constness}{qualified}*>(self)->{}({arguments})",
                        method.name
                    )
                };
                (method.name.as_str(), !method.is_static, call, returns_value)
            }
        };

        let base = format!("{} {}_{method_name}", out.return_type, class.name);
        let name = match names.disambiguate(&base) {
            Some(n) => format!("{}_{method_name}_{n}", class.name),
            None => format!("{}_{method_name}", class.name),
        };

        if has_self {
            declarations.insert(0, format!("{handle}* self"));
        }
        let signature = format!("{} {name}({})", out.return_type, declarations.join(", "));
        let expression = out.wrap_call(&call);
        let statement = if returns_value {
            format!("return {expression};")
        } else {
            format!("{expression};")
        };
        let body = format!("{signature} {{\n    {statement}\n}}\n");

        Ok(Conversion::Generated(GeneratedMethod {
            name,
            signature,
            body,
            auxiliary: out.auxiliary,
        }))
    }

    fn bind_parameter(
        &self,
        name: &str,
        ty: &HostType,
        out: &mut FunctionBuilder,
    ) -> Result<BoundParam> {
        let d = self.types.convert(ty)?;
        if d.is_template_instance() {
            let handler = self
                .types
                .handler_for(&d)
                .context("template instance without a handler")?;
            return handler.add_as_parameter(name, &d, out);
        }
        if d.is_void_type() {
            bail!("`void` parameter");
        }
        out.add_auxiliary(
            d.handle_name(),
            AuxDefinition::declaration(d.auxiliary_declaration()),
        );

        let argument = if d.is_enum() {
            format!("static_cast<{}>({name})", d.qualified_cast())
        } else if d.is_record() {
            // References and by-value records arrive as pointers.
            let deref = if d.is_pointer() { "" } else { "*" };
            if d.cast_spelling().is_empty() {
                format!("{deref}{name}")
            } else {
                let constness = if d.is_const() { "const " } else { "" };
                format!(
                    "{deref}reinterpret_cast<{constness}{}*>({name})",
                    d.qualified_cast()
                )
            }
        } else {
            name.to_string()
        };

        Ok(BoundParam {
            declaration: d.declaration_with_name(name),
            argument,
        })
    }

    /// Returns whether the generated function returns a value.
    fn bind_return(&self, ty: &HostType, out: &mut FunctionBuilder) -> Result<bool> {
        let d = self.types.convert(ty)?;
        if d.is_template_instance() {
            let handler = self
                .types
                .handler_for(&d)
                .context("template instance without a handler")?;
            handler.add_as_return_type(&d, out)?;
            return Ok(true);
        }
        if d.is_void_type() {
            out.return_type = "void".to_string();
            return Ok(false);
        }
        if d.is_function_pointer() {
            bail!("function pointer return type `{}`", ty.spelling);
        }
        out.add_auxiliary(
            d.handle_name(),
            AuxDefinition::declaration(d.auxiliary_declaration()),
        );

        let return_type = d.declared_spelling();
        if d.is_enum() {
            out.wrap(format!("static_cast<{}>(", d.target_spelling()), ")");
        } else if d.is_record() {
            if !d.cast_spelling().is_empty() {
                out.wrap(format!("reinterpret_cast<{return_type}>("), ")");
            }
            if d.is_reference() {
                out.wrap("&", "");
            } else if !d.is_pointer() {
                // Value returns are copied to the heap; the caller owns the
                // result and must `_destroy` it.
                out.wrap(format!("new {}(", host_record_name(&d)), ")");
            }
        }
        out.return_type = return_type;
        Ok(true)
    }
}

/// Fully qualified host name of a record descriptor.
fn host_record_name(d: &TypeDescriptor) -> String {
    if !d.cast_spelling().is_empty() {
        d.qualified_cast()
    } else if d.namespace_prefix().is_empty() {
        d.handle_name().to_string()
    } else {
        format!("{}::{}", d.namespace_prefix(), d.handle_name())
    }
}
