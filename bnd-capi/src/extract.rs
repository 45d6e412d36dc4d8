//! Extraction: clang `Entity`/`Type` → program model.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use clang::{
    Accessibility, Entity, EntityKind, Index, Type as ClangType, TypeKind,
    diagnostic::Severity,
};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::model::*;

/// Parse every configured header and collect the class definitions they
/// contain, headers in configuration order.
pub fn extract_program(index: &Index, cfg: &Config, base_dir: &Path) -> Result<Program> {
    let mut program = Program::default();
    let mut seen = HashSet::new();

    for header in cfg.resolved_headers(base_dir) {
        for class in extract_header(index, &header, cfg)? {
            if seen.insert(class.qualified_name()) {
                program.classes.push(class);
            } else {
                trace!(class = %class.qualified_name(), "class already extracted");
            }
        }
    }

    info!(
        headers = cfg.headers.len(),
        classes = program.classes.len(),
        "extraction complete"
    );
    Ok(program)
}

/// Parse one header and return the classes defined in it, in declaration order.
pub fn extract_header(index: &Index, header: &Path, cfg: &Config) -> Result<Vec<ClassDecl>> {
    debug!(header = %header.display(), "parsing header");

    let mut args: Vec<String> = cfg.clang_args.clone();
    for inc in &cfg.include_paths {
        let flag = format!("-I{}", inc.display());
        if !args.contains(&flag) {
            args.push(flag);
        }
    }

    let tu = index
        .parser(header)
        .arguments(&args)
        .skip_function_bodies(true)
        .parse()
        .map_err(|e| anyhow!("failed to parse {}: {:?}", header.display(), e))?;

    for diag in tu.get_diagnostics() {
        match diag.get_severity() {
            Severity::Fatal => bail!("{}: {}", header.display(), diag.get_text()),
            Severity::Error => warn!(header = %header.display(), diag = %diag.get_text(), "clang error"),
            _ => trace!(header = %header.display(), diag = %diag.get_text(), "clang diagnostic"),
        }
    }

    let traverse = [header.to_path_buf()];
    let mut classes = Vec::new();
    collect_classes(&tu.get_entity().get_children(), &traverse, &mut classes);

    debug!(header = %header.display(), classes = classes.len(), "header extraction complete");
    Ok(classes)
}

// ---------------------------------------------------------------------------
// Declaration walk
// ---------------------------------------------------------------------------

/// Depth-first through namespaces, `extern` blocks and nested classes.
fn collect_classes(entities: &[Entity], traverse: &[PathBuf], out: &mut Vec<ClassDecl>) {
    for entity in entities {
        match entity.get_kind() {
            EntityKind::Namespace => {
                if entity.is_anonymous() || entity.get_name().is_none() {
                    trace!("skipping anonymous namespace");
                    continue;
                }
                collect_classes(&entity.get_children(), traverse, out);
            }
            EntityKind::LinkageSpec => collect_classes(&entity.get_children(), traverse, out),
            EntityKind::ClassDecl | EntityKind::StructDecl => {
                if !entity.is_definition() || !is_in_traverse(entity, traverse) {
                    continue;
                }
                let Some(name) = entity.get_name().filter(|n| !n.is_empty()) else {
                    continue;
                };
                let class = extract_class(entity, name);
                debug!(class = %class.qualified_name(), methods = class.methods.len(), "extracted class");
                out.push(class);
                collect_classes(&entity.get_children(), traverse, out);
            }
            _ => {}
        }
    }
}

fn extract_class(entity: &Entity, name: String) -> ClassDecl {
    let mut methods = Vec::new();
    for child in entity.get_children() {
        let kind = match child.get_kind() {
            EntityKind::Constructor => MethodKind::Constructor {
                is_copy: child.is_copy_constructor(),
                is_move: child.is_move_constructor(),
            },
            EntityKind::Destructor => MethodKind::Destructor,
            EntityKind::Method | EntityKind::ConversionFunction => MethodKind::Method,
            _ => continue,
        };
        match extract_method(&child, kind) {
            Ok(m) => methods.push(m),
            Err(e) => warn!(class = %name, err = %e, "skipping member"),
        }
    }

    ClassDecl {
        namespace: scope_of(entity),
        name,
        methods,
    }
}

fn extract_method(entity: &Entity, kind: MethodKind) -> Result<MethodDecl> {
    let name = entity
        .get_name()
        .ok_or_else(|| anyhow!("member function without a name"))?;
    let access = match entity.get_accessibility() {
        Some(Accessibility::Public) => Access::Public,
        Some(Accessibility::Protected) => Access::Protected,
        Some(Accessibility::Private) | None => Access::Private,
    };
    let return_type = match kind {
        MethodKind::Method => {
            let ty = entity
                .get_result_type()
                .ok_or_else(|| anyhow!("`{name}` has no result type"))?;
            map_host_type(&ty)
        }
        _ => HostType::builtin("void"),
    };

    let params = entity
        .get_arguments()
        .unwrap_or_default()
        .iter()
        .map(|arg| {
            let ty = arg
                .get_type()
                .map(|t| map_host_type(&t))
                .unwrap_or_else(|| unsupported("<unknown>", "parameter without a type"));
            ParamDecl {
                name: arg.get_name().filter(|n| !n.is_empty()),
                ty,
            }
        })
        .collect();

    Ok(MethodDecl {
        name,
        kind,
        access,
        is_static: entity.is_static_method(),
        is_const: entity.is_const_method(),
        return_type,
        params,
    })
}

// ---------------------------------------------------------------------------
// Type mapping
// ---------------------------------------------------------------------------

/// Classify through the canonical type, keep the use-site spelling.
pub fn map_host_type(ty: &ClangType) -> HostType {
    let spelling = ty.get_display_name();
    let canonical = ty.get_canonical_type();

    let kind = match canonical.get_kind() {
        TypeKind::Void => HostTypeKind::Builtin { is_void: true },
        TypeKind::Bool
        | TypeKind::CharS
        | TypeKind::CharU
        | TypeKind::SChar
        | TypeKind::UChar
        | TypeKind::WChar
        | TypeKind::Char16
        | TypeKind::Char32
        | TypeKind::Short
        | TypeKind::UShort
        | TypeKind::Int
        | TypeKind::UInt
        | TypeKind::Long
        | TypeKind::ULong
        | TypeKind::LongLong
        | TypeKind::ULongLong
        | TypeKind::Float
        | TypeKind::Double
        | TypeKind::LongDouble => HostTypeKind::Builtin { is_void: false },

        TypeKind::Pointer => match pointee_of(ty) {
            Some(p) => HostTypeKind::Pointer(Box::new(map_host_type(&p))),
            None => return unsupported(&spelling, "pointer has no pointee type"),
        },

        TypeKind::LValueReference => match pointee_of(ty) {
            Some(p) => HostTypeKind::Reference(Box::new(map_host_type(&p))),
            None => return unsupported(&spelling, "reference has no referenced type"),
        },

        TypeKind::RValueReference => match pointee_of(ty) {
            Some(p) => HostTypeKind::RValueReference(Box::new(map_host_type(&p))),
            None => return unsupported(&spelling, "reference has no referenced type"),
        },

        TypeKind::Enum => {
            let Some(decl) = canonical.get_declaration() else {
                return unsupported(&spelling, "enum without declaration");
            };
            let Some(name) = decl.get_name().filter(|n| !n.is_empty()) else {
                return unsupported(&spelling, "anonymous enum");
            };
            HostTypeKind::Enum {
                name,
                namespace: scope_of(&decl),
                variants: enum_variants(&decl),
            }
        }

        TypeKind::Record => {
            let Some(decl) = canonical.get_declaration() else {
                return unsupported(&spelling, "record without declaration");
            };
            let Some(name) = decl.get_name().filter(|n| !n.is_empty()) else {
                return unsupported(&spelling, "anonymous record");
            };
            let template_args = canonical
                .get_template_argument_types()
                .filter(|args| !args.is_empty())
                .map(|args| args.iter().flatten().map(map_host_type).collect());
            HostTypeKind::Record {
                name,
                namespace: scope_of(&decl),
                template_args,
            }
        }

        TypeKind::FunctionPrototype => {
            let Some(result) = canonical.get_result_type() else {
                return unsupported(&spelling, "function prototype has no return type");
            };
            let params = ty
                .get_argument_types()
                .or_else(|| canonical.get_argument_types())
                .unwrap_or_default();
            HostTypeKind::Function {
                result: Box::new(map_host_type(&result)),
                params: params.iter().map(map_host_type).collect(),
            }
        }

        other => return unsupported(&spelling, &format!("clang type kind {other:?}")),
    };

    HostType::new(spelling, kind)
}

/// Pointee of a pointer or reference, preferring the sugared use-site type
/// so typedef names survive.
fn pointee_of<'tu>(ty: &ClangType<'tu>) -> Option<ClangType<'tu>> {
    match ty.get_kind() {
        TypeKind::Pointer | TypeKind::LValueReference | TypeKind::RValueReference => {
            ty.get_pointee_type()
        }
        _ => ty.get_canonical_type().get_pointee_type(),
    }
}

fn unsupported(spelling: &str, reason: &str) -> HostType {
    HostType::new(
        spelling,
        HostTypeKind::Unsupported {
            reason: reason.to_string(),
        },
    )
}

fn enum_variants(decl: &Entity) -> Vec<EnumVariant> {
    decl.get_children()
        .into_iter()
        .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
        .map(|c| EnumVariant {
            name: c.get_name().unwrap_or_default(),
            value: c.get_enum_constant_value().map(|(v, _)| v).unwrap_or(0),
        })
        .collect()
}

/// Enclosing namespaces and classes, outermost first.
fn scope_of(entity: &Entity) -> Vec<String> {
    let mut scope = Vec::new();
    let mut parent = entity.get_semantic_parent();
    while let Some(p) = parent {
        match p.get_kind() {
            EntityKind::Namespace
            | EntityKind::ClassDecl
            | EntityKind::StructDecl
            | EntityKind::ClassTemplate => {
                if let Some(name) = p.get_name().filter(|n| !n.is_empty()) {
                    scope.push(name);
                }
            }
            EntityKind::TranslationUnit => break,
            _ => {}
        }
        parent = p.get_semantic_parent();
    }
    scope.reverse();
    scope
}

// ---------------------------------------------------------------------------
// Source-location filtering
// ---------------------------------------------------------------------------

fn is_in_traverse(entity: &Entity, traverse_files: &[PathBuf]) -> bool {
    let Some(location) = entity.get_location() else {
        return false;
    };
    let Some(file) = location.get_file_location().file else {
        return false;
    };
    let file_path = file.get_path();
    traverse_files
        .iter()
        .any(|tf| file_path == *tf || file_path.ends_with(tf))
}
