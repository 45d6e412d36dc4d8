//! MatchDriver: walks the program and accumulates the generated text.

use std::collections::HashSet;

use tracing::{debug, info, trace, warn};

use crate::allow_list::AllowList;
use crate::convert::method::{Conversion, MethodConverter, NameCounter};
use crate::convert::types::{TypeConverter, handle_name, struct_declaration};
use crate::custom::HandlerRegistry;
use crate::model::{Access, ClassDecl, MethodDecl, Program};

/// "Public method of a class with this name."
#[derive(Debug, Clone)]
pub struct ClassQuery {
    class_name: String,
}

impl ClassQuery {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
        }
    }

    pub fn matches(&self, class: &ClassDecl, method: &MethodDecl) -> bool {
        class.name == self.class_name && method.access == Access::Public
    }
}

/// Per-run counters, logged when the driver finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchStats {
    pub converted: usize,
    pub skipped: usize,
    pub dropped: usize,
}

/// Header and source text, without include guards or `extern "C"`.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    pub header: String,
    pub source: String,
    pub stats: MatchStats,
}

/// Owns all mutable state of a generation run: the overload counters, the
/// set of auxiliary definitions already emitted and the output buffers.
///
/// Lifecycle: [`MatchDriver::new`] registers one query per allow-listed class,
/// [`MatchDriver::run`] (or repeated [`MatchDriver::on_match`] calls) converts
/// methods in traversal order, and [`MatchDriver::finish`] hands back the text.
#[derive(Debug)]
pub struct MatchDriver<'a> {
    converter: MethodConverter<'a>,
    queries: Vec<ClassQuery>,
    names: NameCounter,
    emitted: HashSet<String>,
    header: String,
    source: String,
    stats: MatchStats,
}

impl<'a> MatchDriver<'a> {
    pub fn new(allow_list: &'a AllowList, handlers: &'a HandlerRegistry) -> Self {
        let mut driver = Self {
            converter: MethodConverter::new(TypeConverter::new(allow_list, handlers)),
            queries: Vec::with_capacity(allow_list.len()),
            names: NameCounter::default(),
            emitted: HashSet::new(),
            header: String::new(),
            source: String::new(),
            stats: MatchStats::default(),
        };

        // Every allow-listed class gets its handle up front, whether or not
        // any of its methods end up matched.
        for class_name in allow_list.iter() {
            driver.queries.push(ClassQuery::new(class_name));
            let handle = handle_name(class_name);
            driver.header.push_str(&struct_declaration(&handle));
            driver.emitted.insert(handle);
        }
        driver.header.push('\n');

        debug!(queries = driver.queries.len(), "registered class queries");
        driver
    }

    /// Visit every method of every class, in program order.
    pub fn run(&mut self, program: &Program) {
        for class in &program.classes {
            if !self.queries.iter().any(|q| q.class_name == class.name) {
                trace!(class = %class.qualified_name(), "class not allow-listed");
                continue;
            }
            for method in &class.methods {
                if self.queries.iter().any(|q| q.matches(class, method)) {
                    self.on_match(class, method);
                }
            }
        }
    }

    /// Convert one matched method and append its text.
    pub fn on_match(&mut self, class: &ClassDecl, method: &MethodDecl) {
        match self.converter.convert(class, method, &mut self.names) {
            Ok(Conversion::Generated(generated)) => {
                for (key, aux) in generated.auxiliary {
                    if !self.emitted.insert(key) {
                        continue;
                    }
                    self.header.push_str(&aux.declaration);
                    self.source.push_str(&aux.implementation);
                }
                self.header.push_str(&generated.signature);
                self.header.push_str(";\n");
                self.source.push_str(&generated.body);
                debug!(class = %class.name, method = %method.name, function = %generated.name, "converted method");
                self.stats.converted += 1;
            }
            Ok(Conversion::Skipped(reason)) => {
                trace!(class = %class.name, method = %method.name, ?reason, "skipping method");
                self.stats.skipped += 1;
            }
            Err(e) => {
                warn!(class = %class.name, method = %method.name, err = %format!("{e:#}"), "dropping method");
                self.stats.dropped += 1;
            }
        }
    }

    pub fn finish(self) -> Bindings {
        info!(
            converted = self.stats.converted,
            skipped = self.stats.skipped,
            dropped = self.stats.dropped,
            "matching complete"
        );
        Bindings {
            header: self.header,
            source: self.source,
            stats: self.stats,
        }
    }
}

/// Run a whole pass over `program` with fresh state.
pub fn generate_bindings(
    program: &Program,
    allow_list: &AllowList,
    handlers: &HandlerRegistry,
) -> Bindings {
    let mut driver = MatchDriver::new(allow_list, handlers);
    driver.run(program);
    driver.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HostType, MethodKind, ParamDecl};

    fn method(name: &str, kind: MethodKind, ret: HostType, params: Vec<HostType>) -> MethodDecl {
        MethodDecl {
            name: name.to_string(),
            kind,
            access: Access::Public,
            is_static: false,
            is_const: false,
            return_type: ret,
            params: params
                .into_iter()
                .map(|ty| ParamDecl { name: None, ty })
                .collect(),
        }
    }

    fn widget_program() -> Program {
        let mut get_value = method("getValue", MethodKind::Method, HostType::builtin("int"), vec![]);
        get_value.is_const = true;
        let mut hidden = method("hidden", MethodKind::Method, HostType::builtin("void"), vec![]);
        hidden.access = Access::Private;
        Program {
            classes: vec![ClassDecl {
                name: "Widget".to_string(),
                namespace: vec![],
                methods: vec![
                    method(
                        "Widget",
                        MethodKind::Constructor {
                            is_copy: false,
                            is_move: false,
                        },
                        HostType::builtin("void"),
                        vec![HostType::builtin("int")],
                    ),
                    get_value,
                    hidden,
                    method("~Widget", MethodKind::Destructor, HostType::builtin("void"), vec![]),
                ],
            }],
        }
    }

    #[test]
    fn widget_end_to_end() {
        let allow = AllowList::from_names(["Widget"]);
        let handlers = HandlerRegistry::with_defaults();
        let bindings = generate_bindings(&widget_program(), &allow, &handlers);

        assert_eq!(
            bindings.header,
            "struct WWidget;\n\
             typedef struct WWidget WWidget;\n\
             \n\
             WWidget* Widget_create(int param0);\n\
             int Widget_getValue(WWidget* self);\n\
             void Widget_destroy(WWidget* self);\n"
        );
        assert!(
            bindings
                .source
                .contains("return reinterpret_cast<const Widget*>(self)->getValue();")
        );
        assert!(!bindings.source.contains("hidden"));
        assert_eq!(
            bindings.stats,
            MatchStats {
                converted: 3,
                skipped: 0,
                dropped: 0
            }
        );
    }

    #[test]
    fn forward_declarations_for_unmatched_classes() {
        let allow = AllowList::from_names(["Widget", "Gadget"]);
        let handlers = HandlerRegistry::with_defaults();
        let bindings = generate_bindings(&Program::default(), &allow, &handlers);
        assert!(bindings.header.contains("struct WWidget;"));
        assert!(bindings.header.contains("struct WGadget;"));
        assert!(bindings.source.is_empty());
    }

    #[test]
    fn classes_outside_allow_list_are_ignored() {
        let allow = AllowList::from_names(["Gadget"]);
        let handlers = HandlerRegistry::with_defaults();
        let bindings = generate_bindings(&widget_program(), &allow, &handlers);
        assert!(!bindings.header.contains("Widget_"));
        assert_eq!(bindings.stats, MatchStats::default());
    }

    #[test]
    fn shared_handle_definitions_are_emitted_once() {
        let allow = AllowList::from_names(["Bar", "Baz"]);
        let handlers = HandlerRegistry::with_defaults();
        let shared = HostType::template("shared_ptr", &["std"], vec![HostType::record("Bar", &[])]);
        let make = |name: &str| {
            let mut m = method(name, MethodKind::Method, shared.clone(), vec![]);
            m.is_static = true;
            m
        };
        let program = Program {
            classes: vec![
                ClassDecl {
                    name: "Bar".to_string(),
                    namespace: vec![],
                    methods: vec![make("create_shared"), make("clone_shared")],
                },
                ClassDecl {
                    name: "Baz".to_string(),
                    namespace: vec![],
                    methods: vec![method(
                        "take",
                        MethodKind::Method,
                        HostType::builtin("void"),
                        vec![shared.clone()],
                    )],
                },
            ],
        };
        let bindings = generate_bindings(&program, &allow, &handlers);

        assert_eq!(bindings.header.matches("WBar_shared_ptr_get(").count(), 1);
        assert_eq!(bindings.header.matches("WBar_shared_ptr_delete(").count(), 1);
        assert_eq!(bindings.source.matches("WBar_shared_ptr_get(").count(), 1);
        assert_eq!(bindings.header.matches("struct WBar;").count(), 1);
        assert!(bindings.header.contains("void Baz_take(WBaz* self, WBar_shared_ptr* param0);"));
        assert_eq!(bindings.stats.converted, 3);
    }

    #[test]
    fn unsupported_method_is_dropped_and_run_continues() {
        let allow = AllowList::from_names(["Widget"]);
        let handlers = HandlerRegistry::with_defaults();
        let mut program = widget_program();
        program.classes[0].methods.insert(
            0,
            method(
                "items",
                MethodKind::Method,
                HostType::template("vector", &["std"], vec![HostType::builtin("int")]),
                vec![],
            ),
        );
        let bindings = generate_bindings(&program, &allow, &handlers);
        assert!(!bindings.header.contains("Widget_items"));
        assert!(bindings.header.contains("Widget_getValue"));
        assert_eq!(bindings.stats.dropped, 1);
        assert_eq!(bindings.stats.converted, 3);
    }
}
