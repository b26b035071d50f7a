//! Whole-unit semantic checks
//!
//! Runs over every parsed unit together: module-level definitions are
//! visible across units, host exports only to units that import them.

use std::collections::{BTreeMap, HashSet};
use void_script::ast::{FieldDecl, Item};
use void_script::{BehaviorDecl, Expr, FunctionDecl, Span, Stmt};

use super::{Diagnostic, ParsedUnit};
use crate::host::HostEnvironment;
use crate::instance::{callback_arity, ENTITY_FIELD, SELF_NAME};

/// Check every unit and return the diagnostics found
pub fn check_units(units: &[ParsedUnit], host: &HostEnvironment) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut globals: BTreeMap<&str, (&str, Span)> = BTreeMap::new();
    let mut behaviors: BTreeMap<&str, (&str, Span)> = BTreeMap::new();
    let mut unit_imports: Vec<Vec<&str>> = Vec::with_capacity(units.len());

    // Definitions and imports
    for unit in units {
        let mut imports: Vec<&str> = Vec::new();

        for item in &unit.program.items {
            match item {
                Item::Use { module, span } => {
                    if !host.contains(module) {
                        diagnostics.push(
                            Diagnostic::error(&unit.name, format!("Unknown host module '{}'", module))
                                .at(*span),
                        );
                    } else if imports.contains(&module.as_str()) {
                        diagnostics.push(
                            Diagnostic::warning(&unit.name, format!("Duplicate import of '{}'", module))
                                .at(*span),
                        );
                    } else {
                        imports.push(module.as_str());
                    }
                }
                Item::Const { name, span, .. } => {
                    define(&mut globals, &mut diagnostics, &unit.name, name, *span, "Name");
                }
                Item::Function(decl) => {
                    define(&mut globals, &mut diagnostics, &unit.name, &decl.name, decl.span, "Name");
                }
                Item::Behavior(decl) => {
                    define(&mut behaviors, &mut diagnostics, &unit.name, &decl.name, decl.span, "Behavior");
                    check_behavior_shape(&unit.name, decl, &mut diagnostics);
                }
            }
        }

        unit_imports.push(imports);
    }

    // Script definitions hidden by a linked host export
    let linked: HashSet<&str> = unit_imports.iter().flatten().copied().collect();
    for (name, (unit, span)) in &globals {
        let shadowed = host
            .names()
            .filter(|m| linked.contains(m))
            .find(|m| host.module(m).map_or(false, |module| module.exports(name)));
        if let Some(module) = shadowed {
            diagnostics.push(
                Diagnostic::warning(
                    *unit,
                    format!(
                        "'{}' shadows host function '{}::{}'; the host definition is used",
                        name, module, name
                    ),
                )
                .at(*span),
            );
        }
    }

    // Bodies
    let all_globals: HashSet<&str> = globals.keys().copied().collect();
    let functions: HashSet<&str> = units
        .iter()
        .flat_map(|unit| unit.program.functions())
        .map(|decl| decl.name.as_str())
        .collect();
    let mut consts_so_far: HashSet<&str> = HashSet::new();

    for (unit, imports) in units.iter().zip(&unit_imports) {
        for item in &unit.program.items {
            match item {
                Item::Const { name, value, .. } => {
                    let visible: HashSet<&str> = functions.union(&consts_so_far).copied().collect();
                    let mut resolver =
                        Resolver::new(&unit.name, host, imports, &visible, &all_globals, &mut diagnostics);
                    resolver.expr(value);
                    consts_so_far.insert(name.as_str());
                }
                Item::Function(decl) => {
                    let mut resolver =
                        Resolver::new(&unit.name, host, imports, &all_globals, &all_globals, &mut diagnostics);
                    resolver.function(decl, false);
                }
                Item::Behavior(decl) => {
                    let mut resolver =
                        Resolver::new(&unit.name, host, imports, &all_globals, &all_globals, &mut diagnostics);
                    for field in &decl.fields {
                        resolver.expr(&field.value);
                    }
                    for method in &decl.methods {
                        resolver.function(method, true);
                    }
                }
                Item::Use { .. } => {}
            }
        }
    }

    diagnostics
}

fn define<'a>(
    table: &mut BTreeMap<&'a str, (&'a str, Span)>,
    diagnostics: &mut Vec<Diagnostic>,
    unit: &'a str,
    name: &'a str,
    span: Span,
    what: &str,
) {
    if let Some((first_unit, first_span)) = table.get(name) {
        diagnostics.push(
            Diagnostic::error(
                unit,
                format!(
                    "{} '{}' is already defined in '{}' at {}",
                    what, name, first_unit, first_span
                ),
            )
            .at(span),
        );
    } else {
        table.insert(name, (unit, span));
    }
}

fn check_behavior_shape(unit: &str, decl: &BehaviorDecl, diagnostics: &mut Vec<Diagnostic>) {
    let mut fields: HashSet<&str> = HashSet::new();
    for FieldDecl { name, span, .. } in &decl.fields {
        if name == ENTITY_FIELD || name == SELF_NAME {
            diagnostics.push(
                Diagnostic::error(unit, format!("Field name '{}' is reserved", name)).at(*span),
            );
        } else if !fields.insert(name.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    unit,
                    format!("Duplicate field '{}' in behavior '{}'", name, decl.name),
                )
                .at(*span),
            );
        }
    }

    let mut methods: HashSet<&str> = HashSet::new();
    for method in &decl.methods {
        if !methods.insert(method.name.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    unit,
                    format!("Duplicate method '{}' in behavior '{}'", method.name, decl.name),
                )
                .at(method.span),
            );
            continue;
        }
        if let Some(expected) = callback_arity(&method.name) {
            if method.params.len() != expected {
                diagnostics.push(
                    Diagnostic::error(
                        unit,
                        format!(
                            "Callback '{}' takes {} parameter(s), found {}",
                            method.name,
                            expected,
                            method.params.len()
                        ),
                    )
                    .at(method.span),
                );
            }
        }
    }

    if !decl.methods.iter().any(|m| callback_arity(&m.name).is_some()) {
        diagnostics.push(
            Diagnostic::warning(
                unit,
                format!("Behavior '{}' has no lifecycle callbacks", decl.name),
            )
            .at(decl.span),
        );
    }
}

/// Name resolution inside one body
struct Resolver<'a, 'd> {
    unit: &'a str,
    host: &'a HostEnvironment,
    imports: &'a [&'a str],
    /// Module-level names visible here
    visible: &'a HashSet<&'a str>,
    /// Every module-level name, for better messages
    all_globals: &'a HashSet<&'a str>,
    scopes: Vec<HashSet<String>>,
    loop_depth: usize,
    diagnostics: &'d mut Vec<Diagnostic>,
}

impl<'a, 'd> Resolver<'a, 'd> {
    fn new(
        unit: &'a str,
        host: &'a HostEnvironment,
        imports: &'a [&'a str],
        visible: &'a HashSet<&'a str>,
        all_globals: &'a HashSet<&'a str>,
        diagnostics: &'d mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            unit,
            host,
            imports,
            visible,
            all_globals,
            scopes: vec![HashSet::new()],
            loop_depth: 0,
            diagnostics,
        }
    }

    fn error(&mut self, span: Span, message: String) {
        self.diagnostics.push(Diagnostic::error(self.unit, message).at(span));
    }

    fn function(&mut self, decl: &FunctionDecl, is_method: bool) {
        let mut frame: HashSet<String> = decl.params.iter().cloned().collect();
        if is_method {
            frame.insert(SELF_NAME.to_string());
        }
        self.nested(frame, |resolver| {
            for stmt in &decl.body {
                resolver.stmt(stmt);
            }
        });
    }

    /// Run `body` as a closure seeing a snapshot of the current locals
    fn nested(&mut self, params: HashSet<String>, body: impl FnOnce(&mut Self)) {
        let mut frame: HashSet<String> = self.scopes.iter().flatten().cloned().collect();
        frame.extend(params);

        let saved_scopes = std::mem::replace(&mut self.scopes, vec![frame]);
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        body(self);
        self.scopes = saved_scopes;
        self.loop_depth = saved_loops;
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn is_imported(&self, name: &str) -> bool {
        self.imports.iter().any(|m| {
            self.host
                .module(m)
                .map_or(false, |module| module.exports(name))
        })
    }

    fn is_module_level(&self, name: &str) -> bool {
        self.visible.contains(name) || self.is_imported(name)
    }

    fn block(&mut self, statements: &[Stmt]) {
        self.scopes.push(HashSet::new());
        for stmt in statements {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.expr(expr),

            Stmt::Let { name, value, .. } => {
                self.expr(value);
                self.declare(name);
            }

            Stmt::Assign { name, value, span } => {
                self.expr(value);
                self.assignment_target(name, *span);
            }

            Stmt::AssignMember {
                object,
                member,
                value,
                span,
            } => {
                self.expr(value);
                if object == SELF_NAME && member == ENTITY_FIELD && self.is_local(SELF_NAME) {
                    self.error(*span, format!("'{}.{}' is read-only", SELF_NAME, ENTITY_FIELD));
                } else {
                    self.assignment_target(object, *span);
                }
            }

            Stmt::Block(statements) => self.block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.expr(condition);
                self.loop_depth += 1;
                self.stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                self.expr(iterable);
                self.scopes.push(HashSet::from([variable.clone()]));
                self.loop_depth += 1;
                self.stmt(body);
                self.loop_depth -= 1;
                self.scopes.pop();
            }

            Stmt::Function(decl) => {
                let params = decl.params.iter().cloned().collect();
                self.nested(params, |resolver| {
                    for stmt in &decl.body {
                        resolver.stmt(stmt);
                    }
                });
                self.declare(&decl.name);
            }

            Stmt::Return(expr) => {
                if let Some(expr) = expr {
                    self.expr(expr);
                }
            }

            Stmt::Break | Stmt::Continue => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt, Stmt::Break) { "break" } else { "continue" };
                    // Loop control statements carry no span of their own
                    self.diagnostics.push(Diagnostic::error(
                        self.unit,
                        format!("'{}' outside of a loop", keyword),
                    ));
                }
            }
        }
    }

    fn assignment_target(&mut self, name: &str, span: Span) {
        if self.is_local(name) {
            return;
        }
        if self.is_module_level(name) || self.all_globals.contains(name) {
            self.error(span, format!("Cannot assign to module-level binding '{}'", name));
        } else {
            self.unresolved(name, span);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Ident { name, span } => self.name(name, *span),
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { expr, .. } => self.expr(expr),
            Expr::Call { callee, args, .. } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            Expr::Member { object, .. } => self.expr(object),
            Expr::Array(elements) => {
                for element in elements {
                    self.expr(element);
                }
            }
            Expr::Object(pairs) => {
                for (_, value) in pairs {
                    self.expr(value);
                }
            }
            Expr::Lambda { params, body } => {
                let params = params.iter().cloned().collect();
                self.nested(params, |resolver| resolver.expr(body));
            }
        }
    }

    fn name(&mut self, name: &str, span: Span) {
        if self.is_local(name) || self.is_module_level(name) {
            return;
        }
        if name == SELF_NAME {
            self.error(
                span,
                format!("'{}' is only available inside behavior methods", SELF_NAME),
            );
        } else if self.all_globals.contains(name) {
            self.error(span, format!("'{}' is used before its definition", name));
        } else {
            self.unresolved(name, span);
        }
    }

    fn unresolved(&mut self, name: &str, span: Span) {
        let message = match self.host.exporter_of(name) {
            Some(module) => format!(
                "'{}' is provided by host module '{}'; add `use {};`",
                name, module, module
            ),
            None => format!("Unresolved name '{}'", name),
        };
        self.error(span, message);
    }
}
