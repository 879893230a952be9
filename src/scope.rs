//! Static lexical-scope analysis.
//!
//! [`analyze`] walks a parsed program once and produces a [`ResolutionMap`]
//! from identifier nodes to [`VariableId`]s. Hoisting happens here, not at
//! run time: `var` declarators attach to the nearest function (or global)
//! scope, `let`/`const`/`class` and function declarations to the nearest
//! block. Each resolvable identifier node maps to exactly one variable by
//! construction.
//!
//! Identifiers that resolve to nothing are simply absent from the map; the
//! evaluator falls back to the global object for them (reads raise a
//! ReferenceError when the global has no such property, writes auto-vivify).

use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::value::{CheapClone, JsString};

/// Identity of one declared binding. Many identifier nodes may resolve to the
/// same variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// How a variable was declared. Drives initialization semantics in the store:
/// `Let`/`Const`/`Class` reads before their declarator executes raise a
/// ReferenceError, `Const` rebinding raises a TypeError.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Param,
}

impl BindingKind {
    /// Whether reads must observe the declarator before the first read.
    pub fn is_lexical(self) -> bool {
        matches!(self, BindingKind::Let | BindingKind::Const | BindingKind::Class)
    }
}

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub name: JsString,
    pub kind: BindingKind,
}

/// Output of the analysis pass.
#[derive(Debug, Default)]
pub struct ResolutionMap {
    resolutions: FxHashMap<NodeId, VariableId>,
    variables: Vec<VariableRecord>,
}

impl ResolutionMap {
    pub fn resolve(&self, node: NodeId) -> Option<VariableId> {
        self.resolutions.get(&node).copied()
    }

    pub fn record(&self, variable: VariableId) -> &VariableRecord {
        &self.variables[variable.0 as usize]
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    fn fresh(&mut self, name: JsString, kind: BindingKind) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(VariableRecord { name, kind });
        id
    }
}

/// Analyze a program. Pure; the AST is not modified.
pub fn analyze(program: &Program) -> ResolutionMap {
    let mut analyzer = Analyzer {
        map: ResolutionMap::default(),
        scopes: Vec::new(),
    };
    analyzer.enter(ScopeKind::Function);
    analyzer.hoist_var_deep(&program.body);
    analyzer.hoist_block(&program.body);
    for statement in &program.body {
        analyzer.visit_statement(statement);
    }
    analyzer.map
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Function,
    Block,
}

struct Scope {
    kind: ScopeKind,
    bindings: FxHashMap<JsString, VariableId>,
}

struct Analyzer {
    map: ResolutionMap,
    scopes: Vec<Scope>,
}

impl Analyzer {
    fn enter(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: FxHashMap::default(),
        });
    }

    fn leave(&mut self) {
        self.scopes.pop();
    }

    /// Declare `name` in the current scope, or in the nearest function scope
    /// for `var`-kind bindings. Redeclaration of the same name in the same
    /// scope reuses the existing variable.
    fn declare(&mut self, name: &JsString, kind: BindingKind) -> VariableId {
        let index = if kind == BindingKind::Var {
            self.scopes
                .iter()
                .rposition(|s| s.kind == ScopeKind::Function)
                .unwrap_or(0)
        } else {
            self.scopes.len().saturating_sub(1)
        };
        if let Some(existing) = self.scopes[index].bindings.get(name) {
            return *existing;
        }
        let id = self.map.fresh(name.cheap_clone(), kind);
        self.scopes[index].bindings.insert(name.cheap_clone(), id);
        id
    }

    fn resolve_use(&mut self, identifier: &Identifier) {
        for scope in self.scopes.iter().rev() {
            if let Some(variable) = scope.bindings.get(&identifier.name) {
                self.map.resolutions.insert(identifier.id, *variable);
                return;
            }
        }
        // Unresolved: global fallback at run time.
    }

    // ---- hoisting ----

    /// Collect `var` declarators into the current (function) scope, looking
    /// through nested blocks and control flow but not into nested functions.
    fn hoist_var_deep(&mut self, body: &[Statement]) {
        for statement in body {
            self.hoist_var_statement(statement);
        }
    }

    fn hoist_var_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) if decl.kind == VariableKind::Var => {
                for declarator in &decl.declarations {
                    self.declare_pattern(&declarator.pattern, BindingKind::Var);
                }
            }
            Statement::Block(block) => self.hoist_var_deep(&block.body),
            Statement::If(stmt) => {
                self.hoist_var_statement(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.hoist_var_statement(alternate);
                }
            }
            Statement::For(stmt) => {
                if let Some(ForInit::Variable(decl)) = &stmt.init {
                    if decl.kind == VariableKind::Var {
                        for declarator in &decl.declarations {
                            self.declare_pattern(&declarator.pattern, BindingKind::Var);
                        }
                    }
                }
                self.hoist_var_statement(&stmt.body);
            }
            Statement::ForIn(stmt) => {
                self.hoist_var_for_left(&stmt.left);
                self.hoist_var_statement(&stmt.body);
            }
            Statement::ForOf(stmt) => {
                self.hoist_var_for_left(&stmt.left);
                self.hoist_var_statement(&stmt.body);
            }
            Statement::While(stmt) => self.hoist_var_statement(&stmt.body),
            Statement::DoWhile(stmt) => self.hoist_var_statement(&stmt.body),
            Statement::Try(stmt) => {
                self.hoist_var_deep(&stmt.block.body);
                if let Some(handler) = &stmt.handler {
                    self.hoist_var_deep(&handler.body.body);
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.hoist_var_deep(&finalizer.body);
                }
            }
            Statement::Labeled(stmt) => self.hoist_var_statement(&stmt.body),
            _ => {}
        }
    }

    fn hoist_var_for_left(&mut self, left: &ForInOfLeft) {
        if let ForInOfLeft::Variable(decl) = left {
            if decl.kind == VariableKind::Var {
                for declarator in &decl.declarations {
                    self.declare_pattern(&declarator.pattern, BindingKind::Var);
                }
            }
        }
    }

    /// Declare this block's own lexical names and function declarations
    /// before its statements are visited.
    fn hoist_block(&mut self, body: &[Statement]) {
        for statement in body {
            match statement {
                Statement::VariableDeclaration(decl) if decl.kind != VariableKind::Var => {
                    let kind = match decl.kind {
                        VariableKind::Let => BindingKind::Let,
                        _ => BindingKind::Const,
                    };
                    for declarator in &decl.declarations {
                        self.declare_pattern(&declarator.pattern, kind);
                    }
                }
                Statement::FunctionDeclaration(decl) => {
                    let id = self.declare(&decl.name.name, BindingKind::Function);
                    self.map.resolutions.insert(decl.name.id, id);
                }
                Statement::ClassDeclaration(decl) => {
                    let id = self.declare(&decl.name.name, BindingKind::Class);
                    self.map.resolutions.insert(decl.name.id, id);
                }
                _ => {}
            }
        }
    }

    /// Declare every identifier leaf of a binding pattern and resolve the
    /// leaf nodes to their new variables. Computed keys and defaults are
    /// expressions and are visited separately at evaluation order.
    fn declare_pattern(&mut self, pattern: &Pattern, kind: BindingKind) {
        match pattern {
            Pattern::Identifier(identifier) => {
                let id = self.declare(&identifier.name, kind);
                self.map.resolutions.insert(identifier.id, id);
            }
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.declare_pattern(element, kind);
                }
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPatternProperty::KeyValue { value, .. } => {
                            self.declare_pattern(value, kind);
                        }
                        ObjectPatternProperty::Rest(rest) => {
                            self.declare_pattern(&rest.argument, kind);
                        }
                    }
                }
            }
            Pattern::Default(default) => self.declare_pattern(&default.target, kind),
            Pattern::Rest(rest) => self.declare_pattern(&rest.argument, kind),
        }
    }

    /// Visit expression positions inside a pattern (computed keys, default
    /// value expressions), which reference the surrounding scope.
    fn visit_pattern_expressions(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Identifier(_) => {}
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.visit_pattern_expressions(element);
                }
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPatternProperty::KeyValue { key, value, .. } => {
                            if let PropertyName::Computed(expr) = key {
                                self.visit_expression(expr);
                            }
                            self.visit_pattern_expressions(value);
                        }
                        ObjectPatternProperty::Rest(rest) => {
                            self.visit_pattern_expressions(&rest.argument);
                        }
                    }
                }
            }
            Pattern::Default(default) => {
                self.visit_pattern_expressions(&default.target);
                self.visit_expression(&default.default);
            }
            Pattern::Rest(rest) => self.visit_pattern_expressions(&rest.argument),
        }
    }

    // ---- statements ----

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    if let Some(init) = &declarator.init {
                        self.visit_expression(init);
                    }
                    self.visit_pattern_expressions(&declarator.pattern);
                }
            }
            Statement::FunctionDeclaration(decl) => {
                self.visit_function(Some(&decl.name), &decl.params, &decl.body);
            }
            Statement::ClassDeclaration(decl) => {
                if let Some(super_class) = &decl.super_class {
                    self.visit_expression(super_class);
                }
                for member in &decl.members {
                    self.visit_function_parts(&member.params, &member.body.body);
                }
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::If(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement_scoped(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.visit_statement_scoped(alternate);
                }
            }
            Statement::For(stmt) => {
                self.enter(ScopeKind::Block);
                match &stmt.init {
                    Some(ForInit::Variable(decl)) => {
                        self.hoist_declaration(decl);
                        for declarator in &decl.declarations {
                            if let Some(init) = &declarator.init {
                                self.visit_expression(init);
                            }
                            self.visit_pattern_expressions(&declarator.pattern);
                        }
                    }
                    Some(ForInit::Expression(expr)) => self.visit_expression(expr),
                    None => {}
                }
                if let Some(test) = &stmt.test {
                    self.visit_expression(test);
                }
                if let Some(update) = &stmt.update {
                    self.visit_expression(update);
                }
                self.visit_statement_scoped(&stmt.body);
                self.leave();
            }
            Statement::ForIn(stmt) => self.visit_for_in_of(&stmt.left, &stmt.right, &stmt.body),
            Statement::ForOf(stmt) => self.visit_for_in_of(&stmt.left, &stmt.right, &stmt.body),
            Statement::While(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement_scoped(&stmt.body);
            }
            Statement::DoWhile(stmt) => {
                self.visit_statement_scoped(&stmt.body);
                self.visit_expression(&stmt.test);
            }
            Statement::Try(stmt) => {
                self.visit_block(&stmt.block);
                if let Some(handler) = &stmt.handler {
                    self.enter(ScopeKind::Block);
                    if let Some(param) = &handler.param {
                        self.declare_pattern(param, BindingKind::Let);
                        self.visit_pattern_expressions(param);
                    }
                    self.hoist_block(&handler.body.body);
                    for inner in &handler.body.body {
                        self.visit_statement(inner);
                    }
                    self.leave();
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.visit_block(finalizer);
                }
            }
            Statement::Return(stmt) => {
                if let Some(argument) = &stmt.argument {
                    self.visit_expression(argument);
                }
            }
            Statement::Throw(stmt) => self.visit_expression(&stmt.argument),
            Statement::Expression(stmt) => self.visit_expression(&stmt.expression),
            Statement::Switch(stmt) => {
                // Unsupported at evaluation time, but resolved anyway so that
                // `skip_unsupported_nodes` leaves a consistent map.
                self.visit_expression(&stmt.discriminant);
                self.enter(ScopeKind::Block);
                for case in &stmt.cases {
                    if let Some(test) = &case.test {
                        self.visit_expression(test);
                    }
                    self.hoist_block(&case.consequent);
                    for inner in &case.consequent {
                        self.visit_statement(inner);
                    }
                }
                self.leave();
            }
            Statement::Labeled(stmt) => self.visit_statement_scoped(&stmt.body),
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Empty(_)
            | Statement::Debugger(_) => {}
        }
    }

    fn hoist_declaration(&mut self, decl: &VariableDeclaration) {
        let kind = match decl.kind {
            VariableKind::Let => BindingKind::Let,
            VariableKind::Const => BindingKind::Const,
            VariableKind::Var => BindingKind::Var,
        };
        for declarator in &decl.declarations {
            self.declare_pattern(&declarator.pattern, kind);
        }
    }

    fn visit_for_in_of(&mut self, left: &ForInOfLeft, right: &Expression, body: &Statement) {
        self.visit_expression(right);
        self.enter(ScopeKind::Block);
        match left {
            ForInOfLeft::Variable(decl) => self.hoist_declaration(decl),
            ForInOfLeft::Pattern(pattern) => {
                if let Pattern::Identifier(identifier) = pattern {
                    self.resolve_use(identifier);
                }
            }
        }
        self.visit_statement_scoped(body);
        self.leave();
    }

    /// A statement in body position gets its own block scope when it is a
    /// block; otherwise it shares the surrounding scope.
    fn visit_statement_scoped(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.visit_block(block),
            other => self.visit_statement(other),
        }
    }

    fn visit_block(&mut self, block: &BlockStatement) {
        self.enter(ScopeKind::Block);
        self.hoist_block(&block.body);
        for statement in &block.body {
            self.visit_statement(statement);
        }
        self.leave();
    }

    // ---- functions ----

    fn visit_function(
        &mut self,
        name: Option<&Identifier>,
        params: &[Pattern],
        body: &BlockStatement,
    ) {
        self.enter(ScopeKind::Function);
        // A named function expression can refer to itself by name.
        if let Some(name) = name {
            if self.map.resolve(name.id).is_none() {
                let id = self.declare(&name.name, BindingKind::Function);
                self.map.resolutions.insert(name.id, id);
            }
        }
        for param in params {
            self.declare_pattern(param, BindingKind::Param);
        }
        for param in params {
            self.visit_pattern_expressions(param);
        }
        self.hoist_var_deep(&body.body);
        self.hoist_block(&body.body);
        for statement in &body.body {
            self.visit_statement(statement);
        }
        self.leave();
    }

    fn visit_function_parts(&mut self, params: &[Pattern], body: &[Statement]) {
        self.enter(ScopeKind::Function);
        for param in params {
            self.declare_pattern(param, BindingKind::Param);
        }
        for param in params {
            self.visit_pattern_expressions(param);
        }
        self.hoist_var_deep(body);
        self.hoist_block(body);
        for statement in body {
            self.visit_statement(statement);
        }
        self.leave();
    }

    // ---- expressions ----

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(_)
            | Expression::This(_)
            | Expression::Super(_) => {}
            Expression::Identifier(identifier) => self.resolve_use(identifier),
            Expression::Array(array) => {
                for element in array.elements.iter().flatten() {
                    match element {
                        ArrayElement::Expression(expr) => self.visit_expression(expr),
                        ArrayElement::Spread(spread) => self.visit_expression(&spread.argument),
                    }
                }
            }
            Expression::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectProperty::Data { key, value, .. } => {
                            if let PropertyName::Computed(expr) = key {
                                self.visit_expression(expr);
                            }
                            self.visit_expression(value);
                        }
                        ObjectProperty::Shorthand(identifier) => self.resolve_use(identifier),
                        ObjectProperty::Method(method)
                        | ObjectProperty::Getter(method)
                        | ObjectProperty::Setter(method) => {
                            if let PropertyName::Computed(expr) = &method.key {
                                self.visit_expression(expr);
                            }
                            self.visit_function_parts(&method.params, &method.body.body);
                        }
                    }
                }
            }
            Expression::Function(function) => {
                self.visit_function(function.name.as_ref(), &function.params, &function.body);
            }
            Expression::Arrow(arrow) => match &arrow.body {
                ArrowBody::Block(block) => {
                    self.visit_function_parts_with(&arrow.params, |a| {
                        a.hoist_var_deep(&block.body);
                        a.hoist_block(&block.body);
                        for statement in &block.body {
                            a.visit_statement(statement);
                        }
                    });
                }
                ArrowBody::Expression(expr) => {
                    self.visit_function_parts_with(&arrow.params, |a| {
                        a.visit_expression(expr);
                    });
                }
            },
            Expression::Binary(binary) => {
                self.visit_expression(&binary.left);
                self.visit_expression(&binary.right);
            }
            Expression::Logical(logical) => {
                self.visit_expression(&logical.left);
                self.visit_expression(&logical.right);
            }
            Expression::Unary(unary) => self.visit_expression(&unary.argument),
            Expression::Update(update) => self.visit_target(&update.target),
            Expression::Assignment(assignment) => {
                self.visit_target(&assignment.target);
                self.visit_expression(&assignment.value);
            }
            Expression::Conditional(conditional) => {
                self.visit_expression(&conditional.test);
                self.visit_expression(&conditional.consequent);
                self.visit_expression(&conditional.alternate);
            }
            Expression::Call(call) => {
                self.visit_expression(&call.callee);
                self.visit_arguments(&call.arguments);
            }
            Expression::New(new) => {
                self.visit_expression(&new.callee);
                self.visit_arguments(&new.arguments);
            }
            Expression::Member(member) => {
                self.visit_expression(&member.object);
                if let MemberProperty::Computed(expr) = &member.property {
                    self.visit_expression(expr);
                }
            }
            Expression::Sequence(sequence) => {
                for expr in &sequence.expressions {
                    self.visit_expression(expr);
                }
            }
        }
    }

    fn visit_function_parts_with(&mut self, params: &[Pattern], body: impl FnOnce(&mut Self)) {
        self.enter(ScopeKind::Function);
        for param in params {
            self.declare_pattern(param, BindingKind::Param);
        }
        for param in params {
            self.visit_pattern_expressions(param);
        }
        body(self);
        self.leave();
    }

    fn visit_target(&mut self, target: &AssignmentTarget) {
        match target {
            AssignmentTarget::Identifier(identifier) => self.resolve_use(identifier),
            AssignmentTarget::Member(member) => {
                self.visit_expression(&member.object);
                if let MemberProperty::Computed(expr) = &member.property {
                    self.visit_expression(expr);
                }
            }
        }
    }

    fn visit_arguments(&mut self, arguments: &[Argument]) {
        for argument in arguments {
            match argument {
                Argument::Expression(expr) => self.visit_expression(expr),
                Argument::Spread(spread) => self.visit_expression(&spread.argument),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::parser::parse;

    fn analyzed(source: &str) -> (Program, ResolutionMap) {
        let program = parse(source).expect("parse failed");
        let map = analyze(&program);
        (program, map)
    }

    fn first_declarator_variable(program: &Program, map: &ResolutionMap) -> VariableId {
        let Statement::VariableDeclaration(decl) = &program.body[0] else {
            panic!("expected a declaration");
        };
        let Pattern::Identifier(identifier) = &decl.declarations[0].pattern else {
            panic!("expected an identifier pattern");
        };
        map.resolve(identifier.id).expect("unresolved declarator")
    }

    #[test]
    fn reads_resolve_to_declaration() {
        let (program, map) = analyzed("let a = 1; a;");
        let declared = first_declarator_variable(&program, &map);
        let Statement::Expression(stmt) = &program.body[1] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(read) = &stmt.expression else {
            panic!("expected an identifier");
        };
        assert_eq!(map.resolve(read.id), Some(declared));
    }

    #[test]
    fn block_scoped_let_shadows() {
        let (program, map) = analyzed("let a = 1; { let a = 2; a; } a;");
        let outer = first_declarator_variable(&program, &map);
        let Statement::Block(block) = &program.body[1] else {
            panic!("expected a block");
        };
        let Statement::Expression(inner_read) = &block.body[1] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(inner) = &inner_read.expression else {
            panic!("expected an identifier");
        };
        let inner_var = map.resolve(inner.id).expect("unresolved inner read");
        assert_ne!(inner_var, outer);
        let Statement::Expression(outer_read) = &program.body[2] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(after) = &outer_read.expression else {
            panic!("expected an identifier");
        };
        assert_eq!(map.resolve(after.id), Some(outer));
    }

    #[test]
    fn var_escapes_blocks_but_not_functions() {
        let (program, map) = analyzed("{ var a = 1; } a; function f() { var b; } b;");
        let Statement::Expression(read_a) = &program.body[1] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(a) = &read_a.expression else {
            panic!("expected an identifier");
        };
        assert!(map.resolve(a.id).is_some());
        let Statement::Expression(read_b) = &program.body[3] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(b) = &read_b.expression else {
            panic!("expected an identifier");
        };
        assert!(map.resolve(b.id).is_none());
    }

    #[test]
    fn closures_capture_outer_variables() {
        let (program, map) = analyzed("let n = 0; let f = () => n + 1;");
        let outer = first_declarator_variable(&program, &map);
        let Statement::VariableDeclaration(decl) = &program.body[1] else {
            panic!("expected a declaration");
        };
        let Some(Expression::Arrow(arrow)) = &decl.declarations[0].init else {
            panic!("expected an arrow initializer");
        };
        let ArrowBody::Expression(body) = &arrow.body else {
            panic!("expected an expression body");
        };
        let Expression::Binary(binary) = body.as_ref() else {
            panic!("expected a binary expression");
        };
        let Expression::Identifier(read) = binary.left.as_ref() else {
            panic!("expected an identifier");
        };
        assert_eq!(map.resolve(read.id), Some(outer));
    }

    #[test]
    fn params_shadow_outer_bindings() {
        let (program, map) = analyzed("let x = 1; function f(x) { return x; }");
        let outer = first_declarator_variable(&program, &map);
        let Statement::FunctionDeclaration(decl) = &program.body[1] else {
            panic!("expected a function declaration");
        };
        let Statement::Return(ret) = &decl.body.body[0] else {
            panic!("expected a return");
        };
        let Some(Expression::Identifier(read)) = &ret.argument else {
            panic!("expected an identifier");
        };
        let inner = map.resolve(read.id).expect("unresolved param read");
        assert_ne!(inner, outer);
        assert_eq!(map.record(inner).kind, BindingKind::Param);
    }

    #[test]
    fn function_declarations_are_usable_before_their_position() {
        let (program, map) = analyzed("f(); function f() {}");
        let Statement::Expression(stmt) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        let Expression::Call(call) = &stmt.expression else {
            panic!("expected a call");
        };
        let Expression::Identifier(callee) = call.callee.as_ref() else {
            panic!("expected an identifier callee");
        };
        assert!(map.resolve(callee.id).is_some());
    }

    #[test]
    fn undeclared_names_stay_unresolved() {
        let (program, map) = analyzed("missing;");
        let Statement::Expression(stmt) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(read) = &stmt.expression else {
            panic!("expected an identifier");
        };
        assert!(map.resolve(read.id).is_none());
    }

    #[test]
    fn catch_param_is_scoped_to_the_handler() {
        let (program, map) = analyzed("try {} catch (e) { e; } ");
        let Statement::Try(stmt) = &program.body[0] else {
            panic!("expected a try statement");
        };
        let handler = stmt.handler.as_ref().expect("missing handler");
        let Statement::Expression(read) = &handler.body.body[0] else {
            panic!("expected an expression statement");
        };
        let Expression::Identifier(e) = &read.expression else {
            panic!("expected an identifier");
        };
        assert!(map.resolve(e.id).is_some());
    }
}
