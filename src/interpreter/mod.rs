//! The tree-walking evaluator.
//!
//! Statement dispatch, control-flow signal propagation, hoisting, function
//! invocation, and class construction live here; expression dispatch is in
//! [`expr`], binding patterns in [`bind`], operator semantics in
//! [`operators`], and session state in [`store`].
//!
//! In stepping mode every statement, declarator, and expression boundary is a
//! suspension point: the evaluator announces the node over the stepping
//! channel and blocks until the scheduler permits it to proceed. While
//! blocked it services introspection queries against the live session.

pub(crate) mod bind;
mod expr;
pub mod operators;
pub mod store;

use std::sync::Arc;

use crate::Config;
use crate::ast::{
    BlockStatement, ClassDeclaration, DoWhileStatement, ForInOfLeft, ForInStatement, ForInit,
    ForOfStatement, ForStatement, Identifier, NodeId, NodeKind, Program, Statement, TryStatement,
    VariableDeclaration, VariableKind, WhileStatement,
};
use crate::error::Error;
use crate::schedule::{ControlMsg, EvalEvent, StepLink};
use crate::scope::ResolutionMap;
use crate::value::{
    Callable, CheapClone, ClassRecord, ClassRef, ClosureRecord, FunctionBody, FunctionRecord,
    FunctionRef, ObjectKind, Property, PropertyKey, RuntimeValue, ThisMode, create_array,
    create_object,
};

pub use store::{ContextId, Session};

/// Outcome of evaluating a statement or block: a plain value, or a
/// control-flow signal being propagated to its consumer.
#[derive(Debug)]
pub enum Completion {
    Normal(RuntimeValue),
    Return(RuntimeValue),
    Break,
    Continue,
}

impl Completion {
    fn empty() -> Completion {
        Completion::Normal(RuntimeValue::Undefined)
    }

    pub fn into_value(self) -> RuntimeValue {
        match self {
            Completion::Normal(value) | Completion::Return(value) => value,
            Completion::Break | Completion::Continue => RuntimeValue::Undefined,
        }
    }
}

/// Result of one function invocation. `explicit_return` distinguishes a
/// `return` statement from a body falling off the end, which matters for the
/// constructor-return-object override in `new`.
pub(crate) struct CallOutcome {
    pub value: RuntimeValue,
    pub explicit_return: bool,
}

pub struct Interpreter {
    map: Arc<ResolutionMap>,
    config: Config,
    pub session: Session,
    stepper: Option<StepLink>,
    /// Set while evaluating a mid-pause introspection query, so the query
    /// itself does not announce suspension points.
    in_query: bool,
    /// Classes whose constructor is currently executing, for `super(...)`.
    class_stack: Vec<ClassRef>,
}

impl Interpreter {
    pub fn new(map: Arc<ResolutionMap>, config: Config, session: Session) -> Self {
        Self {
            map,
            config,
            session,
            stepper: None,
            in_query: false,
            class_stack: Vec::new(),
        }
    }

    pub(crate) fn with_stepper(
        map: Arc<ResolutionMap>,
        config: Config,
        session: Session,
        stepper: StepLink,
    ) -> Self {
        let mut interpreter = Self::new(map, config, session);
        interpreter.stepper = Some(stepper);
        interpreter
    }

    /// Announce a suspension point and block until the scheduler resumes us.
    /// A no-op in run-to-completion mode. Queries received while blocked are
    /// serviced against the live session.
    fn pause_point(&mut self, node: NodeId, kind: NodeKind) -> Result<(), Error> {
        if self.in_query {
            return Ok(());
        }
        let Some(link) = &self.stepper else {
            return Ok(());
        };
        let (events, control) = (link.events.clone(), link.control.clone());
        tracing::trace!(%node, %kind, "suspended");
        events
            .send(EvalEvent::Suspended { node, kind })
            .map_err(|_| Error::internal("stepping channel closed"))?;
        loop {
            let message = control
                .recv()
                .map_err(|_| Error::internal("stepping channel closed"))?;
            match message {
                ControlMsg::Resume => return Ok(()),
                ControlMsg::GetVariable { node, reply } => {
                    let result = read_variable(&self.map, &self.session, node);
                    let _ = reply.send(result);
                }
                ControlMsg::EvaluateExpression { expression, reply } => {
                    self.in_query = true;
                    let result = self.eval_expression(&expression);
                    self.in_query = false;
                    let _ = reply.send(result);
                }
                ControlMsg::EvaluateStatement { statement, reply } => {
                    self.in_query = true;
                    let result = self.execute_statement(&statement).map(Completion::into_value);
                    self.in_query = false;
                    let _ = reply.send(result);
                }
            }
        }
    }

    // ---- program & statements ----

    /// Evaluate a whole program. The result is the value of the last
    /// normally-completed statement.
    pub fn execute_program(&mut self, program: &Program) -> Result<RuntimeValue, Error> {
        self.pause_point(program.id, NodeKind::Script)?;
        self.hoist(&program.body)?;
        let mut result = RuntimeValue::Undefined;
        for statement in &program.body {
            match self.execute_statement(statement)? {
                Completion::Normal(value) => result = value,
                Completion::Return(value) => return Ok(value),
                Completion::Break => {
                    return Err(Error::internal("'break' outside of a loop"));
                }
                Completion::Continue => {
                    return Err(Error::internal("'continue' outside of a loop"));
                }
            }
        }
        Ok(result)
    }

    pub fn execute_statement(&mut self, statement: &Statement) -> Result<Completion, Error> {
        self.pause_point(statement.node_id(), statement.kind())?;
        match self.dispatch_statement(statement) {
            Err(Error::Unsupported { kind, node }) if self.config.skip_unsupported_nodes => {
                tracing::debug!(%kind, %node, "skipping unsupported node");
                Ok(Completion::empty())
            }
            other => other,
        }
    }

    fn dispatch_statement(&mut self, statement: &Statement) -> Result<Completion, Error> {
        match statement {
            Statement::VariableDeclaration(decl) => self.execute_declaration(decl),
            // Executed at hoisting time; a no-op in source order.
            Statement::FunctionDeclaration(_) => Ok(Completion::empty()),
            Statement::ClassDeclaration(decl) => self.execute_class(decl),
            Statement::Block(block) => self.execute_block(block),
            Statement::If(stmt) => {
                if self.eval_expression(&stmt.test)?.to_boolean() {
                    self.execute_statement(&stmt.consequent)
                } else if let Some(alternate) = &stmt.alternate {
                    self.execute_statement(alternate)
                } else {
                    Ok(Completion::empty())
                }
            }
            Statement::For(stmt) => self.execute_for(stmt),
            Statement::ForIn(stmt) => self.execute_for_in(stmt),
            Statement::ForOf(stmt) => self.execute_for_of(stmt),
            Statement::While(stmt) => self.execute_while(stmt),
            Statement::DoWhile(stmt) => self.execute_do_while(stmt),
            Statement::Try(stmt) => self.execute_try(stmt),
            Statement::Return(stmt) => {
                let value = match &stmt.argument {
                    Some(argument) => self.eval_expression(argument)?,
                    None => RuntimeValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Break(_) => Ok(Completion::Break),
            Statement::Continue(_) => Ok(Completion::Continue),
            Statement::Throw(stmt) => {
                let value = self.eval_expression(&stmt.argument)?;
                Err(Error::thrown(value))
            }
            Statement::Expression(stmt) => {
                Ok(Completion::Normal(self.eval_expression(&stmt.expression)?))
            }
            Statement::Switch(_) | Statement::Labeled(_) => Err(Error::Unsupported {
                kind: statement.kind(),
                node: statement.node_id(),
            }),
            Statement::Empty(_) | Statement::Debugger(_) => Ok(Completion::empty()),
        }
    }

    fn execute_declaration(&mut self, decl: &VariableDeclaration) -> Result<Completion, Error> {
        for declarator in &decl.declarations {
            self.pause_point(declarator.id, NodeKind::VariableDeclarator)?;
            let value = match &declarator.init {
                Some(init) => self.eval_expression(init)?,
                None => RuntimeValue::Undefined,
            };
            self.bind_pattern(&declarator.pattern, value)?;
        }
        Ok(Completion::empty())
    }

    /// Evaluate a block: hoist, then run statements in order, halting on the
    /// first control-flow signal.
    pub(crate) fn execute_block(&mut self, block: &BlockStatement) -> Result<Completion, Error> {
        self.execute_block_body(&block.body)
    }

    fn execute_block_body(&mut self, body: &[Statement]) -> Result<Completion, Error> {
        self.hoist(body)?;
        let mut result = RuntimeValue::Undefined;
        for statement in body {
            match self.execute_statement(statement)? {
                Completion::Normal(value) => result = value,
                signal => return Ok(signal),
            }
        }
        Ok(Completion::Normal(result))
    }

    /// Block-entry hoisting: function declarations become live closures, and
    /// `var` declarators are pre-bound to `undefined`.
    fn hoist(&mut self, body: &[Statement]) -> Result<(), Error> {
        for statement in body {
            match statement {
                Statement::FunctionDeclaration(decl) => {
                    let closure = FunctionRecord::closure(ClosureRecord {
                        name: Some(decl.name.name.cheap_clone()),
                        params: decl.params.clone(),
                        body: FunctionBody::Block(Arc::new(decl.body.clone())),
                        this_mode: ThisMode::Dynamic,
                    });
                    let variable = self.map.resolve(decl.name.id).ok_or_else(|| {
                        Error::internal(format!("unresolved function declaration '{}'", decl.name.name))
                    })?;
                    self.session.store.set(variable, RuntimeValue::Function(closure));
                }
                Statement::VariableDeclaration(decl) if decl.kind == VariableKind::Var => {
                    for declarator in &decl.declarations {
                        let mut identifiers = Vec::new();
                        bind::pattern_identifiers(&declarator.pattern, &mut identifiers);
                        for identifier in identifiers {
                            if let Some(variable) = self.map.resolve(identifier.id) {
                                if !self.session.store.is_initialized(variable) {
                                    self.session.store.set(variable, RuntimeValue::Undefined);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ---- loops ----

    fn execute_while(&mut self, stmt: &WhileStatement) -> Result<Completion, Error> {
        self.session.loops.push(stmt.id);
        let result = (|| {
            while self.eval_expression(&stmt.test)?.to_boolean() {
                match self.execute_statement(&stmt.body)? {
                    Completion::Break => break,
                    Completion::Continue | Completion::Normal(_) => {}
                    ret @ Completion::Return(_) => return Ok(ret),
                }
            }
            Ok(Completion::empty())
        })();
        self.session.loops.pop();
        result
    }

    fn execute_do_while(&mut self, stmt: &DoWhileStatement) -> Result<Completion, Error> {
        self.session.loops.push(stmt.id);
        let result = (|| {
            loop {
                match self.execute_statement(&stmt.body)? {
                    Completion::Break => break,
                    Completion::Continue | Completion::Normal(_) => {}
                    ret @ Completion::Return(_) => return Ok(ret),
                }
                if !self.eval_expression(&stmt.test)?.to_boolean() {
                    break;
                }
            }
            Ok(Completion::empty())
        })();
        self.session.loops.pop();
        result
    }

    fn execute_for(&mut self, stmt: &ForStatement) -> Result<Completion, Error> {
        match &stmt.init {
            Some(ForInit::Variable(decl)) => {
                self.execute_declaration(decl)?;
            }
            Some(ForInit::Expression(expr)) => {
                self.eval_expression(expr)?;
            }
            None => {}
        }
        self.session.loops.push(stmt.id);
        let result = (|| {
            loop {
                if let Some(test) = &stmt.test {
                    if !self.eval_expression(test)?.to_boolean() {
                        break;
                    }
                }
                match self.execute_statement(&stmt.body)? {
                    Completion::Break => break,
                    Completion::Continue | Completion::Normal(_) => {}
                    ret @ Completion::Return(_) => return Ok(ret),
                }
                if let Some(update) = &stmt.update {
                    self.eval_expression(update)?;
                }
            }
            Ok(Completion::empty())
        })();
        self.session.loops.pop();
        result
    }

    fn execute_for_in(&mut self, stmt: &ForInStatement) -> Result<Completion, Error> {
        let subject = self.eval_expression(&stmt.right)?;
        let keys: Vec<RuntimeValue> = match &subject {
            RuntimeValue::Object(obj) => obj
                .read()
                .enumerable_keys()
                .into_iter()
                .map(|key| RuntimeValue::String(key.to_string().into()))
                .collect(),
            RuntimeValue::String(s) => (0..s.chars().count())
                .map(|i| RuntimeValue::String(i.to_string().into()))
                .collect(),
            // Enumerating a primitive visits nothing.
            _ => Vec::new(),
        };
        self.iterate(stmt.id, &stmt.left, keys, &stmt.body)
    }

    fn execute_for_of(&mut self, stmt: &ForOfStatement) -> Result<Completion, Error> {
        let subject = self.eval_expression(&stmt.right)?;
        let items = self.iterable_values(&subject)?;
        self.iterate(stmt.id, &stmt.left, items, &stmt.body)
    }

    fn iterate(
        &mut self,
        loop_node: NodeId,
        left: &ForInOfLeft,
        items: Vec<RuntimeValue>,
        body: &Statement,
    ) -> Result<Completion, Error> {
        self.session.loops.push(loop_node);
        let result = (|| {
            for item in items {
                match left {
                    ForInOfLeft::Variable(decl) => {
                        let Some(declarator) = decl.declarations.first() else {
                            return Err(Error::internal("loop declaration without declarator"));
                        };
                        self.bind_pattern(&declarator.pattern, item)?;
                    }
                    ForInOfLeft::Pattern(pattern) => {
                        self.bind_pattern(pattern, item)?;
                    }
                }
                match self.execute_statement(body)? {
                    Completion::Break => break,
                    Completion::Continue | Completion::Normal(_) => {}
                    ret @ Completion::Return(_) => return Ok(ret),
                }
            }
            Ok(Completion::empty())
        })();
        self.session.loops.pop();
        result
    }

    // ---- try/catch/finally ----

    fn execute_try(&mut self, stmt: &TryStatement) -> Result<Completion, Error> {
        let outcome = match self.execute_block(&stmt.block) {
            Err(Error::Thrown { value }) => match &stmt.handler {
                Some(handler) => {
                    let bound = match &handler.param {
                        Some(param) => self.bind_pattern(param, value),
                        None => Ok(()),
                    };
                    match bound {
                        Ok(()) => self.execute_block(&handler.body),
                        Err(error) => Err(error),
                    }
                }
                None => Err(Error::thrown(value)),
            },
            other => other,
        };
        // The finally block runs on every exit path; a control-flow signal it
        // produces overrides the try/catch outcome.
        if let Some(finalizer) = &stmt.finalizer {
            match self.execute_block(finalizer)? {
                Completion::Normal(_) => {}
                overriding => return Ok(overriding),
            }
        }
        outcome
    }

    // ---- classes ----

    fn execute_class(&mut self, decl: &ClassDeclaration) -> Result<Completion, Error> {
        let parent = match &decl.super_class {
            Some(expr) => {
                let value = self.eval_expression(expr)?;
                let class = match &value {
                    RuntimeValue::Function(func) => func.as_class().map(CheapClone::cheap_clone),
                    _ => None,
                };
                match class {
                    Some(class) => Some(class),
                    None => {
                        return Err(Error::type_error(format!(
                            "Class extends value {value:?} is not a constructor or null"
                        )));
                    }
                }
            }
            None => None,
        };

        let mut constructor = None;
        let mut methods = indexmap::IndexMap::new();
        let mut static_methods = indexmap::IndexMap::new();
        for member in &decl.members {
            let closure = FunctionRecord::closure(ClosureRecord {
                name: Some(member.name.cheap_clone()),
                params: member.params.clone(),
                body: FunctionBody::Block(Arc::new(member.body.clone())),
                this_mode: ThisMode::Dynamic,
            });
            if member.is_static {
                static_methods.insert(member.name.cheap_clone(), closure);
            } else if member.name == "constructor" {
                constructor = Some(closure);
            } else {
                methods.insert(member.name.cheap_clone(), closure);
            }
        }

        let class = Arc::new(ClassRecord {
            name: decl.name.name.cheap_clone(),
            parent,
            constructor,
            methods,
            static_methods,
        });
        let variable = self.map.resolve(decl.name.id).ok_or_else(|| {
            Error::internal(format!("unresolved class declaration '{}'", decl.name.name))
        })?;
        self.session
            .store
            .set(variable, RuntimeValue::Function(FunctionRecord::class(class)));
        Ok(Completion::empty())
    }

    // ---- functions ----

    /// Call a function value. `receiver` is the call-time `this`; arrows
    /// ignore it in favor of their captured context.
    pub(crate) fn invoke(
        &mut self,
        func: &FunctionRef,
        receiver: RuntimeValue,
        args: Vec<RuntimeValue>,
    ) -> Result<CallOutcome, Error> {
        match &func.callable {
            Callable::Closure(closure) => self.invoke_closure(closure, receiver, args),
            Callable::Class(class) => Err(Error::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                class.name
            ))),
        }
    }

    fn invoke_closure(
        &mut self,
        closure: &ClosureRecord,
        receiver: RuntimeValue,
        args: Vec<RuntimeValue>,
    ) -> Result<CallOutcome, Error> {
        tracing::trace!(name = closure.name.as_deref().unwrap_or("<anonymous>"), "call");
        let this = match &closure.this_mode {
            ThisMode::Captured(captured) => captured.clone(),
            ThisMode::Dynamic => receiver,
        };
        let context = self.session.contexts.push(this);
        // Arrows have no `arguments` of their own; reads fall through to the
        // enclosing invocation.
        if matches!(closure.this_mode, ThisMode::Dynamic) {
            self.session.arguments.insert(context, args.clone());
        }

        let result = self.run_closure_body(closure, &args);

        self.session.arguments.remove(context);
        self.session.contexts.pop()?;
        result
    }

    fn run_closure_body(
        &mut self,
        closure: &ClosureRecord,
        args: &[RuntimeValue],
    ) -> Result<CallOutcome, Error> {
        for (index, param) in closure.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or_default();
            self.bind_pattern(param, value)?;
        }
        match &closure.body {
            FunctionBody::Expression(expr) => Ok(CallOutcome {
                value: self.eval_expression(expr)?,
                explicit_return: true,
            }),
            FunctionBody::Block(block) => match self.execute_block(block)? {
                Completion::Return(value) => Ok(CallOutcome {
                    value,
                    explicit_return: true,
                }),
                Completion::Normal(value) => Ok(CallOutcome {
                    value,
                    explicit_return: false,
                }),
                Completion::Break | Completion::Continue => {
                    Err(Error::internal("loop signal escaped a function body"))
                }
            },
        }
    }

    /// `new`: allocate an instance, run the applicable constructor, and honor
    /// an explicit returned object as the result.
    pub(crate) fn construct(
        &mut self,
        func: &FunctionRef,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, Error> {
        match &func.callable {
            Callable::Class(class) => {
                let instance = Arc::new(parking_lot::RwLock::new(
                    crate::value::JsObject::instance_of(class.cheap_clone()),
                ));
                let this = RuntimeValue::Object(instance);
                if let Some(ctor) = class.lookup_constructor() {
                    let owner = constructor_owner(class, &ctor);
                    let outcome = self.invoke_constructor(&owner, &ctor, this.clone(), args)?;
                    if outcome.explicit_return && outcome.value.is_object() {
                        return Ok(outcome.value);
                    }
                }
                Ok(this)
            }
            Callable::Closure(closure) => {
                let this = RuntimeValue::Object(create_object());
                let outcome = self.invoke_closure(closure, this.clone(), args)?;
                if outcome.explicit_return && outcome.value.is_object() {
                    Ok(outcome.value)
                } else {
                    Ok(this)
                }
            }
        }
    }

    fn invoke_constructor(
        &mut self,
        owner: &ClassRef,
        ctor: &FunctionRef,
        this: RuntimeValue,
        args: Vec<RuntimeValue>,
    ) -> Result<CallOutcome, Error> {
        self.class_stack.push(owner.cheap_clone());
        let result = match &ctor.callable {
            Callable::Closure(closure) => self.invoke_closure(closure, this, args),
            Callable::Class(_) => Err(Error::internal("class used as its own constructor")),
        };
        self.class_stack.pop();
        result
    }

    /// `super(...)` inside a constructor: run the parent chain's constructor
    /// against the same instance.
    pub(crate) fn invoke_super(
        &mut self,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, Error> {
        let Some(current) = self.class_stack.last().cloned() else {
            return Err(Error::type_error("'super' keyword unexpected here"));
        };
        let Some(parent) = current.parent.clone() else {
            return Err(Error::type_error(format!(
                "'super' called in class {} which has no parent",
                current.name
            )));
        };
        let this = self.session.contexts.current().clone();
        if let Some(ctor) = parent.lookup_constructor() {
            let owner = constructor_owner(&parent, &ctor);
            self.invoke_constructor(&owner, &ctor, this, args)?;
        }
        Ok(RuntimeValue::Undefined)
    }

    // ---- identifier access ----

    pub(crate) fn read_identifier(&mut self, identifier: &Identifier) -> Result<RuntimeValue, Error> {
        if let Some(variable) = self.map.resolve(identifier.id) {
            let record = self.map.record(variable);
            return match self.session.store.get(variable) {
                Some(value) => Ok(value.clone()),
                None if record.kind.is_lexical() => Err(Error::not_initialized(&record.name)),
                None => Ok(RuntimeValue::Undefined),
            };
        }

        // `arguments` consults the nearest enclosing invocation before the
        // globals.
        if identifier.name == "arguments" {
            if let Some(args) = self.session.current_arguments() {
                return Ok(RuntimeValue::Object(create_array(args.to_vec())));
            }
        }

        let key = PropertyKey::String(identifier.name.cheap_clone());
        let global = self.session.global.cheap_clone();
        let slot = global.read().get_property(&key).cloned();
        match slot {
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor { get: Some(getter), .. }) => {
                let receiver = RuntimeValue::Object(global);
                Ok(self.invoke(&getter, receiver, Vec::new())?.value)
            }
            Some(Property::Accessor { get: None, .. }) => Ok(RuntimeValue::Undefined),
            // Intrinsic globals, unless the host shadowed them.
            None => match identifier.name.as_str() {
                "undefined" => Ok(RuntimeValue::Undefined),
                "NaN" => Ok(RuntimeValue::Number(f64::NAN)),
                _ => Err(Error::reference_error(&identifier.name)),
            },
        }
    }

    /// Assign to an already-declared variable, or auto-vivify a global for an
    /// unresolved name.
    pub(crate) fn write_identifier(
        &mut self,
        identifier: &Identifier,
        value: RuntimeValue,
    ) -> Result<(), Error> {
        if let Some(variable) = self.map.resolve(identifier.id) {
            let record = self.map.record(variable);
            if record.kind == crate::scope::BindingKind::Const
                && self.session.store.is_initialized(variable)
            {
                return Err(Error::type_error("Assignment to constant variable."));
            }
            self.session.store.set(variable, value);
            return Ok(());
        }
        self.session
            .global
            .write()
            .set_property(PropertyKey::String(identifier.name.cheap_clone()), value);
        Ok(())
    }

    /// Direct introspection entry points used by the host while no stepping
    /// session is active.
    pub fn evaluate_expression(
        &mut self,
        expression: &crate::ast::Expression,
    ) -> Result<RuntimeValue, Error> {
        self.eval_expression(expression)
    }

    pub fn evaluate_statement(&mut self, statement: &Statement) -> Result<RuntimeValue, Error> {
        Ok(self.execute_statement(statement)?.into_value())
    }

    /// Array-ness aware iteration used by `for-of` and spread positions.
    pub(crate) fn iterable_values(
        &mut self,
        value: &RuntimeValue,
    ) -> Result<Vec<RuntimeValue>, Error> {
        match value {
            RuntimeValue::Object(obj) if obj.read().kind == ObjectKind::Array => {
                Ok(obj.read().array_elements())
            }
            RuntimeValue::String(s) => Ok(s
                .chars()
                .map(|c| RuntimeValue::String(c.to_string().into()))
                .collect()),
            _ => Err(Error::type_error(format!(
                "{} is not iterable",
                value.to_js_string()
            ))),
        }
    }
}

/// Read a variable through an identifier node, shared between mid-pause
/// queries and post-completion inspection.
pub(crate) fn read_variable(
    map: &ResolutionMap,
    session: &Session,
    node: NodeId,
) -> Result<RuntimeValue, Error> {
    let Some(variable) = map.resolve(node) else {
        return Err(Error::reference_error(format!("node {node}")));
    };
    let record = map.record(variable);
    match session.store.get(variable) {
        Some(value) => Ok(value.clone()),
        None if record.kind.is_lexical() => Err(Error::not_initialized(&record.name)),
        None => Ok(RuntimeValue::Undefined),
    }
}

/// The class in a chain that owns a given constructor closure, so `super()`
/// inside it dispatches relative to the right level.
fn constructor_owner(class: &ClassRef, ctor: &FunctionRef) -> ClassRef {
    let mut current = Some(class.cheap_clone());
    while let Some(c) = current {
        if let Some(own) = &c.constructor {
            if Arc::ptr_eq(own, ctor) {
                return c;
            }
        }
        current = c.parent.clone();
    }
    class.cheap_clone()
}
