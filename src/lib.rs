//! Steppable JavaScript interpreter designed for embedding in applications.
//!
//! Programs are parsed into an id-carrying AST, statically resolved, and then
//! either run to completion or executed one instruction at a time under a
//! cooperative scheduler: the host can pause between any two instructions,
//! set breakpoints on AST nodes, inspect variables, and evaluate expressions
//! against the paused program state.
//!
//! # Example
//!
//! ```
//! use stepjs::{Runtime, RuntimeValue};
//!
//! let mut runtime = Runtime::new();
//! let result = runtime.eval("let a = 2; a + 3").unwrap();
//! assert_eq!(result, RuntimeValue::Number(5.0));
//! ```
//!
//! Stepped execution:
//!
//! ```
//! use stepjs::{Runtime, RunState};
//!
//! let mut runtime = Runtime::new();
//! runtime.load("let a = 1; a = a + 1;").unwrap();
//! loop {
//!     match runtime.step().unwrap() {
//!         RunState::Paused(instruction) => println!("{}", instruction.kind),
//!         RunState::Completed(_) => break,
//!         RunState::Halted(_) => unreachable!("no breakpoints set"),
//!     }
//! }
//! ```

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod schedule;
pub mod scope;
pub mod value;

pub use error::Error;
pub use interpreter::{Completion, Interpreter, Session};
pub use schedule::{Breakpoint, Instruction, NodeBreakpoint, Scheduler, StepOutcome};
pub use value::{CheapClone, JsString, RuntimeValue, wrap};

use std::sync::Arc;

use ast::{Expression, NodeId, Program, Statement};
use scope::ResolutionMap;
use value::{ObjectRef, PropertyKey, create_object};

/// Evaluation policy knobs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Treat unsupported syntax reached at runtime as a no-op instead of an
    /// error.
    pub skip_unsupported_nodes: bool,
}

/// Where a scheduling call left the program.
#[derive(Debug, Clone)]
pub enum RunState {
    /// The program finished with this value.
    Completed(RuntimeValue),
    /// A breakpoint matched this instruction; it has not executed yet.
    Halted(Instruction),
    /// Stepping or an explicit pause stopped before this instruction.
    Paused(Instruction),
}

/// One program run: load once, then execute straight through or under the
/// scheduler.
pub struct Runtime {
    config: Config,
    global: ObjectRef,
    program: Option<Arc<Program>>,
    map: Option<Arc<ResolutionMap>>,
    scheduler: Option<Scheduler>,
    pending_breakpoints: Vec<Box<dyn Breakpoint>>,
    session: Option<Session>,
    result: Option<RuntimeValue>,
    finished: bool,
    paused: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            global: create_object(),
            program: None,
            map: None,
            scheduler: None,
            pending_breakpoints: Vec::new(),
            session: None,
            result: None,
            finished: false,
            paused: false,
        }
    }

    /// Expose a host value to the program as a global binding.
    pub fn set_global(&mut self, name: &str, value: impl Into<RuntimeValue>) {
        self.global
            .write()
            .set_property(PropertyKey::String(name.into()), value.into());
    }

    /// Read a global binding, including ones the program auto-vivified.
    pub fn get_global(&self, name: &str) -> Option<RuntimeValue> {
        match self
            .global
            .read()
            .get_property(&PropertyKey::String(name.into()))
        {
            Some(value::Property::Data(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Parse and statically resolve a program. No code runs yet.
    pub fn load(&mut self, source: &str) -> Result<(), Error> {
        let program = parser::parse(source)?;
        let map = scope::analyze(&program);
        tracing::debug!(
            statements = program.body.len(),
            variables = map.variable_count(),
            "program loaded"
        );
        self.program = Some(Arc::new(program));
        self.map = Some(Arc::new(map));
        self.scheduler = None;
        self.session = None;
        self.result = None;
        self.finished = false;
        self.paused = false;
        Ok(())
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }

    /// Load and run in one call.
    pub fn eval(&mut self, source: &str) -> Result<RuntimeValue, Error> {
        self.load(source)?;
        match self.run()? {
            RunState::Completed(value) => Ok(value),
            RunState::Halted(instruction) | RunState::Paused(instruction) => Err(Error::internal(
                format!("evaluation halted at {}", instruction.node),
            )),
        }
    }

    /// Run the loaded program. Without breakpoints or a pause this executes
    /// synchronously on the calling thread; otherwise it drives the stepped
    /// session until it completes or halts.
    pub fn run(&mut self) -> Result<RunState, Error> {
        if self.scheduler.is_none()
            && self.pending_breakpoints.is_empty()
            && !self.paused
            && !self.finished
        {
            return Ok(RunState::Completed(self.run_direct()?));
        }
        self.resume()
    }

    /// Advance by exactly one instruction.
    pub fn step(&mut self) -> Result<RunState, Error> {
        if self.finished {
            return self.replay_completion();
        }
        self.ensure_scheduler()?;
        let outcome = match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.step()?,
            None => return Err(Error::internal("no active execution")),
        };
        match outcome {
            StepOutcome::Paused(instruction) | StepOutcome::Breakpoint(instruction) => {
                Ok(RunState::Paused(instruction))
            }
            StepOutcome::Completed => Ok(RunState::Completed(self.finish()?)),
        }
    }

    /// Run until completion, the next matching breakpoint, or a pending
    /// pause. The instruction a breakpoint halted on is dispatched without
    /// being re-tested.
    pub fn resume(&mut self) -> Result<RunState, Error> {
        if self.finished {
            return self.replay_completion();
        }
        self.ensure_scheduler()?;
        let outcome = match self.scheduler.as_mut() {
            Some(scheduler) => {
                if self.paused {
                    scheduler.step()?
                } else {
                    scheduler.resume()?
                }
            }
            None => return Err(Error::internal("no active execution")),
        };
        match outcome {
            StepOutcome::Completed => Ok(RunState::Completed(self.finish()?)),
            StepOutcome::Breakpoint(instruction) => Ok(RunState::Halted(instruction)),
            StepOutcome::Paused(instruction) => Ok(RunState::Paused(instruction)),
        }
    }

    /// Request a stop before the next instruction. Takes effect on the next
    /// scheduling call.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Halt when the given node is about to execute.
    pub fn break_at_node(&mut self, node: NodeId) {
        self.add_breakpoint(Box::new(NodeBreakpoint(node)));
    }

    pub fn add_breakpoint(&mut self, breakpoint: Box<dyn Breakpoint>) {
        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.add_breakpoint(breakpoint),
            None => self.pending_breakpoints.push(breakpoint),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.finished
    }

    /// The final value, once the program has completed successfully.
    pub fn result(&self) -> Option<&RuntimeValue> {
        self.result.as_ref()
    }

    /// The instruction execution is currently suspended at.
    pub fn current_instruction(&self) -> Option<Instruction> {
        self.scheduler
            .as_ref()
            .and_then(Scheduler::current_instruction)
    }

    /// Read a variable through its identifier node. Works mid-pause against
    /// the live session and after completion against the final session.
    pub fn get_variable(&self, node: NodeId) -> Result<RuntimeValue, Error> {
        if let Some(scheduler) = &self.scheduler {
            return scheduler.get_variable(node);
        }
        match (&self.map, &self.session) {
            (Some(map), Some(session)) => interpreter::read_variable(map, session, node),
            _ => Err(Error::internal("no evaluation state available")),
        }
    }

    /// Evaluate an expression against the current program state: mid-pause
    /// inside the suspended evaluator, otherwise against the retained
    /// session.
    pub fn evaluate_expression(&mut self, expression: &Expression) -> Result<RuntimeValue, Error> {
        if let Some(scheduler) = &self.scheduler {
            return scheduler.evaluate_expression(expression.clone());
        }
        let mut interpreter = self.offline_interpreter();
        let result = interpreter.evaluate_expression(expression);
        self.session = Some(interpreter.session);
        result
    }

    /// Execute a statement against the current program state.
    pub fn evaluate_statement(&mut self, statement: &Statement) -> Result<RuntimeValue, Error> {
        if let Some(scheduler) = &self.scheduler {
            return scheduler.evaluate_statement(statement.clone());
        }
        let mut interpreter = self.offline_interpreter();
        let result = interpreter.evaluate_statement(statement);
        self.session = Some(interpreter.session);
        result
    }

    fn offline_interpreter(&mut self) -> Interpreter {
        let map = self
            .map
            .as_ref()
            .map_or_else(|| Arc::new(ResolutionMap::default()), CheapClone::cheap_clone);
        let session = self
            .session
            .take()
            .unwrap_or_else(|| Session::new(self.global.cheap_clone()));
        Interpreter::new(map, self.config.clone(), session)
    }

    fn run_direct(&mut self) -> Result<RuntimeValue, Error> {
        let (program, map) = self.loaded()?;
        let session = Session::new(self.global.cheap_clone());
        let mut interpreter = Interpreter::new(map, self.config.clone(), session);
        let result = interpreter.execute_program(&program);
        self.session = Some(interpreter.session);
        self.finished = true;
        let value = result?;
        self.result = Some(value.clone());
        Ok(value)
    }

    fn ensure_scheduler(&mut self) -> Result<(), Error> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let (program, map) = self.loaded()?;
        let session = Session::new(self.global.cheap_clone());
        let mut scheduler = Scheduler::spawn(program, map, self.config.clone(), session)?;
        for breakpoint in self.pending_breakpoints.drain(..) {
            scheduler.add_breakpoint(breakpoint);
        }
        self.scheduler = Some(scheduler);
        Ok(())
    }

    fn loaded(&self) -> Result<(Arc<Program>, Arc<ResolutionMap>), Error> {
        match (&self.program, &self.map) {
            (Some(program), Some(map)) => Ok((program.cheap_clone(), map.cheap_clone())),
            _ => Err(Error::internal("no program loaded")),
        }
    }

    /// Tear down the finished scheduler, keeping its session for inspection.
    fn finish(&mut self) -> Result<RuntimeValue, Error> {
        self.finished = true;
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(Error::internal("no active execution"));
        };
        self.session = scheduler.take_session();
        match scheduler.take_result() {
            Some(Ok(value)) => {
                self.result = Some(value.clone());
                Ok(value)
            }
            Some(Err(error)) => Err(error),
            None => Err(Error::internal("evaluation finished without a result")),
        }
    }

    fn replay_completion(&self) -> Result<RunState, Error> {
        match &self.result {
            Some(value) => Ok(RunState::Completed(value.clone())),
            None => Err(Error::internal("program already completed with an error")),
        }
    }
}
