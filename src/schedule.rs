//! Cooperative execution scheduling.
//!
//! The evaluator runs on its own thread and announces every suspension point
//! over a channel, then blocks until the scheduler lets it proceed. The
//! scheduler owns the host side of that conversation: it assigns sequence
//! ids, tests breakpoints before dispatch, and relays introspection queries
//! to the paused evaluator.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::Config;
use crate::ast::{Expression, NodeId, NodeKind, Program, Statement};
use crate::error::Error;
use crate::interpreter::{Interpreter, Session};
use crate::scope::ResolutionMap;
use crate::value::RuntimeValue;

/// One unit of work the evaluator is about to execute. Sequence ids are
/// assigned by the scheduler in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub node: NodeId,
    pub kind: NodeKind,
    pub sequence_id: u64,
}

/// A predicate over pending instructions. Tested before dispatch; a match
/// halts execution with the instruction not yet run.
pub trait Breakpoint: Send {
    fn test(&self, next: &Instruction) -> bool;
}

/// Halts when a specific node is about to execute.
pub struct NodeBreakpoint(pub NodeId);

impl Breakpoint for NodeBreakpoint {
    fn test(&self, next: &Instruction) -> bool {
        next.node == self.0
    }
}

impl<F> Breakpoint for F
where
    F: Fn(&Instruction) -> bool + Send,
{
    fn test(&self, next: &Instruction) -> bool {
        self(next)
    }
}

/// Evaluator-to-scheduler messages.
pub enum EvalEvent {
    Suspended {
        node: NodeId,
        kind: NodeKind,
    },
    Completed {
        result: Result<RuntimeValue, Error>,
        session: Session,
    },
}

/// Scheduler-to-evaluator messages, consumed inside a suspension.
pub enum ControlMsg {
    Resume,
    GetVariable {
        node: NodeId,
        reply: Sender<Result<RuntimeValue, Error>>,
    },
    EvaluateExpression {
        expression: Box<Expression>,
        reply: Sender<Result<RuntimeValue, Error>>,
    },
    EvaluateStatement {
        statement: Box<Statement>,
        reply: Sender<Result<RuntimeValue, Error>>,
    },
}

/// The evaluator's end of the stepping channel pair.
pub struct StepLink {
    pub events: Sender<EvalEvent>,
    pub control: Receiver<ControlMsg>,
}

/// What a scheduling operation observed.
#[derive(Debug, Clone, Copy)]
pub enum StepOutcome {
    /// Halted with this instruction pending, not yet executed.
    Paused(Instruction),
    /// A breakpoint matched this pending instruction.
    Breakpoint(Instruction),
    /// The program ran to completion; the result is held by the scheduler.
    Completed,
}

/// Host-side driver of one stepped evaluation.
pub struct Scheduler {
    events: Receiver<EvalEvent>,
    control: Sender<ControlMsg>,
    next_sequence: u64,
    /// The instruction the evaluator is currently suspended at. Already
    /// announced to the host, so it is dispatched without re-testing
    /// breakpoints.
    halted: Option<Instruction>,
    breakpoints: Vec<Box<dyn Breakpoint>>,
    outcome: Option<Result<RuntimeValue, Error>>,
    session: Option<Session>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the evaluator on its own thread, suspended at the program root.
    pub fn spawn(
        program: Arc<Program>,
        map: Arc<ResolutionMap>,
        config: Config,
        session: Session,
    ) -> Result<Scheduler, Error> {
        let (event_tx, event_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        let link = StepLink {
            events: event_tx.clone(),
            control: control_rx,
        };
        let handle = std::thread::Builder::new()
            .name("stepjs-eval".into())
            .spawn(move || {
                let mut interpreter = Interpreter::with_stepper(map, config, session, link);
                let result = interpreter.execute_program(&program);
                let session = interpreter.session;
                let _ = event_tx.send(EvalEvent::Completed { result, session });
            })
            .map_err(|e| Error::internal(format!("failed to spawn evaluator thread: {e}")))?;
        Ok(Scheduler {
            events: event_rx,
            control: control_tx,
            next_sequence: 0,
            halted: None,
            breakpoints: Vec::new(),
            outcome: None,
            session: None,
            handle: Some(handle),
        })
    }

    pub fn add_breakpoint(&mut self, breakpoint: Box<dyn Breakpoint>) {
        self.breakpoints.push(breakpoint);
    }

    pub fn break_at_node(&mut self, node: NodeId) {
        self.add_breakpoint(Box::new(NodeBreakpoint(node)));
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }

    /// The pending instruction, when halted.
    pub fn current_instruction(&self) -> Option<Instruction> {
        self.halted
    }

    pub fn result(&self) -> Option<&Result<RuntimeValue, Error>> {
        self.outcome.as_ref()
    }

    pub fn take_result(&mut self) -> Option<Result<RuntimeValue, Error>> {
        self.outcome.take()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn take_session(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// Advance by exactly one instruction and halt at the next one.
    pub fn step(&mut self) -> Result<StepOutcome, Error> {
        if self.is_completed() {
            return Ok(StepOutcome::Completed);
        }
        if self.halted.is_some() {
            self.dispatch()?;
        }
        match self.fetch()? {
            Some(instruction) => {
                self.halted = Some(instruction);
                Ok(StepOutcome::Paused(instruction))
            }
            None => Ok(StepOutcome::Completed),
        }
    }

    /// Run until a breakpoint matches a pending instruction or the program
    /// completes. A halted instruction is dispatched without being re-tested.
    pub fn resume(&mut self) -> Result<StepOutcome, Error> {
        if self.is_completed() {
            return Ok(StepOutcome::Completed);
        }
        loop {
            if self.halted.is_some() {
                self.dispatch()?;
            }
            match self.fetch()? {
                None => return Ok(StepOutcome::Completed),
                Some(instruction) => {
                    self.halted = Some(instruction);
                    if self.breakpoints.iter().any(|b| b.test(&instruction)) {
                        tracing::debug!(
                            node = %instruction.node,
                            kind = %instruction.kind,
                            sequence = instruction.sequence_id,
                            "breakpoint hit"
                        );
                        return Ok(StepOutcome::Breakpoint(instruction));
                    }
                }
            }
        }
    }

    /// Read a variable through its identifier node while halted.
    pub fn get_variable(&self, node: NodeId) -> Result<RuntimeValue, Error> {
        self.query(|reply| ControlMsg::GetVariable { node, reply })
    }

    /// Evaluate an expression in the paused program's state.
    pub fn evaluate_expression(&self, expression: Expression) -> Result<RuntimeValue, Error> {
        self.query(|reply| ControlMsg::EvaluateExpression {
            expression: Box::new(expression),
            reply,
        })
    }

    /// Execute a statement in the paused program's state.
    pub fn evaluate_statement(&self, statement: Statement) -> Result<RuntimeValue, Error> {
        self.query(|reply| ControlMsg::EvaluateStatement {
            statement: Box::new(statement),
            reply,
        })
    }

    fn query<F>(&self, message: F) -> Result<RuntimeValue, Error>
    where
        F: FnOnce(Sender<Result<RuntimeValue, Error>>) -> ControlMsg,
    {
        if self.halted.is_none() {
            return Err(Error::internal("evaluator is not paused"));
        }
        let (reply_tx, reply_rx) = bounded(1);
        self.control
            .send(message(reply_tx))
            .map_err(|_| Error::internal("evaluator thread disconnected"))?;
        reply_rx
            .recv()
            .map_err(|_| Error::internal("evaluator thread disconnected"))?
    }

    /// Release the halted instruction for execution.
    fn dispatch(&mut self) -> Result<(), Error> {
        self.halted = None;
        self.control
            .send(ControlMsg::Resume)
            .map_err(|_| Error::internal("evaluator thread disconnected"))
    }

    /// Receive the next suspension, stamping it with a fresh sequence id.
    fn fetch(&mut self) -> Result<Option<Instruction>, Error> {
        match self.events.recv() {
            Ok(EvalEvent::Suspended { node, kind }) => {
                let instruction = Instruction {
                    node,
                    kind,
                    sequence_id: self.next_sequence,
                };
                self.next_sequence += 1;
                Ok(Some(instruction))
            }
            Ok(EvalEvent::Completed { result, session }) => {
                self.outcome = Some(result);
                self.session = Some(session);
                self.join();
                Ok(None)
            }
            Err(_) => Err(Error::internal("evaluator thread disconnected")),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Close the control channel so a still-suspended evaluator errors
        // out of its recv and the thread can exit.
        let (closed, _) = bounded(0);
        drop(std::mem::replace(&mut self.control, closed));
        self.join();
    }
}
