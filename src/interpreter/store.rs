//! Evaluation session state: the variable store, the `this` context stack,
//! the per-invocation arguments map, and the loop stack.
//!
//! All of it lives in one [`Session`] value threaded through the evaluator,
//! so separate interpreter instances can never interfere.

use rustc_hash::FxHashMap;

use crate::ast::NodeId;
use crate::error::Error;
use crate::scope::VariableId;
use crate::value::{CheapClone, ObjectRef, RuntimeValue};

/// Flat mapping from variable identity to current value.
///
/// Variables are never freed per-scope: closures resolve statically to the
/// same slots and may outlive their lexical scope. A missing entry means the
/// variable's declarator has not executed yet.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: FxHashMap<VariableId, RuntimeValue>,
}

impl VariableStore {
    pub fn get(&self, variable: VariableId) -> Option<&RuntimeValue> {
        self.values.get(&variable)
    }

    pub fn set(&mut self, variable: VariableId, value: RuntimeValue) {
        self.values.insert(variable, value);
    }

    pub fn is_initialized(&self, variable: VariableId) -> bool {
        self.values.contains_key(&variable)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Identity of one pushed execution context, keying the arguments map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

#[derive(Debug)]
struct Frame {
    id: ContextId,
    this: RuntimeValue,
}

/// Stack of `this` bindings. Seeded with the global binding; the seed frame
/// is never popped.
#[derive(Debug)]
pub struct ExecutionContextStack {
    frames: Vec<Frame>,
    next_id: u64,
}

impl ExecutionContextStack {
    fn new(global: RuntimeValue) -> Self {
        Self {
            frames: vec![Frame {
                id: ContextId(0),
                this: global,
            }],
            next_id: 1,
        }
    }

    pub fn push(&mut self, this: RuntimeValue) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;
        self.frames.push(Frame { id, this });
        id
    }

    /// Pop the top context. Popping the seed frame is an invariant violation.
    pub fn pop(&mut self) -> Result<ContextId, Error> {
        if self.frames.len() <= 1 {
            return Err(Error::internal("execution context stack underflow"));
        }
        match self.frames.pop() {
            Some(frame) => Ok(frame.id),
            None => Err(Error::internal("execution context stack underflow")),
        }
    }

    pub fn current(&self) -> &RuntimeValue {
        // The seed frame is never popped, so the stack is never empty.
        &self.frames[self.frames.len() - 1].this
    }

    pub fn current_id(&self) -> ContextId {
        self.frames.last().map_or(ContextId(0), |frame| frame.id)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frame ids from the innermost context outward.
    pub fn ids_innermost_first(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.frames.iter().rev().map(|frame| frame.id)
    }
}

/// Raw argument lists keyed by invocation context, scoped to a single call.
#[derive(Debug, Default)]
pub struct ArgumentsMap {
    entries: FxHashMap<ContextId, Vec<RuntimeValue>>,
}

impl ArgumentsMap {
    pub fn insert(&mut self, context: ContextId, arguments: Vec<RuntimeValue>) {
        self.entries.insert(context, arguments);
    }

    pub fn get(&self, context: ContextId) -> Option<&[RuntimeValue]> {
        self.entries.get(&context).map(Vec::as_slice)
    }

    /// Drop the entry when its invocation's context is popped.
    pub fn remove(&mut self, context: ContextId) {
        self.entries.remove(&context);
    }
}

/// Stack of loops currently executing their body, for nested-loop
/// introspection.
#[derive(Debug, Default)]
pub struct LoopStack {
    nodes: Vec<NodeId>,
}

impl LoopStack {
    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    pub fn pop(&mut self) {
        self.nodes.pop();
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// Everything mutable about one program run.
#[derive(Debug)]
pub struct Session {
    pub store: VariableStore,
    pub contexts: ExecutionContextStack,
    pub arguments: ArgumentsMap,
    pub loops: LoopStack,
    pub global: ObjectRef,
}

impl Session {
    pub fn new(global: ObjectRef) -> Self {
        Self {
            store: VariableStore::default(),
            contexts: ExecutionContextStack::new(RuntimeValue::Object(global.cheap_clone())),
            arguments: ArgumentsMap::default(),
            loops: LoopStack::default(),
            global,
        }
    }

    /// The argument list of the nearest invocation that registered one.
    /// Contexts without a list (arrow calls, object literals) are transparent.
    pub fn current_arguments(&self) -> Option<&[RuntimeValue]> {
        self.contexts
            .ids_innermost_first()
            .find_map(|id| self.arguments.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::create_object;

    #[test]
    fn context_stack_never_underflows_past_the_seed() {
        let mut session = Session::new(create_object());
        assert!(session.contexts.pop().is_err());
        let id = session.contexts.push(RuntimeValue::Number(1.0));
        assert_eq!(session.contexts.current_id(), id);
        assert!(session.contexts.pop().is_ok());
        assert!(session.contexts.pop().is_err());
    }

    #[test]
    fn argument_lookup_skips_contexts_without_a_list() {
        let mut session = Session::new(create_object());
        let outer = session.contexts.push(RuntimeValue::Undefined);
        session.arguments.insert(outer, vec![RuntimeValue::Number(1.0)]);
        session.contexts.push(RuntimeValue::Undefined);
        assert_eq!(
            session.current_arguments(),
            Some(&[RuntimeValue::Number(1.0)][..])
        );
    }

    #[test]
    fn arguments_are_scoped_to_their_context() {
        let mut session = Session::new(create_object());
        let ctx = session.contexts.push(RuntimeValue::Undefined);
        session.arguments.insert(ctx, vec![RuntimeValue::Number(5.0)]);
        assert!(session.arguments.get(ctx).is_some());
        session.arguments.remove(ctx);
        assert!(session.arguments.get(ctx).is_none());
    }

    #[test]
    fn store_tracks_initialization() {
        let mut store = VariableStore::default();
        let v = VariableId(0);
        assert!(!store.is_initialized(v));
        store.set(v, RuntimeValue::Number(2.0));
        assert!(store.is_initialized(v));
        assert_eq!(store.get(v), Some(&RuntimeValue::Number(2.0)));
    }
}
