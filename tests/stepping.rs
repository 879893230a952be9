//! Stepped execution: instruction ordering, breakpoints, pause, and
//! mid-pause inspection of the suspended program.

#![allow(clippy::expect_used, clippy::panic)]

use pretty_assertions::assert_eq;
use stepjs::ast::{Expression, NodeId, NodeKind, Pattern, Program, Statement};
use stepjs::{Instruction, RunState, Runtime, RuntimeValue, parser, wrap};

/// Node id of the pattern identifier in the first declarator of statement
/// `index`.
fn declared_variable_node(program: &Program, index: usize) -> NodeId {
    match &program.body[index] {
        Statement::VariableDeclaration(decl) => match &decl.declarations[0].pattern {
            Pattern::Identifier(identifier) => identifier.id,
            other => panic!("expected an identifier pattern, got {other:?}"),
        },
        other => panic!("expected a variable declaration, got {other:?}"),
    }
}

/// Node id of the right-hand side of the assignment in statement `index`.
fn assigned_value_node(program: &Program, index: usize) -> NodeId {
    match &program.body[index] {
        Statement::Expression(stmt) => match &stmt.expression {
            Expression::Assignment(assignment) => assignment.value.node_id(),
            other => panic!("expected an assignment, got {other:?}"),
        },
        other => panic!("expected an expression statement, got {other:?}"),
    }
}

fn step_to_completion(runtime: &mut Runtime) -> (Vec<Instruction>, RuntimeValue) {
    let mut instructions = Vec::new();
    loop {
        match runtime.step().expect("step failed") {
            RunState::Paused(instruction) | RunState::Halted(instruction) => {
                instructions.push(instruction);
            }
            RunState::Completed(value) => return (instructions, value),
        }
    }
}

#[test]
fn test_stepping_visits_nodes_in_evaluation_order() {
    let mut runtime = Runtime::new();
    runtime.load("const a = 2, b = 4;").expect("load failed");
    let (instructions, _) = step_to_completion(&mut runtime);

    let kinds: Vec<NodeKind> = instructions.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Script,
            NodeKind::VariableDeclarationStatement,
            NodeKind::VariableDeclarator,
            NodeKind::LiteralNumericExpression,
            NodeKind::VariableDeclarator,
            NodeKind::LiteralNumericExpression,
        ]
    );
}

#[test]
fn test_sequence_ids_strictly_increase() {
    let mut runtime = Runtime::new();
    runtime
        .load("let a = 1; a = a + 1; a = a * 2;")
        .expect("load failed");
    let (instructions, _) = step_to_completion(&mut runtime);

    assert!(instructions.len() > 3);
    for pair in instructions.windows(2) {
        assert!(pair[0].sequence_id < pair[1].sequence_id);
    }
}

#[test]
fn test_breakpoint_halts_before_the_instruction_runs() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 2; a = 4;").expect("load failed");

    let program = runtime.program().expect("program");
    let a_node = declared_variable_node(program, 0);
    let literal_four = assigned_value_node(program, 1);
    runtime.break_at_node(literal_four);

    match runtime.run().expect("run failed") {
        RunState::Halted(instruction) => {
            assert_eq!(instruction.node, literal_four);
            assert_eq!(instruction.kind, NodeKind::LiteralNumericExpression);
        }
        other => panic!("expected a breakpoint halt, got {other:?}"),
    }

    // The assignment has not executed yet.
    assert!(!runtime.is_completed());
    assert_eq!(runtime.get_variable(a_node).expect("get a"), wrap(2.0));

    // The halted instruction is dispatched without being re-tested.
    match runtime.resume().expect("resume failed") {
        RunState::Completed(value) => assert_eq!(value, wrap(4.0)),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(runtime.is_completed());
    assert_eq!(runtime.get_variable(a_node).expect("get a"), wrap(4.0));
}

#[test]
fn test_predicate_breakpoints() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 1; a = 2;").expect("load failed");
    runtime.add_breakpoint(Box::new(|instruction: &Instruction| {
        instruction.kind == NodeKind::AssignmentExpression
    }));

    match runtime.run().expect("run failed") {
        RunState::Halted(instruction) => {
            assert_eq!(instruction.kind, NodeKind::AssignmentExpression);
        }
        other => panic!("expected a halt, got {other:?}"),
    }
    match runtime.resume().expect("resume failed") {
        RunState::Completed(value) => assert_eq!(value, wrap(2.0)),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_pause_takes_effect_between_instructions() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 1; a = 2;").expect("load failed");

    runtime.pause();
    let first = match runtime.run().expect("run failed") {
        RunState::Paused(instruction) => instruction,
        other => panic!("expected a pause, got {other:?}"),
    };
    assert_eq!(first.kind, NodeKind::Script);

    // Still paused: each call advances exactly one instruction.
    match runtime.run().expect("run failed") {
        RunState::Paused(instruction) => {
            assert_eq!(instruction.kind, NodeKind::VariableDeclarationStatement);
        }
        other => panic!("expected a pause, got {other:?}"),
    }

    runtime.unpause();
    match runtime.run().expect("run failed") {
        RunState::Completed(value) => assert_eq!(value, wrap(2.0)),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_mid_pause_queries() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 2; a = 4;").expect("load failed");

    let program = runtime.program().expect("program");
    let literal_four = assigned_value_node(program, 1);
    runtime.break_at_node(literal_four);

    match runtime.run().expect("run failed") {
        RunState::Halted(_) => {}
        other => panic!("expected a halt, got {other:?}"),
    }

    // The suspended evaluator services queries without advancing.
    let snippet = parser::parse("40 + 2").expect("parse snippet");
    let expression = match &snippet.body[0] {
        Statement::Expression(stmt) => stmt.expression.clone(),
        other => panic!("expected an expression statement, got {other:?}"),
    };
    assert_eq!(
        runtime.evaluate_expression(&expression).expect("evaluate"),
        wrap(42.0)
    );

    let statement = parser::parse("7 * 6;").expect("parse snippet").body[0].clone();
    assert_eq!(
        runtime.evaluate_statement(&statement).expect("evaluate"),
        wrap(42.0)
    );

    // Still halted; finish normally.
    assert!(!runtime.is_completed());
    match runtime.resume().expect("resume failed") {
        RunState::Completed(value) => assert_eq!(value, wrap(4.0)),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_current_instruction_tracks_the_halt() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 1;").expect("load failed");

    match runtime.step().expect("step failed") {
        RunState::Paused(instruction) => {
            assert_eq!(runtime.current_instruction(), Some(instruction));
        }
        other => panic!("expected a pause, got {other:?}"),
    }
}

#[test]
fn test_completed_runs_replay_their_result() {
    let mut runtime = Runtime::new();
    runtime.load("let a = 1; a + 1").expect("load failed");
    let (_, value) = step_to_completion(&mut runtime);
    assert_eq!(value, wrap(2.0));

    match runtime.run().expect("run failed") {
        RunState::Completed(value) => assert_eq!(value, wrap(2.0)),
        other => panic!("expected completion, got {other:?}"),
    }
}
