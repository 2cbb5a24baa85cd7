// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the bytecode compiler.

use std::collections::BTreeMap;

use super::*;
use crate::ast::build::*;
use crate::ast::{BinaryOperator, Program, Statement, UpdateOperator};
use crate::compiler::bytecode::{Bytecode, Operand};
use crate::config::CompilerConfig;
use crate::types::Type;
use crate::{Error, compile};

use crate::compiler::bytecode::OpCode::*;

fn compile_source(body: Vec<Statement>) -> Result<Bytecode> {
    compile(&Program { body }, &CompilerConfig::default())
}

fn compile_ok(body: Vec<Statement>) -> Bytecode {
    compile_source(body).expect("Compilation should succeed")
}

fn branch_target(code: &Bytecode, pc: usize) -> usize {
    match &code.instructions[pc].operand {
        Some(Operand::Label(label)) => code.position(*label).expect("label placed"),
        other => panic!("instruction {pc} is not a branch: {other:?}"),
    }
}

fn lt(left: crate::ast::Expression, right: crate::ast::Expression) -> crate::ast::Expression {
    binary(BinaryOperator::LessThan, left, right)
}

fn void_call(name: &str) -> Statement {
    expr(call(name, vec![], Type::Void))
}

#[test]
fn test_compile_empty_program() {
    let code = compile_ok(vec![]);
    assert_eq!(code.opcodes(), vec![Halt]);
}

#[test]
fn test_compile_errors_skip_generation() {
    let result = compile_source(vec![while_stmt(int(1), Statement::Empty)]);
    assert!(matches!(result, Err(Error::Semantic(_))));
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_while_topology() {
    let code = compile_ok(vec![
        local("i", Type::Int, Some(int(0))),
        while_stmt(
            lt(var("i"), int(3)),
            expr(update(UpdateOperator::PostIncrement, var("i"))),
        ),
    ]);
    assert_eq!(
        code.opcodes(),
        vec![Push, Store, Load, Push, IfCmpGe, Inc, Goto, Halt]
    );
    assert_eq!(branch_target(&code, 4), 7);
    assert_eq!(branch_target(&code, 6), 2);
    // Neither break nor continue label was used, so neither was placed.
    assert_eq!(code.labels.iter().filter(|p| p.is_none()).count(), 2);
}

#[test]
fn test_while_continue_goes_to_condition() {
    let code = compile_ok(vec![while_stmt(
        call("more", vec![], Type::Boolean),
        block_stmt(vec![continue_stmt()]),
    )]);
    // 0 Invoke, 1 IfEq out, 2 Goto continue, 3 Goto condition, 4 Halt
    assert_eq!(code.opcodes(), vec![Invoke, IfEq, Goto, Goto, Halt]);
    assert_eq!(branch_target(&code, 2), 3);
    assert_eq!(branch_target(&code, 3), 0);
}

#[test]
fn test_do_topology() {
    let code = compile_ok(vec![
        local("x", Type::Int, Some(int(0))),
        do_stmt(
            block_stmt(vec![
                expr(update(UpdateOperator::PreIncrement, var("x"))),
                if_stmt(call("stop", vec![], Type::Boolean), break_stmt(), None),
            ]),
            lt(var("x"), int(5)),
        ),
    ]);
    // 0 Push, 1 Store, 2 Inc, 3 Invoke, 4 IfEq, 5 Goto break, 6 Load, 7 Push, 8 IfCmpLt start, 9 Halt
    assert_eq!(
        code.opcodes(),
        vec![Push, Store, Inc, Invoke, IfEq, Goto, Load, Push, IfCmpLt, Halt]
    );
    assert_eq!(branch_target(&code, 8), 2);
    assert_eq!(branch_target(&code, 5), 9);
    assert_eq!(branch_target(&code, 4), 6);
}

#[test]
fn test_for_continue_runs_update() {
    let code = compile_ok(vec![for_stmt(
        vec![local("i", Type::Int, Some(int(0)))],
        Some(lt(var("i"), int(3))),
        vec![expr(update(UpdateOperator::PostIncrement, var("i")))],
        block_stmt(vec![
            if_stmt(
                binary(BinaryOperator::Equal, var("i"), int(1)),
                continue_stmt(),
                None,
            ),
            expr(call("f", vec![var("i")], Type::Void)),
        ]),
    )]);
    assert_eq!(
        code.opcodes(),
        vec![
            Push, Store, Load, Push, IfCmpGe, Load, Push, IfCmpNe, Goto, Load, Invoke, Inc, Goto,
            Halt
        ]
    );
    // continue lands on the update step
    assert_eq!(branch_target(&code, 8), 11);
    assert_eq!(branch_target(&code, 12), 2);
    assert_eq!(branch_target(&code, 4), 13);
}

#[test]
fn test_for_without_condition() {
    let code = compile_ok(vec![for_stmt(vec![], None, vec![], break_stmt())]);
    assert_eq!(code.opcodes(), vec![Goto, Goto, Halt]);
    assert_eq!(branch_target(&code, 0), 2);
    assert_eq!(branch_target(&code, 1), 0);
}

// ============================================================================
// Switch
// ============================================================================

fn switch_operand(code: &Bytecode) -> &Operand {
    code.instructions
        .iter()
        .find(|i| matches!(i.opcode, TableSwitch | LookupSwitch))
        .and_then(|i| i.operand.as_ref())
        .expect("switch instruction")
}

#[test]
fn test_dense_switch_uses_table() {
    let groups = (0..10).map(|v| cases(&[v], vec![void_call("f")])).collect();
    let code = compile_ok(vec![switch(int(4), groups)]);
    let Operand::TableSwitch(table) = switch_operand(&code) else {
        panic!("expected table switch");
    };
    assert_eq!((table.low, table.high), (0, 9));
    assert_eq!(table.targets.len(), 10);
    // No default: the default target is the end of the switch.
    assert_eq!(code.position(table.default), Some(code.instructions.len() - 1));
}

#[test]
fn test_sparse_switch_uses_lookup() {
    let code = compile_ok(vec![switch(
        int(4),
        vec![
            cases(&[250], vec![]),
            cases(&[0], vec![]),
            cases(&[100], vec![]),
        ],
    )]);
    let Operand::LookupSwitch(lookup) = switch_operand(&code) else {
        panic!("expected lookup switch");
    };
    let values: Vec<i32> = lookup.pairs.iter().map(|(v, _)| *v).collect();
    assert_eq!(values, vec![0, 100, 250]);
}

#[test]
fn test_table_gaps_go_to_default() {
    let code = compile_ok(vec![switch(
        int(4),
        vec![
            cases(&[0, 1], vec![void_call("low")]),
            cases(&[2, 4], vec![void_call("high")]),
            default_group(vec![void_call("other")]),
        ],
    )]);
    let Operand::TableSwitch(table) = switch_operand(&code) else {
        panic!("expected table switch");
    };
    assert_eq!(table.targets[3], table.default);
    assert_eq!(code.position(table.targets[0]), code.position(table.targets[1]));
    assert_eq!(code.position(table.targets[2]), code.position(table.targets[4]));
}

#[test]
fn test_default_only_switch() {
    let code = compile_ok(vec![switch(int(1), vec![default_group(vec![void_call("d")])])]);
    let Operand::LookupSwitch(lookup) = switch_operand(&code) else {
        panic!("expected lookup switch");
    };
    assert!(lookup.pairs.is_empty());
    assert_eq!(code.position(lookup.default), Some(2));
}

#[test]
fn test_break_in_switch_inside_for_targets_switch_end() {
    let code = compile_ok(vec![for_stmt(
        vec![],
        None,
        vec![],
        block_stmt(vec![
            switch(int(1), vec![cases(&[1], vec![break_stmt()])]),
            break_stmt(),
        ]),
    )]);
    // 0 Push, 1 LookupSwitch, 2 Goto switch-break, 3 Goto loop-break, 4 Goto cond, 5 Halt
    assert_eq!(code.opcodes(), vec![Push, LookupSwitch, Goto, Goto, Goto, Halt]);
    assert_eq!(branch_target(&code, 2), 3);
    assert_eq!(branch_target(&code, 3), 5);
    assert_eq!(branch_target(&code, 4), 0);
}

// ============================================================================
// Try / catch / finally
// ============================================================================

fn invoke_count(code: &Bytecode, name: &str) -> usize {
    code.instructions
        .iter()
        .filter(|i| matches!(&i.operand, Some(Operand::Call { name: n, .. }) if n == name))
        .count()
}

#[test]
fn test_finally_replicated_per_exit() {
    let code = compile_ok(vec![try_stmt(
        vec![void_call("body")],
        vec![
            catch("IllegalStateException", "e", vec![void_call("first")]),
            catch("RuntimeException", "r", vec![void_call("second")]),
        ],
        Some(vec![void_call("fin")]),
    )]);
    assert_eq!(invoke_count(&code, "fin"), 4);
    assert_eq!(code.count(Throw), 1);

    let types: Vec<Option<&str>> = code.handlers.iter().map(|h| h.catch_type.as_deref()).collect();
    assert_eq!(
        types,
        vec![
            Some("IllegalStateException"),
            Some("RuntimeException"),
            None,
            None,
            None,
            None
        ]
    );

    let try_range = (code.handlers[0].start, code.handlers[0].end);
    assert_eq!(try_range, (0, 1));
    assert_eq!((code.handlers[2].start, code.handlers[2].end), try_range);

    // The finally handler protects only its own store.
    let own = &code.handlers[5];
    assert_eq!(own.start, own.handler);
    assert_eq!(own.end, own.start + 1);
    assert_eq!(code.instructions[own.start].opcode, Store);
}

#[test]
fn test_try_catch_without_finally() {
    let code = compile_ok(vec![try_stmt(
        vec![void_call("body")],
        vec![catch("Exception", "e", vec![])],
        None,
    )]);
    // 0 Invoke, 1 Goto end, 2 Store $e, 3 Goto end, 4 Halt
    assert_eq!(code.opcodes(), vec![Invoke, Goto, Store, Goto, Halt]);
    assert_eq!(code.handlers.len(), 1);
    assert_eq!(code.handlers[0].handler, 2);
    assert_eq!(code.count(Throw), 0);
}

#[test]
fn test_try_finally_without_catch() {
    let code = compile_ok(vec![try_stmt(
        vec![void_call("body")],
        vec![],
        Some(vec![void_call("fin")]),
    )]);
    assert_eq!(invoke_count(&code, "fin"), 2);
    assert_eq!(code.handlers.len(), 2);
    assert!(code.handlers.iter().all(|h| h.catch_type.is_none()));
}

#[test]
fn test_break_across_finally_inlines_copy_outside_handlers() {
    let code = compile_ok(vec![while_stmt(
        boolean(true),
        try_stmt(
            vec![
                if_stmt(call("done", vec![], Type::Boolean), break_stmt(), None),
                void_call("work"),
            ],
            vec![catch("Exception", "e", vec![])],
            Some(vec![void_call("fin")]),
        ),
    )]);
    // Try exit, catch exit, handler, break.
    assert_eq!(invoke_count(&code, "fin"), 4);

    let call_pc = |name: &str| {
        code.instructions
            .iter()
            .position(|i| matches!(&i.operand, Some(Operand::Call { name: n, .. }) if n == name))
            .expect("call emitted")
    };
    let inlined = call_pc("fin");
    assert!(inlined < call_pc("work"));
    assert!(code.handlers.iter().all(|h| !h.covers(inlined)));
    assert_eq!(code.instructions[inlined + 1].opcode, Goto);
    assert_eq!(branch_target(&code, inlined + 1), code.instructions.len() - 1);

    // Both the catch and the catch-all still cover the rest of the try block.
    for pc in [call_pc("done"), call_pc("work")] {
        let covering: Vec<Option<&str>> = code
            .handlers
            .iter()
            .filter(|h| h.covers(pc))
            .map(|h| h.catch_type.as_deref())
            .collect();
        assert_eq!(covering, vec![Some("Exception"), None], "pc {pc}");
    }
}

#[test]
fn test_nested_try_registers_inner_first() {
    let code = compile_ok(vec![try_stmt(
        vec![try_stmt(
            vec![void_call("inner")],
            vec![catch("ArithmeticException", "a", vec![])],
            None,
        )],
        vec![catch("Exception", "e", vec![])],
        None,
    )]);
    assert_eq!(code.handlers[0].catch_type.as_deref(), Some("ArithmeticException"));
    assert_eq!(code.handlers[1].catch_type.as_deref(), Some("Exception"));
}

// ============================================================================
// Increment / decrement
// ============================================================================

#[test]
fn test_post_increment_statement() {
    let code = compile_ok(vec![
        local("x", Type::Int, Some(int(5))),
        expr(update(UpdateOperator::PostIncrement, var("x"))),
    ]);
    assert_eq!(code.opcodes(), vec![Push, Store, Inc, Halt]);
}

#[test]
fn test_post_increment_value() {
    let code = compile_ok(vec![
        local("x", Type::Int, Some(int(5))),
        local("y", Type::Int, Some(update(UpdateOperator::PostIncrement, var("x")))),
    ]);
    assert_eq!(code.opcodes(), vec![Push, Store, Load, Inc, Store, Halt]);
}

#[test]
fn test_pre_decrement_value() {
    let code = compile_ok(vec![
        local("x", Type::Int, Some(int(5))),
        local("y", Type::Int, Some(update(UpdateOperator::PreDecrement, var("x")))),
    ]);
    assert_eq!(code.opcodes(), vec![Push, Store, Inc, Load, Store, Halt]);
    assert_eq!(
        code.instructions[2].operand,
        Some(Operand::Increment { local: 0, delta: -1 })
    );
}

#[test]
fn test_field_post_increment_value() {
    let counter = Type::Reference("Counter".into());
    let code = compile_ok(vec![
        local("o", counter, Some(new_object("Counter"))),
        local(
            "y",
            Type::Long,
            Some(update(
                UpdateOperator::PostIncrement,
                field(var("o"), "n", Type::Long),
            )),
        ),
    ]);
    assert_eq!(
        code.opcodes(),
        vec![New, Store, Load, Dup, GetField, DupX1, LConst1, Add, PutField, Store, Halt]
    );
}

#[test]
fn test_field_pre_decrement_statement() {
    let code = compile_ok(vec![
        local("o", Type::Reference("Counter".into()), Some(new_object("Counter"))),
        expr(update(
            UpdateOperator::PreDecrement,
            field(var("o"), "n", Type::Int),
        )),
    ]);
    assert_eq!(
        code.opcodes(),
        vec![New, Store, Load, Dup, GetField, Push, Sub, PutField, Halt]
    );
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_constant_short_forms() {
    let code = compile_ok(vec![
        local("a", Type::Long, Some(long(0))),
        local("b", Type::Long, Some(long(7))),
        local("c", Type::Double, Some(double(1.0))),
        local("d", Type::Double, Some(double(-0.0))),
    ]);
    assert_eq!(
        code.opcodes(),
        vec![LConst0, Store, Push, Store, DConst1, Store, Push, Store, Halt]
    );
}

#[test]
fn test_widening_on_mixed_arithmetic() {
    let code = compile_ok(vec![
        local("i", Type::Int, Some(int(2))),
        local("l", Type::Long, Some(binary(BinaryOperator::Add, var("i"), long(3)))),
    ]);
    assert_eq!(
        code.opcodes(),
        vec![Push, Store, Load, I2L, Push, Add, Store, Halt]
    );
}

#[test]
fn test_short_circuit_condition() {
    let code = compile_ok(vec![if_stmt(
        binary(
            BinaryOperator::LogicalAnd,
            call("a", vec![], Type::Boolean),
            call("b", vec![], Type::Boolean),
        ),
        void_call("then"),
        None,
    )]);
    // 0 Invoke a, 1 IfEq else, 2 Invoke b, 3 IfEq else, 4 Invoke then, 5 Halt
    assert_eq!(code.opcodes(), vec![Invoke, IfEq, Invoke, IfEq, Invoke, Halt]);
    assert_eq!(branch_target(&code, 1), 5);
    assert_eq!(branch_target(&code, 3), 5);
}

#[test]
fn test_discarded_call_value_popped() {
    let code = compile_ok(vec![expr(call("f", vec![int(1)], Type::Int))]);
    assert_eq!(code.opcodes(), vec![Push, Invoke, Pop, Halt]);
}

#[test]
fn test_assignment_value_used() {
    let code = compile_ok(vec![
        local("a", Type::Int, None),
        local("b", Type::Int, Some(assign(var("a"), int(3)))),
    ]);
    assert_eq!(code.opcodes(), vec![Push, Dup, Store, Store, Halt]);
}

// ============================================================================
// Emitter contract
// ============================================================================

/// Records the order of sink calls.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    next: u32,
}

impl Emitter for Recorder {
    fn create_label(&mut self) -> Result<Label> {
        self.next += 1;
        self.events.push(format!("create L{}", self.next - 1));
        Ok(Label(self.next - 1))
    }

    fn place_label(&mut self, label: Label) {
        self.events.push(format!("place {label}"));
    }

    fn emit(&mut self, opcode: OpCode) {
        self.events.push(format!("{opcode:?}"));
    }

    fn emit_with(&mut self, opcode: OpCode, _operand: Operand) {
        self.events.push(format!("{opcode:?}"));
    }

    fn emit_branch(&mut self, opcode: OpCode, target: Label) {
        self.events.push(format!("{opcode:?} {target}"));
    }

    fn emit_table_switch(&mut self, _default: Label, _low: i32, _high: i32, _targets: Vec<Label>) {
        self.events.push("TableSwitch".into());
    }

    fn emit_lookup_switch(&mut self, _default: Label, _count: usize, _pairs: BTreeMap<i32, Label>) {
        self.events.push("LookupSwitch".into());
    }

    fn add_exception_handler(&mut self, start: Label, end: Label, handler: Label, _catch_type: Option<&str>) {
        self.events.push(format!("handler {start}..{end} -> {handler}"));
    }
}

#[test]
fn test_loop_labels_created_before_body() {
    let program = crate::analyze(
        &Program {
            body: vec![while_stmt(boolean(true), block_stmt(vec![break_stmt()]))],
        },
        &CompilerConfig::default(),
    )
    .unwrap();
    let mut compiler = Compiler::new(Recorder::default());
    compiler.compile(&program).unwrap();
    let events = compiler.into_emitter().events;
    assert_eq!(
        events,
        vec![
            "create L0", "create L1", "create L2", "create L3", "place L0", "Goto L2", "Goto L0",
            "place L2", "place L1", "Halt",
        ]
    );
}
