// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Control-flow integration tests
//!
//! Compiles method bodies and runs them on the reference VM, checking the
//! observable call trace and final local values.

use tern_compiler::ast::build::*;
use tern_compiler::ast::{BinaryOperator, Expression, Program, Statement, UpdateOperator};
use tern_compiler::compiler::OpCode;
use tern_compiler::types::Type;
use tern_compiler::vm::{VM, Value};
use tern_compiler::{Bytecode, CompilerConfig, Error, compile};

fn compile_ok(body: Vec<Statement>) -> Bytecode {
    compile(&Program { body }, &CompilerConfig::default()).expect("compilation should succeed")
}

/// Compiles and runs `body`, returning the VM for inspection.
fn run(body: Vec<Statement>) -> VM {
    let code = compile_ok(body);
    let mut vm = VM::new(&CompilerConfig::default());
    vm.execute(&code).expect("execution should succeed");
    vm
}

/// Compiles and runs `body`, expecting it to end with an uncaught exception.
fn run_uncaught(vm: &mut VM, body: Vec<Statement>) -> String {
    let code = compile_ok(body);
    match vm.execute(&code) {
        Err(Error::Uncaught { class }) => class,
        other => panic!("expected an uncaught exception, got {other:?}"),
    }
}

fn calls(vm: &VM) -> Vec<String> {
    vm.calls()
        .iter()
        .map(|c| {
            let args: Vec<String> = c.args.iter().map(ToString::to_string).collect();
            if args.is_empty() {
                c.name.clone()
            } else {
                format!("{}({})", c.name, args.join(","))
            }
        })
        .collect()
}

fn mark(name: &str) -> Statement {
    expr(call(name, vec![], Type::Void))
}

fn mark_with(name: &str, arg: Expression) -> Statement {
    expr(call(name, vec![arg], Type::Void))
}

fn op(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    binary(operator, left, right)
}

fn post_inc(name: &str) -> Expression {
    update(UpdateOperator::PostIncrement, var(name))
}

fn counting_for(limit: i32, body: Vec<Statement>) -> Statement {
    for_stmt(
        vec![local("i", Type::Int, Some(int(0)))],
        Some(op(BinaryOperator::LessThan, var("i"), int(limit))),
        vec![expr(post_inc("i"))],
        block_stmt(body),
    )
}

// ============================================================================
// Break and continue
// ============================================================================

#[test]
fn test_break_in_switch_leaves_only_the_switch() {
    let vm = run(vec![
        local("n", Type::Int, Some(int(0))),
        counting_for(
            3,
            vec![
                switch(
                    var("i"),
                    vec![
                        cases(&[1], vec![break_stmt()]),
                        default_group(vec![mark_with("seen", var("i"))]),
                    ],
                ),
                expr(post_inc("n")),
            ],
        ),
    ]);
    assert_eq!(calls(&vm), vec!["seen(0)", "seen(2)"]);
    assert_eq!(vm.local(0), Some(Value::Int(3)));
}

#[test]
fn test_for_continue_runs_update() {
    let vm = run(vec![counting_for(
        5,
        vec![
            if_stmt(
                op(
                    BinaryOperator::Equal,
                    op(BinaryOperator::Modulo, var("i"), int(2)),
                    int(0),
                ),
                continue_stmt(),
                None,
            ),
            mark_with("odd", var("i")),
        ],
    )]);
    assert_eq!(calls(&vm), vec!["odd(1)", "odd(3)"]);
}

#[test]
fn test_for_break_exits_loop() {
    let vm = run(vec![
        local("last", Type::Int, Some(int(-1))),
        for_stmt(
            vec![local("i", Type::Int, Some(int(0)))],
            None,
            vec![expr(post_inc("i"))],
            block_stmt(vec![
                if_stmt(
                    op(BinaryOperator::GreaterThanEqual, var("i"), int(4)),
                    break_stmt(),
                    None,
                ),
                expr(assign(var("last"), var("i"))),
            ]),
        ),
    ]);
    assert_eq!(vm.local(0), Some(Value::Int(3)));
}

#[test]
fn test_while_continue_rechecks_condition() {
    let vm = run(vec![
        local("i", Type::Int, Some(int(0))),
        while_stmt(
            op(BinaryOperator::LessThan, var("i"), int(4)),
            block_stmt(vec![
                expr(post_inc("i")),
                if_stmt(op(BinaryOperator::Equal, var("i"), int(2)), continue_stmt(), None),
                mark_with("w", var("i")),
            ]),
        ),
    ]);
    assert_eq!(calls(&vm), vec!["w(1)", "w(3)", "w(4)"]);
}

#[test]
fn test_do_continue_evaluates_condition() {
    let vm = run(vec![
        local("i", Type::Int, Some(int(0))),
        do_stmt(
            block_stmt(vec![
                expr(post_inc("i")),
                if_stmt(op(BinaryOperator::Equal, var("i"), int(2)), continue_stmt(), None),
                mark_with("d", var("i")),
            ]),
            op(BinaryOperator::LessThan, var("i"), int(3)),
        ),
    ]);
    assert_eq!(calls(&vm), vec!["d(1)", "d(3)"]);
}

#[test]
fn test_do_body_runs_once_when_condition_false() {
    let vm = run(vec![do_stmt(block_stmt(vec![mark("once")]), boolean(false))]);
    assert_eq!(calls(&vm), vec!["once"]);
}

#[test]
fn test_break_from_nested_loop_targets_inner() {
    let vm = run(vec![counting_for(
        2,
        vec![while_stmt(
            boolean(true),
            block_stmt(vec![mark_with("inner", var("i")), break_stmt()]),
        )],
    )]);
    assert_eq!(calls(&vm), vec!["inner(0)", "inner(1)"]);
}

// ============================================================================
// Switch
// ============================================================================

fn dispatch(values: &[i32], selector: i32) -> (Bytecode, Vec<String>) {
    let mut groups: Vec<_> = values
        .iter()
        .map(|v| cases(&[*v], vec![mark_with("hit", int(*v)), break_stmt()]))
        .collect();
    groups.push(default_group(vec![mark("other")]));
    let body = vec![
        local("k", Type::Int, Some(int(selector))),
        switch(var("k"), groups),
    ];
    let code = compile_ok(body);
    let mut vm = VM::new(&CompilerConfig::default());
    vm.execute(&code).expect("execution should succeed");
    (code, calls(&vm))
}

#[test]
fn test_dense_switch_uses_table() {
    let dense = [0, 1, 2, 3, 4];
    let (code, trace) = dispatch(&dense, 3);
    assert_eq!(code.count(OpCode::TableSwitch), 1);
    assert_eq!(code.count(OpCode::LookupSwitch), 0);
    assert_eq!(trace, vec!["hit(3)"]);

    assert_eq!(dispatch(&dense, 9).1, vec!["other"]);
    assert_eq!(dispatch(&dense, -1).1, vec!["other"]);
}

#[test]
fn test_table_gap_routes_to_default() {
    let (code, trace) = dispatch(&[0, 1, 3, 4], 2);
    assert_eq!(code.count(OpCode::TableSwitch), 1);
    assert_eq!(trace, vec!["other"]);
}

#[test]
fn test_sparse_switch_uses_lookup() {
    let sparse = [0, 100, 250];
    let (code, trace) = dispatch(&sparse, 100);
    assert_eq!(code.count(OpCode::LookupSwitch), 1);
    assert_eq!(code.count(OpCode::TableSwitch), 0);
    assert_eq!(trace, vec!["hit(100)"]);

    assert_eq!(dispatch(&sparse, 50).1, vec!["other"]);
}

#[test]
fn test_negative_and_extreme_labels() {
    let (_, trace) = dispatch(&[i32::MIN, -1, i32::MAX], -1);
    assert_eq!(trace, vec!["hit(-1)"]);
    let (_, trace) = dispatch(&[i32::MIN, -1, i32::MAX], i32::MIN);
    assert_eq!(trace, vec![format!("hit({})", i32::MIN)]);
}

#[test]
fn test_switch_fallthrough() {
    let vm = run(vec![
        local("k", Type::Int, Some(int(1))),
        switch(
            var("k"),
            vec![
                cases(&[1], vec![mark("a")]),
                cases(&[2], vec![mark("b"), break_stmt()]),
                cases(&[3], vec![mark("c")]),
            ],
        ),
    ]);
    assert_eq!(calls(&vm), vec!["a", "b"]);
}

#[test]
fn test_switch_without_match_or_default_skips_body() {
    let vm = run(vec![
        local("k", Type::Int, Some(int(7))),
        switch(var("k"), vec![cases(&[1, 2], vec![mark("a")])]),
        mark("after"),
    ]);
    assert_eq!(calls(&vm), vec!["after"]);
}

#[test]
fn test_default_in_middle_falls_through() {
    let vm = run(vec![
        local("k", Type::Int, Some(int(5))),
        switch(
            var("k"),
            vec![
                cases(&[1], vec![mark("one")]),
                default_group(vec![mark("default")]),
                cases(&[2], vec![mark("two")]),
            ],
        ),
    ]);
    assert_eq!(calls(&vm), vec!["default", "two"]);
}

// ============================================================================
// Try, catch and finally
// ============================================================================

fn throw_new(class: &str) -> Statement {
    throw(new_object(class))
}

#[test]
fn test_finally_runs_on_normal_completion() {
    let vm = run(vec![
        try_stmt(vec![mark("body")], vec![], Some(vec![mark("finally")])),
        mark("after"),
    ]);
    assert_eq!(calls(&vm), vec!["body", "finally", "after"]);
}

#[test]
fn test_finally_runs_after_catch() {
    let vm = run(vec![
        try_stmt(
            vec![throw_new("IllegalStateException"), mark("unreachable")],
            vec![catch("RuntimeException", "e", vec![mark("caught")])],
            Some(vec![mark("finally")]),
        ),
        mark("after"),
    ]);
    assert_eq!(calls(&vm), vec!["caught", "finally", "after"]);
}

#[test]
fn test_first_matching_catch_wins() {
    let vm = run(vec![try_stmt(
        vec![throw_new("ArithmeticException")],
        vec![
            catch("IllegalStateException", "a", vec![mark("state")]),
            catch("RuntimeException", "b", vec![mark("runtime")]),
            catch("Exception", "c", vec![mark("exception")]),
        ],
        None,
    )]);
    assert_eq!(calls(&vm), vec!["runtime"]);
}

#[test]
fn test_finally_runs_once_and_rethrows_uncaught() {
    let mut vm = VM::new(&CompilerConfig::default());
    vm.register_native("boom", |_| Err("IllegalStateException".to_string()));
    let class = run_uncaught(
        &mut vm,
        vec![try_stmt(
            vec![mark("boom"), mark("unreachable")],
            vec![catch("ArithmeticException", "e", vec![mark("caught")])],
            Some(vec![mark("finally")]),
        )],
    );
    assert_eq!(class, "IllegalStateException");
    assert_eq!(vm.call_names(), vec!["boom", "finally"]);
}

#[test]
fn test_exception_from_catch_runs_finally() {
    let mut vm = VM::new(&CompilerConfig::default());
    let class = run_uncaught(
        &mut vm,
        vec![try_stmt(
            vec![throw_new("IllegalStateException")],
            vec![catch(
                "RuntimeException",
                "e",
                vec![mark("caught"), throw_new("ArithmeticException")],
            )],
            Some(vec![mark("finally")]),
        )],
    );
    assert_eq!(class, "ArithmeticException");
    assert_eq!(vm.call_names(), vec!["caught", "finally"]);
}

#[test]
fn test_catch_does_not_cover_itself() {
    let mut vm = VM::new(&CompilerConfig::default());
    let class = run_uncaught(
        &mut vm,
        vec![try_stmt(
            vec![throw_new("IllegalStateException")],
            vec![catch(
                "RuntimeException",
                "e",
                vec![mark("caught"), throw_new("IllegalStateException")],
            )],
            None,
        )],
    );
    assert_eq!(class, "IllegalStateException");
    assert_eq!(vm.call_names(), vec!["caught"]);
}

#[test]
fn test_nested_finally_then_outer_catch() {
    let vm = run(vec![try_stmt(
        vec![try_stmt(
            vec![throw_new("IllegalStateException")],
            vec![],
            Some(vec![mark("inner")]),
        )],
        vec![catch("Exception", "e", vec![mark("outer")])],
        Some(vec![mark("outer-finally")]),
    )]);
    assert_eq!(calls(&vm), vec!["inner", "outer", "outer-finally"]);
}

#[test]
fn test_loop_break_inside_try_stays_inside() {
    let vm = run(vec![try_stmt(
        vec![counting_for(
            10,
            vec![
                if_stmt(op(BinaryOperator::Equal, var("i"), int(2)), break_stmt(), None),
                mark_with("loop", var("i")),
            ],
        )],
        vec![],
        Some(vec![mark("finally")]),
    )]);
    assert_eq!(calls(&vm), vec!["loop(0)", "loop(1)", "finally"]);
}

fn equals(name: &str, value: i32) -> Expression {
    op(BinaryOperator::Equal, var(name), int(value))
}

#[test]
fn test_break_across_finally_runs_cleanup_once() {
    let vm = run(vec![
        counting_for(
            5,
            vec![try_stmt(
                vec![
                    if_stmt(equals("i", 1), break_stmt(), None),
                    mark_with("body", var("i")),
                ],
                vec![],
                Some(vec![mark_with("cleanup", var("i"))]),
            )],
        ),
        mark("after"),
    ]);
    assert_eq!(calls(&vm), vec!["body(0)", "cleanup(0)", "cleanup(1)", "after"]);
}

#[test]
fn test_continue_across_finally_runs_cleanup() {
    let vm = run(vec![counting_for(
        3,
        vec![try_stmt(
            vec![
                if_stmt(equals("i", 1), continue_stmt(), None),
                mark_with("body", var("i")),
            ],
            vec![],
            Some(vec![mark_with("cleanup", var("i"))]),
        )],
    )]);
    assert_eq!(
        calls(&vm),
        vec!["body(0)", "cleanup(0)", "cleanup(1)", "body(2)", "cleanup(2)"]
    );
}

#[test]
fn test_break_runs_nested_finally_innermost_first() {
    let vm = run(vec![
        while_stmt(
            boolean(true),
            try_stmt(
                vec![try_stmt(
                    vec![break_stmt()],
                    vec![catch("Exception", "e", vec![mark("caught")])],
                    Some(vec![mark("inner")]),
                )],
                vec![],
                Some(vec![mark("outer")]),
            ),
        ),
        mark("after"),
    ]);
    assert_eq!(calls(&vm), vec!["inner", "outer", "after"]);
}

#[test]
fn test_break_from_catch_runs_finally() {
    let vm = run(vec![counting_for(
        3,
        vec![try_stmt(
            vec![throw_new("IllegalStateException")],
            vec![catch(
                "RuntimeException",
                "e",
                vec![mark_with("caught", var("i")), break_stmt()],
            )],
            Some(vec![mark_with("cleanup", var("i"))]),
        )],
    )]);
    assert_eq!(calls(&vm), vec!["caught(0)", "cleanup(0)"]);
}

#[test]
fn test_throw_from_inlined_finally_skips_its_own_handlers() {
    let vm = run(vec![try_stmt(
        vec![while_stmt(
            boolean(true),
            try_stmt(
                vec![break_stmt()],
                vec![catch("Exception", "e", vec![mark("inner-catch")])],
                Some(vec![mark("cleanup"), throw_new("IllegalStateException")]),
            ),
        )],
        vec![catch("Exception", "e", vec![mark("outer-catch")])],
        None,
    )]);
    assert_eq!(calls(&vm), vec!["cleanup", "outer-catch"]);
}

#[test]
fn test_finally_rethrows_the_same_exception_object() {
    let vm = run(vec![
        local(
            "thrown",
            Type::Reference("IllegalStateException".into()),
            Some(new_object("IllegalStateException")),
        ),
        local("seen", Type::Reference("Exception".into()), Some(null())),
        try_stmt(
            vec![try_stmt(
                vec![throw(var("thrown"))],
                vec![],
                Some(vec![mark("finally")]),
            )],
            vec![catch("Exception", "e", vec![expr(assign(var("seen"), var("e")))])],
            None,
        ),
    ]);
    let thrown = vm.local(0).expect("slot 0");
    assert!(matches!(thrown, Value::Ref(_)));
    assert_eq!(vm.local(1), Some(thrown));
    assert_eq!(calls(&vm), vec!["finally"]);
}

#[test]
fn test_caught_exception_is_bound_to_parameter() {
    let vm = run(vec![
        local("saved", Type::Reference("Exception".into()), Some(null())),
        try_stmt(
            vec![throw_new("ArithmeticException")],
            vec![catch("Exception", "e", vec![expr(assign(var("saved"), var("e")))])],
            None,
        ),
    ]);
    let saved = vm.local(0).expect("slot 0");
    assert_eq!(vm.class_of(saved), Some("ArithmeticException"));
}

#[test]
fn test_division_by_zero_is_catchable() {
    let vm = run(vec![
        local("zero", Type::Int, Some(int(0))),
        try_stmt(
            vec![expr(assign(var("zero"), op(BinaryOperator::Divide, int(1), var("zero"))))],
            vec![catch("ArithmeticException", "e", vec![mark("div")])],
            None,
        ),
    ]);
    assert_eq!(calls(&vm), vec!["div"]);
}

// ============================================================================
// Increment and decrement
// ============================================================================

#[test]
fn test_postfix_statement_increments() {
    let vm = run(vec![local("x", Type::Int, Some(int(5))), expr(post_inc("x"))]);
    assert_eq!(vm.local(0), Some(Value::Int(6)));
}

#[test]
fn test_postfix_value_is_old_value() {
    let vm = run(vec![
        local("x", Type::Int, Some(int(5))),
        local("y", Type::Int, Some(post_inc("x"))),
    ]);
    assert_eq!(vm.local(0), Some(Value::Int(6)));
    assert_eq!(vm.local(1), Some(Value::Int(5)));
}

#[test]
fn test_prefix_value_is_new_value() {
    let vm = run(vec![
        local("x", Type::Int, Some(int(5))),
        local("y", Type::Int, Some(update(UpdateOperator::PreIncrement, var("x")))),
        local("z", Type::Int, Some(update(UpdateOperator::PreDecrement, var("x")))),
    ]);
    assert_eq!(vm.local(0), Some(Value::Int(5)));
    assert_eq!(vm.local(1), Some(Value::Int(6)));
    assert_eq!(vm.local(2), Some(Value::Int(5)));
}

#[test]
fn test_long_and_double_decrement() {
    let vm = run(vec![
        local("l", Type::Long, Some(long(5))),
        local("d", Type::Double, Some(double(1.5))),
        expr(update(UpdateOperator::PostDecrement, var("l"))),
        local("old", Type::Double, Some(update(UpdateOperator::PostDecrement, var("d")))),
    ]);
    assert_eq!(vm.local(0), Some(Value::Long(4)));
    assert_eq!(vm.local(1), Some(Value::Double(0.5)));
    assert_eq!(vm.local(2), Some(Value::Double(1.5)));
}

#[test]
fn test_field_increment() {
    let counter = || field(var("c"), "n", Type::Int);
    let vm = run(vec![
        local("c", Type::Reference("Counter".into()), Some(new_object("Counter"))),
        expr(assign(counter(), int(5))),
        local("old", Type::Int, Some(update(UpdateOperator::PostIncrement, counter()))),
        local("new", Type::Int, Some(update(UpdateOperator::PreIncrement, counter()))),
    ]);
    let c = vm.local(0).expect("slot 0");
    assert_eq!(vm.field(c, "n"), Some(Value::Int(7)));
    assert_eq!(vm.local(1), Some(Value::Int(5)));
    assert_eq!(vm.local(2), Some(Value::Int(7)));
}

#[test]
fn test_increment_wraps() {
    let vm = run(vec![local("x", Type::Int, Some(int(i32::MAX))), expr(post_inc("x"))]);
    assert_eq!(vm.local(0), Some(Value::Int(i32::MIN)));
}

#[test]
fn test_nan_comparison_takes_false_branch() {
    let vm = run(vec![
        local(
            "d",
            Type::Double,
            Some(op(BinaryOperator::Divide, double(0.0), double(0.0))),
        ),
        if_stmt(
            op(BinaryOperator::LessThan, var("d"), double(1.0)),
            mark("less"),
            Some(mark("not-less")),
        ),
        while_stmt(op(BinaryOperator::GreaterThanEqual, var("d"), int(0)), break_stmt()),
        mark("done"),
    ]);
    assert_eq!(calls(&vm), vec!["not-less", "done"]);
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_diagnostics_are_batched_in_order() {
    let program = Program {
        body: vec![
            break_stmt().at(2),
            while_stmt(int(1).at(4), Statement::Empty).at(4),
            local("x", Type::Int, Some(boolean(true).at(6))).at(6),
            expr(update(UpdateOperator::PostIncrement, int(3)).at(8)),
            counting_for(1, vec![switch(var("i"), vec![cases(&[0], vec![continue_stmt().at(11)])])]),
        ],
    };
    let err = compile(&program, &CompilerConfig::default()).unwrap_err();
    let Error::Semantic(diagnostics) = err else {
        panic!("expected semantic errors, got {err}");
    };
    let lines: Vec<u32> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 4, 6, 8, 11]);
}

#[test]
fn test_continue_in_switch_can_be_ignored() {
    let mut config = CompilerConfig::default();
    config.set("continue_in_switch", "ignore").unwrap();
    let program = Program {
        body: vec![
            local("k", Type::Int, Some(int(0))),
            switch(var("k"), vec![cases(&[0], vec![continue_stmt(), mark("after")])]),
        ],
    };
    let code = compile(&program, &config).unwrap();
    let mut vm = VM::new(&config);
    vm.execute(&code).unwrap();
    assert_eq!(vm.call_names(), vec!["after"]);
}

#[test]
fn test_label_budget_is_a_resource_error() {
    let config = CompilerConfig {
        max_labels: 2,
        ..Default::default()
    };
    let program = Program {
        body: vec![while_stmt(boolean(true), break_stmt())],
    };
    assert!(matches!(compile(&program, &config), Err(Error::Resource(_))));
}

// ============================================================================
// Structural dump
// ============================================================================

#[test]
fn test_dump_names_nodes_by_kind_and_line() {
    let program = Program {
        body: vec![
            while_stmt(
                op(BinaryOperator::LessThan, var("i").at(3), int(10).at(3)).at(3),
                expr(update(UpdateOperator::PostDecrement, var("i").at(4)).at(4)),
            )
            .at(3),
        ],
    };
    let dump = tern_compiler::dump::to_json(&program);
    let body = &dump["MethodBody"][0]["WhileStatement:3"];
    assert_eq!(body["Condition"]["BinaryExpression:3"]["Operator"], "<");
    assert_eq!(
        body["Body"]["StatementExpression:4"]["PostDecrement:4"]["Variable:4"],
        "i"
    );
}
