// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Structural dump of the input tree.
//!
//! Every node becomes a single-key JSON object named `<Kind>:<line>` whose
//! value holds the node's children. The dump reads the tree only and never
//! touches analysis or code generation.

use serde_json::{Map, Value, json};

use crate::ast::{
    BlockStatement, CatchClause, Expression, ExpressionKind, Literal, Program, Statement,
    SwitchGroup, SwitchLabel,
};

/// Dumps a method body.
pub fn to_json(program: &Program) -> Value {
    json!({ "MethodBody": statements(&program.body) })
}

fn node(kind: &str, line: u32, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(format!("{}:{}", kind, line), body);
    Value::Object(map)
}

fn statements(stmts: &[Statement]) -> Value {
    Value::Array(stmts.iter().map(statement).collect())
}

fn block(b: &BlockStatement) -> Value {
    node("Block", b.line, statements(&b.body))
}

/// Dumps one statement.
pub fn statement(stmt: &Statement) -> Value {
    match stmt {
        Statement::Block(b) => block(b),
        Statement::LocalDecl(d) => node(
            "LocalVariableDeclaration",
            d.line,
            json!({
                "Name": d.name,
                "Type": d.ty.to_string(),
                "Initializer": d.init.as_ref().map(expression),
            }),
        ),
        Statement::Expression(s) => node("StatementExpression", s.line, expression(&s.expression)),
        Statement::If(s) => node(
            "IfStatement",
            s.line,
            json!({
                "Condition": expression(&s.condition),
                "Then": statement(&s.consequent),
                "Else": s.alternate.as_deref().map(statement),
            }),
        ),
        Statement::While(s) => node(
            "WhileStatement",
            s.line,
            json!({ "Condition": expression(&s.condition), "Body": statement(&s.body) }),
        ),
        Statement::Do(s) => node(
            "DoStatement",
            s.line,
            json!({ "Body": statement(&s.body), "Condition": expression(&s.condition) }),
        ),
        Statement::For(s) => node(
            "ForStatement",
            s.line,
            json!({
                "Init": statements(&s.init),
                "Condition": s.condition.as_ref().map(expression),
                "Update": statements(&s.update),
                "Body": statement(&s.body),
            }),
        ),
        Statement::Switch(s) => node(
            "SwitchStatement",
            s.line,
            json!({
                "Selector": expression(&s.selector),
                "Groups": s.groups.iter().map(switch_group).collect::<Vec<_>>(),
            }),
        ),
        Statement::Break(s) => node("BreakStatement", s.line, Value::Null),
        Statement::Continue(s) => node("ContinueStatement", s.line, Value::Null),
        Statement::Try(s) => node(
            "TryStatement",
            s.line,
            json!({
                "TryBlock": block(&s.block),
                "CatchBlocks": s.catches.iter().map(catch_clause).collect::<Vec<_>>(),
                "FinallyBlock": s.finalizer.as_ref().map(block),
            }),
        ),
        Statement::Throw(s) => node("ThrowStatement", s.line, expression(&s.argument)),
        Statement::Empty => node("EmptyStatement", 0, Value::Null),
    }
}

fn switch_group(group: &SwitchGroup) -> Value {
    let labels: Vec<Value> = group
        .labels
        .iter()
        .map(|l| match l {
            SwitchLabel::Case(e) => json!({ "Case": expression(e) }),
            SwitchLabel::Default => json!("Default"),
        })
        .collect();
    json!({
        "SwitchStatementGroup": {
            "Labels": labels,
            "Statements": statements(&group.body),
        }
    })
}

fn catch_clause(clause: &CatchClause) -> Value {
    node(
        "CatchClause",
        clause.line,
        json!({
            "Type": clause.exception_type,
            "Parameter": clause.param,
            "Body": block(&clause.body),
        }),
    )
}

/// Dumps one expression.
pub fn expression(expr: &Expression) -> Value {
    let line = expr.line;
    match &expr.kind {
        ExpressionKind::Literal(lit) => match lit {
            Literal::Int(v) => node("LiteralInt", line, json!(v)),
            Literal::Long(v) => node("LiteralLong", line, json!(v)),
            Literal::Double(v) => node("LiteralDouble", line, json!(v)),
            Literal::Boolean(v) => node("LiteralBoolean", line, json!(v)),
            Literal::Null => node("LiteralNull", line, Value::Null),
        },
        ExpressionKind::Variable(name) => node("Variable", line, json!(name)),
        ExpressionKind::Field(f) => node(
            "FieldSelection",
            line,
            json!({ "Target": expression(&f.target), "Name": f.name }),
        ),
        ExpressionKind::Assignment(a) => node(
            "Assignment",
            line,
            json!({ "Left": expression(&a.target), "Right": expression(&a.value) }),
        ),
        ExpressionKind::Binary(b) => node(
            "BinaryExpression",
            line,
            json!({
                "Operator": b.operator.symbol(),
                "Left": expression(&b.left),
                "Right": expression(&b.right),
            }),
        ),
        ExpressionKind::Unary(u) => node(
            "UnaryExpression",
            line,
            json!({ "Operator": format!("{:?}", u.operator), "Operand": expression(&u.argument) }),
        ),
        ExpressionKind::Update(u) => {
            let kind = match u.operator {
                crate::ast::UpdateOperator::PreIncrement => "PreIncrement",
                crate::ast::UpdateOperator::PreDecrement => "PreDecrement",
                crate::ast::UpdateOperator::PostIncrement => "PostIncrement",
                crate::ast::UpdateOperator::PostDecrement => "PostDecrement",
            };
            node(kind, line, expression(&u.argument))
        }
        ExpressionKind::Call(c) => node(
            "MethodCall",
            line,
            json!({
                "Name": c.callee,
                "Arguments": c.arguments.iter().map(expression).collect::<Vec<_>>(),
            }),
        ),
        ExpressionKind::New(n) => node("NewObject", line, json!(n.class)),
    }
}
