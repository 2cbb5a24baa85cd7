// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Terse constructors for building trees by hand.
//!
//! All nodes start on line 0; use `.at(line)` to place them.

use super::*;

fn boxed(e: Expression) -> Box<Expression> {
    Box::new(e)
}

/// `int` literal.
pub fn int(v: i32) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Int(v)))
}

/// `long` literal.
pub fn long(v: i64) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Long(v)))
}

/// `double` literal.
pub fn double(v: f64) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Double(v)))
}

/// `boolean` literal.
pub fn boolean(v: bool) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Boolean(v)))
}

/// `null`.
pub fn null() -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Null))
}

/// Local variable reference.
pub fn var(name: &str) -> Expression {
    Expression::new(ExpressionKind::Variable(name.to_string()))
}

/// `target.name` of the given type.
pub fn field(target: Expression, name: &str, ty: Type) -> Expression {
    Expression::new(ExpressionKind::Field(FieldExpression {
        target: boxed(target),
        name: name.to_string(),
        ty,
    }))
}

/// `target = value`.
pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::new(ExpressionKind::Assignment(AssignmentExpression {
        target: boxed(target),
        value: boxed(value),
    }))
}

/// `left op right`.
pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::new(ExpressionKind::Binary(BinaryExpression {
        operator,
        left: boxed(left),
        right: boxed(right),
    }))
}

/// `op argument`.
pub fn unary(operator: UnaryOperator, argument: Expression) -> Expression {
    Expression::new(ExpressionKind::Unary(UnaryExpression {
        operator,
        argument: boxed(argument),
    }))
}

/// `++x`, `x--` and friends.
pub fn update(operator: UpdateOperator, argument: Expression) -> Expression {
    Expression::new(ExpressionKind::Update(UpdateExpression {
        operator,
        argument: boxed(argument),
    }))
}

/// `callee(args)` returning `returns`.
pub fn call(callee: &str, arguments: Vec<Expression>, returns: Type) -> Expression {
    Expression::new(ExpressionKind::Call(CallExpression {
        callee: callee.to_string(),
        arguments,
        returns,
    }))
}

/// `new class()`.
pub fn new_object(class: &str) -> Expression {
    Expression::new(ExpressionKind::New(NewExpression {
        class: class.to_string(),
    }))
}

/// `expr;`
pub fn expr(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement {
        line: expression.line,
        expression,
    })
}

/// `ty name = init;`
pub fn local(name: &str, ty: Type, init: Option<Expression>) -> Statement {
    Statement::LocalDecl(LocalDeclaration {
        line: 0,
        name: name.to_string(),
        ty,
        init,
    })
}

/// `{ body }`
pub fn block(body: Vec<Statement>) -> BlockStatement {
    BlockStatement { line: 0, body }
}

/// `{ body }` as a statement.
pub fn block_stmt(body: Vec<Statement>) -> Statement {
    Statement::Block(block(body))
}

/// `if (condition) consequent else alternate`
pub fn if_stmt(condition: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
    Statement::If(IfStatement {
        line: 0,
        condition,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    })
}

/// `while (condition) body`
pub fn while_stmt(condition: Expression, body: Statement) -> Statement {
    Statement::While(WhileStatement {
        line: 0,
        condition,
        body: Box::new(body),
    })
}

/// `do body while (condition);`
pub fn do_stmt(body: Statement, condition: Expression) -> Statement {
    Statement::Do(DoStatement {
        line: 0,
        body: Box::new(body),
        condition,
    })
}

/// `for (init; condition; update) body`
pub fn for_stmt(
    init: Vec<Statement>,
    condition: Option<Expression>,
    update: Vec<Statement>,
    body: Statement,
) -> Statement {
    Statement::For(ForStatement {
        line: 0,
        init,
        condition,
        update,
        body: Box::new(body),
    })
}

/// `switch (selector) { groups }`
pub fn switch(selector: Expression, groups: Vec<SwitchGroup>) -> Statement {
    Statement::Switch(SwitchStatement {
        line: 0,
        selector,
        groups,
    })
}

/// A group of `case v:` labels for the given int values.
pub fn cases(values: &[i32], body: Vec<Statement>) -> SwitchGroup {
    SwitchGroup {
        labels: values.iter().map(|v| SwitchLabel::Case(int(*v))).collect(),
        body,
    }
}

/// A `default:` group.
pub fn default_group(body: Vec<Statement>) -> SwitchGroup {
    SwitchGroup {
        labels: vec![SwitchLabel::Default],
        body,
    }
}

/// `break;`
pub fn break_stmt() -> Statement {
    Statement::Break(JumpStatement::default())
}

/// `continue;`
pub fn continue_stmt() -> Statement {
    Statement::Continue(JumpStatement::default())
}

/// `catch (exception_type param) { body }`
pub fn catch(exception_type: &str, param: &str, body: Vec<Statement>) -> CatchClause {
    CatchClause {
        line: 0,
        exception_type: exception_type.to_string(),
        param: param.to_string(),
        body: block(body),
    }
}

/// `try { body } catches finally { finalizer }`
pub fn try_stmt(
    body: Vec<Statement>,
    catches: Vec<CatchClause>,
    finalizer: Option<Vec<Statement>>,
) -> Statement {
    Statement::Try(TryStatement {
        line: 0,
        block: block(body),
        catches,
        finalizer: finalizer.map(block),
    })
}

/// `throw argument;`
pub fn throw(argument: Expression) -> Statement {
    Statement::Throw(ThrowStatement { line: 0, argument })
}
