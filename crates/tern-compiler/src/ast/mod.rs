// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for method bodies.
//!
//! The tree is produced by an external parser and handed to the analyzer as is.
//! Every node carries the source line it was parsed from so diagnostics can point
//! back at it. The types derive `serde` so a tree can be read from JSON.

pub mod build;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// A method body: the unit that is analyzed and generated in one go.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// The statements of the body
    pub body: Vec<Statement>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Block statement { ... }
    Block(BlockStatement),
    /// Local variable declaration
    LocalDecl(LocalDeclaration),
    /// Expression statement
    Expression(ExpressionStatement),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    Do(DoStatement),
    /// For statement
    For(ForStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// Break statement
    Break(JumpStatement),
    /// Continue statement
    Continue(JumpStatement),
    /// Try statement
    Try(TryStatement),
    /// Throw statement
    Throw(ThrowStatement),
    /// Empty statement (;)
    Empty,
}

impl Statement {
    /// Returns the source line of this statement (0 for `Empty`).
    pub fn line(&self) -> u32 {
        match self {
            Statement::Block(s) => s.line,
            Statement::LocalDecl(s) => s.line,
            Statement::Expression(s) => s.line,
            Statement::If(s) => s.line,
            Statement::While(s) => s.line,
            Statement::Do(s) => s.line,
            Statement::For(s) => s.line,
            Statement::Switch(s) => s.line,
            Statement::Break(s) | Statement::Continue(s) => s.line,
            Statement::Try(s) => s.line,
            Statement::Throw(s) => s.line,
            Statement::Empty => 0,
        }
    }

    /// Returns this statement with its source line replaced.
    pub fn at(mut self, line: u32) -> Self {
        match &mut self {
            Statement::Block(s) => s.line = line,
            Statement::LocalDecl(s) => s.line = line,
            Statement::Expression(s) => s.line = line,
            Statement::If(s) => s.line = line,
            Statement::While(s) => s.line = line,
            Statement::Do(s) => s.line = line,
            Statement::For(s) => s.line = line,
            Statement::Switch(s) => s.line = line,
            Statement::Break(s) | Statement::Continue(s) => s.line = line,
            Statement::Try(s) => s.line = line,
            Statement::Throw(s) => s.line = line,
            Statement::Empty => {}
        }
        self
    }
}

/// A block statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockStatement {
    /// Source line
    pub line: u32,
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// A local variable declaration with an optional initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDeclaration {
    /// Source line
    pub line: u32,
    /// The variable name
    pub name: String,
    /// The declared type
    pub ty: Type,
    /// Optional initializer
    pub init: Option<Expression>,
}

/// An expression used as a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    /// Source line
    pub line: u32,
    /// The expression
    pub expression: Expression,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// Source line
    pub line: u32,
    /// The condition
    pub condition: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    /// Source line
    pub line: u32,
    /// The condition
    pub condition: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoStatement {
    /// Source line
    pub line: u32,
    /// The loop body
    pub body: Box<Statement>,
    /// The condition, tested after each iteration
    pub condition: Expression,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    /// Source line
    pub line: u32,
    /// Initialization statements, run once
    pub init: Vec<Statement>,
    /// The condition; `None` loops until a `break`
    pub condition: Option<Expression>,
    /// Update statements, run after the body and on `continue`
    pub update: Vec<Statement>,
    /// The loop body
    pub body: Box<Statement>,
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    /// Source line
    pub line: u32,
    /// The selector expression
    pub selector: Expression,
    /// The statement groups, in source order
    pub groups: Vec<SwitchGroup>,
}

/// A run of case labels followed by the statements they select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchGroup {
    /// The labels of this group
    pub labels: Vec<SwitchLabel>,
    /// The statements, which fall through into the next group
    pub body: Vec<Statement>,
}

/// A single switch label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchLabel {
    /// `case <constant>:`
    Case(Expression),
    /// `default:`
    Default,
}

/// A break or continue statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JumpStatement {
    /// Source line
    pub line: u32,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    /// Source line
    pub line: u32,
    /// The try block
    pub block: BlockStatement,
    /// The catch clauses, tried in order
    pub catches: Vec<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Source line
    pub line: u32,
    /// The declared exception class
    pub exception_type: String,
    /// The parameter bound to the caught exception
    pub param: String,
    /// The catch body
    pub body: BlockStatement,
}

/// A throw statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStatement {
    /// Source line
    pub line: u32,
    /// The thrown value
    pub argument: Expression,
}

/// An expression together with its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Source line
    pub line: u32,
    /// The expression itself
    pub kind: ExpressionKind,
}

impl Expression {
    /// Creates an expression on line 0.
    pub fn new(kind: ExpressionKind) -> Self {
        Self { line: 0, kind }
    }

    /// Returns this expression with its source line replaced.
    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Whether this expression denotes an assignable location.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Variable(_) | ExpressionKind::Field(_)
        )
    }
}

/// The expression forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// Literal value
    Literal(Literal),
    /// Local variable reference
    Variable(String),
    /// Field selection
    Field(FieldExpression),
    /// Assignment
    Assignment(AssignmentExpression),
    /// Binary expression
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Pre/post increment or decrement
    Update(UpdateExpression),
    /// Call expression
    Call(CallExpression),
    /// Object creation
    New(NewExpression),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// int literal
    Int(i32),
    /// long literal
    Long(i64),
    /// double literal
    Double(f64),
    /// boolean literal
    Boolean(bool),
    /// null literal
    Null,
}

/// A field selection `target.name`.
///
/// Field types come resolved from the external type collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpression {
    /// The object whose field is selected
    pub target: Box<Expression>,
    /// The field name
    pub name: String,
    /// The declared field type
    pub ty: Type,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentExpression {
    /// The left-hand side
    pub target: Box<Expression>,
    /// The right-hand side
    pub value: Box<Expression>,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Logical
    LogicalAnd,
    LogicalOr,
}

impl BinaryOperator {
    /// Whether this is `+ - * / %`.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    /// Whether this is `< <= > >=`.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanEqual | Self::GreaterThan | Self::GreaterThanEqual
        )
    }

    /// The operator as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        }
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
}

/// A pre/post increment or decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The location being mutated
    pub argument: Box<Expression>,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOperator {
    /// ++x
    PreIncrement,
    /// --x
    PreDecrement,
    /// x++
    PostIncrement,
    /// x--
    PostDecrement,
}

impl UpdateOperator {
    /// +1 or -1.
    pub fn delta(self) -> i32 {
        match self {
            Self::PreIncrement | Self::PostIncrement => 1,
            Self::PreDecrement | Self::PostDecrement => -1,
        }
    }

    /// Whether the expression's value is the one before the update.
    pub fn is_postfix(self) -> bool {
        matches!(self, Self::PostIncrement | Self::PostDecrement)
    }

    /// The operator as printed in dumps and diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::PreIncrement => "++ (pre)",
            Self::PreDecrement => "-- (pre)",
            Self::PostIncrement => "++ (post)",
            Self::PostDecrement => "-- (post)",
        }
    }
}

/// A call to a named method.
///
/// Method resolution is external; the declared return type arrives with the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    /// The method name
    pub callee: String,
    /// The arguments
    pub arguments: Vec<Expression>,
    /// The declared return type
    pub returns: Type,
}

/// An object creation `new C()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpression {
    /// The instantiated class
    pub class: String,
}
