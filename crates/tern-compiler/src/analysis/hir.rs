// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The annotated tree handed from analysis to generation.
//!
//! Names are resolved to slots, every expression carries its type, jumps name
//! the construct they leave, and each switch owns its dispatch descriptor. A
//! value of this type only exists for a method that analyzed without errors.

use crate::analysis::enclosing::ConstructId;
use crate::analysis::switch::SwitchDispatch;
use crate::ast::{BinaryOperator, UnaryOperator, UpdateOperator};
use crate::types::Type;

/// An analyzed method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements of the body
    pub body: Vec<Stmt>,
    /// Number of local slots the body needs
    pub max_locals: u16,
}

/// Break/continue bookkeeping of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jumps {
    /// The loop's id, named by the jumps that target it
    pub id: ConstructId,
    /// Some `break` targets this loop
    pub has_break: bool,
    /// Some `continue` targets this loop
    pub has_continue: bool,
}

/// An analyzed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Block
    Block(Vec<Stmt>),
    /// Store an initializer into a freshly declared local
    LocalInit {
        /// Slot of the local
        slot: u16,
        /// Initial value
        value: Expr,
    },
    /// Expression statement
    Expression {
        /// The expression
        expr: Expr,
        /// Whether a leftover value must be popped
        discard: bool,
    },
    /// If statement
    If {
        /// The condition
        condition: Expr,
        /// The then branch
        consequent: Box<Stmt>,
        /// The else branch
        alternate: Option<Box<Stmt>>,
    },
    /// While loop
    While {
        /// Jump bookkeeping
        jumps: Jumps,
        /// The condition
        condition: Expr,
        /// The body
        body: Box<Stmt>,
    },
    /// Do-while loop
    Do {
        /// Jump bookkeeping
        jumps: Jumps,
        /// The body
        body: Box<Stmt>,
        /// The condition
        condition: Expr,
    },
    /// For loop
    For {
        /// Jump bookkeeping
        jumps: Jumps,
        /// Initialization
        init: Vec<Stmt>,
        /// The condition, if any
        condition: Option<Expr>,
        /// Update step
        update: Vec<Stmt>,
        /// The body
        body: Box<Stmt>,
    },
    /// Switch statement
    Switch(Switch),
    /// Try statement
    Try(Try),
    /// Jump past the end of a construct
    Break {
        /// The construct left
        target: ConstructId,
    },
    /// Jump to a loop's continue point
    Continue {
        /// The loop restarted
        target: ConstructId,
    },
    /// Throw statement
    Throw(Expr),
    /// Nothing to do
    Empty,
}

/// An analyzed switch.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    /// The switch's id
    pub id: ConstructId,
    /// Some `break` targets this switch
    pub has_break: bool,
    /// The int selector
    pub selector: Expr,
    /// Statement groups in source order
    pub groups: Vec<Vec<Stmt>>,
    /// How the selector is dispatched
    pub dispatch: SwitchDispatch,
}

/// An analyzed try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Try {
    /// The protected block
    pub block: Vec<Stmt>,
    /// Catch clauses in source order
    pub catches: Vec<Catch>,
    /// The finally block
    pub finally: Option<Finally>,
}

/// An analyzed catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// The caught class
    pub exception_type: String,
    /// Slot bound to the caught exception
    pub slot: u16,
    /// The catch body
    pub body: Vec<Stmt>,
}

/// An analyzed finally block.
#[derive(Debug, Clone, PartialEq)]
pub struct Finally {
    /// Slot holding the in-flight exception during unwinding
    pub slot: u16,
    /// The finally body
    pub body: Vec<Stmt>,
}

/// A typed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Static type
    pub ty: Type,
    /// The expression form
    pub kind: ExprKind,
}

impl Expr {
    /// Creates a typed expression.
    pub fn new(ty: Type, kind: ExprKind) -> Self {
        Self { ty, kind }
    }

    /// The placeholder left where analysis failed.
    pub fn error() -> Self {
        Self::new(Type::Any, ExprKind::Error)
    }
}

/// Analyzed expression forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// int constant
    Int(i32),
    /// long constant
    Long(i64),
    /// double constant
    Double(f64),
    /// boolean constant
    Bool(bool),
    /// null
    Null,
    /// Load a local
    Local(u16),
    /// Load a field
    Field {
        /// The object
        target: Box<Expr>,
        /// The field name
        name: String,
    },
    /// Widen an int or long operand to `ty`
    Widen(Box<Expr>),
    /// Assignment
    Assign {
        /// Where to store
        place: Place,
        /// The stored value
        value: Box<Expr>,
        /// Whether the assigned value is consumed
        used: bool,
    },
    /// Binary operation; operands share one type after widening
    Binary {
        /// The operator
        op: BinaryOperator,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<Expr>,
    },
    /// Pre/post increment or decrement
    Increment {
        /// The operator
        op: UpdateOperator,
        /// The mutated location
        place: Place,
        /// Whether the expression's value is consumed
        used: bool,
    },
    /// Method call
    Call {
        /// Method name
        name: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Object creation
    New(String),
    /// Placeholder for a failed sub-expression
    Error,
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    /// A local slot
    Local(u16),
    /// A field of an object
    Field {
        /// The object
        target: Box<Expr>,
        /// The field name
        name: String,
    },
}
