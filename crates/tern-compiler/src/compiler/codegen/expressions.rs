// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.
//!
//! ## Expression Compilation Overview
//!
//! | Expression | Key Operations | Stack Effect |
//! |------------|----------------|--------------|
//! | Literal | `Push`/`LConst*`/`DConst*`/`PushNull` | Push value |
//! | Local | `Load` | Push value |
//! | Field | `GetField` | Pop 1, push 1 |
//! | Arithmetic | `Add`/`Sub`/etc | Pop 2, push 1 |
//! | Comparison | compare-and-branch | Pop 2, push 0 or 1 |
//! | Assignment | `Store`/`PutField` | Push value only if used |
//! | Increment | `Inc` or `GetField`/`PutField` | Push value only if used |
//! | Call | `Invoke` | Pop N, push result unless void |
//!
//! ## Conditions
//!
//! Conditions are compiled by [`Compiler::compile_branch`], which jumps to a
//! target when the condition has a given truth value and falls through
//! otherwise. `&&`, `||` and `!` never materialise a boolean on the way.
//! A boolean used as a value is built from a branch:
//!
//! ```text
//!   [branch to false_label if expr is false]
//!   Push 1
//!   Goto end
//! false_label:
//!   Push 0
//! end:
//! ```
//!
//! ## Increment and Decrement
//!
//! Locals are updated in place. The value is loaded before `Inc` for the
//! postfix forms and after it for the prefix forms, and only when used:
//!
//! ```text
//! x++ (used)       ++x (used)      x++ (statement)
//!   Load $x          Inc $x +1       Inc $x +1
//!   Inc $x +1        Load $x
//! ```
//!
//! Fields go through the receiver:
//!
//! ```text
//! o.f++ (used)     ++o.f (used)
//!   [o]              [o]
//!   Dup              Dup
//!   GetField f       GetField f
//!   DupX1            Push 1
//!   Push 1           Add
//!   Add              DupX1
//!   PutField f       PutField f
//! ```

use super::Compiler;
use crate::Result;
use crate::analysis::hir::{Expr, ExprKind, Place};
use crate::ast::{BinaryOperator, UnaryOperator, UpdateOperator};
use crate::compiler::bytecode::{Label, OpCode, Operand};
use crate::compiler::emitter::Emitter;
use crate::types::Type;

impl<E: Emitter> Compiler<E> {
    /// Compiles an expression, leaving its value on the stack.
    ///
    /// Void calls and unused assignments/increments leave nothing.
    pub(super) fn compile_expression(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Int(v) => self.emitter.emit_with(OpCode::Push, Operand::Int(*v)),
            ExprKind::Long(v) => self.compile_long(*v),
            ExprKind::Double(v) => self.compile_double(*v),
            ExprKind::Bool(b) => self
                .emitter
                .emit_with(OpCode::Push, Operand::Int(i32::from(*b))),
            ExprKind::Null => self.emitter.emit(OpCode::PushNull),
            ExprKind::Local(slot) => self.emitter.emit_with(OpCode::Load, Operand::Local(*slot)),
            ExprKind::Field { target, name } => {
                self.compile_expression(target)?;
                self.emitter
                    .emit_with(OpCode::GetField, Operand::Name(name.clone()));
            }
            ExprKind::Widen(inner) => {
                self.compile_expression(inner)?;
                let opcode = match (&inner.ty, &expr.ty) {
                    (Type::Int, Type::Long) => OpCode::I2L,
                    (Type::Int, Type::Double) => OpCode::I2D,
                    (Type::Long, Type::Double) => OpCode::L2D,
                    (from, to) => panic!("no widening from {from} to {to}"),
                };
                self.emitter.emit(opcode);
            }
            ExprKind::Assign { place, value, used } => self.compile_assign(place, value, *used)?,
            ExprKind::Binary { op, left, right } if op.is_arithmetic() => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emitter.emit(match op {
                    BinaryOperator::Add => OpCode::Add,
                    BinaryOperator::Subtract => OpCode::Sub,
                    BinaryOperator::Multiply => OpCode::Mul,
                    BinaryOperator::Divide => OpCode::Div,
                    _ => OpCode::Rem,
                });
            }
            ExprKind::Binary { .. }
            | ExprKind::Unary {
                op: UnaryOperator::LogicalNot,
                ..
            } => self.compile_boolean_value(expr)?,
            ExprKind::Unary { op, operand } => {
                self.compile_expression(operand)?;
                match op {
                    UnaryOperator::Minus => self.emitter.emit(OpCode::Neg),
                    UnaryOperator::BitwiseNot => {
                        let all_ones = match operand.ty {
                            Type::Long => Operand::Long(-1),
                            _ => Operand::Int(-1),
                        };
                        self.emitter.emit_with(OpCode::Push, all_ones);
                        self.emitter.emit(OpCode::Xor);
                    }
                    UnaryOperator::Plus | UnaryOperator::LogicalNot => {}
                }
            }
            ExprKind::Increment { op, place, used } => {
                self.compile_increment(*op, place, &expr.ty, *used)?
            }
            ExprKind::Call { name, args } => {
                for arg in args {
                    self.compile_expression(arg)?;
                }
                self.emitter.emit_with(
                    OpCode::Invoke,
                    Operand::Call {
                        name: name.clone(),
                        argc: args.len(),
                        returns: expr.ty != Type::Void,
                    },
                );
            }
            ExprKind::New(class) => self
                .emitter
                .emit_with(OpCode::New, Operand::Name(class.clone())),
            ExprKind::Error => panic!("error node reached code generation"),
        }
        Ok(())
    }

    fn compile_long(&mut self, v: i64) {
        match v {
            0 => self.emitter.emit(OpCode::LConst0),
            1 => self.emitter.emit(OpCode::LConst1),
            _ => self.emitter.emit_with(OpCode::Push, Operand::Long(v)),
        }
    }

    fn compile_double(&mut self, v: f64) {
        // -0.0 has no short form.
        if v.to_bits() == 0.0f64.to_bits() {
            self.emitter.emit(OpCode::DConst0);
        } else if v == 1.0 {
            self.emitter.emit(OpCode::DConst1);
        } else {
            self.emitter.emit_with(OpCode::Push, Operand::Double(v));
        }
    }

    fn compile_one(&mut self, ty: &Type) {
        match ty {
            Type::Long => self.emitter.emit(OpCode::LConst1),
            Type::Double => self.emitter.emit(OpCode::DConst1),
            _ => self.emitter.emit_with(OpCode::Push, Operand::Int(1)),
        }
    }

    fn compile_boolean_value(&mut self, expr: &Expr) -> Result<()> {
        let false_label = self.label()?;
        let end = self.label()?;
        self.compile_branch(expr, false_label, false)?;
        self.emitter.emit_with(OpCode::Push, Operand::Int(1));
        self.emitter.emit_branch(OpCode::Goto, end);
        self.emitter.place_label(false_label);
        self.emitter.emit_with(OpCode::Push, Operand::Int(0));
        self.emitter.place_label(end);
        Ok(())
    }

    /// Jumps to `target` when `expr` evaluates to `on_true`, falls through otherwise.
    pub(super) fn compile_branch(&mut self, expr: &Expr, target: Label, on_true: bool) -> Result<()> {
        match &expr.kind {
            ExprKind::Bool(b) => {
                if *b == on_true {
                    self.emitter.emit_branch(OpCode::Goto, target);
                }
            }
            ExprKind::Unary {
                op: UnaryOperator::LogicalNot,
                operand,
            } => self.compile_branch(operand, target, !on_true)?,
            ExprKind::Binary {
                op: BinaryOperator::LogicalAnd,
                left,
                right,
            } => {
                if on_true {
                    let skip = self.label()?;
                    self.compile_branch(left, skip, false)?;
                    self.compile_branch(right, target, true)?;
                    self.emitter.place_label(skip);
                } else {
                    self.compile_branch(left, target, false)?;
                    self.compile_branch(right, target, false)?;
                }
            }
            ExprKind::Binary {
                op: BinaryOperator::LogicalOr,
                left,
                right,
            } => {
                if on_true {
                    self.compile_branch(left, target, true)?;
                    self.compile_branch(right, target, true)?;
                } else {
                    let skip = self.label()?;
                    self.compile_branch(left, skip, true)?;
                    self.compile_branch(right, target, false)?;
                    self.emitter.place_label(skip);
                }
            }
            ExprKind::Binary { op, left, right } if !op.is_arithmetic() => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let opcode = compare_opcode(*op);
                if on_true {
                    self.emitter.emit_branch(opcode, target);
                } else if left.ty == Type::Double {
                    // Negating an ordered compare would send NaN the wrong way.
                    let skip = self.label()?;
                    self.emitter.emit_branch(opcode, skip);
                    self.emitter.emit_branch(OpCode::Goto, target);
                    self.emitter.place_label(skip);
                } else {
                    self.emitter.emit_branch(opcode.negate(), target);
                }
            }
            _ => {
                self.compile_expression(expr)?;
                let opcode = if on_true { OpCode::IfNe } else { OpCode::IfEq };
                self.emitter.emit_branch(opcode, target);
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, place: &Place, value: &Expr, used: bool) -> Result<()> {
        match place {
            Place::Local(slot) => {
                self.compile_expression(value)?;
                if used {
                    self.emitter.emit(OpCode::Dup);
                }
                self.emitter.emit_with(OpCode::Store, Operand::Local(*slot));
            }
            Place::Field { target, name } => {
                self.compile_expression(target)?;
                self.compile_expression(value)?;
                if used {
                    self.emitter.emit(OpCode::DupX1);
                }
                self.emitter
                    .emit_with(OpCode::PutField, Operand::Name(name.clone()));
            }
        }
        Ok(())
    }

    fn compile_increment(
        &mut self,
        op: UpdateOperator,
        place: &Place,
        ty: &Type,
        used: bool,
    ) -> Result<()> {
        let delta = op.delta();
        let postfix = op.is_postfix();
        match place {
            Place::Local(slot) => {
                let load = Operand::Local(*slot);
                if used && postfix {
                    self.emitter.emit_with(OpCode::Load, load.clone());
                }
                self.emitter.emit_with(
                    OpCode::Inc,
                    Operand::Increment {
                        local: *slot,
                        delta,
                    },
                );
                if used && !postfix {
                    self.emitter.emit_with(OpCode::Load, load);
                }
            }
            Place::Field { target, name } => {
                self.compile_expression(target)?;
                self.emitter.emit(OpCode::Dup);
                self.emitter
                    .emit_with(OpCode::GetField, Operand::Name(name.clone()));
                if used && postfix {
                    self.emitter.emit(OpCode::DupX1);
                }
                self.compile_one(ty);
                self.emitter
                    .emit(if delta > 0 { OpCode::Add } else { OpCode::Sub });
                if used && !postfix {
                    self.emitter.emit(OpCode::DupX1);
                }
                self.emitter
                    .emit_with(OpCode::PutField, Operand::Name(name.clone()));
            }
        }
        Ok(())
    }
}

fn compare_opcode(op: BinaryOperator) -> OpCode {
    match op {
        BinaryOperator::Equal => OpCode::IfCmpEq,
        BinaryOperator::NotEqual => OpCode::IfCmpNe,
        BinaryOperator::LessThan => OpCode::IfCmpLt,
        BinaryOperator::LessThanEqual => OpCode::IfCmpLe,
        BinaryOperator::GreaterThan => OpCode::IfCmpGt,
        BinaryOperator::GreaterThanEqual => OpCode::IfCmpGe,
        other => panic!("{} is not a comparison", other.symbol()),
    }
}
