// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression typing.

use super::Analyzer;
use super::hir::{Expr, ExprKind, Place, Stmt};
use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, Literal, UnaryOperator, UpdateOperator,
};
use crate::types::Type;

impl Analyzer<'_> {
    /// Analyzes an expression whose value is consumed.
    pub(super) fn expression(&mut self, expr: &Expression) -> Expr {
        self.expression_in(expr, true)
    }

    /// Analyzes an expression in statement position.
    ///
    /// Assignments and increments are told their value is unused so they leave
    /// nothing on the stack; anything else with a value gets popped.
    pub(super) fn expression_statement(&mut self, expr: &Expression) -> Stmt {
        let analyzed = self.expression_in(expr, false);
        let discard = match analyzed.kind {
            ExprKind::Assign { .. } | ExprKind::Increment { .. } | ExprKind::Error => false,
            _ => analyzed.ty != Type::Void,
        };
        Stmt::Expression {
            expr: analyzed,
            discard,
        }
    }

    /// Analyzes a loop or if condition, which must be boolean.
    pub(super) fn condition(&mut self, expr: &Expression, line: u32) -> Expr {
        let analyzed = self.expression(expr);
        analyzed
            .ty
            .must_match_expected(line, &Type::Boolean, &mut self.diagnostics);
        analyzed
    }

    /// Converts `expr` to `target`, widening int/long where allowed.
    pub(super) fn coerce(&mut self, expr: Expr, target: &Type, line: u32) -> Expr {
        if expr.ty.matches(target) {
            return expr;
        }
        if widens(&expr.ty, target) {
            return widen(expr, target);
        }
        expr.ty
            .must_match_expected(line, target, &mut self.diagnostics);
        expr
    }

    fn expression_in(&mut self, expr: &Expression, used: bool) -> Expr {
        let line = expr.line;
        match &expr.kind {
            ExpressionKind::Literal(lit) => literal(lit),
            ExpressionKind::Variable(name) => match self.scope.resolve(name) {
                Some(local) => Expr::new(local.ty.clone(), ExprKind::Local(local.slot)),
                None => {
                    self.diagnostics
                        .report(line, format!("cannot find symbol {}", name));
                    Expr::error()
                }
            },
            ExpressionKind::Field(field) => {
                let target = self.object(&field.target);
                Expr::new(
                    field.ty.clone(),
                    ExprKind::Field {
                        target: Box::new(target),
                        name: field.name.clone(),
                    },
                )
            }
            ExpressionKind::Assignment(assign) => {
                let Some((place, ty)) = self.place(&assign.target, "assignment") else {
                    self.expression(&assign.value);
                    return Expr::error();
                };
                let value = self.expression(&assign.value);
                let value = self.coerce(value, &ty, line);
                Expr::new(
                    ty,
                    ExprKind::Assign {
                        place,
                        value: Box::new(value),
                        used,
                    },
                )
            }
            ExpressionKind::Binary(bin) => {
                let left = self.expression(&bin.left);
                let right = self.expression(&bin.right);
                self.binary(line, bin.operator, left, right)
            }
            ExpressionKind::Unary(un) => {
                let operand = self.expression(&un.argument);
                self.unary(line, un.operator, operand)
            }
            ExpressionKind::Update(upd) => self.increment(line, upd.operator, &upd.argument, used),
            ExpressionKind::Call(call) => {
                let args = call.arguments.iter().map(|a| self.expression(a)).collect();
                Expr::new(
                    call.returns.clone(),
                    ExprKind::Call {
                        name: call.callee.clone(),
                        args,
                    },
                )
            }
            ExpressionKind::New(new) => Expr::new(
                Type::Reference(new.class.clone()),
                ExprKind::New(new.class.clone()),
            ),
        }
    }

    /// An expression that must evaluate to an object.
    fn object(&mut self, expr: &Expression) -> Expr {
        let analyzed = self.expression(expr);
        if !analyzed.ty.is_reference() && analyzed.ty != Type::Any {
            self.diagnostics.report(
                expr.line,
                format!("{} cannot be dereferenced", analyzed.ty),
            );
        }
        analyzed
    }

    /// Resolves an assignable location.
    ///
    /// Returns `None` after reporting a diagnostic.
    fn place(&mut self, expr: &Expression, what: &str) -> Option<(Place, Type)> {
        match &expr.kind {
            ExpressionKind::Variable(name) => match self.scope.resolve(name) {
                Some(local) => Some((Place::Local(local.slot), local.ty.clone())),
                None => {
                    self.diagnostics
                        .report(expr.line, format!("cannot find symbol {}", name));
                    None
                }
            },
            ExpressionKind::Field(field) => {
                let target = self.object(&field.target);
                Some((
                    Place::Field {
                        target: Box::new(target),
                        name: field.name.clone(),
                    },
                    field.ty.clone(),
                ))
            }
            _ => {
                self.diagnostics.report(
                    expr.line,
                    format!("operand of {} must be a variable", what),
                );
                None
            }
        }
    }

    fn increment(
        &mut self,
        line: u32,
        op: UpdateOperator,
        argument: &Expression,
        used: bool,
    ) -> Expr {
        if !argument.is_lvalue() {
            self.diagnostics.report(
                line,
                format!("operand of {} must be a variable", op.symbol()),
            );
            return Expr::error();
        }
        let Some((place, ty)) = self.place(argument, op.symbol()) else {
            return Expr::error();
        };
        if !ty.is_incrementable() {
            ty.must_match_one_of(
                line,
                &[Type::Int, Type::Long, Type::Double],
                &mut self.diagnostics,
            );
            return Expr::error();
        }
        Expr::new(ty, ExprKind::Increment { op, place, used })
    }

    fn binary(&mut self, line: u32, op: BinaryOperator, left: Expr, right: Expr) -> Expr {
        use BinaryOperator::*;

        let numeric = [Type::Int, Type::Long, Type::Double];
        match op {
            LogicalAnd | LogicalOr => {
                let ok = left
                    .ty
                    .must_match_expected(line, &Type::Boolean, &mut self.diagnostics)
                    & right
                        .ty
                        .must_match_expected(line, &Type::Boolean, &mut self.diagnostics);
                let ty = if ok { Type::Boolean } else { Type::Any };
                binary_expr(ty, op, left, right)
            }
            Equal | NotEqual
                if !(left.ty.is_numeric() && right.ty.is_numeric()) =>
            {
                let comparable = left.ty.matches(&right.ty)
                    && !matches!(left.ty, Type::Void)
                    && !matches!(right.ty, Type::Void);
                if !comparable {
                    self.diagnostics.report(
                        line,
                        format!("incomparable types: {} and {}", left.ty, right.ty),
                    );
                    return binary_expr(Type::Any, op, left, right);
                }
                binary_expr(Type::Boolean, op, left, right)
            }
            _ => {
                let ok = left
                    .ty
                    .must_match_one_of(line, &numeric, &mut self.diagnostics)
                    & right
                        .ty
                        .must_match_one_of(line, &numeric, &mut self.diagnostics);
                if !ok || left.ty == Type::Any || right.ty == Type::Any {
                    return binary_expr(Type::Any, op, left, right);
                }
                let operand = wider(&left.ty, &right.ty);
                let left = widen(left, &operand);
                let right = widen(right, &operand);
                let ty = if op.is_arithmetic() {
                    operand
                } else {
                    Type::Boolean
                };
                binary_expr(ty, op, left, right)
            }
        }
    }

    fn unary(&mut self, line: u32, op: UnaryOperator, operand: Expr) -> Expr {
        let allowed: &[Type] = match op {
            UnaryOperator::Minus | UnaryOperator::Plus => &[Type::Int, Type::Long, Type::Double],
            UnaryOperator::BitwiseNot => &[Type::Int, Type::Long],
            UnaryOperator::LogicalNot => &[Type::Boolean],
        };
        let ty = if operand
            .ty
            .must_match_one_of(line, allowed, &mut self.diagnostics)
        {
            operand.ty.clone()
        } else {
            Type::Any
        };
        Expr::new(
            ty,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }
}

fn literal(lit: &Literal) -> Expr {
    match lit {
        Literal::Int(v) => Expr::new(Type::Int, ExprKind::Int(*v)),
        Literal::Long(v) => Expr::new(Type::Long, ExprKind::Long(*v)),
        Literal::Double(v) => Expr::new(Type::Double, ExprKind::Double(*v)),
        Literal::Boolean(v) => Expr::new(Type::Boolean, ExprKind::Bool(*v)),
        Literal::Null => Expr::new(Type::Null, ExprKind::Null),
    }
}

fn binary_expr(ty: Type, op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::new(
        ty,
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

fn rank(ty: &Type) -> u8 {
    match ty {
        Type::Int => 0,
        Type::Long => 1,
        _ => 2,
    }
}

/// The common type of two numeric operands.
fn wider(a: &Type, b: &Type) -> Type {
    if rank(a) >= rank(b) { a.clone() } else { b.clone() }
}

/// Whether `from` converts implicitly to `to`.
fn widens(from: &Type, to: &Type) -> bool {
    matches!(
        (from, to),
        (Type::Int, Type::Long) | (Type::Int, Type::Double) | (Type::Long, Type::Double)
    )
}

fn widen(expr: Expr, to: &Type) -> Expr {
    if !widens(&expr.ty, to) {
        return expr;
    }
    Expr::new(to.clone(), ExprKind::Widen(Box::new(expr)))
}
