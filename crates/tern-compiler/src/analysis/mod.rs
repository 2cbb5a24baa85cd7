// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Semantic analysis.
//!
//! Walks the input tree once, type-checking what the code generator depends
//! on and producing the annotated tree in [`hir`].
//!
//! # Module Structure
//!
//! - `scope`: lexical scopes and slot allocation
//! - `enclosing`: the stack of loops and switches that `break`/`continue` resolve against
//! - `switch`: dispatch descriptors and the cost model
//! - `expressions`: expression typing
//!
//! Type errors are batched: each one is reported against its source line and
//! analysis continues with the sentinel type [`Type::Any`]. Running out of
//! local slots aborts immediately.

pub mod enclosing;
pub mod hir;
pub mod scope;
pub mod switch;

mod expressions;

use rustc_hash::FxHashSet;

use crate::ast::{self, Statement};
use crate::config::{CompilerConfig, ContinueInSwitch};
use crate::diagnostics::Diagnostics;
use crate::types::Type;
use crate::{Error, Result};

use enclosing::{ConstructKind, EnclosingStack};
use hir::{Jumps, Stmt};
use scope::{Scope, ScopeError};
use switch::SwitchDispatch;

/// Analyzer for one method body.
pub struct Analyzer<'a> {
    config: &'a CompilerConfig,
    scope: Scope,
    enclosing: EnclosingStack,
    diagnostics: Diagnostics,
}

impl<'a> Analyzer<'a> {
    /// Creates an analyzer.
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self {
            config,
            scope: Scope::new(config.max_locals),
            enclosing: EnclosingStack::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Analyzes a method body.
    ///
    /// Returns [`Error::Semantic`] with every diagnostic if any was reported.
    pub fn analyze(mut self, program: &ast::Program) -> Result<hir::Program> {
        tracing::debug!(statements = program.body.len(), "analysis started");
        let body = self.statements(&program.body)?;
        assert!(
            self.enclosing.is_empty(),
            "enclosing stack not empty after analysis"
        );

        if !self.diagnostics.is_empty() {
            tracing::debug!(errors = self.diagnostics.len(), "analysis failed");
            return Err(Error::Semantic(self.diagnostics));
        }

        let max_locals = self.scope.max_slots();
        tracing::debug!(max_locals, "analysis finished");
        Ok(hir::Program { body, max_locals })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statements(&mut self, stmts: &[Statement]) -> Result<Vec<Stmt>> {
        stmts.iter().map(|s| self.statement(s)).collect()
    }

    /// Analyzes statements inside a fresh child scope.
    fn scoped(&mut self, stmts: &[Statement]) -> Result<Vec<Stmt>> {
        self.scope.begin_scope();
        let result = self.statements(stmts);
        self.scope.end_scope();
        result
    }

    fn statement(&mut self, stmt: &Statement) -> Result<Stmt> {
        match stmt {
            Statement::Block(block) => Ok(Stmt::Block(self.scoped(&block.body)?)),
            Statement::LocalDecl(decl) => self.local_declaration(decl),
            Statement::Expression(s) => Ok(self.expression_statement(&s.expression)),
            Statement::If(s) => {
                let condition = self.condition(&s.condition, s.line);
                let consequent = Box::new(self.statement(&s.consequent)?);
                let alternate = match &s.alternate {
                    Some(alt) => Some(Box::new(self.statement(alt)?)),
                    None => None,
                };
                Ok(Stmt::If {
                    condition,
                    consequent,
                    alternate,
                })
            }
            Statement::While(s) => {
                let condition = self.condition(&s.condition, s.line);
                let (jumps, body) = self.loop_body(ConstructKind::While, |a| a.statement(&s.body))?;
                Ok(Stmt::While {
                    jumps,
                    condition,
                    body: Box::new(body),
                })
            }
            Statement::Do(s) => {
                let (jumps, body) = self.loop_body(ConstructKind::Do, |a| a.statement(&s.body))?;
                let condition = self.condition(&s.condition, s.line);
                Ok(Stmt::Do {
                    jumps,
                    body: Box::new(body),
                    condition,
                })
            }
            Statement::For(s) => {
                // Locals declared in the init clause belong to the loop.
                self.scope.begin_scope();
                let result = self.for_statement(s);
                self.scope.end_scope();
                result
            }
            Statement::Switch(s) => self.switch_statement(s),
            Statement::Break(s) => Ok(self.break_statement(s.line)),
            Statement::Continue(s) => Ok(self.continue_statement(s.line)),
            Statement::Try(s) => self.try_statement(s),
            Statement::Throw(s) => {
                let argument = self.expression(&s.argument);
                if !argument.ty.is_reference() && argument.ty != Type::Any {
                    self.diagnostics.report(
                        s.line,
                        format!("cannot throw a value of type {}", argument.ty),
                    );
                }
                Ok(Stmt::Throw(argument))
            }
            Statement::Empty => Ok(Stmt::Empty),
        }
    }

    fn local_declaration(&mut self, decl: &ast::LocalDeclaration) -> Result<Stmt> {
        if decl.ty == Type::Void {
            self.diagnostics
                .report(decl.line, format!("variable {} cannot be void", decl.name));
        }
        let init = decl.init.as_ref().map(|e| {
            let value = self.expression(e);
            self.coerce(value, &decl.ty, e.line)
        });
        let slot = self.declare(decl.line, &decl.name, decl.ty.clone())?;
        Ok(match init {
            Some(value) => Stmt::LocalInit { slot, value },
            None => Stmt::Empty,
        })
    }

    /// Declares a local, reporting duplicates and failing on slot exhaustion.
    fn declare(&mut self, line: u32, name: &str, ty: Type) -> Result<u16> {
        match self.scope.declare(name, ty) {
            Ok(slot) => Ok(slot),
            Err(ScopeError::Duplicate(name)) => {
                self.diagnostics.report(
                    line,
                    format!("variable {} is already defined in this scope", name),
                );
                self.reserve()
            }
            Err(ScopeError::Exhausted) => Err(self.exhausted()),
        }
    }

    /// Reserves an anonymous slot in the current scope.
    fn reserve(&mut self) -> Result<u16> {
        self.scope.next_offset().map_err(|_| self.exhausted())
    }

    fn exhausted(&self) -> Error {
        Error::Resource(format!(
            "method needs more than {} local slots",
            self.config.max_locals
        ))
    }

    /// Analyzes a loop body with the loop on the enclosing stack.
    fn loop_body<T>(
        &mut self,
        kind: ConstructKind,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(Jumps, T)> {
        use enclosing::{Breakable, Continuable};

        let id = self.enclosing.push_loop(kind);
        let body = body(self);
        let frame = self.enclosing.pop_loop(id);
        let jumps = Jumps {
            id,
            has_break: frame.has_break(),
            has_continue: frame.has_continue(),
        };
        Ok((jumps, body?))
    }

    fn for_statement(&mut self, s: &ast::ForStatement) -> Result<Stmt> {
        let init = self.statements(&s.init)?;
        let condition = s.condition.as_ref().map(|c| self.condition(c, s.line));
        let update = self.statements(&s.update)?;
        let (jumps, body) = self.loop_body(ConstructKind::For, |a| a.statement(&s.body))?;
        Ok(Stmt::For {
            jumps,
            init,
            condition,
            update,
            body: Box::new(body),
        })
    }

    fn switch_statement(&mut self, s: &ast::SwitchStatement) -> Result<Stmt> {
        use enclosing::Breakable;

        let selector = self.expression(&s.selector);
        selector
            .ty
            .must_match_expected(s.line, &Type::Int, &mut self.diagnostics);

        let mut cases = Vec::new();
        let mut seen = FxHashSet::default();
        let mut default_group = None;

        for (index, group) in s.groups.iter().enumerate() {
            for label in &group.labels {
                match label {
                    ast::SwitchLabel::Case(expr) => {
                        let Some(value) = self.case_value(expr) else {
                            continue;
                        };
                        if !seen.insert(value) {
                            self.diagnostics
                                .report(expr.line, format!("duplicate case label {}", value));
                            continue;
                        }
                        cases.push((value, index));
                    }
                    ast::SwitchLabel::Default => {
                        if default_group.is_some() {
                            self.diagnostics.report(s.line, "duplicate default label");
                            continue;
                        }
                        default_group = Some(index);
                    }
                }
            }
        }

        let id = self.enclosing.push_switch();
        let groups = s
            .groups
            .iter()
            .map(|g| self.scoped(&g.body))
            .collect::<Result<Vec<_>>>();
        let frame = self.enclosing.pop_switch(id);
        let groups = groups?;

        Ok(Stmt::Switch(hir::Switch {
            id,
            has_break: frame.has_break(),
            selector,
            groups,
            dispatch: SwitchDispatch::new(cases, default_group),
        }))
    }

    /// Checks a case label, returning its value when it is an int constant.
    fn case_value(&mut self, expr: &ast::Expression) -> Option<i32> {
        let analyzed = self.expression(expr);
        if !analyzed
            .ty
            .must_match_expected(expr.line, &Type::Int, &mut self.diagnostics)
        {
            return None;
        }
        match constant_int(&analyzed) {
            Some(value) => Some(value),
            None => {
                if analyzed.ty != Type::Any {
                    self.diagnostics
                        .report(expr.line, "case label must be a constant expression");
                }
                None
            }
        }
    }

    fn break_statement(&mut self, line: u32) -> Stmt {
        if self.enclosing.is_empty() {
            self.diagnostics.report(line, "break outside switch or loop");
            return Stmt::Empty;
        }
        Stmt::Break {
            target: self.enclosing.resolve_break(),
        }
    }

    fn continue_statement(&mut self, line: u32) -> Stmt {
        if self.enclosing.is_empty() {
            self.diagnostics.report(line, "continue outside of loop");
            return Stmt::Empty;
        }
        match self.enclosing.resolve_continue() {
            Ok(target) => Stmt::Continue { target },
            Err(err) => {
                match self.config.continue_in_switch {
                    ContinueInSwitch::Reject => self
                        .diagnostics
                        .report(line, "continue cannot target a switch statement"),
                    ContinueInSwitch::Ignore => {
                        tracing::debug!(switch = %err.switch, line, "continue inside switch ignored")
                    }
                }
                Stmt::Empty
            }
        }
    }

    fn try_statement(&mut self, s: &ast::TryStatement) -> Result<Stmt> {
        if s.catches.is_empty() && s.finalizer.is_none() {
            self.diagnostics
                .report(s.line, "try without catch or finally");
        }

        let (block, catches) = self.try_and_catches(s)?;

        let finally = match &s.finalizer {
            Some(fin) => {
                self.scope.begin_scope();
                let finally = self.finally_block(fin);
                self.scope.end_scope();
                Some(finally?)
            }
            None => None,
        };

        Ok(Stmt::Try(hir::Try {
            block,
            catches,
            finally,
        }))
    }

    fn try_and_catches(&mut self, s: &ast::TryStatement) -> Result<(Vec<Stmt>, Vec<hir::Catch>)> {
        let block = self.scoped(&s.block.body)?;
        let mut catches = Vec::with_capacity(s.catches.len());
        for clause in &s.catches {
            self.scope.begin_scope();
            let catch = self.catch_clause(clause);
            self.scope.end_scope();
            catches.push(catch?);
        }
        Ok((block, catches))
    }

    fn finally_block(&mut self, fin: &ast::BlockStatement) -> Result<hir::Finally> {
        let slot = self.reserve()?;
        let body = self.statements(&fin.body)?;
        Ok(hir::Finally { slot, body })
    }

    fn catch_clause(&mut self, clause: &ast::CatchClause) -> Result<hir::Catch> {
        let ty = Type::Reference(clause.exception_type.clone());
        let slot = self.declare(clause.line, &clause.param, ty)?;
        let body = self.statements(&clause.body.body)?;
        Ok(hir::Catch {
            exception_type: clause.exception_type.clone(),
            slot,
            body,
        })
    }
}

/// Value of an int constant: a literal, optionally negated.
fn constant_int(expr: &hir::Expr) -> Option<i32> {
    use crate::ast::UnaryOperator;

    match &expr.kind {
        hir::ExprKind::Int(v) => Some(*v),
        hir::ExprKind::Unary { op: UnaryOperator::Minus, operand } => {
            constant_int(operand).map(i32::wrapping_neg)
        }
        hir::ExprKind::Unary { op: UnaryOperator::Plus, operand } => constant_int(operand),
        _ => None,
    }
}
