// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation.
//!
//! ## Statement Compilation Overview
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | local init | `Store` | |
//! | `if/else` | conditional branch, `Goto` | |
//! | `while`/`do`/`for` | see `loops` | one back-edge per iteration |
//! | `switch` | `TableSwitch` or `LookupSwitch` | see `switch` |
//! | `try` | exception table entries | see `exceptions` |
//! | `break/continue` | `Goto` | label owned by the target construct |
//! | `throw` | `Throw` | |
//!
//! ### If Statement
//!
//! ```text
//!   [branch to else_label if condition is false]
//!   [then bytecode]
//!   Goto end_label
//! else_label:
//!   [else bytecode]
//! end_label:
//! ```

use super::Compiler;
use crate::Result;
use crate::analysis::hir::{Expr, Stmt};
use crate::compiler::bytecode::{OpCode, Operand};
use crate::compiler::emitter::Emitter;

impl<E: Emitter> Compiler<E> {
    pub(super) fn compile_statements(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    pub(super) fn compile_statement(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(body) => self.compile_statements(body),
            Stmt::LocalInit { slot, value } => {
                self.compile_expression(value)?;
                self.emitter.emit_with(OpCode::Store, Operand::Local(*slot));
                Ok(())
            }
            Stmt::Expression { expr, discard } => {
                self.compile_expression(expr)?;
                if *discard {
                    self.emitter.emit(OpCode::Pop);
                }
                Ok(())
            }
            Stmt::If {
                condition,
                consequent,
                alternate,
            } => self.compile_if(condition, consequent, alternate.as_deref()),
            Stmt::While {
                jumps,
                condition,
                body,
            } => self.compile_while(jumps, condition, body),
            Stmt::Do {
                jumps,
                body,
                condition,
            } => self.compile_do(jumps, body, condition),
            Stmt::For {
                jumps,
                init,
                condition,
                update,
                body,
            } => self.compile_for(jumps, init, condition.as_ref(), update, body),
            Stmt::Switch(switch) => self.compile_switch(switch),
            Stmt::Try(try_stmt) => self.compile_try(try_stmt),
            Stmt::Break { target } => self.compile_break(*target),
            Stmt::Continue { target } => self.compile_continue(*target),
            Stmt::Throw(argument) => {
                self.compile_expression(argument)?;
                self.emitter.emit(OpCode::Throw);
                Ok(())
            }
            Stmt::Empty => Ok(()),
        }
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        consequent: &Stmt,
        alternate: Option<&Stmt>,
    ) -> Result<()> {
        let else_label = self.label()?;
        self.compile_branch(condition, else_label, false)?;
        self.compile_statement(consequent)?;

        match alternate {
            Some(alternate) => {
                let end_label = self.label()?;
                self.emitter.emit_branch(OpCode::Goto, end_label);
                self.emitter.place_label(else_label);
                self.compile_statement(alternate)?;
                self.emitter.place_label(end_label);
            }
            None => self.emitter.place_label(else_label),
        }
        Ok(())
    }
}
