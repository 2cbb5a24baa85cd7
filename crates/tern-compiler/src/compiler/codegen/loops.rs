// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loop compilation.
//!
//! Every loop has exactly one unconditional back-edge per iteration. Break and
//! continue labels are created before the body is generated and placed only
//! when some jump uses them.
//!
//! ### While Loop
//!
//! ```text
//! condition:
//!   [branch to out if condition is false]
//!   [body]
//! continue:          (if used)
//!   Goto condition
//! break:             (if used)
//! out:
//! ```
//!
//! ### Do-While Loop
//!
//! ```text
//! start:
//!   [body]
//! continue:          (if used)
//!   [branch to start if condition is true]
//! break:             (if used)
//! ```
//!
//! ### For Loop
//!
//! ```text
//!   [init]
//! condition:
//!   [branch to end if condition is false]
//!   [body]
//! continue:          (if used)
//!   [update]
//!   Goto condition
//! break:             (if used)
//! end:
//! ```
//!
//! `continue` in a `for` lands on the update step, so the update always runs
//! before the condition is tested again.

use super::Compiler;
use crate::Result;
use crate::analysis::hir::{Expr, Jumps, Stmt};
use crate::compiler::bytecode::OpCode;
use crate::compiler::emitter::Emitter;

impl<E: Emitter> Compiler<E> {
    pub(super) fn compile_while(&mut self, jumps: &Jumps, condition: &Expr, body: &Stmt) -> Result<()> {
        let condition_label = self.label()?;
        let out = self.label()?;
        let break_label = self.label()?;
        let continue_label = self.label()?;
        self.enter(jumps.id, break_label, Some(continue_label));

        self.emitter.place_label(condition_label);
        self.compile_branch(condition, out, false)?;
        self.compile_statement(body)?;
        self.place_if(jumps.has_continue, continue_label);
        self.emitter.emit_branch(OpCode::Goto, condition_label);
        self.place_if(jumps.has_break, break_label);
        self.emitter.place_label(out);

        self.leave(jumps.id);
        Ok(())
    }

    pub(super) fn compile_do(&mut self, jumps: &Jumps, body: &Stmt, condition: &Expr) -> Result<()> {
        let start = self.label()?;
        let break_label = self.label()?;
        let continue_label = self.label()?;
        self.enter(jumps.id, break_label, Some(continue_label));

        self.emitter.place_label(start);
        self.compile_statement(body)?;
        self.place_if(jumps.has_continue, continue_label);
        self.compile_branch(condition, start, true)?;
        self.place_if(jumps.has_break, break_label);

        self.leave(jumps.id);
        Ok(())
    }

    pub(super) fn compile_for(
        &mut self,
        jumps: &Jumps,
        init: &[Stmt],
        condition: Option<&Expr>,
        update: &[Stmt],
        body: &Stmt,
    ) -> Result<()> {
        self.compile_statements(init)?;

        let condition_label = self.label()?;
        let end = self.label()?;
        let break_label = self.label()?;
        let continue_label = self.label()?;
        self.enter(jumps.id, break_label, Some(continue_label));

        self.emitter.place_label(condition_label);
        if let Some(condition) = condition {
            self.compile_branch(condition, end, false)?;
        }
        self.compile_statement(body)?;
        self.place_if(jumps.has_continue, continue_label);
        self.compile_statements(update)?;
        self.emitter.emit_branch(OpCode::Goto, condition_label);
        self.place_if(jumps.has_break, break_label);
        self.emitter.place_label(end);

        self.leave(jumps.id);
        Ok(())
    }
}
