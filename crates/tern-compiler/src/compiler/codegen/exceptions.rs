// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Try/catch/finally compilation.
//!
//! The target has no finally primitive, so the finally body is copied onto
//! every exit path: once after the try block, once after each catch body, and
//! once in a catch-all handler that saves the in-flight exception, runs the
//! body and rethrows.
//!
//! ```text
//! start_try:
//!   [try block]
//! try_end:
//!   [finally]
//!   Goto end_finally
//! catch_0:
//!   Store $e
//!   [catch body]
//! catch_end_0:
//!   [finally]
//!   Goto end_finally
//! ...
//! start_finally:
//!   Store $in_flight
//! after_store:
//!   [finally]
//!   Load $in_flight
//!   Throw
//! end_finally:
//! ```
//!
//! Exception table, in registration order:
//!
//! | range | handler | type |
//! |-------|---------|------|
//! | `[start_try, try_end)` | `catch_i` | declared type of catch `i` |
//! | `[start_try, try_end)` | `start_finally` | any |
//! | `[catch_i, catch_end_i)` | `start_finally` | any |
//! | `[start_finally, after_store)` | `start_finally` | any |
//!
//! Typed rows come first so a matching catch wins over the finally handler.
//! The last row covers only the store, so an exception thrown by the finally
//! body itself propagates outward instead of re-entering it.
//!
//! ## Jumps out of a try
//!
//! A `break` or `continue` whose target lies outside one or more try
//! statements runs each crossed finally body inline, innermost first, and only
//! then jumps:
//!
//! ```text
//! while (c) {                  loop:
//!   try {                        [c false -> end]
//!     if (x) break;              [x false -> next]
//!     work();                    gap_start:
//!   } finally {                    cleanup()
//!     cleanup();                 gap_end:
//!   }                              Goto end
//! }                              next:
//!                                  work()
//!                                ...
//! ```
//!
//! The inlined copy is not protected by the try it leaves: every range row
//! of that try (and of any try nested inside it) is split around the copy, so
//! an exception thrown by `cleanup()` there goes to the outer handlers and the
//! finally body never runs twice.

use std::rc::Rc;

use super::{Compiler, TryRegion};
use crate::Result;
use crate::analysis::hir::{Finally, Stmt, Try};
use crate::compiler::bytecode::{Label, OpCode, Operand};
use crate::compiler::emitter::Emitter;

struct CatchLabels {
    handler: Label,
    end: Label,
}

type Gaps = Vec<(Label, Label)>;

impl<E: Emitter> Compiler<E> {
    pub(super) fn compile_try(&mut self, try_stmt: &Try) -> Result<()> {
        let start_try = self.label()?;
        let try_end = self.label()?;
        let end_finally = self.label()?;
        let mut catch_labels = Vec::with_capacity(try_stmt.catches.len());
        for _ in &try_stmt.catches {
            catch_labels.push(CatchLabels {
                handler: self.label()?,
                end: self.label()?,
            });
        }
        let finally_body: Option<Rc<[Stmt]>> =
            try_stmt.finally.as_ref().map(|f| Rc::from(f.body.as_slice()));

        // Normal completion of the try block.
        self.emitter.place_label(start_try);
        let try_gaps = self.guarded(finally_body.clone(), |c| {
            c.compile_statements(&try_stmt.block)
        })?;
        self.emitter.place_label(try_end);
        self.compile_finally_copy(try_stmt.finally.as_ref())?;
        self.emitter.emit_branch(OpCode::Goto, end_finally);

        let mut catch_gaps = Vec::with_capacity(try_stmt.catches.len());
        for (catch, labels) in try_stmt.catches.iter().zip(&catch_labels) {
            self.emitter.place_label(labels.handler);
            self.emitter
                .emit_with(OpCode::Store, Operand::Local(catch.slot));
            // Catch bodies are only protected when a finally follows.
            let gaps = match &finally_body {
                Some(body) => self.guarded(Some(Rc::clone(body)), |c| {
                    c.compile_statements(&catch.body)
                })?,
                None => {
                    self.compile_statements(&catch.body)?;
                    Gaps::new()
                }
            };
            catch_gaps.push(gaps);
            self.emitter.place_label(labels.end);
            self.compile_finally_copy(try_stmt.finally.as_ref())?;
            self.emitter.emit_branch(OpCode::Goto, end_finally);
        }

        for (catch, labels) in try_stmt.catches.iter().zip(&catch_labels) {
            self.add_split_handler(
                (start_try, try_end),
                &try_gaps,
                labels.handler,
                Some(&catch.exception_type),
            );
        }

        if let Some(finally) = &try_stmt.finally {
            let start_finally = self.label()?;
            let after_store = self.label()?;

            self.emitter.place_label(start_finally);
            self.emitter
                .emit_with(OpCode::Store, Operand::Local(finally.slot));
            self.emitter.place_label(after_store);
            self.compile_statements(&finally.body)?;
            self.emitter
                .emit_with(OpCode::Load, Operand::Local(finally.slot));
            self.emitter.emit(OpCode::Throw);

            self.add_split_handler((start_try, try_end), &try_gaps, start_finally, None);
            for (labels, gaps) in catch_labels.iter().zip(&catch_gaps) {
                self.add_split_handler((labels.handler, labels.end), gaps, start_finally, None);
            }
            self.emitter
                .add_exception_handler(start_finally, after_store, start_finally, None);
        }

        self.emitter.place_label(end_finally);
        tracing::debug!(
            catches = try_stmt.catches.len(),
            finally = try_stmt.finally.is_some(),
            gaps = try_gaps.len() + catch_gaps.iter().map(Vec::len).sum::<usize>(),
            "try compiled"
        );
        Ok(())
    }

    fn compile_finally_copy(&mut self, finally: Option<&Finally>) -> Result<()> {
        match finally {
            Some(finally) => self.compile_statements(&finally.body),
            None => Ok(()),
        }
    }

    /// Compiles `body` as a region covered by the current try's handlers and
    /// returns the finally copies inlined inside it.
    fn guarded(
        &mut self,
        finally: Option<Rc<[Stmt]>>,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Gaps> {
        self.tries.push(TryRegion {
            finally,
            gaps: Gaps::new(),
        });
        let compiled = body(self);
        let region = self
            .tries
            .pop()
            .unwrap_or_else(|| panic!("try region stack emptied inside its own body"));
        compiled?;
        Ok(region.gaps)
    }

    /// Registers `handler` over `range` minus `gaps`, which lie inside it in order.
    fn add_split_handler(
        &mut self,
        range: (Label, Label),
        gaps: &[(Label, Label)],
        handler: Label,
        catch_type: Option<&str>,
    ) {
        let (mut from, end) = range;
        for &(gap_start, gap_end) in gaps {
            self.emitter
                .add_exception_handler(from, gap_start, handler, catch_type);
            from = gap_end;
        }
        self.emitter
            .add_exception_handler(from, end, handler, catch_type);
    }

    /// Runs the finally bodies of every try region above `depth`, innermost
    /// first, ahead of a jump to a construct entered at that depth.
    ///
    /// Each copy is compiled with only the regions outside its own try open,
    /// so jumps and nested tries inside the copy resolve against those. The
    /// copy is then recorded as a gap in its try's region and every region
    /// nested within it.
    pub(super) fn compile_crossed_finally(&mut self, depth: usize) -> Result<()> {
        for k in (depth..self.tries.len()).rev() {
            let Some(body) = self.tries[k].finally.clone() else {
                continue;
            };
            let gap_start = self.label()?;
            let gap_end = self.label()?;

            let inner = self.tries.split_off(k);
            self.emitter.place_label(gap_start);
            self.compile_statements(&body)?;
            self.emitter.place_label(gap_end);
            debug_assert_eq!(self.tries.len(), k, "try regions leaked from a finally copy");
            self.tries.extend(inner);

            for region in &mut self.tries[k..] {
                region.gaps.push((gap_start, gap_end));
            }
            tracing::trace!(region = k, depth, "finally inlined before jump");
        }
        Ok(())
    }
}
