// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from the annotated tree.
//!
//! The `Compiler` walks each statement once, in source order, and drives an
//! [`Emitter`]. Loops and switches create their break/continue labels before
//! generating their bodies and register them under their construct id; a
//! `break`/`continue` looks the label up by the id analysis resolved it to.
//!
//! A jump that leaves one or more try statements first runs the finally
//! bodies it crosses, innermost first. The `exceptions` module shows how
//! those copies are kept out of the handler ranges they are emitted inside.

mod exceptions;
mod expressions;
mod loops;
mod statements;
mod switch;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::Result;
use crate::analysis::enclosing::ConstructId;
use crate::analysis::hir;
use crate::compiler::bytecode::{Label, OpCode};
use crate::compiler::emitter::Emitter;

/// Labels a construct's jumps lead to.
#[derive(Debug, Clone, Copy)]
struct JumpTargets {
    break_label: Label,
    continue_label: Option<Label>,
    /// Open try regions outside the construct
    try_depth: usize,
}

/// A try block or catch body whose handlers cover the code being emitted.
#[derive(Debug)]
struct TryRegion {
    /// Body a jump out of the region must run first
    finally: Option<Rc<[hir::Stmt]>>,
    /// Inlined finally copies inside the region, in emission order
    gaps: Vec<(Label, Label)>,
}

/// Compiles annotated trees into an [`Emitter`].
pub struct Compiler<E: Emitter> {
    emitter: E,
    targets: FxHashMap<ConstructId, JumpTargets>,
    tries: Vec<TryRegion>,
}

impl<E: Emitter> Compiler<E> {
    /// Creates a compiler writing into `emitter`.
    pub fn new(emitter: E) -> Self {
        Self {
            emitter,
            targets: FxHashMap::default(),
            tries: Vec::new(),
        }
    }

    /// Compiles a method body, ending it with `Halt`.
    pub fn compile(&mut self, program: &hir::Program) -> Result<()> {
        tracing::debug!(statements = program.body.len(), "generation started");
        self.compile_statements(&program.body)?;
        self.emitter.emit(OpCode::Halt);
        debug_assert!(self.targets.is_empty(), "construct labels leaked");
        debug_assert!(self.tries.is_empty(), "try regions leaked");
        Ok(())
    }

    /// Returns the emitter.
    pub fn into_emitter(self) -> E {
        self.emitter
    }

    fn label(&mut self) -> Result<Label> {
        self.emitter.create_label()
    }

    /// Places `label` if `used`; unused break/continue labels stay unplaced.
    fn place_if(&mut self, used: bool, label: Label) {
        if used {
            self.emitter.place_label(label);
        }
    }

    // ========================================================================
    // Jump targets
    // ========================================================================

    fn enter(&mut self, id: ConstructId, break_label: Label, continue_label: Option<Label>) {
        let previous = self.targets.insert(
            id,
            JumpTargets {
                break_label,
                continue_label,
                try_depth: self.tries.len(),
            },
        );
        assert!(previous.is_none(), "construct {id} generated twice");
    }

    fn leave(&mut self, id: ConstructId) {
        self.targets.remove(&id);
    }

    fn targets_of(&self, id: ConstructId) -> JumpTargets {
        *self
            .targets
            .get(&id)
            .unwrap_or_else(|| panic!("jump to construct {id} outside its generation"))
    }

    fn compile_break(&mut self, target: ConstructId) -> Result<()> {
        let targets = self.targets_of(target);
        self.compile_crossed_finally(targets.try_depth)?;
        self.emitter.emit_branch(OpCode::Goto, targets.break_label);
        Ok(())
    }

    fn compile_continue(&mut self, target: ConstructId) -> Result<()> {
        let targets = self.targets_of(target);
        let label = targets
            .continue_label
            .unwrap_or_else(|| panic!("continue to construct {target} without a continue label"));
        self.compile_crossed_finally(targets.try_depth)?;
        self.emitter.emit_branch(OpCode::Goto, label);
        Ok(())
    }
}
