// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The label and instruction sink that code generation drives.

use std::collections::BTreeMap;

use super::bytecode::{
    Bytecode, ExceptionHandler, Instruction, Label, LookupSwitch, OpCode, Operand, TableSwitch,
};
use crate::{Error, Result};

/// Sink for generated code.
///
/// Labels are created up front, referenced freely, and placed exactly once.
pub trait Emitter {
    /// Allocates a fresh label.
    fn create_label(&mut self) -> Result<Label>;

    /// Binds `label` to the next instruction emitted.
    fn place_label(&mut self, label: Label);

    /// Emits an instruction without operand.
    fn emit(&mut self, opcode: OpCode);

    /// Emits an instruction with one operand.
    fn emit_with(&mut self, opcode: OpCode, operand: Operand);

    /// Emits a branch to `target`.
    fn emit_branch(&mut self, opcode: OpCode, target: Label);

    /// Emits a dense dispatch over `low..=high`.
    fn emit_table_switch(&mut self, default: Label, low: i32, high: i32, targets: Vec<Label>);

    /// Emits a sparse dispatch over `count` sorted pairs.
    fn emit_lookup_switch(&mut self, default: Label, count: usize, pairs: BTreeMap<i32, Label>);

    /// Registers a handler for exceptions raised in `[start, end)`.
    ///
    /// `catch_type` of `None` catches everything. Entries are searched in
    /// registration order.
    fn add_exception_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<&str>,
    );
}

#[derive(Debug)]
struct PendingHandler {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: Option<String>,
}

/// In-memory [`Emitter`] producing a [`Bytecode`].
#[derive(Debug)]
pub struct CodeBuffer {
    instructions: Vec<Instruction>,
    labels: Vec<Option<usize>>,
    handlers: Vec<PendingHandler>,
    max_labels: u32,
}

impl CodeBuffer {
    /// Creates an empty buffer allowing at most `max_labels` labels.
    pub fn new(max_labels: u32) -> Self {
        Self {
            instructions: Vec::new(),
            labels: Vec::new(),
            handlers: Vec::new(),
            max_labels,
        }
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if nothing was emitted yet.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn resolve(&self, label: Label) -> Result<usize> {
        self.labels
            .get(label.0 as usize)
            .copied()
            .flatten()
            .ok_or(Error::UnplacedLabel(label.0))
    }

    /// Checks that every referenced label was placed and seals the code.
    pub fn finish(self, max_locals: u16) -> Result<Bytecode> {
        for instruction in &self.instructions {
            for label in instruction.targets() {
                self.resolve(label)?;
            }
        }

        let mut handlers = self
            .handlers
            .iter()
            .map(|h| {
                Ok(ExceptionHandler {
                    start: self.resolve(h.start)?,
                    end: self.resolve(h.end)?,
                    handler: self.resolve(h.handler)?,
                    catch_type: h.catch_type.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // Ranges split around inlined finally copies can come out empty.
        handlers.retain(|h| h.start < h.end);

        tracing::debug!(
            instructions = self.instructions.len(),
            labels = self.labels.len(),
            handlers = handlers.len(),
            "code sealed"
        );

        Ok(Bytecode {
            instructions: self.instructions,
            labels: self.labels,
            handlers,
            max_locals,
        })
    }
}

impl Emitter for CodeBuffer {
    fn create_label(&mut self) -> Result<Label> {
        let next = self.labels.len();
        if next >= self.max_labels as usize {
            return Err(Error::Resource(format!(
                "method needs more than {} labels",
                self.max_labels
            )));
        }
        self.labels.push(None);
        Ok(Label(next as u32))
    }

    fn place_label(&mut self, label: Label) {
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .unwrap_or_else(|| panic!("label {label} was not created by this buffer"));
        assert!(slot.is_none(), "label {label} placed twice");
        *slot = Some(self.instructions.len());
    }

    fn emit(&mut self, opcode: OpCode) {
        self.instructions.push(Instruction::simple(opcode));
    }

    fn emit_with(&mut self, opcode: OpCode, operand: Operand) {
        self.instructions
            .push(Instruction::with_operand(opcode, operand));
    }

    fn emit_branch(&mut self, opcode: OpCode, target: Label) {
        self.emit_with(opcode, Operand::Label(target));
    }

    fn emit_table_switch(&mut self, default: Label, low: i32, high: i32, targets: Vec<Label>) {
        assert_eq!(
            targets.len() as i64,
            i64::from(high) - i64::from(low) + 1,
            "table switch needs one target per value"
        );
        self.emit_with(
            OpCode::TableSwitch,
            Operand::TableSwitch(TableSwitch {
                default,
                low,
                high,
                targets,
            }),
        );
    }

    fn emit_lookup_switch(&mut self, default: Label, count: usize, pairs: BTreeMap<i32, Label>) {
        assert_eq!(count, pairs.len(), "lookup switch pair count mismatch");
        self.emit_with(
            OpCode::LookupSwitch,
            Operand::LookupSwitch(LookupSwitch {
                default,
                pairs: pairs.into_iter().collect(),
            }),
        );
    }

    fn add_exception_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<&str>,
    ) {
        self.handlers.push(PendingHandler {
            start,
            end,
            handler,
            catch_type: catch_type.map(str::to_string),
        });
    }
}
