// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Switch lowering.
//!
//! Each case label gets its own label, placed at the start of its group.
//! Groups are emitted back to back so execution falls through from one into
//! the next unless a `break` jumps to the shared break label.
//!
//! ```text
//!   [selector]
//!   TableSwitch lo..hi [case labels, default for gaps] default
//!   (or LookupSwitch n [value: case label, ...] default)
//! case_a: case_b:
//!   [group 0]
//! default:           (at its group, or after the last group)
//!   [group 1]
//! break:             (if used)
//! ```

use std::collections::BTreeMap;

use super::Compiler;
use crate::Result;
use crate::analysis::hir::Switch;
use crate::analysis::switch::DispatchKind;
use crate::compiler::bytecode::Label;
use crate::compiler::emitter::Emitter;

impl<E: Emitter> Compiler<E> {
    pub(super) fn compile_switch(&mut self, switch: &Switch) -> Result<()> {
        let dispatch = &switch.dispatch;
        self.compile_expression(&switch.selector)?;

        let break_label = self.label()?;
        let default_label = self.label()?;
        self.enter(switch.id, break_label, None);

        let mut group_labels: Vec<Vec<Label>> = vec![Vec::new(); switch.groups.len()];
        let mut by_value = BTreeMap::new();
        for &(value, group) in &dispatch.cases {
            let label = self.label()?;
            group_labels[group].push(label);
            by_value.insert(value, label);
        }

        match dispatch.kind {
            DispatchKind::Table => {
                let targets = (dispatch.lo..=dispatch.hi)
                    .map(|v| by_value.get(&v).copied().unwrap_or(default_label))
                    .collect();
                self.emitter
                    .emit_table_switch(default_label, dispatch.lo, dispatch.hi, targets);
            }
            DispatchKind::Lookup => {
                self.emitter
                    .emit_lookup_switch(default_label, dispatch.n_labels, by_value);
            }
        }

        for (index, (body, labels)) in switch.groups.iter().zip(&group_labels).enumerate() {
            if dispatch.default_group == Some(index) {
                self.emitter.place_label(default_label);
            }
            for label in labels {
                self.emitter.place_label(*label);
            }
            self.compile_statements(body)?;
        }
        if dispatch.default_group.is_none() {
            self.emitter.place_label(default_label);
        }

        self.leave(switch.id);
        self.place_if(switch.has_break, break_label);
        Ok(())
    }
}
