// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical scopes and flat local-slot allocation.
//!
//! Slots are handed out from a single counter. Leaving a scope rewinds the
//! counter, so sibling scopes (two catch blocks, two switch groups) reuse the
//! same slots. The high-water mark becomes the method's `max_locals`.

use crate::types::Type;

/// A local variable in a scope.
#[derive(Debug, Clone)]
pub struct Local {
    /// The variable name
    pub name: String,
    /// The scope depth where this was declared
    pub depth: usize,
    /// The slot holding the variable
    pub slot: u16,
    /// The declared type
    pub ty: Type,
}

/// Why a declaration failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The name is already declared in the innermost scope
    Duplicate(String),
    /// No slot left under the configured budget
    Exhausted,
}

/// The chain of open scopes during analysis.
#[derive(Debug)]
pub struct Scope {
    locals: Vec<Local>,
    depth: usize,
    next_slot: u16,
    saved: Vec<u16>,
    max_slots: u16,
    limit: u16,
}

impl Scope {
    /// Creates an outermost scope with the given slot budget.
    pub fn new(limit: u16) -> Self {
        Self {
            locals: Vec::new(),
            depth: 0,
            next_slot: 0,
            saved: Vec::new(),
            max_slots: 0,
            limit,
        }
    }

    /// Current nesting depth (0 = method body).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Opens a fresh child scope.
    pub fn begin_scope(&mut self) {
        self.depth += 1;
        self.saved.push(self.next_slot);
    }

    /// Closes the innermost scope, dropping its locals and releasing their slots.
    pub fn end_scope(&mut self) {
        while self.locals.last().is_some_and(|l| l.depth == self.depth) {
            self.locals.pop();
        }
        if let Some(slot) = self.saved.pop() {
            self.next_slot = slot;
        }
        self.depth -= 1;
    }

    /// Reserves an anonymous slot in the innermost scope.
    pub fn next_offset(&mut self) -> Result<u16, ScopeError> {
        if self.next_slot >= self.limit {
            return Err(ScopeError::Exhausted);
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.max_slots = self.max_slots.max(self.next_slot);
        Ok(slot)
    }

    /// Declares a named local in the innermost scope and returns its slot.
    pub fn declare(&mut self, name: &str, ty: Type) -> Result<u16, ScopeError> {
        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|l| l.depth == self.depth)
            .any(|l| l.name == name);
        if duplicate {
            return Err(ScopeError::Duplicate(name.to_string()));
        }
        let slot = self.next_offset()?;
        self.locals.push(Local {
            name: name.to_string(),
            depth: self.depth,
            slot,
            ty,
        });
        Ok(slot)
    }

    /// Resolves a name to the innermost visible local.
    pub fn resolve(&self, name: &str) -> Option<&Local> {
        self.locals.iter().rev().find(|l| l.name == name)
    }

    /// Highest number of slots live at once so far.
    pub fn max_slots(&self) -> u16 {
        self.max_slots
    }
}
