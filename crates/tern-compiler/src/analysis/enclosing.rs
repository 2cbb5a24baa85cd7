// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The enclosing-construct stack.
//!
//! Loops and switches push a frame before their body is analyzed and pop it
//! afterwards. A `break` or `continue` resolves to whatever frame is on top at
//! that moment: the lexically nearest construct, whatever its kind. Resolving
//! marks the frame, and the popped frame's flags tell generation which labels
//! must actually be placed.
//!
//! Imbalance and resolution on an empty stack are defects in the analyzer, not
//! user errors, and panic.

use std::fmt;

use serde::Serialize;

/// Identifies one loop or switch within a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConstructId(pub u32);

impl fmt::Display for ConstructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of construct a jump can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstructKind {
    /// for loop
    For,
    /// while loop
    While,
    /// do-while loop
    Do,
    /// switch statement
    Switch,
}

/// A construct that `break` can leave.
pub trait Breakable {
    /// The construct's id.
    fn id(&self) -> ConstructId;
    /// Records that some `break` targets this construct.
    fn set_has_break(&mut self);
    /// Whether some `break` targets this construct.
    fn has_break(&self) -> bool;
}

/// A construct that `continue` can restart.
pub trait Continuable: Breakable {
    /// Records that some `continue` targets this construct.
    fn set_has_continue(&mut self);
    /// Whether some `continue` targets this construct.
    fn has_continue(&self) -> bool;
}

/// Frame of a loop under analysis.
#[derive(Debug, Clone)]
pub struct LoopFrame {
    id: ConstructId,
    kind: ConstructKind,
    has_break: bool,
    has_continue: bool,
}

impl LoopFrame {
    /// Which loop form this is.
    pub fn kind(&self) -> ConstructKind {
        self.kind
    }
}

impl Breakable for LoopFrame {
    fn id(&self) -> ConstructId {
        self.id
    }

    fn set_has_break(&mut self) {
        self.has_break = true;
    }

    fn has_break(&self) -> bool {
        self.has_break
    }
}

impl Continuable for LoopFrame {
    fn set_has_continue(&mut self) {
        self.has_continue = true;
    }

    fn has_continue(&self) -> bool {
        self.has_continue
    }
}

/// Frame of a switch under analysis.
#[derive(Debug, Clone)]
pub struct SwitchFrame {
    id: ConstructId,
    has_break: bool,
}

impl Breakable for SwitchFrame {
    fn id(&self) -> ConstructId {
        self.id
    }

    fn set_has_break(&mut self) {
        self.has_break = true;
    }

    fn has_break(&self) -> bool {
        self.has_break
    }
}

#[derive(Debug)]
enum Frame {
    Loop(LoopFrame),
    Switch(SwitchFrame),
}

impl Frame {
    fn breakable(&mut self) -> &mut dyn Breakable {
        match self {
            Frame::Loop(f) => f,
            Frame::Switch(f) => f,
        }
    }

    fn continuable(&mut self) -> Option<&mut dyn Continuable> {
        match self {
            Frame::Loop(f) => Some(f),
            Frame::Switch(_) => None,
        }
    }
}

/// A `continue` whose nearest construct is a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinueInSwitch {
    /// The switch that was on top
    pub switch: ConstructId,
}

/// Stack of loops and switches enclosing the statement being analyzed.
///
/// One stack lives for one analysis call.
#[derive(Debug, Default)]
pub struct EnclosingStack {
    frames: Vec<Frame>,
    next_id: u32,
}

impl EnclosingStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no construct encloses the current statement.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of open constructs.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    fn fresh_id(&mut self) -> ConstructId {
        let id = ConstructId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Enters a loop body.
    pub fn push_loop(&mut self, kind: ConstructKind) -> ConstructId {
        assert!(kind != ConstructKind::Switch, "push_loop called for a switch");
        let id = self.fresh_id();
        tracing::trace!(%id, ?kind, depth = self.frames.len(), "enter construct");
        self.frames.push(Frame::Loop(LoopFrame {
            id,
            kind,
            has_break: false,
            has_continue: false,
        }));
        id
    }

    /// Enters a switch body.
    pub fn push_switch(&mut self) -> ConstructId {
        let id = self.fresh_id();
        tracing::trace!(%id, depth = self.frames.len(), "enter switch");
        self.frames.push(Frame::Switch(SwitchFrame {
            id,
            has_break: false,
        }));
        id
    }

    /// Leaves the loop `id`, which must be on top.
    pub fn pop_loop(&mut self, id: ConstructId) -> LoopFrame {
        match self.frames.pop() {
            Some(Frame::Loop(frame)) if frame.id == id => {
                tracing::trace!(%id, has_break = frame.has_break, has_continue = frame.has_continue, "leave construct");
                frame
            }
            other => panic!("unbalanced enclosing stack: expected loop {id}, found {other:?}"),
        }
    }

    /// Leaves the switch `id`, which must be on top.
    pub fn pop_switch(&mut self, id: ConstructId) -> SwitchFrame {
        match self.frames.pop() {
            Some(Frame::Switch(frame)) if frame.id == id => {
                tracing::trace!(%id, has_break = frame.has_break, "leave switch");
                frame
            }
            other => panic!("unbalanced enclosing stack: expected switch {id}, found {other:?}"),
        }
    }

    /// Resolves a `break` to the top construct and marks it.
    pub fn resolve_break(&mut self) -> ConstructId {
        let target = self
            .frames
            .last_mut()
            .unwrap_or_else(|| panic!("break resolved with an empty enclosing stack"))
            .breakable();
        target.set_has_break();
        tracing::trace!(id = %target.id(), "break resolved");
        target.id()
    }

    /// Resolves a `continue` to the top construct and marks it.
    ///
    /// Fails without marking anything when the top construct is a switch.
    pub fn resolve_continue(&mut self) -> Result<ConstructId, ContinueInSwitch> {
        let frame = self
            .frames
            .last_mut()
            .unwrap_or_else(|| panic!("continue resolved with an empty enclosing stack"));
        let switch = frame.breakable().id();
        let Some(target) = frame.continuable() else {
            return Err(ContinueInSwitch { switch });
        };
        target.set_has_continue();
        tracing::trace!(id = %target.id(), "continue resolved");
        Ok(target.id())
    }
}
