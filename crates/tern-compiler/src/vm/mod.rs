// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reference executor for generated bytecode.
//!
//! A small stack machine that runs one method body so control flow can be
//! checked by execution: dispatch tables, exception-table lookup in
//! registration order against a class hierarchy, and host functions standing
//! in for method calls.
//!
//! ## Structure
//!
//! - `interpreter` - the dispatch loop
//! - `value` - values, heap objects and the class hierarchy

mod interpreter;
pub mod value;

pub use interpreter::{CallRecord, Native, VM};
pub use value::{ClassHierarchy, Object, Value};
