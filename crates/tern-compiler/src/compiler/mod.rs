// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode generation.
//!
//! Transforms the annotated tree into stack-machine code.
//!
//! # Module Structure
//!
//! - `bytecode`: Bytecode definitions and instructions
//! - `emitter`: The label/instruction sink and its in-memory implementation
//! - `codegen`: Code generation from the annotated tree
//!   - `codegen::loops`: for/while/do label topology
//!   - `codegen::switch`: table and lookup dispatch
//!   - `codegen::exceptions`: try/catch/finally and the exception table

pub mod bytecode;
pub mod codegen;
pub mod emitter;

pub use bytecode::{Bytecode, ExceptionHandler, Instruction, Label, OpCode, Operand};
pub use codegen::Compiler;
pub use emitter::{CodeBuffer, Emitter};

use crate::Result;
use crate::analysis::hir;
use crate::config::CompilerConfig;

/// Generates code for an analyzed method body.
pub fn generate(program: &hir::Program, config: &CompilerConfig) -> Result<Bytecode> {
    let mut compiler = Compiler::new(CodeBuffer::new(config.max_labels));
    compiler.compile(program)?;
    compiler.into_emitter().finish(program.max_locals)
}
