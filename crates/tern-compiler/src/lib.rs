// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tern-compiler
//!
//! Control-flow analysis and code generation for a Java-like language targeting
//! a stack-machine bytecode.
//!
//! ## Overview
//!
//! Compilation of a method body runs in two strictly ordered passes:
//! - [`analysis`] type-checks the input tree, resolves every `break`/`continue`
//!   to its enclosing construct and computes switch dispatch descriptors,
//!   producing an annotated tree ([`analysis::hir`])
//! - [`compiler`] walks the annotated tree once and drives a label/instruction
//!   sink, laying out loops, switch dispatch and try/catch/finally
//!
//! A reference executor in [`vm`] runs the emitted code.
//!
//! ## Quick Start
//!
//! ```rust
//! use tern_compiler::ast::build::*;
//! use tern_compiler::ast::Program;
//! use tern_compiler::types::Type;
//! use tern_compiler::{compile, CompilerConfig};
//!
//! let program = Program {
//!     body: vec![
//!         local("x", Type::Int, Some(int(5))),
//!         expr(update(tern_compiler::ast::UpdateOperator::PostIncrement, var("x"))),
//!     ],
//! };
//! let bytecode = compile(&program, &CompilerConfig::default()).unwrap();
//! assert!(!bytecode.instructions.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod ast;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod dump;
pub mod types;
pub mod vm;

pub use compiler::bytecode::Bytecode;
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, Diagnostics};

use thiserror::Error;

/// Errors produced by the compiler and the reference executor.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more semantic diagnostics; compilation produced nothing
    #[error("compilation failed with {n} error(s)\n{d}", n = .0.len(), d = .0)]
    Semantic(Diagnostics),

    /// Slot or label budget exhausted
    #[error("resource exhausted: {0}")]
    Resource(String),

    /// A label was referenced but never placed
    #[error("label L{0} referenced but never placed")]
    UnplacedLabel(u32),

    /// Malformed code reached the executor
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An exception escaped every handler
    #[error("uncaught exception: {class}")]
    Uncaught {
        /// Class of the escaping exception
        class: String,
    },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Analyzes and generates one method body.
///
/// Returns every semantic diagnostic at once as [`Error::Semantic`] when
/// analysis fails; generation never runs in that case.
pub fn compile(program: &ast::Program, config: &CompilerConfig) -> Result<Bytecode> {
    let annotated = analyze(program, config)?;
    compiler::generate(&annotated, config)
}

/// Runs the analysis pass alone.
pub fn analyze(program: &ast::Program, config: &CompilerConfig) -> Result<analysis::hir::Program> {
    analysis::Analyzer::new(config).analyze(program)
}

/// Reads an input tree from JSON.
pub fn parse_program(json: &str) -> Result<ast::Program> {
    Ok(serde_json::from_str(json)?)
}
