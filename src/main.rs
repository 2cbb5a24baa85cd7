// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! tern - compile method bodies to stack bytecode
//!
//! Reads a method body as a JSON syntax tree and checks, compiles, dumps or
//! runs it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tern_compiler::vm::VM;
use tern_compiler::{CompilerConfig, Error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// tern - control-flow analysis and stack-machine code generation
#[derive(Parser, Debug)]
#[command(name = "tern")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./tern.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run analysis only and report diagnostics
    Check {
        /// Syntax tree in JSON
        input: PathBuf,
    },

    /// Compile and print the bytecode listing
    Compile {
        /// Syntax tree in JSON
        input: PathBuf,

        /// Print the bytecode as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Print the structural dump of the syntax tree
    Dump {
        /// Syntax tree in JSON
        input: PathBuf,
    },

    /// Compile and execute on the reference VM
    Run {
        /// Syntax tree in JSON
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_env("TERN_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Semantic(diagnostics)) => {
            for d in &diagnostics {
                eprintln!(
                    "{}: {} {}",
                    "error".red().bold(),
                    format!("line {}:", d.line).cyan(),
                    d.message
                );
            }
            eprintln!(
                "{}",
                format!("{} error(s)", diagnostics.len()).red()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> tern_compiler::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Check { input } => {
            let program = read_program(input)?;
            tern_compiler::analyze(&program, &config)?;
            println!("{}", "ok".green());
        }
        Commands::Compile { input, json } => {
            let program = read_program(input)?;
            let bytecode = tern_compiler::compile(&program, &config)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&bytecode)?);
            } else {
                print!("{}", bytecode);
            }
        }
        Commands::Dump { input } => {
            let program = read_program(input)?;
            let dump = tern_compiler::dump::to_json(&program);
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        Commands::Run { input } => {
            let program = read_program(input)?;
            let bytecode = tern_compiler::compile(&program, &config)?;
            let mut vm = VM::new(&config);
            vm.execute(&bytecode)?;
            for call in vm.calls() {
                let args: Vec<String> = call.args.iter().map(ToString::to_string).collect();
                println!("{}({})", call.name.cyan(), args.join(", "));
            }
            for slot in 0..bytecode.max_locals {
                if let Some(value) = vm.local(slot) {
                    println!("{} = {}", format!("local {}", slot).dimmed(), value);
                }
            }
        }
    }
    Ok(())
}

fn read_program(path: &Path) -> tern_compiler::Result<tern_compiler::ast::Program> {
    let text = std::fs::read_to_string(path)?;
    tern_compiler::parse_program(&text)
}

/// `--config`, then `./tern.toml`, then the user config dir, then `TERN_*`.
fn load_config(explicit: Option<&Path>) -> tern_compiler::Result<CompilerConfig> {
    let user = dirs::config_dir().map(|d| d.join("tern").join("config.toml"));
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => [Some(PathBuf::from("tern.toml")), user]
            .into_iter()
            .flatten()
            .find(|p| p.is_file()),
    };

    let mut config = match found {
        Some(path) => CompilerConfig::load(&path)?,
        None => CompilerConfig::default(),
    };
    config.apply_env()?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}
