// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SSIS package translator CLI
//!
//! Translates a `.dtsx` package into a C# program.
//!
//! Usage:
//!
//! ```text
//! dessist <PACKAGE.dtsx> [-o <DIR>] [--sql-mode sql2008|sql2005] [--no-smo]
//!         [--project-name <NAME>] [--content-precedence last|first] [--dump-tree]
//! ```
//!
//! Example:
//!
//! ```text
//! dessist NightlyLoad.dtsx -o ./NightlyLoad --sql-mode sql2005
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use dessist_codegen::{Config, GenerationInput, SqlCompatibility, generate_package};
use dessist_dtsx::{ContentPrecedence, IngestOptions, ingest};

#[derive(Debug, Parser)]
#[command(
    name = "dessist",
    version,
    about = "Translate an SSIS package (.dtsx) into a C# program"
)]
struct Args {
    /// Package to translate
    #[arg(value_name = "PACKAGE")]
    package: PathBuf,
    /// Output folder (defaults to the package name next to the package)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// SQL Server compatibility mode [env: DESSIST_SQL_MODE]
    #[arg(long, value_enum)]
    sql_mode: Option<SqlCompatibility>,
    /// Emit plain SqlCommand calls instead of SQL Server Management Objects
    #[arg(long)]
    no_smo: bool,
    /// Namespace of the generated program (defaults to the package file name)
    #[arg(long)]
    project_name: Option<String>,
    /// Which text wins when an element carries several [env: DESSIST_CONTENT_PRECEDENCE]
    #[arg(long, value_enum)]
    content_precedence: Option<PrecedenceArg>,
    /// Print the ingested tree as JSON and exit
    #[arg(long)]
    dump_tree: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PrecedenceArg {
    Last,
    First,
}

impl From<PrecedenceArg> for ContentPrecedence {
    fn from(value: PrecedenceArg) -> Self {
        match value {
            PrecedenceArg::Last => ContentPrecedence::Last,
            PrecedenceArg::First => ContentPrecedence::First,
        }
    }
}

fn main() -> ExitCode {
    // Initialize minimal logging (default to warn if RUST_LOG not set)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(sql_mode) = args.sql_mode {
        config.emit.sql_mode = sql_mode;
    }
    if args.no_smo {
        config.emit.use_smo = false;
    }
    if let Some(precedence) = args.content_precedence {
        config.content_precedence = precedence.into();
    }

    if args.dump_tree {
        return dump_tree(&args.package, &config);
    }

    let output_dir = args.output.unwrap_or_else(|| args.package.with_extension(""));
    eprintln!(
        "Translating package {} into {}",
        args.package.display(),
        output_dir.display()
    );

    let result = match generate_package(GenerationInput {
        package_path: args.package,
        output_dir,
        config,
        project_name: args.project_name,
    }) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Translation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for warning in &result.ingest_warnings {
        eprintln!("Warning: {}", warning);
    }
    for diagnostic in &result.diagnostics {
        eprintln!("Warning: {}", diagnostic);
    }

    eprintln!("Translation successful:");
    eprintln!("  Entry point: {}", result.entry_point);
    eprintln!("  Functions: {}", result.function_count);
    eprintln!("  Variables: {}", result.variable_count);
    eprintln!("  Script files: {}", result.script_files.len());
    eprintln!("  Checksum: {}", result.checksum);

    // Print program path to stdout for scripts to capture
    println!("{}", result.program_path.display());

    ExitCode::SUCCESS
}

fn dump_tree(package: &Path, config: &Config) -> ExitCode {
    let xml = match fs::read_to_string(package) {
        Ok(xml) => xml,
        Err(e) => {
            eprintln!("Error reading package {:?}: {}", package, e);
            return ExitCode::FAILURE;
        }
    };

    let options = IngestOptions::with_content_precedence(config.content_precedence);
    let tree = match ingest(&xml, &options) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error parsing package: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&tree.to_json()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing tree: {}", e);
            ExitCode::FAILURE
        }
    }
}
