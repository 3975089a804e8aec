// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dessist Codegen - SSIS Packages to C# Programs
//!
//! This crate turns an ingested SSIS package (see `dessist-dtsx`) into a C#
//! console program that performs the package's control flow: one method per
//! executable, package variables as static fields, and a `Main` that calls
//! the first top-level executable.
//!
//! # Architecture
//!
//! ```text
//!     ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//!     │   .dtsx     │      │ ObjectTree  │      │ program.cs  │
//!     │  package    │─────▶│  (ingest)   │─────▶│ scripts/**  │
//!     │  (XML)      │      │             │      │  (codegen)  │
//!     └─────────────┘      └─────────────┘      └─────────────┘
//!                                 │
//!                                 ▼
//!                          ┌─────────────┐
//!                          │  Package    │
//!                          │  layout     │
//!                          └─────────────┘
//! ```
//!
//! # Generation Pipeline
//!
//! 1. **Ingest**: Parse the `.dtsx` into a generic node tree
//! 2. **Layout**: Select global variables and top-level executables
//! 3. **Emit**: Write variables and functions, translating SSIS expressions
//! 4. **Assemble**: Wrap the code in the program templates
//! 5. **Write**: Create the output folder, `program.cs` and script sources
//!
//! # Usage
//!
//! ```no_run
//! use dessist_codegen::{Config, GenerationInput, generate_package};
//!
//! let result = generate_package(GenerationInput {
//!     package_path: "NightlyLoad.dtsx".into(),
//!     output_dir: "out".into(),
//!     config: Config::default(),
//!     project_name: None,
//! })?;
//! println!("entry point: {}", result.entry_point);
//! # Ok::<(), dessist_codegen::GenerateError>(())
//! ```
//!
//! # Modules
//!
//! - [`codegen`]: Emission engine
//! - [`config`]: Environment configuration
//! - [`generate`]: Translation and output writing
//! - [`package`]: Top-level package layout
//! - [`templates`]: Static program text

#![deny(missing_docs)]

/// Emission engine: variables, functions, expressions and tasks.
pub mod codegen;

/// Configuration from environment variables.
pub mod config;

/// Translation driver and output writing.
pub mod generate;

/// Top-level package layout.
pub mod package;

/// Program templates.
pub mod templates;

// Re-export main types
pub use codegen::{
    CodegenError, Diagnostic, DiagnosticKind, EmitContext, ProgramOutput, emit_function,
    emit_program, emit_variable,
};
pub use config::{Config, ConfigError, EmitOptions, SqlCompatibility};
pub use generate::{
    GenerateError, GenerationInput, GenerationResult, generate_package, translate_package,
    translate_with,
};
pub use package::PackageLayout;
pub use templates::{BuiltinTemplates, TemplateError, TemplateKey, TemplateRenderer};

// Re-export tree types for convenience
pub use dessist_dtsx::{NodeId, ObjectTree};
