// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Emission engine.
//!
//! Walks an ingested package tree and writes C# source: one declaration per
//! global variable and one method per executable, wrapped in the program
//! templates.

pub mod context;
pub mod expressions;
pub mod functions;
pub mod program;
pub mod tasks;
pub mod variables;
pub mod writer;

use thiserror::Error;

use crate::templates::TemplateError;

pub use context::{Diagnostic, DiagnosticKind, EmitContext, ProgramVariable, ScriptSource};
pub use functions::{ExecutableKind, emit_function};
pub use program::{ProgramOutput, emit_program};
pub use variables::emit_variable;

/// Errors that stop program emission.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The package has no top-level executables, so there is nothing to emit.
    #[error("no executables found in package")]
    EmptyExecutableSet,

    /// A program template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
