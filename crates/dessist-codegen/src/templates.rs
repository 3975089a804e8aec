// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Static program text.
//!
//! The text around the generated functions (usings, the `Program` class,
//! the `Main` entry point, helper methods) comes from templates looked up
//! through [`TemplateRenderer`]. [`BuiltinTemplates`] renders the copies
//! embedded in the crate with `minijinja`.

use std::collections::BTreeMap;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use thiserror::Error;

/// The templates a program is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    /// Usings, namespace, class and `Main`.
    ProgramHeader,
    /// Closes the class and namespace.
    ProgramFooter,
    /// SQL Server Management Objects usings.
    SqlSmoUsing,
    /// Table-valued parameter helpers (SQL Server 2008 and later).
    TableParamStatic,
}

impl TemplateKey {
    /// Every template key.
    pub const ALL: [TemplateKey; 4] = [
        TemplateKey::ProgramHeader,
        TemplateKey::ProgramFooter,
        TemplateKey::SqlSmoUsing,
        TemplateKey::TableParamStatic,
    ];

    /// Template file name.
    pub fn name(self) -> &'static str {
        match self {
            TemplateKey::ProgramHeader => "program_header.cs",
            TemplateKey::ProgramFooter => "program_footer.cs",
            TemplateKey::SqlSmoUsing => "sql_smo_using.cs",
            TemplateKey::TableParamStatic => "table_param_static.cs",
        }
    }

    fn builtin_source(self) -> &'static str {
        match self {
            TemplateKey::ProgramHeader => include_str!("../templates/program_header.cs"),
            TemplateKey::ProgramFooter => include_str!("../templates/program_footer.cs"),
            TemplateKey::SqlSmoUsing => include_str!("../templates/sql_smo_using.cs"),
            TemplateKey::TableParamStatic => include_str!("../templates/table_param_static.cs"),
        }
    }
}

/// Template lookup or rendering failure.
#[derive(Debug, Error)]
#[error("template {key}: {message}")]
pub struct TemplateError {
    /// Template file name.
    pub key: &'static str,
    /// What went wrong.
    pub message: String,
}

/// Source of the static program text.
pub trait TemplateRenderer {
    /// Render `key` with the given variables.
    fn render(&self, key: TemplateKey, vars: &BTreeMap<&str, String>) -> Result<String, TemplateError>;
}

/// Templates embedded in the crate.
pub struct BuiltinTemplates {
    env: Environment<'static>,
}

impl BuiltinTemplates {
    /// Load the embedded templates.
    ///
    /// Rendering is strict: a variable the template uses but the caller did
    /// not supply is an error rather than empty text.
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        for key in TemplateKey::ALL {
            env.add_template(key.name(), key.builtin_source())
                .map_err(|e| TemplateError {
                    key: key.name(),
                    message: format!("Template parse error: {}", e),
                })?;
        }

        Ok(Self { env })
    }
}

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, key: TemplateKey, vars: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        let template = self.env.get_template(key.name()).map_err(|e| TemplateError {
            key: key.name(),
            message: format!("Failed to get template: {}", e),
        })?;

        template.render(vars).map_err(|e| TemplateError {
            key: key.name(),
            message: format!("Template render error: {}", e),
        })
    }
}
