// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Package generation
//!
//! Reads a `.dtsx` file, translates it in memory, and only then writes the
//! output folder: `program.cs` plus the captured script task sources under
//! `scripts/<function>/`.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use dessist_dtsx::{IngestError, IngestOptions, IngestWarning, ingest};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codegen::{CodegenError, Diagnostic, EmitContext, ProgramOutput, emit_program};
use crate::config::Config;
use crate::package::PackageLayout;
use crate::templates::{BuiltinTemplates, TemplateRenderer};

/// File name of the generated program.
pub const PROGRAM_FILE: &str = "program.cs";

/// Folder, under the output folder, holding script task sources.
pub const SCRIPTS_DIR: &str = "scripts";

/// Errors from the generation driver.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Reading the package or writing the output failed.
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being done.
        action: &'static str,
        /// File or folder involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The package is not well-formed XML.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Emission failed.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl GenerateError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| GenerateError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Input for generation.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    /// The `.dtsx` file to translate.
    pub package_path: PathBuf,
    /// Folder to write `program.cs` and `scripts/` into; created if missing.
    pub output_dir: PathBuf,
    /// Emission and ingestion settings.
    pub config: Config,
    /// Namespace of the generated program; defaults to the package file stem.
    pub project_name: Option<String>,
}

/// Result of generation.
#[derive(Debug)]
pub struct GenerationResult {
    /// Path of the written `program.cs`.
    pub program_path: PathBuf,
    /// Function called from `Main`.
    pub entry_point: String,
    /// SHA-256 checksum of the program text.
    pub checksum: String,
    /// Number of functions emitted.
    pub function_count: usize,
    /// Number of global variables emitted.
    pub variable_count: usize,
    /// Script source files written.
    pub script_files: Vec<PathBuf>,
    /// Non-fatal problems found while emitting.
    pub diagnostics: Vec<Diagnostic>,
    /// Non-fatal problems found while ingesting.
    pub ingest_warnings: Vec<IngestWarning>,
}

/// Translate package XML to a program without touching the filesystem.
pub fn translate_package(
    xml: &str,
    project_name: &str,
    config: &Config,
) -> Result<ProgramOutput, GenerateError> {
    let templates = BuiltinTemplates::new().map_err(CodegenError::from)?;
    translate_with(xml, project_name, config, &templates)
}

/// Translate package XML using the given templates.
pub fn translate_with(
    xml: &str,
    project_name: &str,
    config: &Config,
    templates: &dyn TemplateRenderer,
) -> Result<ProgramOutput, GenerateError> {
    let options = IngestOptions::with_content_precedence(config.content_precedence);
    let tree = ingest(xml, &options)?;
    debug!(nodes = tree.len(), warnings = tree.warnings.len(), "Package ingested");

    let layout = PackageLayout::from_tree(&tree);
    Ok(emit_program(
        &tree,
        &layout,
        project_name,
        templates,
        EmitContext::new(config.emit),
    )?)
}

/// Translate a package file and write the output folder.
///
/// Nothing is written unless translation succeeds, so a package without
/// executables leaves the output folder untouched.
pub fn generate_package(input: GenerationInput) -> Result<GenerationResult, GenerateError> {
    let GenerationInput {
        package_path,
        output_dir,
        config,
        project_name,
    } = input;

    let xml = fs::read_to_string(&package_path)
        .map_err(GenerateError::io("failed to read", &package_path))?;
    let project_name = project_name.unwrap_or_else(|| {
        package_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Package".to_string())
    });

    let output = translate_package(&xml, &project_name, &config)?;

    fs::create_dir_all(&output_dir)
        .map_err(GenerateError::io("failed to create", &output_dir))?;

    let program_path = output_dir.join(PROGRAM_FILE);
    write_file(&program_path, &output.source)?;

    let mut script_files = Vec::with_capacity(output.scripts.len());
    for script in &output.scripts {
        let Some(relative) = script_path(&script.function, &script.file_name) else {
            warn!(file = %script.file_name, "Skipping script file with an unsafe path");
            continue;
        };
        let path = output_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(GenerateError::io("failed to create", parent))?;
        }
        write_file(&path, &script.text)?;
        script_files.push(path);
    }

    let mut hasher = Sha256::new();
    hasher.update(output.source.as_bytes());
    let checksum = format!("{:x}", hasher.finalize());

    info!(
        program = %program_path.display(),
        entry_point = %output.entry_point,
        functions = output.function_count,
        scripts = script_files.len(),
        diagnostics = output.diagnostics.len(),
        "Package generated"
    );

    Ok(GenerationResult {
        program_path,
        entry_point: output.entry_point,
        checksum,
        function_count: output.function_count,
        variable_count: output.variable_count,
        script_files,
        diagnostics: output.diagnostics,
        ingest_warnings: output.ingest_warnings,
    })
}

fn write_file(path: &Path, text: &str) -> Result<(), GenerateError> {
    let file = fs::File::create(path).map_err(GenerateError::io("failed to create", path))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .map_err(GenerateError::io("failed to write", path))?;
    writer
        .flush()
        .map_err(GenerateError::io("failed to write", path))
}

/// `scripts/<function>/<file>` for a script source, with the package's
/// backslash separators normalized. `None` when the recorded name would
/// escape the function's folder.
fn script_path(function: &str, file_name: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(file_name.replace('\\', "/"));
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || relative.as_os_str().is_empty() {
        return None;
    }
    Some(Path::new(SCRIPTS_DIR).join(function).join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_path() {
        assert_eq!(
            script_path("Run", r"Properties\AssemblyInfo.cs"),
            Some(PathBuf::from("scripts/Run/Properties/AssemblyInfo.cs"))
        );
        assert_eq!(
            script_path("Run", "ScriptMain.cs"),
            Some(PathBuf::from("scripts/Run/ScriptMain.cs"))
        );
        assert_eq!(script_path("Run", r"..\..\evil.cs"), None);
        assert_eq!(script_path("Run", "/etc/passwd"), None);
        assert_eq!(script_path("Run", ""), None);
    }

    #[test]
    fn test_translate_package_in_memory() {
        let xml = r#"<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts" DTS:ObjectName="P">
                       <DTS:Executable DTS:ExecutableType="Microsoft.FtpTask" DTS:ObjectName="Fetch"/>
                     </DTS:Executable>"#;
        let output = translate_package(xml, "P", &Config::default()).unwrap();
        assert_eq!(output.entry_point, "Fetch");
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.ingest_warnings.is_empty());
    }

    #[test]
    fn test_translate_package_malformed() {
        let err = translate_package("<DTS:Executable", "P", &Config::default()).unwrap_err();
        assert!(matches!(err, GenerateError::Ingest(_)));
    }
}
