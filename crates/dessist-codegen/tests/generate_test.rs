// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end generation tests.
//!
//! Each test translates a fixture package from `tests/fixtures/` into a
//! temporary output folder and inspects the written files.

use dessist_codegen::{
    CodegenError, Config, DiagnosticKind, GenerateError, GenerationInput, GenerationResult,
    generate_package, translate_package,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn generate(name: &str, output_dir: PathBuf) -> Result<GenerationResult, GenerateError> {
    generate_package(GenerationInput {
        package_path: fixture(name),
        output_dir,
        config: Config::default(),
        project_name: None,
    })
}

// ============================================================================
// Generation Tests
// ============================================================================

#[test]
fn test_nightly_load_program() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let out = temp_dir.path().join("out");

    let result = generate("nightly_load.dtsx", out.clone()).expect("generation failed");
    let source = fs::read_to_string(&result.program_path).unwrap();

    assert_eq!(result.program_path, out.join("program.cs"));
    assert_eq!(result.entry_point, "Truncate_Staging");
    assert_eq!(result.variable_count, 1);
    assert_eq!(result.function_count, 4);
    assert_eq!(result.checksum.len(), 64);

    assert!(source.contains("namespace nightly_load\n"));
    assert!(source.contains("            Truncate_Staging();\n"));
    assert!(source.contains("        public static string TableName = @\"staging.orders\";\n"));
    assert!(source.contains(r#"string sql = "TRUNCATE TABLE " + TableName;"#));
    assert!(source.contains(
        r#"string connstr = @"Data Source=.;Initial Catalog=dw;Integrated Security=SSPI;";"#
    ));

    // the comment in the package is reported, not emitted
    assert_eq!(result.ingest_warnings.len(), 1);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_duplicate_names_get_suffixes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = generate("nightly_load.dtsx", temp_dir.path().to_path_buf()).unwrap();
    let source = fs::read_to_string(&result.program_path).unwrap();

    assert!(source.contains("public static void Load_Data()"));
    assert!(source.contains("public static void Load_Data2()"));

    let first = source.find("            Load_Data();\n").unwrap();
    let second = source.find("            Load_Data2();\n").unwrap();
    assert!(first < second);
}

#[test]
fn test_container_children_follow_document_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = generate("nightly_load.dtsx", temp_dir.path().to_path_buf()).unwrap();
    let source = fs::read_to_string(&result.program_path).unwrap();

    let positions: Vec<usize> = [
        "public static void Truncate_Staging()",
        "public static void Load_Sequence()",
        "public static void Load_Data()",
        "public static void Load_Data2()",
    ]
    .iter()
    .map(|signature| source.find(signature).unwrap())
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_empty_package_writes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let out = temp_dir.path().join("out");

    let err = generate("empty_package.dtsx", out.clone()).unwrap_err();

    assert!(matches!(
        err,
        GenerateError::Codegen(CodegenError::EmptyExecutableSet)
    ));
    assert!(!out.exists());
}

#[test]
fn test_unknown_task_gets_placeholder() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = generate("unknown_task.dtsx", temp_dir.path().to_path_buf()).unwrap();
    let source = fs::read_to_string(&result.program_path).unwrap();

    assert_eq!(result.entry_point, "Fetch_Files");
    assert!(source.contains("public static void Fetch_Files()"));
    assert!(source.contains("// UNTRANSLATED: task type 'Microsoft.FtpTask' has no translation"));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::UntranslatedConstruct
    );
}

#[test]
fn test_script_sources_written() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let out = temp_dir.path().to_path_buf();
    let result = generate("script_package.dtsx", out.clone()).unwrap();
    let source = fs::read_to_string(&result.program_path).unwrap();

    let script_dir = out.join("scripts").join("Purge_Folder");
    assert_eq!(
        result.script_files,
        vec![
            script_dir.join("ScriptMain.cs"),
            script_dir.join("Properties").join("AssemblyInfo.cs"),
        ]
    );
    let main = fs::read_to_string(script_dir.join("ScriptMain.cs")).unwrap();
    assert!(main.starts_with("namespace ST_Purge.csproj"));

    assert!(source.contains("ST_Purge.csproj.ScriptMain script = new ST_Purge.csproj.ScriptMain();"));
    assert!(source.contains(r#"public static string Folder = @"C:\drop";"#));
}

#[test]
fn test_custom_project_name() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = generate_package(GenerationInput {
        package_path: fixture("unknown_task.dtsx"),
        output_dir: temp_dir.path().to_path_buf(),
        config: Config::default(),
        project_name: Some("Ftp Jobs".to_string()),
    })
    .unwrap();
    let source = fs::read_to_string(&result.program_path).unwrap();
    assert!(source.contains("namespace Ftp_Jobs\n"));
}

#[test]
fn test_missing_package_is_io_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let err = generate("does_not_exist.dtsx", temp_dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, GenerateError::Io { .. }));
}

#[test]
fn test_translation_is_deterministic() {
    let xml = fs::read_to_string(fixture("nightly_load.dtsx")).unwrap();
    let first = translate_package(&xml, "NightlyLoad", &Config::default()).unwrap();
    let second = translate_package(&xml, "NightlyLoad", &Config::default()).unwrap();
    assert_eq!(first.source, second.source);
}
