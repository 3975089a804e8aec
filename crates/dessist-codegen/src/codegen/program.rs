// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Program assembly: templates around the global variables and functions.

use std::collections::BTreeMap;

use dessist_dtsx::{IngestWarning, ObjectTree};
use serde::Serialize;
use tracing::{debug, info};

use super::CodegenError;
use super::context::{Diagnostic, EmitContext, ScriptSource};
use super::functions::emit_function;
use super::variables::{emit_variable, variable_declaration};
use crate::config::SqlCompatibility;
use crate::package::PackageLayout;
use crate::templates::{TemplateKey, TemplateRenderer};

/// Indentation of class members in the generated program.
pub const MEMBER_INDENT: &str = "        ";

/// A generated program.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramOutput {
    /// Full `program.cs` text.
    pub source: String,
    /// Function called from `Main`.
    pub entry_point: String,
    /// Non-fatal problems found during emission.
    pub diagnostics: Vec<Diagnostic>,
    /// Script task sources to write next to the program.
    pub scripts: Vec<ScriptSource>,
    /// Problems found while ingesting the package.
    pub ingest_warnings: Vec<IngestWarning>,
    /// Number of functions emitted.
    pub function_count: usize,
    /// Number of global variables emitted.
    pub variable_count: usize,
}

/// Emit the whole program for a package.
///
/// Fails with [`CodegenError::EmptyExecutableSet`] before producing any text
/// when the package has no top-level executables.
pub fn emit_program(
    tree: &ObjectTree,
    layout: &PackageLayout,
    project_name: &str,
    templates: &dyn TemplateRenderer,
    mut ctx: EmitContext,
) -> Result<ProgramOutput, CodegenError> {
    let Some(&entry) = layout.executables.first() else {
        return Err(CodegenError::EmptyExecutableSet);
    };

    // Globals and then the entry point claim their names before anything
    // nested can.
    ctx.declare_globals(
        layout
            .variables
            .iter()
            .map(|&v| variable_declaration(tree, v))
            .collect(),
    );
    let entry_point = ctx.function_name(tree, entry);
    debug!(entry_point = %entry_point, executables = layout.executables.len(), "Emitting program");

    let empty = BTreeMap::new();

    let sql_smo_using = if ctx.options.use_smo {
        templates.render(TemplateKey::SqlSmoUsing, &empty)?
    } else {
        String::new()
    };
    let table_param_static = match ctx.options.sql_mode {
        SqlCompatibility::Sql2008 => templates.render(TemplateKey::TableParamStatic, &empty)?,
        SqlCompatibility::Sql2005 => String::new(),
    };

    let package_name = tree
        .node(tree.root())
        .name
        .clone()
        .unwrap_or_else(|| project_name.to_string());
    let header_vars = BTreeMap::from([
        ("package_name", package_name),
        ("namespace", EmitContext::sanitize_ident(project_name)),
        ("sql_smo_using", sql_smo_using),
        ("table_param_static", table_param_static),
        ("main_function", entry_point.clone()),
    ]);

    let mut source = templates.render(TemplateKey::ProgramHeader, &header_vars)?;

    source.push_str(MEMBER_INDENT);
    source.push_str("#region Global Variables\n");
    for &variable in &layout.variables {
        source.push_str(&emit_variable(tree, variable, MEMBER_INDENT, true));
    }
    source.push_str(MEMBER_INDENT);
    source.push_str("#endregion\n\n\n");

    source.push_str(MEMBER_INDENT);
    source.push_str("#region SSIS Code\n");
    for &executable in &layout.executables {
        source.push_str(&emit_function(tree, executable, MEMBER_INDENT, &[], &mut ctx));
    }
    source.push_str(MEMBER_INDENT);
    source.push_str("#endregion\n");

    source.push_str(&templates.render(TemplateKey::ProgramFooter, &empty)?);

    let function_count = ctx.function_count();
    let (diagnostics, scripts) = ctx.into_parts();

    info!(
        entry_point = %entry_point,
        functions = function_count,
        variables = layout.variables.len(),
        diagnostics = diagnostics.len(),
        "Program emitted"
    );

    Ok(ProgramOutput {
        source,
        entry_point,
        diagnostics,
        scripts,
        ingest_warnings: tree.warnings.clone(),
        function_count,
        variable_count: layout.variables.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitOptions;
    use crate::templates::BuiltinTemplates;
    use dessist_dtsx::{IngestOptions, ingest};

    const NS: &str = r#"xmlns:DTS="www.microsoft.com/SqlServer/Dts""#;

    fn program(xml: &str, options: EmitOptions) -> Result<ProgramOutput, CodegenError> {
        let tree = ingest(xml, &IngestOptions::default()).unwrap();
        let layout = PackageLayout::from_tree(&tree);
        let templates = BuiltinTemplates::new().unwrap();
        emit_program(&tree, &layout, "Nightly", &templates, EmitContext::new(options))
    }

    #[test]
    fn test_empty_executable_set() {
        let xml = format!(r#"<DTS:Executable {NS}><DTS:Variable DTS:ObjectName="x"/></DTS:Executable>"#);
        let err = program(&xml, EmitOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::EmptyExecutableSet));
    }

    #[test]
    fn test_program_layout() {
        let xml = format!(
            r#"<DTS:Executable {NS} DTS:ObjectName="Nightly Load">
                 <DTS:Variable DTS:ObjectName="Count"><DTS:VariableValue DTS:DataType="3">1</DTS:VariableValue></DTS:Variable>
                 <DTS:Executable DTS:ExecutableType="Microsoft.ExpressionTask" DTS:ObjectName="First">
                   <DTS:ObjectData><ExpressionTask Expression="@Count = 2"/></DTS:ObjectData>
                 </DTS:Executable>
                 <DTS:Executable DTS:ExecutableType="Microsoft.ExpressionTask" DTS:ObjectName="Second">
                   <DTS:ObjectData><ExpressionTask Expression="@Count = 3"/></DTS:ObjectData>
                 </DTS:Executable>
               </DTS:Executable>"#
        );
        let output = program(&xml, EmitOptions::default()).unwrap();
        let source = &output.source;

        assert_eq!(output.entry_point, "First");
        assert_eq!(output.function_count, 2);
        assert_eq!(output.variable_count, 1);
        assert!(source.starts_with("// Generated from SSIS package Nightly Load\n"));
        assert!(source.contains("namespace Nightly\n"));
        assert!(source.contains("            First();\n"));
        assert!(source.contains("using Microsoft.SqlServer.Management.Smo;"));
        assert!(source.contains("#region Table Parameter Helpers"));
        assert!(source.contains(
            "        #region Global Variables\n        public static int Count = 1;\n        #endregion\n\n\n"
        ));

        let globals = source.find("#region Global Variables").unwrap();
        let code = source.find("#region SSIS Code").unwrap();
        let first = source.find("public static void First()").unwrap();
        let second = source.find("public static void Second()").unwrap();
        assert!(globals < code && code < first && first < second);
        assert!(source.ends_with("        #endregion\n    }\n}\n"));
    }

    #[test]
    fn test_sql2005_without_smo() {
        let xml = format!(
            r#"<DTS:Executable {NS}>
                 <DTS:Executable DTS:ExecutableType="Microsoft.ExpressionTask" DTS:ObjectName="Only"/>
               </DTS:Executable>"#
        );
        let options = EmitOptions {
            sql_mode: SqlCompatibility::Sql2005,
            use_smo: false,
        };
        let output = program(&xml, options).unwrap();

        assert!(!output.source.contains("Management.Smo"));
        assert!(!output.source.contains("Table Parameter Helpers"));
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn test_entry_point_claims_name_first() {
        let xml = format!(
            r#"<DTS:Executable {NS}>
                 <DTS:Executable DTS:ExecutableType="STOCK:SEQUENCE" DTS:ObjectName="Step">
                   <DTS:Executable DTS:ExecutableType="Microsoft.ExpressionTask" DTS:ObjectName="Step"/>
                 </DTS:Executable>
               </DTS:Executable>"#
        );
        let output = program(&xml, EmitOptions::default()).unwrap();

        assert_eq!(output.entry_point, "Step");
        assert!(output.source.contains("            Step2();\n"));
        assert!(output.source.contains("public static void Step2()"));
    }

    #[test]
    fn test_function_avoids_global_variable_name() {
        let xml = format!(
            r#"<DTS:Executable {NS}>
                 <DTS:Variable DTS:ObjectName="Load"><DTS:VariableValue DTS:DataType="3">1</DTS:VariableValue></DTS:Variable>
                 <DTS:Executable DTS:ExecutableType="Microsoft.ExpressionTask" DTS:ObjectName="Load">
                   <DTS:ObjectData><ExpressionTask Expression="@Load = 2"/></DTS:ObjectData>
                 </DTS:Executable>
               </DTS:Executable>"#
        );
        let output = program(&xml, EmitOptions::default()).unwrap();
        let source = &output.source;

        assert_eq!(output.entry_point, "Load2");
        assert!(source.contains("        public static int Load = 1;\n"));
        assert!(source.contains("            Load2();\n"));
        assert!(source.contains("public static void Load2()"));
        assert!(source.contains("            Load = 2;\n"));
        assert!(!source.contains("public static void Load()"));
    }
}
