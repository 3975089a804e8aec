// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Script task emitter.
//!
//! The task's embedded project files are captured on the context so the
//! driver can write them next to the program; the generated body creates
//! the script's `ScriptMain` class and invokes its entry point.

use super::TaskSite;
use crate::codegen::context::{DiagnosticKind, EmitContext, ScriptSource};
use crate::codegen::writer::SourceBuilder;

const SCRIPT_PROJECT: &str = "ScriptProject";
const PROJECT_ITEM: &str = "ProjectItem";
const ENTRY_FILE: &str = "ScriptMain";

/// Emit the body of a Script task.
pub fn emit(site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
    let tree = site.tree;
    let Some(project) = tree.find_descendant_local(site.id, SCRIPT_PROJECT) else {
        let message = "script task has no embedded project".to_string();
        out.untranslated(site.indent, &message);
        ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
        return;
    };

    let language = tree
        .node(project)
        .lookup("Language")
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mut namespace = None;
    let mut captured = 0;
    for item in tree.descendants(project) {
        let node = tree.node(item);
        if node.local_kind() != PROJECT_ITEM {
            continue;
        }
        let (Some(file_name), Some(text)) = (node.lookup("Name"), node.content.as_deref()) else {
            continue;
        };
        if !is_source_file(file_name) {
            continue;
        }
        if namespace.is_none() && file_stem(file_name).eq_ignore_ascii_case(ENTRY_FILE) {
            namespace = find_namespace(text);
        }
        ctx.add_script(ScriptSource {
            function: site.function.to_string(),
            file_name: file_name.to_string(),
            text: text.to_string(),
        });
        captured += 1;
    }

    if captured == 0 {
        let message = "script project contains no source files".to_string();
        out.untranslated(site.indent, &message);
        ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
        return;
    }

    if language.contains("basic") || language == "vb" {
        let message = "Visual Basic script captured but not callable from C#".to_string();
        out.untranslated(site.indent, &message);
        ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
        return;
    }

    out.comment(
        site.indent,
        &format!("Script sources: scripts/{}/", site.function),
    );
    let class = match namespace {
        Some(ns) => format!("{}.{}", ns, ENTRY_FILE),
        None => ENTRY_FILE.to_string(),
    };
    out.line(site.indent, format!("{} script = new {}();", class, class));
    out.line(site.indent, "script.Main();");
}

fn is_source_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".cs") || lower.ends_with(".vb")
}

fn file_stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

/// Namespace declared by a C# source file.
fn find_namespace(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("namespace ")?;
        let name = rest.trim().trim_end_matches(['{', ';']).trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitOptions;
    use dessist_dtsx::{IngestOptions, NodeId, ObjectTree, ingest};

    fn task(project: &str) -> (ObjectTree, NodeId) {
        let xml = format!(
            r#"<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts" DTS:ObjectName="Script">
                 <DTS:ObjectData>{project}</DTS:ObjectData>
               </DTS:Executable>"#
        );
        let tree = ingest(&xml, &IngestOptions::default()).unwrap();
        let root = tree.root();
        (tree, root)
    }

    fn render(tree: &ObjectTree, id: NodeId) -> (String, EmitContext) {
        let mut ctx = EmitContext::new(EmitOptions::default());
        let mut out = SourceBuilder::new();
        let site = TaskSite {
            tree,
            id,
            indent: "",
            scope: &[],
            function: "Script",
        };
        emit(&site, &mut out, &mut ctx);
        (out.finish(), ctx)
    }

    #[test]
    fn test_find_namespace() {
        assert_eq!(
            find_namespace("using System;\nnamespace ST_1234.csproj\n{"),
            Some("ST_1234.csproj".to_string())
        );
        assert_eq!(find_namespace("namespace Foo;"), Some("Foo".to_string()));
        assert_eq!(find_namespace("class X {}"), None);
    }

    #[test]
    fn test_captures_sources_and_calls_main() {
        let (tree, id) = task(
            r#"<ScriptProject Name="ST_1" Language="CSharp">
                 <ProjectItem Name="ScriptMain.cs"><![CDATA[namespace ST_1.csproj
{
    public partial class ScriptMain { public void Main() {} }
}]]></ProjectItem>
                 <ProjectItem Name="Properties\AssemblyInfo.cs"><![CDATA[// info]]></ProjectItem>
                 <ProjectItem Name="ST_1.csproj"><![CDATA[<Project/>]]></ProjectItem>
               </ScriptProject>"#,
        );
        let (code, ctx) = render(&tree, id);

        assert_eq!(ctx.scripts().len(), 2);
        assert_eq!(ctx.scripts()[0].file_name, "ScriptMain.cs");
        assert!(code.contains("ST_1.csproj.ScriptMain script = new ST_1.csproj.ScriptMain();"));
        assert!(code.contains("script.Main();"));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_visual_basic_is_untranslated() {
        let (tree, id) = task(
            r#"<ScriptProject Name="ST_2" Language="VisualBasic">
                 <ProjectItem Name="ScriptMain.vb"><![CDATA[Public Class ScriptMain
End Class]]></ProjectItem>
               </ScriptProject>"#,
        );
        let (code, ctx) = render(&tree, id);

        assert_eq!(ctx.scripts().len(), 1);
        assert!(code.contains("UNTRANSLATED"));
        assert_eq!(ctx.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_project_is_untranslated() {
        let (tree, id) = task("");
        let (code, ctx) = render(&tree, id);
        assert!(code.contains("UNTRANSLATED: script task has no embedded project"));
        assert_eq!(ctx.diagnostics().len(), 1);
    }
}
