// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Data flow task emitter.
//!
//! Pipelines are not translated. The placeholder lists the pipeline's
//! components in document order so the reader knows what to rebuild.

use super::TaskSite;
use crate::codegen::context::{DiagnosticKind, EmitContext};
use crate::codegen::writer::SourceBuilder;

const COMPONENT: &str = "component";

/// Emit the placeholder body of a Data Flow task.
pub fn emit(site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
    let tree = site.tree;
    let components: Vec<String> = tree
        .descendants(site.id)
        .into_iter()
        .map(|id| tree.node(id))
        .filter(|node| node.local_kind() == COMPONENT)
        .map(|node| {
            let name = node.lookup("name").unwrap_or("unnamed");
            match node.lookup("componentClassID") {
                Some(class) => format!("{} ({})", name, class),
                None => name.to_string(),
            }
        })
        .collect();

    let message = format!("data flow with {} component(s)", components.len());
    out.untranslated(site.indent, &message);
    for component in &components {
        out.comment(site.indent, &format!("  - {}", component));
    }
    ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitOptions;
    use dessist_dtsx::{IngestOptions, ingest};

    #[test]
    fn test_lists_components() {
        let xml = r#"<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts" DTS:ObjectName="Flow">
                       <DTS:ObjectData>
                         <pipeline>
                           <components>
                             <component name="Source" componentClassID="{OLEDBSource}"/>
                             <component name="Destination"/>
                           </components>
                         </pipeline>
                       </DTS:ObjectData>
                     </DTS:Executable>"#;
        let tree = ingest(xml, &IngestOptions::default()).unwrap();
        let mut ctx = EmitContext::new(EmitOptions::default());
        let mut out = SourceBuilder::new();
        let site = TaskSite {
            tree: &tree,
            id: tree.root(),
            indent: "",
            scope: &[],
            function: "Flow",
        };
        emit(&site, &mut out, &mut ctx);

        assert_eq!(
            out.finish(),
            "// UNTRANSLATED: data flow with 2 component(s)\n\
             //   - Source ({OLEDBSource})\n\
             //   - Destination\n"
        );
        assert_eq!(ctx.diagnostics().len(), 1);
    }
}
