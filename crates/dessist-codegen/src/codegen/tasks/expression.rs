// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Expression task emitter.

use super::{TaskSite, static_setting};
use crate::codegen::context::{DiagnosticKind, EmitContext};
use crate::codegen::expressions::translate_statement;
use crate::codegen::writer::{SourceBuilder, UNTRANSLATED_MARKER};

const TASK_DATA: &str = "ExpressionTask";

/// Emit the body of an Expression task: its expression as one statement.
pub fn emit(site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
    let tree = site.tree;
    let data = tree.find_descendant_local(site.id, TASK_DATA);

    let Some(expression) = static_setting(tree, site.id, data, "Expression") else {
        let message = "expression task has no expression".to_string();
        out.untranslated(site.indent, &message);
        ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
        return;
    };

    match translate_statement(expression, tree, site.id) {
        Ok(code) => out.line(site.indent, format!("{};", code)),
        Err(err) => {
            out.comment(
                site.indent,
                &format!("{} EXPRESSION: {}", UNTRANSLATED_MARKER, err.expression),
            );
            ctx.report(
                tree,
                site.id,
                DiagnosticKind::UntranslatedConstruct,
                err.to_string(),
            );
        }
    }
}
