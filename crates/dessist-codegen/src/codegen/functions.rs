// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Function emission for executables.
//!
//! Every executable becomes one `public static void` method. Containers
//! declare their own variables as locals and call each child executable in
//! document order, passing every variable in scope by `ref`. The children's
//! methods follow the container's method in the output.

use dessist_dtsx::{NodeId, ObjectTree};
use tracing::debug;

use super::context::{DiagnosticKind, EmitContext, ProgramVariable, node_label};
use super::expressions::translate;
use super::tasks::{TaskEmitter, TaskKind, TaskSite, task_type_str};
use super::variables::variable_declaration;
use super::writer::{SourceBuilder, UNTRANSLATED_MARKER, deeper, doc_text};
use crate::package::{EXECUTABLE, executable_children, variable_children};

/// What an executable node turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableKind {
    /// A nested package.
    Package,
    /// `STOCK:SEQUENCE`.
    Sequence,
    /// `STOCK:FORLOOP`.
    ForLoop,
    /// `STOCK:FOREACHLOOP`.
    ForEachLoop,
    /// A leaf task.
    Task(TaskKind),
}

impl ExecutableKind {
    /// Classify a node; `None` when it is not an executable.
    pub fn of(tree: &ObjectTree, id: NodeId) -> Option<Self> {
        let node = tree.node(id);
        if node.kind != EXECUTABLE {
            return None;
        }

        let executable_type = node
            .lookup("ExecutableType")
            .or_else(|| node.lookup("CreationName"))
            .unwrap_or_default()
            .trim();

        let kind = match executable_type.to_ascii_uppercase().as_str() {
            "STOCK:SEQUENCE" => Self::Sequence,
            "STOCK:FORLOOP" => Self::ForLoop,
            "STOCK:FOREACHLOOP" => Self::ForEachLoop,
            "" if node.parent.is_none() => Self::Package,
            upper if upper.contains("PACKAGE") && !upper.contains("TASK") => Self::Package,
            _ => Self::Task(TaskKind::from_executable_type(executable_type)),
        };
        Some(kind)
    }
}

/// Emit the method for an executable, followed by the methods of any
/// executables it contains.
///
/// `scope` lists the variables the caller passes by `ref`; they become the
/// method's parameters in order. Nodes that are not executables and task
/// types without a translation produce a placeholder method and a
/// diagnostic; emission never fails.
pub fn emit_function(
    tree: &ObjectTree,
    id: NodeId,
    indent: &str,
    scope: &[ProgramVariable],
    ctx: &mut EmitContext,
) -> String {
    let name = ctx.function_name(tree, id);
    let body_indent = deeper(indent);
    let kind = ExecutableKind::of(tree, id);

    debug!(function = %name, kind = ?kind, "Emitting function");

    let mut out = SourceBuilder::new();
    write_header(tree, id, indent, &name, scope, &mut out);
    out.line(indent, "{");

    let mut nested = Vec::new();
    match &kind {
        None => {
            let message = format!("{} is not an executable", node_label(tree, id));
            out.untranslated(&body_indent, &message);
            ctx.report(tree, id, DiagnosticKind::UnrecognizedNode, message);
        }
        Some(ExecutableKind::Task(task)) => {
            debug!(function = %name, task = task_type_str(task), "Emitting task body");
            let site = TaskSite {
                tree,
                id,
                indent: &body_indent,
                scope,
                function: &name,
            };
            task.emit(&site, &mut out, ctx);
        }
        Some(container) => {
            nested = emit_container_body(tree, id, container, &body_indent, scope, &mut out, ctx);
        }
    }

    out.line(indent, "}");
    out.blank();

    let mut text = out.finish();
    for (child, child_scope) in nested {
        text.push_str(&emit_function(tree, child, indent, &child_scope, ctx));
    }
    text
}

fn write_header(
    tree: &ObjectTree,
    id: NodeId,
    indent: &str,
    name: &str,
    scope: &[ProgramVariable],
    out: &mut SourceBuilder,
) {
    let node = tree.node(id);
    out.line(indent, "/// <summary>");
    out.line(indent, format!("/// {}", doc_text(&node_label(tree, id))));
    if let Some(description) = node.lookup("Description").filter(|d| !d.trim().is_empty()) {
        out.line(indent, format!("/// {}", doc_text(description)));
    }
    out.line(indent, "/// </summary>");

    let params = scope
        .iter()
        .map(|v| format!("ref {} {}", v.type_name, v.name))
        .collect::<Vec<_>>()
        .join(", ");
    out.line(indent, format!("public static void {}({})", name, params));
}

/// Write a container's locals and child calls. Returns the children to emit
/// next, each with the scope its method receives.
fn emit_container_body(
    tree: &ObjectTree,
    id: NodeId,
    kind: &ExecutableKind,
    indent: &str,
    scope: &[ProgramVariable],
    out: &mut SourceBuilder,
    ctx: &mut EmitContext,
) -> Vec<(NodeId, Vec<ProgramVariable>)> {
    let mut inner_scope = scope.to_vec();
    for variable in variable_children(tree, id) {
        let declared = variable_declaration(tree, variable);
        if let Some(outer) = inner_scope.iter_mut().find(|v| v.name == declared.name) {
            // a local cannot shadow a parameter in C#
            out.line(indent, format!("{} = {};", declared.name, declared.initializer));
            *outer = declared;
        } else {
            out.line(
                indent,
                format!(
                    "{} {} = {};",
                    declared.type_name, declared.name, declared.initializer
                ),
            );
            inner_scope.push(declared);
        }
    }

    // a call to a child is hidden by a variable of the same name
    for variable in &inner_scope {
        ctx.reserve_name(&variable.name);
    }

    let children = executable_children(tree, id);
    if children.is_empty() {
        if *kind == ExecutableKind::ForLoop {
            // the loop expressions may still update variables
            write_for_loop(tree, id, indent, out, ctx);
            out.comment(&deeper(indent), "No executables");
            out.line(indent, "}");
        } else {
            out.comment(indent, "No executables");
        }
        return Vec::new();
    }

    let call_indent = match kind {
        ExecutableKind::ForLoop => {
            write_for_loop(tree, id, indent, out, ctx);
            deeper(indent)
        }
        ExecutableKind::ForEachLoop => {
            let enumerator = tree
                .find_descendant_local(id, "ForEachEnumerator")
                .and_then(|e| tree.node(e).lookup("CreationName"))
                .unwrap_or("unknown");
            let message = format!("for-each enumerator '{}'", enumerator);
            out.untranslated(indent, &format!("{}; the loop body runs once", message));
            ctx.report(tree, id, DiagnosticKind::UntranslatedConstruct, message);
            out.line(indent, "foreach (object item in new object[] { null })");
            out.line(indent, "{");
            deeper(indent)
        }
        _ => indent.to_string(),
    };

    let args = inner_scope
        .iter()
        .map(|v| format!("ref {}", v.name))
        .collect::<Vec<_>>()
        .join(", ");
    for &child in &children {
        let child_name = ctx.function_name(tree, child);
        out.line(&call_indent, format!("{}({});", child_name, args));
    }

    if matches!(kind, ExecutableKind::ForLoop | ExecutableKind::ForEachLoop) {
        out.line(indent, "}");
    }

    children
        .into_iter()
        .map(|child| (child, inner_scope.clone()))
        .collect()
}

fn write_for_loop(
    tree: &ObjectTree,
    id: NodeId,
    indent: &str,
    out: &mut SourceBuilder,
    ctx: &mut EmitContext,
) {
    let mut part = |key: &str, fallback: &str| -> String {
        let Some(expression) = tree.node(id).lookup(key).filter(|e| !e.trim().is_empty()) else {
            return fallback.to_string();
        };
        match translate(expression, tree, id) {
            Ok(code) => code,
            Err(err) => {
                out.comment(
                    indent,
                    &format!("{} EXPRESSION ({}): {}", UNTRANSLATED_MARKER, key, err.expression),
                );
                ctx.report(tree, id, DiagnosticKind::UntranslatedConstruct, err.to_string());
                fallback.to_string()
            }
        }
    };

    let init = part("InitExpression", "");
    let eval = part("EvalExpression", "false");
    let assign = part("AssignExpression", "");
    out.line(indent, format!("for ({}; {}; {})", init, eval, assign));
    out.line(indent, "{");
}
