// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task emitters.
//!
//! Each leaf task type has its own emitter that writes the statements of
//! the task's function body.

pub mod dataflow;
pub mod expression;
pub mod mail;
pub mod script;
pub mod sql;

use dessist_dtsx::{NodeId, ObjectTree};

use super::context::{DiagnosticKind, EmitContext, ProgramVariable};
use super::expressions::translate;
use super::writer::{SourceBuilder, UNTRANSLATED_MARKER, verbatim};
use crate::package::PackageLayout;

/// Leaf executable kinds with a dedicated emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Execute SQL task.
    ExecuteSql,
    /// Script task.
    Script,
    /// Send Mail task.
    SendMail,
    /// Expression task.
    Expression,
    /// Data flow (pipeline) task.
    DataFlow,
    /// Any other task, carrying its executable type.
    Unknown(String),
}

impl TaskKind {
    /// Classify an executable type string (`ExecutableType` / `CreationName`).
    pub fn from_executable_type(executable_type: &str) -> Self {
        let lower = executable_type.to_ascii_lowercase();
        if lower.contains("executesqltask") {
            Self::ExecuteSql
        } else if lower.contains("scripttask") {
            Self::Script
        } else if lower.contains("sendmailtask") {
            Self::SendMail
        } else if lower.contains("expressiontask") {
            Self::Expression
        } else if lower.contains("pipeline") {
            Self::DataFlow
        } else {
            Self::Unknown(executable_type.to_string())
        }
    }
}

/// Everything a task emitter needs about the task being emitted.
pub struct TaskSite<'a> {
    /// The tree being emitted.
    pub tree: &'a ObjectTree,
    /// The task's executable node.
    pub id: NodeId,
    /// Indentation of the function body.
    pub indent: &'a str,
    /// Variables passed into the function.
    pub scope: &'a [ProgramVariable],
    /// Name of the function being emitted.
    pub function: &'a str,
}

/// Trait for emitting a task's function body.
pub trait TaskEmitter {
    /// Append the body statements for `site` to `out`.
    fn emit(&self, site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext);
}

impl TaskEmitter for TaskKind {
    fn emit(&self, site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
        match self {
            TaskKind::ExecuteSql => sql::emit(site, out, ctx),
            TaskKind::Script => script::emit(site, out, ctx),
            TaskKind::SendMail => mail::emit(site, out, ctx),
            TaskKind::Expression => expression::emit(site, out, ctx),
            TaskKind::DataFlow => dataflow::emit(site, out, ctx),
            TaskKind::Unknown(executable_type) => {
                let message = format!("task type '{}' has no translation", executable_type);
                ctx.report(
                    site.tree,
                    site.id,
                    DiagnosticKind::UntranslatedConstruct,
                    message.clone(),
                );
                out.untranslated(site.indent, &message);
                out.line(
                    site.indent,
                    format!(
                        "throw new NotImplementedException({});",
                        verbatim(&format!("{} is not translated", site.function))
                    ),
                );
            }
        }
    }
}

/// Get the display string for a task kind.
pub fn task_type_str(kind: &TaskKind) -> &str {
    match kind {
        TaskKind::ExecuteSql => "ExecuteSql",
        TaskKind::Script => "Script",
        TaskKind::SendMail => "SendMail",
        TaskKind::Expression => "Expression",
        TaskKind::DataFlow => "DataFlow",
        TaskKind::Unknown(executable_type) => executable_type,
    }
}

/// C# value of a task setting.
///
/// A property expression on the executable wins and is translated; when it
/// cannot be, an untranslated marker is written and the static setting from
/// `data` (the task's object-data element) is used instead.
pub fn setting(
    site: &TaskSite<'_>,
    data: Option<NodeId>,
    data_key: &str,
    expression_key: &str,
    out: &mut SourceBuilder,
    ctx: &mut EmitContext,
) -> Option<String> {
    setting_with(site, data, data_key, expression_key, out, ctx, str::to_string)
}

/// [`setting`], passing the static text through `rewrite` before quoting.
pub fn setting_with(
    site: &TaskSite<'_>,
    data: Option<NodeId>,
    data_key: &str,
    expression_key: &str,
    out: &mut SourceBuilder,
    ctx: &mut EmitContext,
    rewrite: impl Fn(&str) -> String,
) -> Option<String> {
    let node = site.tree.node(site.id);
    if node.is_expression(expression_key)
        && let Some(expression) = node.properties.get(expression_key)
    {
        match translate(expression, site.tree, site.id) {
            Ok(code) => return Some(code),
            Err(err) => {
                ctx.report(
                    site.tree,
                    site.id,
                    DiagnosticKind::UntranslatedConstruct,
                    err.to_string(),
                );
                out.comment(
                    site.indent,
                    &format!(
                        "{} EXPRESSION ({}): {}",
                        UNTRANSLATED_MARKER,
                        expression_key,
                        one_line(expression)
                    ),
                );
            }
        }
    }

    static_setting(site.tree, site.id, data, data_key).map(|text| verbatim(&rewrite(text)))
}

/// Static setting text from the object-data element, or the executable itself.
pub fn static_setting<'a>(
    tree: &'a ObjectTree,
    id: NodeId,
    data: Option<NodeId>,
    key: &str,
) -> Option<&'a str> {
    if let Some(value) = data.and_then(|d| tree.node(d).lookup(key)) {
        return Some(value);
    }
    let node = tree.node(id);
    if node.is_expression(key) {
        return node.attribute_local(key);
    }
    node.lookup(key)
}

/// A connection manager resolved from a task's reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    /// Connection manager name.
    pub name: String,
    /// Raw connection string.
    pub connection_string: Option<String>,
}

/// Resolve a connection reference (DTSID or name) through the package's
/// connection managers.
pub fn resolve_connection(tree: &ObjectTree, reference: &str) -> Option<ResolvedConnection> {
    let reference = reference.trim();
    let layout = PackageLayout::from_tree(tree);

    layout
        .connections
        .iter()
        .copied()
        .find(|&id| {
            let node = tree.node(id);
            node.lookup("DTSID")
                .is_some_and(|dtsid| dtsid.eq_ignore_ascii_case(reference))
                || node.name.as_deref() == Some(reference)
        })
        .map(|id| {
            let connection_string = std::iter::once(id)
                .chain(tree.descendants(id))
                .find_map(|d| tree.node(d).lookup("ConnectionString"))
                .map(str::to_string);
            ResolvedConnection {
                name: tree.node(id).name.clone().unwrap_or_default(),
                connection_string,
            }
        })
}

/// Value of `key` in a `key=value;` connection string, case-insensitive.
pub fn connection_string_value<'a>(connection_string: &'a str, key: &str) -> Option<&'a str> {
    connection_string.split(';').find_map(|part| {
        let (k, v) = part.split_once('=')?;
        k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
    })
}

/// C# identifier for a `Namespace::Name` variable reference.
pub fn variable_ident(reference: &str) -> String {
    let name = reference.rsplit("::").next().unwrap_or(reference);
    EmitContext::variable_ident(name.trim_start_matches('@').trim_matches(['[', ']']))
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
