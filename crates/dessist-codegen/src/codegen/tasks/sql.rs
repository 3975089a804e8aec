// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execute SQL task emitter.
//!
//! Generates code that opens the task's connection and runs its statement.
//! Without result or parameter bindings the statement runs through SQL
//! Server Management Objects when enabled, so batches separated by `GO`
//! keep working. Otherwise a plain `SqlCommand` is used.

use dessist_dtsx::NodeId;

use super::{TaskSite, resolve_connection, setting_with, static_setting, variable_ident};
use crate::codegen::context::{DiagnosticKind, EmitContext};
use crate::codegen::expressions::translate;
use crate::codegen::variables::DYNAMIC_TYPE;
use crate::codegen::writer::{SourceBuilder, deeper, verbatim};

const TASK_DATA: &str = "SqlTaskData";
const RESULT_BINDING: &str = "ResultBinding";
const PARAMETER_BINDING: &str = "ParameterBinding";

/// Connection string keys that `SqlConnection` rejects.
const OLEDB_ONLY_KEYS: &[&str] = &["Provider", "Auto Translate"];

struct Binding {
    name: String,
    variable: String,
}

/// Emit the body of an Execute SQL task.
pub fn emit(site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
    let tree = site.tree;
    let indent = site.indent;
    let data = tree.find_descendant_local(site.id, TASK_DATA);

    let results = bindings(site, data, RESULT_BINDING, "ResultName");
    let parameters = bindings(site, data, PARAMETER_BINDING, "ParameterName");
    let positional =
        !parameters.is_empty() && parameters.iter().all(|p| is_positional(&p.name));

    let rewrite = |text: &str| {
        if positional {
            named_markers(text)
        } else {
            text.to_string()
        }
    };
    let statement = setting_with(
        site,
        data,
        "SqlStatementSource",
        "SqlStatementSource",
        out,
        ctx,
        rewrite,
    )
    .unwrap_or_else(|| {
        ctx.report(
            tree,
            site.id,
            DiagnosticKind::UntranslatedConstruct,
            "task has no SQL statement".to_string(),
        );
        out.untranslated(indent, "task has no SQL statement");
        verbatim("")
    });

    let node = tree.node(site.id);
    if positional
        && node.is_expression("SqlStatementSource")
        && node
            .properties
            .get("SqlStatementSource")
            .is_some_and(|expression| translate(expression, tree, site.id).is_ok())
    {
        let message = "'?' markers in an expression-built statement are not renamed".to_string();
        out.untranslated(indent, &message);
        ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
    }

    let connection_string = match static_setting(tree, site.id, data, "Connection") {
        Some(reference) => match resolve_connection(tree, reference) {
            Some(resolved) => resolved
                .connection_string
                .map(|cs| verbatim(&sql_connection_string(&cs)))
                .unwrap_or_else(|| {
                    let message =
                        format!("connection '{}' has no connection string", resolved.name);
                    unresolved(site, out, ctx, message)
                }),
            None => {
                let message = format!("connection '{}' not found in package", reference);
                unresolved(site, out, ctx, message)
            }
        },
        None => unresolved(site, out, ctx, "task has no connection".to_string()),
    };

    let timeout = data
        .and_then(|d| tree.node(d).lookup("TimeOut"))
        .and_then(|t| t.trim().parse::<u32>().ok())
        .filter(|&t| t > 0);

    out.line(indent, format!("string connstr = {};", connection_string));
    out.line(indent, format!("string sql = {};", statement));

    let inner = deeper(indent);
    if ctx.options.use_smo && results.is_empty() && parameters.is_empty() {
        out.line(indent, "using (SqlConnection conn = new SqlConnection(connstr))");
        out.line(indent, "{");
        out.line(&inner, "Server server = new Server(new ServerConnection(conn));");
        if let Some(timeout) = timeout {
            out.line(&inner, format!("server.ConnectionContext.StatementTimeout = {};", timeout));
        }
        out.line(&inner, "server.ConnectionContext.ExecuteNonQuery(sql);");
        out.line(indent, "}");
        return;
    }

    let command = deeper(&inner);
    out.line(indent, "using (SqlConnection conn = new SqlConnection(connstr))");
    out.line(indent, "{");
    out.line(&inner, "conn.Open();");
    out.line(&inner, "using (SqlCommand cmd = new SqlCommand(sql, conn))");
    out.line(&inner, "{");
    if let Some(timeout) = timeout {
        out.line(&command, format!("cmd.CommandTimeout = {};", timeout));
    }
    for parameter in &parameters {
        out.line(
            &command,
            format!(
                "cmd.Parameters.AddWithValue({}, {});",
                verbatim(&parameter_name(&parameter.name)),
                parameter.variable
            ),
        );
    }

    if results.is_empty() {
        out.line(&command, "cmd.ExecuteNonQuery();");
    } else {
        let row = deeper(&command);
        let assign = deeper(&row);
        out.line(&command, "using (SqlDataReader dr = cmd.ExecuteReader())");
        out.line(&command, "{");
        out.line(&row, "if (dr.Read())");
        out.line(&row, "{");
        for result in &results {
            let column = match result.name.trim().parse::<usize>() {
                Ok(index) => index.to_string(),
                Err(_) => verbatim(&result.name),
            };
            let cast = ctx
                .find_variable(site.scope, &result.variable)
                .map(|v| v.type_name.clone())
                .filter(|t| t != DYNAMIC_TYPE)
                .map(|t| format!("({})", t))
                .unwrap_or_default();
            out.line(
                &assign,
                format!("{} = {}dr[{}];", result.variable, cast, column),
            );
        }
        out.line(&row, "}");
        out.line(&command, "}");
    }
    out.line(&inner, "}");
    out.line(indent, "}");
}

fn unresolved(
    site: &TaskSite<'_>,
    out: &mut SourceBuilder,
    ctx: &mut EmitContext,
    message: String,
) -> String {
    out.untranslated(site.indent, &message);
    ctx.report(
        site.tree,
        site.id,
        DiagnosticKind::UntranslatedConstruct,
        message,
    );
    verbatim("")
}

fn bindings(site: &TaskSite<'_>, data: Option<NodeId>, kind: &str, name_key: &str) -> Vec<Binding> {
    let Some(data) = data else {
        return Vec::new();
    };
    site.tree
        .children(data)
        .filter(|(_, node)| node.local_kind() == kind)
        .filter_map(|(_, node)| {
            Some(Binding {
                name: node.lookup(name_key)?.to_string(),
                variable: variable_ident(node.lookup("DtsVariableName")?),
            })
        })
        .collect()
}

/// OLE DB bindings name their `?` marker by ordinal.
fn is_positional(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// Named parameter for a binding; positional OLE DB bindings become `@p<N>`.
fn parameter_name(name: &str) -> String {
    let name = name.trim();
    if is_positional(name) {
        format!("@p{}", name)
    } else if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

/// Rename the `?` markers of a statement to `@p0`, `@p1`, ... in order.
///
/// Markers inside string literals, quoted identifiers and comments are
/// left alone.
fn named_markers(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut ordinal = 0;

    while let Some(c) = chars.next() {
        if c == '?' {
            out.push_str(&format!("@p{}", ordinal));
            ordinal += 1;
            continue;
        }
        out.push(c);
        let close = match c {
            '\'' | '"' => c,
            '[' => ']',
            '-' if chars.peek() == Some(&'-') => '\n',
            '/' if chars.peek() == Some(&'*') => {
                // block comment: copy through the closing `*/`
                if let Some(star) = chars.next() {
                    out.push(star);
                }
                let mut previous = '\0';
                for d in chars.by_ref() {
                    out.push(d);
                    if previous == '*' && d == '/' {
                        break;
                    }
                    previous = d;
                }
                continue;
            }
            _ => continue,
        };
        for d in chars.by_ref() {
            out.push(d);
            if d == close {
                break;
            }
        }
    }
    out
}

/// Drop the OLE DB keys from a connection string.
pub fn sql_connection_string(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| {
            let key = part.split_once('=').map(|(k, _)| k.trim()).unwrap_or(*part);
            !OLEDB_ONLY_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
        })
        .map(|part| format!("{};", part))
        .collect()
}
