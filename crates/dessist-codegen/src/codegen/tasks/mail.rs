// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Send Mail task emitter.

use super::{TaskSite, connection_string_value, resolve_connection, setting, static_setting};
use crate::codegen::context::{DiagnosticKind, EmitContext};
use crate::codegen::writer::{SourceBuilder, verbatim};

const TASK_DATA: &str = "SendMailTaskData";

/// Emit the body of a Send Mail task.
pub fn emit(site: &TaskSite<'_>, out: &mut SourceBuilder, ctx: &mut EmitContext) {
    let tree = site.tree;
    let indent = site.indent;
    let data = tree.find_descendant_local(site.id, TASK_DATA);

    let from = setting(site, data, "From", "FromLine", out, ctx);
    let to = setting(site, data, "To", "ToLine", out, ctx);
    let cc = setting(site, data, "CC", "CCLine", out, ctx);
    let bcc = setting(site, data, "BCC", "BCCLine", out, ctx);
    let subject = setting(site, data, "Subject", "Subject", out, ctx);
    let body = setting(site, data, "MessageSource", "MessageSource", out, ctx);

    let host = static_setting(tree, site.id, data, "SMTPServer").and_then(|reference| {
        let resolved = resolve_connection(tree, reference)?;
        let connection_string = resolved.connection_string?;
        connection_string_value(&connection_string, "SmtpServer").map(str::to_string)
    });

    out.line(indent, "MailMessage message = new MailMessage();");
    match from {
        Some(from) => out.line(indent, format!("message.From = new MailAddress({});", from)),
        None => {
            let message = "mail task has no sender".to_string();
            out.untranslated(indent, &message);
            ctx.report(tree, site.id, DiagnosticKind::UntranslatedConstruct, message);
        }
    }
    for (collection, value) in [("To", to), ("CC", cc), ("Bcc", bcc)] {
        if let Some(value) = value {
            out.line(
                indent,
                format!("message.{}.Add(({}).Replace(';', ','));", collection, value),
            );
        }
    }
    if let Some(subject) = subject {
        out.line(indent, format!("message.Subject = {};", subject));
    }
    if let Some(body) = body {
        out.line(indent, format!("message.Body = {};", body));
    }

    match host {
        Some(host) => out.line(
            indent,
            format!("SmtpClient client = new SmtpClient({});", verbatim(&host)),
        ),
        None => {
            out.comment(indent, "SMTP host taken from the application configuration");
            out.line(indent, "SmtpClient client = new SmtpClient();");
        }
    }
    out.line(indent, "client.Send(message);");
}
