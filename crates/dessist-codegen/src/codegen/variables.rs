// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Variable declaration emission.
//!
//! A variable's type code and default value are read from its properties,
//! its attributes, or its `DTS:VariableValue` child, whichever carries them.

use dessist_dtsx::{NodeId, ObjectTree};

use super::context::{EmitContext, ProgramVariable};
use super::writer::verbatim;
use crate::package::VARIABLE_VALUE;

/// Type used when a variable's type code is missing or unknown.
pub const DYNAMIC_TYPE: &str = "dynamic";

/// C# type for an SSIS variable type code.
pub fn csharp_type(code: Option<&str>) -> &'static str {
    match code.map(str::trim) {
        Some("2") => "short",
        Some("3") => "int",
        Some("4") => "float",
        Some("5") => "double",
        Some("6") | Some("14") => "decimal",
        Some("7") => "DateTime",
        Some("8") => "string",
        Some("11") => "bool",
        Some("13") => "object",
        Some("16") => "sbyte",
        Some("17") => "byte",
        Some("18") => "ushort",
        Some("19") => "uint",
        Some("20") => "long",
        Some("21") => "ulong",
        Some("72") => "Guid",
        _ => DYNAMIC_TYPE,
    }
}

/// C# literal of `type_name` for a stored value.
///
/// Values that do not parse as the declared type become `default(T)`.
pub fn literal(type_name: &str, raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).filter(|v| !v.is_empty());
    match type_name {
        "string" => verbatim(raw.unwrap_or("")),
        "bool" => match trimmed.map(str::to_ascii_lowercase).as_deref() {
            Some("true") | Some("-1") | Some("1") => "true".to_string(),
            _ => "false".to_string(),
        },
        "sbyte" => integer_literal(type_name, trimmed, i8::MIN.into(), i8::MAX.into()),
        "short" => integer_literal(type_name, trimmed, i16::MIN.into(), i16::MAX.into()),
        "int" => integer_literal(type_name, trimmed, i32::MIN.into(), i32::MAX.into()),
        "long" => integer_literal(type_name, trimmed, i64::MIN.into(), i64::MAX.into()),
        "byte" => integer_literal(type_name, trimmed, 0, u8::MAX.into()),
        "ushort" => integer_literal(type_name, trimmed, 0, u16::MAX.into()),
        "uint" => integer_literal(type_name, trimmed, 0, u32::MAX.into()),
        "ulong" => integer_literal(type_name, trimmed, 0, u64::MAX.into()),
        "float" => float_literal(type_name, trimmed, "f"),
        "double" => float_literal(type_name, trimmed, ""),
        "decimal" => float_literal(type_name, trimmed, "m"),
        "DateTime" => match trimmed {
            Some(v) => format!("DateTime.Parse({})", verbatim(v)),
            None => "DateTime.MinValue".to_string(),
        },
        "Guid" => match trimmed {
            Some(v) => format!("new Guid({})", verbatim(v)),
            None => "Guid.Empty".to_string(),
        },
        "object" => "null".to_string(),
        _ => match raw {
            Some(v) => verbatim(v),
            None => "null".to_string(),
        },
    }
}

fn integer_literal(type_name: &str, value: Option<&str>, min: i128, max: i128) -> String {
    match value.and_then(|v| v.parse::<i128>().ok()) {
        Some(n) if (min..=max).contains(&n) => n.to_string(),
        _ => format!("default({})", type_name),
    }
}

fn float_literal(type_name: &str, value: Option<&str>, suffix: &str) -> String {
    match value {
        Some(v) if v.parse::<f64>().map(f64::is_finite).unwrap_or(false) => {
            format!("{}{}", v, suffix)
        }
        _ => format!("default({})", type_name),
    }
}

/// Read a variable node into its C# declaration parts.
pub fn variable_declaration(tree: &ObjectTree, id: NodeId) -> ProgramVariable {
    let node = tree.node(id);
    let value_node = tree
        .first_child_of_kind(id, VARIABLE_VALUE)
        .map(|v| tree.node(v));

    let type_code = node
        .lookup("DataType")
        .or_else(|| value_node.and_then(|v| v.lookup("DataType")));
    let raw_value = node
        .properties
        .get("Value")
        .map(String::as_str)
        .or_else(|| value_node.and_then(|v| v.content.as_deref()))
        .or(node.content.as_deref());

    let type_name = csharp_type(type_code);
    ProgramVariable {
        name: EmitContext::variable_ident(node.name.as_deref().unwrap_or("variable")),
        type_name: type_name.to_string(),
        initializer: literal(type_name, raw_value),
    }
}

/// Emit one variable declaration statement.
///
/// Globals are `public static` class fields; otherwise a local.
pub fn emit_variable(tree: &ObjectTree, id: NodeId, indent: &str, as_global: bool) -> String {
    let var = variable_declaration(tree, id);
    let modifiers = if as_global { "public static " } else { "" };
    format!(
        "{}{}{} {} = {};\n",
        indent, modifiers, var.type_name, var.name, var.initializer
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dessist_dtsx::{IngestOptions, ingest};

    const NS: &str = r#"xmlns:DTS="www.microsoft.com/SqlServer/Dts""#;

    fn variable(body: &str) -> ObjectTree {
        let xml = format!(r#"<DTS:Variable {NS}>{body}</DTS:Variable>"#);
        ingest(&xml, &IngestOptions::default()).unwrap()
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(csharp_type(Some("3")), "int");
        assert_eq!(csharp_type(Some(" 8 ")), "string");
        assert_eq!(csharp_type(Some("72")), "Guid");
        assert_eq!(csharp_type(Some("999")), "dynamic");
        assert_eq!(csharp_type(None), "dynamic");
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal("int", Some("42")), "42");
        assert_eq!(literal("int", Some("forty")), "default(int)");
        assert_eq!(literal("uint", Some("-1")), "default(uint)");
        assert_eq!(literal("short", Some("70000")), "default(short)");
        assert_eq!(literal("long", Some("+7")), "7");
        assert_eq!(literal("bool", Some("-1")), "true");
        assert_eq!(literal("bool", Some("False")), "false");
        assert_eq!(literal("float", Some("1.5")), "1.5f");
        assert_eq!(literal("decimal", Some("2")), "2m");
        assert_eq!(literal("double", None), "default(double)");
        assert_eq!(literal("string", Some("a\"b")), "@\"a\"\"b\"");
        assert_eq!(literal("string", None), "@\"\"");
        assert_eq!(literal("DateTime", None), "DateTime.MinValue");
        assert_eq!(literal("object", Some("x")), "null");
        assert_eq!(literal("dynamic", Some("x")), "@\"x\"");
        assert_eq!(literal("dynamic", None), "null");
    }

    #[test]
    fn test_emit_global_from_properties() {
        let tree = variable(
            r#"<DTS:Property DTS:Name="ObjectName">RowCount</DTS:Property>
               <DTS:Property DTS:Name="DataType">3</DTS:Property>
               <DTS:Property DTS:Name="Value">10</DTS:Property>"#,
        );
        let code = emit_variable(&tree, tree.root(), "        ", true);
        assert_eq!(code, "        public static int RowCount = 10;\n");
    }

    #[test]
    fn test_emit_local_from_variable_value() {
        let tree = variable(
            r#"<DTS:Property DTS:Name="ObjectName">Table Name</DTS:Property>
               <DTS:VariableValue DTS:DataType="8">dbo.orders</DTS:VariableValue>"#,
        );
        let code = emit_variable(&tree, tree.root(), "    ", false);
        assert_eq!(code, "    string Table_Name = @\"dbo.orders\";\n");
    }

    #[test]
    fn test_emit_unknown_type_falls_back_to_dynamic() {
        let tree = variable(r#"<DTS:Property DTS:Name="ObjectName">blob</DTS:Property>"#);
        let code = emit_variable(&tree, tree.root(), "", true);
        assert_eq!(code, "public static dynamic blob = null;\n");
    }

    #[test]
    fn test_emit_keyword_name_is_escaped() {
        let tree = variable(
            r#"<DTS:Property DTS:Name="ObjectName">object</DTS:Property>
               <DTS:Property DTS:Name="DataType">3</DTS:Property>
               <DTS:Property DTS:Name="Value">1</DTS:Property>"#,
        );
        let code = emit_variable(&tree, tree.root(), "", true);
        assert_eq!(code, "public static int @object = 1;\n");
    }
}
