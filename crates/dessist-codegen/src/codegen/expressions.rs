// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SSIS expression translation.
//!
//! Property expressions are written in the SSIS expression language. This
//! module rewrites the common subset into C#:
//!
//! | SSIS                         | C#                                   |
//! |------------------------------|--------------------------------------|
//! | `@[User::Table]`, `@Table`   | `Table`                              |
//! | `@[System::MachineName]`     | `Environment.MachineName`            |
//! | `(DT_WSTR, 50) x`            | `Convert.ToString(x)`                |
//! | `(DT_I4) x`                  | `Convert.ToInt32(x)`                 |
//! | `UPPER(x)`                   | `(x).ToUpper()`                      |
//! | `SUBSTRING(s, i, n)`         | `(s).Substring((i) - 1, n)`          |
//! | `GETDATE()`                  | `DateTime.Now`                       |
//!
//! Operators, string and numeric literals pass through unchanged. Anything
//! outside the subset yields [`Untranslated`] so the caller can emit a
//! placeholder instead.

use dessist_dtsx::{NodeId, ObjectTree};
use thiserror::Error;

use super::context::EmitContext;
use super::writer::verbatim;

/// An expression that could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("untranslated expression `{expression}`: {reason}")]
pub struct Untranslated {
    /// The original SSIS expression.
    pub expression: String,
    /// Why translation stopped.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Var {
        namespace: Option<String>,
        name: String,
    },
    Str(String),
    Num(String),
    Ident(String),
    Cast(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "?", ":", "&",
    "|", "^", "~", "=",
];

/// Translate an SSIS expression evaluated on behalf of `node`.
///
/// `node` anchors lookups of system variables such as `System::PackageName`,
/// which are resolved by walking up to the package root.
pub fn translate(expression: &str, tree: &ObjectTree, node: NodeId) -> Result<String, Untranslated> {
    let fail = |reason: String| Untranslated {
        expression: expression.to_string(),
        reason,
    };

    let tokens = tokenize(expression).map_err(fail)?;
    if tokens.is_empty() {
        return Err(fail("empty expression".to_string()));
    }

    let mut translator = Translator {
        tokens,
        pos: 0,
        tree,
        node,
    };
    let out = translator.sequence().map_err(fail)?;
    if let Some(token) = translator.peek() {
        return Err(fail(format!("unexpected {:?}", token)));
    }
    Ok(out)
}

/// Translate an SSIS expression into a C# statement, without the `;`.
///
/// C# only allows assignments and calls as statements, so any other
/// expression is evaluated into a discard.
pub fn translate_statement(
    expression: &str,
    tree: &ObjectTree,
    node: NodeId,
) -> Result<String, Untranslated> {
    let code = translate(expression, tree, node)?;
    let assigns = tokenize(expression).is_ok_and(|tokens| assigns_at_top_level(&tokens));
    if assigns {
        Ok(code)
    } else {
        Ok(format!("_ = {}", code))
    }
}

fn assigns_at_top_level(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    tokens.iter().any(|token| {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        depth == 0 && *token == Token::Op("=")
    })
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
        } else if c == '@' {
            i += 1;
            if chars.get(i) == Some(&'[') {
                let start = i + 1;
                let end = find_char(&chars, start, ']')
                    .ok_or_else(|| "unterminated variable reference".to_string())?;
                let inner: String = chars[start..end].iter().collect();
                tokens.push(variable_token(&inner));
                i = end + 1;
            } else {
                let start = i;
                while chars.get(i).is_some_and(|c| c.is_alphanumeric() || *c == '_') {
                    i += 1;
                }
                if start == i {
                    return Err("'@' without a variable name".to_string());
                }
                let inner: String = chars[start..i].iter().collect();
                tokens.push(variable_token(&inner));
            }
        } else if c == '"' {
            let start = i;
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string literal".to_string()),
                    Some('\\') => i += 2,
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while let Some(&d) = chars.get(i) {
                let exponent_sign =
                    matches!(d, '+' | '-') && i > start && matches!(chars[i - 1], 'e' | 'E');
                if !(d.is_ascii_alphanumeric() || d == '.' || exponent_sign) {
                    break;
                }
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::Num(numeric_literal(&literal)?));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while chars.get(i).is_some_and(|c| c.is_alphanumeric() || *c == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c == '(' {
            let mut j = i + 1;
            while chars.get(j).is_some_and(|c| c.is_whitespace()) {
                j += 1;
            }
            let ahead: String = chars[j..chars.len().min(j + 3)].iter().collect();
            if ahead.eq_ignore_ascii_case("DT_") {
                let end = find_char(&chars, j, ')')
                    .ok_or_else(|| "unterminated cast".to_string())?;
                let inner: String = chars[j..end].iter().collect();
                let ty = inner.split(',').next().unwrap_or_default().trim().to_ascii_uppercase();
                tokens.push(Token::Cast(ty));
                i = end + 1;
            } else {
                tokens.push(Token::LParen);
                i += 1;
            }
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == ',' {
            tokens.push(Token::Comma);
            i += 1;
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .ok_or_else(|| format!("unexpected character '{}'", c))?;
            tokens.push(Token::Op(op));
            i += op.chars().count();
        }
    }

    Ok(tokens)
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .iter()
        .skip(from)
        .position(|&c| c == target)
        .map(|p| p + from)
}

fn variable_token(inner: &str) -> Token {
    match inner.split_once("::") {
        Some((namespace, name)) => Token::Var {
            namespace: Some(namespace.trim().to_string()),
            name: name.trim().to_string(),
        },
        None => Token::Var {
            namespace: None,
            name: inner.trim().to_string(),
        },
    }
}

/// SSIS numeric literals take C-style suffixes; C# accepts the same set.
fn numeric_literal(literal: &str) -> Result<String, String> {
    let body = literal.trim_end_matches(|c: char| matches!(c, 'L' | 'l' | 'U' | 'u' | 'F' | 'f'));
    let mut previous = None;
    let valid = !body.is_empty()
        && body.chars().all(|c| {
            let ok = c.is_ascii_digit()
                || matches!(c, '.' | 'e' | 'E')
                || (matches!(c, '+' | '-') && matches!(previous, Some('e' | 'E')));
            previous = Some(c);
            ok
        })
        && !body.ends_with(['e', 'E', '+', '-']);
    if valid {
        Ok(literal.to_string())
    } else {
        Err(format!("invalid numeric literal '{}'", literal))
    }
}

struct Translator<'a> {
    tokens: Vec<Token>,
    pos: usize,
    tree: &'a ObjectTree,
    node: NodeId,
}

impl Translator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            other => Err(format!("expected ')', found {:?}", other)),
        }
    }

    /// Operands and operators up to a `,` or `)` at this nesting level.
    fn sequence(&mut self) -> Result<String, String> {
        let mut out = String::new();
        let mut after_operand = false;

        while let Some(token) = self.peek() {
            match token {
                Token::Comma | Token::RParen => break,
                Token::Op(op) if after_operand => {
                    out.push(' ');
                    out.push_str(op);
                    out.push(' ');
                    self.pos += 1;
                    after_operand = false;
                }
                _ => {
                    if after_operand {
                        return Err(format!("missing operator before {:?}", token));
                    }
                    out.push_str(&self.primary()?);
                    after_operand = true;
                }
            }
        }

        if out.is_empty() {
            return Err("empty operand".to_string());
        }
        if !after_operand {
            return Err("expression ends with an operator".to_string());
        }
        Ok(out)
    }

    fn primary(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Var { namespace, name }) => self.variable(namespace.as_deref(), &name),
            Some(Token::Str(literal)) | Some(Token::Num(literal)) => Ok(literal),
            Some(Token::Op(op @ ("-" | "!" | "~"))) => Ok(format!("{}{}", op, self.primary()?)),
            Some(Token::LParen) => {
                let inner = self.sequence()?;
                self.expect_rparen()?;
                Ok(format!("({})", inner))
            }
            Some(Token::Cast(ty)) => {
                let operand = self.primary()?;
                cast(&ty, &operand)
            }
            Some(Token::Ident(ident)) => self.identifier(&ident),
            other => Err(format!("unexpected {:?}", other)),
        }
    }

    fn identifier(&mut self, ident: &str) -> Result<String, String> {
        let upper = ident.to_ascii_uppercase();
        let next = self.peek().cloned();
        match (upper.as_str(), next) {
            ("TRUE", _) => Ok("true".to_string()),
            ("FALSE", _) => Ok("false".to_string()),
            ("NULL", Some(Token::Cast(_))) => {
                self.pos += 1;
                Ok("null".to_string())
            }
            (_, Some(Token::LParen)) => {
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                } else {
                    loop {
                        args.push(self.sequence()?);
                        match self.next() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            other => return Err(format!("expected ',' or ')', found {:?}", other)),
                        }
                    }
                }
                function(&upper, &args)
            }
            _ => Err(format!("unknown identifier '{}'", ident)),
        }
    }

    fn variable(&self, namespace: Option<&str>, name: &str) -> Result<String, String> {
        if !namespace.is_some_and(|ns| ns.eq_ignore_ascii_case("System")) {
            return Ok(EmitContext::variable_ident(name));
        }

        let package = self
            .tree
            .ancestors(self.node)
            .last()
            .copied()
            .unwrap_or(self.node);
        let package_node = self.tree.node(package);

        match name {
            "StartTime" | "ContainerStartTime" => Ok("DateTime.Now".to_string()),
            "MachineName" => Ok("Environment.MachineName".to_string()),
            "UserName" => Ok("Environment.UserName".to_string()),
            "PackageName" => Ok(verbatim(package_node.name.as_deref().unwrap_or_default())),
            "PackageID" => package_node
                .lookup("DTSID")
                .map(verbatim)
                .ok_or_else(|| "package has no DTSID".to_string()),
            "TaskName" => Ok(verbatim(
                self.tree.node(self.node).name.as_deref().unwrap_or_default(),
            )),
            other => Err(format!("system variable '{}' has no equivalent", other)),
        }
    }
}

fn cast(ty: &str, operand: &str) -> Result<String, String> {
    let method = match ty {
        "DT_WSTR" | "DT_STR" | "DT_TEXT" | "DT_NTEXT" => "ToString",
        "DT_I1" => "ToSByte",
        "DT_I2" => "ToInt16",
        "DT_I4" => "ToInt32",
        "DT_I8" => "ToInt64",
        "DT_UI1" => "ToByte",
        "DT_UI2" => "ToUInt16",
        "DT_UI4" => "ToUInt32",
        "DT_UI8" => "ToUInt64",
        "DT_R4" => "ToSingle",
        "DT_R8" => "ToDouble",
        "DT_BOOL" => "ToBoolean",
        "DT_DATE" | "DT_DBDATE" | "DT_DBTIMESTAMP" | "DT_DBTIMESTAMP2" | "DT_FILETIME" => {
            "ToDateTime"
        }
        "DT_DECIMAL" | "DT_NUMERIC" | "DT_CY" => "ToDecimal",
        "DT_GUID" => return Ok(format!("new Guid(Convert.ToString({}))", operand)),
        other => return Err(format!("cast to {} has no equivalent", other)),
    };
    Ok(format!("Convert.{}({})", method, operand))
}

fn function(name: &str, args: &[String]) -> Result<String, String> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(format!("{} expects {} argument(s), got {}", name, n, args.len()))
        }
    };

    match name {
        "GETDATE" => arity(0).map(|_| "DateTime.Now".to_string()),
        "GETUTCDATE" => arity(0).map(|_| "DateTime.UtcNow".to_string()),
        "UPPER" => arity(1).map(|_| format!("({}).ToUpper()", args[0])),
        "LOWER" => arity(1).map(|_| format!("({}).ToLower()", args[0])),
        "TRIM" => arity(1).map(|_| format!("({}).Trim()", args[0])),
        "LTRIM" => arity(1).map(|_| format!("({}).TrimStart()", args[0])),
        "RTRIM" => arity(1).map(|_| format!("({}).TrimEnd()", args[0])),
        "LEN" => arity(1).map(|_| format!("({}).Length", args[0])),
        "REPLACE" => arity(3).map(|_| format!("({}).Replace({}, {})", args[0], args[1], args[2])),
        "SUBSTRING" => {
            arity(3).map(|_| format!("({}).Substring(({}) - 1, {})", args[0], args[1], args[2]))
        }
        "LEFT" => arity(2).map(|_| format!("({}).Substring(0, {})", args[0], args[1])),
        "RIGHT" => arity(2).map(|_| {
            format!("({0}).Substring(({0}).Length - ({1}))", args[0], args[1])
        }),
        "ISNULL" => arity(1).map(|_| format!("(({}) == null)", args[0])),
        "ABS" => arity(1).map(|_| format!("Math.Abs({})", args[0])),
        "CEILING" => arity(1).map(|_| format!("Math.Ceiling({})", args[0])),
        "FLOOR" => arity(1).map(|_| format!("Math.Floor({})", args[0])),
        "SQRT" => arity(1).map(|_| format!("Math.Sqrt({})", args[0])),
        "POWER" => arity(2).map(|_| format!("Math.Pow({}, {})", args[0], args[1])),
        "ROUND" => arity(2).map(|_| format!("Math.Round({}, {})", args[0], args[1])),
        "YEAR" => arity(1).map(|_| format!("({}).Year", args[0])),
        "MONTH" => arity(1).map(|_| format!("({}).Month", args[0])),
        "DAY" => arity(1).map(|_| format!("({}).Day", args[0])),
        "DATEADD" => {
            arity(3)?;
            let (method, factor) = match date_part(&args[0]).as_str() {
                "year" | "yy" | "yyyy" => ("AddYears", 1),
                "quarter" | "qq" | "q" => ("AddMonths", 3),
                "month" | "mm" | "m" => ("AddMonths", 1),
                "week" | "wk" | "ww" => ("AddDays", 7),
                "day" | "dd" | "d" | "dayofyear" | "dy" | "y" => ("AddDays", 1),
                "hour" | "hh" => ("AddHours", 1),
                "minute" | "mi" | "n" => ("AddMinutes", 1),
                "second" | "ss" | "s" => ("AddSeconds", 1),
                other => return Err(format!("DATEADD part '{}' has no equivalent", other)),
            };
            if factor == 1 {
                Ok(format!("({}).{}({})", args[2], method, args[1]))
            } else {
                Ok(format!("({}).{}(({}) * {})", args[2], method, args[1], factor))
            }
        }
        "DATEPART" => {
            arity(2)?;
            let property = match date_part(&args[0]).as_str() {
                "year" | "yy" | "yyyy" => "Year",
                "month" | "mm" | "m" => "Month",
                "day" | "dd" | "d" => "Day",
                "dayofyear" | "dy" | "y" => "DayOfYear",
                "hour" | "hh" => "Hour",
                "minute" | "mi" | "n" => "Minute",
                "second" | "ss" | "s" => "Second",
                other => return Err(format!("DATEPART part '{}' has no equivalent", other)),
            };
            Ok(format!("({}).{}", args[1], property))
        }
        "DATEDIFF" => {
            arity(3)?;
            let (start, end) = (&args[1], &args[2]);
            match date_part(&args[0]).as_str() {
                "year" | "yy" | "yyyy" => Ok(format!("(({}).Year - ({}).Year)", end, start)),
                "month" | "mm" | "m" => Ok(format!(
                    "((({e}).Year - ({s}).Year) * 12 + ({e}).Month - ({s}).Month)",
                    e = end,
                    s = start
                )),
                "day" | "dd" | "d" => Ok(format!("(int)(({}) - ({})).TotalDays", end, start)),
                "hour" | "hh" => Ok(format!("(int)(({}) - ({})).TotalHours", end, start)),
                "minute" | "mi" | "n" => Ok(format!("(int)(({}) - ({})).TotalMinutes", end, start)),
                "second" | "ss" | "s" => Ok(format!("(int)(({}) - ({})).TotalSeconds", end, start)),
                other => Err(format!("DATEDIFF part '{}' has no equivalent", other)),
            }
        }
        other => Err(format!("function {} has no equivalent", other)),
    }
}

/// Date part argument with its quotes removed, lowercased.
fn date_part(arg: &str) -> String {
    arg.trim().trim_matches('"').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dessist_dtsx::{IngestOptions, ingest};

    fn tree() -> (ObjectTree, NodeId) {
        let xml = r#"<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts"
                        DTS:ObjectName="NightlyLoad" DTS:DTSID="{AB}">
                       <DTS:Executable DTS:ObjectName="Truncate"/>
                     </DTS:Executable>"#;
        let tree = ingest(xml, &IngestOptions::default()).unwrap();
        let task = tree.children(tree.root()).map(|(id, _)| id).next().unwrap();
        (tree, task)
    }

    fn tr(expr: &str) -> Result<String, Untranslated> {
        let (tree, id) = tree();
        translate(expr, &tree, id)
    }

    #[test]
    fn test_variables() {
        assert_eq!(tr("@[User::TableName]").unwrap(), "TableName");
        assert_eq!(tr("@Count").unwrap(), "Count");
        assert_eq!(tr("@[User::Row Count]").unwrap(), "Row_Count");
    }

    #[test]
    fn test_string_concatenation_passes_through() {
        assert_eq!(
            tr(r#""TRUNCATE TABLE " + @[User::TableName]"#).unwrap(),
            r#""TRUNCATE TABLE " + TableName"#
        );
    }

    #[test]
    fn test_escaped_quote_in_string() {
        assert_eq!(tr(r#""say \"hi\"""#).unwrap(), r#""say \"hi\"""#);
    }

    #[test]
    fn test_casts() {
        assert_eq!(
            tr("(DT_WSTR, 10) @[User::Count]").unwrap(),
            "Convert.ToString(Count)"
        );
        assert_eq!(tr("(DT_I4)\"5\"").unwrap(), "Convert.ToInt32(\"5\")");
        assert_eq!(tr("(DT_I4)-1").unwrap(), "Convert.ToInt32(-1)");
        assert!(tr("(DT_BYTES, 4) @x").is_err());
    }

    #[test]
    fn test_functions() {
        assert_eq!(tr("GETDATE()").unwrap(), "DateTime.Now");
        assert_eq!(tr("UPPER(@[User::s])").unwrap(), "(s).ToUpper()");
        assert_eq!(
            tr("SUBSTRING(@s, 2, 3)").unwrap(),
            "(s).Substring((2) - 1, 3)"
        );
        assert_eq!(
            tr("DATEADD(\"day\", -1, GETDATE())").unwrap(),
            "(DateTime.Now).AddDays(-1)"
        );
        assert_eq!(tr("YEAR(GETDATE())").unwrap(), "(DateTime.Now).Year");
    }

    #[test]
    fn test_nested_groups_and_conditional() {
        assert_eq!(
            tr("(@a == 1) ? \"one\" : \"other\"").unwrap(),
            "(a == 1) ? \"one\" : \"other\""
        );
        assert_eq!(tr("!(@flag)").unwrap(), "!(flag)");
    }

    #[test]
    fn test_assignment() {
        assert_eq!(tr("@i = @i + 1").unwrap(), "i = i + 1");
    }

    #[test]
    fn test_signed_exponent_literal() {
        assert_eq!(tr("1e-5 + 1").unwrap(), "1e-5 + 1");
        assert_eq!(tr("@x * 2.5E+3").unwrap(), "x * 2.5E+3");
        assert!(tr("1e- 5").is_err());
    }

    #[test]
    fn test_keyword_variable_is_escaped() {
        assert_eq!(tr("@[User::object] + 1").unwrap(), "@object + 1");
    }

    #[test]
    fn test_statement_keeps_assignment() {
        let (tree, id) = tree();
        assert_eq!(
            translate_statement("@i = (@i == 1) ? 2 : 3", &tree, id).unwrap(),
            "i = (i == 1) ? 2 : 3"
        );
    }

    #[test]
    fn test_statement_discards_plain_expression() {
        let (tree, id) = tree();
        assert_eq!(translate_statement("@x == 1", &tree, id).unwrap(), "_ = x == 1");
        assert_eq!(
            translate_statement("(@x = 1)", &tree, id).unwrap(),
            "_ = (x = 1)"
        );
    }

    #[test]
    fn test_system_variables() {
        assert_eq!(
            tr("@[System::MachineName]").unwrap(),
            "Environment.MachineName"
        );
        assert_eq!(tr("@[System::TaskName]").unwrap(), "@\"Truncate\"");
        assert_eq!(tr("@[System::PackageName]").unwrap(), "@\"NightlyLoad\"");
        assert_eq!(tr("@[System::PackageID]").unwrap(), "@\"{AB}\"");
        let err = tr("@[System::ErrorCode]").unwrap_err();
        assert!(err.reason.contains("ErrorCode"));
    }

    #[test]
    fn test_untranslated_reports_expression() {
        let err = tr("FINDSTRING(@s, \"x\", 1)").unwrap_err();
        assert_eq!(err.expression, "FINDSTRING(@s, \"x\", 1)");
        assert!(err.reason.contains("FINDSTRING"));
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(tr("").is_err());
        assert!(tr("\"open").is_err());
        assert!(tr("@a +").is_err());
        assert!(tr("@a @b").is_err());
        assert!(tr("UPPER(@a").is_err());
        assert!(tr("#").is_err());
    }
}
