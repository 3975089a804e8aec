// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Line-oriented source text builder and C# literal helpers.

/// One level of indentation in generated code.
pub const INDENT_UNIT: &str = "    ";

/// Marker placed in comments wherever emission fell back to a placeholder.
pub const UNTRANSLATED_MARKER: &str = "UNTRANSLATED";

/// Accumulates generated lines.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    buf: String,
}

impl SourceBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the given indentation.
    pub fn line(&mut self, indent: &str, text: impl AsRef<str>) {
        self.buf.push_str(indent);
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    /// Append an empty line.
    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Append `text` as `//` comment lines, one per source line.
    pub fn comment(&mut self, indent: &str, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.line(indent, "//");
            } else {
                self.line(indent, format!("// {}", line));
            }
        }
        if text.is_empty() {
            self.line(indent, "//");
        }
    }

    /// Append a placeholder comment carrying [`UNTRANSLATED_MARKER`].
    pub fn untranslated(&mut self, indent: &str, text: &str) {
        self.comment(indent, &format!("{}: {}", UNTRANSLATED_MARKER, text));
    }

    /// Finish building.
    pub fn finish(self) -> String {
        self.buf
    }
}

/// Indentation one level deeper than `indent`.
pub fn deeper(indent: &str) -> String {
    format!("{}{}", indent, INDENT_UNIT)
}

/// C# verbatim string literal for `s`.
pub fn verbatim(s: &str) -> String {
    format!("@\"{}\"", s.replace('"', "\"\""))
}

/// Text safe to place on one line of an XML doc comment.
pub fn doc_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_blank() {
        let mut out = SourceBuilder::new();
        out.line("    ", "int x = 0;");
        out.blank();
        assert_eq!(out.finish(), "    int x = 0;\n\n");
    }

    #[test]
    fn test_comment_splits_lines() {
        let mut out = SourceBuilder::new();
        out.comment("  ", "first\n\nthird");
        assert_eq!(out.finish(), "  // first\n  //\n  // third\n");
    }

    #[test]
    fn test_untranslated_carries_marker() {
        let mut out = SourceBuilder::new();
        out.untranslated("", "task type 'X'");
        assert_eq!(out.finish(), "// UNTRANSLATED: task type 'X'\n");
    }

    #[test]
    fn test_verbatim_doubles_quotes() {
        assert_eq!(verbatim(r#"say "hi""#), r#"@"say ""hi""""#);
        assert_eq!(verbatim(r"C:\temp"), r#"@"C:\temp""#);
    }

    #[test]
    fn test_doc_text_escapes_and_flattens() {
        assert_eq!(doc_text("a < b\n  & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_deeper() {
        assert_eq!(deeper("  "), "      ");
    }
}
