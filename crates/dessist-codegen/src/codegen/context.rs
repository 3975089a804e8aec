// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Emission context for code generation.
//!
//! Tracks assigned function names, collects diagnostics and script sources,
//! and provides identifier utilities.

use std::collections::{HashMap, HashSet};
use std::fmt;

use dessist_dtsx::{NodeId, ObjectTree};
use serde::Serialize;
use tracing::warn;

use crate::config::EmitOptions;

/// C# keywords; not usable as plain identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Members the program skeleton already declares.
const SKELETON_MEMBERS: &[&str] = &["Main"];

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A task kind or expression with no C# equivalent; a placeholder was emitted.
    UntranslatedConstruct,
    /// A node that is not an executable was asked to emit a function.
    UnrecognizedNode,
}

/// A non-fatal problem found during emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Problem category.
    pub kind: DiagnosticKind,
    /// Human-readable label of the node, e.g. `DTS:Executable 'Load Data'`.
    pub node: String,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.message)
    }
}

/// A variable visible to generated code, passed by `ref` into nested functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramVariable {
    /// C# identifier.
    pub name: String,
    /// C# type name.
    pub type_name: String,
    /// Initializer expression.
    pub initializer: String,
}

/// Script source captured from a script task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSource {
    /// Function generated for the owning task.
    pub function: String,
    /// File name as recorded in the package (may contain `/` or `\`).
    pub file_name: String,
    /// Source text.
    pub text: String,
}

/// Context for code emission.
pub struct EmitContext {
    /// Compatibility and library options.
    pub options: EmitOptions,

    /// Package-level variables, consulted when binding results to variables.
    pub globals: Vec<ProgramVariable>,

    /// node -> assigned function name
    function_names: HashMap<NodeId, String>,

    /// Every function and variable name taken so far
    used_names: HashSet<String>,

    diagnostics: Vec<Diagnostic>,

    scripts: Vec<ScriptSource>,
}

impl EmitContext {
    /// Create a new emission context.
    pub fn new(options: EmitOptions) -> Self {
        Self {
            options,
            globals: Vec::new(),
            function_names: HashMap::new(),
            used_names: HashSet::new(),
            diagnostics: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// Sanitize a string to be a valid C# identifier.
    /// Replaces invalid characters with underscores.
    pub fn sanitize_ident(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for (i, c) in s.trim().chars().enumerate() {
            if c.is_ascii_alphanumeric() || c == '_' {
                // First character cannot be a digit
                if i == 0 && c.is_ascii_digit() {
                    result.push('_');
                }
                result.push(c);
            } else {
                result.push('_');
            }
        }
        // Ensure we have at least one character
        if result.is_empty() {
            result.push_str("_empty");
        }
        result
    }

    /// C# identifier for an SSIS variable name.
    ///
    /// Keywords are escaped with `@`; names the program skeleton declares
    /// get a trailing underscore. Every reference to the variable goes
    /// through here, so declarations and uses agree.
    pub fn variable_ident(s: &str) -> String {
        let ident = Self::sanitize_ident(s);
        if KEYWORDS.contains(&ident.as_str()) {
            format!("@{}", ident)
        } else if SKELETON_MEMBERS.contains(&ident.as_str()) {
            format!("{}_", ident)
        } else {
            ident
        }
    }

    /// Set the package-level variables and keep functions from taking
    /// their names.
    pub fn declare_globals(&mut self, globals: Vec<ProgramVariable>) {
        for global in &globals {
            self.reserve_name(&global.name);
        }
        self.globals = globals;
    }

    /// Keep functions named from now on from using `name`.
    pub fn reserve_name(&mut self, name: &str) {
        self.used_names.insert(name.to_string());
    }

    /// Function name for a node.
    ///
    /// Built from the node's display name, or `<kind>_<index>` when it has
    /// none. A name already handed out gets a numeric suffix starting at 2.
    /// The result is cached, so asking twice for the same node is stable.
    pub fn function_name(&mut self, tree: &ObjectTree, id: NodeId) -> String {
        if let Some(name) = self.function_names.get(&id) {
            return name.clone();
        }

        let node = tree.node(id);
        let base = match node.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Self::sanitize_ident(name),
            _ => format!(
                "{}_{}",
                Self::sanitize_ident(node.local_kind()),
                tree.sibling_index(id)
            ),
        };

        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.used_names.contains(&candidate)
            || KEYWORDS.contains(&candidate.as_str())
            || SKELETON_MEMBERS.contains(&candidate.as_str())
        {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }

        self.used_names.insert(candidate.clone());
        self.function_names.insert(id, candidate.clone());
        candidate
    }

    /// Record a diagnostic against a node and log it.
    pub fn report(&mut self, tree: &ObjectTree, id: NodeId, kind: DiagnosticKind, message: String) {
        let diagnostic = Diagnostic {
            kind,
            node: node_label(tree, id),
            message,
        };
        warn!(kind = ?diagnostic.kind, "{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Number of functions named so far.
    pub fn function_count(&self) -> usize {
        self.function_names.len()
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Capture a script source file.
    pub fn add_script(&mut self, script: ScriptSource) {
        self.scripts.push(script);
    }

    /// Script sources captured so far.
    pub fn scripts(&self) -> &[ScriptSource] {
        &self.scripts
    }

    /// Consume the context, returning its diagnostics and scripts.
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<ScriptSource>) {
        (self.diagnostics, self.scripts)
    }

    /// Find an in-scope or global variable by C# name.
    pub fn find_variable<'a>(
        &'a self,
        scope: &'a [ProgramVariable],
        name: &str,
    ) -> Option<&'a ProgramVariable> {
        scope
            .iter()
            .rev()
            .chain(self.globals.iter())
            .find(|v| v.name == name)
    }
}

/// `kind 'name'` label used in diagnostics.
pub fn node_label(tree: &ObjectTree, id: NodeId) -> String {
    let node = tree.node(id);
    match &node.name {
        Some(name) => format!("{} '{}'", node.kind, name),
        None => node.kind.clone(),
    }
}
