// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Package layout: which subtrees become globals, functions and connections.

use dessist_dtsx::{NodeId, ObjectTree};

/// A runnable unit: task or container.
pub const EXECUTABLE: &str = "DTS:Executable";
/// Wrapper grouping executables (2012+ format).
pub const EXECUTABLES: &str = "DTS:Executables";
/// A package or container variable.
pub const VARIABLE: &str = "DTS:Variable";
/// Wrapper grouping variables (2012+ format).
pub const VARIABLES: &str = "DTS:Variables";
/// Value child of a variable.
pub const VARIABLE_VALUE: &str = "DTS:VariableValue";
/// A connection manager.
pub const CONNECTION_MANAGER: &str = "DTS:ConnectionManager";
/// Wrapper grouping connection managers (2012+ format).
pub const CONNECTION_MANAGERS: &str = "DTS:ConnectionManagers";

/// Top-level constructs of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageLayout {
    /// Variables declared as globals.
    pub variables: Vec<NodeId>,
    /// Executables emitted as top-level functions; the first is the entry point.
    pub executables: Vec<NodeId>,
    /// Connection managers.
    pub connections: Vec<NodeId>,
}

impl PackageLayout {
    /// Select the top-level constructs below the tree's root.
    ///
    /// Executables are the root's direct `DTS:Executable` children; only when
    /// there are none are the ones inside `DTS:Executables` wrappers used.
    pub fn from_tree(tree: &ObjectTree) -> Self {
        let root = tree.root();

        let mut executables: Vec<NodeId> = tree.children_of_kind(root, EXECUTABLE).collect();
        if executables.is_empty() {
            executables = grouped(tree, root, EXECUTABLES, EXECUTABLE);
        }

        Self {
            variables: variable_children(tree, root),
            executables,
            connections: direct_and_grouped(tree, root, CONNECTION_MANAGERS, CONNECTION_MANAGER),
        }
    }
}

/// Executables owned by `id`: direct children plus those inside `DTS:Executables`.
pub fn executable_children(tree: &ObjectTree, id: NodeId) -> Vec<NodeId> {
    direct_and_grouped(tree, id, EXECUTABLES, EXECUTABLE)
}

/// Variables owned by `id`: direct children plus those inside `DTS:Variables`.
pub fn variable_children(tree: &ObjectTree, id: NodeId) -> Vec<NodeId> {
    direct_and_grouped(tree, id, VARIABLES, VARIABLE)
}

fn grouped(tree: &ObjectTree, id: NodeId, wrapper: &str, kind: &str) -> Vec<NodeId> {
    tree.children_of_kind(id, wrapper)
        .flat_map(|group| tree.children_of_kind(group, kind).collect::<Vec<_>>())
        .collect()
}

/// Children of `kind` in document order, whether direct or inside a `wrapper`.
fn direct_and_grouped(tree: &ObjectTree, id: NodeId, wrapper: &str, kind: &str) -> Vec<NodeId> {
    let mut out = Vec::new();
    for (child, node) in tree.children(id) {
        if node.kind == kind {
            out.push(child);
        } else if node.kind == wrapper {
            out.extend(tree.children_of_kind(child, kind));
        }
    }
    out
}
