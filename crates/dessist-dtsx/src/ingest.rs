// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! XML to object tree ingestion.
//!
//! Walks a parsed document element by element and builds an [`ObjectTree`].
//! The walk knows only the handful of tags that carry properties and names;
//! everything else is copied generically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::node::{Node, NodeId, ObjectTree};

/// Tag of a design-time property marker.
pub const PROPERTY_TAG: &str = "DTS:Property";
/// Tag of a run-time property expression marker.
pub const PROPERTY_EXPRESSION_TAG: &str = "DTS:PropertyExpression";
/// Attribute naming a property marker.
pub const PROPERTY_NAME_ATTRIBUTE: &str = "DTS:Name";
/// Property that supplies a node's display name.
pub const NAME_PROPERTY: &str = "ObjectName";
/// Attribute that supplies a node's display name when no property did.
pub const NAME_ATTRIBUTE: &str = "DTS:ObjectName";

/// Errors that abort ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document is not well-formed XML.
    #[error("malformed input: {0}")]
    Malformed(#[from] roxmltree::Error),
}

/// Which text child wins when an element carries several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentPrecedence {
    /// The first text child is kept.
    First,
    /// Each text child overwrites the previous one.
    #[default]
    Last,
}

impl FromStr for ContentPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(format!("unknown content precedence '{}'", other)),
        }
    }
}

/// Tags and attribute names the ingestor treats specially.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Tag of design-time property markers.
    pub property_tag: String,
    /// Tag of property-expression markers.
    pub expression_tag: String,
    /// Attribute holding a marker's property name (matched case-insensitively).
    pub property_name_attribute: String,
    /// Property name that sets the node's display name.
    pub name_property: String,
    /// Attribute used as the display-name fallback.
    pub name_attribute: String,
    /// Text child precedence.
    pub content_precedence: ContentPrecedence,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            property_tag: PROPERTY_TAG.to_string(),
            expression_tag: PROPERTY_EXPRESSION_TAG.to_string(),
            property_name_attribute: PROPERTY_NAME_ATTRIBUTE.to_string(),
            name_property: NAME_PROPERTY.to_string(),
            name_attribute: NAME_ATTRIBUTE.to_string(),
            content_precedence: ContentPrecedence::Last,
        }
    }
}

impl IngestOptions {
    /// Default options with a different text precedence.
    pub fn with_content_precedence(content_precedence: ContentPrecedence) -> Self {
        Self {
            content_precedence,
            ..Self::default()
        }
    }
}

/// A skipped construct found while ingesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestWarning {
    /// Kind of the element the construct was found in.
    pub parent_kind: String,
    /// What was skipped.
    pub message: String,
    /// 1-based line and column in the source document.
    pub position: (u32, u32),
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: unrecognized node under {}: {}",
            self.position.0, self.position.1, self.parent_kind, self.message
        )
    }
}

/// Parse `xml` and ingest its document element.
///
/// # Errors
///
/// Returns [`IngestError::Malformed`] when the text is not well-formed. No
/// partial tree is produced.
pub fn ingest(xml: &str, options: &IngestOptions) -> Result<ObjectTree, IngestError> {
    let doc = roxmltree::Document::parse(xml)?;
    let tree = ingest_element(doc.root_element(), options);
    debug!(
        nodes = tree.len(),
        warnings = tree.warnings.len(),
        "ingested package document"
    );
    Ok(tree)
}

/// Ingest an already-parsed element and its subtree.
pub fn ingest_element(element: roxmltree::Node<'_, '_>, options: &IngestOptions) -> ObjectTree {
    let mut tree = ObjectTree::with_root(qualified_tag(element));
    let root = tree.root();
    read_element(&mut tree, root, element, options);
    tree
}

fn read_element(
    tree: &mut ObjectTree,
    id: NodeId,
    element: roxmltree::Node<'_, '_>,
    options: &IngestOptions,
) {
    let attributes: Vec<(String, String)> = element
        .attributes()
        .map(|attr| (qualified_attribute(element, &attr), attr.value().to_string()))
        .collect();
    if let Some(node) = tree.node_mut(id) {
        node.attributes.extend(attributes);
    }

    let mut seen_text = false;
    for child in element.children() {
        match child.node_type() {
            roxmltree::NodeType::Element => {
                let is_property = names_tag(child, &options.property_tag);
                let is_expression = names_tag(child, &options.expression_tag);
                if is_property || is_expression {
                    read_property(tree, id, child, is_expression, options);
                } else {
                    let child_id = tree.add_child(id, Node::new(qualified_tag(child)));
                    read_element(tree, child_id, child, options);
                }
            }
            roxmltree::NodeType::Text => {
                let Some(text) = child.text() else { continue };
                if text.trim().is_empty() {
                    continue;
                }
                let keep = match options.content_precedence {
                    ContentPrecedence::Last => true,
                    ContentPrecedence::First => !seen_text,
                };
                seen_text = true;
                if keep && let Some(node) = tree.node_mut(id) {
                    node.content = Some(text.to_string());
                }
            }
            other => {
                let message = match other {
                    roxmltree::NodeType::Comment => "comment".to_string(),
                    roxmltree::NodeType::PI => "processing instruction".to_string(),
                    _ => format!("{:?}", other),
                };
                push_warning(tree, id, child, message);
            }
        }
    }

    let node = tree.node(id);
    if node.name.is_none() {
        let fallback = node.attributes.get(&options.name_attribute).cloned();
        if let Some(node) = tree.node_mut(id) {
            node.name = fallback;
        }
    }
}

fn read_property(
    tree: &mut ObjectTree,
    id: NodeId,
    element: roxmltree::Node<'_, '_>,
    is_expression: bool,
    options: &IngestOptions,
) {
    let prop_name = element
        .attributes()
        .find(|attr| names_attribute(element, attr, &options.property_name_attribute))
        .map(|attr| attr.value().to_string());

    let Some(prop_name) = prop_name else {
        push_warning(
            tree,
            id,
            element,
            format!("{} without a name attribute", qualified_tag(element)),
        );
        return;
    };

    let value: String = element
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();

    if let Some(node) = tree.node_mut(id) {
        if prop_name == options.name_property && node.name.is_none() {
            node.name = Some(value.clone());
        }
        if is_expression {
            node.expressions.insert(prop_name.clone());
        } else {
            node.expressions.shift_remove(&prop_name);
        }
        node.properties.insert(prop_name, value);
    }
}

fn push_warning(
    tree: &mut ObjectTree,
    id: NodeId,
    at: roxmltree::Node<'_, '_>,
    message: String,
) {
    let pos = at.document().text_pos_at(at.range().start);
    let warning = IngestWarning {
        parent_kind: tree.node(id).kind.clone(),
        message,
        position: (pos.row, pos.col),
    };
    warn!("{}", warning);
    tree.warnings.push(warning);
}

/// Tag exactly as written: `prefix:local`, or just `local` without a prefix.
fn qualified_tag(element: roxmltree::Node<'_, '_>) -> String {
    let written = element
        .document()
        .input_text()
        .get(element.range())
        .and_then(|text| text.strip_prefix('<'))
        .map(|text| {
            let end = text
                .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .unwrap_or(text.len());
            &text[..end]
        })
        .filter(|name| !name.is_empty());
    written.unwrap_or(element.tag_name().name()).to_string()
}

/// Name of an attribute of `element` exactly as written.
fn qualified_attribute(element: roxmltree::Node<'_, '_>, attr: &roxmltree::Attribute<'_, '_>) -> String {
    element
        .document()
        .input_text()
        .get(attr.range_qname())
        .filter(|name| !name.is_empty())
        .unwrap_or(attr.name())
        .to_string()
}

/// Whether `element` is the configured `wanted` tag, either as written or
/// through another prefix bound to the same namespace.
fn names_tag(element: roxmltree::Node<'_, '_>, wanted: &str) -> bool {
    if qualified_tag(element) == wanted {
        return true;
    }
    let tag = element.tag_name();
    same_expanded_name(element, tag.namespace(), tag.name(), wanted, false)
}

/// Like [`names_tag`] for an attribute of `element`, ignoring ASCII case.
fn names_attribute(
    element: roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
    wanted: &str,
) -> bool {
    qualified_attribute(element, attr).eq_ignore_ascii_case(wanted)
        || same_expanded_name(element, attr.namespace(), attr.name(), wanted, true)
}

fn same_expanded_name(
    scope: roxmltree::Node<'_, '_>,
    namespace: Option<&str>,
    local: &str,
    wanted: &str,
    ignore_case: bool,
) -> bool {
    let (prefix, wanted_local) = match wanted.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, wanted),
    };
    let local_matches = if ignore_case {
        local.eq_ignore_ascii_case(wanted_local)
    } else {
        local == wanted_local
    };
    // unprefixed attributes are in no namespace
    local_matches
        && match prefix {
            Some(prefix) => namespace.is_some() && scope.lookup_namespace_uri(Some(prefix)) == namespace,
            None => namespace.is_none(),
        }
}
