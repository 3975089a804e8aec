// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DTSX object tree
//!
//! This crate turns an SSIS package document (`.dtsx`) into a generic
//! object tree. It knows nothing about what tasks do: every element becomes
//! the same [`Node`] shape carrying its tag, attributes, absorbed properties,
//! text and children.
//!
//! ```text
//!     ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//!     │   .dtsx     │      │  roxmltree  │      │ ObjectTree  │
//!     │   (XML)     │─────▶│  Document   │─────▶│  (arena)    │
//!     └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use dessist_dtsx::{IngestOptions, ingest};
//!
//! let xml = r#"<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts">
//!     <DTS:Property DTS:Name="ObjectName">Package</DTS:Property>
//! </DTS:Executable>"#;
//! let tree = ingest(xml, &IngestOptions::default()).unwrap();
//! assert_eq!(tree.node(tree.root()).name.as_deref(), Some("Package"));
//! ```

#![deny(missing_docs)]

/// XML to object tree ingestion.
pub mod ingest;

/// Generic node model and arena.
pub mod node;

pub use ingest::{
    ContentPrecedence, IngestError, IngestOptions, IngestWarning, NAME_ATTRIBUTE, NAME_PROPERTY,
    PROPERTY_EXPRESSION_TAG, PROPERTY_TAG, ingest, ingest_element,
};
pub use node::{Node, NodeId, ObjectTree, local_name};
