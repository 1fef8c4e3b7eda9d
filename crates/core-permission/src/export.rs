// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Flat export of a permission tree
//!
//! The export maps every group and permission, keyed by its namespace-qualified path,
//! to a small descriptor. It exists for documentation and tooling; checks never read it.
//! Keys are sorted, so the TOML output is stable.

use crate::config::Config;
use crate::error::DefinitionError;
use crate::tree::PermissionTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Export map: qualified path to descriptor
pub type Export = BTreeMap<String, ExportEntry>;

/// Kind of an exported node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A permission group
    Group,
    /// A permission
    Permission,
}

/// Descriptor of one exported node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    /// Group or permission
    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Display name (groups only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description; permissions fall back to their path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Bare path of the owning group, `None` directly under the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Walk `tree` and build its export under `config`'s namespace
#[must_use]
pub fn export(tree: &PermissionTree, config: &Config) -> Export {
    let mut entries = Export::new();

    for group in tree.groups() {
        let Some(path) = group.path() else {
            continue;
        };
        let parent = group
            .parent()
            .and_then(|parent| tree.group(parent).path())
            .map(str::to_string);
        entries.insert(
            config.qualify(path),
            ExportEntry {
                kind: NodeKind::Group,
                name: group.name().map(str::to_string),
                description: group.description().map(str::to_string),
                parent,
            },
        );
    }

    for permission in tree.permissions() {
        entries.insert(
            config.qualify(permission.path()),
            ExportEntry {
                kind: NodeKind::Permission,
                name: None,
                description: Some(permission.description().to_string()),
                parent: tree.group(permission.group()).path().map(str::to_string),
            },
        );
    }

    entries
}

/// Serialize an export to TOML
///
/// # Errors
///
/// Returns `DefinitionError::Serialization` if TOML serialization fails
pub fn to_toml(export: &Export) -> Result<String, DefinitionError> {
    toml::to_string(export).map_err(|e| DefinitionError::Serialization(e.to_string()))
}

/// Parse an export previously written by [`to_toml`]
///
/// # Errors
///
/// Returns `DefinitionError::Serialization` if the input is not a valid export
pub fn from_toml(toml_str: &str) -> Result<Export, DefinitionError> {
    toml::from_str(toml_str).map_err(|e| DefinitionError::Serialization(e.to_string()))
}
