// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Permission group nodes

use crate::rule::Rule;
use crate::tree::{GroupId, Node, PermissionId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Internal tree node holding sub-groups, permissions and global rules
///
/// Children are kept in declaration order; a key names at most one child, whether it
/// is a group or a permission.
#[derive(Debug, Clone)]
pub struct PermissionGroup {
    id: GroupId,
    key: Option<String>,
    parent: Option<GroupId>,
    path: Option<String>,
    name: Option<String>,
    description: Option<String>,
    groups: Vec<GroupId>,
    permissions: Vec<PermissionId>,
    children: BTreeMap<String, Node>,
    defined_rules: BTreeMap<String, Arc<Rule>>,
}

impl PermissionGroup {
    pub(crate) fn root() -> Self {
        Self::new(GroupId::ROOT, None, None, None)
    }

    pub(crate) fn new(
        id: GroupId,
        key: Option<String>,
        parent: Option<GroupId>,
        path: Option<String>,
    ) -> Self {
        Self {
            id,
            key,
            parent,
            path,
            name: None,
            description: None,
            groups: Vec::new(),
            permissions: Vec::new(),
            children: BTreeMap::new(),
            defined_rules: BTreeMap::new(),
        }
    }

    /// Handle of this group in its tree
    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    /// Key within the parent, `None` for the root
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Parent group, `None` for the root
    #[must_use]
    pub const fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Full dotted path, `None` for the root
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Whether this is the root group
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Set the display name
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sub-groups, in declaration order
    #[must_use]
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    /// Direct permissions, in declaration order
    #[must_use]
    pub fn permissions(&self) -> &[PermissionId] {
        &self.permissions
    }

    /// Child group or permission by key
    #[must_use]
    pub fn child(&self, key: &str) -> Option<Node> {
        self.children.get(key).copied()
    }

    /// Global rules defined on this group (not its ancestors)
    #[must_use]
    pub const fn defined_rules(&self) -> &BTreeMap<String, Arc<Rule>> {
        &self.defined_rules
    }

    pub(crate) fn insert_group(&mut self, key: String, group: GroupId) {
        self.children.insert(key, Node::Group(group));
        self.groups.push(group);
    }

    pub(crate) fn insert_permission(&mut self, key: String, permission: PermissionId) {
        self.children.insert(key, Node::Permission(permission));
        self.permissions.push(permission);
    }

    pub(crate) fn insert_rule(&mut self, rule: Arc<Rule>) {
        self.defined_rules.insert(rule.key().to_string(), rule);
    }
}
