// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! The permission tree
//!
//! Groups and permissions live in two arenas owned by [`PermissionTree`]. Groups own
//! their children by id; every node keeps a non-owning id back to its parent, which is
//! what rule inheritance climbs. Ids are only meaningful for the tree that issued them.
//!
//! ```
//! use core_permission::{Config, PermissionTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = PermissionTree::new();
//! let users = tree.add_group(tree.root(), "users")?;
//! let edit = tree.add_permission(users, "edit")?;
//!
//! let found = tree.find_permissions_from_path(&Config::new(), "users.edit")?;
//! assert_eq!(found, vec![edit]);
//! assert_eq!(tree.permission(edit).path(), "users.edit");
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::{DefinitionError, NotFoundReason};
use crate::group::PermissionGroup;
use crate::path::{PathTerminal, PermissionPath, RECURSIVE_WILDCARD, SEGMENT_SEPARATOR, WILDCARD};
use crate::permission::Permission;
use crate::rule::Rule;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handle of a group within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

impl GroupId {
    /// The root group of every tree
    pub const ROOT: Self = Self(0);

    /// Arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle of a permission within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionId(usize);

impl PermissionId {
    /// Arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A child of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// A sub-group
    Group(GroupId),
    /// A permission
    Permission(PermissionId),
}

/// Hierarchy of permission groups and permissions
///
/// Built once (single writer), then read by any number of concurrent checks.
#[derive(Debug, Clone)]
pub struct PermissionTree {
    groups: Vec<PermissionGroup>,
    permissions: Vec<Permission>,
}

impl Default for PermissionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionTree {
    /// A tree holding only the root group
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: vec![PermissionGroup::root()],
            permissions: Vec::new(),
        }
    }

    // ===== Access =====

    /// The root group
    #[must_use]
    pub const fn root(&self) -> GroupId {
        GroupId::ROOT
    }

    /// Group by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another tree and is out of range
    #[must_use]
    pub fn group(&self, id: GroupId) -> &PermissionGroup {
        &self.groups[id.0]
    }

    /// Group by id, `None` if out of range
    #[must_use]
    pub fn get_group(&self, id: GroupId) -> Option<&PermissionGroup> {
        self.groups.get(id.0)
    }

    /// Mutable group by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another tree and is out of range
    pub fn group_mut(&mut self, id: GroupId) -> &mut PermissionGroup {
        &mut self.groups[id.0]
    }

    /// Permission by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another tree and is out of range
    #[must_use]
    pub fn permission(&self, id: PermissionId) -> &Permission {
        &self.permissions[id.0]
    }

    /// Permission by id, `None` if out of range
    #[must_use]
    pub fn get_permission(&self, id: PermissionId) -> Option<&Permission> {
        self.permissions.get(id.0)
    }

    /// Mutable permission by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another tree and is out of range
    pub fn permission_mut(&mut self, id: PermissionId) -> &mut Permission {
        &mut self.permissions[id.0]
    }

    /// Number of permissions in the tree
    #[must_use]
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }

    /// Number of groups in the tree, including the root
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Child of `group` by key
    #[must_use]
    pub fn child(&self, group: GroupId, key: &str) -> Option<Node> {
        self.group(group).child(key)
    }

    /// `group` followed by its ancestors up to the root
    pub fn ancestry(&self, group: GroupId) -> impl Iterator<Item = &PermissionGroup> + '_ {
        core::iter::successors(Some(self.group(group)), move |g| {
            g.parent().map(|parent| self.group(parent))
        })
    }

    /// Ancestor groups of a permission, root first
    #[must_use]
    pub fn parents(&self, permission: PermissionId) -> Vec<GroupId> {
        let mut parents: Vec<GroupId> = self
            .ancestry(self.permission(permission).group())
            .map(PermissionGroup::id)
            .collect();
        parents.reverse();
        parents
    }

    // ===== Construction =====

    /// Add a sub-group to `parent`
    ///
    /// # Errors
    ///
    /// - `DefinitionError::InvalidKey` if the key is empty, dotted, or a wildcard
    /// - `DefinitionError::DuplicateKey` if `parent` already has a child with this key
    pub fn add_group(
        &mut self,
        parent: GroupId,
        key: impl Into<String>,
    ) -> Result<GroupId, DefinitionError> {
        let key = key.into();
        let path = self.child_path(parent, &key)?;
        let id = GroupId(self.groups.len());
        self.groups
            .push(PermissionGroup::new(id, Some(key.clone()), Some(parent), Some(path)));
        self.group_mut(parent).insert_group(key, id);
        Ok(id)
    }

    /// Add a permission to `group`
    ///
    /// # Errors
    ///
    /// - `DefinitionError::InvalidKey` if the key is empty, dotted, or a wildcard
    /// - `DefinitionError::DuplicateKey` if `group` already has a child with this key
    pub fn add_permission(
        &mut self,
        group: GroupId,
        key: impl Into<String>,
    ) -> Result<PermissionId, DefinitionError> {
        let key = key.into();
        let path = self.child_path(group, &key)?;
        let id = PermissionId(self.permissions.len());
        self.permissions
            .push(Permission::new(id, group, key.clone(), path));
        self.group_mut(group).insert_permission(key, id);
        Ok(id)
    }

    /// Define a global rule on `group`, inherited by every permission below it
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::DuplicateRule` if `group` or any ancestor already
    /// defines a rule with the same key
    pub fn define_rule(&mut self, group: GroupId, rule: Rule) -> Result<Arc<Rule>, DefinitionError> {
        if self
            .ancestry(group)
            .any(|g| g.defined_rules().contains_key(rule.key()))
        {
            return Err(DefinitionError::DuplicateRule {
                key: rule.key().to_string(),
            });
        }
        let rule = Arc::new(rule);
        self.group_mut(group).insert_rule(Arc::clone(&rule));
        Ok(rule)
    }

    fn child_path(&self, parent: GroupId, key: &str) -> Result<String, DefinitionError> {
        if key.is_empty()
            || key.contains(SEGMENT_SEPARATOR)
            || key == WILDCARD
            || key == RECURSIVE_WILDCARD
        {
            return Err(DefinitionError::InvalidKey {
                key: key.to_string(),
            });
        }

        let parent = self.group(parent);
        if parent.child(key).is_some() {
            return Err(DefinitionError::DuplicateKey {
                key: key.to_string(),
            });
        }

        Ok(match parent.path() {
            Some(prefix) => format!("{prefix}{SEGMENT_SEPARATOR}{key}"),
            None => key.to_string(),
        })
    }

    // ===== Rules =====

    /// Global rules visible from `group`: its own and every ancestor's
    #[must_use]
    pub fn all_defined_rules(&self, group: GroupId) -> BTreeMap<String, Arc<Rule>> {
        let mut rules = BTreeMap::new();
        for g in self.ancestry(group) {
            for (key, rule) in g.defined_rules() {
                rules.insert(key.clone(), Arc::clone(rule));
            }
        }
        rules
    }

    /// Resolve a global rule key as seen from `group`
    ///
    /// When the same key is defined at several levels, the outermost definition wins.
    #[must_use]
    pub fn resolve_rule(&self, group: GroupId, key: &str) -> Option<&Arc<Rule>> {
        self.ancestry(group)
            .filter_map(|g| g.defined_rules().get(key))
            .last()
    }

    // ===== Resolution =====

    /// Every permission in the subtree of `group`: its own first, then each
    /// sub-group's, recursively, in declaration order
    #[must_use]
    pub fn all_permissions(&self, group: GroupId) -> Vec<PermissionId> {
        let mut found = Vec::new();
        self.collect_permissions(group, &mut found);
        found
    }

    fn collect_permissions(&self, group: GroupId, found: &mut Vec<PermissionId>) {
        let group = self.group(group);
        found.extend_from_slice(group.permissions());
        for &sub_group in group.groups() {
            self.collect_permissions(sub_group, found);
        }
    }

    /// Resolve `path` from the root group
    ///
    /// # Errors
    ///
    /// See [`PermissionTree::find_permissions_from`]
    pub fn find_permissions_from_path(
        &self,
        config: &Config,
        path: &str,
    ) -> Result<Vec<PermissionId>, NotFoundReason> {
        self.find_permissions_from(self.root(), config, path)
    }

    /// Resolve `path` starting at `start`
    ///
    /// Exact paths resolve to one permission. Wildcard paths resolve to a list in
    /// declaration order, which is empty when the group holds no permissions.
    ///
    /// # Errors
    ///
    /// - `EmptyPath` for an empty path
    /// - `NamespaceMissing` / `NamespaceMismatch` per the namespace policy
    /// - `MisplacedWildcard` for a wildcard that does not end the path
    /// - `UnknownSegment` when a key does not exist
    /// - `FoundTooEarly` when a permission is reached before the path ends
    /// - `NotAPermission` when an exact path ends on a group
    pub fn find_permissions_from(
        &self,
        start: GroupId,
        config: &Config,
        path: &str,
    ) -> Result<Vec<PermissionId>, NotFoundReason> {
        if path.is_empty() {
            return Err(NotFoundReason::EmptyPath);
        }

        let parsed = PermissionPath::parse(config.strip_namespace(path)?)?;

        let mut current = Node::Group(start);
        for segment in parsed.segments() {
            let Node::Group(group) = current else {
                return Err(NotFoundReason::FoundTooEarly {
                    path: path.to_string(),
                });
            };
            current = self
                .child(group, segment)
                .ok_or_else(|| NotFoundReason::UnknownSegment {
                    path: path.to_string(),
                    segment: (*segment).to_string(),
                })?;
        }

        match (current, parsed.terminal()) {
            (Node::Permission(permission), PathTerminal::Exact) => Ok(vec![permission]),
            (Node::Permission(_), _) => Err(NotFoundReason::FoundTooEarly {
                path: path.to_string(),
            }),
            (Node::Group(_), PathTerminal::Exact) => Err(NotFoundReason::NotAPermission {
                path: path.to_string(),
            }),
            (Node::Group(group), PathTerminal::Children) => {
                Ok(self.group(group).permissions().to_vec())
            }
            (Node::Group(group), PathTerminal::Subtree) => Ok(self.all_permissions(group)),
        }
    }

    // ===== Paths =====

    /// Path of a permission qualified with the configured namespace
    #[must_use]
    pub fn path_with_namespace(&self, config: &Config, permission: PermissionId) -> String {
        config.qualify(self.permission(permission).path())
    }

    /// Groups in creation order, root first
    pub fn groups(&self) -> impl Iterator<Item = &PermissionGroup> + '_ {
        self.groups.iter()
    }

    /// Permissions in creation order
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.permissions.iter()
    }
}
