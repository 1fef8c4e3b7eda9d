// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Permission nodes

use crate::error::DefinitionError;
use crate::object::Object;
use crate::path::validate_definition_path;
use crate::rule::{IncludedRule, Rule};
use crate::tree::{GroupId, PermissionId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A checkable capability, addressed by its dotted path
///
/// Permissions are created through [`PermissionTree::add_permission`] and configured
/// through [`PermissionTree::permission_mut`].
///
/// [`PermissionTree::add_permission`]: crate::tree::PermissionTree::add_permission
/// [`PermissionTree::permission_mut`]: crate::tree::PermissionTree::permission_mut
#[derive(Debug, Clone)]
pub struct Permission {
    id: PermissionId,
    key: String,
    group: GroupId,
    path: String,
    description: Option<String>,
    dependencies: Vec<String>,
    required_object_types: Vec<String>,
    contexts: Vec<String>,
    rules: Vec<Arc<Rule>>,
    included_rules: Vec<IncludedRule>,
}

impl Permission {
    pub(crate) fn new(id: PermissionId, group: GroupId, key: String, path: String) -> Self {
        Self {
            id,
            key,
            group,
            path,
            description: None,
            dependencies: Vec::new(),
            required_object_types: Vec::new(),
            contexts: Vec::new(),
            rules: Vec::new(),
            included_rules: Vec::new(),
        }
    }

    // ===== Accessors =====

    /// Handle of this permission in its tree
    #[must_use]
    pub const fn id(&self) -> PermissionId {
        self.id
    }

    /// Key within the owning group
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Owning group
    #[must_use]
    pub const fn group(&self) -> GroupId {
        self.group
    }

    /// Full dotted path, without namespace
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Description, defaulting to the path
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.path)
    }

    /// Paths of the permissions this one depends on
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Object type names accepted by the own-rule gate
    #[must_use]
    pub fn required_object_types(&self) -> &[String] {
        &self.required_object_types
    }

    /// Context tags this permission is restricted to
    #[must_use]
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    /// Local rules, in declaration order
    #[must_use]
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Local rule by key
    #[must_use]
    pub fn rule(&self, key: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|rule| rule.key() == key)
    }

    /// Included rules, in declaration order
    #[must_use]
    pub fn included_rules(&self) -> &[IncludedRule] {
        &self.included_rules
    }

    // ===== Construction =====

    /// Set the description
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Depend on the permission at `path`
    ///
    /// The path is resolved when this permission is checked. Returns `Ok(false)` if
    /// the dependency was already present.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::MisplacedWildcard` if a wildcard is not at the end
    pub fn add_dependency(&mut self, path: impl Into<String>) -> Result<bool, DefinitionError> {
        let path = path.into();
        validate_definition_path(&path)?;
        if self.dependencies.contains(&path) {
            return Ok(false);
        }
        self.dependencies.push(path);
        Ok(true)
    }

    /// Accept objects of this type name, returning `false` if already accepted
    pub fn add_required_object_type(&mut self, type_name: impl Into<String>) -> bool {
        let type_name = type_name.into();
        if self.required_object_types.contains(&type_name) {
            return false;
        }
        self.required_object_types.push(type_name);
        true
    }

    /// Restrict to a context, returning `false` if already present
    pub fn add_context(&mut self, context: impl Into<String>) -> bool {
        let context = context.into();
        if self.contexts.contains(&context) {
            return false;
        }
        self.contexts.push(context);
        true
    }

    /// Remove every context restriction, returning how many were removed
    pub fn remove_all_contexts(&mut self) -> usize {
        let removed = self.contexts.len();
        self.contexts.clear();
        removed
    }

    /// Add a local rule
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::DuplicateRule` if a local rule with the same key exists
    pub fn add_rule(&mut self, rule: Rule) -> Result<Arc<Rule>, DefinitionError> {
        if self.rule(rule.key()).is_some() {
            return Err(DefinitionError::DuplicateRule {
                key: rule.key().to_string(),
            });
        }
        let rule = Arc::new(rule);
        self.rules.push(Arc::clone(&rule));
        Ok(rule)
    }

    /// Include a global rule
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::DuplicateInclusion` if the key is already included
    pub fn include_rule(&mut self, included: IncludedRule) -> Result<(), DefinitionError> {
        if self
            .included_rules
            .iter()
            .any(|existing| existing.key() == included.key())
        {
            return Err(DefinitionError::DuplicateInclusion {
                key: included.key().to_string(),
                permission: self.path.clone(),
            });
        }
        self.included_rules.push(included);
        Ok(())
    }

    // ===== Gates =====

    /// Whether the caller's contexts satisfy this permission's context restriction
    #[must_use]
    pub fn allows_contexts(&self, contexts: &BTreeSet<String>) -> bool {
        self.contexts.is_empty() || self.contexts.iter().any(|c| contexts.contains(c))
    }

    /// Whether `object` has one of the required object types
    #[must_use]
    pub fn accepts(&self, object: &Object) -> bool {
        object.is_one_of(&self.required_object_types)
    }
}
