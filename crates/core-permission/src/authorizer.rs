// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Check orchestration
//!
//! [`PermissionAuthorizer`] evaluates permissions of one tree under one configuration.
//! A single permission passes through five gates, in this order, stopping at the
//! first failure:
//!
//! 1. **Context**: a permission restricted to contexts needs the caller in one of them
//! 2. **Grant**: the caller must hold the permission's path (per the namespace policy)
//! 3. **Dependencies**: every dependency is resolved and checked recursively
//! 4. **Included rules**: referenced global rules, each with its own object typing
//! 5. **Own rules**: local rules, typed against the permission's required object types
//!
//! Wildcard paths fan out over every resolved permission. Siblings the caller simply
//! does not hold are tolerated; any other failure aborts the whole check.

use crate::config::Config;
use crate::error::{
    CheckError, DefinitionError, DenialCode, NotFoundReason, PermissionDenied, Result,
};
use crate::identity::Identity;
use crate::object::Object;
use crate::path::contains_wildcard;
use crate::permission::Permission;
use crate::rule::RuleExecution;
use crate::tree::{PermissionId, PermissionTree};
use std::sync::Arc;

/// Evaluates checks against a tree (SRP - separate from tree construction)
#[derive(Debug, Clone, Copy)]
pub struct PermissionAuthorizer<'a> {
    tree: &'a PermissionTree,
    config: &'a Config,
}

impl<'a> PermissionAuthorizer<'a> {
    /// Create an authorizer over `tree`
    #[must_use]
    pub const fn new(tree: &'a PermissionTree, config: &'a Config) -> Self {
        Self { tree, config }
    }

    /// Check a single, already resolved permission
    ///
    /// On success returns this permission followed by the results of its dependency
    /// checks, in declaration order. Duplicates are kept when dependency graphs overlap.
    ///
    /// Dependency cycles are not detected: a cyclic configuration recurses until the
    /// stack is exhausted. Keeping dependency graphs acyclic is the schema author's
    /// responsibility.
    ///
    /// # Errors
    ///
    /// - `Denied` with `NotInContext`, `PermissionNotGranted`, `RuleNotSatisfied` or
    ///   `IncludedRuleNotSatisfied`; dependency denials are returned unchanged
    /// - `InvalidObject` if the object type is not accepted
    /// - `PermissionNotFound` if a dependency path does not resolve
    /// - `Definition` if an included rule is not defined in any ancestor group
    pub fn check(
        &self,
        permission: PermissionId,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Vec<PermissionId>> {
        let node = self.tree.permission(permission);
        let target = self.config.log_target();

        if !node.allows_contexts(identity.contexts()) {
            log::info!(
                target: target,
                "`{}` not granted to {} because not in context",
                node.path(),
                identity.description()
            );
            let message = format!(
                "Permission '{}' cannot be granted in the {} context(s). Only allowed for {}.",
                node.path(),
                join(identity.contexts().iter()),
                join(node.contexts().iter())
            );
            return Err(self.deny(DenialCode::NotInContext, node, identity, object, None, message));
        }

        if !self
            .config
            .is_granted(identity.granted_permissions(), node.path())
        {
            log::info!(
                target: target,
                "`{}` not granted to {}",
                node.path(),
                identity.description()
            );
            let message = format!(
                "User has not been granted the '{}' permission",
                node.path()
            );
            return Err(self.deny(
                DenialCode::PermissionNotGranted,
                node,
                identity,
                object,
                None,
                message,
            ));
        }

        let mut granted = vec![permission];
        for dependency in node.dependencies() {
            log::debug!(
                target: target,
                "`{}` has a dependency of `{}`",
                node.path(),
                dependency
            );
            for resolved in self.tree.find_permissions_from_path(self.config, dependency)? {
                granted.extend(self.check(resolved, identity, object)?);
            }
        }

        if let Some(execution) = self.first_unsatisfied_included_rule(permission, identity, object)? {
            return Err(self.deny_rule(
                DenialCode::IncludedRuleNotSatisfied,
                node,
                identity,
                object,
                execution,
            ));
        }

        if let Some(execution) = self.first_unsatisfied_rule(permission, identity, object)? {
            return Err(self.deny_rule(
                DenialCode::RuleNotSatisfied,
                node,
                identity,
                object,
                execution,
            ));
        }

        log::info!(
            target: target,
            "`{}` granted to {}",
            node.path(),
            identity.description()
        );
        Ok(granted)
    }

    /// Resolve `path` and check every permission it names
    ///
    /// - no match (empty wildcard expansion): `NoPermissionsFound`
    /// - one match: exactly [`PermissionAuthorizer::check`]
    /// - several matches: each is checked; `PermissionNotGranted` denials of the
    ///   matched permissions themselves are counted, any other failure aborts. If every
    ///   match was not granted the result is an aggregate `PermissionNotGranted`,
    ///   otherwise the concatenated results of the granted matches.
    ///
    /// # Errors
    ///
    /// See above and [`PermissionAuthorizer::check`]
    pub fn check_path(
        &self,
        path: &str,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Vec<PermissionId>> {
        let permissions = self.tree.find_permissions_from_path(self.config, path)?;
        match permissions.as_slice() {
            [] => Err(CheckError::NoPermissionsFound {
                path: path.to_string(),
            }),
            [single] => self.check(*single, identity, object),
            [first, ..] => self.check_each(*first, &permissions, identity, object),
        }
    }

    fn check_each(
        &self,
        first: PermissionId,
        permissions: &[PermissionId],
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Vec<PermissionId>> {
        let mut granted = Vec::new();
        let mut ungranted = 0;

        for &permission in permissions {
            match self.check(permission, identity, object) {
                Ok(found) => granted.extend(found),
                Err(CheckError::Denied(denied))
                    if denied.code == DenialCode::PermissionNotGranted
                        && denied.permission == Some(permission) =>
                {
                    ungranted += 1;
                }
                Err(err) => return Err(err),
            }
        }

        log::debug!(
            target: self.config.log_target(),
            "{} of {} matched permissions not granted to {}",
            ungranted,
            permissions.len(),
            identity.description()
        );

        if ungranted == permissions.len() {
            let message = format!(
                "User does not have any of the permissions {}",
                join(permissions.iter().map(|&p| self.tree.permission(p).path()))
            );
            return Err(self.deny(
                DenialCode::PermissionNotGranted,
                self.tree.permission(first),
                identity,
                object,
                None,
                message,
            ));
        }

        Ok(granted)
    }

    /// Test a literal path against the caller's grants, without consulting the tree
    ///
    /// # Errors
    ///
    /// - `PermissionNotFound(WildcardNotAllowed)` if the path contains a wildcard
    /// - `Denied(PermissionNotGranted)` if the path is not granted
    pub fn check_unstrict(&self, path: &str, identity: &dyn Identity) -> Result<()> {
        if contains_wildcard(path) {
            return Err(NotFoundReason::WildcardNotAllowed {
                path: path.to_string(),
            }
            .into());
        }

        if identity.granted_permissions().contains(path) {
            return Ok(());
        }

        log::info!(
            target: self.config.log_target(),
            "`{}` not granted to {}",
            path,
            identity.description()
        );
        Err(PermissionDenied {
            code: DenialCode::PermissionNotGranted,
            message: format!("User has not been granted the '{path}' permission"),
            permission: None,
            path: path.to_string(),
            user: identity.user().clone(),
            object: Object::none(),
            rule: None,
        }
        .into())
    }

    /// First included rule of `permission` that is not satisfied
    ///
    /// Inclusions whose condition is false are skipped. The object is translated
    /// before typing and evaluation.
    ///
    /// # Errors
    ///
    /// - `Definition(UndefinedRule)` if no ancestor group defines the rule
    /// - `InvalidObject` if the translated object's type is not accepted by the rule
    pub fn first_unsatisfied_included_rule(
        &self,
        permission: PermissionId,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Option<RuleExecution>> {
        let node = self.tree.permission(permission);
        let user = identity.user();

        for included in node.included_rules() {
            if !included.applies(user, object) {
                continue;
            }

            let translated = included.translate_object(object);

            let rule = self
                .tree
                .resolve_rule(node.group(), included.key())
                .ok_or_else(|| DefinitionError::UndefinedRule {
                    key: included.key().to_string(),
                    permission: node.path().to_string(),
                })?;

            if !translated.is_one_of(rule.required_object_types()) {
                return Err(CheckError::InvalidObject {
                    target: format!("included rule ({}) for {}", rule.key(), node.path()),
                    found: translated.type_name().to_string(),
                    expected: rule.required_object_types().to_vec(),
                });
            }

            let mut execution = RuleExecution::new(Arc::clone(rule), user.clone(), translated);
            if !execution.satisfied() {
                return Ok(Some(execution));
            }
        }

        Ok(None)
    }

    /// First local rule of `permission` that is not satisfied
    ///
    /// # Errors
    ///
    /// Returns `InvalidObject` if the permission requires object types and the
    /// object is not one of them
    pub fn first_unsatisfied_rule(
        &self,
        permission: PermissionId,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Option<RuleExecution>> {
        let node = self.tree.permission(permission);

        if !node.accepts(object) {
            return Err(CheckError::InvalidObject {
                target: format!("permission check for {}", node.path()),
                found: object.type_name().to_string(),
                expected: node.required_object_types().to_vec(),
            });
        }

        for rule in node.rules() {
            let mut execution =
                RuleExecution::new(Arc::clone(rule), identity.user().clone(), object.clone());
            if !execution.satisfied() {
                return Ok(Some(execution));
            }
        }

        Ok(None)
    }

    fn deny_rule(
        &self,
        code: DenialCode,
        node: &Permission,
        identity: &dyn Identity,
        object: &Object,
        execution: RuleExecution,
    ) -> CheckError {
        log::info!(
            target: self.config.log_target(),
            "`{}` not granted to {} because rule `{}` was not satisfied",
            node.path(),
            identity.description(),
            execution.rule().key()
        );
        let message = format!(
            "Rule {} (on {}) was not satisfied.",
            execution.rule().key(),
            node.path()
        );
        self.deny(code, node, identity, object, Some(execution), message)
    }

    fn deny(
        &self,
        code: DenialCode,
        node: &Permission,
        identity: &dyn Identity,
        object: &Object,
        rule: Option<RuleExecution>,
        message: String,
    ) -> CheckError {
        PermissionDenied {
            code,
            message,
            permission: Some(node.id()),
            path: node.path().to_string(),
            user: identity.user().clone(),
            object: object.clone(),
            rule,
        }
        .into()
    }
}

/// Types that can authorize a permission path (DIP - integrations depend on this)
pub trait Authorizer {
    /// Strictly check `path`, returning the bare paths of every satisfied permission
    ///
    /// # Errors
    ///
    /// Any [`CheckError`]
    fn authorize(&self, path: &str, identity: &dyn Identity, object: &Object)
        -> Result<Vec<String>>;

    /// Boolean form of [`Authorizer::authorize`]
    ///
    /// Only denials become `false`; every other error is returned.
    ///
    /// # Errors
    ///
    /// Any non-denial [`CheckError`]
    fn is_allowed(&self, path: &str, identity: &dyn Identity, object: &Object) -> Result<bool> {
        match self.authorize(path, identity, object) {
            Ok(_) => Ok(true),
            Err(CheckError::Denied(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<'a> Authorizer for PermissionAuthorizer<'a> {
    fn authorize(
        &self,
        path: &str,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Vec<String>> {
        Ok(self
            .check_path(path, identity, object)?
            .into_iter()
            .map(|p| self.tree.permission(p).path().to_string())
            .collect())
    }
}

fn join<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> String {
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
