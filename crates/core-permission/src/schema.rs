// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Schemas: a published permission tree plus its configuration
//!
//! A [`Schema`] is built once (single writer), then shared. Checks take an `Arc`
//! snapshot of the published tree and never hold the lock while they evaluate, so a
//! concurrent [`Schema::reload`] can never expose a partially built tree: the new
//! tree is completed off to the side and published with one pointer swap.
//!
//! ```
//! use core_permission::{CheckMode, DefinitionError, Object, PermissionTree, Schema, UserProxy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new();
//! schema.load(|tree: &mut PermissionTree| -> Result<(), DefinitionError> {
//!     let users = tree.add_group(tree.root(), "users")?;
//!     tree.add_permission(users, "change_password")?;
//!     Ok(())
//! })?;
//!
//! let alice = UserProxy::new(Object::new("alice")).grant("users.change_password");
//! let granted = schema.check_permission(
//!     "users.change_password",
//!     &alice,
//!     &Object::none(),
//!     CheckMode::Strict,
//! )?;
//! assert_eq!(granted.paths(), vec!["users.change_password".to_string()]);
//! # Ok(())
//! # }
//! ```

use crate::authorizer::{Authorizer, PermissionAuthorizer};
use crate::config::Config;
use crate::error::{CheckError, DefinitionError, Result};
use crate::export::{self, Export};
use crate::identity::Identity;
use crate::object::Object;
use crate::permission::Permission;
use crate::tree::{PermissionId, PermissionTree};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// How a path is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Resolve the path against the tree and run every gate
    #[default]
    Strict,
    /// Only test the literal path against the caller's grants
    Unstrict,
}

/// Successful outcome of a check
#[derive(Debug, Clone)]
pub enum Granted {
    /// A strict check: the satisfied permissions, in check order, duplicates kept
    Checked {
        /// Snapshot of the tree the ids belong to
        tree: Arc<PermissionTree>,
        /// Satisfied permissions
        permissions: Vec<PermissionId>,
    },
    /// An unstrict check: the literal path that was granted
    Unchecked {
        /// Path as given by the caller
        path: String,
    },
}

impl Granted {
    /// Ids of the satisfied permissions (empty for unstrict checks)
    #[must_use]
    pub fn permission_ids(&self) -> &[PermissionId] {
        match self {
            Self::Checked { permissions, .. } => permissions,
            Self::Unchecked { .. } => &[],
        }
    }

    /// The satisfied permission nodes (empty for unstrict checks)
    #[must_use]
    pub fn permissions(&self) -> Vec<&Permission> {
        match self {
            Self::Checked { tree, permissions } => {
                permissions.iter().map(|&p| tree.permission(p)).collect()
            }
            Self::Unchecked { .. } => Vec::new(),
        }
    }

    /// Bare paths of the satisfied permissions, or the literal unstrict path
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        match self {
            Self::Checked { tree, permissions } => permissions
                .iter()
                .map(|&p| tree.permission(p).path().to_string())
                .collect(),
            Self::Unchecked { path } => vec![path.clone()],
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Checked { permissions, .. } => permissions.len(),
            Self::Unchecked { .. } => 1,
        }
    }

    /// Whether no permission was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the bare `path` is among the satisfied permissions
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths().iter().any(|p| p == path)
    }
}

/// Builds a permission tree from scratch
///
/// Closures `Fn(&mut PermissionTree) -> Result<(), DefinitionError>` are loaders.
pub trait SchemaLoader: Send + Sync {
    /// Populate an empty tree
    ///
    /// # Errors
    ///
    /// Any [`DefinitionError`] raised while defining the schema
    fn load(&self, tree: &mut PermissionTree) -> core::result::Result<(), DefinitionError>;
}

impl<F> SchemaLoader for F
where
    F: Fn(&mut PermissionTree) -> core::result::Result<(), DefinitionError> + Send + Sync,
{
    fn load(&self, tree: &mut PermissionTree) -> core::result::Result<(), DefinitionError> {
        self(tree)
    }
}

/// A permission tree, its configuration, and how to rebuild it
pub struct Schema {
    config: Config,
    root: RwLock<Arc<PermissionTree>>,
    loader: RwLock<Option<Arc<dyn SchemaLoader>>>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree();
        f.debug_struct("Schema")
            .field("config", &self.config)
            .field("groups", &tree.group_count())
            .field("permissions", &tree.permission_count())
            .field("loaded", &self.loader.read().is_some())
            .finish()
    }
}

impl Schema {
    /// An empty schema with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(Config::new())
    }

    /// An empty schema with `config`
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidConfig` if `config` fails [`Config::validate`].
    pub fn with_config(config: Config) -> core::result::Result<Self, DefinitionError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: Config) -> Self {
        Self {
            config,
            root: RwLock::new(Arc::new(PermissionTree::new())),
            loader: RwLock::new(None),
        }
    }

    // ===== Configuration =====

    /// The configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Adjust the configuration
    ///
    /// Export keys follow the namespace, so entries exported afterwards are re-keyed.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidConfig` if the adjusted configuration fails
    /// [`Config::validate`]. The previous configuration stays in place.
    pub fn configure<F>(&mut self, f: F) -> core::result::Result<&mut Self, DefinitionError>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.clone();
        f(&mut config);
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    // ===== Tree =====

    /// Snapshot of the published tree
    #[must_use]
    pub fn tree(&self) -> Arc<PermissionTree> {
        Arc::clone(&self.root.read())
    }

    /// Mutable access to the published tree during the single-writer build phase
    ///
    /// If snapshots are still alive the tree is cloned first; they keep seeing the
    /// old one.
    pub fn tree_mut(&mut self) -> &mut PermissionTree {
        Arc::make_mut(self.root.get_mut())
    }

    /// Publish a tree built by the caller
    pub fn replace(&self, tree: PermissionTree) {
        self.publish(tree);
    }

    /// Build a fresh tree through `loader`, publish it, and remember the loader
    ///
    /// On failure nothing is published and the previous loader is kept.
    ///
    /// # Errors
    ///
    /// Any [`DefinitionError`] returned by the loader
    pub fn load<L>(&self, loader: L) -> core::result::Result<(), DefinitionError>
    where
        L: SchemaLoader + 'static,
    {
        let loader: Arc<dyn SchemaLoader> = Arc::new(loader);
        self.publish(Self::build(loader.as_ref())?);
        *self.loader.write() = Some(loader);
        Ok(())
    }

    /// Rebuild the tree through the remembered loader and publish it
    ///
    /// # Errors
    ///
    /// - `DefinitionError::NotLoaded` if the schema was never loaded
    /// - any [`DefinitionError`] returned by the loader; the old tree stays published
    pub fn reload(&self) -> core::result::Result<(), DefinitionError> {
        let loader = self
            .loader
            .read()
            .clone()
            .ok_or(DefinitionError::NotLoaded)?;
        self.publish(Self::build(loader.as_ref())?);
        Ok(())
    }

    fn build(loader: &dyn SchemaLoader) -> core::result::Result<PermissionTree, DefinitionError> {
        let mut tree = PermissionTree::new();
        loader.load(&mut tree)?;
        Ok(tree)
    }

    fn publish(&self, tree: PermissionTree) {
        log::info!(
            target: self.config.log_target(),
            "Loaded permission schema ({} groups, {} permissions)",
            tree.group_count() - 1,
            tree.permission_count()
        );
        *self.root.write() = Arc::new(tree);
    }

    // ===== Checks =====

    /// Check `path` for an identity
    ///
    /// # Errors
    ///
    /// Strict: see [`PermissionAuthorizer::check_path`].
    /// Unstrict: see [`PermissionAuthorizer::check_unstrict`].
    pub fn check_permission(
        &self,
        path: &str,
        identity: &dyn Identity,
        object: &Object,
        mode: CheckMode,
    ) -> Result<Granted> {
        let tree = self.tree();
        let authorizer = PermissionAuthorizer::new(&tree, &self.config);
        match mode {
            CheckMode::Strict => {
                let permissions = authorizer.check_path(path, identity, object)?;
                Ok(Granted::Checked { tree, permissions })
            }
            CheckMode::Unstrict => {
                authorizer.check_unstrict(path, identity)?;
                Ok(Granted::Unchecked {
                    path: path.to_string(),
                })
            }
        }
    }

    /// Check `path` for a raw user, adapted through the configured proxy factory
    ///
    /// # Errors
    ///
    /// See [`Schema::check_permission`]
    pub fn check_user(
        &self,
        path: &str,
        user: &Object,
        object: &Object,
        mode: CheckMode,
    ) -> Result<Granted> {
        let proxy = self.config.user_proxy().adapt(user);
        self.check_permission(path, &proxy, object, mode)
    }

    /// Boolean form of [`Schema::check_permission`]
    ///
    /// # Errors
    ///
    /// Every error except a denial
    pub fn can(
        &self,
        path: &str,
        identity: &dyn Identity,
        object: &Object,
        mode: CheckMode,
    ) -> Result<bool> {
        denial_to_false(self.check_permission(path, identity, object, mode))
    }

    /// Boolean form of [`Schema::check_user`]
    ///
    /// # Errors
    ///
    /// Every error except a denial
    pub fn can_user(
        &self,
        path: &str,
        user: &Object,
        object: &Object,
        mode: CheckMode,
    ) -> Result<bool> {
        denial_to_false(self.check_user(path, user, object, mode))
    }

    // ===== Export =====

    /// Flat export of the published tree, keyed by namespace-qualified path
    #[must_use]
    pub fn export(&self) -> Export {
        export::export(&self.tree(), &self.config)
    }

    /// [`Schema::export`] as TOML
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::Serialization` if serialization fails
    pub fn export_toml(&self) -> core::result::Result<String, DefinitionError> {
        export::to_toml(&self.export())
    }
}

impl Authorizer for Schema {
    fn authorize(
        &self,
        path: &str,
        identity: &dyn Identity,
        object: &Object,
    ) -> Result<Vec<String>> {
        Ok(self
            .check_permission(path, identity, object, CheckMode::Strict)?
            .paths())
    }
}

pub(crate) fn denial_to_false(result: Result<Granted>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(CheckError::Denied(_)) => Ok(false),
        Err(err) => Err(err),
    }
}
