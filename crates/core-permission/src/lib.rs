// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # core-permission
//!
//! Hierarchical permission schemas and the engine that checks them.
//!
//! This crate provides:
//! - A permission tree of groups and permissions addressed by dotted paths
//! - Path resolution with trailing `*` (direct children) and `**.*` (whole subtree)
//!   wildcards, and an optional application namespace prefix
//! - Rules: local predicates, global rules inherited down the tree, and included
//!   rules with conditions and object translation
//! - Single and multi-permission checks with context, grant, dependency, and rule gates
//! - Schemas with atomic reload, a flat export, and a process-wide schema lookup
//!
//! ## Example
//!
//! ```
//! use core_permission::{CheckMode, Config, Object, Rule, Schema, UserProxy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut schema = Schema::with_config(Config::new())?;
//! let tree = schema.tree_mut();
//! let projects = tree.add_group(tree.root(), "projects")?;
//! let delete = tree.add_permission(projects, "delete")?;
//! tree.permission_mut(delete).add_rule(Rule::new("owner", |user, object, _| {
//!     match (user.downcast_ref::<&str>(), object.downcast_ref::<&str>()) {
//!         (Some(user), Some(owner)) => user == owner,
//!         _ => false,
//!     }
//! }))?;
//!
//! let alice = UserProxy::new(Object::new("alice")).grant("projects.delete");
//! assert!(schema.can("projects.delete", &alice, &Object::new("alice"), CheckMode::Strict)?);
//! assert!(!schema.can("projects.delete", &alice, &Object::new("bob"), CheckMode::Strict)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Outcomes are reported through the [`log`](https://docs.rs/log) facade under
//! [`Config::log_target`]. The crate never installs a logger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorizer;
pub mod config;
pub mod error;
pub mod export;
pub mod global;
pub mod group;
pub mod identity;
pub mod object;
pub mod path;
pub mod permission;
pub mod rule;
pub mod schema;
pub mod tree;

pub use authorizer::{Authorizer, PermissionAuthorizer};
pub use config::{Config, NamespacePolicy, DEFAULT_LOG_TARGET, DEFAULT_NAMESPACE_DELIMITER};
/// Re-export commonly used types
pub use error::{
    CheckError, DefinitionError, DenialCode, NotFoundReason, PermissionDenied, Result,
};
pub use export::{Export, ExportEntry, NodeKind};
pub use global::CheckOptions;
pub use group::PermissionGroup;
pub use identity::{Identity, ProxyFactory, Subject, UserProxy};
pub use object::{Object, ObjectType};
pub use path::{PathTerminal, PermissionPath};
pub use permission::Permission;
pub use rule::{Annotations, IncludedRule, Rule, RuleExecution};
pub use schema::{CheckMode, Granted, Schema, SchemaLoader};
pub use tree::{GroupId, Node, PermissionId, PermissionTree};
