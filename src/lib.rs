// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # p47h-permissions
//!
//! Hierarchical permission schemas for applications.
//!
//! Permissions live in a tree of groups and are addressed by dotted paths such as
//! `projects.settings.edit`. A check runs a permission through its context
//! restriction, the caller's grants, its dependencies, and its rules.
//!
//! ## Quick Start
//!
//! ```rust
//! use p47h_permissions::{CheckMode, Object, Schema, UserProxy};
//!
//! let mut schema = Schema::new();
//! let tree = schema.tree_mut();
//! let users = tree.add_group(tree.root(), "users").unwrap();
//! tree.add_permission(users, "change_password").unwrap();
//!
//! let alice = UserProxy::new(Object::new("alice")).grant("users.change_password");
//! assert!(schema
//!     .can("users.change_password", &alice, &Object::none(), CheckMode::Strict)
//!     .unwrap());
//! ```
//!
//! ## Architecture
//!
//! This facade crate re-exports:
//!
//! - [`permission`] - the schema and check engine (from `core-permission`)
//!
//! ## Wildcards
//!
//! - `users.*` checks every permission directly in `users`
//! - `users.**.*` checks every permission anywhere below `users`
//!
//! A wildcard check skips matched permissions the user has not been granted. Any
//! other failure on a match (context, dependency, rule) denies the whole check, and
//! the check is denied when no match is granted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Permission engine module.
///
/// Re-exports `core_permission` for schema construction and checks.
pub mod permission {
    pub use core_permission::*;
}

// Convenience re-exports at root level
pub use core_permission::{
    CheckError, CheckMode, Config, Identity, Object, Rule, Schema, UserProxy,
};
