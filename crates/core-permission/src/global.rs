// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Process-wide schema lookup
//!
//! Applications with one schema can register it as the [`instance`]; request scoped
//! code can additionally point [`current`] at the schema in use. Checks made through
//! this module pick, in order: the schema given in [`CheckOptions`], the current
//! schema, the instance.

use crate::error::{DefinitionError, Result};
use crate::object::Object;
use crate::schema::{denial_to_false, CheckMode, Granted, Schema};
use parking_lot::{const_rwlock, RwLock};
use std::sync::Arc;

static INSTANCE: RwLock<Option<Arc<Schema>>> = const_rwlock(None);
static CURRENT: RwLock<Option<Arc<Schema>>> = const_rwlock(None);

/// Register (or clear) the process-wide schema instance
pub fn set_instance(schema: Option<Arc<Schema>>) {
    *INSTANCE.write() = schema;
}

/// The process-wide schema instance
#[must_use]
pub fn instance() -> Option<Arc<Schema>> {
    INSTANCE.read().clone()
}

/// Set (or clear) the ambient current schema
pub fn set_current(schema: Option<Arc<Schema>>) {
    *CURRENT.write() = schema;
}

/// The ambient current schema
#[must_use]
pub fn current() -> Option<Arc<Schema>> {
    CURRENT.read().clone()
}

/// Options for schema-resolving checks
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Use this schema instead of the current one or the instance
    pub schema: Option<Arc<Schema>>,
    /// Strict (default) or unstrict
    pub mode: CheckMode,
}

impl CheckOptions {
    /// Strict checks against the ambient schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check against `schema`
    #[must_use]
    pub fn schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Check in `mode`
    #[must_use]
    pub const fn mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The schema a check with `options` would use
///
/// # Errors
///
/// Returns `DefinitionError::NoSchema` if no schema is given, current, or registered
pub fn resolve_schema(options: &CheckOptions) -> core::result::Result<Arc<Schema>, DefinitionError> {
    options
        .schema
        .clone()
        .or_else(current)
        .or_else(instance)
        .ok_or(DefinitionError::NoSchema)
}

/// Check `path` for a raw user against the resolved schema
///
/// The user is adapted with the schema's proxy factory.
///
/// # Errors
///
/// `Definition(NoSchema)` if no schema resolves, otherwise see [`Schema::check_user`]
pub fn check_permission(
    path: &str,
    user: &Object,
    object: &Object,
    options: &CheckOptions,
) -> Result<Granted> {
    resolve_schema(options)?.check_user(path, user, object, options.mode)
}

/// Boolean form of [`check_permission`]
///
/// # Errors
///
/// Every error except a denial
pub fn can(path: &str, user: &Object, object: &Object, options: &CheckOptions) -> Result<bool> {
    denial_to_false(check_permission(path, user, object, options))
}
