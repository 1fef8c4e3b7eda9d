// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Identity adapters
//!
//! A check needs a uniform view of the caller: the set of permission paths it has been
//! granted, the contexts it is acting in, and the underlying user value handed to rule
//! predicates. [`Identity`] is that view. [`UserProxy`] is the default implementation,
//! and a [`ProxyFactory`] configured on the schema turns raw user objects into proxies.

use crate::object::{Object, ObjectType};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Uniform view over a caller-supplied identity
pub trait Identity {
    /// Permission paths granted to the caller, bare or namespace-qualified
    fn granted_permissions(&self) -> &BTreeSet<String>;

    /// Context tags the caller is currently acting in
    fn contexts(&self) -> &BTreeSet<String>;

    /// The underlying user value passed to rule predicates
    fn user(&self) -> &Object;

    /// Short description used in log records
    fn description(&self) -> String {
        format!("{:?}", self.user())
    }
}

/// Domain user types that know their own grants
///
/// Implementing this lets [`UserProxy::for_subject`] build a proxy straight from the
/// user value.
pub trait Subject: ObjectType {
    /// Granted permission paths
    fn granted_permissions(&self) -> Vec<String>;

    /// Current contexts
    fn contexts(&self) -> Vec<String> {
        Vec::new()
    }

    /// Description for log records
    fn description(&self) -> String {
        Self::TYPE_NAME.to_string()
    }
}

/// Default identity adapter
#[derive(Debug, Clone, Default)]
pub struct UserProxy {
    user: Object,
    granted: BTreeSet<String>,
    contexts: BTreeSet<String>,
    description: Option<String>,
}

impl UserProxy {
    /// A proxy for `user` with no grants and no contexts
    #[must_use]
    pub fn new(user: Object) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    /// Build a proxy from a [`Subject`], copying its grants and contexts
    #[must_use]
    pub fn for_subject<T: Subject>(subject: T) -> Self {
        let granted = subject.granted_permissions().into_iter().collect();
        let contexts = subject.contexts().into_iter().collect();
        let description = subject.description();
        Self {
            user: Object::new(subject),
            granted,
            contexts,
            description: Some(description),
        }
    }

    /// Grant a permission path
    #[must_use]
    pub fn grant(mut self, path: impl Into<String>) -> Self {
        self.granted.insert(path.into());
        self
    }

    /// Grant every path in `paths`
    #[must_use]
    pub fn grant_all<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.granted.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add a context tag
    #[must_use]
    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.insert(context.into());
        self
    }

    /// Override the log description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ObjectType for UserProxy {
    const TYPE_NAME: &'static str = "UserProxy";
}

impl Identity for UserProxy {
    fn granted_permissions(&self) -> &BTreeSet<String> {
        &self.granted
    }

    fn contexts(&self) -> &BTreeSet<String> {
        &self.contexts
    }

    fn user(&self) -> &Object {
        &self.user
    }

    fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.user))
    }
}

/// Builds a [`UserProxy`] for a raw user object
#[derive(Clone)]
pub struct ProxyFactory(Arc<dyn Fn(&Object) -> UserProxy + Send + Sync>);

impl ProxyFactory {
    /// Wrap an adapter function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Object) -> UserProxy + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Adapt a raw user object
    #[must_use]
    pub fn adapt(&self, user: &Object) -> UserProxy {
        (self.0)(user)
    }
}

impl Default for ProxyFactory {
    /// Reuses a `UserProxy` passed as the user, otherwise grants nothing
    fn default() -> Self {
        Self::new(|user| {
            user.downcast_ref::<UserProxy>()
                .cloned()
                .unwrap_or_else(|| UserProxy::new(user.clone()))
        })
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory").finish_non_exhaustive()
    }
}
