// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Error types for core-permission
//!
//! Checks fail with a [`CheckError`], a tagged value whose variants mirror the
//! outcome taxonomy: resolution failures, empty wildcard expansions, authorization
//! denials, object typing errors, and schema definition errors surfacing at check time.
//!
//! Schema construction fails with a [`DefinitionError`].

use crate::object::Object;
use crate::rule::RuleExecution;
use crate::tree::PermissionId;
use core::fmt;
use thiserror::Error;

/// Result type alias for check operations
pub type Result<T> = core::result::Result<T, CheckError>;

/// Why a permission path could not be resolved against the schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundReason {
    /// The path was empty
    #[error("must provide a permission path")]
    EmptyPath,

    /// The schema requires a namespace and the path had none
    #[error("namespace '{namespace}' is missing in path '{path}'")]
    NamespaceMissing {
        /// Namespace configured on the schema
        namespace: String,
        /// Path as given by the caller
        path: String,
    },

    /// The path carried a namespace other than the schema's
    #[error("namespace '{found}' does not match the schema namespace '{expected}'")]
    NamespaceMismatch {
        /// Namespace found in the path
        found: String,
        /// Namespace configured on the schema
        expected: String,
    },

    /// A segment did not name a child of the current group
    #[error("no permission found matching '{path}'")]
    UnknownSegment {
        /// Path being resolved
        path: String,
        /// Segment that could not be found
        segment: String,
    },

    /// A permission was reached before the path was exhausted
    #[error("permission found too early in path '{path}'; permission keys must end the path")]
    FoundTooEarly {
        /// Path being resolved
        path: String,
    },

    /// The path ended on a group
    #[error("last part of path '{path}' is not a permission")]
    NotAPermission {
        /// Path being resolved
        path: String,
    },

    /// A wildcard appeared anywhere but the end of the path
    #[error("wildcards must be placed at the end of a permission path: '{path}'")]
    MisplacedWildcard {
        /// Path being resolved
        path: String,
    },

    /// Unstrict checks take literal paths only
    #[error("permission path '{path}' cannot contain wildcards when strict is false")]
    WildcardNotAllowed {
        /// Path being checked
        path: String,
    },
}

/// Discriminant of a [`PermissionDenied`] error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialCode {
    /// The permission is restricted to contexts the caller is not in
    NotInContext,
    /// The caller does not hold the permission
    PermissionNotGranted,
    /// One of the permission's own rules was not satisfied
    RuleNotSatisfied,
    /// One of the permission's included rules was not satisfied
    IncludedRuleNotSatisfied,
}

impl DenialCode {
    /// Stable string form of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInContext => "NotInContext",
            Self::PermissionNotGranted => "PermissionNotGranted",
            Self::RuleNotSatisfied => "RuleNotSatisfied",
            Self::IncludedRuleNotSatisfied => "IncludedRuleNotSatisfied",
        }
    }
}

impl fmt::Display for DenialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authorization denial
///
/// Always carries the acting user and the object the check was made against.
/// Rule-coded denials also carry the [`RuleExecution`] that failed, including any
/// annotations its predicate recorded.
#[derive(Debug, Error)]
#[error("Permission denied ({code}): {message}")]
pub struct PermissionDenied {
    /// Why access was denied
    pub code: DenialCode,
    /// Human readable explanation
    pub message: String,
    /// The permission that failed, `None` for unstrict checks
    pub permission: Option<PermissionId>,
    /// Bare path of the failing permission (or the literal unstrict path)
    pub path: String,
    /// The acting user
    pub user: Object,
    /// The object given to the check
    pub object: Object,
    /// The failed rule evaluation, for rule-coded denials
    pub rule: Option<RuleExecution>,
}

/// Errors raised by permission checks
#[derive(Debug, Error)]
pub enum CheckError {
    /// The path could not be resolved
    #[error("Permission not found: {0}")]
    PermissionNotFound(NotFoundReason),

    /// A wildcard path matched no permissions
    #[error("No permissions found matching '{path}'")]
    NoPermissionsFound {
        /// Path as given by the caller
        path: String,
    },

    /// Access was denied
    #[error(transparent)]
    Denied(Box<PermissionDenied>),

    /// The object's type is not accepted by a permission or rule
    #[error("The {found} object provided to {target} was not valid. Valid object types are: {}", .expected.join(", "))]
    InvalidObject {
        /// Permission path, or `rule (key) for path` for included rules
        target: String,
        /// Type name of the rejected object
        found: String,
        /// Accepted type names
        expected: Vec<String>,
    },

    /// The schema definition is inconsistent (e.g. an included rule that is never defined)
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl CheckError {
    /// The denial code, if this is a denial
    #[must_use]
    pub fn denial_code(&self) -> Option<DenialCode> {
        self.as_denied().map(|denied| denied.code)
    }

    /// Borrow the denial, if this is a denial
    #[must_use]
    pub fn as_denied(&self) -> Option<&PermissionDenied> {
        match self {
            Self::Denied(denied) => Some(denied),
            _ => None,
        }
    }

    /// Whether this is a denial (as opposed to a usage or configuration error)
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

impl From<NotFoundReason> for CheckError {
    fn from(reason: NotFoundReason) -> Self {
        Self::PermissionNotFound(reason)
    }
}

impl From<PermissionDenied> for CheckError {
    fn from(denied: PermissionDenied) -> Self {
        Self::Denied(Box::new(denied))
    }
}

/// Errors raised while defining or loading a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The key is empty, contains the segment separator, or is a wildcard
    #[error("Invalid key '{key}': keys must be non-empty, without '.', and not a wildcard")]
    InvalidKey {
        /// Offending key
        key: String,
    },

    /// A group or permission with this key already exists in the group
    #[error("Group or permission with key of {key} already exists")]
    DuplicateKey {
        /// Offending key
        key: String,
    },

    /// A rule with this key already exists in the applicable scope
    #[error("Rule {key} has already been defined")]
    DuplicateRule {
        /// Offending key
        key: String,
    },

    /// The rule is already included on the permission
    #[error("Rule with key '{key}' has already been included on {permission}")]
    DuplicateInclusion {
        /// Offending key
        key: String,
        /// Permission path
        permission: String,
    },

    /// A path given at definition time places a wildcard anywhere but the end
    #[error("Wildcards must be placed at the end of a permission path: '{path}'")]
    MisplacedWildcard {
        /// Offending path
        path: String,
    },

    /// An included rule references a key that no ancestor group defines
    #[error("No defined rule with key {key} is available for {permission}")]
    UndefinedRule {
        /// Included key
        key: String,
        /// Permission path
        permission: String,
    },

    /// `reload` was called on a schema that was never loaded
    #[error("Cannot reload a schema that wasn't loaded")]
    NotLoaded,

    /// No explicit, current or global schema is available
    #[error("Could not determine a schema; set a current or global schema or pass one explicitly")]
    NoSchema,

    /// The configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}
