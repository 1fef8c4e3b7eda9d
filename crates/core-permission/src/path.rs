// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Permission path grammar
//!
//! A path (after its namespace has been stripped) is a dot-separated list of keys,
//! optionally ending in a wildcard:
//!
//! - `users.edit` - exactly one permission
//! - `users.*` - the permissions declared directly in `users`
//! - `users.**.*` - every permission in the subtree rooted at `users`
//!
//! Wildcards anywhere else are rejected.
//!
//! ## Examples
//!
//! ```
//! use core_permission::path::{PathTerminal, PermissionPath};
//!
//! let path = PermissionPath::parse("projects.delete.*").unwrap();
//! assert_eq!(path.segments(), &["projects", "delete"]);
//! assert_eq!(path.terminal(), PathTerminal::Children);
//! ```

use crate::error::{DefinitionError, NotFoundReason};

/// Path segment separator
pub const SEGMENT_SEPARATOR: char = '.';

/// Single-level wildcard
pub const WILDCARD: &str = "*";

/// Recursive wildcard, only valid as `**.*` at the end of a path
pub const RECURSIVE_WILDCARD: &str = "**";

/// What a path resolves to once its literal segments are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathTerminal {
    /// The last literal segment must be a permission
    Exact,
    /// Trailing `*`: direct permission children of the group
    Children,
    /// Trailing `**.*`: every permission in the group's subtree
    Subtree,
}

/// A parsed, namespace-free permission path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionPath<'a> {
    raw: &'a str,
    segments: Vec<&'a str>,
    terminal: PathTerminal,
}

impl<'a> PermissionPath<'a> {
    /// Parse a path
    ///
    /// # Errors
    ///
    /// - `NotFoundReason::EmptyPath` if `path` is empty
    /// - `NotFoundReason::MisplacedWildcard` if a wildcard is not at the end
    pub fn parse(path: &'a str) -> Result<Self, NotFoundReason> {
        if path.is_empty() {
            return Err(NotFoundReason::EmptyPath);
        }

        let parts: Vec<&'a str> = path.split(SEGMENT_SEPARATOR).collect();
        let (literal_len, terminal) = match parts.as_slice() {
            [.., RECURSIVE_WILDCARD, WILDCARD] => (parts.len() - 2, PathTerminal::Subtree),
            [.., WILDCARD] => (parts.len() - 1, PathTerminal::Children),
            _ => (parts.len(), PathTerminal::Exact),
        };

        let mut segments = parts;
        segments.truncate(literal_len);

        if segments.iter().any(|s| is_wildcard_segment(s)) {
            return Err(NotFoundReason::MisplacedWildcard {
                path: path.to_string(),
            });
        }

        Ok(Self {
            raw: path,
            segments,
            terminal,
        })
    }

    /// Literal key segments, in order
    #[must_use]
    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// How the path ends
    #[must_use]
    pub const fn terminal(&self) -> PathTerminal {
        self.terminal
    }

    /// Whether the path ends in a wildcard
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.terminal != PathTerminal::Exact
    }

    /// The path string
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.raw
    }
}

/// Check wildcard placement in a path given at definition time
///
/// # Errors
///
/// Returns `DefinitionError::MisplacedWildcard` if a wildcard is not at the end
pub fn validate_definition_path(path: &str) -> Result<(), DefinitionError> {
    match PermissionPath::parse(path) {
        Err(NotFoundReason::MisplacedWildcard { path }) => {
            Err(DefinitionError::MisplacedWildcard { path })
        }
        _ => Ok(()),
    }
}

/// Whether `path` contains a wildcard character anywhere
#[must_use]
pub fn contains_wildcard(path: &str) -> bool {
    path.contains(WILDCARD)
}

fn is_wildcard_segment(segment: &str) -> bool {
    segment == WILDCARD || segment == RECURSIVE_WILDCARD
}
