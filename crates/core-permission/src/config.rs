// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Schema configuration and namespace handling
//!
//! A schema may be scoped by a namespace token. Paths then carry the token as a prefix,
//! separated by the namespace delimiter (`:` by default), e.g. `app:users.edit`.
//!
//! | Namespace | Optional | `users.edit` | `app:users.edit` | `other:users.edit` |
//! |-----------|----------|--------------|------------------|--------------------|
//! | none      | -        | bare path    | bare path        | bare path          |
//! | `app`     | no       | missing      | ok               | mismatch           |
//! | `app`     | yes      | ok           | ok               | mismatch           |
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```
//! use core_permission::Config;
//!
//! let config = Config::from_toml(r#"
//! namespace = "app"
//! namespace_optional = true
//! "#).unwrap();
//! assert_eq!(config.namespace(), Some("app"));
//! assert_eq!(config.strip_namespace("app:users.edit").unwrap(), "users.edit");
//! ```

use crate::error::{DefinitionError, NotFoundReason};
use crate::identity::ProxyFactory;
use serde::Deserialize;

/// Delimiter used when none is configured
pub const DEFAULT_NAMESPACE_DELIMITER: &str = ":";

/// Log target used when none is configured
pub const DEFAULT_LOG_TARGET: &str = "p47h_permissions";

/// How the configured namespace applies to paths and grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespacePolicy<'a> {
    /// No namespace; the delimiter has no meaning
    Absent,
    /// Paths and grants must carry the namespace
    Required(&'a str),
    /// Paths and grants may carry the namespace
    Optional(&'a str),
}

/// Schema configuration
#[derive(Debug, Clone)]
pub struct Config {
    namespace: Option<String>,
    namespace_delimiter: String,
    namespace_optional: bool,
    user_proxy: ProxyFactory,
    log_target: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            namespace_delimiter: DEFAULT_NAMESPACE_DELIMITER.to_string(),
            namespace_optional: false,
            user_proxy: ProxyFactory::default(),
            log_target: DEFAULT_LOG_TARGET.to_string(),
        }
    }
}

impl Config {
    /// Default configuration: no namespace, `:` delimiter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Accessors =====

    /// Configured namespace token
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Namespace delimiter
    #[must_use]
    pub fn namespace_delimiter(&self) -> &str {
        &self.namespace_delimiter
    }

    /// Whether paths may omit the namespace
    #[must_use]
    pub const fn namespace_optional(&self) -> bool {
        self.namespace_optional
    }

    /// Factory used to wrap raw users
    #[must_use]
    pub const fn user_proxy(&self) -> &ProxyFactory {
        &self.user_proxy
    }

    /// `log` target for engine records
    #[must_use]
    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    /// The namespace settings collapsed into one value
    #[must_use]
    pub fn namespace_policy(&self) -> NamespacePolicy<'_> {
        match (&self.namespace, self.namespace_optional) {
            (None, _) => NamespacePolicy::Absent,
            (Some(ns), false) => NamespacePolicy::Required(ns),
            (Some(ns), true) => NamespacePolicy::Optional(ns),
        }
    }

    // ===== Setters =====

    /// Set the namespace token
    pub fn set_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Remove the namespace
    pub fn clear_namespace(&mut self) -> &mut Self {
        self.namespace = None;
        self
    }

    /// Set the namespace delimiter
    pub fn set_namespace_delimiter(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.namespace_delimiter = delimiter.into();
        self
    }

    /// Allow paths and grants to omit the namespace
    pub fn set_namespace_optional(&mut self, optional: bool) -> &mut Self {
        self.namespace_optional = optional;
        self
    }

    /// Replace the factory used to wrap raw users
    pub fn set_user_proxy(&mut self, factory: ProxyFactory) -> &mut Self {
        self.user_proxy = factory;
        self
    }

    /// Set the `log` target
    pub fn set_log_target(&mut self, target: impl Into<String>) -> &mut Self {
        self.log_target = target.into();
        self
    }

    // ===== Namespace handling =====

    /// Qualify a bare path with the namespace, if one is configured
    #[must_use]
    pub fn qualify(&self, path: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}{}{}", ns, self.namespace_delimiter, path),
            None => path.to_string(),
        }
    }

    /// Strip the namespace from `path` according to the namespace policy
    ///
    /// The namespace segment is everything before the *last* delimiter.
    ///
    /// # Errors
    ///
    /// - `NamespaceMissing` if the namespace is required and the path has no delimiter
    /// - `NamespaceMismatch` if the path's namespace differs from the configured one
    pub fn strip_namespace<'p>(&self, path: &'p str) -> Result<&'p str, NotFoundReason> {
        let expected = match self.namespace_policy() {
            NamespacePolicy::Absent => return Ok(path),
            NamespacePolicy::Required(ns) | NamespacePolicy::Optional(ns) => ns,
        };

        match path.rfind(self.namespace_delimiter.as_str()) {
            Some(at) => {
                let found = &path[..at];
                if found != expected {
                    return Err(NotFoundReason::NamespaceMismatch {
                        found: found.to_string(),
                        expected: expected.to_string(),
                    });
                }
                Ok(&path[at + self.namespace_delimiter.len()..])
            }
            None if self.namespace_optional => Ok(path),
            None => Err(NotFoundReason::NamespaceMissing {
                namespace: expected.to_string(),
                path: path.to_string(),
            }),
        }
    }

    /// Whether `granted` holds `path` under the namespace policy
    ///
    /// Required namespaces match only the qualified path, absent namespaces only the
    /// bare path, optional namespaces either.
    #[must_use]
    pub fn is_granted(&self, granted: &std::collections::BTreeSet<String>, path: &str) -> bool {
        match self.namespace_policy() {
            NamespacePolicy::Absent => granted.contains(path),
            NamespacePolicy::Required(_) => granted.contains(&self.qualify(path)),
            NamespacePolicy::Optional(_) => {
                granted.contains(path) || granted.contains(&self.qualify(path))
            }
        }
    }

    // ===== Validation & loading =====

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidConfig` if:
    /// - the delimiter is empty or contains `.`
    /// - the namespace is empty or contains the delimiter
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.namespace_delimiter.is_empty() {
            return Err(DefinitionError::InvalidConfig(
                "namespace delimiter cannot be empty".to_string(),
            ));
        }

        if self.namespace_delimiter.contains('.') {
            return Err(DefinitionError::InvalidConfig(
                "namespace delimiter cannot contain '.'".to_string(),
            ));
        }

        if let Some(ns) = &self.namespace {
            if ns.is_empty() {
                return Err(DefinitionError::InvalidConfig(
                    "namespace cannot be empty".to_string(),
                ));
            }
            if ns.contains(self.namespace_delimiter.as_str()) {
                return Err(DefinitionError::InvalidConfig(format!(
                    "namespace '{}' cannot contain the delimiter '{}'",
                    ns, self.namespace_delimiter
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from a TOML string
    ///
    /// The user proxy factory cannot be expressed in TOML and stays at its default.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidConfig` if parsing or validation fails
    pub fn from_toml(toml_str: &str) -> Result<Self, DefinitionError> {
        let raw: ConfigRaw =
            toml::from_str(toml_str).map_err(|e| DefinitionError::InvalidConfig(e.to_string()))?;
        Self::try_from(raw)
    }
}

fn default_delimiter() -> String {
    DEFAULT_NAMESPACE_DELIMITER.to_string()
}

fn default_log_target() -> String {
    DEFAULT_LOG_TARGET.to_string()
}

/// Raw configuration for deserialization, validated into [`Config`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default = "default_delimiter")]
    namespace_delimiter: String,
    #[serde(default)]
    namespace_optional: bool,
    #[serde(default = "default_log_target")]
    log_target: String,
}

impl TryFrom<ConfigRaw> for Config {
    type Error = DefinitionError;

    fn try_from(raw: ConfigRaw) -> Result<Self, DefinitionError> {
        let config = Self {
            namespace: raw.namespace,
            namespace_delimiter: raw.namespace_delimiter,
            namespace_optional: raw.namespace_optional,
            user_proxy: ProxyFactory::default(),
            log_target: raw.log_target,
        };
        config.validate()?;
        Ok(config)
    }
}
