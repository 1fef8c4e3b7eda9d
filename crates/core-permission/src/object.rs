// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Type-erased values passed through permission checks
//!
//! Users and objects are caller-defined types. The engine only needs two things from
//! them: a runtime type name, which is matched against the required object types of
//! permissions and rules, and a way for caller predicates to get the concrete value
//! back. [`Object`] wraps any `'static + Send + Sync` value in an `Arc` together with
//! its type name, so it is cheap to clone into denials and rule executions.
//!
//! ```
//! use core_permission::{Object, ObjectType};
//!
//! struct Project {
//!     archived: bool,
//! }
//!
//! impl ObjectType for Project {
//!     const TYPE_NAME: &'static str = "Project";
//! }
//!
//! let object = Object::new(Project { archived: true });
//! assert_eq!(object.type_name(), "Project");
//! assert!(object.downcast_ref::<Project>().is_some_and(|p| p.archived));
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Type name reported by [`Object::none`]
pub const NONE_TYPE_NAME: &str = "None";

/// A value with a stable, caller-facing type name
pub trait ObjectType: Any + Send + Sync {
    /// Name matched against required object types
    const TYPE_NAME: &'static str;
}

impl ObjectType for String {
    const TYPE_NAME: &'static str = "String";
}

impl ObjectType for &'static str {
    const TYPE_NAME: &'static str = "String";
}

impl ObjectType for i64 {
    const TYPE_NAME: &'static str = "Integer";
}

impl ObjectType for i32 {
    const TYPE_NAME: &'static str = "Integer";
}

impl ObjectType for u64 {
    const TYPE_NAME: &'static str = "Integer";
}

impl ObjectType for u32 {
    const TYPE_NAME: &'static str = "Integer";
}

impl ObjectType for f64 {
    const TYPE_NAME: &'static str = "Float";
}

impl ObjectType for bool {
    const TYPE_NAME: &'static str = "Boolean";
}

/// A shared, type-erased value with a runtime type name
#[derive(Clone)]
pub struct Object {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_name: Cow<'static, str>,
}

impl Object {
    /// The absent object
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: None,
            type_name: Cow::Borrowed(NONE_TYPE_NAME),
        }
    }

    /// Wrap a value using its [`ObjectType::TYPE_NAME`]
    #[must_use]
    pub fn new<T: ObjectType>(value: T) -> Self {
        Self {
            value: Some(Arc::new(value)),
            type_name: Cow::Borrowed(T::TYPE_NAME),
        }
    }

    /// Wrap a value under an explicit type name
    #[must_use]
    pub fn named<T>(type_name: impl Into<Cow<'static, str>>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            value: Some(Arc::new(value)),
            type_name: type_name.into(),
        }
    }

    /// Runtime type name
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this is [`Object::none`]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Borrow the wrapped value as `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_deref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Whether both handles wrap the same allocation (both `none` counts as the same)
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether the type name is one of `types`; an empty list accepts everything
    #[must_use]
    pub fn is_one_of(&self, types: &[String]) -> bool {
        types.is_empty() || types.iter().any(|t| t.as_str() == self.type_name())
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("Object(None)")
        } else {
            write!(f, "Object({})", self.type_name)
        }
    }
}
