// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! Rules and rule evaluation
//!
//! - [`Rule`]: a named predicate over `(user, object)`, defined either locally on a
//!   permission or globally on a group (inherited by the group's whole subtree)
//! - [`IncludedRule`]: a reference from a permission to a global rule, with an optional
//!   applicability condition and an optional object translation
//! - [`RuleExecution`]: one evaluation of a rule against a user and object, carrying
//!   the diagnostic annotations the predicate recorded

use crate::object::Object;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Diagnostic data recorded by a predicate during evaluation
pub type Annotations = BTreeMap<String, Object>;

/// Rule predicate: `(user, object, annotations) -> satisfied`
pub type Predicate = Arc<dyn Fn(&Object, &Object, &mut Annotations) -> bool + Send + Sync>;

/// Inclusion condition: `(user, raw object) -> applies`
pub type Condition = Arc<dyn Fn(&Object, &Object) -> bool + Send + Sync>;

/// Object translation applied before an included rule is evaluated
pub type Translate = Arc<dyn Fn(&Object) -> Object + Send + Sync>;

/// A named predicate
#[derive(Clone)]
pub struct Rule {
    key: String,
    predicate: Predicate,
    required_object_types: Vec<String>,
}

impl Rule {
    /// Create a rule from a predicate
    pub fn new<F>(key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Object, &Object, &mut Annotations) -> bool + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            predicate: Arc::new(predicate),
            required_object_types: Vec::new(),
        }
    }

    /// Require the evaluated object to have this type name
    #[must_use]
    pub fn require_object_type(mut self, type_name: impl Into<String>) -> Self {
        self.add_required_object_type(type_name);
        self
    }

    /// Add a required object type, returning `false` if it was already present
    pub fn add_required_object_type(&mut self, type_name: impl Into<String>) -> bool {
        let type_name = type_name.into();
        if self.required_object_types.contains(&type_name) {
            false
        } else {
            self.required_object_types.push(type_name);
            true
        }
    }

    /// Rule key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Accepted object type names (empty accepts anything)
    #[must_use]
    pub fn required_object_types(&self) -> &[String] {
        &self.required_object_types
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("key", &self.key)
            .field("required_object_types", &self.required_object_types)
            .finish_non_exhaustive()
    }
}

/// A permission's reference to a global rule
///
/// The referenced rule is looked up in the permission's ancestor groups when the
/// permission is checked, not when the inclusion is registered.
#[derive(Clone)]
pub struct IncludedRule {
    key: String,
    condition: Option<Condition>,
    translate: Option<Translate>,
}

impl IncludedRule {
    /// Include the global rule named `key`
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            condition: None,
            translate: None,
        }
    }

    /// Only apply the rule when `condition(user, object)` holds
    #[must_use]
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Object, &Object) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Evaluate the rule against `translate(object)` instead of the object itself
    #[must_use]
    pub fn translate<F>(mut self, translate: F) -> Self
    where
        F: Fn(&Object) -> Object + Send + Sync + 'static,
    {
        self.translate = Some(Arc::new(translate));
        self
    }

    /// Key of the referenced rule
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the inclusion applies to this user and object
    #[must_use]
    pub fn applies(&self, user: &Object, object: &Object) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |condition| condition(user, object))
    }

    /// The object the rule should see
    #[must_use]
    pub fn translate_object(&self, object: &Object) -> Object {
        match &self.translate {
            Some(translate) => translate(object),
            None => object.clone(),
        }
    }

    /// Whether a condition is attached
    #[must_use]
    pub const fn has_condition(&self) -> bool {
        self.condition.is_some()
    }
}

impl fmt::Debug for IncludedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludedRule")
            .field("key", &self.key)
            .field("condition", &self.condition.is_some())
            .field("translate", &self.translate.is_some())
            .finish()
    }
}

/// One evaluation of a rule
///
/// The predicate runs at most once; the outcome is memoized for the lifetime of the
/// execution. Annotations written by the predicate stay with the execution and are
/// surfaced through denials.
pub struct RuleExecution {
    rule: Arc<Rule>,
    user: Object,
    object: Object,
    annotations: Annotations,
    outcome: Option<bool>,
}

impl RuleExecution {
    /// Prepare an evaluation of `rule`
    #[must_use]
    pub fn new(rule: Arc<Rule>, user: Object, object: Object) -> Self {
        Self {
            rule,
            user,
            object,
            annotations: Annotations::new(),
            outcome: None,
        }
    }

    /// Evaluate the predicate (first call only) and return the outcome
    pub fn satisfied(&mut self) -> bool {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = (self.rule.predicate)(&self.user, &self.object, &mut self.annotations);
        self.outcome = Some(outcome);
        outcome
    }

    /// The evaluated rule
    #[must_use]
    pub fn rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    /// The acting user
    #[must_use]
    pub const fn user(&self) -> &Object {
        &self.user
    }

    /// The object the rule was evaluated against (after translation)
    #[must_use]
    pub const fn object(&self) -> &Object {
        &self.object
    }

    /// Annotations recorded by the predicate
    #[must_use]
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Memoized outcome, `None` until evaluated
    #[must_use]
    pub const fn outcome(&self) -> Option<bool> {
        self.outcome
    }
}

impl fmt::Debug for RuleExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleExecution")
            .field("rule", &self.rule.key)
            .field("user", &self.user)
            .field("object", &self.object)
            .field("annotations", &self.annotations)
            .field("outcome", &self.outcome)
            .finish()
    }
}
