use std::collections::HashSet;

use regex::Regex;

use crate::form::form_model::FieldMap;

/// Maps a field snapshot to an ordered list of violation messages.
/// An empty list means the snapshot is valid.
pub trait Validator: Send + Sync {
    fn validate(&self, fields: &FieldMap) -> Vec<String>;
}

impl<F> Validator for F
where
    F: Fn(&FieldMap) -> Vec<String> + Send + Sync,
{
    fn validate(&self, fields: &FieldMap) -> Vec<String> {
        self(fields)
    }
}

/// Accepts every snapshot.
pub struct NoRules;

impl Validator for NoRules {
    fn validate(&self, _fields: &FieldMap) -> Vec<String> {
        Vec::new()
    }
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must contain something other than whitespace.
    Required { field: String, message: String },
    /// Value must match the pattern.
    Pattern {
        field: String,
        pattern: &'static Regex,
        message: String,
    },
    /// At least `min` characters.
    MinLength {
        field: String,
        min: usize,
        message: String,
    },
    /// At most `max` characters.
    MaxLength {
        field: String,
        max: usize,
        message: String,
    },
    /// Value must equal another field's value.
    Equals {
        field: String,
        other: String,
        message: String,
    },
    /// Value must be one of a fixed set.
    OneOf {
        field: String,
        allowed: &'static [&'static str],
        message: String,
    },
}

impl Rule {
    pub fn required(field: &str, message: &str) -> Self {
        Rule::Required {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn pattern(field: &str, pattern: &'static Regex, message: &str) -> Self {
        Rule::Pattern {
            field: field.into(),
            pattern,
            message: message.into(),
        }
    }

    pub fn min_length(field: &str, min: usize, message: &str) -> Self {
        Rule::MinLength {
            field: field.into(),
            min,
            message: message.into(),
        }
    }

    pub fn max_length(field: &str, max: usize, message: &str) -> Self {
        Rule::MaxLength {
            field: field.into(),
            max,
            message: message.into(),
        }
    }

    pub fn equals(field: &str, other: &str, message: &str) -> Self {
        Rule::Equals {
            field: field.into(),
            other: other.into(),
            message: message.into(),
        }
    }

    pub fn one_of(field: &str, allowed: &'static [&'static str], message: &str) -> Self {
        Rule::OneOf {
            field: field.into(),
            allowed,
            message: message.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Rule::Required { field, .. }
            | Rule::Pattern { field, .. }
            | Rule::MinLength { field, .. }
            | Rule::MaxLength { field, .. }
            | Rule::Equals { field, .. }
            | Rule::OneOf { field, .. } => field,
        }
    }

    /// The violation message, or `None` when the rule holds.
    pub fn check(&self, fields: &FieldMap) -> Option<&str> {
        let value = fields.get(self.field());
        let (holds, message) = match self {
            Rule::Required { message, .. } => (!value.trim().is_empty(), message),
            Rule::Pattern { pattern, message, .. } => (pattern.is_match(value), message),
            Rule::MinLength { min, message, .. } => (value.chars().count() >= *min, message),
            Rule::MaxLength { max, message, .. } => (value.chars().count() <= *max, message),
            Rule::Equals { other, message, .. } => (value == fields.get(other), message),
            Rule::OneOf { allowed, message, .. } => (allowed.iter().any(|a| *a == value), message),
        };
        if holds { None } else { Some(message.as_str()) }
    }
}

// ============================================================================
// Rule sets
// ============================================================================

/// Ordered rules. Once a field has a violation its remaining rules are
/// skipped, so an empty field reports "required" and nothing else.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn extend(mut self, other: RuleSet) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Validator for RuleSet {
    fn validate(&self, fields: &FieldMap) -> Vec<String> {
        let mut failed: HashSet<&str> = HashSet::new();
        let mut violations = Vec::new();

        for rule in &self.rules {
            if failed.contains(rule.field()) {
                continue;
            }
            if let Some(message) = rule.check(fields) {
                failed.insert(rule.field());
                violations.push(message.to_string());
            }
        }

        violations
    }
}
