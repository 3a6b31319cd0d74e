//! Field constraints
//!
//! Numeric bounds, length bounds and a text pattern. Bounds are held as
//! decimals so integer, float and decimal fields compare exactly.

use std::fmt::{self, Display, Formatter};

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Constraints attached to a field or type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<BigDecimal>,
    /// Exclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<BigDecimal>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<BigDecimal>,
    /// Exclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<BigDecimal>,
    /// Minimum length of text or collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length of text or collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression text must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    /// No constraints
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set inclusive lower bound
    #[must_use]
    pub fn with_ge(mut self, bound: impl Into<BigDecimal>) -> Self {
        self.ge = Some(bound.into());
        self
    }

    /// Set exclusive lower bound
    #[must_use]
    pub fn with_gt(mut self, bound: impl Into<BigDecimal>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    /// Set inclusive upper bound
    #[must_use]
    pub fn with_le(mut self, bound: impl Into<BigDecimal>) -> Self {
        self.le = Some(bound.into());
        self
    }

    /// Set exclusive upper bound
    #[must_use]
    pub fn with_lt(mut self, bound: impl Into<BigDecimal>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    /// Set minimum length
    #[must_use]
    pub fn with_min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Set maximum length
    #[must_use]
    pub fn with_max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Set pattern
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Check if nothing is constrained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ge.is_none()
            && self.gt.is_none()
            && self.le.is_none()
            && self.lt.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }

    /// Overlay `other` onto `self`; bounds set in `other` win
    pub fn merge(&mut self, other: &Constraints) {
        fn overlay<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if from.is_some() {
                slot.clone_from(from);
            }
        }
        overlay(&mut self.ge, &other.ge);
        overlay(&mut self.gt, &other.gt);
        overlay(&mut self.le, &other.le);
        overlay(&mut self.lt, &other.lt);
        overlay(&mut self.min_length, &other.min_length);
        overlay(&mut self.max_length, &other.max_length);
        overlay(&mut self.pattern, &other.pattern);
    }

    /// Constraint names and values in display order
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        let bounds = [("ge", &self.ge), ("gt", &self.gt), ("le", &self.le), ("lt", &self.lt)];
        for (name, bound) in bounds {
            if let Some(bound) = bound {
                entries.push((name, bound.to_string()));
            }
        }
        if let Some(len) = self.min_length {
            entries.push(("min_length", len.to_string()));
        }
        if let Some(len) = self.max_length {
            entries.push(("max_length", len.to_string()));
        }
        if let Some(pattern) = &self.pattern {
            entries.push(("pattern", pattern.clone()));
        }
        entries
    }

    /// First numeric bound `number` violates, as a message
    #[must_use]
    pub fn check_number(&self, number: &BigDecimal) -> Option<String> {
        if let Some(ge) = &self.ge {
            if number < ge {
                return Some(format!("Input should be greater than or equal to {ge}"));
            }
        }
        if let Some(gt) = &self.gt {
            if number <= gt {
                return Some(format!("Input should be greater than {gt}"));
            }
        }
        if let Some(le) = &self.le {
            if number > le {
                return Some(format!("Input should be less than or equal to {le}"));
            }
        }
        if let Some(lt) = &self.lt {
            if number >= lt {
                return Some(format!("Input should be less than {lt}"));
            }
        }
        None
    }

    /// First length bound violated by a value of `len` units
    ///
    /// `noun` names the value ("String", "List") and `unit` the counted thing
    /// ("character", "item").
    #[must_use]
    pub fn check_length(&self, len: usize, noun: &str, unit: &str) -> Option<String> {
        if let Some(min) = self.min_length {
            if len < min {
                return Some(format!(
                    "{noun} should have at least {min} {unit}{}",
                    plural(min)
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Some(format!(
                    "{noun} should have at most {max} {unit}{}",
                    plural(max)
                ));
            }
        }
        None
    }

    /// Pattern violation for `text`, as a message
    ///
    /// The pattern is searched, not anchored.
    #[must_use]
    pub fn check_pattern(&self, text: &str) -> Option<String> {
        let pattern = self.pattern.as_deref()?;
        match regex::Regex::new(pattern) {
            Ok(re) if re.is_match(text) => None,
            Ok(_) => Some(format!("String should match pattern '{pattern}'")),
            Err(e) => Some(format!("Pattern '{pattern}' is invalid: {e}")),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

impl Display for Constraints {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
