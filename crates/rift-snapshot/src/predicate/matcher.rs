//! Core matching helpers shared by every pattern kind.
//!
//! This module provides:
//! - `MatchResult` - graded outcome of testing a subject against a pattern
//! - `CachedValue` - a string with pre-computed lowercase for case-insensitive equality
//! - `CompiledRegex` - a full-match regex that remembers its source text

use regex::Regex;
use similar::TextDiff;
use std::sync::Arc;

/// Outcome of testing a subject against a pattern.
///
/// `distance` is `0.0` for an exact match and grows towards `1.0` the further
/// the subject is from what the pattern expects. Single-value patterns that
/// cannot grade a near miss report either `0.0` or `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    distance: f64,
}

impl MatchResult {
    pub const fn exact() -> Self {
        Self { distance: 0.0 }
    }

    pub const fn no_match() -> Self {
        Self { distance: 1.0 }
    }

    pub fn of(matched: bool) -> Self {
        if matched {
            Self::exact()
        } else {
            Self::no_match()
        }
    }

    /// A near miss. Non-zero distances are clamped to `(0, 1]` so a partial
    /// result is never mistaken for an exact one.
    pub fn partial(distance: f64) -> Self {
        if distance <= 0.0 {
            return Self {
                distance: f64::EPSILON,
            };
        }
        Self {
            distance: distance.min(1.0),
        }
    }

    pub fn is_exact_match(&self) -> bool {
        self.distance == 0.0
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Combine per-dimension results. Exact only when every part is exact,
    /// otherwise the mean distance. No parts means nothing was constrained.
    pub fn aggregate(results: impl IntoIterator<Item = MatchResult>) -> Self {
        let (count, total) = results
            .into_iter()
            .fold((0usize, 0.0f64), |(n, sum), r| (n + 1, sum + r.distance));
        if count == 0 || total == 0.0 {
            return Self::exact();
        }
        Self::partial(total / count as f64)
    }
}

/// Distance between two strings based on a character-level diff ratio.
pub fn string_distance(expected: &str, actual: &str) -> f64 {
    if expected == actual {
        return 0.0;
    }
    let ratio = TextDiff::from_chars(expected, actual).ratio();
    1.0 - f64::from(ratio)
}

/// A string value with pre-computed lowercase for efficient case-insensitive matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    /// Original value (for case-sensitive matching and serialization)
    pub value: String,
    /// Pre-computed lowercase (for case-insensitive matching)
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    #[inline]
    pub fn equals(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value == self.value
        } else {
            value.to_lowercase() == self.lower
        }
    }

    /// Get the appropriate value for comparison based on case sensitivity.
    #[inline]
    pub fn pattern(&self, case_sensitive: bool) -> &str {
        if case_sensitive {
            &self.value
        } else {
            &self.lower
        }
    }
}

impl From<&str> for CachedValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A regex compiled for full-string matching.
///
/// The source is validated on its own first so that an unbalanced pattern
/// cannot become valid by accident once wrapped in the anchoring group.
#[derive(Debug, Clone)]
pub struct CompiledRegex {
    source: String,
    regex: Arc<Regex>,
}

impl CompiledRegex {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source)?;
        let anchored = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            regex: Arc::new(anchored),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_full_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
