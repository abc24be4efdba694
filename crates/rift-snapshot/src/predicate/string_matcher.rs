//! String value patterns.
//!
//! A `StringValuePattern` tests a single, possibly absent, string subject.
//! Every variant is immutable once built: regexes and JSON documents are
//! compiled or parsed at construction so matching never fails.

use super::error::PatternError;
use super::form_data::{FormDataPattern, MATCHES_FORM_DATA};
use super::matcher::{string_distance, CachedValue, CompiledRegex, MatchResult};
use serde_json::Value;
use std::borrow::Cow;

pub const EQUAL_TO: &str = "equalTo";
pub const CONTAINS: &str = "contains";
pub const MATCHES: &str = "matches";
pub const DOES_NOT_MATCH: &str = "doesNotMatch";
pub const EQUAL_TO_JSON: &str = "equalToJson";
pub const ABSENT: &str = "absent";

/// Expected document of an `equalToJson` pattern.
///
/// `written` keeps the form the pattern was declared in (a JSON string or an
/// inline value) so encoding reproduces it; `parsed` is what gets compared.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValuePattern {
    written: Value,
    parsed: Value,
}

impl JsonValuePattern {
    pub fn from_text(text: &str) -> Result<Self, PatternError> {
        let parsed = serde_json::from_str(text)?;
        Ok(Self {
            written: Value::String(text.to_string()),
            parsed,
        })
    }

    pub fn from_value(value: Value) -> Self {
        Self {
            written: value.clone(),
            parsed: value,
        }
    }

    pub fn written(&self) -> &Value {
        &self.written
    }

    pub fn parsed(&self) -> &Value {
        &self.parsed
    }

    fn match_value(&self, subject: &str) -> MatchResult {
        match serde_json::from_str::<Value>(subject) {
            Ok(actual) => MatchResult::of(actual == self.parsed),
            Err(_) => MatchResult::no_match(),
        }
    }
}

/// A single-value match predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum StringValuePattern {
    EqualTo {
        expected: CachedValue,
        case_insensitive: bool,
    },
    Contains(String),
    Matches(CompiledRegex),
    DoesNotMatch(CompiledRegex),
    EqualToJson(JsonValuePattern),
    Absent,
    MatchesFormData(FormDataPattern),
}

impl StringValuePattern {
    pub fn equal_to(expected: impl Into<String>) -> Self {
        StringValuePattern::EqualTo {
            expected: CachedValue::new(expected),
            case_insensitive: false,
        }
    }

    pub fn equal_to_ignore_case(expected: impl Into<String>) -> Self {
        StringValuePattern::EqualTo {
            expected: CachedValue::new(expected),
            case_insensitive: true,
        }
    }

    pub fn contains(expected: impl Into<String>) -> Self {
        StringValuePattern::Contains(expected.into())
    }

    pub fn matches(regex: &str) -> Result<Self, PatternError> {
        CompiledRegex::compile(regex)
            .map(StringValuePattern::Matches)
            .map_err(|e| PatternError::invalid_regex(MATCHES, regex, e))
    }

    pub fn does_not_match(regex: &str) -> Result<Self, PatternError> {
        CompiledRegex::compile(regex)
            .map(StringValuePattern::DoesNotMatch)
            .map_err(|e| PatternError::invalid_regex(DOES_NOT_MATCH, regex, e))
    }

    pub fn equal_to_json(json: &str) -> Result<Self, PatternError> {
        JsonValuePattern::from_text(json).map(StringValuePattern::EqualToJson)
    }

    pub fn equal_to_json_value(json: Value) -> Self {
        StringValuePattern::EqualToJson(JsonValuePattern::from_value(json))
    }

    pub fn absent() -> Self {
        StringValuePattern::Absent
    }

    pub fn matches_form_data(key: &str, value: Option<&str>) -> Result<Self, PatternError> {
        FormDataPattern::new(Some(key), value).map(StringValuePattern::MatchesFormData)
    }

    /// The externally visible kind name, which is also the discriminant
    /// field of the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            StringValuePattern::EqualTo { .. } => EQUAL_TO,
            StringValuePattern::Contains(_) => CONTAINS,
            StringValuePattern::Matches(_) => MATCHES,
            StringValuePattern::DoesNotMatch(_) => DOES_NOT_MATCH,
            StringValuePattern::EqualToJson(_) => EQUAL_TO_JSON,
            StringValuePattern::Absent => ABSENT,
            StringValuePattern::MatchesFormData(_) => MATCHES_FORM_DATA,
        }
    }

    /// Human-readable expected value, as used in diagnostics.
    pub fn expected(&self) -> String {
        match self {
            StringValuePattern::EqualTo { expected, .. } => expected.value.clone(),
            StringValuePattern::Contains(s) => s.clone(),
            StringValuePattern::Matches(re) | StringValuePattern::DoesNotMatch(re) => {
                re.source().to_string()
            }
            StringValuePattern::EqualToJson(json) => match json.written() {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            StringValuePattern::Absent => "(absent)".to_string(),
            StringValuePattern::MatchesFormData(form) => match form.expected_value() {
                Some(value) => format!("{}={}", form.expected_key().unwrap_or_default(), value),
                None => form.expected_key().unwrap_or_default().to_string(),
            },
        }
    }

    /// Test a subject. `None` means the subject is absent.
    pub fn match_value(&self, subject: Option<&str>) -> MatchResult {
        match (self, subject) {
            (StringValuePattern::Absent, v) => MatchResult::of(v.is_none()),
            (StringValuePattern::MatchesFormData(form), v) => form.match_value(v),

            // Every other kind needs a value to look at
            (_, None) => MatchResult::no_match(),

            (
                StringValuePattern::EqualTo {
                    expected,
                    case_insensitive,
                },
                Some(v),
            ) => {
                let case_sensitive = !case_insensitive;
                if expected.equals(v, case_sensitive) {
                    return MatchResult::exact();
                }
                let subject = if case_sensitive {
                    Cow::Borrowed(v)
                } else {
                    Cow::Owned(v.to_lowercase())
                };
                MatchResult::partial(string_distance(expected.pattern(case_sensitive), &subject))
            }
            (StringValuePattern::Contains(expected), Some(v)) => {
                MatchResult::of(v.contains(expected.as_str()))
            }
            (StringValuePattern::Matches(re), Some(v)) => MatchResult::of(re.is_full_match(v)),
            (StringValuePattern::DoesNotMatch(re), Some(v)) => {
                MatchResult::of(!re.is_full_match(v))
            }
            (StringValuePattern::EqualToJson(json), Some(v)) => json.match_value(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_to() {
        let p = StringValuePattern::equal_to("/api/users");
        assert!(p.match_value(Some("/api/users")).is_exact_match());
        let near = p.match_value(Some("/api/user"));
        assert!(!near.is_exact_match());
        assert!(near.distance() < 1.0);
        assert!(!p.match_value(None).is_exact_match());
    }

    #[test]
    fn test_equal_to_ignore_case() {
        let p = StringValuePattern::equal_to_ignore_case("Application/JSON");
        assert!(p.match_value(Some("application/json")).is_exact_match());
        assert!(!StringValuePattern::equal_to("Application/JSON")
            .match_value(Some("application/json"))
            .is_exact_match());
    }

    #[test]
    fn test_contains() {
        let p = StringValuePattern::contains("user");
        assert!(p.match_value(Some("/api/users/1")).is_exact_match());
        assert!(!p.match_value(Some("/api/orders")).is_exact_match());
    }

    #[test]
    fn test_matches_is_full_match() {
        let p = StringValuePattern::matches("/api/users/\\d+").unwrap();
        assert!(p.match_value(Some("/api/users/42")).is_exact_match());
        assert!(!p.match_value(Some("/api/users/42/orders")).is_exact_match());
    }

    #[test]
    fn test_does_not_match() {
        let p = StringValuePattern::does_not_match("/admin/.*").unwrap();
        assert!(p.match_value(Some("/api/users")).is_exact_match());
        assert!(!p.match_value(Some("/admin/settings")).is_exact_match());
        assert!(!p.match_value(None).is_exact_match());
    }

    #[test]
    fn test_invalid_regex_fails_at_construction() {
        assert!(matches!(
            StringValuePattern::matches("(oops"),
            Err(PatternError::InvalidRegex { kind: MATCHES, .. })
        ));
        assert!(matches!(
            StringValuePattern::does_not_match("[x"),
            Err(PatternError::InvalidRegex {
                kind: DOES_NOT_MATCH,
                ..
            })
        ));
    }

    #[test]
    fn test_equal_to_json_ignores_formatting_and_key_order() {
        let p = StringValuePattern::equal_to_json(r#"{"a": 1, "b": [1, 2]}"#).unwrap();
        assert!(p.match_value(Some(r#"{"b":[1,2],"a":1}"#)).is_exact_match());
        assert!(!p.match_value(Some(r#"{"a":1,"b":[2,1]}"#)).is_exact_match());
        assert!(!p.match_value(Some("not json")).is_exact_match());
    }

    #[test]
    fn test_equal_to_json_rejects_invalid_expected() {
        assert!(matches!(
            StringValuePattern::equal_to_json("{broken"),
            Err(PatternError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_equal_to_json_inline_value() {
        let p = StringValuePattern::equal_to_json_value(json!({"id": 7}));
        assert!(p.match_value(Some(r#"{"id":7}"#)).is_exact_match());
        assert_eq!(p.expected(), r#"{"id":7}"#);
    }

    #[test]
    fn test_absent() {
        let p = StringValuePattern::absent();
        assert!(p.match_value(None).is_exact_match());
        assert!(!p.match_value(Some("")).is_exact_match());
    }

    #[test]
    fn test_matches_form_data_delegates() {
        let p = StringValuePattern::matches_form_data("test", Some("is_.*")).unwrap();
        assert!(p.match_value(Some("test=is_success")).is_exact_match());
        assert!(!p.match_value(Some("test=failure")).is_exact_match());
        assert_eq!(p.kind(), MATCHES_FORM_DATA);
        assert_eq!(p.expected(), "test=is_.*");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(
            StringValuePattern::matches("a.*").unwrap(),
            StringValuePattern::matches("a.*").unwrap()
        );
        assert_ne!(
            StringValuePattern::matches("a.*").unwrap(),
            StringValuePattern::does_not_match("a.*").unwrap()
        );
        assert_ne!(
            StringValuePattern::equal_to("x"),
            StringValuePattern::equal_to_ignore_case("x")
        );
    }
}
