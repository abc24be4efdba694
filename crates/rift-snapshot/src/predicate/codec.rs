//! Serialized form of `StringValuePattern`.
//!
//! A pattern is an object with exactly one discriminant field naming its kind
//! (`{"matches": "a.*"}`), plus kind-specific sibling fields such as `value`
//! or `caseInsensitive`. Decoding is driven by `PATTERN_KINDS`: a new kind
//! registers one entry there instead of extending a chain of field checks.

use super::error::PatternError;
use super::form_data::{FormDataPattern, MATCHES_FORM_DATA};
use super::string_matcher::{
    JsonValuePattern, StringValuePattern, ABSENT, CONTAINS, DOES_NOT_MATCH, EQUAL_TO,
    EQUAL_TO_JSON, MATCHES,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

type DecodeFn = fn(&Map<String, Value>) -> Result<StringValuePattern, PatternError>;

/// One registered pattern kind.
pub struct PatternKind {
    pub name: &'static str,
    decode: DecodeFn,
}

impl PatternKind {
    pub fn decode(&self, object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
        (self.decode)(object)
    }
}

/// Discriminant field name -> decoder.
pub static PATTERN_KINDS: &[PatternKind] = &[
    PatternKind {
        name: EQUAL_TO,
        decode: decode_equal_to,
    },
    PatternKind {
        name: CONTAINS,
        decode: decode_contains,
    },
    PatternKind {
        name: MATCHES,
        decode: decode_matches,
    },
    PatternKind {
        name: DOES_NOT_MATCH,
        decode: decode_does_not_match,
    },
    PatternKind {
        name: EQUAL_TO_JSON,
        decode: decode_equal_to_json,
    },
    PatternKind {
        name: ABSENT,
        decode: decode_absent,
    },
    PatternKind {
        name: MATCHES_FORM_DATA,
        decode: decode_matches_form_data,
    },
];

pub fn lookup(name: &str) -> Option<&'static PatternKind> {
    PATTERN_KINDS.iter().find(|kind| kind.name == name)
}

/// Decode a serialized pattern.
pub fn decode(value: &Value) -> Result<StringValuePattern, PatternError> {
    let object = value
        .as_object()
        .ok_or_else(|| PatternError::NotAnObject(value.to_string()))?;

    let mut found = object.keys().filter_map(|field| lookup(field));
    let kind = found.next().ok_or_else(|| {
        PatternError::UnknownKind(object.keys().cloned().collect::<Vec<_>>().join(", "))
    })?;
    if let Some(other) = found.next() {
        return Err(PatternError::AmbiguousKind(kind.name, other.name));
    }
    kind.decode(object)
}

/// Encode a pattern into its serialized object.
pub fn encode(pattern: &StringValuePattern) -> Map<String, Value> {
    let mut object = Map::new();
    let kind = pattern.kind().to_string();
    match pattern {
        StringValuePattern::EqualTo {
            expected,
            case_insensitive,
        } => {
            object.insert(kind, Value::String(expected.value.clone()));
            if *case_insensitive {
                object.insert("caseInsensitive".to_string(), Value::Bool(true));
            }
        }
        StringValuePattern::Contains(expected) => {
            object.insert(kind, Value::String(expected.clone()));
        }
        StringValuePattern::Matches(re) | StringValuePattern::DoesNotMatch(re) => {
            object.insert(kind, Value::String(re.source().to_string()));
        }
        StringValuePattern::EqualToJson(json) => {
            object.insert(kind, json.written().clone());
        }
        StringValuePattern::Absent => {
            object.insert(kind, Value::Bool(true));
        }
        StringValuePattern::MatchesFormData(form) => {
            let key = form
                .expected_key()
                .map(|k| Value::String(k.to_string()))
                .unwrap_or(Value::Null);
            object.insert(kind, key);
            if let Some(value) = form.expected_value() {
                object.insert("value".to_string(), Value::String(value.to_string()));
            }
        }
    }
    object
}

fn string_field<'a>(
    object: &'a Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<&'a str, PatternError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .ok_or(PatternError::InvalidField {
            kind,
            field,
            expected: "must be a string",
        })
}

fn optional_string_field<'a>(
    object: &'a Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<&'a str>, PatternError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(PatternError::InvalidField {
            kind,
            field,
            expected: "must be a string when present",
        }),
    }
}

fn decode_equal_to(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    let expected = string_field(object, EQUAL_TO, EQUAL_TO)?;
    let case_insensitive = match object.get("caseInsensitive") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(PatternError::InvalidField {
                kind: EQUAL_TO,
                field: "caseInsensitive",
                expected: "must be a boolean",
            })
        }
    };
    Ok(if case_insensitive {
        StringValuePattern::equal_to_ignore_case(expected)
    } else {
        StringValuePattern::equal_to(expected)
    })
}

fn decode_contains(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    string_field(object, CONTAINS, CONTAINS).map(StringValuePattern::contains)
}

fn decode_matches(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    StringValuePattern::matches(string_field(object, MATCHES, MATCHES)?)
}

fn decode_does_not_match(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    StringValuePattern::does_not_match(string_field(object, DOES_NOT_MATCH, DOES_NOT_MATCH)?)
}

fn decode_equal_to_json(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    match object.get(EQUAL_TO_JSON) {
        Some(Value::String(text)) => StringValuePattern::equal_to_json(text),
        Some(Value::Null) | None => Err(PatternError::InvalidField {
            kind: EQUAL_TO_JSON,
            field: EQUAL_TO_JSON,
            expected: "must be a JSON document or a string containing one",
        }),
        Some(inline) => Ok(StringValuePattern::EqualToJson(JsonValuePattern::from_value(
            inline.clone(),
        ))),
    }
}

fn decode_absent(object: &Map<String, Value>) -> Result<StringValuePattern, PatternError> {
    match object.get(ABSENT) {
        Some(Value::Bool(true)) => Ok(StringValuePattern::absent()),
        _ => Err(PatternError::InvalidField {
            kind: ABSENT,
            field: ABSENT,
            expected: "must be true",
        }),
    }
}

fn decode_matches_form_data(
    object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let key = string_field(object, MATCHES_FORM_DATA, MATCHES_FORM_DATA)?;
    let value = optional_string_field(object, MATCHES_FORM_DATA, "value")?;
    FormDataPattern::new(Some(key), value).map(StringValuePattern::MatchesFormData)
}

impl Serialize for StringValuePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StringValuePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode(&value).map_err(D::Error::custom)
    }
}
