//! Form-encoded body decoding and the `matchesFormData` pattern.
//!
//! Decoding is best effort: a pair whose value cannot be percent-decoded
//! keeps its key with an empty value instead of failing the whole body.

use super::error::PatternError;
use super::matcher::{CompiledRegex, MatchResult};
use std::collections::BTreeMap;

pub const MATCHES_FORM_DATA: &str = "matchesFormData";

/// Decode an `application/x-www-form-urlencoded` body into key/value pairs.
///
/// - pairs are separated by `&`, key and value by the first `=`
/// - a key without `=` decodes to an empty value
/// - values are percent-decoded as UTF-8 with `+` read as a space
/// - duplicate keys: the last occurrence wins
pub fn decode_form_data(body: &str) -> BTreeMap<String, String> {
    let mut form = BTreeMap::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((key, raw)) => (key, decode_component(raw).unwrap_or_default()),
            None => (pair, String::new()),
        };
        form.insert(key.to_string(), value);
    }
    form
}

/// Percent-decode one form value. `None` when an escape is malformed or the
/// decoded bytes are not UTF-8.
fn decode_component(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Matches a form-encoded subject on the presence of a key and, optionally,
/// on its decoded value against a full-match regex.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDataPattern {
    key: Option<String>,
    value: Option<CompiledRegex>,
}

impl FormDataPattern {
    /// The value regex is compiled here so a bad pattern fails at construction.
    pub fn new(key: Option<&str>, value: Option<&str>) -> Result<Self, PatternError> {
        let value = value
            .map(|v| {
                CompiledRegex::compile(v)
                    .map_err(|e| PatternError::invalid_regex(MATCHES_FORM_DATA, v, e))
            })
            .transpose()?;
        Ok(Self {
            key: key.map(str::to_string),
            value,
        })
    }

    pub fn expected_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn expected_value(&self) -> Option<&str> {
        self.value.as_ref().map(CompiledRegex::source)
    }

    pub fn match_value(&self, subject: Option<&str>) -> MatchResult {
        let Some(subject) = subject else {
            return MatchResult::no_match();
        };
        let form = decode_form_data(subject);
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => {
                MatchResult::of(form.get(key).is_some_and(|v| value.is_full_match(v)))
            }
            (Some(key), None) => MatchResult::of(form.contains_key(key)),
            // Not produced by the codec; never matches.
            (None, _) => MatchResult::no_match(),
        }
    }
}
