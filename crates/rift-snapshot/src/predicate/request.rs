//! Request patterns: the match dimensions of a stub mapping.

use super::codec::encode;
use super::matcher::{string_distance, MatchResult};
use super::string_matcher::{StringValuePattern, EQUAL_TO_JSON};
use crate::recording::LoggedRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Method value that matches any request method.
pub const ANY_METHOD: &str = "ANY";

/// Pattern a request must satisfy for a stub to apply.
///
/// Absent dimensions are unconstrained. Header names are compared
/// case-insensitively; each header pattern sees the first value of that header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, StringValuePattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<StringValuePattern>,
}

impl RequestPattern {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, pattern: StringValuePattern) -> Self {
        self.headers.insert(name.into(), pattern);
        self
    }

    pub fn with_body_pattern(mut self, pattern: StringValuePattern) -> Self {
        self.body_patterns.push(pattern);
        self
    }

    /// Stable structural key, used to detect equivalent patterns.
    ///
    /// `equalToJson` documents contribute their parsed value, so the same
    /// document written with different spacing or key order gives one key.
    pub fn signature(&self) -> String {
        let mut key = serde_json::to_value(self).unwrap_or_default();
        if let Some(fields) = key.as_object_mut() {
            if !self.headers.is_empty() {
                let headers: Map<String, Value> = self
                    .headers
                    .iter()
                    .map(|(name, pattern)| (name.clone(), canonical(pattern)))
                    .collect();
                fields.insert("headers".to_string(), Value::Object(headers));
            }
            if !self.body_patterns.is_empty() {
                let bodies: Vec<Value> = self.body_patterns.iter().map(canonical).collect();
                fields.insert("bodyPatterns".to_string(), Value::Array(bodies));
            }
        }
        key.to_string()
    }

    pub fn match_request(&self, request: &LoggedRequest) -> MatchResult {
        let mut results = Vec::with_capacity(2 + self.headers.len() + self.body_patterns.len());

        if let Some(method) = self.method.as_deref().filter(|m| *m != ANY_METHOD) {
            results.push(MatchResult::of(method == request.method));
        }

        if let Some(url) = &self.url {
            results.push(if *url == request.url {
                MatchResult::exact()
            } else {
                MatchResult::partial(string_distance(url, &request.url))
            });
        }

        for (name, pattern) in &self.headers {
            results.push(pattern.match_value(request.header(name)));
        }

        if !self.body_patterns.is_empty() {
            let body = request.body_text();
            for pattern in &self.body_patterns {
                results.push(pattern.match_value(body.as_deref()));
            }
        }

        MatchResult::aggregate(results)
    }
}

fn canonical(pattern: &StringValuePattern) -> Value {
    match pattern {
        StringValuePattern::EqualToJson(json) => {
            let mut fields = Map::new();
            fields.insert(EQUAL_TO_JSON.to_string(), json.parsed().clone());
            Value::Object(fields)
        }
        other => Value::Object(encode(other)),
    }
}
