//! Stub mapping and response definition types.

use crate::predicate::RequestPattern;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Initial state of every scenario.
pub const STARTED: &str = "Started";

pub(crate) fn default_status_code() -> u16 {
    200
}

/// Deserialize status from either a number or a string
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("status must be a number or string")),
    }
}

/// Canned response of a stub.
///
/// At most one of `body`, `base64Body` and `bodyFileName` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_body: Option<String>,
    /// File under `<filesRoot>/__files` holding the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file_name: Option<String>,
    /// Names of serve-time response transformers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,
}

impl Default for ResponseDefinition {
    fn default() -> Self {
        Self::new(default_status_code())
    }
}

impl ResponseDefinition {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            base64_body: None,
            body_file_name: None,
            transformers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.base64_body = None;
        self
    }

    pub fn with_binary_body(mut self, body: &[u8]) -> Self {
        self.body = None;
        self.base64_body = Some(BASE64.encode(body));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_binary(&self) -> bool {
        self.body.is_none() && self.base64_body.is_some()
    }

    /// Inline body bytes. Empty for a file-backed or bodiless response.
    pub fn inline_body(&self) -> Vec<u8> {
        if let Some(body) = &self.body {
            return body.as_bytes().to_vec();
        }
        self.base64_body
            .as_deref()
            .and_then(|b64| BASE64.decode(b64).ok())
            .unwrap_or_default()
    }

    pub fn has_transformer(&self, name: &str) -> bool {
        self.transformers.iter().any(|t| t == name)
    }
}

/// A request pattern paired with a canned response, optionally taking part
/// in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubMapping {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub request: RequestPattern,
    #[serde(default)]
    pub response: ResponseDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub persistent: bool,
}

impl StubMapping {
    pub fn new(request: RequestPattern, response: ResponseDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            request,
            response,
            scenario_name: None,
            required_scenario_state: None,
            new_scenario_state: None,
            persistent: false,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_scenario(
        mut self,
        scenario: impl Into<String>,
        required_state: impl Into<String>,
        new_state: impl Into<String>,
    ) -> Self {
        self.scenario_name = Some(scenario.into());
        self.required_scenario_state = Some(required_state.into());
        self.new_scenario_state = Some(new_state.into());
        self
    }

    pub fn is_in_scenario(&self) -> bool {
        self.scenario_name.is_some()
    }
}
