//! Types for captured exchanges - requests, responses and serve events.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Case-insensitive header lookup over a captured header map.
fn find_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Body content held either as text or, for binary payloads, as base64.
fn decode_body(body: Option<&str>, body_as_base64: Option<&str>) -> Vec<u8> {
    if let Some(text) = body {
        return text.as_bytes().to_vec();
    }
    body_as_base64
        .and_then(|b64| BASE64.decode(b64).ok())
        .unwrap_or_default()
}

/// A request as it was observed by the proxying path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRequest {
    /// Path plus query string, e.g. `/api/users?page=2`
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_base64: Option<String>,
}

impl LoggedRequest {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.to_uppercase(),
            headers: BTreeMap::new(),
            body: None,
            body_as_base64: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_as_base64 = None;
        self
    }

    pub fn with_binary_body(mut self, body: &[u8]) -> Self {
        self.body = None;
        self.body_as_base64 = Some(BASE64.encode(body));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        decode_body(self.body.as_deref(), self.body_as_base64.as_deref())
    }

    /// Body as text; a base64 body is decoded when it is valid UTF-8.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        if let Some(text) = &self.body {
            return Some(Cow::Borrowed(text));
        }
        let bytes = BASE64.decode(self.body_as_base64.as_deref()?).ok()?;
        String::from_utf8(bytes).ok().map(Cow::Owned)
    }

    /// SHA-256 over the loggable fields: method, url, headers (names
    /// lowercased, sorted) and body bytes. Hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut headers: Vec<_> = self
            .headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_str()))
            .collect();
        headers.sort();

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        for (name, value) in headers {
            hasher.update(name.as_bytes());
            hasher.update(b":");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(self.body_bytes());
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A response as it was returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_base64: Option<String>,
    /// True when the response came from the proxied backend rather than a
    /// local stub.
    #[serde(default)]
    pub proxied: bool,
}

impl LoggedResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            body_as_base64: None,
            proxied: false,
        }
    }

    pub fn from_proxy(status: u16) -> Self {
        Self {
            proxied: true,
            ..Self::new(status)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_as_base64 = None;
        self
    }

    pub fn with_binary_body(mut self, body: &[u8]) -> Self {
        self.body = None;
        self.body_as_base64 = Some(BASE64.encode(body));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        decode_body(self.body.as_deref(), self.body_as_base64.as_deref())
    }
}

/// One captured exchange. Immutable once appended to a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub request: LoggedRequest,
    pub response: LoggedResponse,
    #[serde(default = "Utc::now")]
    pub logged_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<u64>,
}

impl ServeEvent {
    pub fn new(request: LoggedRequest, response: LoggedResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            response,
            logged_date: Utc::now(),
            timing_ms: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn at(mut self, logged_date: DateTime<Utc>) -> Self {
        self.logged_date = logged_date;
        self
    }

    pub fn was_proxied(&self) -> bool {
        self.response.proxied
    }
}
