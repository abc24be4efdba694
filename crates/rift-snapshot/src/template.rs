//! Request data extraction and response body templating.
//!
//! Responses marked with the `response-template` transformer have their body
//! rendered against the request that selected them.
//!
//! # Supported Template Variables
//!
//! - `${request.path}` - The request path
//! - `${request.url}` - Path plus query string
//! - `${request.method}` - The HTTP method
//! - `${request.query.<name>}` - Query parameter value
//! - `${request.headers.<name>}` - Header value (case-insensitive)
//! - `${request.formData.<key>}` - Decoded value of a form-encoded body field
//! - `${request.body}` - The raw request body
//!
//! # Example
//!
//! ```json
//! {
//!   "response": {
//!     "body": "Hello ${request.formData.user}",
//!     "transformers": ["response-template"]
//!   }
//! }
//! ```

use crate::predicate::decode_form_data;
use crate::recording::LoggedRequest;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Name of the serve-time transformer that enables templating of a response.
pub const RESPONSE_TEMPLATE: &str = "response-template";

/// Regex for matching template variables: ${request.path}, ${request.query.name}, etc.
static TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_template_regex() -> &'static Regex {
    TEMPLATE_REGEX.get_or_init(|| {
        Regex::new(r"\$\{request\.([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_.-]*)?)\}")
            .unwrap()
    })
}

/// Errors raised by template helpers when called with bad arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("The form data path cannot be empty")]
    MissingFormDataPath,
}

/// Parsed request data for template substitution
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    pub method: String,
    /// Request path (without query string)
    pub path: String,
    pub url: String,
    pub query: BTreeMap<String, String>,
    /// Request headers (keys lowercased)
    pub headers: BTreeMap<String, String>,
    /// Raw request body, `None` when the request had none
    pub body: Option<String>,
}

impl RequestData {
    pub fn from_request(request: &LoggedRequest) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path().to_string(),
            url: request.url.clone(),
            query: request.query().map(decode_form_data).unwrap_or_default(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
            body: request.body_text().map(|b| b.into_owned()),
        }
    }

    /// Value of one field of a form-encoded body.
    ///
    /// An absent body yields an empty string, as does a key the body does
    /// not carry.
    pub fn form_data_value(&self, key: Option<&str>) -> Result<String, TemplateError> {
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(TemplateError::MissingFormDataPath)?;
        let Some(body) = self.body.as_deref() else {
            return Ok(String::new());
        };
        debug!(body_len = body.len(), "Resolving form data value");
        trace!(body = %body, key = %key, "Form data helper input");

        Ok(decode_form_data(body).remove(key).unwrap_or_default())
    }

    /// Get a value by dotted path (e.g., "query.name", "headers.content-type")
    pub fn get(&self, path: &str) -> Option<String> {
        let parts: Vec<&str> = path.splitn(2, '.').collect();

        match parts.as_slice() {
            ["path"] => Some(self.path.clone()),
            ["url"] => Some(self.url.clone()),
            ["method"] => Some(self.method.clone()),
            ["body"] => Some(self.body.clone().unwrap_or_default()),
            ["query", name] => self.query.get(*name).cloned(),
            ["headers", name] => self.headers.get(&name.to_lowercase()).cloned(),
            ["formData"] => Some(match self.form_data_value(None) {
                Ok(value) => value,
                Err(e) => format!("[ERROR: {e}]"),
            }),
            ["formData", key] => self.form_data_value(Some(*key)).ok(),
            _ => None,
        }
    }
}

/// Substitute every `${request.*}` variable; unknown variables render empty.
pub fn process_template(template: &str, request_data: &RequestData) -> String {
    get_template_regex()
        .replace_all(template, |caps: &regex::Captures| {
            let var_path = &caps[1];
            request_data.get(var_path).unwrap_or_default()
        })
        .to_string()
}

/// Check if a string contains template variables
pub fn has_template_variables(s: &str) -> bool {
    get_template_regex().is_match(s)
}
