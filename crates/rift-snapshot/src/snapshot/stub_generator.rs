//! Stub generation from captured exchanges.

use super::spec::CaptureHeader;
use crate::predicate::{decode_form_data, PatternError, RequestPattern, StringValuePattern};
use crate::recording::{LoggedRequest, LoggedResponse, ServeEvent};
use crate::stub::{ResponseDefinition, StubMapping};
use std::collections::BTreeMap;
use tracing::debug;

/// Connection-scoped headers that must not be replayed.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Build a stub name from a url: path segments joined by `_`, anything but
/// ASCII alphanumerics and `-` replaced by `_`. The root path is `root`.
pub fn url_slug(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            segment
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect()
        })
        .collect();
    if segments.is_empty() {
        "root".to_string()
    } else {
        segments.join("_")
    }
}

fn media_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Body patterns for a captured request, chosen by its content type.
fn body_patterns(request: &LoggedRequest) -> Result<Vec<StringValuePattern>, PatternError> {
    let Some(body) = request.body_text() else {
        if request.body_as_base64.is_some() {
            debug!("Binary request body of {} {} is not matched", request.method, request.url);
        }
        return Ok(Vec::new());
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let media_type = media_type(request.content_type());
    if is_json_media_type(&media_type) && serde_json::from_str::<serde_json::Value>(&body).is_ok()
    {
        return Ok(vec![StringValuePattern::equal_to_json(&body)?]);
    }
    if media_type == "application/x-www-form-urlencoded" {
        return decode_form_data(&body)
            .iter()
            .map(|(key, value)| {
                StringValuePattern::matches_form_data(key, Some(regex::escape(value).as_str()))
            })
            .collect();
    }
    Ok(vec![StringValuePattern::equal_to(body.into_owned())])
}

fn request_pattern(
    request: &LoggedRequest,
    capture_headers: &BTreeMap<String, CaptureHeader>,
) -> Result<RequestPattern, PatternError> {
    let mut pattern = RequestPattern::new(request.method.clone(), request.url.clone());
    for (name, options) in capture_headers {
        if let Some(value) = request.header(name) {
            let header_pattern = if options.case_insensitive {
                StringValuePattern::equal_to_ignore_case(value)
            } else {
                StringValuePattern::equal_to(value)
            };
            pattern.headers.insert(name.clone(), header_pattern);
        }
    }
    pattern.body_patterns = body_patterns(request)?;
    Ok(pattern)
}

fn response_definition(response: &LoggedResponse) -> ResponseDefinition {
    let mut definition = ResponseDefinition::new(response.status);
    definition.headers = response
        .headers
        .iter()
        .filter(|(k, _)| !HOP_BY_HOP_HEADERS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    definition.body = response.body.clone().filter(|b| !b.is_empty());
    if definition.body.is_none() {
        definition.base64_body = response.body_as_base64.clone().filter(|b| !b.is_empty());
    }
    definition
}

/// Generate a draft stub from one captured exchange.
///
/// The stub takes the exchange id and a name derived from the url. Only the
/// request headers listed in `capture_headers` become header patterns.
pub fn generate_stub(
    event: &ServeEvent,
    capture_headers: &BTreeMap<String, CaptureHeader>,
) -> Result<StubMapping, PatternError> {
    let request = request_pattern(&event.request, capture_headers)?;
    let response = response_definition(&event.response);
    debug!(
        "Generated stub {} for {} {}",
        event.id, event.request.method, event.request.url
    );
    Ok(StubMapping::new(request, response)
        .with_id(event.id)
        .with_name(url_slug(&event.request.url)))
}
