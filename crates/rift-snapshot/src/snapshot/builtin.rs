//! Built-in stub mapping transformers.
//!
//! - `remove-response-headers` drops the headers named in `headersToRemove`
//! - `response-template` marks the response for templating at serve time
//! - `decorate` runs the Rhai script in `decorateScript` against the stub

use super::spec::Parameters;
use super::transformer::{StubMappingTransformer, TransformContext, TransformerError};
use crate::stub::StubMapping;
use crate::template::RESPONSE_TEMPLATE;
use serde_json::Value;

pub struct RemoveResponseHeaders;

impl StubMappingTransformer for RemoveResponseHeaders {
    fn name(&self) -> &str {
        "remove-response-headers"
    }

    fn transform(
        &self,
        mut stub: StubMapping,
        parameters: &Parameters,
        _context: &TransformContext,
    ) -> Result<StubMapping, TransformerError> {
        const PARAM: &str = "headersToRemove";
        let names = match parameters.get(PARAM) {
            None | Some(Value::Null) => return Ok(stub),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| TransformerError::InvalidParameter {
                        name: PARAM,
                        reason: format!("expected header names, got {item}"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(TransformerError::InvalidParameter {
                    name: PARAM,
                    reason: format!("expected an array, got {other}"),
                })
            }
        };
        stub.response
            .headers
            .retain(|k, _| !names.iter().any(|n| n.eq_ignore_ascii_case(k)));
        Ok(stub)
    }
}

pub struct ResponseTemplateTransformer;

impl StubMappingTransformer for ResponseTemplateTransformer {
    fn name(&self) -> &str {
        RESPONSE_TEMPLATE
    }

    fn transform(
        &self,
        mut stub: StubMapping,
        _parameters: &Parameters,
        _context: &TransformContext,
    ) -> Result<StubMapping, TransformerError> {
        if !stub.response.has_transformer(RESPONSE_TEMPLATE) {
            stub.response.transformers.push(RESPONSE_TEMPLATE.to_string());
        }
        Ok(stub)
    }
}

/// Runs a Rhai script with `stub` (id, name, request) and `response`
/// (status, headers, body) in scope; changes to `response` are written back.
pub struct DecorateTransformer;

impl StubMappingTransformer for DecorateTransformer {
    fn name(&self) -> &str {
        "decorate"
    }

    fn transform(
        &self,
        stub: StubMapping,
        parameters: &Parameters,
        _context: &TransformContext,
    ) -> Result<StubMapping, TransformerError> {
        const PARAM: &str = "decorateScript";
        let script = match parameters.get(PARAM) {
            Some(Value::String(script)) => script,
            Some(other) => {
                return Err(TransformerError::InvalidParameter {
                    name: PARAM,
                    reason: format!("expected a script string, got {other}"),
                })
            }
            None => return Err(TransformerError::MissingParameter(PARAM)),
        };
        apply_decorate(script, stub)
    }
}

fn apply_decorate(script: &str, mut stub: StubMapping) -> Result<StubMapping, TransformerError> {
    use rhai::{Dynamic, Engine, Map, Scope};

    let engine = Engine::new();
    let mut scope = Scope::new();

    let mut stub_map = Map::new();
    stub_map.insert("id".into(), Dynamic::from(stub.id.to_string()));
    stub_map.insert(
        "name".into(),
        Dynamic::from(stub.name.clone().unwrap_or_default()),
    );
    stub_map.insert(
        "method".into(),
        Dynamic::from(stub.request.method.clone().unwrap_or_default()),
    );
    stub_map.insert(
        "url".into(),
        Dynamic::from(stub.request.url.clone().unwrap_or_default()),
    );

    let mut resp_map = Map::new();
    resp_map.insert("status".into(), Dynamic::from(stub.response.status as i64));
    resp_map.insert(
        "body".into(),
        Dynamic::from(stub.response.body.clone().unwrap_or_default()),
    );
    let mut resp_headers_map = Map::new();
    for (k, v) in &stub.response.headers {
        resp_headers_map.insert(k.clone().into(), Dynamic::from(v.clone()));
    }
    resp_map.insert("headers".into(), Dynamic::from(resp_headers_map));

    scope.push("stub", stub_map);
    scope.push("response", resp_map);

    engine
        .eval_with_scope::<Dynamic>(&mut scope, script)
        .map_err(|e| TransformerError::Script(e.to_string()))?;

    let Some(response) = scope.get_value::<Map>("response") else {
        return Ok(stub);
    };

    if let Some(status) = response.get("status").and_then(|v| v.clone().try_cast::<i64>()) {
        stub.response.status = u16::try_from(status).map_err(|_| {
            TransformerError::Script(format!("status {status} is not a valid HTTP status"))
        })?;
    }

    if let Some(body) = response.get("body").and_then(|v| v.clone().try_cast::<String>()) {
        let unchanged = stub.response.body.as_deref().unwrap_or_default() == body;
        if !unchanged {
            stub.response.body = Some(body);
            stub.response.base64_body = None;
        }
    }

    if let Some(headers_map) = response
        .get("headers")
        .and_then(|h| h.clone().try_cast::<Map>())
    {
        stub.response.headers = headers_map
            .into_iter()
            .filter_map(|(k, v)| v.try_cast::<String>().map(|value| (k.to_string(), value)))
            .collect();
    }

    Ok(stub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::RequestPattern;
    use crate::stub::ResponseDefinition;
    use serde_json::json;
    use std::path::PathBuf;

    fn context() -> TransformContext {
        TransformContext {
            files_root: PathBuf::from("."),
        }
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    fn stub() -> StubMapping {
        StubMapping::new(
            RequestPattern::new("GET", "/api/users"),
            ResponseDefinition::new(200)
                .with_header("Content-Type", "application/json")
                .with_header("Date", "Mon, 01 Jan 2024 00:00:00 GMT")
                .with_header("Set-Cookie", "session=abc")
                .with_body("[]"),
        )
        .with_name("api_users")
    }

    #[test]
    fn test_remove_response_headers() {
        let out = RemoveResponseHeaders
            .transform(
                stub(),
                &params(json!({"headersToRemove": ["date", "SET-COOKIE"]})),
                &context(),
            )
            .unwrap();
        assert_eq!(out.response.headers.len(), 1);
        assert!(out.response.header("content-type").is_some());
    }

    #[test]
    fn test_remove_response_headers_without_parameter_is_noop() {
        let s = stub();
        let out = RemoveResponseHeaders
            .transform(s.clone(), &Parameters::new(), &context())
            .unwrap();
        assert_eq!(out, s);
    }

    #[test]
    fn test_remove_response_headers_rejects_bad_parameter() {
        let err = RemoveResponseHeaders
            .transform(stub(), &params(json!({"headersToRemove": "Date"})), &context())
            .unwrap_err();
        assert!(matches!(
            err,
            TransformerError::InvalidParameter {
                name: "headersToRemove",
                ..
            }
        ));
    }

    #[test]
    fn test_response_template_marks_once() {
        let once = ResponseTemplateTransformer
            .transform(stub(), &Parameters::new(), &context())
            .unwrap();
        let twice = ResponseTemplateTransformer
            .transform(once, &Parameters::new(), &context())
            .unwrap();
        assert_eq!(twice.response.transformers, vec![RESPONSE_TEMPLATE]);
    }

    #[test]
    fn test_decorate_modifies_response() {
        let script = r#"
            response.status = 201;
            response.body = "decorated " + stub.name;
            response.headers["X-Decorated"] = "yes";
        "#;
        let out = DecorateTransformer
            .transform(stub(), &params(json!({"decorateScript": script})), &context())
            .unwrap();
        assert_eq!(out.response.status, 201);
        assert_eq!(out.response.body.as_deref(), Some("decorated api_users"));
        assert_eq!(out.response.header("x-decorated"), Some("yes"));
        assert_eq!(out.response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_decorate_can_remove_headers() {
        let script = r#"
            let headers = response.headers;
            headers.remove("Date");
            response.headers = headers;
        "#;
        let out = DecorateTransformer
            .transform(stub(), &params(json!({"decorateScript": script})), &context())
            .unwrap();
        assert!(out.response.header("date").is_none());
    }

    #[test]
    fn test_decorate_keeps_binary_body_when_untouched() {
        let mut s = stub();
        s.response = ResponseDefinition::new(200).with_binary_body(&[1, 2, 3]);
        let out = DecorateTransformer
            .transform(s, &params(json!({"decorateScript": "let x = 1;"})), &context())
            .unwrap();
        assert!(out.response.is_binary());
        assert_eq!(out.response.inline_body(), vec![1, 2, 3]);
    }

    #[test]
    fn test_decorate_requires_script() {
        let err = DecorateTransformer
            .transform(stub(), &Parameters::new(), &context())
            .unwrap_err();
        assert!(matches!(err, TransformerError::MissingParameter("decorateScript")));
    }

    #[test]
    fn test_decorate_script_error() {
        let err = DecorateTransformer
            .transform(
                stub(),
                &params(json!({"decorateScript": "this is not rhai ("})),
                &context(),
            )
            .unwrap_err();
        assert!(matches!(err, TransformerError::Script(_)));
    }
}
