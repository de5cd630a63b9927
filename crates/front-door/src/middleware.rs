// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! This module provides the CORS policy and the body-parsing middleware that
//! runs ahead of route dispatch. Parsed bodies are stored in request
//! extensions; a malformed body surfaces as a [`ServerError::BodyParse`] and
//! is rendered by the error boundary, never swallowed.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::{
    config::{CorsOrigin, Environment},
    error::ServerError,
    state::ServerState,
};

/// Maximum accepted request body size
const MAX_BODY_SIZE: usize = 1024 * 1024; // 1MB limit

/// A request body parsed ahead of route dispatch, available to handlers
/// through request extensions
#[derive(Debug, Clone)]
pub enum ParsedBody {
    /// Body parsed from `application/json`
    Json(Value),
    /// Body parsed from `application/x-www-form-urlencoded` (nested keys
    /// supported)
    Form(Value),
}

impl ParsedBody {
    /// The parsed structure, regardless of source encoding
    pub fn value(&self) -> &Value {
        match self {
            ParsedBody::Json(value) | ParsedBody::Form(value) => value,
        }
    }
}

/// Build the CORS layer for the configured origin
///
/// Credentials are always allowed. A concrete origin is sent back verbatim;
/// the wildcard reflects the caller's origin, since the `*` header cannot be
/// combined with credentials. Disallowed origins are not rejected server-side,
/// the browser enforces the policy from the response headers.
pub fn cors_layer(origin: &CorsOrigin) -> CorsLayer {
    let allow_origin = match origin.header_value() {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(req: &Request) -> Option<BodyKind> {
    let content_type = req
        .headers()
        .get(axum::http::header::CONTENT_TYPE)?
        .to_str()
        .ok()?;

    // media type only, parameters such as charset do not matter here
    let mime = content_type.split(';').next()?.trim();

    if mime.eq_ignore_ascii_case("application/json") {
        Some(BodyKind::Json)
    } else if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(BodyKind::Form)
    } else {
        None
    }
}

/// Body-parsing middleware, applied to every request before route dispatch
///
/// JSON and url-encoded bodies are buffered, parsed, and stored as a
/// [`ParsedBody`] extension; the original bytes are restored so downstream
/// extractors still work. Other content types, and empty bodies, pass through
/// untouched.
///
/// # Errors
///
/// Returns `ServerError::BodyParse` when the body cannot be read or parsed.
pub async fn parse_body(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let environment = state.config().environment;

    let Some(kind) = body_kind(&req) else {
        return Ok(next.run(req).await);
    };

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|e| ServerError::BodyParse {
            detail: format!("failed to read request body: {e}"),
            environment,
        })?;

    let mut req = Request::from_parts(parts, Body::from(bytes.clone()));
    if !bytes.is_empty() {
        let parsed = match kind {
            BodyKind::Json => ParsedBody::Json(parse_json(&bytes, environment)?),
            BodyKind::Form => ParsedBody::Form(parse_form(&bytes)),
        };
        req.extensions_mut().insert(parsed);
    }

    Ok(next.run(req).await)
}

/// Parse a JSON body, reporting position detail for malformed input
fn parse_json(bytes: &[u8], environment: Environment) -> Result<Value, ServerError> {
    serde_json::from_slice(bytes).map_err(|err| {
        let detail = if err.is_eof() {
            "unexpected end of JSON input, request body appears truncated".to_string()
        } else {
            format!(
                "invalid JSON body at line {}, column {}: {err}",
                err.line(),
                err.column()
            )
        };
        ServerError::BodyParse {
            detail,
            environment,
        }
    })
}

/// Parse a url-encoded body into a nested mapping
///
/// Bracketed keys nest (`a[b][c]=v`), `key[]` appends to an array, and
/// repeated scalar keys collect into an array. Url-encoded input has no
/// failure mode here, undecodable sequences are replaced during decoding.
fn parse_form(bytes: &[u8]) -> Value {
    let mut root = serde_json::Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let segments = split_key(&key);
        insert_nested(&mut root, &segments, value.into_owned());
    }
    Value::Object(root)
}

/// Split `a[b][c]` into `["a", "b", "c"]`; a trailing `[]` yields an empty
/// final segment
fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(end) = rest.strip_prefix('[').and_then(|r| r.find(']')) {
        segments.push(&rest[1..=end]);
        rest = &rest[end + 2..];
    }
    segments
}

fn insert_nested(map: &mut serde_json::Map<String, Value>, segments: &[&str], value: String) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    let head = (*head).to_string();

    if tail.is_empty() {
        match map.get_mut(&head) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(head, Value::String(value));
            }
        }
    } else if tail == [""] {
        // key[]=v appends
        let entry = map.entry(head).or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(Value::String(value));
        }
    } else {
        let entry = map
            .entry(head)
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(child) = entry {
            insert_nested(child, tail, value);
        }
        // a scalar already stored under this key wins, the conflicting
        // nested pair is dropped
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Json, Router,
        http::{Method, StatusCode, header},
        routing::post,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn key_splitting() {
        assert_eq!(split_key("plain"), vec!["plain"]);
        assert_eq!(split_key("a[b]"), vec!["a", "b"]);
        assert_eq!(split_key("a[b][c]"), vec!["a", "b", "c"]);
        assert_eq!(split_key("tags[]"), vec!["tags", ""]);
    }

    #[test]
    fn form_parsing_flat() {
        let parsed = parse_form(b"name=Alice&age=30");
        assert_eq!(parsed, json!({"name": "Alice", "age": "30"}));
    }

    #[test]
    fn form_parsing_nested() {
        let parsed = parse_form(b"user[name]=Alice&user[address][city]=Bandung");
        assert_eq!(
            parsed,
            json!({"user": {"name": "Alice", "address": {"city": "Bandung"}}})
        );
    }

    #[test]
    fn form_parsing_repeated_keys_collect() {
        let parsed = parse_form(b"tag=a&tag=b&list[]=1&list[]=2");
        assert_eq!(parsed, json!({"tag": ["a", "b"], "list": ["1", "2"]}));
    }

    #[test]
    fn form_parsing_shape_conflict_keeps_first_value() {
        let parsed = parse_form(b"a=1&a[b]=2");
        assert_eq!(parsed, json!({"a": "1"}));
    }

    #[test]
    fn body_kind_matches_media_type_exactly() {
        fn typed(content_type: &str) -> Request {
            Request::builder()
                .method(Method::POST)
                .uri("/echo")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::empty())
                .expect("request construction")
        }

        assert_eq!(body_kind(&typed("application/json")), Some(BodyKind::Json));
        assert_eq!(
            body_kind(&typed("application/json; charset=utf-8")),
            Some(BodyKind::Json)
        );
        assert_eq!(body_kind(&typed("APPLICATION/JSON")), Some(BodyKind::Json));
        assert_eq!(
            body_kind(&typed("application/x-www-form-urlencoded")),
            Some(BodyKind::Form)
        );
        // near-miss media types must not be parsed
        assert_eq!(body_kind(&typed("application/jsonfoo")), None);
        assert_eq!(body_kind(&typed("application/json-patch+json")), None);
        assert_eq!(body_kind(&typed("text/plain")), None);
    }

    #[test]
    fn form_parsing_decodes_percent_escapes() {
        let parsed = parse_form(b"greeting=hello%20world");
        assert_eq!(parsed, json!({"greeting": "hello world"}));
    }

    #[test]
    fn json_parsing_reports_position() {
        let err = parse_json(b"{\"a\": }", Environment::Development)
            .expect_err("malformed JSON must fail");
        match err {
            ServerError::BodyParse { detail, .. } => {
                assert!(detail.contains("line 1"));
            }
            other => panic!("expected BodyParse, got {other:?}"),
        }
    }

    #[test]
    fn json_parsing_reports_truncation() {
        let err = parse_json(b"{\"a\": ", Environment::Development)
            .expect_err("truncated JSON must fail");
        match err {
            ServerError::BodyParse { detail, .. } => {
                assert!(detail.contains("truncated"));
            }
            other => panic!("expected BodyParse, got {other:?}"),
        }
    }

    fn test_app() -> Router {
        async fn echo(body: Option<Extension<ParsedBody>>) -> Json<Value> {
            match body {
                Some(Extension(parsed)) => Json(parsed.value().clone()),
                None => Json(Value::Null),
            }
        }

        let state = ServerState::new(ServerConfig::for_testing());
        Router::new()
            .route("/echo", post(echo))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                parse_body,
            ))
            .with_state(state)
    }

    fn request(content_type: &str, body: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .expect("request construction")
    }

    #[tokio::test]
    async fn json_body_reaches_handler() {
        let response = test_app()
            .oneshot(request("application/json", r#"{"name": "Alice"}"#))
            .await
            .expect("middleware stack");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("JSON body");
        assert_eq!(value, json!({"name": "Alice"}));
    }

    #[tokio::test]
    async fn form_body_reaches_handler() {
        let response = test_app()
            .oneshot(request(
                "application/x-www-form-urlencoded",
                "user[name]=Alice",
            ))
            .await
            .expect("middleware stack");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("JSON body");
        assert_eq!(value, json!({"user": {"name": "Alice"}}));
    }

    #[tokio::test]
    async fn malformed_json_yields_internal_error() {
        let response = test_app()
            .oneshot(request("application/json", "{invalid"))
            .await
            .expect("middleware stack");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("JSON body");
        assert_eq!(value["error"], "Internal Server Error");
        // testing environment gets the generic message
        assert_eq!(value["message"], "Something went wrong");
    }

    #[tokio::test]
    async fn unrelated_content_type_passes_through() {
        let response = test_app()
            .oneshot(request("text/plain", "just some text"))
            .await
            .expect("middleware stack");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("JSON body");
        assert_eq!(value, Value::Null);
    }
}
