//! Responses and the proxy's envelope / JSONP wrappings.

use serde_json::Value;

use crate::error::{SmokeError, SmokeResult};

const JSONP_PREFIX: &str = "/**/";

/// A buffered response plus the request it answers.
#[derive(Debug, Clone)]
pub struct Response {
    pub request_method: String,
    pub request_uri: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(
        request_method: impl Into<String>,
        request_uri: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            request_method: request_method.into(),
            request_uri: request_uri.into(),
            status,
            body: body.into(),
        }
    }

    pub fn json(&self) -> SmokeResult<Value> {
        parse_json(&self.body)
    }

    /// Unwrap an `envelope=response` body into the inner response.
    pub fn unwrap_envelope(&self) -> SmokeResult<Response> {
        self.from_envelope(&self.json()?)
    }

    /// Unwrap a `/**/callback({...})` JSONP body into the inner response.
    pub fn unwrap_jsonp(&self) -> SmokeResult<Response> {
        let (_, payload) = self.split_jsonp().ok_or_else(|| {
            SmokeError::Assertion(format!("cannot unwrap jsonp from: {}", self.body))
        })?;
        self.from_envelope(&parse_json(payload)?)
    }

    /// `(callback, payload)` if the body is JSONP.
    pub fn split_jsonp(&self) -> Option<(&str, &str)> {
        let stripped = self.body.strip_prefix(JSONP_PREFIX)?.trim();
        let open = stripped.find('(')?;
        let inner = stripped.strip_suffix(')')?;
        if open == 0 || open >= inner.len() {
            return None;
        }
        Some((&stripped[..open], &inner[open + 1..]))
    }

    fn from_envelope(&self, envelope: &Value) -> SmokeResult<Response> {
        let status = envelope
            .get("status")
            .and_then(Value::as_u64)
            .ok_or_else(|| SmokeError::Assertion(format!("envelope has no status: {envelope}")))?;
        let status = u16::try_from(status).map_err(|_| {
            SmokeError::Assertion(format!("envelope status out of range: {status}"))
        })?;
        let body = envelope.get("body").cloned().unwrap_or(Value::Null);
        Ok(Response::new(
            self.request_method.clone(),
            self.request_uri.clone(),
            status,
            format_json(&body),
        ))
    }

    /// Body for error messages: pretty JSON when short, else the first lines.
    pub fn dump(&self) -> String {
        let lines: Vec<&str> = self.body.lines().collect();
        if lines.len() < 15 {
            if let Ok(value) = serde_json::from_str::<Value>(&self.body) {
                return indent(&format_json(&value), 2);
            }
        }
        lines
            .iter()
            .take(10)
            .map(|l| format!("  {l}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn parse_json(body: &str) -> SmokeResult<Value> {
    serde_json::from_str(body).map_err(|e| {
        if body.trim().is_empty() {
            SmokeError::Json("body was empty".to_string())
        } else {
            SmokeError::Json(format!("invalid json ({e})\n{body}"))
        }
    })
}

/// Pretty JSON with empty arrays and objects kept on one line.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn indent(text: &str, by: usize) -> String {
    let pad = " ".repeat(by);
    text.lines()
        .map(|l| format!("{pad}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resp(status: u16, body: &str) -> Response {
        Response::new("POST", "http://localhost:7000/foo", status, body)
    }

    #[test]
    fn envelope_unwraps_status_and_body() {
        let r = resp(
            200,
            r#"{"status":422,"headers":{},"body":{"code":"generic_error","messages":["nope"]}}"#,
        );
        let inner = r.unwrap_envelope().unwrap();
        assert_eq!(inner.status, 422);
        assert_eq!(inner.json().unwrap()["messages"], json!(["nope"]));
        assert_eq!(inner.request_method, "POST");
    }

    #[test]
    fn jsonp_splits_callback_and_payload() {
        let r = resp(200, "/**/cb({\"status\":200,\"headers\":{},\"body\":{\"id\":\"x\"}})\n");
        let (callback, payload) = r.split_jsonp().unwrap();
        assert_eq!(callback, "cb");
        assert!(payload.starts_with('{'));
        let inner = r.unwrap_jsonp().unwrap();
        assert_eq!(inner.status, 200);
        assert_eq!(inner.json().unwrap()["id"], "x");
    }

    #[test]
    fn plain_json_is_not_jsonp() {
        let r = resp(200, r#"{"status":200}"#);
        assert!(r.split_jsonp().is_none());
        assert!(r.unwrap_jsonp().is_err());
    }

    #[test]
    fn envelope_status_beyond_u16_is_rejected() {
        let r = resp(200, r#"{"status":65736,"headers":{},"body":{}}"#);
        let err = r.unwrap_envelope().unwrap_err();
        assert!(err.to_string().contains("out of range: 65736"));
    }

    #[test]
    fn empty_body_is_reported() {
        let err = resp(200, "  ").json().unwrap_err();
        assert!(err.to_string().contains("body was empty"));
    }

    #[test]
    fn dump_truncates_long_bodies() {
        let body = (0..40).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let dump = resp(500, &body).dump();
        assert_eq!(dump.lines().count(), 10);
        assert!(dump.starts_with("  line 0"));
    }

    #[test]
    fn format_json_keeps_empty_collections_inline() {
        assert_eq!(format_json(&json!({"a": [], "b": {}})), "{\n  \"a\": [],\n  \"b\": {}\n}");
    }
}
