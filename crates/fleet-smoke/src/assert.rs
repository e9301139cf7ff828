//! Assertions over proxy responses.
//!
//! Each helper returns `SmokeError::Assertion` with enough of the response
//! to diagnose the failure.

use std::fmt::Debug;

use serde_json::Value;

use crate::error::{SmokeError, SmokeResult};
use crate::response::Response;

pub fn assert_equals<T: PartialEq + Debug>(expected: T, actual: T) -> SmokeResult<()> {
    if expected != actual {
        return Err(SmokeError::Assertion(format!(
            "expected[{expected:?}] actual[{actual:?}]"
        )));
    }
    Ok(())
}

pub fn assert_not_null(value: &Value) -> SmokeResult<()> {
    if value.is_null() {
        return Err(SmokeError::Assertion("expected value but got null".to_string()));
    }
    Ok(())
}

pub fn assert_status(expected: u16, response: &Response) -> SmokeResult<()> {
    assert_statuses(&[expected], response)
}

pub fn assert_statuses(expected: &[u16], response: &Response) -> SmokeResult<()> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    let wanted = match expected {
        [one] => format!("expected[{one}]"),
        many => format!(
            "expected one of[{}]",
            many.iter().map(u16::to_string).collect::<Vec<_>>().join(" ")
        ),
    };
    Err(SmokeError::Assertion(format!(
        "Invalid HTTP Status Code for {} {}: {wanted} actual[{}]\n{}",
        response.request_method,
        response.request_uri,
        response.status,
        response.dump()
    )))
}

pub fn assert_unauthorized(response: &Response) -> SmokeResult<()> {
    assert_status(401, response)
}

/// 422 with `{"code": "generic_error", "messages": [message]}`.
pub fn assert_generic_error(response: &Response, message: &str) -> SmokeResult<()> {
    assert_status(422, response)?;
    let js = response.json()?;
    assert_equals(Some("generic_error"), js.get("code").and_then(Value::as_str))?;
    assert_equals(&Value::from(vec![message]), js.get("messages").unwrap_or(&Value::Null))
}

/// 200 whose body has `status`, `headers` and `body` keys.
pub fn assert_envelope(response: &Response) -> SmokeResult<()> {
    let ok = response.status == 200
        && response
            .json()
            .map(|js| is_envelope(&js))
            .unwrap_or(false);
    if ok {
        return Ok(());
    }
    Err(SmokeError::Assertion(format!(
        "expected response envelope for {} {} but got\n  HTTP {}\n{}",
        response.request_method,
        response.request_uri,
        response.status,
        response.dump()
    )))
}

/// Like [`assert_envelope`] but wrapped as `/**/<callback>(...)`.
pub fn assert_jsonp(response: &Response, expected_callback: &str) -> SmokeResult<()> {
    let ok = response.status == 200
        && response
            .split_jsonp()
            .filter(|(callback, _)| *callback == expected_callback)
            .and_then(|(_, payload)| serde_json::from_str::<Value>(payload).ok())
            .is_some_and(|js| is_envelope(&js));
    if ok {
        return Ok(());
    }
    Err(SmokeError::Assertion(format!(
        "expected response envelope with jsonp callback[{expected_callback}] for {} {} but got\n  HTTP {}\n{}",
        response.request_method,
        response.request_uri,
        response.status,
        response.dump()
    )))
}

fn is_envelope(js: &Value) -> bool {
    ["status", "headers", "body"]
        .iter()
        .all(|k| js.get(k).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> Response {
        Response::new("POST", "http://localhost:7000/foo", status, body)
    }

    #[test]
    fn generic_error_matches_code_and_single_message() {
        let r = resp(422, r#"{"code":"generic_error","messages":["HTTP 'POST /foo' is not defined"]}"#);
        assert!(assert_generic_error(&r, "HTTP 'POST /foo' is not defined").is_ok());
        assert!(assert_generic_error(&r, "something else").is_err());
    }

    #[test]
    fn generic_error_requires_422() {
        let r = resp(400, r#"{"code":"generic_error","messages":["x"]}"#);
        let err = assert_generic_error(&r, "x").unwrap_err();
        assert!(err.to_string().contains("expected[422] actual[400]"));
    }

    #[test]
    fn generic_error_rejects_extra_messages() {
        let r = resp(422, r#"{"code":"generic_error","messages":["x","y"]}"#);
        assert!(assert_generic_error(&r, "x").is_err());
    }

    #[test]
    fn statuses_lists_alternatives() {
        let r = resp(500, "oops");
        let err = assert_statuses(&[204, 404], &r).unwrap_err();
        assert!(err.to_string().contains("expected one of[204 404] actual[500]"));
        assert!(assert_statuses(&[204, 404], &resp(404, "")).is_ok());
    }

    #[test]
    fn envelope_needs_all_keys() {
        assert!(assert_envelope(&resp(200, r#"{"status":200,"headers":{},"body":null}"#)).is_ok());
        assert!(assert_envelope(&resp(200, r#"{"status":200,"body":{}}"#)).is_err());
        assert!(assert_envelope(&resp(201, r#"{"status":200,"headers":{},"body":{}}"#)).is_err());
    }

    #[test]
    fn jsonp_checks_callback_name() {
        let r = resp(200, r#"/**/cb({"status":200,"headers":{},"body":{}})"#);
        assert!(assert_jsonp(&r, "cb").is_ok());
        assert!(assert_jsonp(&r, "foo").is_err());
    }

    #[test]
    fn not_null() {
        assert!(assert_not_null(&Value::from("abc")).is_ok());
        assert!(assert_not_null(&Value::Null).is_err());
    }
}
