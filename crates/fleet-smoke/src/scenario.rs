//! The proxy smoke scenario.
//!
//! Creates a throwaway organization, then walks through unknown paths,
//! response envelopes, JSONP, token validation, request envelopes and
//! session authorization. Test organizations are deleted afterwards even
//! when a check fails.

use std::time::Duration;

use rand::Rng;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::assert::*;
use crate::error::SmokeResult;
use crate::request::SmokeClient;

/// Knobs for [`run`].
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    /// Parent organization test organizations are created under.
    pub parent_organization: String,
    /// Prefix of every organization id the scenario creates.
    pub org_prefix: String,
    /// Time for a new organization to reach the session service.
    pub propagation_delay: Duration,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            parent_organization: "flow".to_string(),
            org_prefix: "proxy-test".to_string(),
            propagation_delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of a passing scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub organization_id: String,
    pub checks: u32,
}

/// Run every check, then clean up test organizations.
pub async fn run(client: &SmokeClient, opts: &ScenarioOptions) -> SmokeResult<ScenarioReport> {
    let id = format!("{}-{}", opts.org_prefix, random_string(8));
    info!(organization = %id, base_url = client.base_url(), "starting smoke scenario");

    let result = checks(client, opts, &id).await;
    let cleanup = cleanup(client, opts).await;

    let checks = result?;
    cleanup?;
    Ok(ScenarioReport {
        organization_id: id,
        checks,
    })
}

async fn checks(client: &SmokeClient, opts: &ScenarioOptions, id: &str) -> SmokeResult<u32> {
    let mut n = 0u32;
    let mut pass = || {
        n += 1;
        n
    };

    let response = client
        .json_post(
            "/organizations",
            Some(json!({
                "environment": "sandbox",
                "parent_id": opts.parent_organization,
                "id": id,
            })),
        )
        .with_api_key()
        .execute()
        .await?;
    assert_status(201, &response)?;
    let org = response.json()?;
    assert_equals(Some(id), org.get("id").and_then(Value::as_str))?;
    pass();

    // Unknown paths and response envelopes.
    let not_defined = "HTTP 'POST /foo' is not defined";
    let response = client.json_post("/foo", None).execute().await?;
    assert_generic_error(&response, not_defined)?;
    pass();

    let response = client.json_post("/foo?envelope=res", None).execute().await?;
    assert_generic_error(
        &response,
        "Invalid value 'res' for query parameter 'envelope' - must be one of request, response",
    )?;
    pass();

    let response = client.json_post("/foo?envelope=response", None).execute().await?;
    assert_envelope(&response)?;
    assert_generic_error(&response.unwrap_envelope()?, not_defined)?;
    pass();

    let response = client
        .json_post("/foo?envelope=response&callback=cb", None)
        .execute()
        .await?;
    assert_jsonp(&response, "cb")?;
    assert_generic_error(&response.unwrap_jsonp()?, not_defined)?;
    pass();

    // Token validation.
    let response = client.json_post("/token-validations", None).execute().await?;
    assert_generic_error(
        &response,
        "Missing required field for type 'token_validation_form': 'token'",
    )?;
    pass();

    let response = client
        .json_post("/token-validations", Some(json!({ "token": "foo" })))
        .execute()
        .await?;
    assert_generic_error(&response, "The specified API token is not valid")?;
    pass();

    let response = client
        .json_post("/token-validations", Some(json!({ "token": client.api_key() })))
        .execute()
        .await?;
    assert_status(200, &response)?;
    assert_equals(
        Some("Hooray! The provided API Token is valid."),
        response.json()?.get("status").and_then(Value::as_str),
    )?;
    pass();

    let response = client
        .json_post(
            "/organizations",
            Some(json!({ "environment": "sandbox", "parent": "demo", "id": "proxy-test" })),
        )
        .execute()
        .await?;
    assert_unauthorized(&response)?;
    pass();

    // Envelopes around valid requests.
    let response = client
        .get(&format!("/organizations/{id}?envelope=response"))
        .with_api_key()
        .execute()
        .await?;
    assert_envelope(&response)?;
    let inner = response.unwrap_envelope()?;
    assert_status(200, &inner)?;
    assert_equals(Some(id), inner.json()?.get("id").and_then(Value::as_str))?;
    pass();

    let response = client
        .get(&format!("/organizations/{id}?envelope=response&callback=foo"))
        .with_api_key()
        .execute()
        .await?;
    assert_jsonp(&response, "foo")?;
    let inner = response.unwrap_jsonp()?;
    assert_status(200, &inner)?;
    assert_equals(Some(id), inner.json()?.get("id").and_then(Value::as_str))?;
    pass();

    // Request envelopes.
    let response = client
        .json_post("/organizations/0?envelope=request", Some(json!({})))
        .with_api_key()
        .execute()
        .await?;
    assert_generic_error(&response, "Error in envelope request body: Field 'method' is required")?;
    pass();

    let response = client
        .json_post(
            "/organizations/0?envelope=request",
            Some(json!({ "method": 123, "body": "test" })),
        )
        .with_api_key()
        .execute()
        .await?;
    assert_generic_error(
        &response,
        "Error in envelope request body: Field 'method' must be one of GET, POST, PUT, PATCH, DELETE",
    )?;
    pass();

    let new_name = format!(
        "{} 2",
        org.get("name").and_then(Value::as_str).unwrap_or_default()
    );
    let response = client
        .json_post(
            &format!("/organizations/{id}?envelope=request"),
            Some(json!({ "method": "PUT", "body": { "name": new_name } })),
        )
        .with_api_key()
        .execute()
        .await?;
    assert_unauthorized(&response)?;
    pass();

    let response = client
        .json_post(
            &format!("/organizations/{id}?envelope=request"),
            Some(json!({ "method": "GET" })),
        )
        .with_api_key()
        .execute()
        .await?;
    assert_unauthorized(&response)?;
    pass();

    // Sessions.
    tokio::time::sleep(opts.propagation_delay).await;

    let response = client
        .json_post(&format!("/sessions/organizations/{id}"), None)
        .execute()
        .await?;
    assert_status(201, &response)?;
    let session = response.json()?;
    let session_id = session.get("id").cloned().unwrap_or(Value::Null);
    assert_not_null(&session_id)?;
    let session_id = session_id
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| session_id.to_string());
    pass();

    let countries = format!("/{id}/countries");
    let response = client
        .get(&countries)
        .with_header("Authorization", &format!("session {session_id}"))
        .execute()
        .await?;
    assert_status(200, &response)?;
    pass();

    let response = client.get(&countries).execute().await?;
    assert_unauthorized(&response)?;
    pass();

    let enveloped = format!("/{id}/countries?envelope=request");
    let response = client
        .new_request("POST", &enveloped)
        .with_body(crate::response::format_json(&json!({
            "method": "GET",
            "headers": { "Authorization": [format!("Session {session_id}")] },
        })))
        .execute()
        .await?;
    assert_status(200, &response)?;
    pass();

    let response = client
        .new_request("POST", &enveloped)
        .with_body(crate::response::format_json(&json!({ "method": "GET" })))
        .execute()
        .await?;
    assert_unauthorized(&response)?;
    Ok(pass())
}

/// Delete every organization under the parent whose id has the test prefix.
///
/// Only the first page of 100 organizations is inspected.
pub async fn cleanup(client: &SmokeClient, opts: &ScenarioOptions) -> SmokeResult<u32> {
    let listing = client
        .get(&format!(
            "/organizations?limit=100&environment=sandbox&parent={}",
            opts.parent_organization
        ))
        .with_api_key()
        .execute()
        .await?;
    let orgs = listing.json()?;

    let mut deleted = 0;
    for org in orgs.as_array().into_iter().flatten() {
        let Some(org_id) = org.get("id").and_then(Value::as_str) else {
            continue;
        };
        if !org_id.starts_with(&opts.org_prefix) {
            continue;
        }
        let response = client
            .delete(&format!("/organizations/{org_id}"))
            .with_api_key()
            .execute()
            .await?;
        if let Err(e) = assert_statuses(&[204, 404], &response) {
            warn!(organization = org_id, error = %e, "cleanup delete failed");
            return Err(e);
        }
        deleted += 1;
    }
    info!(deleted, "cleaned up test organizations");
    Ok(deleted)
}

/// Random lowercase base-36 string.
pub fn random_string(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_is_base36() {
        let s = random_string(8);
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn default_options() {
        let opts = ScenarioOptions::default();
        assert_eq!(opts.parent_organization, "flow");
        assert_eq!(opts.org_prefix, "proxy-test");
        assert_eq!(opts.propagation_delay, Duration::from_secs(5));
    }
}
