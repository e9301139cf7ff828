//! Request builder and client for the proxy API.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::{debug, warn};

use fleet_health::client::{self, ClientRequest};

use crate::error::{SmokeError, SmokeResult};
use crate::response::{Response, format_json};

/// Default request log, appended to on every request.
pub const DEFAULT_LOG_FILE: &str = "/tmp/proxy.test.log";

/// Talks to one proxy base URL with one API key.
#[derive(Debug, Clone)]
pub struct SmokeClient {
    base_url: String,
    api_key: String,
    log_file: Option<PathBuf>,
    timeout: Duration,
}

impl SmokeClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read the API key from `path`; the file must exist.
    pub fn with_key_file(base_url: impl Into<String>, path: &Path) -> SmokeResult<Self> {
        if !path.is_file() {
            return Err(SmokeError::ApiKeyMissing(path.to_path_buf()));
        }
        let key = std::fs::read_to_string(path).map_err(|source| SmokeError::ApiKeyUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(base_url, key.trim()))
    }

    pub fn log_to(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn new_request(&self, method: &str, path: &str) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            method: method.to_uppercase(),
            url: format!("{}{}", self.base_url, path),
            headers: vec![("Content-type".to_string(), "application/json".to_string())],
            body: None,
            api_key: false,
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder<'_> {
        self.new_request("GET", path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder<'_> {
        self.new_request("DELETE", path)
    }

    /// POST with an optional JSON body.
    pub fn json_post(&self, path: &str, body: Option<Value>) -> RequestBuilder<'_> {
        let req = self.new_request("POST", path);
        match body {
            Some(value) => req.with_body(format_json(&value)),
            None => req,
        }
    }

    fn log(&self, line: &str) {
        let Some(path) = &self.log_file else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "info [{}] {line}", unix_now()));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "could not write request log");
        }
    }
}

/// A request being assembled.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    client: &'a SmokeClient,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
    api_key: bool,
}

impl RequestBuilder<'_> {
    /// Authenticate with the API key as the basic-auth user name.
    pub fn with_api_key(mut self) -> Self {
        self.api_key = true;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Curl-equivalent of this request, for the log. The key is masked.
    pub fn describe(&self) -> String {
        let mut parts = vec!["curl".to_string()];
        if self.method != "GET" {
            parts.push(format!("-X {}", self.method));
        }
        for (name, value) in &self.headers {
            parts.push(format!("-H '{name}: {value}'"));
        }
        if self.api_key {
            parts.push("-u <api-key>:".to_string());
        }
        if self.body.is_some() {
            parts.push("-d <body>".to_string());
        }
        parts.push(format!("'{}'", self.url));
        parts.join(" ")
    }

    /// Send the request. Statuses below 200 or from 500 up are errors.
    pub async fn execute(self) -> SmokeResult<Response> {
        let described = self.describe();
        self.client.log(&described);
        debug!(request = %described, "executing");

        let method = http::Method::from_bytes(self.method.as_bytes())
            .map_err(|e| SmokeError::Assertion(format!("invalid method {}: {e}", self.method)))?;
        let mut headers = self.headers;
        if self.api_key {
            let token = STANDARD.encode(format!("{}:", self.client.api_key));
            headers.push(("Authorization".to_string(), format!("Basic {token}")));
        }

        let resp = client::send(
            ClientRequest {
                method,
                url: self.url.clone(),
                headers,
                body: self.body,
            },
            self.client.timeout,
        )
        .await?;

        let r = Response::new(self.method.clone(), self.url.clone(), resp.status, resp.body);
        if r.status >= 500 || r.status < 200 {
            return Err(SmokeError::Server {
                method: self.method,
                url: self.url,
                status: r.status,
                detail: server_error_detail(&r),
            });
        }
        Ok(r)
    }
}

fn server_error_detail(r: &Response) -> String {
    if let Ok(js) = r.json() {
        if let (Some(code), Some(messages)) = (js.get("code"), js.get("messages").and_then(Value::as_array)) {
            let messages: Vec<String> = messages
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect();
            return format!(
                " - Code: {}\n   {}",
                code.as_str().unwrap_or_default(),
                messages.join("\n   ")
            );
        }
    }
    r.dump()
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
