//! Minimal HTTP/1.1 client over a single TCP connection.
//!
//! One connection per request, driven by hyper's low-level `conn` API.
//! Only plain `http://` URLs are supported.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("fleet/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("could not build request: {0}")]
    Request(#[from] http::Error),

    #[error("request to {0} timed out")]
    Timeout(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ClientRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: http::Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ClientResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Send a request and buffer the whole response body.
pub async fn send(request: ClientRequest, timeout: Duration) -> ClientResult<ClientResponse> {
    let url = request.url.clone();
    match tokio::time::timeout(timeout, send_inner(request)).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(url)),
    }
}

/// GET a URL.
pub async fn get(url: &str, timeout: Duration) -> ClientResult<ClientResponse> {
    send(ClientRequest::get(url), timeout).await
}

async fn send_inner(request: ClientRequest) -> ClientResult<ClientResponse> {
    let uri: http::Uri = request.url.parse().map_err(|e: http::uri::InvalidUri| {
        ClientError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        }
    })?;
    if uri.scheme_str() != Some("http") {
        return Err(ClientError::InvalidUrl {
            url: request.url.clone(),
            reason: "only http:// is supported".to_string(),
        });
    }
    let host = uri.host().ok_or_else(|| ClientError::InvalidUrl {
        url: request.url.clone(),
        reason: "missing host".to_string(),
    })?;
    let port = uri.port_u16().unwrap_or(80);
    let addr = format!("{host}:{port}");

    let stream = tokio::net::TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "http connection closed with error");
        }
    });

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let mut builder = http::Request::builder()
        .method(request.method.clone())
        .uri(path)
        .header("host", &addr)
        .header("user-agent", USER_AGENT);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let body = Full::new(Bytes::from(request.body.unwrap_or_default()));
    let req = builder.body(body)?;

    let resp = sender.send_request(req).await?;
    let status = resp.status().as_u16();
    let headers = resp
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    let bytes = resp.into_body().collect().await?.to_bytes();

    Ok(ClientResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
