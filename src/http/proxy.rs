//! Single-host reverse proxy.
//!
//! # Responsibilities
//! - Rewrite an inbound request so it targets one fixed upstream
//! - Strip hop-by-hop headers in both directions
//! - Record the client address in `X-Forwarded-For`
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - Any HTTP status is a successful exchange; only transport failures
//!   (connect refused, reset, timeout) surface as `ForwardError`
//! - The request body arrives pre-buffered so the same request can be replayed

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    Request, Response, Uri,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use url::Url;

/// Shared HTTP client used by every backend's proxy.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Transport-level forwarding failure.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("could not build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Build the client shared by all proxies.
pub fn upstream_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// A reverse proxy bound permanently to one upstream.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    scheme: String,
    authority: String,
    base_path: String,
    host_header: HeaderValue,
    client: UpstreamClient,
    timeout: Duration,
}

impl ReverseProxy {
    pub fn new(target: &Url, client: UpstreamClient, timeout: Duration) -> Self {
        let host = target.host_str().unwrap_or_default();
        let authority = match target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let host_header = HeaderValue::from_str(&authority)
            .unwrap_or_else(|_| HeaderValue::from_static("localhost"));

        Self {
            scheme: target.scheme().to_string(),
            base_path: target.path().trim_end_matches('/').to_string(),
            authority,
            host_header,
            client,
            timeout,
        }
    }

    /// Upstream authority (`host[:port]`).
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Send one copy of the request upstream.
    pub async fn forward(
        &self,
        head: &Parts,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let request = self.rewrite(head, body, peer)?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(into_downstream(response)),
            Ok(Err(e)) => Err(ForwardError::Transport(e)),
            Err(_) => Err(ForwardError::Timeout(self.timeout)),
        }
    }

    fn target_uri(&self, inbound: &Uri) -> Result<Uri, ForwardError> {
        let path_and_query = inbound
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = format!(
            "{}://{}{}{}",
            self.scheme, self.authority, self.base_path, path_and_query
        );
        Uri::try_from(uri).map_err(|e| ForwardError::Request(e.into()))
    }

    fn rewrite(
        &self,
        head: &Parts,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Result<Request<Body>, ForwardError> {
        let mut builder = Request::builder()
            .method(head.method.clone())
            .uri(self.target_uri(&head.uri)?);

        if let Some(headers) = builder.headers_mut() {
            headers.clone_from(&head.headers);
            strip_hop_by_hop(headers);
            headers.insert(header::HOST, self.host_header.clone());
            if let Some(ip) = peer.map(|p| p.ip()) {
                append_forwarded_for(headers, &ip.to_string());
            }
        }

        Ok(builder.body(Body::from(body))?)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers listed in Connection are hop-by-hop too.
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed.iter().map(String::as_str).chain(HOP_BY_HOP) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, ip),
        _ => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
}

fn into_downstream(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
