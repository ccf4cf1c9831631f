//! Forwarding to the single upstream.
//!
//! # Responsibilities
//! - Rewrite the request URI to point at the upstream
//! - Strip hop-by-hop headers
//! - Map upstream failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Path and query are preserved verbatim
//! - The client's Host header is kept
//! - Bodies are streamed, never buffered

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        HeaderMap, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// Headers that only apply to a single connection.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    Uri(#[from] InvalidUri),

    #[error("upstream url {0:?} has no host")]
    MissingAuthority(String),

    #[error("upstream url {0:?} must not have a path or query")]
    UnsupportedPath(String),
}

/// Forwards requests to one upstream over plain HTTP.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Forwarder {
    pub fn new(upstream_url: &str) -> Result<Self, UpstreamError> {
        let uri: Uri = upstream_url.parse()?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| UpstreamError::MissingAuthority(upstream_url.to_string()))?;

        // Request paths are forwarded verbatim, so a base path would be lost.
        if uri.path() != "/" || uri.query().is_some() {
            return Err(UpstreamError::UnsupportedPath(upstream_url.to_string()));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Send `request` upstream and return its response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "Cannot rewrite request URI");
                return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
            }
        };
        // The upstream connector speaks HTTP/1.1 regardless of the client.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        let method = parts.method.clone();
        let uri = parts.uri.clone();

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                tracing::debug!(method = %method, uri = %uri, status = %response.status(), "Upstream responded");
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(method = %method, uri = %uri, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Axum fallback handler.
pub async fn forward_handler(
    State(forwarder): State<Forwarder>,
    request: Request<Body>,
) -> Response {
    forwarder.forward(request).await
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}
