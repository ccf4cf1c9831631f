//! Tower middleware that copies the client certificate CN into a header.

use axum::http::header::{HeaderName, InvalidHeaderName};
use axum::http::{HeaderMap, Request};
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Layer, Service};

use crate::config::ExtractCnConfig;
use crate::extract::cert_info::{CnMatcher, Extraction};
use crate::observability::metrics;

/// Error raised while assembling the filter.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("destination header must be specified")]
    MissingDestination,

    #[error("invalid destination header name {name:?}: {source}")]
    InvalidDestination {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },
}

/// Layer that wraps services in [`ExtractCn`].
#[derive(Debug, Clone)]
pub struct ExtractCnLayer {
    dest: HeaderName,
    matcher: CnMatcher,
}

impl ExtractCnLayer {
    /// Validates the configuration and compiles the CN pattern.
    pub fn new(config: &ExtractCnConfig) -> Result<Self, ConfigurationError> {
        if config.dest_header.is_empty() {
            return Err(ConfigurationError::MissingDestination);
        }

        let dest = HeaderName::from_bytes(config.dest_header.as_bytes()).map_err(|source| {
            ConfigurationError::InvalidDestination {
                name: config.dest_header.clone(),
                source,
            }
        })?;

        Ok(Self {
            dest,
            matcher: CnMatcher::new(),
        })
    }

    /// Header the Common Name is written to.
    pub fn destination(&self) -> &HeaderName {
        &self.dest
    }
}

impl<S> Layer<S> for ExtractCnLayer {
    type Service = ExtractCn<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExtractCn {
            inner,
            dest: self.dest.clone(),
            matcher: self.matcher.clone(),
        }
    }
}

/// Middleware that reads `X-Forwarded-Tls-Client-Cert-Info`, extracts the
/// Common Name and stores it under the configured header before calling
/// the inner service.
///
/// The inner service is always called exactly once. Missing or unparsable
/// certificate info leaves the request untouched.
#[derive(Debug, Clone)]
pub struct ExtractCn<S> {
    inner: S,
    dest: HeaderName,
    matcher: CnMatcher,
}

impl<S> ExtractCn<S> {
    /// Wraps `inner`, failing if the destination header is empty or invalid.
    pub fn new(inner: S, config: &ExtractCnConfig) -> Result<Self, ConfigurationError> {
        Ok(ExtractCnLayer::new(config)?.layer(inner))
    }

    fn apply(&self, headers: &mut HeaderMap) {
        let extraction = self.matcher.extract(headers);
        metrics::record_extraction(extraction.outcome());

        match extraction {
            Extraction::Found(cn) => {
                tracing::debug!(dest_header = %self.dest, cn = ?cn, "Injecting client CN");
                headers.insert(self.dest.clone(), cn);
            }
            miss => {
                tracing::trace!(outcome = miss.outcome(), "No client CN injected");
            }
        }
    }
}

impl<S, B> Service<Request<B>> for ExtractCn<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        self.apply(req.headers_mut());
        self.inner.call(req)
    }
}
