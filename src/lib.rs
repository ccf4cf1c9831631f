//! Reverse proxy filter that copies the client certificate Common Name
//! from `X-Forwarded-Tls-Client-Cert-Info` into a configurable header.

pub mod config;
pub mod extract;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use extract::{ConfigurationError, ExtractCn, ExtractCnLayer};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
