//! Client certificate Common Name extraction.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → service.rs (ExtractCn middleware)
//!     → cert_info.rs (read X-Forwarded-Tls-Client-Cert-Info,
//!                     percent-decode, match CN=...)
//!     → set destination header on a hit, leave request alone on a miss
//!     → inner service (always called once)
//! ```
//!
//! # Design Decisions
//! - Pattern compiled once per layer, shared by every request
//! - No trust decisions; the upstream header is taken as already validated
//! - Request path never fails, only construction can

pub mod cert_info;
pub mod service;

pub use cert_info::{CnMatcher, Extraction, CERT_INFO_HEADER};
pub use service::{ConfigurationError, ExtractCn, ExtractCnLayer};
