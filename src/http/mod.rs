//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer, TimeoutLayer)
//!     → extract::ExtractCn (client CN → destination header)
//!     → forward.rs (rewrite URI, strip hop-by-hop, send upstream)
//!     → Send upstream response to client
//! ```

pub mod forward;
pub mod server;

pub use forward::Forwarder;
pub use server::{HttpServer, ServerError};
