//! Parsing of the forwarded client certificate info header.
//!
//! # Responsibilities
//! - Read the header set by the TLS-terminating proxy
//! - Percent-decode it with query-string rules
//! - Pull out the first `CN=` value
//!
//! # Design Decisions
//! - Every failure is a soft miss, never an error
//! - Leftmost match wins, no Subject/Issuer scoping

use axum::http::{HeaderMap, HeaderValue};
use percent_encoding::percent_decode;
use regex::bytes::Regex;
use std::borrow::Cow;

/// Header carrying the percent-encoded client certificate summary.
pub const CERT_INFO_HEADER: &str = "x-forwarded-tls-client-cert-info";

/// Common Name followed by anything up to the next `,`, `/` or `"`.
///
/// Byte-oriented (`(?-u)`) so non-UTF-8 bytes in the name are kept as-is.
pub const CN_PATTERN: &str = r#"(?-u)CN=([^,/"]+)"#;

/// Result of looking for a Common Name on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A Common Name was found and is usable as a header value.
    Found(HeaderValue),
    /// The cert info header is missing or empty.
    Absent,
    /// The cert info header has a broken `%` escape.
    Malformed,
    /// The decoded value contains no `CN=` token.
    NoMatch,
    /// The Common Name contains bytes a header value cannot carry.
    InvalidValue,
}

impl Extraction {
    /// Label used for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Extraction::Found(_) => "injected",
            Extraction::Absent => "absent",
            Extraction::Malformed => "malformed",
            Extraction::NoMatch => "no_match",
            Extraction::InvalidValue => "invalid_value",
        }
    }
}

/// Compiled Common Name matcher.
///
/// Cloning is cheap; the compiled program is shared.
#[derive(Debug, Clone)]
pub struct CnMatcher {
    pattern: Regex,
}

impl CnMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(CN_PATTERN).expect("CN pattern must compile"),
        }
    }

    /// Returns the first Common Name in an already decoded value.
    pub fn find<'h>(&self, decoded: &'h [u8]) -> Option<&'h [u8]> {
        self.pattern
            .captures(decoded)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_bytes())
    }

    /// Runs the whole pipeline against a request's headers.
    ///
    /// Only the first occurrence of the cert info header is considered.
    pub fn extract(&self, headers: &HeaderMap) -> Extraction {
        let raw = match headers.get(CERT_INFO_HEADER) {
            Some(value) if !value.is_empty() => value.as_bytes(),
            _ => return Extraction::Absent,
        };

        let decoded = match query_unescape(raw) {
            Some(decoded) => decoded,
            None => return Extraction::Malformed,
        };

        match self.find(&decoded) {
            Some(cn) => match HeaderValue::from_bytes(cn) {
                Ok(value) => Extraction::Found(value),
                Err(_) => Extraction::InvalidValue,
            },
            None => Extraction::NoMatch,
        }
    }
}

impl Default for CnMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a query-string component: `+` is a space and `%XX` is a byte.
///
/// Returns `None` if a `%` is not followed by two hex digits. The result is
/// raw bytes; nothing requires it to be UTF-8.
pub fn query_unescape(raw: &[u8]) -> Option<Vec<u8>> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let escape_ok = raw
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !escape_ok {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    // `%2B` still decodes to a literal plus since spaces are swapped in first.
    let spaced: Cow<'_, [u8]> = if raw.contains(&b'+') {
        Cow::Owned(
            raw.iter()
                .map(|&b| if b == b'+' { b' ' } else { b })
                .collect(),
        )
    } else {
        Cow::Borrowed(raw)
    };

    Some(percent_decode(&spaced).collect())
}
