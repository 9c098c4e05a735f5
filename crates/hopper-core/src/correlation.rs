//! Correlation-id propagation across topic and process boundaries.
//!
//! The id travels as a single well-known header. Within a process it is an
//! explicit value: the loop extracts it at message receipt and passes it down
//! through handler dispatch and every produce call, so trace continuity does
//! not depend on any ambient task-local state.

use ulid::Ulid;

use crate::domain::Header;

/// Well-known header name carrying the trace identifier.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation context for one processing cycle.
///
/// Cheap to clone and intended to be passed by value; an unbound context
/// produces no headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationContext {
    id: Option<String>,
}

impl CorrelationContext {
    /// Context with no id bound.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context bound to the given id.
    pub fn bound(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// Mint a fresh id for a cycle that did not inherit one.
    pub fn generate() -> Self {
        Self::bound(Ulid::new().to_string())
    }

    /// Scan headers for the correlation header; first match wins.
    ///
    /// A value that is not valid UTF-8 leaves the context unbound.
    pub fn from_headers(headers: &[Header]) -> Self {
        for (name, value) in headers {
            if name == CORRELATION_ID_HEADER {
                return Self {
                    id: std::str::from_utf8(value).ok().map(str::to_string),
                };
            }
        }
        Self::empty()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    /// Headers to attach to any produced message: one header when bound,
    /// none otherwise.
    pub fn to_headers(&self) -> Vec<Header> {
        match &self.id {
            Some(id) => vec![(CORRELATION_ID_HEADER.to_string(), id.as_bytes().to_vec())],
            None => Vec::new(),
        }
    }
}
