//! Crate-wide error taxonomy.
//!
//! Components return typed errors up the call chain; the route dispatcher is
//! the single place where error kinds are mapped to the coarse external
//! status classes (400/500).

use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::registry::StoreError;

/// Failures that can surface from relay request handling.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The caller sent something we refuse to process: an unrecognizable
    /// event shape, a connect without an agent identity, an unparseable
    /// message body, or an unhandled route key.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The registry store could not complete an operation.
    #[error("registry store failure")]
    Store(#[from] StoreError),

    /// The delivery transport rejected or could not reach the target
    /// connection. Never retried here; stale registry entries are cleaned up
    /// only by an explicit disconnect.
    #[error("delivery failure")]
    Delivery(#[from] DeliveryError),

    /// Anything that does not fit the categories above.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts() {
        let err: RelayError = StoreError::Backend("db is gone".into()).into();
        assert!(matches!(err, RelayError::Store(_)));
    }

    #[test]
    fn delivery_error_converts() {
        let err: RelayError = DeliveryError::ConnectionGone("c1".into()).into();
        assert!(matches!(err, RelayError::Delivery(_)));
    }

    #[test]
    fn bad_request_display_includes_detail() {
        let err = RelayError::BadRequest("missing agentId".into());
        assert!(err.to_string().contains("missing agentId"));
    }
}
