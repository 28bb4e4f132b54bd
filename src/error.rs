//! Error taxonomy shared across the portal client.
//!
//! Transport and HTTP failures never escape the API client's public CRUD
//! methods (they degrade to the offline path instead); the variants exist so
//! the fallback decision is made on a typed value rather than on string
//! matching.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PortalError {
    /// Transport-level failure (fetch rejected, DNS, CORS, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the server-provided error text when
    /// the body parsed, otherwise a generic status line.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 401 - the session was already cleared and the redirect issued by the
    /// time this surfaces.
    #[error("session expired")]
    AuthExpired,

    /// Application-level rejection carried inside a 2xx envelope.
    #[error("{0}")]
    Backend(String),

    /// Response body had none of the recognised shapes.
    #[error("invalid response format: {0}")]
    InvalidFormat(String),

    /// Operation attempted while the connectivity flag is down.
    #[error("offline")]
    Offline,

    /// Offline mutation targeting a record missing from the local cache.
    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PortalError {
    /// Wrap a raw `JsValue` thrown by a web-sys call.
    pub fn from_js(value: JsValue) -> Self {
        PortalError::Network(
            value
                .as_string()
                .unwrap_or_else(|| format!("{:?}", value)),
        )
    }
}

impl From<PortalError> for JsValue {
    fn from(err: PortalError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}
