//! Single-attempt HTTP transport over the browser fetch API.
//!
//! One request goes out, the status and body text come back. Retry policy,
//! 401 side effects and envelope decoding all live a layer up so each stage
//! stays independently testable.

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::error::PortalError;

/// Header material attached to a portal request. Tenant-scoped calls always
/// carry the portal header; when a bearer token exists the backend
/// identifies the caller by it instead. Auth endpoints send no tenant.
pub struct RequestAuth {
    pub portal_id: Option<u32>,
    pub bearer: Option<String>,
}

pub struct HttpResponse {
    pub status: u16,
    pub ok: bool,
    pub body: String,
}

impl HttpResponse {
    pub fn json(&self) -> Result<serde_json::Value, PortalError> {
        serde_json::from_str(&self.body)
            .map_err(|e| PortalError::InvalidFormat(format!("body is not JSON: {}", e)))
    }

    /// Failure reason for a non-ok response: the server's `error` field when
    /// the body parses, a generic status line otherwise.
    pub fn error_message(&self) -> String {
        if let Ok(value) = self.json() {
            if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
        format!("HTTP {}", self.status)
    }
}

pub async fn execute(
    method: &str,
    url: &str,
    body: Option<&str>,
    auth: &RequestAuth,
) -> Result<HttpResponse, PortalError> {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);

    let headers = Headers::new().map_err(PortalError::from_js)?;
    if let Some(portal_id) = auth.portal_id {
        headers
            .append("X-Portal-Id", &portal_id.to_string())
            .map_err(PortalError::from_js)?;
    }
    if let Some(token) = &auth.bearer {
        headers
            .append("Authorization", &format!("Bearer {}", token))
            .map_err(PortalError::from_js)?;
    }
    if let Some(data) = body {
        opts.set_body(&JsValue::from_str(data));
        headers
            .append("Content-Type", "application/json")
            .map_err(PortalError::from_js)?;
    }
    opts.set_headers(&headers);

    let request = Request::new_with_str_and_init(url, &opts).map_err(PortalError::from_js)?;
    let window = web_sys::window().ok_or_else(|| PortalError::Network("no window".into()))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(PortalError::from_js)?;
    let resp: Response = resp_value.dyn_into().map_err(PortalError::from_js)?;

    let text = JsFuture::from(resp.text().map_err(PortalError::from_js)?)
        .await
        .map_err(PortalError::from_js)?;

    Ok(HttpResponse {
        status: resp.status(),
        ok: resp.ok(),
        body: text.as_string().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            ok: (200..300).contains(&status),
            body: body.to_string(),
        }
    }

    #[test]
    fn error_message_prefers_server_error_field() {
        assert_eq!(
            resp(422, r#"{"error": "invalid date"}"#).error_message(),
            "invalid date"
        );
    }

    #[test]
    fn error_message_tolerates_malformed_bodies() {
        assert_eq!(resp(500, "<html>oops</html>").error_message(), "HTTP 500");
        assert_eq!(resp(503, "").error_message(), "HTTP 503");
        assert_eq!(resp(404, r#"{"detail": "gone"}"#).error_message(), "HTTP 404");
    }
}
