//! API route and tenant configuration.
//!
//! Both the backend base URL and the portal (tenant) id are resolved once,
//! when a client is constructed. The resolution rules are pure functions of
//! their inputs; the `detect` wrappers gather those inputs from the page.

use crate::auth::AuthClient;
use crate::constants::{
    API_URL_GLOBAL, DEFAULT_PORTAL_ID, LOCAL_API_URL, PORTAL_HOSTNAME_PREFIXES,
    PRODUCTION_API_URL, RELATIVE_API_URL,
};
use crate::storage;

/// API route configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Resolve the backend base URL: an injected `window.EXPRESSGLASS_API_URL`
    /// global wins, then hostname heuristics, then the production default.
    pub fn detect() -> Self {
        if let Some(url) = injected_api_url() {
            return Self::from_url(&url);
        }
        let host = current_hostname().unwrap_or_default();
        Self::from_url(base_url_for_host(&host))
    }

    /// Create a new ApiConfig from a URL string.
    pub fn from_url(url: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL for all API calls.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get a full API URL for a given path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Hostname heuristics for deployments that do not inject an explicit URL.
pub(crate) fn base_url_for_host(host: &str) -> &'static str {
    if host == "localhost" || host == "127.0.0.1" {
        LOCAL_API_URL
    } else if host.contains("netlify.app") || host.contains("staging") {
        // Same-origin deploy previews talk to their own functions.
        RELATIVE_API_URL
    } else {
        PRODUCTION_API_URL
    }
}

fn injected_api_url() -> Option<String> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &API_URL_GLOBAL.into()).ok()?;
    value.as_string().filter(|s| !s.trim().is_empty())
}

fn current_hostname() -> Option<String> {
    web_sys::window()?.location().hostname().ok()
}

/// Tenant id for this session. Resolution order: authenticated session,
/// manually stored override, hostname inference, hard-coded default.
pub fn detect_portal_id(auth: &AuthClient) -> u32 {
    resolve_portal_id(
        auth.portal_id(),
        storage::portal_override(),
        current_hostname().as_deref(),
    )
}

pub(crate) fn resolve_portal_id(
    session: Option<u32>,
    stored: Option<u32>,
    host: Option<&str>,
) -> u32 {
    session
        .or(stored)
        .or_else(|| host.and_then(portal_from_host))
        .unwrap_or(DEFAULT_PORTAL_ID)
}

fn portal_from_host(host: &str) -> Option<u32> {
    let label = host.split('.').next()?;
    PORTAL_HOSTNAME_PREFIXES
        .iter()
        .find(|(prefix, _)| *prefix == label)
        .map(|(_, id)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_heuristics() {
        assert_eq!(base_url_for_host("localhost"), LOCAL_API_URL);
        assert_eq!(base_url_for_host("127.0.0.1"), LOCAL_API_URL);
        assert_eq!(
            base_url_for_host("deploy-preview-12--eg.netlify.app"),
            RELATIVE_API_URL
        );
        assert_eq!(base_url_for_host("staging.expressglass.pt"), RELATIVE_API_URL);
        assert_eq!(
            base_url_for_host("agendamento.expressglass.pt"),
            PRODUCTION_API_URL
        );
    }

    #[test]
    fn url_join_trims_trailing_slash() {
        let config = ApiConfig::from_url("https://example.test/api/");
        assert_eq!(
            config.url("/appointments"),
            "https://example.test/api/appointments"
        );
    }

    #[test]
    fn portal_resolution_precedence() {
        // Session beats everything.
        assert_eq!(resolve_portal_id(Some(7), Some(3), Some("porto.expressglass.pt")), 7);
        // Stored override beats hostname inference.
        assert_eq!(resolve_portal_id(None, Some(3), Some("porto.expressglass.pt")), 3);
        // Hostname inference beats the default.
        assert_eq!(resolve_portal_id(None, None, Some("braga.expressglass.pt")), 3);
        // Nothing known: hard-coded default.
        assert_eq!(resolve_portal_id(None, None, Some("unknown.example")), DEFAULT_PORTAL_ID);
        assert_eq!(resolve_portal_id(None, None, None), DEFAULT_PORTAL_ID);
    }
}
