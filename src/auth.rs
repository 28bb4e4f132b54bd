//! Authentication client.
//!
//! Owns the bearer token and user profile (persisted in localStorage via
//! [`crate::storage`]) and performs the login/verify/logout calls. Failures
//! never escape `login` - callers get a [`LoginOutcome`] either way.

use serde::Deserialize;
use serde_json::json;

use crate::error::PortalError;
use crate::models::{PortalConfig, User};
use crate::network::transport::{self, RequestAuth};
use crate::network::ApiConfig;
use crate::storage;

pub struct AuthClient {
    config: ApiConfig,
}

#[derive(Debug, PartialEq)]
pub enum LoginOutcome {
    Success(User),
    Failure(String),
}

/// Envelope returned by `/auth-login`.
#[derive(Deserialize)]
struct LoginEnvelope {
    success: bool,
    token: Option<String>,
    user: Option<User>,
    error: Option<String>,
}

/// Envelope returned by `/auth-verify`.
#[derive(Deserialize)]
struct VerifyEnvelope {
    success: bool,
    user: Option<User>,
}

impl AuthClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    fn anonymous_auth(&self) -> RequestAuth {
        RequestAuth {
            portal_id: None,
            bearer: None,
        }
    }

    /// POST credentials; a success envelope persists token and user. Every
    /// failure mode collapses into `LoginOutcome::Failure`.
    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let payload = json!({"username": username, "password": password}).to_string();
        let url = self.config.url("/auth-login");

        let resp =
            match transport::execute("POST", &url, Some(&payload), &self.anonymous_auth()).await {
                Ok(resp) => resp,
                Err(e) => return LoginOutcome::Failure(e.to_string()),
            };
        if !resp.ok {
            return LoginOutcome::Failure(resp.error_message());
        }

        let envelope: LoginEnvelope = match resp
            .json()
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| PortalError::InvalidFormat(e.to_string()))
            }) {
            Ok(envelope) => envelope,
            Err(e) => return LoginOutcome::Failure(e.to_string()),
        };

        match envelope {
            LoginEnvelope {
                success: true,
                token: Some(token),
                user: Some(user),
                ..
            } => {
                if let Err(e) = storage::set_auth_session(&token, &user) {
                    web_sys::console::warn_1(
                        &format!("Could not persist session: {}", e).into(),
                    );
                }
                LoginOutcome::Success(user)
            }
            LoginEnvelope { error, .. } => LoginOutcome::Failure(
                error.unwrap_or_else(|| "login rejected".to_string()),
            ),
        }
    }

    /// Confirm the cached token against the backend. Any failure clears the
    /// session (forced logout) before reporting; success refreshes the
    /// stored profile.
    pub async fn verify_auth(&self) -> Result<User, PortalError> {
        let token = match storage::auth_token() {
            Some(token) => token,
            None => return Err(PortalError::AuthExpired),
        };

        let auth = RequestAuth {
            portal_id: None,
            bearer: Some(token),
        };
        let url = self.config.url("/auth-verify");

        let outcome = async {
            let resp = transport::execute("GET", &url, None, &auth).await?;
            if !resp.ok {
                return Err(PortalError::Http {
                    status: resp.status,
                    message: resp.error_message(),
                });
            }
            let envelope: VerifyEnvelope = serde_json::from_str(&resp.body)
                .map_err(|e| PortalError::InvalidFormat(e.to_string()))?;
            match envelope {
                VerifyEnvelope {
                    success: true,
                    user: Some(user),
                } => Ok(user),
                _ => Err(PortalError::InvalidFormat("verify envelope without user".into())),
            }
        }
        .await;

        match outcome {
            Ok(user) => {
                let token = storage::auth_token().unwrap_or_default();
                if let Err(e) = storage::set_auth_session(&token, &user) {
                    web_sys::console::warn_1(
                        &format!("Could not refresh stored profile: {}", e).into(),
                    );
                }
                Ok(user)
            }
            Err(e) => {
                self.logout();
                Err(e)
            }
        }
    }

    /// Drop both the token and the profile.
    pub fn logout(&self) {
        storage::clear_auth_session();
    }

    pub fn is_authenticated(&self) -> bool {
        storage::auth_token().is_some() && storage::stored_user().is_some()
    }

    pub fn is_admin(&self) -> bool {
        storage::stored_user()
            .map(|u| u.is_admin())
            .unwrap_or(false)
    }

    /// Tenant id of the authenticated session, `None` when logged out.
    pub fn portal_id(&self) -> Option<u32> {
        storage::stored_user().and_then(|u| u.portal_id())
    }

    pub fn portal_config(&self) -> Option<PortalConfig> {
        storage::stored_user().and_then(|u| u.portal)
    }
}
