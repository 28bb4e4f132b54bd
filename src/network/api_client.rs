//! Appointment API client with a bounded retry loop and an offline-first
//! fallback path.
//!
//! Every public CRUD method degrades instead of raising: reads fall back to
//! the localStorage cache, writes fall through to the offline equivalents in
//! [`crate::storage`]. Only the offline path's own not-found condition is
//! allowed to reach callers. When connectivity returns, queued offline
//! records are replayed best-effort (at-least-once, no rollback).

use std::cell::Cell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use serde_json::{Map, Value};

use crate::auth::AuthClient;
use crate::constants::{
    LOCALITY_FALLBACK_COLORS, LOGIN_EXPIRED_URL, LOGIN_PAGE_PATH, MAX_REQUEST_ATTEMPTS,
    RETRY_BASE_DELAY_MS,
};
use crate::error::PortalError;
use crate::models::{Appointment, AppointmentId, Locality};
use crate::network::response::{classify, ApiPayload};
use crate::network::transport::{self, RequestAuth};
use crate::network::{config, register_connectivity};
use crate::storage;
use crate::utils;

pub struct ApiClient {
    config: config::ApiConfig,
    portal_id: u32,
    auth: Rc<AuthClient>,
    online: Rc<Cell<bool>>,
}

impl ApiClient {
    /// Build a client for the current page: base URL and portal id resolved
    /// once, connectivity listeners hooked up for the offline replay.
    pub fn new(config: config::ApiConfig, auth: Rc<AuthClient>) -> Rc<Self> {
        let portal_id = config::detect_portal_id(&auth);
        Self::build(config, auth, portal_id, Rc::new(Cell::new(super::is_online())))
    }

    /// Replacement client bound to a different tenant. The connectivity flag
    /// and auth handle are shared; the old client's listeners lapse once it
    /// is dropped.
    pub fn reconfigure(&self, portal_id: u32) -> Rc<Self> {
        Self::build(
            self.config.clone(),
            self.auth.clone(),
            portal_id,
            self.online.clone(),
        )
    }

    fn build(
        config: config::ApiConfig,
        auth: Rc<AuthClient>,
        portal_id: u32,
        online: Rc<Cell<bool>>,
    ) -> Rc<Self> {
        let client = Rc::new(Self {
            config,
            portal_id,
            auth,
            online,
        });
        register_connectivity(&client);
        client
    }

    pub fn portal_id(&self) -> u32 {
        self.portal_id
    }

    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    pub(crate) fn online_flag(&self) -> Rc<Cell<bool>> {
        self.online.clone()
    }

    // -------------------------------------------------------------------
    // Request execution
    // -------------------------------------------------------------------

    fn request_auth(&self) -> RequestAuth {
        RequestAuth {
            portal_id: Some(self.portal_id),
            bearer: storage::auth_token(),
        }
    }

    /// One transport attempt, classified. 401 clears the session, issues the
    /// login redirect and surfaces as [`PortalError::AuthExpired`].
    async fn attempt(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<Value, PortalError> {
        let url = self.config.url(path);
        let resp = transport::execute(method, &url, body, &self.request_auth()).await?;

        if resp.status == 401 {
            self.expire_session();
            return Err(PortalError::AuthExpired);
        }
        if !resp.ok {
            return Err(PortalError::Http {
                status: resp.status,
                message: resp.error_message(),
            });
        }
        resp.json()
    }

    /// Retry wrapper: up to [`MAX_REQUEST_ATTEMPTS`] attempts with a growing
    /// pause in between. An expired session stops the loop immediately; the
    /// final attempt's failure is the one propagated.
    pub(crate) async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
    ) -> Result<Value, PortalError> {
        let mut last_error = PortalError::Network("request never attempted".into());

        for attempt in 1..=MAX_REQUEST_ATTEMPTS {
            match self.attempt(method, path, body.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(PortalError::AuthExpired) => return Err(PortalError::AuthExpired),
                Err(e) => {
                    web_sys::console::warn_1(
                        &format!(
                            "{} {} attempt {}/{} failed: {}",
                            method, path, attempt, MAX_REQUEST_ATTEMPTS, e
                        )
                        .into(),
                    );
                    last_error = e;
                }
            }
            if attempt < MAX_REQUEST_ATTEMPTS {
                TimeoutFuture::new(retry_delay_ms(attempt)).await;
            }
        }
        Err(last_error)
    }

    fn expire_session(&self) {
        self.auth.logout();
        let on_login_page = utils::window_path()
            .map(|p| p.starts_with(LOGIN_PAGE_PATH))
            .unwrap_or(false);
        if !on_login_page {
            if let Some(window) = web_sys::window() {
                let _ = window.location().set_href(LOGIN_EXPIRED_URL);
            }
        }
    }

    // -------------------------------------------------------------------
    // Appointments
    // -------------------------------------------------------------------

    /// Week-agnostic read of the full tenant list. Never raises: offline or
    /// failing requests serve whatever the cache holds (empty by default).
    pub async fn get_appointments(&self) -> Vec<Appointment> {
        if !self.online.get() {
            web_sys::console::log_1(&"Offline - serving appointments from local cache".into());
            return storage::load_appointments();
        }
        match self.fetch_appointments().await {
            Ok(list) => list,
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Falling back to cached appointments: {}", e).into(),
                );
                storage::load_appointments()
            }
        }
    }

    /// GET + classify + refresh the cache. Shared by the read path, the
    /// write paths (cache consistency re-fetch) and the offline sync.
    async fn fetch_appointments(&self) -> Result<Vec<Appointment>, PortalError> {
        let value = self.request("GET", "/appointments", None).await?;
        match classify::<Appointment>(value)? {
            ApiPayload::List(list) => {
                if let Err(e) = storage::save_appointments(&list) {
                    web_sys::console::warn_1(
                        &format!("Could not cache appointments: {}", e).into(),
                    );
                }
                storage::stamp_last_sync();
                Ok(list)
            }
            _ => Err(PortalError::InvalidFormat("expected an appointment list".into())),
        }
    }

    pub async fn create_appointment(
        &self,
        fields: Map<String, Value>,
    ) -> Result<Appointment, PortalError> {
        let outcome = if self.online.get() {
            self.create_remote(&fields).await
        } else {
            Err(PortalError::Offline)
        };
        match outcome {
            Ok(record) => Ok(record),
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Create failed, storing offline: {}", e).into(),
                );
                storage::offline_create(fields)
            }
        }
    }

    async fn create_remote(
        &self,
        fields: &Map<String, Value>,
    ) -> Result<Appointment, PortalError> {
        let body = Value::Object(fields.clone()).to_string();
        let value = self.request("POST", "/appointments", Some(body)).await?;
        match classify::<Appointment>(value)? {
            ApiPayload::Record(record) => {
                let _ = self.fetch_appointments().await;
                Ok(record)
            }
            _ => Err(PortalError::InvalidFormat("expected the created appointment".into())),
        }
    }

    pub async fn update_appointment(
        &self,
        id: &AppointmentId,
        patch: Map<String, Value>,
    ) -> Result<Appointment, PortalError> {
        let outcome = if self.online.get() {
            self.update_remote(id, &patch).await
        } else {
            Err(PortalError::Offline)
        };
        match outcome {
            Ok(record) => Ok(record),
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Update failed, patching offline: {}", e).into(),
                );
                storage::offline_update(id, &patch)
            }
        }
    }

    async fn update_remote(
        &self,
        id: &AppointmentId,
        patch: &Map<String, Value>,
    ) -> Result<Appointment, PortalError> {
        let body = Value::Object(patch.clone()).to_string();
        let path = format!("/appointments/{}", id);
        let value = self.request("PUT", &path, Some(body)).await?;
        match classify::<Appointment>(value)? {
            ApiPayload::Record(record) => {
                let _ = self.fetch_appointments().await;
                Ok(record)
            }
            _ => Err(PortalError::InvalidFormat("expected the updated appointment".into())),
        }
    }

    pub async fn delete_appointment(&self, id: &AppointmentId) -> Result<(), PortalError> {
        let outcome = if self.online.get() {
            self.delete_remote(id).await
        } else {
            Err(PortalError::Offline)
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Delete failed, removing locally: {}", e).into(),
                );
                storage::offline_delete(id)
            }
        }
    }

    async fn delete_remote(&self, id: &AppointmentId) -> Result<(), PortalError> {
        let path = format!("/appointments/{}", id);
        let value = self.request("DELETE", &path, None).await?;
        // Any success tag will do - the envelope rarely carries data here.
        classify::<Appointment>(value)?;
        let _ = self.fetch_appointments().await;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Offline sync
    // -------------------------------------------------------------------

    /// Replay offline-marked cache records against the backend, then
    /// re-fetch the list to reconcile. Per-record failures are logged and
    /// skipped; markers are not rolled back, so a partial failure may
    /// double-submit on the next trigger. Invoked from the connectivity
    /// handler and never awaited by UI code.
    pub async fn sync_offline_data(&self) -> Result<(), PortalError> {
        if !self.online.get() {
            return Ok(());
        }
        let pending = storage::offline_pending(&storage::load_appointments());
        if pending.is_empty() {
            return Ok(());
        }

        web_sys::console::log_1(&format!("Syncing {} offline record(s)", pending.len()).into());
        for record in &pending {
            if let Err(e) = self.replay(record).await {
                web_sys::console::warn_1(
                    &format!("Could not sync appointment {}: {}", record.id, e).into(),
                );
            }
        }

        self.fetch_appointments().await?;
        Ok(())
    }

    /// A creation timestamp means the backend has never seen the record, so
    /// it is POSTed even when an offline update landed on top of it.
    async fn replay(&self, record: &Appointment) -> Result<(), PortalError> {
        let body = serde_json::to_string(record)
            .map_err(|e| PortalError::Storage(format!("serialize record: {}", e)))?;

        let value = if record.created.is_some() {
            self.request("POST", "/appointments", Some(body)).await?
        } else if record.updated.is_some() {
            let path = format!("/appointments/{}", record.id);
            self.request("PUT", &path, Some(body)).await?
        } else {
            // Marked offline but never stamped - nothing to replay.
            return Ok(());
        };
        classify::<Appointment>(value).map(|_| ())
    }

    // -------------------------------------------------------------------
    // Localities
    // -------------------------------------------------------------------

    /// Locality reference table. Backend first, then the cached backup,
    /// finally the built-in color table.
    pub async fn get_localities(&self) -> Vec<Locality> {
        if self.online.get() {
            match self.fetch_localities().await {
                Ok(list) => return list,
                Err(e) => web_sys::console::warn_1(
                    &format!("Falling back to locality backup: {}", e).into(),
                ),
            }
        }
        storage::localities_backup().unwrap_or_else(fallback_localities)
    }

    async fn fetch_localities(&self) -> Result<Vec<Locality>, PortalError> {
        let value = self.request("GET", "/localities", None).await?;
        match classify::<Locality>(value)? {
            ApiPayload::List(list) => {
                if let Err(e) = storage::save_localities_backup(&list) {
                    web_sys::console::warn_1(
                        &format!("Could not back up localities: {}", e).into(),
                    );
                }
                Ok(list)
            }
            _ => Err(PortalError::InvalidFormat("expected a locality list".into())),
        }
    }
}

/// Pause before the next attempt: the base delay scaled by the attempt
/// number, so consecutive waits grow strictly.
pub(crate) fn retry_delay_ms(attempt: u32) -> u32 {
    attempt * RETRY_BASE_DELAY_MS
}

pub(crate) fn fallback_localities() -> Vec<Locality> {
    let mut list: Vec<Locality> = LOCALITY_FALLBACK_COLORS
        .iter()
        .map(|(name, color)| Locality {
            name: (*name).to_string(),
            color: (*color).to_string(),
        })
        .collect();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_grow_strictly() {
        let delays: Vec<u32> = (1..MAX_REQUEST_ATTEMPTS).map(retry_delay_ms).collect();
        // One pause fewer than there are attempts.
        assert_eq!(delays.len() as u32, MAX_REQUEST_ATTEMPTS - 1);
        for pair in delays.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(retry_delay_ms(1), RETRY_BASE_DELAY_MS);
    }

    #[test]
    fn fallback_localities_carry_hex_colors() {
        let list = fallback_localities();
        assert!(!list.is_empty());
        for locality in &list {
            assert!(locality.color.starts_with('#'), "{}", locality.color);
        }
        // Sorted for a stable UI order.
        let names: Vec<&str> = list.iter().map(|l| l.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
