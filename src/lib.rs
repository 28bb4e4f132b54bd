//! Expressglass scheduling portal - browser client.
//!
//! Construction is explicit: `start()` resolves the environment once,
//! builds one auth client and one API client for the session and hands them
//! to the UI glue. There is no global client object; swapping tenants goes
//! through [`network::ApiClient::reconfigure`].

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod auth;
mod components;
mod constants;
mod error;
mod models;
mod network;
mod schedule;
mod storage;
mod utils;

pub use auth::{AuthClient, LoginOutcome};
pub use error::PortalError;
pub use models::{Appointment, AppointmentId, Locality, PortalConfig, User};
pub use network::{ApiClient, ApiConfig};
pub use schedule::{ScheduleApi, WeekView};

// Main entry point for the WASM application
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Initialize better panic messages
    console_error_panic_hook::set_once();

    let window = web_sys::window().expect("no global `window` exists");
    let document = window.document().expect("should have a document on window");

    let config = network::ApiConfig::detect();
    let auth = Rc::new(auth::AuthClient::new(config.clone()));
    let client = network::ApiClient::new(config.clone(), auth.clone());
    let schedule_api = Rc::new(schedule::ScheduleApi::new(config, client.portal_id()));

    web_sys::console::log_1(
        &format!(
            "Portal client ready (portal {}, {})",
            client.portal_id(),
            if client.is_online() { "online" } else { "offline" }
        )
        .into(),
    );

    // Confirm the cached session in the background; a stale token is
    // cleared inside verify_auth.
    if auth.is_authenticated() {
        let auth = auth.clone();
        spawn_local(async move {
            if let Err(e) = auth.verify_auth().await {
                web_sys::console::warn_1(&format!("Session check failed: {}", e).into());
            }
        });
    }

    // Warm the offline cache and the locality backup so a later connection
    // drop still has data to serve.
    {
        let client = client.clone();
        spawn_local(async move {
            let appointments = client.get_appointments().await;
            let localities = client.get_localities().await;
            web_sys::console::log_1(
                &format!(
                    "Loaded {} appointment(s), {} localit(ies)",
                    appointments.len(),
                    localities.len()
                )
                .into(),
            );
        });
    }

    components::schedule_view::mount(&document, client, schedule_api)?;
    Ok(())
}
