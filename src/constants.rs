// Default values and storage keys - these are the single source of truth
// for every hard-coded string the portal relies on.

use std::collections::HashMap;

// Backend endpoints
pub const PRODUCTION_API_URL: &str = "https://agendamento.expressglass.pt/.netlify/functions";
pub const LOCAL_API_URL: &str = "http://localhost:8888/.netlify/functions";
pub const RELATIVE_API_URL: &str = "/.netlify/functions";

// Name of the global a hosting page may set to override API detection,
// read off `window` before any hostname heuristics run.
pub const API_URL_GLOBAL: &str = "EXPRESSGLASS_API_URL";

// Request execution
pub const MAX_REQUEST_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u32 = 1_000;

// Week view
pub const SEARCH_DEBOUNCE_MS: u32 = 150;

// Tenant selection
pub const DEFAULT_PORTAL_ID: u32 = 1;

// localStorage keys
pub const AUTH_TOKEN_KEY: &str = "eg_auth_token";
pub const AUTH_USER_KEY: &str = "eg_auth_user";
pub const PORTAL_ID_KEY: &str = "eg_portal_id";
pub const APPOINTMENTS_KEY: &str = "eg_appointments";
/// Older cache keys still read as fallbacks so an upgrade does not lose a
/// user's offline queue. Writes always go to [`APPOINTMENTS_KEY`].
pub const LEGACY_APPOINTMENT_KEYS: [&str; 2] = ["agendamentos", "appointments_cache"];
pub const LAST_SYNC_KEY: &str = "eg_last_sync";
pub const LOCALITIES_BACKUP_KEY: &str = "eg_localities_backup";

pub const LOGIN_PAGE_PATH: &str = "/login.html";
pub const LOGIN_EXPIRED_URL: &str = "/login.html?expired=1";

/// Hostname prefixes that identify a portal when nothing better is known
/// (no session, no manual override). First DNS label only.
pub const PORTAL_HOSTNAME_PREFIXES: [(&str, u32); 5] = [
    ("porto", 1),
    ("gaia", 2),
    ("braga", 3),
    ("lisboa", 4),
    ("coimbra", 5),
];

lazy_static::lazy_static! {
    /// Display colors used when neither the backend nor the local backup can
    /// provide the locality table.
    pub static ref LOCALITY_FALLBACK_COLORS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("Porto", "#2563eb");
        m.insert("Vila Nova de Gaia", "#16a34a");
        m.insert("Braga", "#dc2626");
        m.insert("Lisboa", "#9333ea");
        m.insert("Coimbra", "#ea580c");
        m.insert("Aveiro", "#0891b2");
        m
    };
}
