//! Utility helpers shared across the WASM frontend.

/// Return the current timestamp in **milliseconds** since UNIX epoch.
///
/// We use JS Date here because it is available in browser/WASM without
/// having to thread a clock through every call site.
pub fn now_ms() -> u64 {
    // `js_sys::Date::now()` returns f64 representing milliseconds since epoch.
    js_sys::Date::now() as u64
}

/// Render a millisecond timestamp as an ISO-8601 string (UTC).
///
/// Offline records are stamped with these so the sync pass can tell a
/// locally-created record from a locally-updated one.
pub fn iso_from_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Current `window.location.pathname`, `None` outside a browser context.
pub fn window_path() -> Option<String> {
    web_sys::window()?.location().pathname().ok()
}
