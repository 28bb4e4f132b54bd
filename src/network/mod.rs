// Re-export network modules
pub mod api_client;
pub mod config;
pub mod response;
pub mod transport;

// Re-export commonly used items
pub use api_client::ApiClient;
pub use config::ApiConfig;

use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Current browser connectivity signal. Defaults to online outside a
/// browser context so unit tests exercise the network path.
pub fn is_online() -> bool {
    web_sys::window()
        .map(|w| w.navigator().on_line())
        .unwrap_or(true)
}

/// Hook a client up to the browser's online/offline events: flip its cached
/// flag, and on restoration kick off a best-effort replay of the offline
/// queue. Listeners hold only a weak reference so a reconfigured client's
/// hooks lapse with it.
pub(crate) fn register_connectivity(client: &Rc<ApiClient>) {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return,
    };

    let online_flag = client.online_flag();
    let weak = Rc::downgrade(client);
    let on_online = Closure::wrap(Box::new(move |_: web_sys::Event| {
        online_flag.set(true);
        web_sys::console::log_1(&"Connection restored - replaying offline queue".into());
        if let Some(client) = weak.upgrade() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = client.sync_offline_data().await {
                    web_sys::console::warn_1(&format!("Offline sync failed: {}", e).into());
                }
            });
        }
    }) as Box<dyn FnMut(_)>);
    let _ = window.add_event_listener_with_callback("online", on_online.as_ref().unchecked_ref());
    on_online.forget();

    let online_flag = client.online_flag();
    let on_offline = Closure::wrap(Box::new(move |_: web_sys::Event| {
        online_flag.set(false);
        web_sys::console::log_1(&"Connection lost - switching to local cache".into());
    }) as Box<dyn FnMut(_)>);
    let _ =
        window.add_event_listener_with_callback("offline", on_offline.as_ref().unchecked_ref());
    on_offline.forget();
}
