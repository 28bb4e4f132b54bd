//! Week-view glue: binds the navigation and search controls, performs the
//! initial load and forwards row actions to the API clients.
//!
//! Rendering of the week grid itself belongs to the hosting page; this
//! module only maintains the state and the small always-present indicators
//! (week label, visible count, connection badge).

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, HtmlInputElement};

use crate::constants::SEARCH_DEBOUNCE_MS;
use crate::models::AppointmentId;
use crate::network::ApiClient;
use crate::schedule::{ScheduleApi, WeekView};

pub fn mount(
    document: &Document,
    client: Rc<ApiClient>,
    api: Rc<ScheduleApi>,
) -> Result<(), JsValue> {
    let view = Rc::new(RefCell::new(WeekView::new(
        chrono::Local::now().date_naive(),
    )));

    bind_navigation(document, &client, &api, &view)?;
    bind_search(document, &client, &view)?;
    bind_row_actions(document, &client, &api, &view)?;
    bind_create_form(document, &client, &api, &view)?;

    // Initial load.
    reload(document.clone(), client, api, view);
    Ok(())
}

fn bind_navigation(
    document: &Document,
    client: &Rc<ApiClient>,
    api: &Rc<ScheduleApi>,
    view: &Rc<RefCell<WeekView>>,
) -> Result<(), JsValue> {
    type Shift = fn(&mut WeekView);
    let buttons: [(&str, Shift); 3] = [
        ("prev-week", |v| v.prev_week()),
        ("next-week", |v| v.next_week()),
        ("today", |v| v.today(chrono::Local::now().date_naive())),
    ];

    for (element_id, shift) in buttons {
        let button = match document.get_element_by_id(element_id) {
            Some(el) => el,
            None => continue,
        };
        let document = document.clone();
        let client = client.clone();
        let api = api.clone();
        let view = view.clone();

        let on_click = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            shift(&mut view.borrow_mut());
            reload(document.clone(), client.clone(), api.clone(), view.clone());
        }) as Box<dyn FnMut(_)>);
        button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }
    Ok(())
}

fn bind_search(
    document: &Document,
    client: &Rc<ApiClient>,
    view: &Rc<RefCell<WeekView>>,
) -> Result<(), JsValue> {
    let input = match document.get_element_by_id("appointment-search") {
        Some(el) => el.dyn_into::<HtmlInputElement>()?,
        None => return Ok(()),
    };

    let document = document.clone();
    let client = client.clone();
    let view = view.clone();
    let pending: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));

    let on_input = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let text = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            .map(|i| i.value())
            .unwrap_or_default();

        let document = document.clone();
        let client = client.clone();
        let view = view.clone();
        // Replacing the previous Timeout drops it, which cancels the
        // not-yet-fired callback.
        let task = Timeout::new(SEARCH_DEBOUNCE_MS, move || {
            view.borrow_mut().set_filter(&text);
            render(&document, &view.borrow(), client.is_online());
        });
        *pending.borrow_mut() = Some(task);
    }) as Box<dyn FnMut(_)>);
    input.add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())?;
    on_input.forget();
    Ok(())
}

/// Delegated click handler for the appointments container. Rows rendered by
/// the page mark their controls with `data-appointment-id` plus either
/// `data-status` (status change) or `data-action="delete"`.
fn bind_row_actions(
    document: &Document,
    client: &Rc<ApiClient>,
    api: &Rc<ScheduleApi>,
    view: &Rc<RefCell<WeekView>>,
) -> Result<(), JsValue> {
    let container = match document.get_element_by_id("appointments") {
        Some(el) => el,
        None => return Ok(()),
    };

    let document = document.clone();
    let client = client.clone();
    let api = api.clone();
    let view = view.clone();

    let on_click = Closure::wrap(Box::new(move |event: web_sys::MouseEvent| {
        let target: Element = match event.target().and_then(|t| t.dyn_into::<Element>().ok()) {
            Some(el) => el,
            None => return,
        };
        let id = match target.get_attribute("data-appointment-id") {
            Some(raw) => AppointmentId::parse(&raw),
            None => return,
        };

        if let Some(status) = target.get_attribute("data-status") {
            let document = document.clone();
            let client = client.clone();
            let api = api.clone();
            let view = view.clone();
            spawn_local(async move {
                if let Err(e) = api.update_status(&id, &status).await {
                    web_sys::console::error_1(&format!("Status update failed: {}", e).into());
                }
                reload(document, client, api, view);
            });
        } else if target.get_attribute("data-action").as_deref() == Some("delete") {
            let document = document.clone();
            let client = client.clone();
            let api = api.clone();
            let view = view.clone();
            spawn_local(async move {
                if let Err(e) = client.delete_appointment(&id).await {
                    web_sys::console::error_1(&format!("Delete failed: {}", e).into());
                }
                reload(document, client, api, view);
            });
        }
    }) as Box<dyn FnMut(_)>);
    container.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();
    Ok(())
}

/// Optional booking form. Field inputs are read by id; the payload is passed
/// through to the backend verbatim.
fn bind_create_form(
    document: &Document,
    client: &Rc<ApiClient>,
    api: &Rc<ScheduleApi>,
    view: &Rc<RefCell<WeekView>>,
) -> Result<(), JsValue> {
    let form = match document.get_element_by_id("new-appointment") {
        Some(el) => el,
        None => return Ok(()),
    };

    let document = document.clone();
    let client = client.clone();
    let api = api.clone();
    let view = view.clone();

    let on_submit = Closure::wrap(Box::new(move |event: web_sys::Event| {
        event.prevent_default();

        let mut fields = serde_json::Map::new();
        for (input_id, field) in [
            ("appointment-date", "date"),
            ("appointment-time", "time"),
            ("appointment-customer", "customer_name"),
            ("appointment-service", "service"),
            ("appointment-locality", "locality"),
        ] {
            if let Some(input) = document
                .get_element_by_id(input_id)
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            {
                let value = input.value();
                if !value.trim().is_empty() {
                    fields.insert(field.to_string(), value.into());
                }
            }
        }

        let document = document.clone();
        let client = client.clone();
        let api = api.clone();
        let view = view.clone();
        spawn_local(async move {
            match client.create_appointment(fields).await {
                Ok(record) => {
                    web_sys::console::log_1(
                        &format!("Created appointment {}", record.id).into(),
                    );
                }
                Err(e) => {
                    web_sys::console::error_1(&format!("Create failed: {}", e).into());
                }
            }
            reload(document, client, api, view);
        });
    }) as Box<dyn FnMut(_)>);
    form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())?;
    on_submit.forget();
    Ok(())
}

/// Fetch the displayed week and refresh the indicators. The week surface
/// raises on failure; here that means an error line on the console and a
/// render of whatever is already loaded.
fn reload(
    document: Document,
    client: Rc<ApiClient>,
    api: Rc<ScheduleApi>,
    view: Rc<RefCell<WeekView>>,
) {
    spawn_local(async move {
        let (start, end) = view.borrow().week_range();
        match api.week_appointments(start, end).await {
            Ok(list) => {
                view.borrow_mut().appointments = list;
            }
            Err(e) => {
                web_sys::console::error_1(
                    &format!("Week load {} - {} failed: {}", start, end, e).into(),
                );
            }
        }
        render(&document, &view.borrow(), client.is_online());
    });
}

fn render(document: &Document, view: &WeekView, online: bool) {
    let (start, end) = view.week_range();
    if let Some(label) = document.get_element_by_id("week-label") {
        label.set_text_content(Some(&format!(
            "{} - {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )));
    }
    if let Some(count) = document.get_element_by_id("appointment-count") {
        count.set_text_content(Some(&view.visible().len().to_string()));
    }
    if let Some(badge) = document.get_element_by_id("connection-status") {
        let label = if online {
            "online".to_string()
        } else {
            match crate::storage::last_sync_ms() {
                Some(ms) => format!("offline - cached {}", crate::utils::iso_from_ms(ms)),
                None => "offline".to_string(),
            }
        };
        badge.set_text_content(Some(&label));
        badge.set_class_name(if online {
            "connection-status online"
        } else {
            "connection-status offline"
        });
    }
}
