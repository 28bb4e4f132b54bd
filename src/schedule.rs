//! Week-view scheduling state.
//!
//! Keeps the currently displayed week, the loaded appointment list and the
//! free-text filter. Navigation shifts the week start by whole weeks; the
//! filter is a case-insensitive substring match over an appointment's
//! textual fields. The REST surface here is deliberately narrower than
//! [`crate::network::ApiClient`]: week reads and status updates raise on
//! failure instead of degrading to the offline cache.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::error::PortalError;
use crate::models::{Appointment, AppointmentId};
use crate::network::ApiConfig;

pub struct WeekView {
    week_start: NaiveDate,
    pub appointments: Vec<Appointment>,
    filter: String,
}

impl WeekView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            week_start: monday_of(today),
            appointments: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    pub fn prev_week(&mut self) {
        self.week_start = self.week_start - Duration::days(7);
    }

    pub fn next_week(&mut self) {
        self.week_start = self.week_start + Duration::days(7);
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.week_start = monday_of(today);
    }

    /// Inclusive start/end of the displayed week.
    pub fn week_range(&self) -> (NaiveDate, NaiveDate) {
        (self.week_start, self.week_start + Duration::days(6))
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.trim().to_lowercase();
    }

    /// Appointments passing the current free-text filter.
    pub fn visible(&self) -> Vec<&Appointment> {
        if self.filter.is_empty() {
            return self.appointments.iter().collect();
        }
        self.appointments
            .iter()
            .filter(|a| a.searchable_text().contains(&self.filter))
            .collect()
    }
}

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[derive(Deserialize)]
struct WeekEnvelope {
    appointments: Vec<Appointment>,
}

/// Narrow REST client used by the week view.
pub struct ScheduleApi {
    config: ApiConfig,
    portal_id: u32,
}

impl ScheduleApi {
    pub fn new(config: ApiConfig, portal_id: u32) -> Self {
        Self { config, portal_id }
    }

    /// GET the week's appointments. Expects an `{"appointments": [...]}`
    /// envelope; non-ok responses raise with the response body text.
    pub async fn week_appointments(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, PortalError> {
        let url = format!(
            "{}/appointments?start={}&end={}",
            self.config.base_url(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        let resp = self.fetch(&url, "GET", None).await?;
        if !resp.ok() {
            return Err(self.body_error(&resp).await);
        }

        let json_value = JsFuture::from(resp.json().map_err(PortalError::from_js)?)
            .await
            .map_err(PortalError::from_js)?;
        let envelope: WeekEnvelope = serde_wasm_bindgen::from_value(json_value)
            .map_err(|e| PortalError::InvalidFormat(e.to_string()))?;
        Ok(envelope.appointments)
    }

    /// PUT a status change to the id-scoped endpoint.
    pub async fn update_status(
        &self,
        id: &AppointmentId,
        status: &str,
    ) -> Result<(), PortalError> {
        let url = format!("{}/appointments/{}/status", self.config.base_url(), id);
        let body = serde_json::json!({"status": status}).to_string();

        let resp = self.fetch(&url, "PUT", Some(&body)).await?;
        if !resp.ok() {
            return Err(self.body_error(&resp).await);
        }
        Ok(())
    }

    async fn fetch(
        &self,
        url: &str,
        method: &str,
        body: Option<&str>,
    ) -> Result<Response, PortalError> {
        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(RequestMode::Cors);

        let headers = Headers::new().map_err(PortalError::from_js)?;
        headers
            .append("X-Portal-Id", &self.portal_id.to_string())
            .map_err(PortalError::from_js)?;
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
        resp_value.dyn_into().map_err(PortalError::from_js)
    }

    async fn body_error(&self, resp: &Response) -> PortalError {
        let status = resp.status();
        let text = match resp.text() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .ok()
                .and_then(|v| v.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        let message = if text.is_empty() {
            format!("HTTP {}", status)
        } else {
            text
        };
        PortalError::Http { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monday_snapping() {
        // 2024-05-08 is a Wednesday.
        assert_eq!(monday_of(date(2024, 5, 8)), date(2024, 5, 6));
        // Monday stays put.
        assert_eq!(monday_of(date(2024, 5, 6)), date(2024, 5, 6));
        // Sunday belongs to the week that started six days earlier.
        assert_eq!(monday_of(date(2024, 5, 12)), date(2024, 5, 6));
    }

    #[test]
    fn navigation_shifts_whole_weeks() {
        let mut view = WeekView::new(date(2024, 5, 8));
        assert_eq!(view.week_start(), date(2024, 5, 6));

        view.next_week();
        assert_eq!(view.week_start(), date(2024, 5, 13));
        view.prev_week();
        view.prev_week();
        assert_eq!(view.week_start(), date(2024, 4, 29));

        view.today(date(2024, 5, 10));
        assert_eq!(view.week_start(), date(2024, 5, 6));
    }

    #[test]
    fn week_range_is_inclusive() {
        let view = WeekView::new(date(2024, 5, 8));
        let (start, end) = view.week_range();
        assert_eq!(start, date(2024, 5, 6));
        assert_eq!(end, date(2024, 5, 12));
        assert_eq!(start.format("%Y-%m-%d").to_string(), "2024-05-06");
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let mut view = WeekView::new(date(2024, 5, 8));
        view.appointments = serde_json::from_value(json!([
            {"id": 1, "customer_name": "Maria Silva", "service": "windscreen"},
            {"id": 2, "customer_name": "Rui Costa", "service": "side window"}
        ]))
        .unwrap();

        view.set_filter("MARIA");
        assert_eq!(view.visible().len(), 1);
        view.set_filter("wind");
        assert_eq!(view.visible().len(), 2);
        view.set_filter("window");
        assert_eq!(view.visible().len(), 1);
        view.set_filter("");
        assert_eq!(view.visible().len(), 2);
        view.set_filter("nobody");
        assert!(view.visible().is_empty());
    }
}
