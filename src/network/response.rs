//! Response-shape classifier.
//!
//! The backend answers with either a bare payload or an envelope carrying a
//! `success` flag next to `data` / `error`. Everything is decoded exactly
//! once into a tagged [`ApiPayload`]; downstream code matches on the tag
//! and never re-inspects raw JSON shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PortalError;

#[derive(Debug, PartialEq)]
pub enum ApiPayload<T> {
    List(Vec<T>),
    Record(T),
    Empty,
}

pub fn classify<T: DeserializeOwned>(value: Value) -> Result<ApiPayload<T>, PortalError> {
    match value {
        Value::Array(_) => {
            let items: Vec<T> = serde_json::from_value(value)
                .map_err(|e| PortalError::InvalidFormat(format!("bad list item: {}", e)))?;
            Ok(ApiPayload::List(items))
        }
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                let message = error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(PortalError::Backend(message));
            }
            match map.get("success") {
                Some(Value::Bool(true)) => match map.get("data") {
                    Some(Value::Array(_)) => {
                        let items: Vec<T> = serde_json::from_value(map["data"].clone()).map_err(
                            |e| PortalError::InvalidFormat(format!("bad list item: {}", e)),
                        )?;
                        Ok(ApiPayload::List(items))
                    }
                    Some(Value::Object(_)) => {
                        let record: T = serde_json::from_value(map["data"].clone()).map_err(
                            |e| PortalError::InvalidFormat(format!("bad record: {}", e)),
                        )?;
                        Ok(ApiPayload::Record(record))
                    }
                    None | Some(Value::Null) => Ok(ApiPayload::Empty),
                    Some(other) => Err(PortalError::InvalidFormat(format!(
                        "unexpected data payload: {}",
                        other
                    ))),
                },
                Some(Value::Bool(false)) => {
                    let message = map
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or("request rejected")
                        .to_string();
                    Err(PortalError::Backend(message))
                }
                _ => Err(PortalError::InvalidFormat(
                    "object without success flag".into(),
                )),
            }
        }
        other => Err(PortalError::InvalidFormat(format!(
            "neither list nor envelope: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, AppointmentId};
    use serde_json::json;

    fn classify_appt(value: Value) -> Result<ApiPayload<Appointment>, PortalError> {
        classify(value)
    }

    #[test]
    fn bare_list_is_accepted() {
        let payload = classify_appt(json!([{"id": 1}, {"id": 2}])).unwrap();
        match payload {
            ApiPayload::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].id, AppointmentId::Int(1));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn success_envelope_unwraps_data() {
        let payload =
            classify_appt(json!({"success": true, "data": [{"id": 5}]})).unwrap();
        assert!(matches!(payload, ApiPayload::List(ref items) if items.len() == 1));

        let payload =
            classify_appt(json!({"success": true, "data": {"id": 5}})).unwrap();
        assert!(matches!(payload, ApiPayload::Record(_)));

        let payload = classify_appt(json!({"success": true})).unwrap();
        assert_eq!(payload, ApiPayload::Empty);
    }

    #[test]
    fn error_field_wins_over_everything() {
        let err = classify_appt(json!({"success": true, "error": "boom"})).unwrap_err();
        assert_eq!(err, PortalError::Backend("boom".into()));
    }

    #[test]
    fn unsuccessful_envelope_reports_message() {
        let err =
            classify_appt(json!({"success": false, "message": "slot taken"})).unwrap_err();
        assert_eq!(err, PortalError::Backend("slot taken".into()));

        let err = classify_appt(json!({"success": false})).unwrap_err();
        assert_eq!(err, PortalError::Backend("request rejected".into()));
    }

    #[test]
    fn unknown_shapes_are_invalid_format() {
        assert!(matches!(
            classify_appt(json!("surprise")),
            Err(PortalError::InvalidFormat(_))
        ));
        assert!(matches!(
            classify_appt(json!({"appointments": []})),
            Err(PortalError::InvalidFormat(_))
        ));
        assert!(matches!(
            classify_appt(json!({"success": true, "data": 42})),
            Err(PortalError::InvalidFormat(_))
        ));
    }
}
