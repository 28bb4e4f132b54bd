use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Appointment identifier.
///
/// Server-assigned ids are integers; appointments created while offline get
/// a client-fabricated float (epoch ms plus a random fraction) so collisions
/// with server ids are overwhelmingly unlikely. Some historical cache
/// entries carry the id as a string. Comparison therefore goes through
/// [`AppointmentId::loosely_equals`] rather than `==`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AppointmentId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AppointmentId {
    /// Canonical decimal form: `1` and `"1"` and `1.0` all render as "1".
    pub fn canonical(&self) -> String {
        match self {
            AppointmentId::Int(n) => n.to_string(),
            AppointmentId::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            AppointmentId::Text(s) => s.trim().to_string(),
        }
    }

    /// Loose-equality match across the integer/float/string representations.
    pub fn loosely_equals(&self, other: &AppointmentId) -> bool {
        self.canonical() == other.canonical()
    }

    /// Parse an id coming from a DOM attribute or URL segment. Numeric forms
    /// are preferred so the result compares cleanly with server ids.
    pub fn parse(raw: &str) -> AppointmentId {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            AppointmentId::Int(n)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            AppointmentId::Float(f)
        } else {
            AppointmentId::Text(trimmed.to_string())
        }
    }
}

impl std::fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Appointment as exchanged with the backend and the local cache.
///
/// Scheduling fields (date, time, service, customer info) are passed through
/// verbatim in `fields`; only the pieces this client acts on are typed.
/// `offline` plus one of `created` / `updated` mark a record that still has
/// to be reconciled with the backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Appointment {
    pub fn is_offline(&self) -> bool {
        self.offline.unwrap_or(false)
    }

    /// Merge a JSON-object patch over this record. Patch keys win, except
    /// `id` which is never overwritten; `status` lands in the typed field.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            match key.as_str() {
                "id" => {}
                "status" => {
                    if let Some(s) = value.as_str() {
                        self.status = Some(s.to_string());
                    } else {
                        self.fields.insert(key.clone(), value.clone());
                    }
                }
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Lower-cased concatenation of every textual field, used by the week
    /// view's free-text filter.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(status) = &self.status {
            parts.push(status.clone());
        }
        for value in self.fields.values() {
            match value {
                Value::String(s) => parts.push(s.clone()),
                Value::Number(n) => parts.push(n.to_string()),
                _ => {}
            }
        }
        parts.join(" ").to_lowercase()
    }
}

/// Authenticated user profile as stored in localStorage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u32,
    pub username: String,
    pub role: Option<String>,
    pub portal_id: Option<u32>,
    pub portal: Option<PortalConfig>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Tenant id for this session - the explicit field wins over the id
    /// embedded in the portal configuration.
    pub fn portal_id(&self) -> Option<u32> {
        self.portal_id.or_else(|| self.portal.as_ref().map(|p| p.id))
    }
}

/// Tenant configuration embedded in the user profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    pub id: u32,
    pub name: String,
}

/// Locality reference entry (name plus display color).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Locality {
    pub name: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn id_int(n: i64) -> AppointmentId {
        AppointmentId::Int(n)
    }

    #[test]
    fn loose_equality_across_representations() {
        assert!(id_int(42).loosely_equals(&AppointmentId::Text("42".into())));
        assert!(id_int(42).loosely_equals(&AppointmentId::Float(42.0)));
        assert!(AppointmentId::Text(" 42 ".into()).loosely_equals(&id_int(42)));
        assert!(!id_int(42).loosely_equals(&id_int(43)));

        let fabricated = AppointmentId::Float(1_700_000_000_123.25);
        assert!(fabricated.loosely_equals(&AppointmentId::Text("1700000000123.25".into())));
        assert!(!fabricated.loosely_equals(&id_int(1_700_000_000_123)));
    }

    #[test]
    fn parse_prefers_numeric_forms() {
        assert_eq!(AppointmentId::parse("42"), AppointmentId::Int(42));
        assert_eq!(
            AppointmentId::parse("1700000000123.25"),
            AppointmentId::Float(1_700_000_000_123.25)
        );
        assert_eq!(
            AppointmentId::parse("abc-1"),
            AppointmentId::Text("abc-1".into())
        );
        assert!(AppointmentId::parse(" 7 ").loosely_equals(&AppointmentId::Int(7)));
    }

    #[test]
    fn untagged_id_deserialization() {
        let a: Appointment = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(a.id, AppointmentId::Int(7));
        let a: Appointment = serde_json::from_value(json!({"id": 7.5})).unwrap();
        assert_eq!(a.id, AppointmentId::Float(7.5));
        let a: Appointment = serde_json::from_value(json!({"id": "7"})).unwrap();
        assert_eq!(a.id, AppointmentId::Text("7".into()));
    }

    #[test]
    fn opaque_fields_round_trip() {
        let raw = json!({
            "id": 3,
            "status": "confirmed",
            "date": "2024-05-06",
            "customer": {"name": "Maria", "phone": "912345678"}
        });
        let appt: Appointment = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(appt.status.as_deref(), Some("confirmed"));
        assert_eq!(appt.fields.get("date"), Some(&json!("2024-05-06")));
        assert_eq!(serde_json::to_value(&appt).unwrap(), raw);
    }

    #[test]
    fn apply_patch_merges_and_protects_id() {
        let mut appt: Appointment = serde_json::from_value(json!({
            "id": 3,
            "status": "pending",
            "date": "2024-05-06",
            "service": "windscreen"
        }))
        .unwrap();

        let patch = json!({"id": 99, "status": "done", "date": "2024-05-07"});
        appt.apply_patch(patch.as_object().unwrap());

        assert_eq!(appt.id, AppointmentId::Int(3));
        assert_eq!(appt.status.as_deref(), Some("done"));
        assert_eq!(appt.fields.get("date"), Some(&json!("2024-05-07")));
        assert_eq!(appt.fields.get("service"), Some(&json!("windscreen")));
    }

    #[test]
    fn searchable_text_flattens_strings_and_numbers() {
        let appt: Appointment = serde_json::from_value(json!({
            "id": 1,
            "status": "Pending",
            "customer_name": "Maria Silva",
            "phone": 912345678
        }))
        .unwrap();
        let text = appt.searchable_text();
        assert!(text.contains("pending"));
        assert!(text.contains("maria silva"));
        assert!(text.contains("912345678"));
    }

    #[test]
    fn user_portal_id_prefers_explicit_field() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "username": "gestor",
            "role": "admin",
            "portal_id": 4,
            "portal": {"id": 2, "name": "Gaia"}
        }))
        .unwrap();
        assert!(user.is_admin());
        assert_eq!(user.portal_id(), Some(4));

        let user: User = serde_json::from_value(json!({
            "id": 1,
            "username": "balcao",
            "role": "staff",
            "portal_id": null,
            "portal": {"id": 2, "name": "Gaia"}
        }))
        .unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.portal_id(), Some(2));
    }

    proptest! {
        #[test]
        fn patch_never_changes_id(n in any::<i64>(), patched in any::<i64>()) {
            let mut appt: Appointment = serde_json::from_value(json!({"id": n})).unwrap();
            let patch = json!({"id": patched, "note": "x"});
            appt.apply_patch(patch.as_object().unwrap());
            prop_assert_eq!(appt.id, AppointmentId::Int(n));
        }

        #[test]
        fn canonical_form_is_stable_for_integers(n in any::<i64>()) {
            let as_int = AppointmentId::Int(n);
            let as_text = AppointmentId::Text(n.to_string());
            prop_assert!(as_int.loosely_equals(&as_text));
        }
    }
}
