//! localStorage-backed persistence.
//!
//! Holds the appointment cache the API client falls back to when the
//! network is down, plus the auth session and the localities backup. The
//! mutation logic is split into pure helpers over `Vec<Appointment>` so the
//! offline CRUD semantics can be tested without a browser.

use serde_json::{Map, Value};
use web_sys::Storage;

use crate::constants::{
    APPOINTMENTS_KEY, AUTH_TOKEN_KEY, AUTH_USER_KEY, LAST_SYNC_KEY, LEGACY_APPOINTMENT_KEYS,
    LOCALITIES_BACKUP_KEY, PORTAL_ID_KEY,
};
use crate::error::PortalError;
use crate::models::{Appointment, AppointmentId, Locality, User};
use crate::utils::{iso_from_ms, now_ms};

fn local_storage() -> Result<Storage, PortalError> {
    web_sys::window()
        .ok_or_else(|| PortalError::Storage("no global window".into()))?
        .local_storage()
        .map_err(|_| PortalError::Storage("localStorage access denied".into()))?
        .ok_or_else(|| PortalError::Storage("localStorage unavailable".into()))
}

fn get_item(key: &str) -> Option<String> {
    local_storage().ok()?.get_item(key).ok()?
}

fn set_item(key: &str, value: &str) -> Result<(), PortalError> {
    local_storage()?
        .set_item(key, value)
        .map_err(|_| PortalError::Storage(format!("failed to write '{}'", key)))
}

fn remove_item(key: &str) {
    if let Ok(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

// ---------------------------------------------------------------------------
// Appointment cache
// ---------------------------------------------------------------------------

/// Read the cached appointment list. The current key wins; the legacy keys
/// are consulted in order so an upgraded deployment keeps its queue.
/// Missing or unparsable data degrades to an empty list.
pub fn load_appointments() -> Vec<Appointment> {
    let mut keys = vec![APPOINTMENTS_KEY];
    keys.extend(LEGACY_APPOINTMENT_KEYS);

    for key in keys {
        if let Some(json) = get_item(key) {
            match serde_json::from_str::<Vec<Appointment>>(&json) {
                Ok(list) => return list,
                Err(e) => {
                    web_sys::console::warn_1(
                        &format!("Discarding unparsable cache under '{}': {}", key, e).into(),
                    );
                }
            }
        }
    }
    Vec::new()
}

pub fn save_appointments(list: &[Appointment]) -> Result<(), PortalError> {
    let json = serde_json::to_string(list)
        .map_err(|e| PortalError::Storage(format!("serialize appointments: {}", e)))?;
    set_item(APPOINTMENTS_KEY, &json)
}

/// Fabricate an id for a record created offline: epoch ms plus a random
/// fraction, so it cannot collide with a server-assigned integer.
pub fn fabricate_offline_id() -> AppointmentId {
    AppointmentId::Float(js_sys::Date::now() + js_sys::Math::random())
}

pub fn offline_create(fields: Map<String, Value>) -> Result<Appointment, PortalError> {
    let mut list = load_appointments();
    let record = build_offline_record(fields, fabricate_offline_id(), iso_from_ms(now_ms()));
    list.push(record.clone());
    save_appointments(&list)?;
    Ok(record)
}

pub fn offline_update(
    id: &AppointmentId,
    patch: &Map<String, Value>,
) -> Result<Appointment, PortalError> {
    let mut list = load_appointments();
    let merged = merge_into(&mut list, id, patch, iso_from_ms(now_ms()))?;
    save_appointments(&list)?;
    Ok(merged)
}

pub fn offline_delete(id: &AppointmentId) -> Result<(), PortalError> {
    let mut list = load_appointments();
    if remove_matching(&mut list, id) == 0 {
        return Err(PortalError::NotFound(format!("appointment {}", id)));
    }
    save_appointments(&list)
}

// Pure core - exercised by the functions above and unit-tested directly.

pub(crate) fn build_offline_record(
    fields: Map<String, Value>,
    id: AppointmentId,
    created: String,
) -> Appointment {
    let mut record = Appointment {
        id,
        status: None,
        offline: Some(true),
        created: Some(created),
        updated: None,
        fields: Map::new(),
    };
    record.apply_patch(&fields);
    record
}

pub(crate) fn merge_into(
    list: &mut [Appointment],
    id: &AppointmentId,
    patch: &Map<String, Value>,
    updated: String,
) -> Result<Appointment, PortalError> {
    let record = list
        .iter_mut()
        .find(|a| a.id.loosely_equals(id))
        .ok_or_else(|| PortalError::NotFound(format!("appointment {}", id)))?;
    record.apply_patch(patch);
    record.offline = Some(true);
    record.updated = Some(updated);
    Ok(record.clone())
}

pub(crate) fn remove_matching(list: &mut Vec<Appointment>, id: &AppointmentId) -> usize {
    let before = list.len();
    list.retain(|a| !a.id.loosely_equals(id));
    before - list.len()
}

/// Records still waiting to be replayed against the backend.
pub(crate) fn offline_pending(list: &[Appointment]) -> Vec<Appointment> {
    list.iter().filter(|a| a.is_offline()).cloned().collect()
}

// ---------------------------------------------------------------------------
// Auth session
// ---------------------------------------------------------------------------

pub fn auth_token() -> Option<String> {
    get_item(AUTH_TOKEN_KEY).filter(|t| !t.is_empty())
}

pub fn stored_user() -> Option<User> {
    let json = get_item(AUTH_USER_KEY)?;
    serde_json::from_str(&json).ok()
}

pub fn set_auth_session(token: &str, user: &User) -> Result<(), PortalError> {
    set_item(AUTH_TOKEN_KEY, token)?;
    let json = serde_json::to_string(user)
        .map_err(|e| PortalError::Storage(format!("serialize user: {}", e)))?;
    set_item(AUTH_USER_KEY, &json)
}

pub fn clear_auth_session() {
    remove_item(AUTH_TOKEN_KEY);
    remove_item(AUTH_USER_KEY);
}

/// Manually stored tenant override, second in the resolution order.
pub fn portal_override() -> Option<u32> {
    get_item(PORTAL_ID_KEY)?.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Sync bookkeeping and localities backup
// ---------------------------------------------------------------------------

pub fn stamp_last_sync() {
    let _ = set_item(LAST_SYNC_KEY, &now_ms().to_string());
}

pub fn last_sync_ms() -> Option<u64> {
    get_item(LAST_SYNC_KEY)?.parse().ok()
}

pub fn localities_backup() -> Option<Vec<Locality>> {
    let json = get_item(LOCALITIES_BACKUP_KEY)?;
    serde_json::from_str(&json).ok()
}

pub fn save_localities_backup(list: &[Locality]) -> Result<(), PortalError> {
    let json = serde_json::to_string(list)
        .map_err(|e| PortalError::Storage(format!("serialize localities: {}", e)))?;
    set_item(LOCALITIES_BACKUP_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample(id: AppointmentId) -> Appointment {
        Appointment {
            id,
            status: Some("pending".into()),
            offline: None,
            created: None,
            updated: None,
            fields: fields(&[("date", json!("2024-05-06"))]),
        }
    }

    #[test]
    fn build_offline_record_stamps_markers() {
        let record = build_offline_record(
            fields(&[("status", json!("pending")), ("service", json!("windscreen"))]),
            AppointmentId::Float(1_700_000_000_000.5),
            "2023-11-14T22:13:20.000Z".into(),
        );
        assert_eq!(record.offline, Some(true));
        assert_eq!(record.created.as_deref(), Some("2023-11-14T22:13:20.000Z"));
        assert!(record.updated.is_none());
        assert_eq!(record.status.as_deref(), Some("pending"));
        assert_eq!(record.fields.get("service"), Some(&json!("windscreen")));
    }

    #[test]
    fn merge_into_marks_update_and_returns_merged() {
        let mut list = vec![sample(AppointmentId::Int(3))];
        let merged = merge_into(
            &mut list,
            &AppointmentId::Text("3".into()),
            &fields(&[("status", json!("done"))]),
            "2024-05-06T10:00:00.000Z".into(),
        )
        .unwrap();
        assert_eq!(merged.status.as_deref(), Some("done"));
        assert_eq!(merged.offline, Some(true));
        assert_eq!(merged.updated.as_deref(), Some("2024-05-06T10:00:00.000Z"));
        assert_eq!(list[0], merged);
    }

    #[test]
    fn merge_into_missing_id_leaves_list_untouched() {
        let mut list = vec![sample(AppointmentId::Int(3))];
        let snapshot = list.clone();
        let err = merge_into(
            &mut list,
            &AppointmentId::Int(99),
            &fields(&[("status", json!("done"))]),
            "2024-05-06T10:00:00.000Z".into(),
        )
        .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
        assert_eq!(list, snapshot);
    }

    #[test]
    fn remove_matching_uses_loose_equality() {
        let mut list = vec![
            sample(AppointmentId::Int(3)),
            sample(AppointmentId::Text("3".into())),
            sample(AppointmentId::Int(4)),
        ];
        assert_eq!(remove_matching(&mut list, &AppointmentId::Int(3)), 2);
        assert_eq!(list.len(), 1);
        assert_eq!(remove_matching(&mut list, &AppointmentId::Int(99)), 0);
    }

    #[test]
    fn offline_pending_skips_synced_records() {
        let mut offline = sample(AppointmentId::Int(1));
        offline.offline = Some(true);
        let list = vec![offline.clone(), sample(AppointmentId::Int(2))];
        assert_eq!(offline_pending(&list), vec![offline]);
        assert!(offline_pending(&[sample(AppointmentId::Int(2))]).is_empty());
    }
}
