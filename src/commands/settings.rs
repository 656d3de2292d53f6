use serde::Deserialize;

use crate::models::{RemarkDefault, Settings};
use crate::services::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    pub rate_api_url: Option<String>,
    pub rate_api_key: Option<String>,
    pub local_currency: Option<String>,
    pub foreign_currency: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub status_display_secs: Option<u64>,
    pub preserve_date_on_clear: Option<bool>,
    pub remark_default: Option<String>,
}

pub fn get_settings(state: &AppState) -> Result<Settings, String> {
    state.settings().map_err(|e| e.to_string())
}

/// Fields left out of `payload` keep their current value. An empty API key
/// removes the stored one.
pub fn save_settings(payload: SettingsPayload, state: &AppState) -> Result<Settings, String> {
    let mut settings = get_settings(state)?;

    if let Some(value) = non_empty(payload.rate_api_url) {
        settings.rate_api_url = value;
    }
    if let Some(api_key) = payload.rate_api_key {
        settings.rate_api_key = Some(api_key.trim().to_string()).filter(|k| !k.is_empty());
    }
    if let Some(value) = non_empty(payload.local_currency) {
        settings.local_currency = value.to_uppercase();
    }
    if let Some(value) = non_empty(payload.foreign_currency) {
        settings.foreign_currency = value.to_uppercase();
    }
    if let Some(secs) = payload.request_timeout_secs {
        if secs == 0 {
            return Err("Request timeout must be at least one second".to_string());
        }
        settings.request_timeout_secs = secs;
    }
    if let Some(secs) = payload.status_display_secs {
        settings.status_display_secs = secs;
    }
    if let Some(value) = payload.preserve_date_on_clear {
        settings.preserve_date_on_clear = value;
    }
    if let Some(value) = payload.remark_default {
        settings.remark_default = RemarkDefault::parse(&value)
            .ok_or_else(|| format!("Unknown remark default: {}", value))?;
    }

    state
        .update_settings(settings.clone())
        .map_err(|e| e.to_string())?;
    Ok(settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::services::state::load_settings;

    fn state() -> AppState {
        AppState::new(Database::open_in_memory().unwrap(), Settings::default())
    }

    #[test]
    fn partial_payload_keeps_other_fields() {
        let state = state();
        let payload = SettingsPayload {
            local_currency: Some(" twd ".to_string()),
            foreign_currency: Some("usd".to_string()),
            remark_default: Some("boilerplate".to_string()),
            ..SettingsPayload::default()
        };

        let saved = save_settings(payload, &state).unwrap();
        assert_eq!(saved.foreign_currency, "USD");
        assert_eq!(saved.local_currency, "TWD");
        assert_eq!(saved.remark_default, RemarkDefault::Boilerplate);
        assert_eq!(saved.request_timeout_secs, Settings::default().request_timeout_secs);

        let db = state.db.lock().unwrap();
        assert_eq!(load_settings(&db), saved);
    }

    #[test]
    fn empty_api_key_clears_it() {
        let state = state();
        let with_key = SettingsPayload {
            rate_api_key: Some("secret".to_string()),
            ..SettingsPayload::default()
        };
        assert_eq!(save_settings(with_key, &state).unwrap().rate_api_key.as_deref(), Some("secret"));

        let cleared = SettingsPayload {
            rate_api_key: Some("  ".to_string()),
            ..SettingsPayload::default()
        };
        assert_eq!(save_settings(cleared, &state).unwrap().rate_api_key, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let state = state();
        let bad_timeout = SettingsPayload {
            request_timeout_secs: Some(0),
            ..SettingsPayload::default()
        };
        assert!(save_settings(bad_timeout, &state).is_err());

        let bad_remarks = SettingsPayload {
            remark_default: Some("poem".to_string()),
            ..SettingsPayload::default()
        };
        assert!(save_settings(bad_remarks, &state).is_err());
        assert_eq!(get_settings(&state).unwrap(), Settings::default());
    }
}
