use serde::Serialize;
use tracing::info;

use crate::catalog::{self, CustomerEntry, DomesticProduct, OptionGroup, ReferenceGroup};
use crate::services::reducer::Command;
use crate::services::state::AppState;
use crate::services::summary::StatementSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub customers: &'static [CustomerEntry],
    pub domestic_products: &'static [DomesticProduct],
    pub imported_options: Vec<OptionGroup>,
    pub service_reference: Vec<ReferenceGroup>,
}

pub fn get_statement(state: &AppState) -> Result<StatementSummary, String> {
    state.summary().map_err(|e| e.to_string())
}

pub fn dispatch_command(command: Command, state: &AppState) -> Result<StatementSummary, String> {
    if matches!(command, Command::ClearDocument { .. }) {
        return Err("Use clear_statement to clear the statement".to_string());
    }
    state.dispatch(command).map_err(|e| e.to_string())?;
    get_statement(state)
}

/// Accepts a command as sent by the webview, e.g.
/// `{"type":"SELECT_CUSTOMER","payload":"永信染整有限公司"}`.
/// Unknown command types are accepted and change nothing.
pub fn dispatch_json(raw: &str, state: &AppState) -> Result<StatementSummary, String> {
    let command = Command::from_json(raw).map_err(|e| format!("Invalid command: {}", e))?;
    dispatch_command(command, state)
}

pub fn clear_statement(confirmed: bool, state: &AppState) -> Result<StatementSummary, String> {
    if !confirmed {
        return Err("Clearing the statement requires confirmation".to_string());
    }
    info!("Clearing statement");
    state
        .dispatch(Command::clear_document())
        .map_err(|e| e.to_string())?;
    get_statement(state)
}

pub fn get_catalog() -> CatalogView {
    CatalogView {
        customers: catalog::customers(),
        domestic_products: catalog::domestic_products(),
        imported_options: catalog::imported_options(),
        service_reference: catalog::service_reference(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MANUAL_ENTRY;
    use crate::db::Database;
    use crate::models::Settings;

    fn state() -> AppState {
        AppState::new(Database::open_in_memory().unwrap(), Settings::default())
    }

    #[test]
    fn json_commands_drive_the_statement() {
        let state = state();
        dispatch_json(r#"{"type":"SELECT_CUSTOMER","payload":"永信染整有限公司"}"#, &state).unwrap();
        dispatch_json(r#"{"type":"ADD_DOMESTIC_ITEM","payload":{"date":"2025-03-05"}}"#, &state)
            .unwrap();
        dispatch_json(
            r#"{"type":"UPDATE_DOMESTIC_ITEM","payload":{"index":0,"update":{"field":"price","value":70}}}"#,
            &state,
        )
        .unwrap();
        let summary = dispatch_json(
            r#"{"type":"UPDATE_DOMESTIC_ITEM","payload":{"index":0,"update":{"field":"quantity","value":10}}}"#,
            &state,
        )
        .unwrap();

        assert_eq!(summary.document.customer_data.tax_id, "13572468");
        assert_eq!(summary.totals.domestic_total, 735.0);
        assert!(summary.downloadable);
    }

    #[test]
    fn unknown_command_type_changes_nothing() {
        let state = state();
        let before = get_statement(&state).unwrap();
        let after = dispatch_json(r#"{"type":"FLY_TO_MOON"}"#, &state).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_command_with_payload_changes_nothing() {
        let state = state();
        let before = get_statement(&state).unwrap();
        let after =
            dispatch_json(r#"{"type":"FLY_TO_MOON","payload":{"speed":"fast"}}"#, &state).unwrap();
        assert_eq!(before, after);
        let after = dispatch_json(r#"{"type":"FLY_TO_MOON","payload":3}"#, &state).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn known_command_with_bad_payload_is_rejected() {
        let state = state();
        assert!(dispatch_json(r#"{"type":"SELECT_CUSTOMER","payload":{"name":7}}"#, &state).is_err());
    }

    #[test]
    fn malformed_command_is_rejected() {
        let state = state();
        assert!(dispatch_json("not json", &state).is_err());
    }

    #[test]
    fn clearing_requires_confirmation() {
        let state = state();
        state.dispatch(Command::add_domestic_item()).unwrap();

        assert!(clear_statement(false, &state).is_err());
        assert!(dispatch_command(Command::clear_document(), &state).is_err());
        assert_eq!(get_statement(&state).unwrap().document.domestic_items.len(), 1);

        let summary = clear_statement(true, &state).unwrap();
        assert!(summary.document.domestic_items.is_empty());
    }

    #[test]
    fn catalog_view_lists_manual_entry() {
        let view = get_catalog();
        assert_eq!(view.customers.last().unwrap().name, MANUAL_ENTRY);
        assert!(!view.imported_options.is_empty());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["domesticProducts"].is_array());
    }
}
