use tracing::debug;

use crate::services::exchange_rate::ExchangeRateClient;
use crate::services::state::AppState;
use crate::services::summary::StatementSummary;

/// Refreshes the rate from the configured endpoint. The outcome is reported
/// through the document's status messages, so the statement is returned
/// whether or not the request succeeded.
pub async fn refresh_exchange_rate(state: &AppState) -> Result<StatementSummary, String> {
    let settings = state.settings().map_err(|e| e.to_string())?;
    let client = ExchangeRateClient::from_settings(&settings);

    let outcome = state
        .refresh_exchange_rate(&client)
        .await
        .map_err(|e| e.to_string())?;
    debug!(?outcome, "Exchange-rate refresh finished");

    state.summary().map_err(|e| e.to_string())
}
