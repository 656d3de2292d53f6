//! Exchange-rate refresh: a rate-limited lookup against an open rates API,
//! translated into reducer commands.
//!
//! The decision logic ([`begin`], [`resolve`]) is pure so it can be driven
//! without a network; [`ExchangeRateClient`] is the HTTP implementation of
//! [`RateSource`].

use std::future::Future;

use chrono::{DateTime, Utc};
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{Document, RateQuote, Settings};
use crate::services::reducer::Command;
use crate::utils::{format_local_datetime, format_local_time, now_unix, round_to};

pub const FALLBACK_REFRESH_SECS: i64 = 24 * 60 * 60;
pub const FAILURE_MESSAGE: &str = "無法取得即時匯率，請檢查網路連線或手動輸入。";

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("rate service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate service reported an error: {0}")]
    Remote(String),

    #[error("malformed rate payload: {0}")]
    Malformed(String),

    #[error("rate for {0} missing from payload")]
    MissingRate(String),

    #[error("computed rate {0} is not positive")]
    InvalidRate(f64),

    #[error("rate request timed out")]
    Timeout,

    #[error("invalid payload schema: {0}")]
    Schema(String),
}

impl RefreshError {
    /// What the user sees; the detailed error only goes to the log.
    pub fn user_message(&self) -> &'static str {
        FAILURE_MESSAGE
    }
}

/// Where fresh rates come from.
pub trait RateSource {
    fn fetch_quote(&self) -> impl Future<Output = Result<RateQuote, RefreshError>> + Send;
}

pub struct ExchangeRateClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    local_currency: String,
    foreign_currency: String,
}

impl ExchangeRateClient {
    pub fn from_settings(settings: &Settings) -> Self {
        ExchangeRateClient {
            client: reqwest::Client::new(),
            url: settings.rate_api_url.clone(),
            api_key: settings.rate_api_key.clone().filter(|k| !k.trim().is_empty()),
            local_currency: settings.local_currency.clone(),
            foreign_currency: settings.foreign_currency.clone(),
        }
    }
}

impl RateSource for ExchangeRateClient {
    async fn fetch_quote(&self) -> Result<RateQuote, RefreshError> {
        let mut request = self.client.get(&self.url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RefreshError::Timeout
            } else {
                RefreshError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Status { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        parse_rate_payload(&body, &self.local_currency, &self.foreign_currency, now_unix())
    }
}

fn payload_schema() -> Result<JSONSchema, RefreshError> {
    let schema = json!({
        "type": "object",
        "required": ["result"],
        "properties": {
            "result": {"type": "string"},
            "error-type": {"type": "string"},
            "rates": {
                "type": "object",
                "additionalProperties": {"type": "number"}
            },
            "time_next_update_unix": {"type": "integer"},
            "time_last_update_utc": {"type": "string"}
        }
    });

    JSONSchema::compile(&schema).map_err(|e| RefreshError::Schema(e.to_string()))
}

/// Turns a rates payload into a quote of `local` units per one `foreign` unit.
pub fn parse_rate_payload(
    body: &Value,
    local: &str,
    foreign: &str,
    now: i64,
) -> Result<RateQuote, RefreshError> {
    let schema = payload_schema()?;
    if !schema.is_valid(body) {
        return Err(RefreshError::Malformed("payload does not match schema".to_string()));
    }

    let result = body.get("result").and_then(Value::as_str).unwrap_or_default();
    if result != "success" {
        let reason = body
            .get("error-type")
            .and_then(Value::as_str)
            .unwrap_or("API error");
        return Err(RefreshError::Remote(reason.to_string()));
    }

    let rates = body
        .get("rates")
        .and_then(Value::as_object)
        .ok_or_else(|| RefreshError::Malformed("rates missing".to_string()))?;
    let local_rate = rates
        .get(local)
        .and_then(Value::as_f64)
        .ok_or_else(|| RefreshError::MissingRate(local.to_string()))?;
    let foreign_rate = rates
        .get(foreign)
        .and_then(Value::as_f64)
        .ok_or_else(|| RefreshError::MissingRate(foreign.to_string()))?;

    let rate = round_to(local_rate / foreign_rate, 4);
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RefreshError::InvalidRate(rate));
    }

    let next_update = body
        .get("time_next_update_unix")
        .and_then(Value::as_i64)
        .filter(|t| *t > 0)
        .unwrap_or(now + FALLBACK_REFRESH_SECS);
    let data_time = body
        .get("time_last_update_utc")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(RateQuote {
        rate,
        next_update,
        data_time,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
    Succeeded,
    Failed,
}

pub fn phase(document: &Document) -> RefreshPhase {
    if document.is_loading {
        RefreshPhase::Refreshing
    } else if document.api_error.is_some() {
        RefreshPhase::Failed
    } else if document.api_success.is_some() {
        RefreshPhase::Succeeded
    } else {
        RefreshPhase::Idle
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshStart {
    /// A refresh is already in flight; nothing is queued.
    AlreadyRunning,
    /// The stored rate is still valid; resolve locally without a request.
    RateLimited { commands: Vec<Command>, next_update: i64 },
    /// Go to the network, after applying `commands`.
    Fetch { commands: Vec<Command> },
}

pub fn begin(document: &Document, now: i64) -> RefreshStart {
    if document.is_loading {
        return RefreshStart::AlreadyRunning;
    }

    if now < document.time_next_update {
        let message = format!(
            "匯率資料仍有效，無需更新。下次更新時間：{}",
            format_local_time(document.time_next_update)
        );
        return RefreshStart::RateLimited {
            commands: vec![
                Command::SetLoading(true),
                Command::SetRefreshStatus {
                    error: None,
                    success: Some(message),
                },
            ],
            next_update: document.time_next_update,
        };
    }

    RefreshStart::Fetch {
        commands: vec![Command::SetLoading(true)],
    }
}

/// Commands that settle a fetch. Every branch ends with a status command,
/// which also clears the loading flag.
pub fn resolve(result: &Result<RateQuote, RefreshError>) -> Vec<Command> {
    match result {
        Ok(quote) => {
            let mut message = format!("匯率更新成功！新匯率：{}", quote.rate);
            if let Some(time) = &quote.data_time {
                message.push_str(&format!("（數據時間：{}）", format_local_datetime(time)));
            }
            vec![
                Command::SetExchangeRate {
                    rate: quote.rate,
                    next_update: quote.next_update,
                },
                Command::SetRefreshStatus {
                    error: None,
                    success: Some(message),
                },
            ]
        }
        Err(err) => vec![Command::SetRefreshStatus {
            error: Some(err.user_message().to_string()),
            success: None,
        }],
    }
}
