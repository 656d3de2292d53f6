use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber honouring `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// `YYYY-MM-DD HH:mm` in local time, as shown in status messages.
pub fn format_local_time(unix: i64) -> String {
    match Local.timestamp_opt(unix, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => unix.to_string(),
    }
}

pub fn format_local_datetime(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn billing_period_label(date: NaiveDate) -> String {
    format!("{} 年 {} 月", date.year(), date.month())
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Rounds to a whole amount and groups thousands, e.g. `1234567.6` as `1,234,568`.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
