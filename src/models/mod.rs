use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog;

pub const DEFAULT_EXCHANGE_RATE: f64 = 0.208;
pub const DEFAULT_STORAGE_KEY: &str = "statementState";
pub const DEFAULT_RATE_API_URL: &str = "https://open.er-api.com/v6/latest/USD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub phone: String,
}

/// A line in the domestic (locally taxed) category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomesticItem {
    pub date: NaiveDate,
    pub description: String,
    pub quantity: f64,
    pub price: f64,
    pub is_custom: bool,
    pub custom_desc: String,
}

impl DomesticItem {
    pub fn new(date: NaiveDate) -> Self {
        DomesticItem {
            date,
            description: catalog::DEFAULT_DOMESTIC_PRODUCT.to_string(),
            quantity: 1.0,
            price: 0.0,
            is_custom: false,
            custom_desc: String::new(),
        }
    }

    pub fn line_amount(&self) -> f64 {
        self.quantity * self.price
    }

    pub fn label(&self) -> &str {
        if self.is_custom {
            &self.custom_desc
        } else {
            &self.description
        }
    }
}

/// A line in the imported category, priced in the foreign currency.
///
/// Shipping lines are flat charges: `quantity` is ignored and
/// `shipping_carrier` replaces `model`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportedItem {
    pub date: NaiveDate,
    pub description: String,
    pub quantity: u32,
    #[serde(rename = "priceJPY")]
    pub price_jpy: f64,
    pub is_custom: bool,
    pub is_shipping: bool,
    pub custom_desc: String,
    pub model: String,
    pub shipping_carrier: String,
}

impl ImportedItem {
    pub fn new(date: NaiveDate) -> Self {
        ImportedItem {
            date,
            quantity: 1,
            ..Default::default()
        }
    }

    pub fn foreign_amount(&self) -> f64 {
        if self.is_shipping {
            self.price_jpy
        } else {
            f64::from(self.quantity) * self.price_jpy
        }
    }

    pub fn local_amount(&self, exchange_rate: f64) -> f64 {
        (self.foreign_amount() * exchange_rate).round()
    }

    pub fn label(&self) -> &str {
        if self.is_custom {
            &self.custom_desc
        } else {
            &self.description
        }
    }
}

/// The complete editable state of one billing statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub exchange_rate: f64,
    pub statement_date: NaiveDate,
    pub show_domestic: bool,
    pub show_imported: bool,
    pub show_modal: bool,
    pub selected_customer_name: String,
    pub customer_data: Customer,
    pub domestic_items: Vec<DomesticItem>,
    pub imported_items: Vec<ImportedItem>,
    pub time_next_update: i64,
    pub is_loading: bool,
    pub remarks: Vec<String>,
    pub api_error: Option<String>,
    pub api_success: Option<String>,
}

impl Document {
    pub fn new(statement_date: NaiveDate, remarks: Vec<String>) -> Self {
        let customer = catalog::customers()
            .first()
            .map(catalog::CustomerEntry::to_customer)
            .unwrap_or_default();
        Document {
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            statement_date,
            show_domestic: true,
            show_imported: true,
            show_modal: false,
            selected_customer_name: customer.name.clone(),
            customer_data: customer,
            domestic_items: Vec::new(),
            imported_items: Vec::new(),
            time_next_update: 0,
            is_loading: false,
            remarks,
            api_error: None,
            api_success: None,
        }
    }

    pub fn is_manual_customer(&self) -> bool {
        self.selected_customer_name == catalog::MANUAL_ENTRY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementTotals {
    pub domestic_subtotal: f64,
    pub tax: f64,
    pub domestic_total: f64,
    pub imported_total_foreign: f64,
    pub imported_total_local: f64,
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub rate: f64,
    pub next_update: i64,
    pub data_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemarkDefault {
    #[default]
    Empty,
    Blank,
    Boilerplate,
}

impl RemarkDefault {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "empty" => Some(RemarkDefault::Empty),
            "blank" => Some(RemarkDefault::Blank),
            "boilerplate" => Some(RemarkDefault::Boilerplate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemarkDefault::Empty => "empty",
            RemarkDefault::Blank => "blank",
            RemarkDefault::Boilerplate => "boilerplate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub storage_key: String,
    pub rate_api_url: String,
    pub rate_api_key: Option<String>,
    pub local_currency: String,
    pub foreign_currency: String,
    pub request_timeout_secs: u64,
    pub status_display_secs: u64,
    pub preserve_date_on_clear: bool,
    pub remark_default: RemarkDefault,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            rate_api_url: DEFAULT_RATE_API_URL.to_string(),
            rate_api_key: option_env!("EXCHANGE_RATE_API_KEY").map(str::to_string),
            local_currency: "TWD".to_string(),
            foreign_currency: "JPY".to_string(),
            request_timeout_secs: 15,
            status_display_secs: 3,
            preserve_date_on_clear: true,
            remark_default: RemarkDefault::Empty,
        }
    }
}
