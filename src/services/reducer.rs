//! The statement reducer: every change to a [`Document`] goes through [`apply`].
//!
//! `apply` never mutates its input. Commands that point at an item index that
//! no longer exists leave the document as it was.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog;
use crate::models::{Document, RemarkDefault, Settings};
use crate::utils::today;

pub const BOILERPLATE_REMARKS: &[&str] = &[
    "請於收到對帳單後核對明細，如有疑問請於七日內來電洽詢。",
    "匯款帳戶資訊請參閱隨附之付款通知。",
];

/// Choices the statement history disagreed on, kept configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerPolicy {
    pub preserve_date_on_clear: bool,
    pub remark_default: RemarkDefault,
}

impl Default for ReducerPolicy {
    fn default() -> Self {
        ReducerPolicy {
            preserve_date_on_clear: true,
            remark_default: RemarkDefault::Empty,
        }
    }
}

impl From<&Settings> for ReducerPolicy {
    fn from(settings: &Settings) -> Self {
        ReducerPolicy {
            preserve_date_on_clear: settings.preserve_date_on_clear,
            remark_default: settings.remark_default,
        }
    }
}

impl ReducerPolicy {
    pub fn default_remarks(&self) -> Vec<String> {
        match self.remark_default {
            RemarkDefault::Empty => Vec::new(),
            RemarkDefault::Blank => vec![String::new()],
            RemarkDefault::Boilerplate => BOILERPLATE_REMARKS.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn default_document(&self, statement_date: NaiveDate) -> Document {
        Document::new(statement_date, self.default_remarks())
    }
}

/// Scalar document fields that may be replaced without side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldUpdate {
    ExchangeRate(f64),
    StatementDate(NaiveDate),
    ShowDomestic(bool),
    ShowImported(bool),
    ShowModal(bool),
    Remarks(Vec<String>),
    IsLoading(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerField {
    Name,
    Address,
    TaxId,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum DomesticItemUpdate {
    Date(NaiveDate),
    Description(String),
    Quantity(f64),
    Price(f64),
    IsCustom(bool),
    CustomDesc(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ImportedItemUpdate {
    Date(NaiveDate),
    Description(String),
    Quantity(u32),
    #[serde(rename = "priceJPY")]
    PriceJpy(f64),
    IsCustom(bool),
    IsShipping(bool),
    CustomDesc(String),
    Model(String),
    ShippingCarrier(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    SetField(FieldUpdate),
    SelectCustomer(String),
    EditCustomerField { field: CustomerField, value: String },
    AddDomesticItem { date: NaiveDate },
    AddImportedItem { date: NaiveDate },
    UpdateDomesticItem { index: usize, update: DomesticItemUpdate },
    UpdateImportedItem { index: usize, update: ImportedItemUpdate },
    ChangeDomesticDescription { index: usize, description: String },
    ChangeImportedDescription { index: usize, description: String },
    RemoveDomesticItem(usize),
    RemoveImportedItem(usize),
    SetExchangeRate { rate: f64, next_update: i64 },
    SetLoading(bool),
    SetRefreshStatus {
        error: Option<String>,
        success: Option<String>,
    },
    ClearStatus,
    ClearDocument { today: NaiveDate },
    AddRemark,
    UpdateRemark { index: usize, text: String },
    RemoveRemark(usize),
    /// Any tag this build does not know about.
    #[serde(other)]
    Unknown,
}

/// Wire tags of every command this build understands.
const COMMAND_TAGS: &[&str] = &[
    "SET_FIELD",
    "SELECT_CUSTOMER",
    "EDIT_CUSTOMER_FIELD",
    "ADD_DOMESTIC_ITEM",
    "ADD_IMPORTED_ITEM",
    "UPDATE_DOMESTIC_ITEM",
    "UPDATE_IMPORTED_ITEM",
    "CHANGE_DOMESTIC_DESCRIPTION",
    "CHANGE_IMPORTED_DESCRIPTION",
    "REMOVE_DOMESTIC_ITEM",
    "REMOVE_IMPORTED_ITEM",
    "SET_EXCHANGE_RATE",
    "SET_LOADING",
    "SET_REFRESH_STATUS",
    "CLEAR_STATUS",
    "CLEAR_DOCUMENT",
    "ADD_REMARK",
    "UPDATE_REMARK",
    "REMOVE_REMARK",
];

impl Command {
    /// Reads a command as the webview sends it. A tag outside
    /// [`COMMAND_TAGS`] becomes [`Command::Unknown`] whatever its payload;
    /// a known tag with a bad payload is still an error.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        if let Some(tag) = value.get("type").and_then(Value::as_str) {
            if !COMMAND_TAGS.contains(&tag) {
                debug!(tag, "Unknown statement command tag");
                return Ok(Command::Unknown);
            }
        }
        serde_json::from_value(value)
    }

    pub fn add_domestic_item() -> Self {
        Command::AddDomesticItem { date: today() }
    }

    pub fn add_imported_item() -> Self {
        Command::AddImportedItem { date: today() }
    }

    pub fn clear_document() -> Self {
        Command::ClearDocument { today: today() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SetField(_) => "SET_FIELD",
            Command::SelectCustomer(_) => "SELECT_CUSTOMER",
            Command::EditCustomerField { .. } => "EDIT_CUSTOMER_FIELD",
            Command::AddDomesticItem { .. } => "ADD_DOMESTIC_ITEM",
            Command::AddImportedItem { .. } => "ADD_IMPORTED_ITEM",
            Command::UpdateDomesticItem { .. } => "UPDATE_DOMESTIC_ITEM",
            Command::UpdateImportedItem { .. } => "UPDATE_IMPORTED_ITEM",
            Command::ChangeDomesticDescription { .. } => "CHANGE_DOMESTIC_DESCRIPTION",
            Command::ChangeImportedDescription { .. } => "CHANGE_IMPORTED_DESCRIPTION",
            Command::RemoveDomesticItem(_) => "REMOVE_DOMESTIC_ITEM",
            Command::RemoveImportedItem(_) => "REMOVE_IMPORTED_ITEM",
            Command::SetExchangeRate { .. } => "SET_EXCHANGE_RATE",
            Command::SetLoading(_) => "SET_LOADING",
            Command::SetRefreshStatus { .. } => "SET_REFRESH_STATUS",
            Command::ClearStatus => "CLEAR_STATUS",
            Command::ClearDocument { .. } => "CLEAR_DOCUMENT",
            Command::AddRemark => "ADD_REMARK",
            Command::UpdateRemark { .. } => "UPDATE_REMARK",
            Command::RemoveRemark(_) => "REMOVE_REMARK",
            Command::Unknown => "UNKNOWN",
        }
    }
}

pub fn apply(document: &Document, command: Command, policy: &ReducerPolicy) -> Document {
    let mut next = document.clone();

    match command {
        Command::SetField(update) => set_field(&mut next, update),

        Command::SelectCustomer(name) => {
            if let Some(entry) = catalog::customer_or_manual(&name) {
                next.selected_customer_name = entry.name.to_string();
                next.customer_data = entry.to_customer();
            }
        }

        Command::EditCustomerField { field, value } => {
            let customer = &mut next.customer_data;
            match field {
                CustomerField::Name => customer.name = value,
                CustomerField::Address => customer.address = value,
                CustomerField::TaxId => customer.tax_id = value,
                CustomerField::Phone => customer.phone = value,
            }
        }

        Command::AddDomesticItem { date } => {
            next.domestic_items.push(crate::models::DomesticItem::new(date));
        }

        Command::AddImportedItem { date } => {
            next.imported_items.push(crate::models::ImportedItem::new(date));
        }

        Command::UpdateDomesticItem { index, update } => {
            if let Some(item) = next.domestic_items.get_mut(index) {
                match update {
                    DomesticItemUpdate::Date(v) => item.date = v,
                    DomesticItemUpdate::Description(v) => item.description = v,
                    DomesticItemUpdate::Quantity(v) => item.quantity = v,
                    DomesticItemUpdate::Price(v) => item.price = v,
                    DomesticItemUpdate::IsCustom(v) => item.is_custom = v,
                    DomesticItemUpdate::CustomDesc(v) => item.custom_desc = v,
                }
            }
        }

        Command::UpdateImportedItem { index, update } => {
            if let Some(item) = next.imported_items.get_mut(index) {
                match update {
                    ImportedItemUpdate::Date(v) => item.date = v,
                    ImportedItemUpdate::Description(v) => item.description = v,
                    ImportedItemUpdate::Quantity(v) => item.quantity = v,
                    ImportedItemUpdate::PriceJpy(v) => item.price_jpy = v,
                    ImportedItemUpdate::IsCustom(v) => item.is_custom = v,
                    ImportedItemUpdate::IsShipping(v) => item.is_shipping = v,
                    ImportedItemUpdate::CustomDesc(v) => item.custom_desc = v,
                    ImportedItemUpdate::Model(v) => item.model = v,
                    ImportedItemUpdate::ShippingCarrier(v) => item.shipping_carrier = v,
                }
            }
        }

        Command::ChangeDomesticDescription { index, description } => {
            if let Some(item) = next.domestic_items.get_mut(index) {
                let is_custom = catalog::is_manual_entry(&description);
                if !is_custom {
                    if let Some(product) = catalog::find_domestic_product(&description) {
                        item.price = product.price;
                    }
                }
                item.is_custom = is_custom;
                item.description = description;
            }
        }

        Command::ChangeImportedDescription { index, description } => {
            if let Some(item) = next.imported_items.get_mut(index) {
                item.is_shipping = catalog::is_shipping(&description);
                item.is_custom = catalog::is_manual_entry(&description);
                item.shipping_carrier = catalog::shipping_carrier(&description)
                    .unwrap_or_default()
                    .to_string();
                item.description = description;
            }
        }

        Command::RemoveDomesticItem(index) => {
            if index < next.domestic_items.len() {
                next.domestic_items.remove(index);
            }
        }

        Command::RemoveImportedItem(index) => {
            if index < next.imported_items.len() {
                next.imported_items.remove(index);
            }
        }

        Command::SetExchangeRate { rate, next_update } => {
            next.exchange_rate = rate;
            next.time_next_update = next_update;
        }

        Command::SetLoading(loading) => {
            next.is_loading = loading;
            if loading {
                next.api_error = None;
                next.api_success = None;
            }
        }

        Command::SetRefreshStatus { error, success } => {
            next.is_loading = false;
            next.api_error = error.filter(|e| !e.is_empty());
            next.api_success = if next.api_error.is_some() {
                None
            } else {
                success.filter(|s| !s.is_empty())
            };
        }

        Command::ClearStatus => {
            next.api_error = None;
            next.api_success = None;
        }

        Command::ClearDocument { today } => {
            let date = if policy.preserve_date_on_clear {
                document.statement_date
            } else {
                today
            };
            next = policy.default_document(date);
        }

        Command::AddRemark => next.remarks.push(String::new()),

        Command::UpdateRemark { index, text } => {
            if let Some(remark) = next.remarks.get_mut(index) {
                *remark = text;
            }
        }

        Command::RemoveRemark(index) => {
            if index < next.remarks.len() {
                next.remarks.remove(index);
            }
        }

        Command::Unknown => {
            debug!("Ignoring unknown statement command");
        }
    }

    next
}

fn set_field(document: &mut Document, update: FieldUpdate) {
    match update {
        FieldUpdate::ExchangeRate(v) => document.exchange_rate = v,
        FieldUpdate::StatementDate(v) => document.statement_date = v,
        FieldUpdate::ShowDomestic(v) => document.show_domestic = v,
        FieldUpdate::ShowImported(v) => document.show_imported = v,
        FieldUpdate::ShowModal(v) => document.show_modal = v,
        FieldUpdate::Remarks(v) => document.remarks = v,
        FieldUpdate::IsLoading(v) => document.is_loading = v,
    }
}
