//! Fixed reference data: the customer roster and both product catalogs.
//!
//! Lookups are exact string matches over static lists, first match wins.

use serde::Serialize;

use crate::models::Customer;

/// Reserved value meaning "the user types the text themselves".
pub const MANUAL_ENTRY: &str = "自行輸入";
pub const DEFAULT_DOMESTIC_PRODUCT: &str = "酒石酸";
pub const SHIPPING_PREFIX: &str = "運費 >";
pub const SHIPPING_SEPARATOR: &str = " > ";
pub const SPECIAL_CATEGORY: &str = "特殊項目";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEntry {
    pub name: &'static str,
    pub address: &'static str,
    pub tax_id: &'static str,
    pub phone: &'static str,
}

impl CustomerEntry {
    pub fn to_customer(&self) -> Customer {
        Customer {
            name: self.name.to_string(),
            address: self.address.to_string(),
            tax_id: self.tax_id.to_string(),
            phone: self.phone.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomesticProduct {
    pub description: &'static str,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedService {
    pub category: &'static str,
    pub sub_category: Option<&'static str>,
    pub item: Option<&'static str>,
    pub examples: &'static [&'static str],
    pub description: Option<&'static str>,
    pub price_jpy: Option<f64>,
}

impl ImportedService {
    /// The text offered in the description picker for this entry.
    pub fn option_label(&self) -> Option<String> {
        if self.category == SPECIAL_CATEGORY {
            return self.description.map(str::to_string);
        }
        match (self.sub_category, self.item) {
            (Some(sub), Some(item)) => Some(format!("{}{}{}", sub, SHIPPING_SEPARATOR, item)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionGroup {
    pub category: &'static str,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGroup {
    pub category: &'static str,
    pub sub_categories: Vec<(&'static str, Vec<ImportedService>)>,
}

// The manual-entry customer must stay last: unknown names fall back to it.
static CUSTOMERS: &[CustomerEntry] = &[
    CustomerEntry {
        name: "大成紡織股份有限公司",
        address: "彰化縣和美鎮彰美路五段 120 號",
        tax_id: "24681357",
        phone: "04-7551234",
    },
    CustomerEntry {
        name: "永信染整有限公司",
        address: "桃園市大園區工業路 36 號",
        tax_id: "13572468",
        phone: "03-3861122",
    },
    CustomerEntry {
        name: "宏遠織造股份有限公司",
        address: "台南市永康區中正南路 88 號",
        tax_id: "80246135",
        phone: "06-2035566",
    },
    CustomerEntry {
        name: MANUAL_ENTRY,
        address: "",
        tax_id: "",
        phone: "",
    },
];

static DOMESTIC_PRODUCTS: &[DomesticProduct] = &[
    DomesticProduct { description: DEFAULT_DOMESTIC_PRODUCT, price: 70.0 },
    DomesticProduct { description: "檸檬酸", price: 62.0 },
    DomesticProduct { description: "冰醋酸", price: 55.0 },
    DomesticProduct { description: "均染劑", price: 95.0 },
    DomesticProduct { description: "柔軟劑", price: 120.0 },
    DomesticProduct { description: "消泡劑", price: 88.0 },
    DomesticProduct { description: MANUAL_ENTRY, price: 0.0 },
];

static IMPORTED_SERVICES: &[ImportedService] = &[
    ImportedService {
        category: "織機零件",
        sub_category: Some("綜框"),
        item: Some("綜框側板"),
        examples: &["TF-200", "TF-320"],
        description: None,
        price_jpy: None,
    },
    ImportedService {
        category: "織機零件",
        sub_category: Some("綜框"),
        item: Some("綜絲"),
        examples: &["H-330"],
        description: None,
        price_jpy: None,
    },
    ImportedService {
        category: "織機零件",
        sub_category: Some("鋼筘"),
        item: Some("鋼筘片"),
        examples: &[],
        description: None,
        price_jpy: None,
    },
    ImportedService {
        category: "電控零件",
        sub_category: Some("感測器"),
        item: Some("緯紗感測器"),
        examples: &["WS-11", "WS-12"],
        description: None,
        price_jpy: None,
    },
    ImportedService {
        category: "電控零件",
        sub_category: Some("電磁閥"),
        item: Some("主噴嘴電磁閥"),
        examples: &["SV-5"],
        description: None,
        price_jpy: None,
    },
    ImportedService {
        category: SPECIAL_CATEGORY,
        sub_category: None,
        item: None,
        examples: &[],
        description: Some(MANUAL_ENTRY),
        price_jpy: None,
    },
    ImportedService {
        category: SPECIAL_CATEGORY,
        sub_category: None,
        item: None,
        examples: &[],
        description: Some("運費 > 佐川急便"),
        price_jpy: None,
    },
    ImportedService {
        category: SPECIAL_CATEGORY,
        sub_category: None,
        item: None,
        examples: &[],
        description: Some("運費 > 日本郵便 EMS"),
        price_jpy: None,
    },
    ImportedService {
        category: SPECIAL_CATEGORY,
        sub_category: None,
        item: None,
        examples: &[],
        description: Some("運費 > FedEx"),
        price_jpy: None,
    },
];

pub fn customers() -> &'static [CustomerEntry] {
    CUSTOMERS
}

pub fn domestic_products() -> &'static [DomesticProduct] {
    DOMESTIC_PRODUCTS
}

pub fn imported_services() -> &'static [ImportedService] {
    IMPORTED_SERVICES
}

pub fn find_customer(name: &str) -> Option<&'static CustomerEntry> {
    CUSTOMERS.iter().find(|c| c.name == name)
}

/// Roster entry for `name`, or the manual-entry entry when the name is unknown.
pub fn customer_or_manual(name: &str) -> Option<&'static CustomerEntry> {
    find_customer(name).or_else(|| CUSTOMERS.last())
}

pub fn find_domestic_product(description: &str) -> Option<&'static DomesticProduct> {
    DOMESTIC_PRODUCTS.iter().find(|p| p.description == description)
}

pub fn is_manual_entry(description: &str) -> bool {
    description == MANUAL_ENTRY
}

pub fn is_shipping(description: &str) -> bool {
    description.starts_with(SHIPPING_PREFIX)
}

/// Carrier named after the separator of a shipping description, e.g.
/// `"運費 > 佐川急便"` gives `"佐川急便"`.
pub fn shipping_carrier(description: &str) -> Option<&str> {
    if !is_shipping(description) {
        return None;
    }
    description.split(SHIPPING_SEPARATOR).nth(1)
}

/// Picker options for imported items grouped by category, in catalog order.
pub fn imported_options() -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = Vec::new();
    for service in IMPORTED_SERVICES {
        let Some(label) = service.option_label() else {
            continue;
        };
        if label.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|g| g.category == service.category) {
            Some(group) => {
                if !group.options.contains(&label) {
                    group.options.push(label);
                }
            }
            None => groups.push(OptionGroup {
                category: service.category,
                options: vec![label],
            }),
        }
    }
    groups
}

/// Reference listing of the regular (non-special) imported parts.
pub fn service_reference() -> Vec<ReferenceGroup> {
    let mut groups: Vec<ReferenceGroup> = Vec::new();
    for service in IMPORTED_SERVICES {
        if service.category == SPECIAL_CATEGORY {
            continue;
        }
        let Some(sub) = service.sub_category else {
            continue;
        };
        let index = match groups.iter().position(|g| g.category == service.category) {
            Some(index) => index,
            None => {
                groups.push(ReferenceGroup {
                    category: service.category,
                    sub_categories: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let subs = &mut groups[index].sub_categories;
        match subs.iter_mut().find(|(name, _)| *name == sub) {
            Some((_, items)) => items.push(*service),
            None => subs.push((sub, vec![*service])),
        }
    }
    groups
}
