//! Best-effort load/save of the statement document.
//!
//! Neither direction ever fails toward the caller: problems are logged and
//! the supplied default (on load) or the previous snapshot (on save) wins.

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::Database;
use crate::models::Document;
use crate::utils::sha256_hex;

/// Durable key-value storage holding one serialized snapshot per key.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn digest(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, payload: &str, digest: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl KeyValueStore for Database {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_document(key)?.map(|stored| stored.payload))
    }

    fn digest(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_document_digest(key)?)
    }

    fn write(&self, key: &str, payload: &str, digest: &str) -> Result<()> {
        Ok(self.put_document(key, payload, digest)?)
    }

    fn remove(&self, key: &str) -> Result<()> {
        Ok(self.remove_document(key)?)
    }
}

pub fn load<S: KeyValueStore + ?Sized>(store: &S, key: &str, default: Document) -> Document {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored statement, starting from defaults");
            return default;
        }
        Err(err) => {
            warn!(key, error = %err, "Failed to read stored statement");
            return default;
        }
    };

    match merge_over_default(&raw, &default) {
        Ok(document) => document,
        Err(err) => {
            warn!(key, error = %err, "Stored statement is unreadable, using defaults");
            default
        }
    }
}

/// Writes a full snapshot. Returns whether anything was written; a snapshot
/// identical to the stored one is skipped.
pub fn save<S: KeyValueStore + ?Sized>(store: &S, key: &str, document: &Document) -> bool {
    let payload = match serde_json::to_string(document) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(key, error = %err, "Failed to serialize statement");
            return false;
        }
    };
    let digest = sha256_hex(payload.as_bytes());

    match store.digest(key) {
        Ok(Some(existing)) if existing == digest => return false,
        Ok(_) => {}
        Err(err) => warn!(key, error = %err, "Failed to read stored digest"),
    }

    match store.write(key, &payload, &digest) {
        Ok(()) => true,
        Err(err) => {
            warn!(key, error = %err, "Failed to save statement");
            false
        }
    }
}

pub fn remove<S: KeyValueStore + ?Sized>(store: &S, key: &str) {
    if let Err(err) = store.remove(key) {
        warn!(key, error = %err, "Failed to remove stored statement");
    }
}

/// Top-level keys of the stored snapshot replace those of the default;
/// keys the default does not know and explicit nulls are dropped.
fn merge_over_default(raw: &str, default: &Document) -> Result<Document> {
    let stored: Value = serde_json::from_str(raw)?;
    let Value::Object(stored) = stored else {
        return Err(anyhow!("Stored statement is not an object"));
    };

    let mut merged = serde_json::to_value(default)?;
    let fields = merged
        .as_object_mut()
        .ok_or_else(|| anyhow!("Default statement is not an object"))?;
    for (key, value) in stored {
        if value.is_null() || !fields.contains_key(&key) {
            continue;
        }
        fields.insert(key, value);
    }

    Ok(serde_json::from_value(merged)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DomesticItem, ImportedItem};
    use crate::services::reducer::ReducerPolicy;
    use chrono::NaiveDate;

    const KEY: &str = "statementState";

    fn default_doc() -> Document {
        ReducerPolicy::default().default_document(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
    }

    #[test]
    fn snapshot_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let mut doc = default_doc();
        doc.exchange_rate = 0.2113;
        doc.time_next_update = 1_750_000_000;
        doc.show_imported = false;
        doc.remarks = vec!["第一點".to_string(), String::new()];
        doc.api_success = Some("ok".to_string());
        doc.domestic_items.push(DomesticItem {
            quantity: 2.5,
            price: 70.0,
            ..DomesticItem::new(doc.statement_date)
        });
        doc.imported_items.push(ImportedItem {
            description: "運費 > FedEx".to_string(),
            is_shipping: true,
            shipping_carrier: "FedEx".to_string(),
            price_jpy: 3900.0,
            ..ImportedItem::new(doc.statement_date)
        });

        assert!(save(&db, KEY, &doc));
        let loaded = load(&db, KEY, default_doc());
        assert_eq!(loaded, doc);
    }

    #[test]
    fn full_precision_numbers_survive_a_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut doc = default_doc();
        doc.exchange_rate = 0.1 + 0.2;
        doc.domestic_items.push(DomesticItem {
            quantity: 1.0 / 3.0,
            price: 985.6906946328695,
            ..DomesticItem::new(doc.statement_date)
        });
        doc.imported_items.push(ImportedItem {
            price_jpy: 2f64.sqrt() * 1234.5,
            ..ImportedItem::new(doc.statement_date)
        });

        assert!(save(&db, KEY, &doc));
        let loaded = load(&db, KEY, default_doc());
        assert_eq!(loaded.exchange_rate.to_bits(), doc.exchange_rate.to_bits());
        assert_eq!(loaded.domestic_items[0].quantity.to_bits(), (1.0f64 / 3.0).to_bits());
        assert_eq!(loaded.domestic_items[0].price.to_bits(), 985.6906946328695f64.to_bits());
        assert_eq!(
            loaded.imported_items[0].price_jpy.to_bits(),
            doc.imported_items[0].price_jpy.to_bits()
        );
        assert_eq!(loaded, doc);
    }

    #[test]
    fn missing_snapshot_yields_default() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(load(&db, KEY, default_doc()), default_doc());
    }

    #[test]
    fn malformed_snapshot_yields_default() {
        let db = Database::open_in_memory().unwrap();
        db.put_document(KEY, "{not json", "x").unwrap();
        assert_eq!(load(&db, KEY, default_doc()), default_doc());

        db.put_document(KEY, "[1, 2, 3]", "y").unwrap();
        assert_eq!(load(&db, KEY, default_doc()), default_doc());

        db.put_document(KEY, r#"{"exchangeRate":"abc"}"#, "z").unwrap();
        assert_eq!(load(&db, KEY, default_doc()), default_doc());
    }

    #[test]
    fn old_snapshots_take_defaults_for_new_fields() {
        let db = Database::open_in_memory().unwrap();
        let raw = r#"{
            "exchangeRate": 0.2,
            "statementDate": "2024-12-31",
            "domesticItems": [{"date": "2024-12-01", "description": "酒石酸", "quantity": 3, "price": 70}],
            "importedItems": [{"description": "綜框 > 綜絲", "quantity": 2, "priceJPY": 1500}],
            "legacyFlag": true,
            "apiError": null
        }"#;
        db.put_document(KEY, raw, "legacy").unwrap();

        let loaded = load(&db, KEY, default_doc());
        let defaults = default_doc();
        assert_eq!(loaded.exchange_rate, 0.2);
        assert_eq!(loaded.statement_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(loaded.customer_data, defaults.customer_data);
        assert_eq!(loaded.remarks, defaults.remarks);
        assert!(loaded.show_domestic);
        assert_eq!(loaded.domestic_items[0].quantity, 3.0);
        assert!(!loaded.domestic_items[0].is_custom);
        assert_eq!(loaded.imported_items[0].price_jpy, 1500.0);
        assert!(loaded.imported_items[0].model.is_empty());
    }

    #[test]
    fn identical_snapshot_is_not_rewritten() {
        let db = Database::open_in_memory().unwrap();
        let doc = default_doc();
        assert!(save(&db, KEY, &doc));
        assert!(!save(&db, KEY, &doc));

        let mut changed = doc.clone();
        changed.show_modal = true;
        assert!(save(&db, KEY, &changed));
    }

    #[test]
    fn remove_forgets_snapshot() {
        let db = Database::open_in_memory().unwrap();
        save(&db, KEY, &default_doc());
        remove(&db, KEY);
        assert!(db.get_document(KEY).unwrap().is_none());
    }
}
