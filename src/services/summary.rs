//! Everything the statement renderer needs, computed from one snapshot.

use serde::Serialize;

use crate::models::{Document, StatementTotals};
use crate::services::totals;

const COMPANY_SUFFIXES: &[&str] = &["股份有限公司", "有限公司"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementSummary {
    pub document: Document,
    pub totals: StatementTotals,
    pub billing_period_label: String,
    pub domestic_line_amounts: Vec<f64>,
    pub imported_line_amounts: Vec<f64>,
    pub show_domestic_section: bool,
    pub show_imported_section: bool,
    pub downloadable: bool,
    pub file_name: String,
    pub printable_remarks: Vec<String>,
}

impl StatementSummary {
    pub fn build(document: &Document) -> Self {
        let totals = totals::compute(document);
        let billing_period_label = totals::billing_period(document);

        StatementSummary {
            domestic_line_amounts: document.domestic_items.iter().map(|i| i.line_amount()).collect(),
            imported_line_amounts: document
                .imported_items
                .iter()
                .map(|i| i.local_amount(document.exchange_rate))
                .collect(),
            show_domestic_section: document.show_domestic && totals.domestic_total > 0.0,
            show_imported_section: document.show_imported && totals.imported_total_local > 0.0,
            downloadable: totals.grand_total != 0.0,
            file_name: file_name(&document.customer_data.name, &billing_period_label),
            printable_remarks: printable_remarks(&document.remarks),
            billing_period_label,
            totals,
            document: document.clone(),
        }
    }
}

/// `大成紡織股份有限公司` in `2025 年 3 月` gives `大成紡織-2025年3月-對帳單.pdf`.
pub fn file_name(customer_name: &str, billing_period_label: &str) -> String {
    let short_name = COMPANY_SUFFIXES
        .iter()
        .fold(customer_name.to_string(), |name, suffix| name.replace(suffix, ""));
    let period: String = billing_period_label.chars().filter(|c| *c != ' ').collect();
    format!("{}-{}-對帳單.pdf", short_name, period)
}

/// Non-blank remarks, numbered from 1.
pub fn printable_remarks(remarks: &[String]) -> Vec<String> {
    remarks
        .iter()
        .filter(|r| !r.trim().is_empty())
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DomesticItem, ImportedItem};
    use crate::services::reducer::ReducerPolicy;
    use chrono::NaiveDate;

    fn doc() -> Document {
        ReducerPolicy::default().default_document(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap())
    }

    #[test]
    fn file_name_strips_company_suffix() {
        assert_eq!(
            file_name("大成紡織股份有限公司", "2025 年 3 月"),
            "大成紡織-2025年3月-對帳單.pdf"
        );
        assert_eq!(file_name("永信染整有限公司", "2025 年 12 月"), "永信染整-2025年12月-對帳單.pdf");
        assert_eq!(file_name("小林工業社", "2025 年 1 月"), "小林工業社-2025年1月-對帳單.pdf");
    }

    #[test]
    fn remarks_skip_blank_lines() {
        let remarks = vec!["first".to_string(), "  ".to_string(), "second".to_string()];
        assert_eq!(printable_remarks(&remarks), vec!["1. first", "2. second"]);
    }

    #[test]
    fn empty_statement_hides_sections_and_blocks_download() {
        let summary = StatementSummary::build(&doc());
        assert!(!summary.show_domestic_section);
        assert!(!summary.show_imported_section);
        assert!(!summary.downloadable);
    }

    #[test]
    fn sections_follow_totals_and_toggles() {
        let mut document = doc();
        document.domestic_items.push(DomesticItem {
            quantity: 10.0,
            price: 70.0,
            ..DomesticItem::new(document.statement_date)
        });
        document.imported_items.push(ImportedItem {
            is_shipping: true,
            price_jpy: 3900.0,
            ..ImportedItem::new(document.statement_date)
        });

        let summary = StatementSummary::build(&document);
        assert!(summary.show_domestic_section);
        assert!(summary.show_imported_section);
        assert!(summary.downloadable);
        assert_eq!(summary.domestic_line_amounts, vec![700.0]);
        assert_eq!(summary.imported_line_amounts, vec![811.0]);
        assert_eq!(summary.totals.grand_total, 735.0 + 811.0);
        assert_eq!(summary.billing_period_label, "2025 年 3 月");

        document.show_imported = false;
        let summary = StatementSummary::build(&document);
        assert!(!summary.show_imported_section);
        assert_eq!(summary.totals.grand_total, 735.0);
    }
}
