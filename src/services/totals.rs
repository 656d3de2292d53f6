//! Totals derived from a document snapshot. Nothing here is cached; callers
//! recompute after every change.

use crate::models::{Document, StatementTotals};
use crate::utils::billing_period_label;

pub const TAX_RATE: f64 = 0.05;

pub fn domestic_subtotal(document: &Document) -> f64 {
    if !document.show_domestic {
        return 0.0;
    }
    document.domestic_items.iter().map(|item| item.line_amount()).sum()
}

/// Tax is rounded once on the aggregate, never per line.
pub fn tax(domestic_subtotal: f64) -> f64 {
    (domestic_subtotal * TAX_RATE).round()
}

pub fn imported_total_foreign(document: &Document) -> f64 {
    if !document.show_imported {
        return 0.0;
    }
    document.imported_items.iter().map(|item| item.foreign_amount()).sum()
}

/// Each line is converted and rounded on its own before summing, so the
/// total always equals the sum of the printed line amounts.
pub fn imported_total_local(document: &Document) -> f64 {
    if !document.show_imported {
        return 0.0;
    }
    document
        .imported_items
        .iter()
        .map(|item| item.local_amount(document.exchange_rate))
        .sum()
}

pub fn compute(document: &Document) -> StatementTotals {
    let domestic_subtotal = domestic_subtotal(document);
    let tax = tax(domestic_subtotal);
    let domestic_total = domestic_subtotal + tax;
    let imported_total_local = imported_total_local(document);

    StatementTotals {
        domestic_subtotal,
        tax,
        domestic_total,
        imported_total_foreign: imported_total_foreign(document),
        imported_total_local,
        grand_total: domestic_total + imported_total_local,
    }
}

pub fn billing_period(document: &Document) -> String {
    billing_period_label(document.statement_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DomesticItem, ImportedItem};
    use crate::services::reducer::ReducerPolicy;
    use chrono::NaiveDate;

    fn doc() -> Document {
        ReducerPolicy::default().default_document(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
    }

    fn domestic(quantity: f64, price: f64) -> DomesticItem {
        DomesticItem {
            quantity,
            price,
            ..Default::default()
        }
    }

    fn imported(quantity: u32, price_jpy: f64, is_shipping: bool) -> ImportedItem {
        ImportedItem {
            quantity,
            price_jpy,
            is_shipping,
            ..Default::default()
        }
    }

    #[test]
    fn domestic_scenario() {
        let mut document = doc();
        document.domestic_items.push(domestic(10.0, 70.0));
        let totals = compute(&document);
        assert_eq!(totals.domestic_subtotal, 700.0);
        assert_eq!(totals.tax, 35.0);
        assert_eq!(totals.domestic_total, 735.0);
        assert_eq!(totals.grand_total, 735.0);
    }

    #[test]
    fn imported_scenarios() {
        let mut document = doc();
        document.imported_items.push(imported(50, 3000.0, false));
        let totals = compute(&document);
        assert_eq!(totals.imported_total_foreign, 150_000.0);
        assert_eq!(totals.imported_total_local, 31_200.0);

        let mut document = doc();
        document.imported_items.push(imported(7, 3900.0, true));
        let totals = compute(&document);
        assert_eq!(totals.imported_total_foreign, 3900.0);
        assert_eq!(totals.imported_total_local, 811.0);
    }

    #[test]
    fn imported_lines_round_before_summing() {
        let mut document = doc();
        document.exchange_rate = 0.25;
        // Each line converts to 0.5 and rounds up to 1; rounding the sum would give 2.
        for _ in 0..4 {
            document.imported_items.push(imported(1, 2.0, false));
        }
        assert_eq!(imported_total_local(&document), 4.0);
        let unrounded: f64 = document
            .imported_items
            .iter()
            .map(|i| i.foreign_amount() * document.exchange_rate)
            .sum();
        assert_eq!(unrounded.round(), 2.0);
    }

    #[test]
    fn tax_rounds_the_aggregate() {
        let mut document = doc();
        // Rounding per line would give 3 (0.5 -> 1 each); the aggregate 1.5 rounds to 2.
        for _ in 0..3 {
            document.domestic_items.push(domestic(1.0, 10.0));
        }
        let totals = compute(&document);
        assert_eq!(totals.domestic_subtotal, 30.0);
        assert_eq!(totals.tax, 2.0);
        assert_eq!(totals.domestic_total, totals.domestic_subtotal + totals.tax);
    }

    #[test]
    fn subtotal_keeps_fractional_lines() {
        let mut document = doc();
        document.domestic_items.push(domestic(1.5, 33.0));
        assert_eq!(domestic_subtotal(&document), 49.5);
        assert_eq!(compute(&document).tax, 2.0);
    }

    #[test]
    fn hidden_categories_contribute_nothing() {
        let mut document = doc();
        document.domestic_items.push(domestic(10.0, 70.0));
        document.imported_items.push(imported(50, 3000.0, false));
        document.show_domestic = false;
        document.show_imported = false;
        let totals = compute(&document);
        assert_eq!(totals.domestic_total, 0.0);
        assert_eq!(totals.imported_total_foreign, 0.0);
        assert_eq!(totals.imported_total_local, 0.0);
        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn grand_total_combines_categories() {
        let mut document = doc();
        document.domestic_items.push(domestic(10.0, 70.0));
        document.imported_items.push(imported(50, 3000.0, false));
        document.imported_items.push(imported(1, 3900.0, true));
        assert_eq!(compute(&document).grand_total, 735.0 + 31_200.0 + 811.0);
    }

    #[test]
    fn billing_period_follows_statement_date() {
        assert_eq!(billing_period(&doc()), "2025 年 10 月");
    }
}
