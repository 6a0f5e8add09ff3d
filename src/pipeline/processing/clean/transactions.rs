use std::collections::HashMap;
use tracing::{debug, instrument};

use super::{canonical_barcode, drop_exact_duplicates, parse_number, TableStats};
use crate::constants;
use crate::domain::Transaction;
use crate::pipeline::ingestion::RawTransaction;

pub const RULE_EXACT_DUPLICATE: &str = "exact_duplicate";
pub const RULE_SALE_RECONCILED: &str = "duplicate_except_sale";

/// Quantity cell to number, fixing the two known data-entry anomalies
pub fn parse_quantity(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim();
    let value = if value == constants::QUANTITY_ZERO_TOKEN { "0" } else { value };
    parse_number(value).map(|q| {
        if q == constants::QUANTITY_MISSING_DECIMAL {
            constants::QUANTITY_MISSING_DECIMAL_FIX
        } else {
            q
        }
    })
}

/// Every column except the sale amount. Quantities are compared by bit pattern, which is
/// exact for the parsed values.
#[derive(PartialEq, Eq, Hash)]
struct SaleAgnosticKey<'a> {
    receipt_id: Option<&'a str>,
    purchase_date: Option<&'a str>,
    scan_date: Option<&'a str>,
    store_name: Option<&'a str>,
    user_id: Option<&'a str>,
    barcode: Option<&'a str>,
    quantity: Option<u64>,
}

impl<'a> SaleAgnosticKey<'a> {
    fn of(tx: &'a Transaction) -> Self {
        Self {
            receipt_id: tx.receipt_id.as_deref(),
            purchase_date: tx.purchase_date.as_deref(),
            scan_date: tx.scan_date.as_deref(),
            store_name: tx.store_name.as_deref(),
            user_id: tx.user_id.as_deref(),
            barcode: tx.barcode.as_deref(),
            quantity: tx.quantity.map(f64::to_bits),
        }
    }
}

/// Collapse rows that agree on everything but the sale amount.
///
/// Within each group the first row carrying a sale amount survives; a group with no sale
/// amount at all keeps its first row. Output keeps input order.
pub fn reconcile_missing_sales(rows: Vec<Transaction>) -> Vec<Transaction> {
    let mut chosen: HashMap<SaleAgnosticKey<'_>, usize> = HashMap::with_capacity(rows.len());
    for (idx, tx) in rows.iter().enumerate() {
        chosen
            .entry(SaleAgnosticKey::of(tx))
            .and_modify(|kept| {
                if rows[*kept].sale.is_none() && tx.sale.is_some() {
                    *kept = idx;
                }
            })
            .or_insert(idx);
    }

    let mut keep = vec![false; rows.len()];
    for idx in chosen.into_values() {
        keep[idx] = true;
    }

    rows.into_iter()
        .zip(keep)
        .filter_map(|(tx, keep)| keep.then_some(tx))
        .collect()
}

#[instrument(skip(raw), fields(rows = raw.len()))]
pub fn clean_transactions(raw: Vec<RawTransaction>) -> (Vec<Transaction>, TableStats) {
    let mut stats = TableStats::new(constants::TRANSACTIONS_TABLE, raw.len());

    let before = raw.len();
    let rows = drop_exact_duplicates(raw);
    stats.record_drop(RULE_EXACT_DUPLICATE, before, rows.len());

    let typed: Vec<Transaction> = rows
        .into_iter()
        .map(|row| Transaction {
            quantity: parse_quantity(row.final_quantity.as_deref()),
            sale: row.final_sale.as_deref().and_then(parse_number),
            barcode: canonical_barcode(row.barcode.as_deref()),
            receipt_id: row.receipt_id,
            purchase_date: row.purchase_date,
            scan_date: row.scan_date,
            store_name: row.store_name,
            user_id: row.user_id,
        })
        .collect();

    let unparsed_quantity = typed.iter().filter(|t| t.quantity.is_none()).count();
    if unparsed_quantity > 0 {
        debug!("{} transactions have no numeric quantity", unparsed_quantity);
    }

    let before = typed.len();
    let transactions = reconcile_missing_sales(typed);
    stats.record_drop(RULE_SALE_RECONCILED, before, transactions.len());

    stats.log_summary();
    (transactions, stats)
}

impl From<&Transaction> for RawTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            receipt_id: tx.receipt_id.clone(),
            purchase_date: tx.purchase_date.clone(),
            scan_date: tx.scan_date.clone(),
            store_name: tx.store_name.clone(),
            user_id: tx.user_id.clone(),
            barcode: tx.barcode.clone(),
            final_quantity: tx.quantity.map(|q| q.to_string()),
            final_sale: tx.sale.map(|s| s.to_string()),
        }
    }
}
