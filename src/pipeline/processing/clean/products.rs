use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

use super::{canonical_barcode, drop_exact_duplicates, TableStats};
use crate::constants;
use crate::domain::{Product, Record};
use crate::pipeline::ingestion::RawProduct;

pub const RULE_EXACT_DUPLICATE: &str = "exact_duplicate";
pub const RULE_PLACEHOLDER_CATEGORY: &str = "placeholder_category";
pub const RULE_MISSING_BARCODE: &str = "missing_barcode";
pub const RULE_DUPLICATE_BARCODE: &str = "duplicate_barcode";

/// Output of product cleaning
#[derive(Debug, Clone)]
pub struct CleanedProducts {
    /// One row per barcode
    pub products: Vec<Product>,
    /// Rows whose barcode value (missing included) is shared with another row, captured
    /// before missing barcodes were dropped and duplicates collapsed
    pub duplicates: Vec<Product>,
    pub stats: TableStats,
}

/// Size of the barcode problem in the product catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarcodeIssueSummary {
    /// Distinct non-missing barcodes that appear on more than one product row
    pub duplicate_barcodes: usize,
    /// Product rows with no barcode at all
    pub missing_barcodes: usize,
}

impl CleanedProducts {
    pub fn barcode_summary(&self) -> BarcodeIssueSummary {
        let duplicate_barcodes = self
            .duplicates
            .iter()
            .filter_map(|p| p.barcode.as_deref())
            .collect::<HashSet<_>>()
            .len();
        let missing_barcodes = self.duplicates.iter().filter(|p| p.barcode.is_none()).count();
        BarcodeIssueSummary {
            duplicate_barcodes,
            missing_barcodes,
        }
    }
}

/// Rows whose barcode occurs more than once. Missing barcodes count as one shared value.
pub fn shared_barcode_rows(products: &[Product]) -> Vec<Product> {
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for product in products {
        *counts.entry(product.barcode.as_deref()).or_insert(0) += 1;
    }
    products
        .iter()
        .filter(|p| counts.get(&p.barcode.as_deref()).copied().unwrap_or(0) > 1)
        .cloned()
        .collect()
}

/// Keep one row per barcode: the one with the most non-missing fields, earliest on ties.
/// Rows must already have a barcode. Output keeps input order.
pub fn keep_most_complete(products: Vec<Product>) -> Vec<Product> {
    let mut best: HashMap<String, (usize, usize)> = HashMap::new();
    for (idx, product) in products.iter().enumerate() {
        let Some(barcode) = product.barcode.as_ref() else {
            continue;
        };
        let filled = product.non_missing_count();
        best.entry(barcode.clone())
            .and_modify(|(kept, kept_filled)| {
                if filled > *kept_filled {
                    *kept = idx;
                    *kept_filled = filled;
                }
            })
            .or_insert((idx, filled));
    }

    let keep: HashSet<usize> = best.into_values().map(|(idx, _)| idx).collect();
    products
        .into_iter()
        .enumerate()
        .filter_map(|(idx, p)| keep.contains(&idx).then_some(p))
        .collect()
}

#[instrument(skip(raw), fields(rows = raw.len()))]
pub fn clean_products(raw: Vec<RawProduct>) -> CleanedProducts {
    let mut stats = TableStats::new(constants::PRODUCTS_TABLE, raw.len());

    let before = raw.len();
    let rows = drop_exact_duplicates(raw);
    stats.record_drop(RULE_EXACT_DUPLICATE, before, rows.len());

    let before = rows.len();
    let rows: Vec<RawProduct> = rows
        .into_iter()
        .filter(|p| p.category_1.as_deref() != Some(constants::PLACEHOLDER_CATEGORY))
        .collect();
    stats.record_drop(RULE_PLACEHOLDER_CATEGORY, before, rows.len());

    let typed: Vec<Product> = rows
        .into_iter()
        .map(|row| Product {
            barcode: canonical_barcode(row.barcode.as_deref()),
            category_1: row.category_1,
            category_2: row.category_2,
            category_3: row.category_3,
            category_4: row.category_4,
            manufacturer: row.manufacturer,
            brand: row.brand,
        })
        .collect();

    let duplicates = shared_barcode_rows(&typed);

    let before = typed.len();
    let keyed: Vec<Product> = typed.into_iter().filter(|p| p.barcode.is_some()).collect();
    stats.record_drop(RULE_MISSING_BARCODE, before, keyed.len());

    let before = keyed.len();
    let products = keep_most_complete(keyed);
    stats.record_drop(RULE_DUPLICATE_BARCODE, before, products.len());

    stats.log_summary();
    let cleaned = CleanedProducts {
        products,
        duplicates,
        stats,
    };
    let summary = cleaned.barcode_summary();
    info!(
        "🔎 Barcode issues: {} missing, {} duplicated",
        summary.missing_barcodes, summary.duplicate_barcodes
    );
    cleaned
}

impl From<&Product> for RawProduct {
    fn from(product: &Product) -> Self {
        Self {
            category_1: product.category_1.clone(),
            category_2: product.category_2.clone(),
            category_3: product.category_3.clone(),
            category_4: product.category_4.clone(),
            manufacturer: product.manufacturer.clone(),
            brand: product.brand.clone(),
            barcode: product.barcode.clone(),
        }
    }
}
