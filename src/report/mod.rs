//! Fixed analytical questions answered with SQL over the joined table.
//!
//! The joined rows and the duplicate-products artifact are loaded into an in-memory SQLite
//! database once; every query is read-only and independent of the others.

pub mod chart;

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{format_datetime, JoinedRow, Product};
use crate::error::Result;

/// Receipts scanned for one brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandReceiptCount {
    pub brand: String,
    pub receipt_count: i64,
}

/// Total sales for one brand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSales {
    pub brand: String,
    pub total_sales: f64,
}

/// Product rows without a barcode for one brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandMissingBarcodes {
    pub brand: String,
    pub missing_count: i64,
}

/// Answers to all four questions for one run
#[derive(Debug, Clone, Serialize)]
pub struct ReportResults {
    pub top_brands_by_receipts: Vec<BrandReceiptCount>,
    pub top_brands_by_sales: Vec<BrandSales>,
    pub leading_category_brand: Option<BrandSales>,
    pub missing_barcodes_by_brand: Vec<BrandMissingBarcodes>,
}

const SCHEMA: &str = r#"
CREATE TABLE merged_table (
    RECEIPT_ID          TEXT,
    PURCHASE_DATE       TEXT,
    SCAN_DATE           TEXT,
    STORE_NAME          TEXT,
    USER_ID             TEXT,
    BARCODE             TEXT,
    FINAL_QUANTITY      REAL,
    FINAL_SALE          REAL,
    CREATED_DATE        TEXT,
    BIRTH_DATE          TEXT,
    STATE               TEXT,
    LANGUAGE            TEXT,
    GENDER              TEXT,
    AGE                 INTEGER,
    ACCOUNT_AGE_MONTHS  INTEGER,
    CATEGORY_1          TEXT,
    CATEGORY_2          TEXT,
    CATEGORY_3          TEXT,
    CATEGORY_4          TEXT,
    MANUFACTURER        TEXT,
    BRAND               TEXT
);
CREATE TABLE duplicate_products (
    CATEGORY_1    TEXT,
    CATEGORY_2    TEXT,
    CATEGORY_3    TEXT,
    CATEGORY_4    TEXT,
    MANUFACTURER  TEXT,
    BRAND         TEXT,
    BARCODE       TEXT
);
"#;

/// Ties are broken by the brand's first appearance in the joined table (lowest rowid)
const TOP_BRANDS_BY_RECEIPTS: &str = r#"
SELECT BRAND
    ,COUNT(DISTINCT RECEIPT_ID) AS receipt_count
FROM merged_table
WHERE AGE >= ?1
    AND BRAND IS NOT NULL
GROUP BY BRAND
ORDER BY receipt_count DESC, MIN(rowid) ASC
LIMIT ?2
"#;

const TOP_BRANDS_BY_SALES: &str = r#"
SELECT BRAND
    ,SUM(FINAL_SALE) AS total_sales
FROM merged_table
WHERE ACCOUNT_AGE_MONTHS >= ?1
    AND BRAND IS NOT NULL
    AND FINAL_SALE IS NOT NULL
GROUP BY BRAND
ORDER BY total_sales DESC, MIN(rowid) ASC
LIMIT ?2
"#;

const LEADING_BRAND_IN_CATEGORY: &str = r#"
SELECT BRAND
    ,SUM(FINAL_SALE) AS total_sales
FROM merged_table
WHERE (
        CATEGORY_2 = ?1
        OR CATEGORY_3 = ?1
    )
    AND BRAND IS NOT NULL
    AND FINAL_SALE IS NOT NULL
GROUP BY BRAND
ORDER BY total_sales DESC, MIN(rowid) ASC
LIMIT 1
"#;

const MISSING_BARCODES_BY_BRAND: &str = r#"
SELECT BRAND
    ,SUM(CASE WHEN BARCODE IS NULL OR BARCODE IN ('', 'N/A', 'nan') THEN 1 ELSE 0 END) AS missing_count
FROM duplicate_products
WHERE BRAND IS NOT NULL
GROUP BY BRAND
HAVING missing_count > 0
ORDER BY missing_count DESC, BRAND ASC
LIMIT ?1
"#;

/// In-memory SQLite database holding the tables the report queries read
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Build the database from the joined table and the duplicate-products artifact
    #[instrument(skip_all, fields(joined = joined.len(), duplicates = duplicates.len()))]
    pub fn open(joined: &[JoinedRow], duplicates: &[Product]) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO merged_table VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            )?;
            for row in joined {
                insert.execute(params![
                    row.receipt_id,
                    row.purchase_date,
                    row.scan_date,
                    row.store_name,
                    row.user_id,
                    row.barcode,
                    row.quantity,
                    row.sale,
                    row.created_date.as_ref().map(format_datetime),
                    row.birth_date.as_ref().map(format_datetime),
                    row.state,
                    row.language,
                    row.gender,
                    row.age,
                    row.account_age_months,
                    row.category_1,
                    row.category_2,
                    row.category_3,
                    row.category_4,
                    row.manufacturer,
                    row.brand,
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO duplicate_products VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for product in duplicates {
                insert.execute(params![
                    product.category_1,
                    product.category_2,
                    product.category_3,
                    product.category_4,
                    product.manufacturer,
                    product.brand,
                    product.barcode,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Report store loaded");
        Ok(Self { conn })
    }

    /// Top brands by distinct receipts among users at least `min_age` years old
    pub fn top_brands_by_receipts(&self, min_age: i64, limit: usize) -> Result<Vec<BrandReceiptCount>> {
        let mut stmt = self.conn.prepare(TOP_BRANDS_BY_RECEIPTS)?;
        let rows = stmt
            .query_map(params![min_age, limit as i64], |row| {
                Ok(BrandReceiptCount {
                    brand: row.get(0)?,
                    receipt_count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Top brands by total sales among accounts at least `min_account_months` old
    pub fn top_brands_by_sales(&self, min_account_months: i64, limit: usize) -> Result<Vec<BrandSales>> {
        let mut stmt = self.conn.prepare(TOP_BRANDS_BY_SALES)?;
        let rows = stmt
            .query_map(params![min_account_months, limit as i64], |row| {
                Ok(BrandSales {
                    brand: row.get(0)?,
                    total_sales: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Brand with the highest total sales where category 2 or 3 is exactly `category`
    pub fn leading_brand_in_category(&self, category: &str) -> Result<Option<BrandSales>> {
        let mut stmt = self.conn.prepare(LEADING_BRAND_IN_CATEGORY)?;
        let mut rows = stmt.query(params![category])?;
        if let Some(row) = rows.next()? {
            Ok(Some(BrandSales {
                brand: row.get(0)?,
                total_sales: row.get(1)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Brands with the most duplicate-artifact rows lacking a barcode
    pub fn missing_barcodes_by_brand(&self, limit: usize) -> Result<Vec<BrandMissingBarcodes>> {
        let mut stmt = self.conn.prepare(MISSING_BARCODES_BY_BRAND)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(BrandMissingBarcodes {
                    brand: row.get(0)?,
                    missing_count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Run all four questions with the standard parameters
    pub fn run_all(&self) -> Result<ReportResults> {
        use crate::constants::{REPORT_CATEGORY, REPORT_MIN_ACCOUNT_MONTHS, REPORT_MIN_AGE, REPORT_TOP_N};

        let results = ReportResults {
            top_brands_by_receipts: self.top_brands_by_receipts(REPORT_MIN_AGE, REPORT_TOP_N)?,
            top_brands_by_sales: self.top_brands_by_sales(REPORT_MIN_ACCOUNT_MONTHS, REPORT_TOP_N)?,
            leading_category_brand: self.leading_brand_in_category(REPORT_CATEGORY)?,
            missing_barcodes_by_brand: self.missing_barcodes_by_brand(REPORT_TOP_N)?,
        };

        if results.leading_category_brand.is_none() {
            warn!("No sales found in category '{}'", REPORT_CATEGORY);
        }
        info!(
            "📊 Report ready: {} receipt brands, {} sales brands, {} barcode brands",
            results.top_brands_by_receipts.len(),
            results.top_brands_by_sales.len(),
            results.missing_barcodes_by_brand.len()
        );
        Ok(results)
    }
}

fn pad_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Render rows as a fixed-width text table
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(pad_line(headers, &widths));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(pad_line(&cells, &widths));
    }
    out.join("\n")
}

impl ReportResults {
    /// Console rendering of every answer
    pub fn render(&self) -> String {
        let receipts: Vec<Vec<String>> = self
            .top_brands_by_receipts
            .iter()
            .map(|r| vec![r.brand.clone(), r.receipt_count.to_string()])
            .collect();
        let sales: Vec<Vec<String>> = self
            .top_brands_by_sales
            .iter()
            .map(|r| vec![r.brand.clone(), format!("{:.2}", r.total_sales)])
            .collect();
        let leading: Vec<Vec<String>> = self
            .leading_category_brand
            .iter()
            .map(|r| vec![r.brand.clone(), format!("{:.2}", r.total_sales)])
            .collect();
        let missing: Vec<Vec<String>> = self
            .missing_barcodes_by_brand
            .iter()
            .map(|r| vec![r.brand.clone(), r.missing_count.to_string()])
            .collect();

        [
            "Top 5 brands by receipts scanned among users 21 and over:".to_string(),
            render_table(&["BRAND", "receipt_count"], &receipts),
            String::new(),
            "Top 5 brands by sales among accounts at least 6 months old:".to_string(),
            render_table(&["BRAND", "total_sales"], &sales),
            String::new(),
            format!("Leading brand in '{}':", crate::constants::REPORT_CATEGORY),
            render_table(&["BRAND", "total_sales"], &leading),
            String::new(),
            "Top 5 brands with the most missing barcodes:".to_string(),
            render_table(&["BRAND", "missing_count"], &missing),
        ]
        .join("\n")
    }
}
