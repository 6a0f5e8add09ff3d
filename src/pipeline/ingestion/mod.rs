// Pipeline ingestion: reading the three CSV extracts into raw, all-text tables

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::config::DataConfig;
use crate::constants;
use crate::domain::Record;
use crate::error::{AnalysisError, Result};

/// A raw table row as it appears in its source file
pub trait RawRecord: Record + DeserializeOwned {
    /// Table name used in logs
    const TABLE: &'static str;

    /// Columns whose absence from the header makes the file unusable
    fn required_columns() -> &'static [&'static str] {
        Self::columns()
    }
}

/// Treat empty and whitespace-only cells as missing
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawUser {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawTransaction {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub receipt_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub purchase_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub scan_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub store_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub barcode: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub final_quantity: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub final_sale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawProduct {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_1: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_2: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_3: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_4: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub barcode: Option<String>,
}

impl Record for RawUser {
    fn columns() -> &'static [&'static str] {
        &["ID", "CREATED_DATE", "BIRTH_DATE", "STATE", "LANGUAGE", "GENDER"]
    }

    fn values(&self) -> Vec<Option<String>> {
        vec![
            self.id.clone(),
            self.created_date.clone(),
            self.birth_date.clone(),
            self.state.clone(),
            self.language.clone(),
            self.gender.clone(),
        ]
    }
}

impl RawRecord for RawUser {
    const TABLE: &'static str = constants::USERS_TABLE;

    fn required_columns() -> &'static [&'static str] {
        &["ID", "CREATED_DATE", "BIRTH_DATE", "GENDER"]
    }
}

impl Record for RawTransaction {
    fn columns() -> &'static [&'static str] {
        &[
            "RECEIPT_ID",
            "PURCHASE_DATE",
            "SCAN_DATE",
            "STORE_NAME",
            "USER_ID",
            "BARCODE",
            "FINAL_QUANTITY",
            "FINAL_SALE",
        ]
    }

    fn values(&self) -> Vec<Option<String>> {
        vec![
            self.receipt_id.clone(),
            self.purchase_date.clone(),
            self.scan_date.clone(),
            self.store_name.clone(),
            self.user_id.clone(),
            self.barcode.clone(),
            self.final_quantity.clone(),
            self.final_sale.clone(),
        ]
    }
}

impl RawRecord for RawTransaction {
    const TABLE: &'static str = constants::TRANSACTIONS_TABLE;

    fn required_columns() -> &'static [&'static str] {
        &["RECEIPT_ID", "USER_ID", "BARCODE", "FINAL_QUANTITY", "FINAL_SALE"]
    }
}

impl Record for RawProduct {
    fn columns() -> &'static [&'static str] {
        &[
            "CATEGORY_1",
            "CATEGORY_2",
            "CATEGORY_3",
            "CATEGORY_4",
            "MANUFACTURER",
            "BRAND",
            "BARCODE",
        ]
    }

    fn values(&self) -> Vec<Option<String>> {
        vec![
            self.category_1.clone(),
            self.category_2.clone(),
            self.category_3.clone(),
            self.category_4.clone(),
            self.manufacturer.clone(),
            self.brand.clone(),
            self.barcode.clone(),
        ]
    }
}

impl RawRecord for RawProduct {
    const TABLE: &'static str = constants::PRODUCTS_TABLE;
}

/// Read one CSV file into raw rows.
///
/// A missing file, a header without one of the required columns, or a row the CSV reader
/// cannot decode all abort the load.
#[instrument(skip_all, fields(table = R::TABLE, path = %path.display()))]
pub fn load_table<R: RawRecord>(path: &Path) -> Result<Vec<R>> {
    if !path.is_file() {
        return Err(AnalysisError::MissingInput(path.to_path_buf()));
    }

    let load_err = |source: csv::Error| AnalysisError::Load {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(load_err)?;

    let headers = reader.headers().map_err(load_err)?.clone();
    for column in R::required_columns() {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(AnalysisError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            });
        }
    }
    debug!("Header columns: {:?}", headers);

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<R>, csv::Error>>()
        .map_err(load_err)?;

    info!("📥 Loaded {} {} rows", rows.len(), R::TABLE);
    Ok(rows)
}

/// The three raw tables as loaded from disk
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub users: Vec<RawUser>,
    pub transactions: Vec<RawTransaction>,
    pub products: Vec<RawProduct>,
}

impl RawDataset {
    pub fn load(config: &DataConfig) -> Result<Self> {
        Ok(Self {
            users: load_table(&config.users_path())?,
            transactions: load_table(&config.transactions_path())?,
            products: load_table(&config.products_path())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_products_treats_blank_cells_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.csv");
        fs::write(
            &path,
            "CATEGORY_1,CATEGORY_2,CATEGORY_3,CATEGORY_4,MANUFACTURER,BRAND,BARCODE\n\
             Snacks,Chips,,  ,PEPSICO,TOSTITOS,028400070560\n",
        )
        .unwrap();

        let rows: Vec<RawProduct> = load_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_2.as_deref(), Some("Chips"));
        assert_eq!(rows[0].category_3, None);
        assert_eq!(rows[0].category_4, None);
        // Leading zeros survive because every cell is read as text
        assert_eq!(rows[0].barcode.as_deref(), Some("028400070560"));
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let result = load_table::<RawUser>(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(AnalysisError::MissingInput(_))));
    }

    #[test]
    fn test_load_rejects_missing_required_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(&path, "RECEIPT_ID,USER_ID,BARCODE,FINAL_QUANTITY\nr1,u1,1,1.00\n").unwrap();

        match load_table::<RawTransaction>(&path) {
            Err(AnalysisError::MissingColumn { column, .. }) => assert_eq!(column, "FINAL_SALE"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_load_optional_columns_may_be_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(
            &path,
            "ID,CREATED_DATE,BIRTH_DATE,GENDER\nu1,2020-01-01 00:00:00.000 Z,1990-05-01 00:00:00.000 Z,female\n",
        )
        .unwrap();

        let rows: Vec<RawUser> = load_table(&path).unwrap();
        assert_eq!(rows[0].state, None);
        assert_eq!(rows[0].gender.as_deref(), Some("female"));
    }

    #[test]
    fn test_load_ragged_row_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.csv");
        fs::write(
            &path,
            "CATEGORY_1,CATEGORY_2,CATEGORY_3,CATEGORY_4,MANUFACTURER,BRAND,BARCODE\nSnacks,Chips\n",
        )
        .unwrap();

        let result = load_table::<RawProduct>(&path);
        assert!(matches!(result, Err(AnalysisError::Load { .. })));
    }
}
