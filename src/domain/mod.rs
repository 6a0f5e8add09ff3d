use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column access shared by raw and cleaned tables, used for completeness counts and
/// profiling.
pub trait Record {
    /// Column names in file order
    fn columns() -> &'static [&'static str];

    /// Cell values in the same order as [`Record::columns`]; `None` is a missing value
    fn values(&self) -> Vec<Option<String>>;

    fn non_missing_count(&self) -> usize {
        self.values().iter().filter(|v| v.is_some()).count()
    }
}

/// A cleaned user with its derived ages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub created_date: Option<NaiveDateTime>,
    pub birth_date: NaiveDateTime,
    pub state: Option<String>,
    pub language: Option<String>,
    pub gender: Option<String>,
    /// Whole calendar years between birth and the reference instant
    pub age: i32,
    /// Whole months between account creation and the reference instant
    pub account_age_months: Option<i32>,
}

/// A cleaned transaction line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub receipt_id: Option<String>,
    pub purchase_date: Option<String>,
    pub scan_date: Option<String>,
    pub store_name: Option<String>,
    pub user_id: Option<String>,
    pub barcode: Option<String>,
    pub quantity: Option<f64>,
    pub sale: Option<f64>,
}

/// A product row. In the cleaned products table `barcode` is always present and unique;
/// rows of the duplicate-products artifact may lack it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    pub category_1: Option<String>,
    pub category_2: Option<String>,
    pub category_3: Option<String>,
    pub category_4: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<String>,
}

/// One row of the denormalized transaction/user/product table.
///
/// The user `ID` and product `BARCODE` columns are not repeated; they equal
/// `user_id` and `barcode` whenever the join matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub receipt_id: Option<String>,
    pub purchase_date: Option<String>,
    pub scan_date: Option<String>,
    pub store_name: Option<String>,
    pub user_id: Option<String>,
    pub barcode: Option<String>,
    pub quantity: Option<f64>,
    pub sale: Option<f64>,
    pub created_date: Option<NaiveDateTime>,
    pub birth_date: Option<NaiveDateTime>,
    pub state: Option<String>,
    pub language: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub account_age_months: Option<i32>,
    pub category_1: Option<String>,
    pub category_2: Option<String>,
    pub category_3: Option<String>,
    pub category_4: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
}

/// Timestamp layout used when dates are written back out
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f Z";

pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

impl Record for Product {
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

impl Record for JoinedRow {
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
            "CREATED_DATE",
            "BIRTH_DATE",
            "STATE",
            "LANGUAGE",
            "GENDER",
            "AGE",
            "ACCOUNT_AGE_MONTHS",
            "CATEGORY_1",
            "CATEGORY_2",
            "CATEGORY_3",
            "CATEGORY_4",
            "MANUFACTURER",
            "BRAND",
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
            self.quantity.map(|q| q.to_string()),
            self.sale.map(|s| s.to_string()),
            self.created_date.as_ref().map(format_datetime),
            self.birth_date.as_ref().map(format_datetime),
            self.state.clone(),
            self.language.clone(),
            self.gender.clone(),
            self.age.map(|a| a.to_string()),
            self.account_age_months.map(|m| m.to_string()),
            self.category_1.clone(),
            self.category_2.clone(),
            self.category_3.clone(),
            self.category_4.clone(),
            self.manufacturer.clone(),
            self.brand.clone(),
        ]
    }
}
