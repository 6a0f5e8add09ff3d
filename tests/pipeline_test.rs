use anyhow::Result;
use chrono::NaiveDate;
use receipt_analytics::config::AppConfig;
use receipt_analytics::pipeline::Pipeline;
use receipt_analytics::report::{BrandMissingBarcodes, BrandReceiptCount, BrandSales};
use receipt_analytics::AnalysisError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const USERS_CSV: &str = "\
ID,CREATED_DATE,BIRTH_DATE,STATE,LANGUAGE,GENDER
u1,2023-01-01 00:00:00.000 Z,1990-05-01 00:00:00.000 Z,CA,en,female
u2,2024-12-01 00:00:00.000 Z,2000-01-01 00:00:00.000 Z,NY,en,Non-Binary
u3,2022-01-01 00:00:00.000 Z,2015-01-01 00:00:00.000 Z,TX,en,male
u4,2022-01-01 00:00:00.000 Z,1900-01-01 00:00:00.000 Z,TX,en,male
u5,2020-01-01 00:00:00.000 Z,2005-06-01 00:00:00.000 Z,WA,es-419,Prefer not to say
";

const TRANSACTIONS_CSV: &str = "\
RECEIPT_ID,PURCHASE_DATE,SCAN_DATE,STORE_NAME,USER_ID,BARCODE,FINAL_QUANTITY,FINAL_SALE
r1,2024-08-01,2024-08-01 10:00:00.000 Z,WALMART,u1,111,1.00,3.00
r1,2024-08-01,2024-08-01 10:00:00.000 Z,WALMART,u1,111,1.00,
r2,2024-08-02,2024-08-02 10:00:00.000 Z,ALDI,u1,222,zero,2.00
r3,2024-08-03,2024-08-03 10:00:00.000 Z,TARGET,u2,111,2.00,5.00
r4,2024-08-04,2024-08-04 10:00:00.000 Z,WALMART,u5,333,1.00,10.00
r5,2024-08-05,2024-08-05 10:00:00.000 Z,KROGER,u1,333,276,1.00
r6,2024-08-06,2024-08-06 10:00:00.000 Z,KROGER,nobody,999,1.00,4.00
r3,2024-08-03,2024-08-03 10:00:00.000 Z,TARGET,u2,111,2.00,5.00
";

const PRODUCTS_CSV: &str = "\
CATEGORY_1,CATEGORY_2,CATEGORY_3,CATEGORY_4,MANUFACTURER,BRAND,BARCODE
Snacks,Chips,,,ACME,CHIPCO,111
Snacks,,,,ACME,CHIPCO,111
Snacks,Dips & Salsa,,,PEPSICO,TOSTITOS,222
Snacks,Dips,Dips & Salsa,,SALSA INC,SALSACO,333
Needs Review,,,,,IGNORED,444
Snacks,,,,,NOCODE,
Snacks,Chips,,,,NOCODE,N/A
Snacks,,,,,BRANDX,
";

fn write_fixtures(dir: &Path) -> Result<()> {
    fs::write(dir.join("USER_TAKEHOME.csv"), USERS_CSV)?;
    fs::write(dir.join("TRANSACTION_TAKEHOME.csv"), TRANSACTIONS_CSV)?;
    fs::write(dir.join("PRODUCTS_TAKEHOME.csv"), PRODUCTS_CSV)?;
    Ok(())
}

fn fixture_config(data_dir: &Path, output_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.data.dir = data_dir.to_path_buf();
    config.output.dir = output_dir.to_path_buf();
    config.run.reference_date = NaiveDate::from_ymd_opt(2025, 3, 6);
    config
}

fn receipts(brand: &str, receipt_count: i64) -> BrandReceiptCount {
    BrandReceiptCount {
        brand: brand.to_string(),
        receipt_count,
    }
}

fn sales(brand: &str, total_sales: f64) -> BrandSales {
    BrandSales {
        brand: brand.to_string(),
        total_sales,
    }
}

#[test]
fn test_full_run_over_fixture_files() -> Result<()> {
    let temp_dir = tempdir()?;
    let data_dir = temp_dir.path().join("data");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&data_dir)?;
    write_fixtures(&data_dir)?;

    let result = Pipeline::run(&fixture_config(&data_dir, &output_dir))?;

    // Cleaning accounting: users, transactions, products
    let rows_out: Vec<usize> = result.tables.iter().map(|t| t.rows_out).collect();
    assert_eq!(rows_out, vec![3, 6, 3]);
    assert_eq!(result.tables[1].dropped_by("exact_duplicate"), 1);
    assert_eq!(result.tables[1].dropped_by("duplicate_except_sale"), 1);

    // Unique right-hand keys, so one joined row per cleaned transaction
    assert_eq!(result.joined_rows, 6);

    assert_eq!(
        result.report.top_brands_by_receipts,
        vec![receipts("CHIPCO", 2), receipts("TOSTITOS", 1), receipts("SALSACO", 1)]
    );
    assert_eq!(
        result.report.top_brands_by_sales,
        vec![sales("SALSACO", 11.0), sales("CHIPCO", 3.0), sales("TOSTITOS", 2.0)]
    );
    assert_eq!(result.report.leading_category_brand, Some(sales("SALSACO", 11.0)));
    assert_eq!(
        result.report.missing_barcodes_by_brand,
        vec![
            BrandMissingBarcodes {
                brand: "NOCODE".to_string(),
                missing_count: 2,
            },
            BrandMissingBarcodes {
                brand: "BRANDX".to_string(),
                missing_count: 1,
            },
        ]
    );
    assert_eq!(result.barcode_issues.duplicate_barcodes, 1);
    assert_eq!(result.barcode_issues.missing_barcodes, 3);

    // The run summary is persisted next to the other outputs
    assert!(result.summary_file.starts_with(&output_dir));
    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&result.summary_file)?)?;
    assert_eq!(summary["run_id"], result.run_id.to_string());
    assert_eq!(summary["joined_rows"], 6);
    assert_eq!(summary["report"]["leading_category_brand"]["brand"], "SALSACO");

    // Profiling is off unless asked for
    assert!(result.profile_files.is_empty());
    assert!(!output_dir.join("profiling").exists());
    Ok(())
}

#[test]
fn test_run_with_profiling_writes_profiles() -> Result<()> {
    let temp_dir = tempdir()?;
    write_fixtures(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");

    let mut config = fixture_config(temp_dir.path(), &output_dir);
    config.run.profiling = true;
    let result = Pipeline::run(&config)?;

    let names: Vec<String> = result
        .profile_files
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "users_profile.json",
            "transactions_profile.json",
            "products_profile.json",
            "merged_profile.json",
        ]
    );
    for path in &result.profile_files {
        assert!(path.exists());
    }
    Ok(())
}

#[test]
fn test_clean_only_reports_stats() -> Result<()> {
    let temp_dir = tempdir()?;
    write_fixtures(temp_dir.path())?;

    let summary = Pipeline::clean_only(&fixture_config(temp_dir.path(), temp_dir.path()))?;

    let users = &summary.tables[0];
    assert_eq!(users.table, "users");
    assert_eq!(users.rows_in, 5);
    assert_eq!(users.rows_out, 3);
    assert_eq!(users.dropped_by("birth_date_before_1925"), 1);
    assert_eq!(users.dropped_by("under_age"), 1);

    let products = &summary.tables[2];
    assert_eq!(products.dropped_by("placeholder_category"), 1);
    assert_eq!(products.dropped_by("missing_barcode"), 3);
    assert_eq!(products.dropped_by("duplicate_barcode"), 1);
    Ok(())
}

#[test]
fn test_missing_input_file_is_fatal() -> Result<()> {
    let temp_dir = tempdir()?;
    write_fixtures(temp_dir.path())?;
    fs::remove_file(temp_dir.path().join("PRODUCTS_TAKEHOME.csv"))?;

    let err = Pipeline::run(&fixture_config(temp_dir.path(), &temp_dir.path().join("out")))
        .expect_err("a missing products file must abort the run");

    match err {
        AnalysisError::MissingInput(path) => assert!(path.ends_with("PRODUCTS_TAKEHOME.csv")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!temp_dir.path().join("out").exists());
    Ok(())
}
