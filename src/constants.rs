/// Table names used for logging, metrics labels and profiling output
pub const USERS_TABLE: &str = "users";
pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const PRODUCTS_TABLE: &str = "products";
pub const JOINED_TABLE: &str = "merged";

// Default input file names
pub const DEFAULT_USERS_FILE: &str = "USER_TAKEHOME.csv";
pub const DEFAULT_TRANSACTIONS_FILE: &str = "TRANSACTION_TAKEHOME.csv";
pub const DEFAULT_PRODUCTS_FILE: &str = "PRODUCTS_TAKEHOME.csv";

// Default output locations
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_CHART_FILE: &str = "barcode_issue_visualization.png";
pub const PROFILING_DIR: &str = "profiling";
pub const LOG_DIR: &str = "logs";

// Environment overrides
pub const ENV_DATA_DIR: &str = "RECEIPT_ANALYTICS_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "RECEIPT_ANALYTICS_OUTPUT_DIR";
pub const ENV_PROFILING: &str = "RECEIPT_ANALYTICS_PROFILING";

/// Birth dates before this day are treated as data-entry errors
pub const MIN_BIRTH_DATE: (i32, u32, u32) = (1925, 1, 1);
/// Users younger than this are not eligible for the app
pub const MIN_USER_AGE: i32 = 13;

/// Gender spellings that carry no information
pub const GENDER_MISSING_SYNONYMS: &[&str] = &[
    "prefer_not_to_say",
    "Prefer not to say",
    "unknown",
    "not_listed",
    "not_specified",
    "My gender isn't listed",
];
pub const GENDER_NON_BINARY_SYNONYMS: &[&str] = &["non_binary", "Non-Binary"];
pub const GENDER_NON_BINARY: &str = "non_binary";

/// Spelled-out quantity token seen in the transaction extract
pub const QUANTITY_ZERO_TOKEN: &str = "zero";
/// Quantity recorded without its decimal point
pub const QUANTITY_MISSING_DECIMAL: f64 = 276.0;
pub const QUANTITY_MISSING_DECIMAL_FIX: f64 = 2.76;

/// Category-1 value used for products that were never categorized
pub const PLACEHOLDER_CATEGORY: &str = "Needs Review";

/// Text values that mean "no barcode"
pub const MISSING_BARCODE_TOKENS: &[&str] = &["N/A", "nan", "NaN", "null", "NULL", "None"];

// Report parameters
pub const REPORT_MIN_AGE: i64 = 21;
pub const REPORT_MIN_ACCOUNT_MONTHS: i64 = 6;
pub const REPORT_CATEGORY: &str = "Dips & Salsa";
pub const REPORT_TOP_N: usize = 5;
