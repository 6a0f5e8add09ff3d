use chrono::NaiveDateTime;
use tracing::instrument;

use super::{drop_exact_duplicates, elapsed_months, elapsed_years, min_birth_date, parse_datetime, TableStats};
use crate::constants;
use crate::domain::{format_datetime, User};
use crate::pipeline::ingestion::RawUser;

pub const RULE_EXACT_DUPLICATE: &str = "exact_duplicate";
pub const RULE_BIRTH_DATE_MISSING: &str = "birth_date_missing";
pub const RULE_BIRTH_DATE_TOO_EARLY: &str = "birth_date_before_1925";
pub const RULE_UNDER_AGE: &str = "under_age";

/// Map gender spellings onto the controlled set.
///
/// Non-answers become missing, the two non-binary spellings collapse to one value and
/// everything else passes through unchanged. Applying it twice is the same as once.
pub fn normalize_gender(gender: Option<&str>) -> Option<String> {
    let value = gender?;
    if constants::GENDER_MISSING_SYNONYMS.contains(&value) {
        None
    } else if constants::GENDER_NON_BINARY_SYNONYMS.contains(&value) {
        Some(constants::GENDER_NON_BINARY.to_string())
    } else {
        Some(value.to_string())
    }
}

/// Clean the users table against a fixed reference instant.
///
/// Rows without a usable birth date cannot satisfy the age rule and are dropped with it.
#[instrument(skip(raw), fields(rows = raw.len()))]
pub fn clean_users(raw: Vec<RawUser>, reference: NaiveDateTime) -> (Vec<User>, TableStats) {
    let mut stats = TableStats::new(constants::USERS_TABLE, raw.len());

    let before = raw.len();
    let rows = drop_exact_duplicates(raw);
    stats.record_drop(RULE_EXACT_DUPLICATE, before, rows.len());

    let parsed: Vec<(RawUser, Option<NaiveDateTime>)> = rows
        .into_iter()
        .map(|row| {
            let birth = row.birth_date.as_deref().and_then(parse_datetime);
            (row, birth)
        })
        .collect();

    let before = parsed.len();
    let parsed: Vec<(RawUser, NaiveDateTime)> = parsed
        .into_iter()
        .filter_map(|(row, birth)| birth.map(|b| (row, b)))
        .collect();
    stats.record_drop(RULE_BIRTH_DATE_MISSING, before, parsed.len());

    let floor = min_birth_date();
    let before = parsed.len();
    let parsed: Vec<(RawUser, NaiveDateTime)> =
        parsed.into_iter().filter(|(_, birth)| *birth >= floor).collect();
    stats.record_drop(RULE_BIRTH_DATE_TOO_EARLY, before, parsed.len());

    let before = parsed.len();
    let users: Vec<User> = parsed
        .into_iter()
        .map(|(row, birth_date)| {
            let created_date = row.created_date.as_deref().and_then(parse_datetime);
            User {
                gender: normalize_gender(row.gender.as_deref()),
                age: elapsed_years(birth_date, reference),
                account_age_months: created_date.map(|c| elapsed_months(c, reference)),
                id: row.id,
                created_date,
                birth_date,
                state: row.state,
                language: row.language,
            }
        })
        .filter(|user| user.age >= constants::MIN_USER_AGE)
        .collect();
    stats.record_drop(RULE_UNDER_AGE, before, users.len());

    stats.log_summary();
    (users, stats)
}

impl From<&User> for RawUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            created_date: user.created_date.as_ref().map(format_datetime),
            birth_date: Some(format_datetime(&user.birth_date)),
            state: user.state.clone(),
            language: user.language.clone(),
            gender: user.gender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn raw(id: &str, birth: Option<&str>, created: Option<&str>, gender: Option<&str>) -> RawUser {
        RawUser {
            id: Some(id.to_string()),
            created_date: created.map(str::to_string),
            birth_date: birth.map(str::to_string),
            state: Some("WI".to_string()),
            language: Some("en".to_string()),
            gender: gender.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_gender() {
        assert_eq!(normalize_gender(Some("Prefer not to say")), None);
        assert_eq!(normalize_gender(Some("My gender isn't listed")), None);
        assert_eq!(normalize_gender(Some("Non-Binary")).as_deref(), Some("non_binary"));
        assert_eq!(normalize_gender(Some("female")).as_deref(), Some("female"));
        assert_eq!(normalize_gender(None), None);
        // Synonym lists are case-sensitive
        assert_eq!(normalize_gender(Some("UNKNOWN")).as_deref(), Some("UNKNOWN"));
    }

    #[test]
    fn test_normalize_gender_is_idempotent() {
        for value in ["Prefer not to say", "Non-Binary", "non_binary", "female", "unknown", "male"] {
            let once = normalize_gender(Some(value));
            let twice = normalize_gender(once.as_deref());
            assert_eq!(once, twice, "not idempotent for {value}");
        }
    }

    #[test]
    fn test_clean_users_applies_every_rule() {
        let rows = vec![
            raw("a", Some("1990-05-01 00:00:00.000 Z"), Some("2023-09-06 12:00:00.000 Z"), Some("Non-Binary")),
            raw("a", Some("1990-05-01 00:00:00.000 Z"), Some("2023-09-06 12:00:00.000 Z"), Some("Non-Binary")),
            raw("b", Some("1900-01-01 00:00:00.000 Z"), None, Some("female")),
            raw("c", Some("2015-01-01 00:00:00.000 Z"), None, Some("male")),
            raw("d", None, None, Some("male")),
            raw("e", Some("garbage"), None, Some("unknown")),
            raw("f", Some("1925-01-01 00:00:00.000 Z"), Some("not a date"), Some("unknown")),
        ];

        let (users, stats) = clean_users(rows, reference());

        let ids: Vec<_> = users.iter().map(|u| u.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "f"]);
        assert_eq!(stats.dropped_by(RULE_EXACT_DUPLICATE), 1);
        assert_eq!(stats.dropped_by(RULE_BIRTH_DATE_MISSING), 2);
        assert_eq!(stats.dropped_by(RULE_BIRTH_DATE_TOO_EARLY), 1);
        assert_eq!(stats.dropped_by(RULE_UNDER_AGE), 1);
        assert_eq!(stats.rows_out, 2);

        let a = &users[0];
        assert_eq!(a.gender.as_deref(), Some("non_binary"));
        assert_eq!(a.age, 34);
        assert_eq!(a.account_age_months, Some(18));

        let f = &users[1];
        assert_eq!(f.gender, None);
        assert_eq!(f.account_age_months, None);
        assert_eq!(f.age, 100);
    }

    #[test]
    fn test_cleaned_users_hold_invariants() {
        let rows = vec![
            raw("a", Some("2012-03-06 12:00:00.000 Z"), None, None),
            raw("b", Some("2012-03-07 00:00:00.000 Z"), None, None),
            raw("c", Some("1924-12-31 23:59:59.000 Z"), None, None),
        ];
        let (users, _) = clean_users(rows, reference());

        assert_eq!(users.len(), 1);
        for user in &users {
            assert!(user.birth_date >= min_birth_date());
            assert!(user.age >= constants::MIN_USER_AGE);
        }
    }

    #[test]
    fn test_clean_users_is_idempotent() {
        let rows = vec![
            raw("a", Some("1990-05-01 00:00:00.000 Z"), Some("2021-01-15 08:30:00.000 Z"), Some("prefer_not_to_say")),
            raw("b", Some("1985-11-30 00:00:00.000 Z"), None, Some("Non-Binary")),
        ];
        let (first, _) = clean_users(rows, reference());
        let again: Vec<RawUser> = first.iter().map(RawUser::from).collect();
        let (second, stats) = clean_users(again, reference());

        assert_eq!(first, second);
        assert_eq!(stats.rows_in, stats.rows_out);
    }
}
