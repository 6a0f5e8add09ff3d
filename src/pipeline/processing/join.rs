use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::domain::{JoinedRow, Product, Transaction, User};

/// Index right-hand rows by key. Rows without a key can never match and are left out.
fn index_by<'a, T>(rows: &'a [T], key: impl Fn(&T) -> Option<&str>) -> HashMap<&'a str, Vec<&'a T>> {
    let mut index: HashMap<&'a str, Vec<&'a T>> = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(k) = key(row) {
            index.entry(k).or_default().push(row);
        }
    }
    index
}

/// Matches for a left-join probe: every right-hand row with the key, or a single `None`
/// when there is none
fn probe<'a, T>(index: &HashMap<&str, Vec<&'a T>>, key: Option<&str>) -> Vec<Option<&'a T>> {
    match key.and_then(|k| index.get(k)) {
        Some(matches) => matches.iter().map(|m| Some(*m)).collect(),
        None => vec![None],
    }
}

fn joined_row(tx: &Transaction, user: Option<&User>, product: Option<&Product>) -> JoinedRow {
    JoinedRow {
        receipt_id: tx.receipt_id.clone(),
        purchase_date: tx.purchase_date.clone(),
        scan_date: tx.scan_date.clone(),
        store_name: tx.store_name.clone(),
        user_id: tx.user_id.clone(),
        barcode: tx.barcode.clone(),
        quantity: tx.quantity,
        sale: tx.sale,
        created_date: user.and_then(|u| u.created_date),
        birth_date: user.map(|u| u.birth_date),
        state: user.and_then(|u| u.state.clone()),
        language: user.and_then(|u| u.language.clone()),
        gender: user.and_then(|u| u.gender.clone()),
        age: user.map(|u| u.age),
        account_age_months: user.and_then(|u| u.account_age_months),
        category_1: product.and_then(|p| p.category_1.clone()),
        category_2: product.and_then(|p| p.category_2.clone()),
        category_3: product.and_then(|p| p.category_3.clone()),
        category_4: product.and_then(|p| p.category_4.clone()),
        manufacturer: product.and_then(|p| p.manufacturer.clone()),
        brand: product.and_then(|p| p.brand.clone()),
    }
}

/// Left-join transactions to users on user id, then to products on barcode.
///
/// Every transaction appears at least once. A key with several right-hand rows yields one
/// output row per match, so with unique keys the output has exactly one row per
/// transaction. Missing keys never match.
#[instrument(skip_all, fields(transactions = transactions.len()))]
pub fn join(transactions: &[Transaction], users: &[User], products: &[Product]) -> Vec<JoinedRow> {
    let users_by_id = index_by(users, |u| u.id.as_deref());
    let products_by_barcode = index_by(products, |p| p.barcode.as_deref());

    let fanout_users = users_by_id.values().filter(|v| v.len() > 1).count();
    if fanout_users > 0 {
        warn!("{} user ids map to more than one user row", fanout_users);
    }

    let mut joined = Vec::with_capacity(transactions.len());
    let mut matched_users = 0usize;
    let mut matched_products = 0usize;

    for tx in transactions {
        for user in probe(&users_by_id, tx.user_id.as_deref()) {
            for product in probe(&products_by_barcode, tx.barcode.as_deref()) {
                matched_users += usize::from(user.is_some());
                matched_products += usize::from(product.is_some());
                joined.push(joined_row(tx, user, product));
            }
        }
    }

    info!(
        "🔗 Joined {} rows ({} with a user, {} with a product)",
        joined.len(),
        matched_users,
        matched_products
    );
    joined
}
