//! Read-back checks of the bootstrapped state.
//!
//! Nothing here writes to the store.

use std::collections::BTreeSet;

use seedbed_db::bson::Document;
use seedbed_db::{AccountInfo, Database, DbError, DocumentStore, IndexSpec, RoleGrant};
use serde::Serialize;

use crate::modules::accounts::ACCOUNTS;
use crate::modules::fixtures::data::{self, ORDERS, PRODUCTS, TEST_COLLECTION, USERS};
use crate::modules::fixtures::models::cents;
use crate::modules::{PRIMARY_DB, TEST_DB};

/// Keyword expected to hit exactly one product through the text index.
pub const SEARCH_TERM: &str = "wireless";
const SEARCH_HIT: &str = "Wireless Headphones";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub checks: Vec<Check>,
}

impl Report {
    fn record(&mut self, name: &'static str, passed: bool, detail: impl Into<String>) {
        let detail = detail.into();
        if passed {
            tracing::info!(check = name, %detail, "check passed");
        } else {
            tracing::warn!(check = name, %detail, "check failed");
        }
        self.checks.push(Check {
            name,
            passed,
            detail,
        });
    }

    pub fn is_success(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|check| !check.passed)
    }
}

fn grants(accounts: &[AccountInfo]) -> BTreeSet<(String, String, String, String)> {
    accounts
        .iter()
        .flat_map(|account| {
            account.roles.iter().map(move |RoleGrant { role, db }| {
                (account.database.clone(), account.name.clone(), role.clone(), db.clone())
            })
        })
        .collect()
}

fn expected_grants() -> BTreeSet<(String, String, String, String)> {
    ACCOUNTS
        .iter()
        .map(|seed| {
            (
                seed.database.to_string(),
                seed.name.to_string(),
                seed.role.to_string(),
                seed.scope.to_string(),
            )
        })
        .collect()
}

async fn check_count(
    report: &mut Report,
    name: &'static str,
    db: &Database<'_>,
    collection: &str,
    expected: u64,
) -> anyhow::Result<()> {
    let count = db.count(collection).await?;
    report.record(
        name,
        count == expected,
        format!("{}.{} has {} documents, expected {}", db.name(), collection, count, expected),
    );
    Ok(())
}

/// Normalized specs ordered by collection then index name.
fn sorted_specs(specs: Vec<(&'static str, IndexSpec)>) -> Vec<(&'static str, IndexSpec)> {
    let mut specs: Vec<_> = specs
        .into_iter()
        .map(|(collection, spec)| (collection, spec.normalized()))
        .collect();
    specs.sort_by_key(|(collection, spec)| (*collection, spec.default_name()));
    specs
}

fn order_total_mismatches(orders: &[Document]) -> Vec<String> {
    let mut mismatches = Vec::new();
    for order in orders {
        let number = order.get_str("orderNumber").unwrap_or("<unnumbered>");
        let total = order.get_f64("totalAmount").map(cents);
        let items: Option<i64> = order.get_array("items").ok().and_then(|items| {
            items
                .iter()
                .map(|item| {
                    let item = item.as_document()?;
                    let price = cents(item.get_f64("price").ok()?);
                    let quantity = i64::from(item.get_i32("quantity").ok()?);
                    Some(price * quantity)
                })
                .sum::<Option<i64>>()
        });
        match (total, items) {
            (Ok(total), Some(items)) if total == items => {}
            (Ok(total), Some(items)) => {
                mismatches.push(format!("{number}: total {total} cents, items {items} cents"))
            }
            _ => mismatches.push(format!("{number}: malformed amounts")),
        }
    }
    mismatches
}

/// Run every non-mutating check against `store`.
pub async fn verify(store: &dyn DocumentStore) -> anyhow::Result<Report> {
    let mut report = Report::default();
    let myapp = Database::new(store, PRIMARY_DB);
    let testdb = myapp.sibling(TEST_DB);

    let mut accounts = myapp.accounts().await?;
    accounts.extend(testdb.accounts().await?);
    let found = grants(&accounts);
    report.record(
        "accounts",
        accounts.len() == ACCOUNTS.len() && found == expected_grants(),
        format!("{} accounts with grants {:?}", accounts.len(), found),
    );

    check_count(&mut report, "users", &myapp, USERS, 3).await?;
    let users = myapp.find(USERS, Document::new()).await?;
    let emails: BTreeSet<&str> = users
        .iter()
        .filter_map(|user| user.get_str("email").ok())
        .collect();
    report.record(
        "distinct emails",
        emails.len() == users.len(),
        format!("{} distinct emails across {} users", emails.len(), users.len()),
    );

    check_count(&mut report, "products", &myapp, PRODUCTS, 3).await?;
    let products = myapp.find(PRODUCTS, Document::new()).await?;
    let shapes: Vec<BTreeSet<String>> = products
        .iter()
        .map(|product| {
            product
                .get_document("specifications")
                .map(|spec| spec.keys().cloned().collect())
                .unwrap_or_default()
        })
        .collect();
    let distinct_shapes: BTreeSet<&BTreeSet<String>> = shapes.iter().collect();
    report.record(
        "specification shapes",
        shapes.iter().all(|shape| !shape.is_empty()) && distinct_shapes.len() == shapes.len(),
        format!("{} distinct shapes across {} products", distinct_shapes.len(), shapes.len()),
    );

    check_count(&mut report, "orders", &myapp, ORDERS, 2).await?;
    let mismatches = order_total_mismatches(&myapp.find(ORDERS, Document::new()).await?);
    report.record(
        "order totals",
        mismatches.is_empty(),
        if mismatches.is_empty() {
            "every total equals its line items".to_string()
        } else {
            mismatches.join("; ")
        },
    );

    check_count(&mut report, "test documents", &testdb, TEST_COLLECTION, 2).await?;

    let mut found_indexes = Vec::new();
    for collection in [USERS, PRODUCTS, ORDERS] {
        for index in myapp.list_indexes(collection).await? {
            if index.is_secondary() {
                found_indexes.push((collection, index.spec));
            }
        }
    }
    let found_indexes = sorted_specs(found_indexes);
    let expected_indexes = sorted_specs(data::indexes());
    report.record(
        "secondary indexes",
        found_indexes == expected_indexes,
        format!(
            "{} secondary indexes, expected {}",
            found_indexes.len(),
            expected_indexes.len()
        ),
    );

    match myapp.text_search(PRODUCTS, SEARCH_TERM).await {
        Ok(hits) => {
            let names: Vec<&str> = hits
                .iter()
                .filter_map(|product| product.get_str("name").ok())
                .collect();
            report.record(
                "text search",
                names == [SEARCH_HIT],
                format!("'{}' matched {:?}", SEARCH_TERM, names),
            );
        }
        Err(err @ DbError::TextIndexRequired { .. }) => {
            report.record("text search", false, err.to_string());
        }
        Err(err) => return Err(err.into()),
    }

    Ok(report)
}
