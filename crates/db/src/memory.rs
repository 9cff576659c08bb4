//! In-process [`DocumentStore`] used by tests and dry runs.
//!
//! Mirrors the server behaviour the bootstrap relies on: account names are
//! unique per database, every collection has an implicit unique `_id_` index,
//! unique secondary indexes reject duplicate keys both at build time and on
//! later inserts, and `$text` search needs a text index. Batches insert in
//! order: documents ahead of a duplicate key stay written.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::error::{DbError, DbResult};
use crate::model::{Account, AccountInfo, IndexInfo, IndexKind, IndexSpec};
use crate::store::DocumentStore;

struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexInfo>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            documents: Vec::new(),
            indexes: vec![IndexInfo {
                name: "_id_".to_string(),
                spec: IndexSpec::ascending("_id").unique(),
            }],
        }
    }

    fn unique_indexes(&self) -> impl Iterator<Item = &IndexInfo> {
        self.indexes.iter().filter(|index| index.spec.unique)
    }
}

#[derive(Default)]
struct State {
    accounts: Vec<(String, Account)>,
    collections: HashMap<(String, String), CollectionState>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_pings: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose first `count` pings fail, as a server still starting up.
    pub fn with_failing_pings(count: u32) -> Self {
        Self {
            state: Mutex::default(),
            failing_pings: AtomicU32::new(count),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve a dotted path such as `profile.city`.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

/// Missing fields index as null, as they do on the server.
fn index_key(document: &Document, spec: &IndexSpec) -> Vec<Bson> {
    spec.keys
        .iter()
        .map(|(field, _)| lookup(document, field).cloned().unwrap_or(Bson::Null))
        .collect()
}

fn first_duplicate<'a>(
    documents: impl Iterator<Item = &'a Document>,
    spec: &IndexSpec,
) -> Option<Vec<Bson>> {
    let mut seen: Vec<Vec<Bson>> = Vec::new();
    for document in documents {
        let key = index_key(document, spec);
        if seen.contains(&key) {
            return Some(key);
        }
        seen.push(key);
    }
    None
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn text_values(value: &Bson, out: &mut Vec<String>) {
    match value {
        Bson::String(text) => out.extend(tokens(text)),
        Bson::Array(items) => items.iter().for_each(|item| text_values(item, out)),
        _ => {}
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        let remaining = self.failing_pings.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_pings.store(remaining - 1, Ordering::SeqCst);
            return Err(DbError::Unavailable {
                attempts: 1,
                message: "memory store not ready".to_string(),
            });
        }
        Ok(())
    }

    async fn create_account(&self, database: &str, account: &Account) -> DbResult<()> {
        let mut state = self.lock();
        let exists = state
            .accounts
            .iter()
            .any(|(db, existing)| db == database && existing.name == account.name);
        if exists {
            return Err(DbError::AccountExists {
                database: database.to_string(),
                name: account.name.clone(),
            });
        }
        state.accounts.push((database.to_string(), account.clone()));
        Ok(())
    }

    async fn accounts(&self, database: &str) -> DbResult<Vec<AccountInfo>> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .filter(|(db, _)| db == database)
            .map(|(db, account)| AccountInfo {
                name: account.name.clone(),
                database: db.clone(),
                roles: account.roles.clone(),
            })
            .collect())
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DbResult<Vec<Bson>> {
        let mut batch = Vec::with_capacity(documents.len());
        for document in documents {
            if document.contains_key("_id") {
                batch.push(document);
            } else {
                let mut with_id = Document::new();
                with_id.insert("_id", ObjectId::new());
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                batch.push(with_id);
            }
        }

        let mut state = self.lock();
        let target = state
            .collections
            .entry((database.to_string(), collection.to_string()))
            .or_insert_with(CollectionState::new);

        let mut ids = Vec::with_capacity(batch.len());
        for document in batch {
            let violation = target.unique_indexes().find_map(|index| {
                let key = index_key(&document, &index.spec);
                target
                    .documents
                    .iter()
                    .any(|existing| index_key(existing, &index.spec) == key)
                    .then(|| format!("index {} dup key {:?}", index.name, key))
            });
            if let Some(message) = violation {
                return Err(DbError::duplicate_key(database, collection, message));
            }
            ids.push(document.get("_id").cloned().unwrap_or(Bson::Null));
            target.documents.push(document);
        }
        Ok(ids)
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> DbResult<String> {
        if spec.keys.is_empty() {
            return Err(DbError::InvalidIndex("index has no keys".to_string()));
        }
        let name = spec.default_name();
        let spec = spec.normalized();

        let mut state = self.lock();
        let target = state
            .collections
            .entry((database.to_string(), collection.to_string()))
            .or_insert_with(CollectionState::new);

        if let Some(existing) = target.indexes.iter().find(|index| index.name == name) {
            if existing.spec == spec {
                return Ok(name);
            }
            return Err(DbError::InvalidIndex(format!(
                "index {name} already exists with different options"
            )));
        }
        if spec.is_text() && target.indexes.iter().any(|index| index.spec.is_text()) {
            return Err(DbError::InvalidIndex(format!(
                "{database}.{collection} already has a text index"
            )));
        }
        if spec.unique {
            if let Some(key) = first_duplicate(target.documents.iter(), &spec) {
                return Err(DbError::duplicate_key(
                    database,
                    collection,
                    format!("index {name} dup key {key:?}"),
                ));
            }
        }

        target.indexes.push(IndexInfo {
            name: name.clone(),
            spec,
        });
        Ok(name)
    }

    async fn list_indexes(&self, database: &str, collection: &str) -> DbResult<Vec<IndexInfo>> {
        Ok(self
            .lock()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|target| target.indexes.clone())
            .unwrap_or_default())
    }

    /// Equality match on each filter field; dotted paths reach into
    /// embedded documents.
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> DbResult<Vec<Document>> {
        Ok(self
            .lock()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|target| {
                target
                    .documents
                    .iter()
                    .filter(|document| {
                        filter
                            .iter()
                            .all(|(path, expected)| lookup(document, path) == Some(expected))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, database: &str, collection: &str) -> DbResult<u64> {
        Ok(self
            .lock()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, |target| target.documents.len() as u64))
    }

    async fn text_search(
        &self,
        database: &str,
        collection: &str,
        terms: &str,
    ) -> DbResult<Vec<Document>> {
        let state = self.lock();
        let missing = || DbError::TextIndexRequired {
            database: database.to_string(),
            collection: collection.to_string(),
        };
        let target = state
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .ok_or_else(missing)?;
        let index = target
            .indexes
            .iter()
            .find(|index| index.spec.is_text())
            .ok_or_else(missing)?;

        let wanted: Vec<String> = tokens(terms).collect();
        Ok(target
            .documents
            .iter()
            .filter(|document| {
                let mut found = Vec::new();
                for (field, kind) in &index.spec.keys {
                    if *kind == IndexKind::Text {
                        if let Some(value) = lookup(document, field) {
                            text_values(value, &mut found);
                        }
                    }
                }
                wanted.iter().any(|term| found.contains(term))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoleGrant;
    use mongodb::bson::doc;

    fn account(name: &str) -> Account {
        Account {
            name: name.to_string(),
            secret: "secret".to_string(),
            roles: vec![RoleGrant::new("read", "myapp")],
        }
    }

    #[tokio::test]
    async fn account_names_are_unique_per_database() {
        let store = MemoryStore::new();
        store.create_account("myapp", &account("appuser")).await.unwrap();
        store.create_account("testdb", &account("appuser")).await.unwrap();

        let err = store
            .create_account("myapp", &account("appuser"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::AccountExists { .. }));
        assert_eq!(store.accounts("myapp").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_generates_ids_and_keeps_supplied_ones() {
        let store = MemoryStore::new();
        let supplied = ObjectId::new();
        let ids = store
            .insert_many(
                "myapp",
                "things",
                vec![doc! { "n": 1 }, doc! { "_id": supplied, "n": 2 }],
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert!(matches!(ids[0], Bson::ObjectId(_)));
        assert_eq!(ids[1], Bson::ObjectId(supplied));
    }

    #[tokio::test]
    async fn ordered_insert_keeps_documents_ahead_of_a_duplicate() {
        let store = MemoryStore::new();
        store
            .insert_many("myapp", "users", vec![doc! { "email": "a@example.com" }])
            .await
            .unwrap();
        store
            .create_index("myapp", "users", &IndexSpec::ascending("email").unique())
            .await
            .unwrap();

        let err = store
            .insert_many(
                "myapp",
                "users",
                vec![
                    doc! { "email": "b@example.com" },
                    doc! { "email": "a@example.com" },
                    doc! { "email": "c@example.com" },
                ],
            )
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.count("myapp", "users").await.unwrap(), 2);
        let found = store
            .find("myapp", "users", doc! { "email": "c@example.com" })
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn unique_index_build_fails_over_existing_duplicates() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "myapp",
                "users",
                vec![doc! { "email": "a@example.com" }, doc! { "email": "a@example.com" }],
            )
            .await
            .unwrap();

        let err = store
            .create_index("myapp", "users", &IndexSpec::ascending("email").unique())
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn equivalent_index_is_a_no_op() {
        let store = MemoryStore::new();
        let spec = IndexSpec::ascending("role");
        store.create_index("myapp", "users", &spec).await.unwrap();
        store.create_index("myapp", "users", &spec).await.unwrap();

        let indexes = store.list_indexes("myapp", "users").await.unwrap();
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "_id_");
    }

    #[tokio::test]
    async fn text_search_requires_a_text_index() {
        let store = MemoryStore::new();
        store
            .insert_many("myapp", "products", vec![doc! { "name": "Coffee Mug" }])
            .await
            .unwrap();
        let err = store
            .text_search("myapp", "products", "mug")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TextIndexRequired { .. }));

        store
            .create_index("myapp", "products", &IndexSpec::text(&["name"]))
            .await
            .unwrap();
        let hits = store.text_search("myapp", "products", "MUG").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn find_matches_dotted_paths() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "myapp",
                "users",
                vec![
                    doc! { "profile": { "city": "Chicago" } },
                    doc! { "profile": { "city": "New York" } },
                ],
            )
            .await
            .unwrap();
        let found = store
            .find("myapp", "users", doc! { "profile.city": "Chicago" })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn failing_pings_recover() {
        let store = MemoryStore::with_failing_pings(2);
        assert!(store.ping().await.is_err());
        assert!(store.ping().await.is_err());
        assert!(store.ping().await.is_ok());
    }
}
