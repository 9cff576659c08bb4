use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::DbResult;
use crate::model::{Account, AccountInfo, IndexInfo, IndexSpec};

/// Administrative operations needed to bootstrap a document database.
///
/// Every call names its logical database explicitly; there is no
/// session-wide "current database". Use [`Database`] to carry the name
/// through a run of statements.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Round-trip to the server; used to wait for availability at startup.
    async fn ping(&self) -> DbResult<()>;

    /// Create an account in `database`. Fails if the name already exists there.
    async fn create_account(&self, database: &str, account: &Account) -> DbResult<()>;

    /// Accounts whose authentication database is `database`.
    async fn accounts(&self, database: &str) -> DbResult<Vec<AccountInfo>>;

    /// Insert an ordered batch, generating `_id` where absent. Returns the ids
    /// in input order.
    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DbResult<Vec<Bson>>;

    /// Build an index and return its name.
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> DbResult<String>;

    async fn list_indexes(&self, database: &str, collection: &str) -> DbResult<Vec<IndexInfo>>;

    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> DbResult<Vec<Document>>;

    async fn count(&self, database: &str, collection: &str) -> DbResult<u64>;

    /// Keyword search over the collection's text index.
    async fn text_search(
        &self,
        database: &str,
        collection: &str,
        terms: &str,
    ) -> DbResult<Vec<Document>>;
}

/// Explicit handle to one logical database of a [`DocumentStore`].
#[derive(Clone)]
pub struct Database<'s> {
    store: &'s dyn DocumentStore,
    name: String,
}

impl<'s> Database<'s> {
    pub fn new(store: &'s dyn DocumentStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Switch to a sibling database on the same store.
    pub fn sibling(&self, name: &str) -> Database<'s> {
        Database::new(self.store, name)
    }

    pub async fn create_account(&self, account: &Account) -> DbResult<()> {
        self.store.create_account(&self.name, account).await
    }

    pub async fn accounts(&self) -> DbResult<Vec<AccountInfo>> {
        self.store.accounts(&self.name).await
    }

    pub async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<Bson>> {
        self.store
            .insert_many(&self.name, collection, documents)
            .await
    }

    pub async fn create_index(&self, collection: &str, spec: &IndexSpec) -> DbResult<String> {
        self.store.create_index(&self.name, collection, spec).await
    }

    pub async fn list_indexes(&self, collection: &str) -> DbResult<Vec<IndexInfo>> {
        self.store.list_indexes(&self.name, collection).await
    }

    pub async fn find(&self, collection: &str, filter: Document) -> DbResult<Vec<Document>> {
        self.store.find(&self.name, collection, filter).await
    }

    pub async fn count(&self, collection: &str) -> DbResult<u64> {
        self.store.count(&self.name, collection).await
    }

    pub async fn text_search(&self, collection: &str, terms: &str) -> DbResult<Vec<Document>> {
        self.store.text_search(&self.name, collection, terms).await
    }
}

impl std::fmt::Debug for Database<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish()
    }
}
