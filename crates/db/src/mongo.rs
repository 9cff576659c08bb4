//! MongoDB-backed [`DocumentStore`].

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};

use crate::error::{server_code, DbError, DbResult, DUPLICATE_KEY_CODE, USER_EXISTS_CODE};
use crate::model::{create_user_command, Account, AccountInfo, IndexInfo, IndexSpec, RoleGrant};
use crate::store::DocumentStore;

/// Returned by the server for `$text` without a text index.
const INDEX_NOT_FOUND_CODE: i32 = 27;
/// Returned by `listIndexes` for a collection that does not exist.
const NAMESPACE_NOT_FOUND_CODE: i32 = 26;

pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Build a client for `uri`. The driver connects lazily, so this does not
    /// touch the network; see [`crate::wait_until_ready`].
    pub async fn connect(uri: &str, app_name: &str) -> DbResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(app_name.to_string());
        let client = Client::with_options(options)?;
        tracing::debug!(target: "seedbed-db", app_name, "mongodb client created");
        Ok(Self { client })
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

fn classify(database: &str, collection: &str, err: mongodb::error::Error) -> DbError {
    match server_code(&err) {
        Some(DUPLICATE_KEY_CODE) => DbError::duplicate_key(database, collection, err.to_string()),
        Some(INDEX_NOT_FOUND_CODE) => DbError::TextIndexRequired {
            database: database.to_string(),
            collection: collection.to_string(),
        },
        _ => DbError::Driver(err),
    }
}

fn parse_account(user: &Document) -> DbResult<AccountInfo> {
    let field = |key: &str| {
        user.get_str(key)
            .map(str::to_string)
            .map_err(|_| DbError::Decode(format!("usersInfo entry missing '{key}'")))
    };
    let roles = user
        .get_array("roles")
        .map_err(|_| DbError::Decode("usersInfo entry missing 'roles'".to_string()))?
        .iter()
        .filter_map(Bson::as_document)
        .map(|role| match (role.get_str("role"), role.get_str("db")) {
            (Ok(role), Ok(db)) => Ok(RoleGrant::new(role, db)),
            _ => Err(DbError::Decode("malformed role grant".to_string())),
        })
        .collect::<DbResult<Vec<_>>>()?;

    Ok(AccountInfo {
        name: field("user")?,
        database: field("db")?,
        roles,
    })
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> DbResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn create_account(&self, database: &str, account: &Account) -> DbResult<()> {
        self.client
            .database(database)
            .run_command(create_user_command(account))
            .await
            .map_err(|err| match server_code(&err) {
                Some(USER_EXISTS_CODE) => DbError::AccountExists {
                    database: database.to_string(),
                    name: account.name.clone(),
                },
                _ => DbError::Driver(err),
            })?;
        Ok(())
    }

    async fn accounts(&self, database: &str) -> DbResult<Vec<AccountInfo>> {
        let reply = self
            .client
            .database(database)
            .run_command(doc! { "usersInfo": 1 })
            .await?;
        let users = reply
            .get_array("users")
            .map_err(|_| DbError::Decode("usersInfo reply missing 'users'".to_string()))?;

        users
            .iter()
            .filter_map(Bson::as_document)
            .map(parse_account)
            .collect()
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DbResult<Vec<Bson>> {
        let result = self
            .collection(database, collection)
            .insert_many(documents)
            .await
            .map_err(|err| classify(database, collection, err))?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(position, _)| *position);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> DbResult<String> {
        let options = spec
            .unique
            .then(|| IndexOptions::builder().unique(true).build());
        let model = IndexModel::builder()
            .keys(spec.keys_document())
            .options(options)
            .build();

        let result = self
            .collection(database, collection)
            .create_index(model)
            .await
            .map_err(|err| classify(database, collection, err))?;
        Ok(result.index_name)
    }

    async fn list_indexes(&self, database: &str, collection: &str) -> DbResult<Vec<IndexInfo>> {
        let cursor = match self.collection(database, collection).list_indexes().await {
            Ok(cursor) => cursor,
            Err(err) if server_code(&err) == Some(NAMESPACE_NOT_FOUND_CODE) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let models: Vec<IndexModel> = cursor.try_collect().await?;

        models
            .into_iter()
            .map(|model| {
                let options = model.options.unwrap_or_default();
                let spec = IndexSpec::from_keys(
                    &model.keys,
                    options.weights.as_ref(),
                    options.unique.unwrap_or(false),
                )?;
                Ok(IndexInfo {
                    name: options.name.unwrap_or_else(|| spec.default_name()),
                    spec,
                })
            })
            .collect()
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> DbResult<Vec<Document>> {
        let documents: Vec<Document> = self
            .collection(database, collection)
            .find(filter)
            .await?
            .try_collect()
            .await?;
        Ok(documents)
    }

    async fn count(&self, database: &str, collection: &str) -> DbResult<u64> {
        Ok(self
            .collection(database, collection)
            .count_documents(doc! {})
            .await?)
    }

    async fn text_search(
        &self,
        database: &str,
        collection: &str,
        terms: &str,
    ) -> DbResult<Vec<Document>> {
        let filter = doc! { "$text": { "$search": terms } };
        let cursor = self
            .collection(database, collection)
            .find(filter)
            .await
            .map_err(|err| classify(database, collection, err))?;
        cursor
            .try_collect()
            .await
            .map_err(|err| classify(database, collection, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_users_info_entry() {
        let entry = doc! {
            "_id": "myapp.appuser",
            "user": "appuser",
            "db": "myapp",
            "roles": [ { "role": "readWrite", "db": "myapp" } ],
        };
        let account = parse_account(&entry).unwrap();
        assert_eq!(account.name, "appuser");
        assert_eq!(account.database, "myapp");
        assert_eq!(account.roles, vec![RoleGrant::new("readWrite", "myapp")]);
    }

    #[test]
    fn rejects_entry_without_roles() {
        let entry = doc! { "user": "appuser", "db": "myapp" };
        assert!(matches!(parse_account(&entry), Err(DbError::Decode(_))));
    }
}
