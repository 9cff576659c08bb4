//! Checks against a running MongoDB server.
//!
//! Ignored by default. Run with
//! `SEEDBED_TEST_URI=mongodb://127.0.0.1:27017 cargo test -p seedbed-db -- --ignored`.

use std::time::Duration;

use seedbed_db::bson::{doc, oid::ObjectId};
use seedbed_db::{wait_until_ready, Account, DbError, DocumentStore, IndexSpec, MongoStore, RoleGrant};

const DEFAULT_URI: &str = "mongodb://127.0.0.1:27017";

/// Connected store plus a throwaway database name, dropped by [`cleanup`].
async fn live_store() -> (MongoStore, mongodb::Client, String) {
    let uri = std::env::var("SEEDBED_TEST_URI").unwrap_or_else(|_| DEFAULT_URI.to_string());
    let store = MongoStore::connect(&uri, "seedbed-live-tests").await.unwrap();
    wait_until_ready(&store, 10, Duration::from_secs(5)).await.unwrap();
    let client = mongodb::Client::with_uri_str(&uri).await.unwrap();
    (store, client, format!("seedbed_live_{}", ObjectId::new()))
}

async fn cleanup(client: &mongodb::Client, database: &str) {
    let db = client.database(database);
    db.run_command(doc! { "dropAllUsersFromDatabase": 1 })
        .await
        .unwrap();
    db.drop().await.unwrap();
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn second_create_user_maps_to_account_exists() {
    let (store, client, database) = live_store().await;
    let account = Account {
        name: "appuser".to_string(),
        secret: "apppass123".to_string(),
        roles: vec![RoleGrant::new("readWrite", database.as_str())],
    };

    store.create_account(&database, &account).await.unwrap();
    let err = store.create_account(&database, &account).await.unwrap_err();
    cleanup(&client, &database).await;

    assert!(matches!(err, DbError::AccountExists { ref name, .. } if name == "appuser"));
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn unique_violation_maps_to_duplicate_key_and_keeps_the_prefix() {
    let (store, client, database) = live_store().await;
    store
        .insert_many(&database, "users", vec![doc! { "email": "a@example.com" }])
        .await
        .unwrap();
    store
        .create_index(&database, "users", &IndexSpec::ascending("email").unique())
        .await
        .unwrap();

    let err = store
        .insert_many(
            &database,
            "users",
            vec![doc! { "email": "b@example.com" }, doc! { "email": "a@example.com" }],
        )
        .await
        .unwrap_err();
    let count = store.count(&database, "users").await.unwrap();
    cleanup(&client, &database).await;

    assert!(matches!(err, DbError::DuplicateKey { .. }));
    assert_eq!(count, 2);
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn text_search_without_index_maps_to_text_index_required() {
    let (store, client, database) = live_store().await;
    store
        .insert_many(&database, "products", vec![doc! { "name": "Coffee Mug" }])
        .await
        .unwrap();

    let err = store
        .text_search(&database, "products", "mug")
        .await
        .unwrap_err();
    let missing = store.list_indexes(&database, "absent").await.unwrap();
    cleanup(&client, &database).await;

    assert!(matches!(err, DbError::TextIndexRequired { .. }));
    assert!(missing.is_empty());
}
