//! Application and service accounts.

use anyhow::Context;
use async_trait::async_trait;
use seedbed_db::{Account, RoleGrant};
use seedbed_kernel::{RunCtx, Stage, Step};

use super::{PRIMARY_DB, TEST_DB};

/// One account row: where it is created and the single role it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSeed {
    /// Database the account is created in
    pub database: &'static str,
    pub name: &'static str,
    pub secret: &'static str,
    pub role: &'static str,
    /// Database the role is scoped to
    pub scope: &'static str,
}

impl AccountSeed {
    pub fn account(&self) -> Account {
        Account {
            name: self.name.to_string(),
            secret: self.secret.to_string(),
            roles: vec![RoleGrant::new(self.role, self.scope)],
        }
    }
}

pub const ACCOUNTS: &[AccountSeed] = &[
    AccountSeed {
        database: PRIMARY_DB,
        name: "appuser",
        secret: "apppass123",
        role: "readWrite",
        scope: PRIMARY_DB,
    },
    AccountSeed {
        database: PRIMARY_DB,
        name: "readonly",
        secret: "readonly123",
        role: "read",
        scope: PRIMARY_DB,
    },
    AccountSeed {
        database: TEST_DB,
        name: "testuser",
        secret: "testpass123",
        role: "readWrite",
        scope: TEST_DB,
    },
];

/// Creates every account in [`ACCOUNTS`]. An existing account is fatal.
pub struct AccountsStage;

impl AccountsStage {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AccountsStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for AccountsStage {
    fn name(&self) -> &'static str {
        "accounts"
    }

    fn steps(&self) -> Vec<Step> {
        ACCOUNTS
            .iter()
            .map(|seed| {
                Step::new(
                    seed.database,
                    format!("create account {} ({} on {})", seed.name, seed.role, seed.scope),
                )
            })
            .collect()
    }

    async fn run(&self, ctx: &RunCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(stage = self.name(), "creating application databases and accounts");

        for seed in ACCOUNTS {
            ctx.database(seed.database)
                .create_account(&seed.account())
                .await
                .with_context(|| {
                    format!("failed to create account '{}' in '{}'", seed.name, seed.database)
                })?;

            tracing::info!(
                account = seed.name,
                database = seed.database,
                role = seed.role,
                "account created"
            );
        }

        tracing::info!(stage = self.name(), "account initialization completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_db::{DbError, MemoryStore};

    #[test]
    fn every_account_has_one_grant_on_its_own_database() {
        for seed in ACCOUNTS {
            let account = seed.account();
            assert_eq!(account.roles.len(), 1);
            assert_eq!(account.roles[0].db, seed.database);
        }
    }

    #[tokio::test]
    async fn existing_account_aborts_the_stage() {
        let store = MemoryStore::new();
        let ctx = RunCtx::new(&store);
        ctx.database(PRIMARY_DB)
            .create_account(&ACCOUNTS[1].account())
            .await
            .unwrap();

        let err = AccountsStage::new().run(&ctx).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::AccountExists { .. })
        ));
        // appuser precedes readonly, testuser never runs
        assert_eq!(ctx.database(PRIMARY_DB).accounts().await.unwrap().len(), 2);
        assert!(ctx.database(TEST_DB).accounts().await.unwrap().is_empty());
    }
}
