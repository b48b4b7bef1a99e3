//! Repository for account data

use async_trait::async_trait;
use chrono::Utc;
use common::decimal::Quantity;
use common::error::{Error, Result};
use common::model::account::{Account, Balance, KycStatus};
use dashmap::DashMap;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

/// Account repository trait defining the interface for account data storage
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Store a new account; fails if the ID is taken
    async fn create_account(&self, account: Account) -> Result<Account>;

    /// Get an account by ID
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// Overwrite an existing account
    async fn update_account(&self, account: Account) -> Result<Account>;

    /// Number of accounts
    async fn account_count(&self) -> Result<usize>;

    /// Get a balance
    async fn get_balance(&self, account_id: Uuid, asset: &str) -> Result<Option<Balance>>;

    /// Get all balances for an account
    async fn get_balances(&self, account_id: Uuid) -> Result<Vec<Balance>>;

    /// Write a set of balances atomically: either all are stored or none
    async fn apply_balances(&self, balances: Vec<Balance>) -> Result<()>;

    /// Move every locked amount back to available; returns the balances changed
    async fn release_all_locked(&self) -> Result<usize>;
}

/// In-memory repository for account data
#[derive(Default)]
pub struct InMemoryAccountRepository {
    /// Accounts by ID
    accounts: DashMap<Uuid, Account>,
    /// Balances by account ID and asset
    balances: DashMap<(Uuid, String), Balance>,
}

impl InMemoryAccountRepository {
    /// Create a new in-memory account repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create_account(&self, account: Account) -> Result<Account> {
        match self.accounts.entry(account.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::ValidationError(format!(
                "Account already exists: {}", account.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn update_account(&self, account: Account) -> Result<Account> {
        let mut stored = self
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", account.id)))?;
        *stored = account.clone();
        Ok(account)
    }

    async fn account_count(&self) -> Result<usize> {
        Ok(self.accounts.len())
    }

    async fn get_balance(&self, account_id: Uuid, asset: &str) -> Result<Option<Balance>> {
        Ok(self.balances.get(&(account_id, asset.to_string())).map(|b| b.clone()))
    }

    async fn get_balances(&self, account_id: Uuid) -> Result<Vec<Balance>> {
        let mut balances: Vec<Balance> = self
            .balances
            .iter()
            .filter(|entry| entry.key().0 == account_id)
            .map(|entry| entry.value().clone())
            .collect();
        balances.sort_by(|a, b| a.asset.cmp(&b.asset));
        Ok(balances)
    }

    async fn apply_balances(&self, balances: Vec<Balance>) -> Result<()> {
        // Callers hold the account locks, so plain inserts cannot interleave
        for balance in balances {
            self.balances.insert((balance.account_id, balance.asset.clone()), balance);
        }
        Ok(())
    }

    async fn release_all_locked(&self) -> Result<usize> {
        let mut released = 0;
        for mut entry in self.balances.iter_mut() {
            let balance = entry.value_mut();
            if !balance.locked.is_zero() {
                balance.available = balance.total;
                balance.locked = Quantity::ZERO;
                balance.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }
}

/// PostgreSQL repository for account data
pub struct PostgresAccountRepository {
    /// Database connection pool
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Create a repository on an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decimals are stored as TEXT to keep full precision
fn decimal_column(row: &PgRow, column: &str) -> Result<Quantity> {
    let text: String = row.try_get(column)?;
    text.parse::<Quantity>()
        .map_err(|e| Error::Internal(format!("Invalid {} balance format: {}", column, e)))
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let status: String = row.try_get("kyc_status")?;
    Ok(Account {
        id: row.try_get("id")?,
        kyc_status: KycStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown KYC status: {}", status)))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn balance_from_row(row: &PgRow) -> Result<Balance> {
    Ok(Balance {
        account_id: row.try_get("account_id")?,
        asset: row.try_get("asset")?,
        total: decimal_column(row, "total")?,
        available: decimal_column(row, "available")?,
        locked: decimal_column(row, "locked")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create_account(&self, account: Account) -> Result<Account> {
        debug!("Creating account in database: {}", account.id);

        sqlx::query(
            "INSERT INTO accounts (id, kyc_status, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(account.id)
        .bind(account.kyc_status.as_str())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        debug!("Getting account from database: {}", id);

        let row = sqlx::query("SELECT id, kyc_status, created_at, updated_at FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn update_account(&self, account: Account) -> Result<Account> {
        let result = sqlx::query("UPDATE accounts SET kyc_status = $2, updated_at = $3 WHERE id = $1")
            .bind(account.id)
            .bind(account.kyc_status.as_str())
            .bind(account.updated_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AccountNotFound(format!("Account not found: {}", account.id)));
        }
        Ok(account)
    }

    async fn account_count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as usize)
    }

    async fn get_balance(&self, account_id: Uuid, asset: &str) -> Result<Option<Balance>> {
        debug!("Getting balance from database: {} for {}", asset, account_id);

        let row = sqlx::query(
            "SELECT account_id, asset, total, available, locked, updated_at
             FROM balances
             WHERE account_id = $1 AND asset = $2",
        )
        .bind(account_id)
        .bind(asset)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(balance_from_row).transpose()
    }

    async fn get_balances(&self, account_id: Uuid) -> Result<Vec<Balance>> {
        let rows = sqlx::query(
            "SELECT account_id, asset, total, available, locked, updated_at
             FROM balances
             WHERE account_id = $1
             ORDER BY asset",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(balance_from_row).collect()
    }

    async fn apply_balances(&self, balances: Vec<Balance>) -> Result<()> {
        debug!("Writing {} balances in one transaction", balances.len());

        let mut tx = self.pool.begin().await?;
        for balance in &balances {
            sqlx::query(
                "INSERT INTO balances (account_id, asset, total, available, locked, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (account_id, asset)
                 DO UPDATE SET
                    total = EXCLUDED.total,
                    available = EXCLUDED.available,
                    locked = EXCLUDED.locked,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(balance.account_id)
            .bind(&balance.asset)
            .bind(balance.total.to_string())
            .bind(balance.available.to_string())
            .bind(balance.locked.to_string())
            .bind(balance.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        // Dropping the transaction without commit rolls it back
        tx.commit().await?;
        Ok(())
    }

    async fn release_all_locked(&self) -> Result<usize> {
        let result = sqlx::query(
            "UPDATE balances
             SET available = total, locked = '0', updated_at = NOW()
             WHERE locked <> '0'",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }
}
