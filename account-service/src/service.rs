//! Account service implementation

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::decimal::{Amount, Quantity};
use common::error::{Error, ErrorExt, Result};
use common::model::account::{Account, Balance, KycStatus};
use common::model::market::Market;
use common::model::trade::Trade;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::{AccountRepository, InMemoryAccountRepository, PostgresAccountRepository};

/// Repository Type
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// PostgreSQL repository on an existing pool
    Postgres(PgPool),
}

/// Balances touched by one operation, loaded up front and written back together
struct BalanceSet {
    balances: HashMap<(Uuid, String), Balance>,
}

impl BalanceSet {
    fn get_mut(&mut self, account_id: Uuid, asset: &str) -> Result<&mut Balance> {
        self.balances
            .get_mut(&(account_id, asset.to_string()))
            .ok_or_else(|| Error::Internal(format!("Balance {} of {} was not loaded", asset, account_id)))
    }

    fn into_balances(self) -> Vec<Balance> {
        self.balances.into_values().collect()
    }
}

/// Account service for managing user balances and fund reservations
pub struct AccountService {
    /// Repository for account data
    repo: Arc<dyn AccountRepository>,
    /// One async lock per account; balance mutations hold it
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountService {
    /// Create a new account service backed by memory
    pub fn new() -> Self {
        Self::with_repository(RepositoryType::InMemory)
    }

    /// Create a new account service with a specific repository type
    pub fn with_repository(repo_type: RepositoryType) -> Self {
        let repo: Arc<dyn AccountRepository> = match repo_type {
            RepositoryType::InMemory => Arc::new(InMemoryAccountRepository::new()),
            RepositoryType::Postgres(pool) => Arc::new(PostgresAccountRepository::new(pool)),
        };

        Self {
            repo,
            locks: DashMap::new(),
        }
    }

    /// Lock the given accounts in ascending ID order
    async fn lock_accounts(&self, ids: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = self.locks.entry(id).or_default().clone();
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    async fn load(&self, keys: &[(Uuid, &str)]) -> Result<BalanceSet> {
        let mut balances = HashMap::new();
        for (account_id, asset) in keys {
            let key = (*account_id, asset.to_string());
            if balances.contains_key(&key) {
                continue;
            }
            let balance = self
                .repo
                .get_balance(*account_id, asset)
                .await?
                .unwrap_or_else(|| Balance::new(*account_id, asset.to_string()));
            balances.insert(key, balance);
        }
        Ok(BalanceSet { balances })
    }

    async fn require_account(&self, id: Uuid) -> Result<Account> {
        self.repo
            .get_account(id)
            .await
            .with_context(|| format!("Failed to retrieve account {}", id))?
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))
    }

    /// Create a new account
    pub async fn create_account(&self) -> Result<Account> {
        let account = self.repo.create_account(Account::new(Uuid::new_v4())).await?;
        info!("Created account {}", account.id);
        Ok(account)
    }

    /// Get the account with this ID, creating it when missing
    pub async fn ensure_account(&self, id: Uuid) -> Result<Account> {
        let _guard = self.lock_accounts(&[id]).await;
        if let Some(account) = self.repo.get_account(id).await? {
            return Ok(account);
        }
        info!("Creating account {}", id);
        self.repo.create_account(Account::new(id)).await
    }

    /// Get an account by ID
    pub async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        self.repo.get_account(id).await
    }

    /// Number of accounts
    pub async fn account_count(&self) -> Result<usize> {
        self.repo.account_count().await
    }

    /// Change an account's KYC status
    pub async fn set_kyc_status(&self, id: Uuid, status: KycStatus) -> Result<Account> {
        let _guard = self.lock_accounts(&[id]).await;
        let mut account = self.require_account(id).await?;
        account.kyc_status = status;
        account.updated_at = Utc::now();
        info!("KYC status of {} set to {}", id, status.as_str());
        self.repo.update_account(account).await
    }

    /// Get a balance; an account without a row for `asset` has a zero balance
    pub async fn get_balance(&self, account_id: Uuid, asset: &str) -> Result<Balance> {
        Ok(self
            .repo
            .get_balance(account_id, asset)
            .await?
            .unwrap_or_else(|| Balance::new(account_id, asset.to_string())))
    }

    /// Get all balances for an account
    pub async fn get_balances(&self, account_id: Uuid) -> Result<Vec<Balance>> {
        self.require_account(account_id).await?;
        self.repo.get_balances(account_id).await
    }

    /// Deposit funds into an account
    pub async fn deposit(&self, account_id: Uuid, asset: &str, amount: Quantity) -> Result<Balance> {
        require_positive(amount)?;
        info!("Depositing {} {} to account {}", amount, asset, account_id);

        let _guard = self.lock_accounts(&[account_id]).await;
        self.require_account(account_id).await?;

        let mut set = self.load(&[(account_id, asset)]).await?;
        let balance = set.get_mut(account_id, asset)?;
        balance.deposit(amount).map_err(Error::ValidationError)?;
        let updated = balance.clone();

        self.repo
            .apply_balances(set.into_balances())
            .await
            .with_context(|| format!("Failed to store deposit for account {}, asset {}", account_id, asset))?;
        Ok(updated)
    }

    /// Withdraw `amount` from an account. `fee` is part of `amount` and is
    /// credited to `fee_account`. Only KYC-verified accounts may withdraw.
    pub async fn withdraw(
        &self,
        account_id: Uuid,
        asset: &str,
        amount: Quantity,
        fee: Amount,
        fee_account: Uuid,
    ) -> Result<Balance> {
        require_positive(amount)?;
        if fee.is_sign_negative() || fee >= amount {
            return Err(Error::ValidationError(format!(
                "Withdrawal of {} {} does not cover the fee of {}", amount, asset, fee
            )));
        }
        info!("Withdrawing {} {} from account {}", amount, asset, account_id);

        let _guard = self.lock_accounts(&[account_id, fee_account]).await;
        let account = self.require_account(account_id).await?;
        if account.kyc_status != KycStatus::Verified {
            return Err(Error::AuthorizationError(format!(
                "Account {} must be KYC verified to withdraw", account_id
            )));
        }

        let mut set = self.load(&[(account_id, asset), (fee_account, asset)]).await?;
        set.get_mut(account_id, asset)?.withdraw(amount).map_err(|e| {
            Error::InsufficientBalance(format!("Cannot withdraw {} {}: {}", amount, asset, e))
        })?;
        if fee > Amount::ZERO {
            set.get_mut(fee_account, asset)?.deposit(fee).map_err(Error::ValidationError)?;
        }
        let updated = set.get_mut(account_id, asset)?.clone();

        self.repo.apply_balances(set.into_balances()).await?;
        Ok(updated)
    }

    /// Move `amount` of `asset` from available to locked
    pub async fn reserve(&self, account_id: Uuid, asset: &str, amount: Amount) -> Result<Balance> {
        debug!("Reserving {} {} for {}", amount, asset, account_id);

        let _guard = self.lock_accounts(&[account_id]).await;
        let mut set = self.load(&[(account_id, asset)]).await?;
        let balance = set.get_mut(account_id, asset)?;
        balance.lock(amount).map_err(Error::InsufficientBalance)?;
        let updated = balance.clone();

        self.repo.apply_balances(set.into_balances()).await?;
        Ok(updated)
    }

    /// Move `amount` of `asset` from locked back to available
    pub async fn release(&self, account_id: Uuid, asset: &str, amount: Amount) -> Result<Balance> {
        if amount.is_zero() {
            return self.get_balance(account_id, asset).await;
        }
        debug!("Releasing {} {} for {}", amount, asset, account_id);

        let _guard = self.lock_accounts(&[account_id]).await;
        let mut set = self.load(&[(account_id, asset)]).await?;
        let balance = set.get_mut(account_id, asset)?;
        balance.unlock(amount).map_err(Error::Internal)?;
        let updated = balance.clone();

        self.repo.apply_balances(set.into_balances()).await?;
        Ok(updated)
    }

    /// Return every reservation to its owner. Order books are not persisted,
    /// so locks found in storage at startup belong to orders that no longer exist.
    pub async fn release_all_reservations(&self) -> Result<usize> {
        let released = self
            .repo
            .release_all_locked()
            .await
            .with_context(|| "Failed to release stale reservations".to_string())?;
        if released > 0 {
            warn!("Released reservations left over on {} balances", released);
        }
        Ok(released)
    }

    /// Settle a trade: the buyer pays quote out of its reservation and receives
    /// base, the seller pays base out of its reservation and receives quote.
    /// Fees carried on the trade are credited to `fee_account`.
    pub async fn settle_trade(&self, trade: &Trade, market: &Market, fee_account: Uuid) -> Result<()> {
        debug!("Settling trade: {}", trade.id);
        let base = market.base_asset.as_str();
        let quote = market.quote_asset.as_str();

        let _guards = self
            .lock_accounts(&[trade.buyer_id, trade.seller_id, fee_account])
            .await;

        let mut set = self
            .load(&[
                (trade.buyer_id, quote),
                (trade.buyer_id, base),
                (trade.seller_id, base),
                (trade.seller_id, quote),
                (fee_account, base),
                (fee_account, quote),
            ])
            .await?;

        set.get_mut(trade.buyer_id, quote)?
            .spend_locked(trade.amount)
            .map_err(|e| Error::InsufficientBalance(format!("Buyer {}: {}", trade.buyer_id, e)))?;
        set.get_mut(trade.seller_id, base)?
            .spend_locked(trade.quantity)
            .map_err(|e| Error::InsufficientBalance(format!("Seller {}: {}", trade.seller_id, e)))?;

        let mut credits = vec![
            (trade.buyer_id, base, trade.quantity - trade.buyer_fee),
            (trade.seller_id, quote, trade.amount - trade.seller_fee),
        ];
        if trade.buyer_fee > Amount::ZERO {
            credits.push((fee_account, base, trade.buyer_fee));
        }
        if trade.seller_fee > Amount::ZERO {
            credits.push((fee_account, quote, trade.seller_fee));
        }
        for (account_id, asset, amount) in credits {
            set.get_mut(account_id, asset)?
                .deposit(amount)
                .map_err(|e| Error::ValidationError(format!("Cannot credit {}: {}", account_id, e)))?;
        }

        self.repo
            .apply_balances(set.into_balances())
            .await
            .with_context(|| format!("Failed to store settlement of trade {}", trade.id))
            .map_err(|e| {
                warn!("Settlement of trade {} failed: {}", trade.id, e);
                e
            })?;

        info!("Settled trade {}: {} {} @ {}", trade.id, trade.quantity, base, trade.price);
        Ok(())
    }
}

fn require_positive(amount: Amount) -> Result<()> {
    if amount <= Amount::ZERO {
        return Err(Error::ValidationError(format!("Amount must be positive, got {}", amount)));
    }
    Ok(())
}
