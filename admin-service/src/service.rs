//! Audited CRUD over admin-managed resources

use std::sync::Arc;

use chrono::Utc;
use common::error::Result;
use common::model::admin::{Ad, Asset, FeeConfig, InsurancePlan, LuckyDraw};
use common::model::audit::{AuditAction, AuditEntry, AuditFilter};
use common::model::market::Market;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::audit::{AuditLog, InMemoryAuditLog};
use crate::store::{Resource, ResourceStore};

/// Admin service. Every mutation is paired with an audit entry; when the
/// audit write fails the mutation is undone and the error returned.
pub struct AdminService {
    pub(crate) assets: ResourceStore<Asset>,
    pub(crate) markets: ResourceStore<Market>,
    pub(crate) fee_configs: ResourceStore<FeeConfig>,
    pub(crate) ads: ResourceStore<Ad>,
    pub(crate) insurance_plans: ResourceStore<InsurancePlan>,
    pub(crate) lucky_draws: ResourceStore<LuckyDraw>,
    audit: Arc<dyn AuditLog>,
    /// Serialises mutations so uniqueness checks and rollbacks see a stable store
    write_lock: Mutex<()>,
}

impl Default for AdminService {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryAuditLog::new()))
    }
}

impl AdminService {
    pub fn new(audit: Arc<dyn AuditLog>) -> Self {
        Self {
            assets: ResourceStore::default(),
            markets: ResourceStore::default(),
            fee_configs: ResourceStore::default(),
            ads: ResourceStore::default(),
            insurance_plans: ResourceStore::default(),
            lucky_draws: ResourceStore::default(),
            audit,
            write_lock: Mutex::new(()),
        }
    }

    /// All resources of one type
    pub fn list<T: Resource>(&self) -> Vec<T> {
        T::store(self).list()
    }

    pub fn get<T: Resource>(&self, id: Uuid) -> Result<T> {
        T::store(self).require(id)
    }

    pub fn market_by_symbol(&self, symbol: &str) -> Option<Market> {
        self.markets.find_by_key(symbol)
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<Asset> {
        self.assets.find_by_key(symbol)
    }

    pub fn fee_config_for(&self, symbol: &str) -> Option<FeeConfig> {
        self.fee_configs.find_by_key(symbol)
    }

    /// Create a resource under a fresh ID
    pub async fn create<T: Resource>(&self, actor_id: Uuid, mut item: T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let store = T::store(self);

        let now = Utc::now();
        item.set_id(Uuid::new_v4());
        item.set_timestamps(now, now);
        item.validate()?;
        store.check_unique(&item)?;

        let entry = AuditEntry::new(
            actor_id,
            AuditAction::Create,
            T::RESOURCE_TYPE,
            item.id().to_string(),
            None,
            Some(serde_json::to_value(&item)?),
        );

        store.put(item.clone());
        if let Err(e) = self.audit.record(entry).await {
            error!("Audit write failed, rolling back {} create: {}", T::RESOURCE_TYPE, e);
            store.remove(item.id());
            return Err(e);
        }

        info!("{} {} created by {}", T::RESOURCE_TYPE, item.id(), actor_id);
        Ok(item)
    }

    /// Replace the resource with ID `id`; identity and creation time are kept
    pub async fn update<T: Resource>(&self, actor_id: Uuid, id: Uuid, mut item: T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let store = T::store(self);
        let previous = store.require(id)?;

        item.set_id(id);
        item.set_timestamps(previous.created_at(), Utc::now());
        item.validate()?;
        item.check_update(&previous)?;
        store.check_unique(&item)?;

        let entry = AuditEntry::new(
            actor_id,
            AuditAction::Update,
            T::RESOURCE_TYPE,
            id.to_string(),
            Some(serde_json::to_value(&previous)?),
            Some(serde_json::to_value(&item)?),
        );

        store.put(item.clone());
        if let Err(e) = self.audit.record(entry).await {
            error!("Audit write failed, rolling back {} update: {}", T::RESOURCE_TYPE, e);
            store.put(previous);
            return Err(e);
        }

        info!("{} {} updated by {}", T::RESOURCE_TYPE, id, actor_id);
        Ok(item)
    }

    /// Delete a resource, returning what was removed
    pub async fn delete<T: Resource>(&self, actor_id: Uuid, id: Uuid) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let store = T::store(self);
        let previous = store.require(id)?;

        let entry = AuditEntry::new(
            actor_id,
            AuditAction::Delete,
            T::RESOURCE_TYPE,
            id.to_string(),
            Some(serde_json::to_value(&previous)?),
            None,
        );

        store.remove(id);
        if let Err(e) = self.audit.record(entry).await {
            error!("Audit write failed, rolling back {} delete: {}", T::RESOURCE_TYPE, e);
            store.put(previous);
            return Err(e);
        }

        info!("{} {} deleted by {}", T::RESOURCE_TYPE, id, actor_id);
        Ok(previous)
    }

    /// Record a change made outside the resource stores (e.g. an account's KYC status)
    pub async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.audit.record(entry).await
    }

    /// Audit entries, newest first
    pub async fn audit_logs(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.audit.list(filter).await
    }
}
