//! Typed in-memory stores for admin-managed resources

use chrono::{DateTime, Utc};
use common::error::{Error, Result};
use common::model::admin::{Ad, Asset, FeeConfig, InsurancePlan, LuckyDraw};
use common::model::market::Market;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::service::AdminService;

/// A row type managed through the admin console
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in audit entries and error messages
    const RESOURCE_TYPE: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    fn created_at(&self) -> DateTime<Utc>;
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    fn validate(&self) -> Result<()>;

    /// Key that must be unique among resources of this type
    fn unique_key(&self) -> Option<&str> {
        None
    }

    /// Extra checks when `self` replaces `previous`
    fn check_update(&self, _previous: &Self) -> Result<()> {
        Ok(())
    }

    /// The store holding this resource type
    fn store(admin: &AdminService) -> &ResourceStore<Self>;
}

/// Resources of one type, by ID
pub struct ResourceStore<T: Resource> {
    items: DashMap<Uuid, T>,
}

impl<T: Resource> Default for ResourceStore<T> {
    fn default() -> Self {
        Self { items: DashMap::new() }
    }
}

impl<T: Resource> ResourceStore<T> {
    /// All resources, oldest first
    pub fn list(&self) -> Vec<T> {
        let mut items: Vec<T> = self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by_key(|item| item.created_at());
        items
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.items.get(&id).map(|item| item.clone())
    }

    pub fn require(&self, id: Uuid) -> Result<T> {
        self.get(id).ok_or_else(|| {
            Error::ResourceNotFound(format!("{} not found: {}", T::RESOURCE_TYPE, id))
        })
    }

    /// Find a resource by its unique key
    pub fn find_by_key(&self, key: &str) -> Option<T> {
        self.items
            .iter()
            .find(|entry| entry.value().unique_key() == Some(key))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fail if another resource already uses the unique key of `item`
    pub(crate) fn check_unique(&self, item: &T) -> Result<()> {
        let Some(key) = item.unique_key() else {
            return Ok(());
        };
        let taken = self
            .items
            .iter()
            .any(|entry| entry.key() != &item.id() && entry.value().unique_key() == Some(key));
        if taken {
            return Err(Error::ValidationError(format!(
                "{} {} already exists", T::RESOURCE_TYPE, key
            )));
        }
        Ok(())
    }

    pub(crate) fn put(&self, item: T) -> Option<T> {
        self.items.insert(item.id(), item)
    }

    pub(crate) fn remove(&self, id: Uuid) -> Option<T> {
        self.items.remove(&id).map(|(_, item)| item)
    }
}

macro_rules! identity_and_timestamps {
    () => {
        fn id(&self) -> Uuid {
            self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = id;
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }

        fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
            self.created_at = created_at;
            self.updated_at = updated_at;
        }
    };
}

impl Resource for Asset {
    const RESOURCE_TYPE: &'static str = "asset";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        Asset::validate(self)
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.symbol)
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.assets
    }
}

impl Resource for Market {
    const RESOURCE_TYPE: &'static str = "market";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        Market::validate(self)
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.symbol)
    }

    fn check_update(&self, previous: &Self) -> Result<()> {
        if self.symbol != previous.symbol {
            return Err(Error::ValidationError(format!(
                "Market symbol cannot be changed from {}", previous.symbol
            )));
        }
        Ok(())
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.markets
    }
}

impl Resource for FeeConfig {
    const RESOURCE_TYPE: &'static str = "fee_config";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        FeeConfig::validate(self)
    }

    // One fee schedule per market
    fn unique_key(&self) -> Option<&str> {
        Some(&self.symbol)
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.fee_configs
    }
}

impl Resource for Ad {
    const RESOURCE_TYPE: &'static str = "ad";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        Ad::validate(self)
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.ads
    }
}

impl Resource for InsurancePlan {
    const RESOURCE_TYPE: &'static str = "insurance_plan";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        InsurancePlan::validate(self)
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.insurance_plans
    }
}

impl Resource for LuckyDraw {
    const RESOURCE_TYPE: &'static str = "lucky_draw";
    identity_and_timestamps!();

    fn validate(&self) -> Result<()> {
        LuckyDraw::validate(self)
    }

    fn store(admin: &AdminService) -> &ResourceStore<Self> {
        &admin.lucky_draws
    }
}
