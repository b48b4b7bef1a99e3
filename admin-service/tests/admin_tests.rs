use std::sync::Arc;

use admin_service::{AdminService, AuditLog, InMemoryAuditLog};
use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::admin::{Ad, Asset, FeeConfig, LuckyDraw};
use common::model::audit::{AuditAction, AuditEntry, AuditFilter};
use common::model::market::Market;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Audit log whose writes always fail
struct BrokenAuditLog;

#[async_trait]
impl AuditLog for BrokenAuditLog {
    async fn record(&self, _entry: AuditEntry) -> Result<()> {
        Err(Error::Internal("audit store unavailable".to_string()))
    }

    async fn list(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

fn market(symbol: &str) -> Market {
    let (base, quote) = symbol.split_once('-').unwrap();
    serde_json::from_value(serde_json::json!({
        "symbol": symbol,
        "base_asset": base,
        "quote_asset": quote,
        "price_tick": "0.01",
        "quantity_step": "0.001"
    }))
    .unwrap()
}

fn asset(symbol: &str) -> Asset {
    serde_json::from_value(serde_json::json!({
        "symbol": symbol,
        "name": format!("{} token", symbol),
        "withdraw_fee": "1"
    }))
    .unwrap()
}

fn fee(symbol: &str) -> FeeConfig {
    serde_json::from_value(serde_json::json!({
        "symbol": symbol,
        "maker_fee_rate": "0.001",
        "taker_fee_rate": "0.002"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_create_writes_one_audit_entry() {
    let admin = AdminService::default();
    let actor = Uuid::new_v4();

    let created = admin.create(actor, market("BTC-USDT")).await.unwrap();
    assert_eq!(admin.get::<Market>(created.id).unwrap().symbol, "BTC-USDT");
    assert_eq!(admin.market_by_symbol("BTC-USDT").unwrap().id, created.id);

    let entries = admin.audit_logs(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, AuditAction::Create);
    assert_eq!(entry.actor_id, actor);
    assert_eq!(entry.resource_type, "market");
    assert_eq!(entry.resource_id, created.id.to_string());
    assert!(entry.before.is_none());
    assert_eq!(entry.after.as_ref().unwrap()["symbol"], "BTC-USDT");
}

#[tokio::test]
async fn test_update_records_before_and_after() {
    let admin = AdminService::default();
    let actor = Uuid::new_v4();
    let created = admin.create(actor, fee("BTC-USDT")).await.unwrap();

    let mut changed = fee("BTC-USDT");
    changed.taker_fee_rate = dec!(0.003);
    let updated = admin.update(actor, created.id, changed).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(admin.fee_config_for("BTC-USDT").unwrap().taker_fee_rate, dec!(0.003));

    let filter = AuditFilter {
        resource_id: Some(created.id.to_string()),
        ..Default::default()
    };
    let entries = admin.audit_logs(&filter).await.unwrap();
    assert_eq!(entries.len(), 2);
    let update = &entries[0];
    assert_eq!(update.action, AuditAction::Update);
    assert_eq!(update.before.as_ref().unwrap()["taker_fee_rate"], "0.002");
    assert_eq!(update.after.as_ref().unwrap()["taker_fee_rate"], "0.003");
}

#[tokio::test]
async fn test_delete_records_before_snapshot() {
    let admin = AdminService::default();
    let actor = Uuid::new_v4();
    let ad: Ad = serde_json::from_value(serde_json::json!({
        "title": "Launch week",
        "image_url": "https://cdn.example.com/ad.png",
        "target_url": "https://example.com",
        "reward_per_view": "0.5",
        "max_views_per_day": 10
    }))
    .unwrap();
    let created = admin.create(actor, ad).await.unwrap();

    let deleted = admin.delete::<Ad>(actor, created.id).await.unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(matches!(admin.get::<Ad>(created.id), Err(Error::ResourceNotFound(_))));

    let filter = AuditFilter {
        resource_type: Some("ad".to_string()),
        ..Default::default()
    };
    let entries = admin.audit_logs(&filter).await.unwrap();
    assert_eq!(entries[0].action, AuditAction::Delete);
    assert!(entries[0].after.is_none());
    assert_eq!(entries[0].before.as_ref().unwrap()["title"], "Launch week");
}

#[tokio::test]
async fn test_unique_symbols() {
    let admin = AdminService::default();
    let actor = Uuid::new_v4();
    admin.create(actor, asset("BSK")).await.unwrap();
    assert!(matches!(
        admin.create(actor, asset("BSK")).await,
        Err(Error::ValidationError(_))
    ));

    let btc = admin.create(actor, market("BTC-USDT")).await.unwrap();
    let eth = admin.create(actor, market("ETH-USDT")).await.unwrap();
    // Market symbols are fixed once created
    assert!(admin.update(actor, eth.id, market("BTC-USDT")).await.is_err());
    assert!(admin.update(actor, btc.id, market("BTC-USDT")).await.is_ok());

    admin.create(actor, fee("BTC-USDT")).await.unwrap();
    assert!(admin.create(actor, fee("BTC-USDT")).await.is_err());

    // Rejected mutations leave no audit trail
    let entries = admin.audit_logs(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 5);
}

#[tokio::test]
async fn test_validation_rejects_bad_rows() {
    let admin = AdminService::default();
    let actor = Uuid::new_v4();

    let mut bad = fee("BTC-USDT");
    bad.maker_fee_rate = dec!(-0.1);
    assert!(matches!(admin.create(actor, bad).await, Err(Error::ValidationError(_))));

    let draw: LuckyDraw = serde_json::from_value(serde_json::json!({
        "name": "Empty",
        "ticket_price": "0",
        "prize_pool": "100",
        "max_tickets": 10,
        "draw_at": "2026-12-01T00:00:00Z"
    }))
    .unwrap();
    assert!(admin.create(actor, draw).await.is_err());
    assert!(admin.list::<LuckyDraw>().is_empty());
}

#[tokio::test]
async fn test_failed_audit_write_rolls_back() {
    let admin = AdminService::new(Arc::new(BrokenAuditLog));
    let actor = Uuid::new_v4();

    assert!(admin.create(actor, asset("BSK")).await.is_err());
    assert!(admin.list::<Asset>().is_empty());
    assert!(admin.asset_by_symbol("BSK").is_none());
}

#[tokio::test]
async fn test_failed_audit_write_restores_previous_state() {
    let log = Arc::new(SwitchableAuditLog::default());
    let admin = AdminService::new(log.clone());
    let actor = Uuid::new_v4();
    let created = admin.create(actor, asset("BSK")).await.unwrap();

    log.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let mut renamed = asset("BSK");
    renamed.name = "Renamed".to_string();
    assert!(admin.update(actor, created.id, renamed).await.is_err());
    assert_eq!(admin.get::<Asset>(created.id).unwrap().name, "BSK token");

    assert!(admin.delete::<Asset>(actor, created.id).await.is_err());
    assert!(admin.get::<Asset>(created.id).is_ok());
}

#[derive(Default)]
struct SwitchableAuditLog {
    inner: InMemoryAuditLog,
    fail: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl AuditLog for SwitchableAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Internal("audit store unavailable".to_string()));
        }
        self.inner.record(entry).await
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.inner.list(filter).await
    }
}
