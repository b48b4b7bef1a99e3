use std::sync::Arc;

use account_service::AccountService;
use common::decimal::{dec, Amount, Price, Quantity};
use common::error::Error;
use common::model::account::KycStatus;
use common::model::market::Market;
use common::model::order::{Order, Side, TimeInForce};
use common::model::trade::Trade;
use uuid::Uuid;

fn btc_usdt() -> Market {
    serde_json::from_value(serde_json::json!({
        "symbol": "BTC-USDT",
        "base_asset": "BTC",
        "quote_asset": "USDT",
        "price_tick": "0.01",
        "quantity_step": "0.0001"
    }))
    .unwrap()
}

fn trade(buyer: Uuid, seller: Uuid, price: Price, quantity: Quantity) -> Trade {
    let taker = Order::new_limit(buyer, "BTC-USDT".to_string(), Side::Buy, price, quantity, TimeInForce::GTC);
    let maker = Order::new_limit(seller, "BTC-USDT".to_string(), Side::Sell, price, quantity, TimeInForce::GTC);
    Trade::between(&taker, &maker, price, quantity)
}

async fn funded_account(service: &AccountService, asset: &str, amount: Amount) -> Uuid {
    let account = service.create_account().await.unwrap();
    service.deposit(account.id, asset, amount).await.unwrap();
    account.id
}

#[tokio::test]
async fn test_create_and_fetch_account() {
    let service = AccountService::new();
    let account = service.create_account().await.unwrap();
    assert_eq!(account.kyc_status, KycStatus::Unverified);

    let fetched = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, account.id);
    assert!(service.get_account(Uuid::new_v4()).await.unwrap().is_none());

    // ensure_account is idempotent
    let fee = Uuid::new_v4();
    service.ensure_account(fee).await.unwrap();
    service.ensure_account(fee).await.unwrap();
    assert_eq!(service.account_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_deposit_requires_account_and_positive_amount() {
    let service = AccountService::new();
    assert!(matches!(
        service.deposit(Uuid::new_v4(), "USDT", dec!(10)).await,
        Err(Error::AccountNotFound(_))
    ));

    let account = service.create_account().await.unwrap();
    assert!(matches!(
        service.deposit(account.id, "USDT", dec!(0)).await,
        Err(Error::ValidationError(_))
    ));

    let balance = service.deposit(account.id, "USDT", dec!(10)).await.unwrap();
    assert_eq!(balance.total, dec!(10));
    assert_eq!(balance.available, dec!(10));
}

#[tokio::test]
async fn test_reserve_and_release_are_exact_inverses() {
    let service = AccountService::new();
    let user = funded_account(&service, "USDT", dec!(1000)).await;

    let reserved = service.reserve(user, "USDT", dec!(250.5)).await.unwrap();
    assert_eq!(reserved.available, dec!(749.5));
    assert_eq!(reserved.locked, dec!(250.5));
    assert_eq!(reserved.total, dec!(1000));

    let released = service.release(user, "USDT", dec!(250.5)).await.unwrap();
    assert_eq!(released.available, dec!(1000));
    assert_eq!(released.locked, dec!(0));

    assert!(matches!(
        service.reserve(user, "USDT", dec!(1000.01)).await,
        Err(Error::InsufficientBalance(_))
    ));
    // Nothing changed on failure
    let balance = service.get_balance(user, "USDT").await.unwrap();
    assert_eq!(balance.available, dec!(1000));
}

#[tokio::test]
async fn test_release_all_reservations_returns_locked_funds() {
    let service = AccountService::new();
    let user = funded_account(&service, "USDT", dec!(1000)).await;
    let other = funded_account(&service, "BTC", dec!(2)).await;
    service.reserve(user, "USDT", dec!(400)).await.unwrap();
    service.reserve(other, "BTC", dec!(0.5)).await.unwrap();

    assert_eq!(service.release_all_reservations().await.unwrap(), 2);

    let balance = service.get_balance(user, "USDT").await.unwrap();
    assert_eq!((balance.total, balance.available, balance.locked), (dec!(1000), dec!(1000), dec!(0)));
    let balance = service.get_balance(other, "BTC").await.unwrap();
    assert_eq!((balance.total, balance.available, balance.locked), (dec!(2), dec!(2), dec!(0)));

    assert_eq!(service.release_all_reservations().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reserve_without_balance_fails() {
    let service = AccountService::new();
    let account = service.create_account().await.unwrap();
    assert!(matches!(
        service.reserve(account.id, "BTC", dec!(1)).await,
        Err(Error::InsufficientBalance(_))
    ));
}

#[tokio::test]
async fn test_withdraw_requires_kyc_and_pays_fee() {
    let service = AccountService::new();
    let fee_account = service.ensure_account(Uuid::new_v4()).await.unwrap().id;
    let user = funded_account(&service, "USDT", dec!(100)).await;

    assert!(matches!(
        service.withdraw(user, "USDT", dec!(50), dec!(1), fee_account).await,
        Err(Error::AuthorizationError(_))
    ));

    service.set_kyc_status(user, KycStatus::Verified).await.unwrap();
    let balance = service.withdraw(user, "USDT", dec!(50), dec!(1), fee_account).await.unwrap();
    assert_eq!(balance.total, dec!(50));
    assert_eq!(service.get_balance(fee_account, "USDT").await.unwrap().total, dec!(1));

    assert!(matches!(
        service.withdraw(user, "USDT", dec!(60), dec!(1), fee_account).await,
        Err(Error::InsufficientBalance(_))
    ));
    assert!(matches!(
        service.withdraw(user, "USDT", dec!(1), dec!(1), fee_account).await,
        Err(Error::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_settle_trade_moves_funds_and_fees() {
    let service = AccountService::new();
    let market = btc_usdt();
    let fee_account = service.ensure_account(Uuid::new_v4()).await.unwrap().id;
    let buyer = funded_account(&service, "USDT", dec!(10000)).await;
    let seller = funded_account(&service, "BTC", dec!(2)).await;

    service.reserve(buyer, "USDT", dec!(5000)).await.unwrap();
    service.reserve(seller, "BTC", dec!(1)).await.unwrap();

    let mut trade = trade(buyer, seller, dec!(5000), dec!(1));
    trade.buyer_fee = dec!(0.001);
    trade.seller_fee = dec!(5);
    service.settle_trade(&trade, &market, fee_account).await.unwrap();

    let buyer_usdt = service.get_balance(buyer, "USDT").await.unwrap();
    assert_eq!(buyer_usdt.total, dec!(5000));
    assert_eq!(buyer_usdt.locked, dec!(0));
    assert_eq!(service.get_balance(buyer, "BTC").await.unwrap().available, dec!(0.999));

    let seller_btc = service.get_balance(seller, "BTC").await.unwrap();
    assert_eq!(seller_btc.total, dec!(1));
    assert_eq!(seller_btc.locked, dec!(0));
    assert_eq!(service.get_balance(seller, "USDT").await.unwrap().available, dec!(4995));

    assert_eq!(service.get_balance(fee_account, "BTC").await.unwrap().total, dec!(0.001));
    assert_eq!(service.get_balance(fee_account, "USDT").await.unwrap().total, dec!(5));

    // Totals per asset are conserved
    let mut usdt = Amount::ZERO;
    let mut btc = Amount::ZERO;
    for id in [buyer, seller, fee_account] {
        usdt += service.get_balance(id, "USDT").await.unwrap().total;
        btc += service.get_balance(id, "BTC").await.unwrap().total;
    }
    assert_eq!(usdt, dec!(10000));
    assert_eq!(btc, dec!(2));
}

#[tokio::test]
async fn test_settle_trade_requires_reservation() {
    let service = AccountService::new();
    let market = btc_usdt();
    let fee_account = service.ensure_account(Uuid::new_v4()).await.unwrap().id;
    let buyer = funded_account(&service, "USDT", dec!(10000)).await;
    let seller = funded_account(&service, "BTC", dec!(2)).await;

    let trade = trade(buyer, seller, dec!(5000), dec!(1));
    assert!(matches!(
        service.settle_trade(&trade, &market, fee_account).await,
        Err(Error::InsufficientBalance(_))
    ));
    // No partial writes
    assert_eq!(service.get_balance(seller, "BTC").await.unwrap().total, dec!(2));
    assert_eq!(service.get_balance(buyer, "BTC").await.unwrap().total, dec!(0));
}

#[tokio::test]
async fn test_self_trade_settles_to_no_change() {
    let service = AccountService::new();
    let market = btc_usdt();
    let fee_account = service.ensure_account(Uuid::new_v4()).await.unwrap().id;
    let user = funded_account(&service, "USDT", dec!(1000)).await;
    service.deposit(user, "BTC", dec!(1)).await.unwrap();

    service.reserve(user, "USDT", dec!(100)).await.unwrap();
    service.reserve(user, "BTC", dec!(1)).await.unwrap();
    service
        .settle_trade(&trade(user, user, dec!(100), dec!(1)), &market, fee_account)
        .await
        .unwrap();

    let usdt = service.get_balance(user, "USDT").await.unwrap();
    let btc = service.get_balance(user, "BTC").await.unwrap();
    assert_eq!((usdt.total, usdt.locked), (dec!(1000), dec!(0)));
    assert_eq!((btc.total, btc.locked), (dec!(1), dec!(0)));
}

#[tokio::test]
async fn test_concurrent_reservations_never_overdraw() {
    let service = Arc::new(AccountService::new());
    let user = funded_account(&service, "USDT", dec!(100)).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.reserve(user, "USDT", dec!(10)).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 10);
    let balance = service.get_balance(user, "USDT").await.unwrap();
    assert_eq!(balance.available, dec!(0));
    assert_eq!(balance.locked, dec!(100));
}
