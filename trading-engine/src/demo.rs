//! Demo data for local runs

use api_gateway::config::AppConfig;
use api_gateway::exchange::{Exchange, PlaceOrderRequest};
use common::decimal::{dec, Price, Quantity};
use common::error::Result;
use common::model::account::KycStatus;
use common::model::admin::{Asset, FeeConfig};
use common::model::market::Market;
use common::model::order::{OrderType, Side};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn limit(symbol: &str, side: Side, price: Price, quantity: Quantity) -> PlaceOrderRequest {
    PlaceOrderRequest {
        symbol: Some(symbol.to_string()),
        side: Some(side),
        order_type: Some(OrderType::Limit),
        quantity: Some(quantity),
        price: Some(price),
        time_in_force: None,
    }
}

/// List BTC, USDT and BSK with two markets, fund two accounts and leave a
/// few resting orders and one trade behind
pub async fn seed(exchange: &Exchange, config: &AppConfig) -> Result<()> {
    let actor = config.admin_ids.iter().next().copied().unwrap_or(Uuid::nil());
    let admin = exchange.admin();

    for (symbol, name, fee) in [("BTC", "Bitcoin", "0.0005"), ("USDT", "Tether USD", "1"), ("BSK", "Bitstake", "5")] {
        let asset: Asset = serde_json::from_value(json!({
            "symbol": symbol,
            "name": name,
            "withdraw_fee": fee
        }))?;
        admin.create(actor, asset).await?;
    }

    for (symbol, base, tick, step, min) in [
        ("BTC-USDT", "BTC", "0.01", "0.0001", "10"),
        ("BSK-USDT", "BSK", "0.0001", "1", "1"),
    ] {
        let market: Market = serde_json::from_value(json!({
            "symbol": symbol,
            "base_asset": base,
            "quote_asset": "USDT",
            "price_tick": tick,
            "quantity_step": step,
            "min_order_size": min
        }))?;
        exchange.create_market(actor, market).await?;
    }

    let fees: FeeConfig = serde_json::from_value(json!({
        "symbol": "BTC-USDT",
        "maker_fee_rate": "0.001",
        "taker_fee_rate": "0.002"
    }))?;
    admin.create(actor, fees).await?;

    let alice = exchange.create_account().await?;
    let bob = exchange.create_account().await?;
    info!("Created demo accounts: Alice = {}, Bob = {}", alice.id, bob.id);

    for account in [alice.id, bob.id] {
        exchange.deposit(account, "USDT", dec!(100000)).await?;
        exchange.deposit(account, "BTC", dec!(10)).await?;
        exchange.deposit(account, "BSK", dec!(50000)).await?;
    }
    exchange.set_kyc_status(actor, alice.id, KycStatus::Verified).await?;

    for (price, quantity) in [(dec!(20000), dec!(1)), (dec!(19500), dec!(1))] {
        exchange.place_order(alice.id, limit("BTC-USDT", Side::Buy, price, quantity)).await?;
    }
    for (price, quantity) in [(dec!(21000), dec!(1)), (dec!(21500), dec!(1))] {
        exchange.place_order(bob.id, limit("BTC-USDT", Side::Sell, price, quantity)).await?;
    }
    exchange.place_order(bob.id, limit("BSK-USDT", Side::Sell, dec!(0.25), dec!(1000))).await?;

    // Crosses Bob's best ask
    let placement = exchange
        .place_order(alice.id, limit("BTC-USDT", Side::Buy, dec!(21000), dec!(0.5)))
        .await?;
    info!("Generated {} trades", placement.trades.len());

    info!("Demo data created successfully");
    Ok(())
}
