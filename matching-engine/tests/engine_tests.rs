use common::decimal::{dec, Price, Quantity};
use common::error::Error;
use common::model::order::{Order, Side, Status, TimeInForce};
use common::model::trade::FeeRates;
use matching_engine::{MatchingEngine, OrderFilter, OrderScope};
use uuid::Uuid;

const MARKET: &str = "BTC-USDT";

fn engine() -> MatchingEngine {
    let engine = MatchingEngine::new();
    engine.register_market(MARKET.to_string());
    engine
}

fn limit_order(user_id: Uuid, side: Side, price: Price, quantity: Quantity) -> Order {
    limit_with_tif(user_id, side, price, quantity, TimeInForce::GTC)
}

fn limit_with_tif(user_id: Uuid, side: Side, price: Price, quantity: Quantity, tif: TimeInForce) -> Order {
    let mut order = Order::new_limit(user_id, MARKET.to_string(), side, price, quantity, tif);
    order.locked_amount = order.required_lock();
    order
}

#[test]
fn test_register_market() {
    let engine = engine();
    assert!(engine.has_market(MARKET));
    assert_eq!(engine.markets(), vec![MARKET.to_string()]);

    let order = limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1));
    let mut unknown = order.clone();
    unknown.symbol = "ETH-USDT".to_string();
    assert!(matches!(engine.place_order(unknown), Err(Error::MarketNotFound(_))));
    assert!(engine.place_order(order).is_ok());
}

#[test]
fn test_place_limit_order_rests() {
    let engine = engine();
    let order = limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1));

    let result = engine.place_order(order.clone()).unwrap();
    assert!(result.trades.is_empty());
    assert!(result.maker_orders.is_empty());
    assert_eq!(result.taker_order.status, Status::Pending);
    assert_eq!(result.taker_release, dec!(0));

    let stored = engine.get_order(order.id).unwrap();
    assert_eq!(stored.locked_amount, dec!(100));

    let (bids, asks) = engine.get_market_depth(MARKET, 10).unwrap();
    assert_eq!(bids, vec![(dec!(100), dec!(1))]);
    assert!(asks.is_empty());
}

#[test]
fn test_full_match_executes_at_maker_price() {
    let engine = engine();
    let seller = Uuid::new_v4();
    let buyer = Uuid::new_v4();

    let ask = limit_order(seller, Side::Sell, dec!(100), dec!(1));
    engine.place_order(ask.clone()).unwrap();

    let bid = limit_order(buyer, Side::Buy, dec!(105), dec!(1));
    let result = engine.place_order(bid).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.price, dec!(100));
    assert_eq!(trade.quantity, dec!(1));
    assert_eq!(trade.buyer_id, buyer);
    assert_eq!(trade.seller_id, seller);
    assert_eq!(trade.taker_side, Side::Buy);

    assert_eq!(result.taker_order.status, Status::Filled);
    // Reserved 105, spent 100
    assert_eq!(result.taker_release, dec!(5));
    assert_eq!(result.taker_order.locked_amount, dec!(0));

    assert_eq!(result.maker_orders.len(), 1);
    assert_eq!(result.maker_orders[0].status, Status::Filled);
    assert_eq!(engine.get_order(ask.id).unwrap().status, Status::Filled);

    let top = engine.book_top(MARKET).unwrap();
    assert_eq!(top.last_price, Some(dec!(100)));
    assert_eq!(top.open_orders, 0);
}

#[test]
fn test_partial_fill_updates_maker() {
    let engine = engine();
    let ask = limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(5));
    engine.place_order(ask.clone()).unwrap();

    let bid = limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(2));
    let result = engine.place_order(bid).unwrap();
    assert_eq!(result.taker_order.status, Status::Filled);

    let maker = engine.get_order(ask.id).unwrap();
    assert_eq!(maker.status, Status::PartiallyFilled);
    assert_eq!(maker.remaining_quantity, dec!(3));
    assert_eq!(maker.filled_quantity, dec!(2));
    assert_eq!(maker.locked_amount, dec!(3));

    let (_, asks) = engine.get_market_depth(MARKET, 10).unwrap();
    assert_eq!(asks, vec![(dec!(100), dec!(3))]);
}

#[test]
fn test_taker_walks_levels_and_rests_remainder() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1))).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(101), dec!(1))).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(110), dec!(1))).unwrap();

    let bid = limit_order(Uuid::new_v4(), Side::Buy, dec!(102), dec!(3));
    let result = engine.place_order(bid).unwrap();

    let prices: Vec<Price> = result.trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![dec!(100), dec!(101)]);
    assert_eq!(result.taker_order.status, Status::PartiallyFilled);
    assert_eq!(result.taker_order.remaining_quantity, dec!(1));
    assert_eq!(result.taker_order.average_fill_price, Some(dec!(100.5)));
    // 306 reserved, 201 spent, 102 kept for the resting unit
    assert_eq!(result.taker_release, dec!(3));
    assert_eq!(result.taker_order.locked_amount, dec!(102));

    let top = engine.book_top(MARKET).unwrap();
    assert_eq!(top.best_bid, Some(dec!(102)));
    assert_eq!(top.best_ask, Some(dec!(110)));
}

#[test]
fn test_time_priority_at_same_price() {
    let engine = engine();
    let first = limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1));
    let second = limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1));
    engine.place_order(first.clone()).unwrap();
    engine.place_order(second.clone()).unwrap();

    let result = engine
        .place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1)))
        .unwrap();
    assert_eq!(result.trades[0].seller_order_id, first.id);
    assert_eq!(engine.get_order(second.id).unwrap().status, Status::Pending);
}

#[test]
fn test_no_cross_leaves_both_resting() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(101), dec!(1))).unwrap();
    let result = engine
        .place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1)))
        .unwrap();

    assert!(result.trades.is_empty());
    let top = engine.book_top(MARKET).unwrap();
    assert_eq!(top.best_bid, Some(dec!(100)));
    assert_eq!(top.best_ask, Some(dec!(101)));
    assert_eq!(top.open_orders, 2);
}

#[test]
fn test_market_order_without_liquidity_fails() {
    let engine = engine();
    let order = Order::new_market(Uuid::new_v4(), MARKET.to_string(), Side::Sell, dec!(1));
    assert!(matches!(engine.place_order(order), Err(Error::ValidationError(_))));
}

#[test]
fn test_market_sell_cancels_unfilled_remainder() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1))).unwrap();

    let mut order = Order::new_market(Uuid::new_v4(), MARKET.to_string(), Side::Sell, dec!(3));
    order.locked_amount = dec!(3);
    let result = engine.place_order(order).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.taker_order.status, Status::Cancelled);
    assert_eq!(result.taker_order.filled_quantity, dec!(1));
    assert_eq!(result.taker_release, dec!(2));
    assert_eq!(engine.book_top(MARKET).unwrap().open_orders, 0);
}

#[test]
fn test_market_buy_is_capped_by_reserved_quote() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1))).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(200), dec!(1))).unwrap();

    assert_eq!(
        engine.estimate_market_buy_cost(MARKET, dec!(2)).unwrap(),
        Some(dec!(300))
    );

    // Only 200 reserved: one unit at 100, then half a unit at 200
    let mut order = Order::new_market(Uuid::new_v4(), MARKET.to_string(), Side::Buy, dec!(2));
    order.locked_amount = dec!(200);
    let result = engine.place_order(order).unwrap();

    let spent: Quantity = result.trades.iter().map(|t| t.amount).sum();
    assert!(spent <= dec!(200));
    assert_eq!(result.taker_order.filled_quantity, dec!(1.5));
    assert_eq!(result.taker_release, dec!(200) - spent);
}

#[test]
fn test_ioc_limit_does_not_rest() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1))).unwrap();

    let order = limit_with_tif(Uuid::new_v4(), Side::Buy, dec!(100), dec!(2), TimeInForce::IOC);
    let result = engine.place_order(order.clone()).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.taker_order.status, Status::Cancelled);
    assert_eq!(result.taker_release, dec!(100));
    assert!(engine.book_top(MARKET).unwrap().best_bid.is_none());
}

#[test]
fn test_fok_rejected_without_touching_book() {
    let engine = engine();
    let ask = limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1));
    engine.place_order(ask.clone()).unwrap();

    let order = limit_with_tif(Uuid::new_v4(), Side::Buy, dec!(100), dec!(2), TimeInForce::FOK);
    assert!(matches!(engine.place_order(order.clone()), Err(Error::InvalidOrder(_))));
    assert!(engine.get_order(order.id).is_none());
    assert_eq!(engine.get_order(ask.id).unwrap().remaining_quantity, dec!(1));

    let order = limit_with_tif(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1), TimeInForce::FOK);
    let result = engine.place_order(order).unwrap();
    assert_eq!(result.taker_order.status, Status::Filled);
}

#[test]
fn test_fok_market_buy_respects_reserved_quote() {
    let engine = engine();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1))).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(200), dec!(1))).unwrap();

    // Enough liquidity, but 250 only buys 1.75
    let mut order = Order::new_market(Uuid::new_v4(), MARKET.to_string(), Side::Buy, dec!(2));
    order.time_in_force = TimeInForce::FOK;
    order.locked_amount = dec!(250);
    assert!(matches!(engine.place_order(order.clone()), Err(Error::InvalidOrder(_))));
    assert!(engine.get_order(order.id).is_none());
    assert_eq!(engine.get_market_depth(MARKET, 10).unwrap().1.len(), 2);

    let mut order = Order::new_market(Uuid::new_v4(), MARKET.to_string(), Side::Buy, dec!(2));
    order.time_in_force = TimeInForce::FOK;
    order.locked_amount = dec!(300);
    let result = engine.place_order(order).unwrap();
    assert_eq!(result.taker_order.status, Status::Filled);
    assert_eq!(result.taker_release, dec!(0));
}

#[test]
fn test_changes_return_the_book_they_produced() {
    let engine = MatchingEngine::with_snapshot_depth(1);
    engine.register_market(MARKET.to_string());
    let owner = Uuid::new_v4();

    let first = engine.place_order(limit_order(owner, Side::Sell, dec!(101), dec!(1))).unwrap();
    assert_eq!(first.book.asks, vec![(dec!(101), dec!(1))]);

    let ask = limit_order(owner, Side::Sell, dec!(100), dec!(2));
    let second = engine.place_order(ask.clone()).unwrap();
    assert!(second.book.sequence > first.book.sequence);
    assert_eq!(second.book.asks, vec![(dec!(100), dec!(2))]);

    let third = engine.place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(0.5))).unwrap();
    assert_eq!(third.book.asks, vec![(dec!(100), dec!(1.5))]);
    assert!(third.book.bids.is_empty());

    let cancellation = engine.cancel_order(ask.id, owner).unwrap();
    assert!(cancellation.book.sequence > third.book.sequence);
    assert_eq!(cancellation.book.asks, vec![(dec!(101), dec!(1))]);
}

#[test]
fn test_cancel_order() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let order = limit_order(owner, Side::Buy, dec!(100), dec!(2));
    engine.place_order(order.clone()).unwrap();

    assert!(matches!(
        engine.cancel_order(order.id, Uuid::new_v4()),
        Err(Error::AuthorizationError(_))
    ));
    assert!(matches!(
        engine.cancel_order(Uuid::new_v4(), owner),
        Err(Error::OrderNotFound(_))
    ));

    let cancellation = engine.cancel_order(order.id, owner).unwrap();
    assert_eq!(cancellation.unlocked, dec!(200));
    assert_eq!(cancellation.order.status, Status::Cancelled);
    assert_eq!(cancellation.order.locked_amount, dec!(0));
    assert!(engine.book_top(MARKET).unwrap().best_bid.is_none());

    // Second cancel is rejected
    assert!(matches!(engine.cancel_order(order.id, owner), Err(Error::InvalidOrder(_))));
}

#[test]
fn test_cancel_partially_filled_unlocks_remainder() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let ask = limit_order(owner, Side::Sell, dec!(100), dec!(3));
    engine.place_order(ask.clone()).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1))).unwrap();

    let cancellation = engine.cancel_order(ask.id, owner).unwrap();
    assert_eq!(cancellation.unlocked, dec!(2));
    assert_eq!(cancellation.order.filled_quantity, dec!(1));
}

#[test]
fn test_order_history_filters() {
    let engine = engine();
    let user = Uuid::new_v4();
    let open = limit_order(user, Side::Buy, dec!(90), dec!(1));
    engine.place_order(open.clone()).unwrap();

    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1))).unwrap();
    let filled = limit_order(user, Side::Buy, dec!(100), dec!(1));
    engine.place_order(filled.clone()).unwrap();

    let all = engine.orders_for_user(user, &OrderFilter::default());
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, filled.id);

    let open_orders = engine.orders_for_user(
        user,
        &OrderFilter { scope: OrderScope::Open, ..Default::default() },
    );
    assert_eq!(open_orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![open.id]);

    let closed = engine.orders_for_user(
        user,
        &OrderFilter { scope: OrderScope::Closed, ..Default::default() },
    );
    assert_eq!(closed.iter().map(|o| o.id).collect::<Vec<_>>(), vec![filled.id]);

    let trades = engine.trades_for_user(user, Some(MARKET), 10).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(engine.trade_count().unwrap(), 1);
}

#[test]
fn test_unregister_market_requires_empty_book() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let order = limit_order(owner, Side::Sell, dec!(100), dec!(1));
    engine.place_order(order.clone()).unwrap();

    assert!(engine.unregister_market(MARKET).is_err());
    engine.cancel_order(order.id, owner).unwrap();
    assert!(engine.unregister_market(MARKET).is_ok());
    assert!(!engine.has_market(MARKET));
}

#[test]
fn test_quantity_conserved_across_fills() {
    let engine = engine();
    let mut resting = Vec::new();
    for i in 0..5 {
        let ask = limit_order(Uuid::new_v4(), Side::Sell, dec!(100) + Price::from(i), dec!(0.7));
        engine.place_order(ask.clone()).unwrap();
        resting.push(ask.id);
    }

    let result = engine
        .place_order(limit_order(Uuid::new_v4(), Side::Buy, dec!(104), dec!(2.5)))
        .unwrap();

    let traded: Quantity = result.trades.iter().map(|t| t.quantity).sum();
    assert_eq!(traded, dec!(2.5));
    assert_eq!(result.taker_order.filled_quantity, traded);

    let maker_filled: Quantity = resting
        .iter()
        .filter_map(|id| engine.get_order(*id))
        .map(|o| o.filled_quantity)
        .sum();
    assert_eq!(maker_filled, traded);
}

#[test]
fn test_counts_and_liquidity_queries() {
    let engine = engine();
    engine.register_market("ETH-USDT".to_string());
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(2))).unwrap();
    engine.place_order(limit_order(Uuid::new_v4(), Side::Sell, dec!(105), dec!(1))).unwrap();

    let mut eth = Order::new_limit(Uuid::new_v4(), "ETH-USDT".to_string(), Side::Buy, dec!(10), dec!(1), TimeInForce::GTC);
    eth.locked_amount = eth.required_lock();
    engine.place_order(eth).unwrap();

    assert_eq!(engine.open_order_count(Some(MARKET)).unwrap(), 2);
    assert_eq!(engine.open_order_count(None).unwrap(), 3);
    assert_eq!(engine.order_count(), 3);
    assert_eq!(engine.best_ask(MARKET).unwrap(), Some(dec!(100)));
    assert_eq!(engine.best_bid(MARKET).unwrap(), None);
    assert_eq!(engine.fillable_quantity(MARKET, Side::Buy, Some(dec!(100))).unwrap(), dec!(2));
    assert_eq!(engine.fillable_quantity(MARKET, Side::Buy, None).unwrap(), dec!(3));
}

#[test]
fn test_fee_rates_are_charged_on_trades() {
    let engine = engine();
    let rates = FeeRates { maker: dec!(0.001), taker: dec!(0.002) };
    engine
        .place_order_with_fees(limit_order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(1)), &rates)
        .unwrap();

    let result = engine
        .place_order_with_fees(limit_order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(1)), &rates)
        .unwrap();
    let trade = &result.trades[0];
    assert_eq!(trade.buyer_fee, dec!(0.002));
    assert_eq!(trade.seller_fee, dec!(0.1));
}
