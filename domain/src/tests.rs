use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::amount::MAX_AMOUNT;
use crate::core::CoinTracker;
use crate::enrichment::{EnrichedHolding, enrich_holdings};
use crate::error::TrackerError;
use crate::holding::{HoldingRepoExt, HoldingSortColumn, HoldingUpdate, NewHolding};
use crate::market_data::{PriceMap, PriceSnapshot, StaticPriceProvider};
use crate::portfolio::{NewPortfolio, Portfolio, PortfolioUpdate};
use crate::sort::Sort;
use crate::transaction::{NewTransaction, TransactionType};
use crate::trend::Trend;
use crate::user::UserId;
use crate::watchlist::{NewWatchlistItem, WatchlistItemUpdate, WatchlistSortColumn};
use crate::SortDirection;

struct Fixture {
    tracker: CoinTracker,
    prices: Arc<StaticPriceProvider>,
    user: UserId,
}

fn fixture() -> Fixture {
    let prices = Arc::new(StaticPriceProvider::with_prices([
        PriceSnapshot::new("BTC", dec!(50000)).with_changes(dec!(0.1), dec!(2.5), dec!(4)),
        PriceSnapshot::new("ETH", dec!(3500)).with_changes(dec!(-0.2), dec!(-2.5), dec!(1)),
    ]));
    let tracker = CoinTracker::in_memory(prices.clone());
    Fixture {
        tracker,
        prices,
        user: Uuid::new_v4(),
    }
}

fn new_holding(symbol: &str, quantity: Decimal, average_cost: Decimal) -> NewHolding {
    NewHolding {
        symbol: symbol.to_string(),
        name: format!("{symbol} coin"),
        quantity,
        average_cost,
        notes: None,
    }
}

fn new_item(symbol: &str) -> NewWatchlistItem {
    NewWatchlistItem {
        symbol: symbol.to_string(),
        name: format!("{symbol} coin"),
        notes: None,
    }
}

fn buy(quantity: Decimal, price: Decimal) -> NewTransaction {
    NewTransaction {
        transaction_type: TransactionType::Buy,
        quantity,
        price_per_unit: price,
        fee: None,
        transaction_date: None,
        notes: None,
    }
}

impl Fixture {
    async fn portfolio(&self, name: &str) -> Portfolio {
        self.tracker
            .portfolios
            .create_portfolio(
                &self.user,
                NewPortfolio {
                    name: name.to_string(),
                    ..NewPortfolio::default()
                },
            )
            .await
            .unwrap()
    }

    async fn scenario_a(&self) -> Portfolio {
        let portfolio = self.portfolio("Main").await;
        for (symbol, quantity, cost) in [("BTC", dec!(2), dec!(50000)), ("ETH", dec!(10), dec!(3000))] {
            self.tracker
                .holdings
                .add_holding(&self.user, &portfolio.id, new_holding(symbol, quantity, cost))
                .await
                .unwrap();
        }
        portfolio
    }
}

fn by_symbol<'a>(holdings: &'a [EnrichedHolding], symbol: &str) -> &'a EnrichedHolding {
    holdings
        .iter()
        .find(|h| h.holding.symbol == symbol)
        .unwrap()
}

#[tokio::test]
async fn test_scenario_a_values_and_allocation() {
    let f = fixture();
    let portfolio = f.scenario_a().await;

    let holdings = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await
        .unwrap();

    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings[0].holding.symbol, "BTC");
    assert_eq!(holdings[1].holding.symbol, "ETH");

    let btc = by_symbol(&holdings, "BTC");
    assert_eq!(btc.current_value, dec!(100000));
    assert_eq!(btc.gain_loss, dec!(0));
    assert_eq!(btc.gain_loss_percentage, dec!(0));
    assert_eq!(btc.market.trend, Trend::Up);
    assert_eq!(btc.allocation_percentage.round_dp(2), dec!(74.07));

    let eth = by_symbol(&holdings, "ETH");
    assert_eq!(eth.current_value, dec!(35000));
    assert_eq!(eth.cost_basis, dec!(30000));
    assert_eq!(eth.gain_loss, dec!(5000));
    assert_eq!(eth.gain_loss_percentage.round_dp(4), dec!(16.6667));
    assert_eq!(eth.market.trend, Trend::Down);
    assert_eq!(eth.allocation_percentage.round_dp(2), dec!(25.93));

    let total = f
        .tracker
        .holdings
        .get_total_value(&f.user, &portfolio.id)
        .await
        .unwrap();
    assert_eq!(total, dec!(135000));

    let allocation: Decimal = holdings.iter().map(|h| h.allocation_percentage).sum();
    assert!((allocation - dec!(100)).abs() < dec!(0.000001));
}

#[tokio::test]
async fn test_scenario_b_missing_price_degrades_to_zero() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    f.prices.remove_price("ETH");

    let holdings = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await
        .unwrap();

    assert_eq!(holdings.len(), 2);
    let eth = by_symbol(&holdings, "ETH");
    assert_eq!(eth.market.current_price, dec!(0));
    assert_eq!(eth.market.change_24h, dec!(0));
    assert_eq!(eth.market.market_cap, dec!(0));
    assert_eq!(eth.market.trend, Trend::Neutral);
    assert_eq!(eth.current_value, dec!(0));
    assert_eq!(eth.allocation_percentage, dec!(0));

    let btc = by_symbol(&holdings, "BTC");
    assert_eq!(btc.market.current_price, dec!(50000));
    assert_eq!(btc.allocation_percentage, dec!(100));
}

#[tokio::test]
async fn test_scenario_d_symbol_normalisation() {
    let f = fixture();
    let item = f
        .tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("btc"))
        .await
        .unwrap();
    assert_eq!(item.symbol, "BTC");
    assert!(f.tracker.watchlist.is_in_watchlist(&f.user, "btc").await.unwrap());
    assert!(f.tracker.watchlist.is_in_watchlist(&f.user, " BTC ").await.unwrap());
    assert!(!f.tracker.watchlist.is_in_watchlist(&f.user, "eth").await.unwrap());
    assert!(
        !f.tracker
            .watchlist
            .is_in_watchlist(&Uuid::new_v4(), "btc")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_empty_collections_make_no_market_call() {
    let f = fixture();
    let portfolio = f.portfolio("Empty").await;

    let watchlist = f.tracker.watchlist.get_watchlist(&f.user, None).await.unwrap();
    let holdings = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await
        .unwrap();
    let total = f
        .tracker
        .holdings
        .get_total_value(&f.user, &portfolio.id)
        .await
        .unwrap();

    assert!(watchlist.is_empty());
    assert!(holdings.is_empty());
    assert_eq!(total, dec!(0));
    assert_eq!(f.prices.call_count(), 0);
}

#[tokio::test]
async fn test_watchlist_enrichment_keeps_order_and_batches() {
    let f = fixture();
    for symbol in ["eth", "DOGE", "btc"] {
        f.tracker
            .watchlist
            .add_to_watchlist(&f.user, new_item(symbol))
            .await
            .unwrap();
    }

    let items = f.tracker.watchlist.get_watchlist(&f.user, None).await.unwrap();
    let symbols: Vec<&str> = items.iter().map(|i| i.item.symbol.as_str()).collect();
    assert_eq!(symbols, ["ETH", "DOGE", "BTC"]);
    assert_eq!(f.prices.call_count(), 1);

    assert_eq!(items[0].market.trend, Trend::Down);
    assert_eq!(items[1].market.current_price, dec!(0));
    assert_eq!(items[1].market.trend, Trend::Neutral);
    assert_eq!(items[2].market.current_price, dec!(50000));

    let sorted = f
        .tracker
        .watchlist
        .get_watchlist(&f.user, Some(Sort::desc(WatchlistSortColumn::Symbol)))
        .await
        .unwrap();
    let symbols: Vec<&str> = sorted.iter().map(|i| i.item.symbol.as_str()).collect();
    assert_eq!(symbols, ["ETH", "DOGE", "BTC"]);

    let sorted = f
        .tracker
        .watchlist
        .get_watchlist(&f.user, Some(Sort::asc(WatchlistSortColumn::Symbol)))
        .await
        .unwrap();
    let symbols: Vec<&str> = sorted.iter().map(|i| i.item.symbol.as_str()).collect();
    assert_eq!(symbols, ["BTC", "DOGE", "ETH"]);
}

#[tokio::test]
async fn test_enrichment_is_idempotent() {
    let f = fixture();
    let portfolio = f.scenario_a().await;

    let first = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await
        .unwrap();
    let second = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_upstream_failure_fails_whole_batch() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    f.tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("BTC"))
        .await
        .unwrap();
    f.prices.set_failing(true);

    let holdings = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await;
    assert!(matches!(holdings, Err(TrackerError::UpstreamUnavailable(_))));

    let watchlist = f.tracker.watchlist.get_watchlist(&f.user, None).await;
    assert!(matches!(watchlist, Err(TrackerError::UpstreamUnavailable(_))));
}

#[test]
fn test_zero_cost_basis_reports_zero_gain_percentage() {
    let f = fixture();
    let now = chrono::Utc::now();
    let holding = crate::holding::Holding {
        id: Uuid::new_v4(),
        portfolio_id: Uuid::new_v4(),
        symbol: "BTC".to_string(),
        name: "Airdrop".to_string(),
        quantity: dec!(1),
        average_cost: dec!(0),
        notes: None,
        created_at: now,
        updated_at: now,
    };
    let mut prices = PriceMap::new();
    prices.insert("BTC".to_string(), PriceSnapshot::new("BTC", dec!(100)));

    let enriched =
        enrich_holdings(vec![holding], &prices, f.tracker.market_data.trend_threshold()).unwrap();
    assert_eq!(enriched[0].cost_basis, dec!(0));
    assert_eq!(enriched[0].gain_loss, dec!(100));
    assert_eq!(enriched[0].gain_loss_percentage, dec!(0));
    assert_eq!(enriched[0].allocation_percentage, dec!(100));
}

#[tokio::test]
async fn test_holding_uniqueness_is_per_portfolio() {
    let f = fixture();
    let main = f.portfolio("Main").await;
    let other = f.portfolio("Other").await;

    f.tracker
        .holdings
        .add_holding(&f.user, &main.id, new_holding("BTC", dec!(1), dec!(1)))
        .await
        .unwrap();
    let duplicate = f
        .tracker
        .holdings
        .add_holding(&f.user, &main.id, new_holding("btc", dec!(2), dec!(2)))
        .await;
    assert!(matches!(
        duplicate,
        Err(TrackerError::AlreadyExists { ref key, .. }) if key == "BTC"
    ));

    f.tracker
        .holdings
        .add_holding(&f.user, &other.id, new_holding("BTC", dec!(2), dec!(2)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_watchlist_duplicate_is_already_exists() {
    let f = fixture();
    f.tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("ETH"))
        .await
        .unwrap();
    let duplicate = f
        .tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("eth"))
        .await;
    assert!(matches!(duplicate, Err(TrackerError::AlreadyExists { .. })));

    // another user may watch the same symbol
    f.tracker
        .watchlist
        .add_to_watchlist(&Uuid::new_v4(), new_item("ETH"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_foreign_watchlist_item_is_unauthorized() {
    let f = fixture();
    let item = f
        .tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("BTC"))
        .await
        .unwrap();
    let intruder = Uuid::new_v4();

    let result = f
        .tracker
        .watchlist
        .remove_from_watchlist(&intruder, &item.id)
        .await;
    assert!(matches!(result, Err(TrackerError::Unauthorized { .. })));
    assert!(f.tracker.store.watchlist.exists(&item.id).await.unwrap());

    let missing = f
        .tracker
        .watchlist
        .remove_from_watchlist(&f.user, &Uuid::new_v4())
        .await;
    assert!(matches!(missing, Err(TrackerError::NotFound { .. })));

    f.tracker
        .watchlist
        .remove_from_watchlist(&f.user, &item.id)
        .await
        .unwrap();
    assert!(!f.tracker.store.watchlist.exists(&item.id).await.unwrap());
}

#[tokio::test]
async fn test_update_watchlist_item() {
    let f = fixture();
    let item = f
        .tracker
        .watchlist
        .add_to_watchlist(&f.user, new_item("BTC"))
        .await
        .unwrap();

    let updated = f
        .tracker
        .watchlist
        .update_watchlist_item(
            &f.user,
            &item.id,
            WatchlistItemUpdate {
                name: None,
                notes: Some("buy the dip".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, item.name);
    assert_eq!(updated.notes.as_deref(), Some("buy the dip"));

    let foreign = f
        .tracker
        .watchlist
        .update_watchlist_item(&Uuid::new_v4(), &item.id, WatchlistItemUpdate::default())
        .await;
    assert!(matches!(foreign, Err(TrackerError::Unauthorized { .. })));
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let f = fixture();
    let portfolio = f.portfolio("Main").await;

    for input in [
        new_holding("BTC", dec!(0), dec!(1)),
        new_holding("BTC", dec!(-1), dec!(1)),
        new_holding("BTC", dec!(1), dec!(-1)),
        new_holding("   ", dec!(1), dec!(1)),
        new_holding("BT C", dec!(1), dec!(1)),
    ] {
        let result = f
            .tracker
            .holdings
            .add_holding(&f.user, &portfolio.id, input)
            .await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
    }

    let blank = f
        .tracker
        .portfolios
        .create_portfolio(
            &f.user,
            NewPortfolio {
                name: "  ".to_string(),
                ..NewPortfolio::default()
            },
        )
        .await;
    assert!(matches!(blank, Err(TrackerError::Validation(_))));
}

#[tokio::test]
async fn test_amounts_beyond_range_are_rejected() {
    let f = fixture();
    let portfolio = f.portfolio("Main").await;

    for input in [
        new_holding("BTC", MAX_AMOUNT + dec!(1), dec!(1)),
        new_holding("BTC", dec!(1), MAX_AMOUNT + dec!(1)),
    ] {
        let result = f
            .tracker
            .holdings
            .add_holding(&f.user, &portfolio.id, input)
            .await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
    }

    let full = f
        .tracker
        .holdings
        .add_holding(&f.user, &portfolio.id, new_holding("ETH", MAX_AMOUNT, dec!(1)))
        .await
        .unwrap();
    let topped_up = f
        .tracker
        .transactions
        .record_transaction(&f.user, &full.id, buy(dec!(1), dec!(1)))
        .await;
    assert!(matches!(topped_up, Err(TrackerError::Validation(_))));
    let history = f
        .tracker
        .transactions
        .list_transactions(&f.user, &full.id, None)
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_overflowing_stored_holding_fails_instead_of_panicking() {
    let f = fixture();
    let portfolio = f.portfolio("Main").await;
    let now = chrono::Utc::now();
    let holding = crate::holding::Holding {
        id: Uuid::new_v4(),
        portfolio_id: portfolio.id,
        symbol: "BTC".to_string(),
        name: "Bitcoin".to_string(),
        quantity: Decimal::MAX,
        average_cost: dec!(2),
        notes: None,
        created_at: now,
        updated_at: now,
    };
    f.tracker
        .store
        .holdings
        .insert(holding.id, holding)
        .await
        .unwrap();

    let holdings = f
        .tracker
        .holdings
        .list_holdings(&f.user, &portfolio.id, None)
        .await;
    assert!(matches!(holdings, Err(TrackerError::Validation(_))));

    let summary = f
        .tracker
        .portfolios
        .get_portfolio_summary(&f.user, &portfolio.id)
        .await;
    assert!(matches!(summary, Err(TrackerError::Validation(_))));

    let total = f
        .tracker
        .holdings
        .get_total_value(&f.user, &portfolio.id)
        .await;
    assert!(matches!(total, Err(TrackerError::Validation(_))));
}

#[tokio::test]
async fn test_partial_holding_update() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    let btc = f
        .tracker
        .store
        .holdings
        .find_by_symbol(&portfolio.id, "btc")
        .await
        .unwrap()
        .unwrap();

    let updated = f
        .tracker
        .holdings
        .update_holding(
            &f.user,
            &btc.id,
            HoldingUpdate {
                quantity: Some(dec!(3)),
                ..HoldingUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.quantity, dec!(3));
    assert_eq!(updated.average_cost, btc.average_cost);
    assert_eq!(updated.name, btc.name);
    assert!(updated.updated_at >= btc.updated_at);

    let missing = f
        .tracker
        .holdings
        .update_holding(&f.user, &Uuid::new_v4(), HoldingUpdate::default())
        .await;
    assert!(matches!(missing, Err(TrackerError::NotFound { .. })));
}

#[tokio::test]
async fn test_holdings_sort_and_symbols() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    f.tracker
        .holdings
        .add_holding(&f.user, &portfolio.id, new_holding("ADA", dec!(500), dec!(0.4)))
        .await
        .unwrap();

    let by_quantity = f
        .tracker
        .holdings
        .list_holdings(
            &f.user,
            &portfolio.id,
            Some(Sort::new(HoldingSortColumn::Quantity, SortDirection::Desc)),
        )
        .await
        .unwrap();
    let symbols: Vec<&str> = by_quantity.iter().map(|h| h.holding.symbol.as_str()).collect();
    assert_eq!(symbols, ["ADA", "ETH", "BTC"]);

    let symbols = f
        .tracker
        .holdings
        .get_symbols(&f.user, &portfolio.id)
        .await
        .unwrap();
    assert_eq!(symbols, ["BTC", "ETH", "ADA"]);
}

#[tokio::test]
async fn test_repository_total_value_treats_missing_price_as_zero() {
    let f = fixture();
    let portfolio = f.scenario_a().await;

    let mut prices = HashMap::new();
    prices.insert("BTC".to_string(), dec!(10));
    let total = f
        .tracker
        .store
        .holdings
        .get_total_value(&portfolio.id, &prices)
        .await
        .unwrap();
    assert_eq!(total, dec!(20));

    let nobody = f
        .tracker
        .store
        .holdings
        .get_total_value(&Uuid::new_v4(), &prices)
        .await
        .unwrap();
    assert_eq!(nobody, dec!(0));
}

#[tokio::test]
async fn test_foreign_portfolio_access() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    let intruder = Uuid::new_v4();

    let holdings = f
        .tracker
        .holdings
        .list_holdings(&intruder, &portfolio.id, None)
        .await;
    assert!(matches!(holdings, Err(TrackerError::Unauthorized { .. })));

    let add = f
        .tracker
        .holdings
        .add_holding(&intruder, &portfolio.id, new_holding("DOGE", dec!(1), dec!(1)))
        .await;
    assert!(matches!(add, Err(TrackerError::Unauthorized { .. })));

    let missing = f
        .tracker
        .portfolios
        .get_portfolio(&f.user, &Uuid::new_v4())
        .await;
    assert!(matches!(missing, Err(TrackerError::NotFound { .. })));
}

#[tokio::test]
async fn test_buy_and_sell_transactions() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    let btc = f
        .tracker
        .store
        .holdings
        .find_by_symbol(&portfolio.id, "BTC")
        .await
        .unwrap()
        .unwrap();

    let recorded = f
        .tracker
        .transactions
        .record_transaction(
            &f.user,
            &btc.id,
            NewTransaction {
                fee: Some(dec!(25)),
                ..buy(dec!(2), dec!(60000))
            },
        )
        .await
        .unwrap();
    assert_eq!(recorded.transaction.total_cost, dec!(120025));
    assert_eq!(recorded.holding.quantity, dec!(4));
    assert_eq!(recorded.holding.average_cost, dec!(55000));

    let sell = f
        .tracker
        .transactions
        .record_transaction(
            &f.user,
            &btc.id,
            NewTransaction {
                transaction_type: TransactionType::Sell,
                ..buy(dec!(1.5), dec!(70000))
            },
        )
        .await
        .unwrap();
    assert_eq!(sell.holding.quantity, dec!(2.5));
    assert_eq!(sell.holding.average_cost, dec!(55000));

    let oversell = f
        .tracker
        .transactions
        .record_transaction(
            &f.user,
            &btc.id,
            NewTransaction {
                transaction_type: TransactionType::Sell,
                ..buy(dec!(3), dec!(70000))
            },
        )
        .await;
    assert!(matches!(oversell, Err(TrackerError::Validation(_))));

    let stored = f.tracker.store.holdings.get(&btc.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity, dec!(2.5));

    let history = f
        .tracker
        .transactions
        .list_transactions(&f.user, &btc.id, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].transaction_type, TransactionType::Buy);
    assert_eq!(history[1].transaction_type, TransactionType::Sell);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_are_all_applied() {
    let f = fixture();
    let portfolio = f.portfolio("Main").await;
    let btc = f
        .tracker
        .holdings
        .add_holding(&f.user, &portfolio.id, new_holding("BTC", dec!(1), dec!(100)))
        .await
        .unwrap();

    let buys: Vec<_> = (0..200)
        .map(|_| {
            let tracker = f.tracker.clone();
            let user = f.user;
            let holding_id = btc.id;
            tokio::spawn(async move {
                tracker
                    .transactions
                    .record_transaction(&user, &holding_id, buy(dec!(1), dec!(100)))
                    .await
            })
        })
        .collect();
    for handle in buys {
        handle.await.unwrap().unwrap();
    }

    let stored = f.tracker.store.holdings.get(&btc.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity, dec!(201));
    assert_eq!(stored.average_cost, dec!(100));
    let history = f
        .tracker
        .transactions
        .list_transactions(&f.user, &btc.id, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 200);
}

#[tokio::test]
async fn test_delete_cascades() {
    let f = fixture();
    let portfolio = f.scenario_a().await;
    let holdings = f
        .tracker
        .store
        .holdings
        .find_all_for_portfolio(&portfolio.id, None)
        .await
        .unwrap();
    for holding in &holdings {
        f.tracker
            .transactions
            .record_transaction(&f.user, &holding.id, buy(dec!(1), dec!(100)))
            .await
            .unwrap();
    }
    assert_eq!(f.tracker.store.transactions.len().await.unwrap(), 2);

    f.tracker
        .holdings
        .delete_holding(&f.user, &holdings[0].id)
        .await
        .unwrap();
    assert_eq!(f.tracker.store.transactions.len().await.unwrap(), 1);
    assert!(!f.tracker.store.holdings.exists(&holdings[0].id).await.unwrap());

    f.tracker
        .portfolios
        .delete_portfolio(&f.user, &portfolio.id)
        .await
        .unwrap();
    assert!(f.tracker.store.transactions.is_empty().await.unwrap());
    assert!(f.tracker.store.holdings.is_empty().await.unwrap());
    assert!(f.tracker.store.portfolios.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_default_portfolio_moves() {
    let f = fixture();
    let first = f.portfolio("First").await;
    assert!(first.is_default);

    let second = f.portfolio("Second").await;
    assert!(!second.is_default);

    let second = f
        .tracker
        .portfolios
        .update_portfolio(
            &f.user,
            &second.id,
            PortfolioUpdate {
                is_default: Some(true),
                ..PortfolioUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(second.is_default);

    let portfolios = f
        .tracker
        .portfolios
        .list_portfolios(&f.user, None)
        .await
        .unwrap();
    let defaults: Vec<&str> = portfolios
        .iter()
        .filter(|p| p.is_default)
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(defaults, ["Second"]);
}

#[tokio::test]
async fn test_portfolio_summary() {
    let f = fixture();
    let portfolio = f.scenario_a().await;

    let summary = f
        .tracker
        .portfolios
        .get_portfolio_summary(&f.user, &portfolio.id)
        .await
        .unwrap();
    assert_eq!(summary.holdings_count, 2);
    assert_eq!(summary.total_value, dec!(135000));
    assert_eq!(summary.total_cost, dec!(130000));
    assert_eq!(summary.total_gain_loss, dec!(5000));
    assert_eq!(summary.total_gain_loss_percentage.round_dp(4), dec!(3.8462));
    // BTC +2.5% on 100000, ETH -2.5% on 35000
    let expected = dec!(100000) * dec!(2.5) / dec!(102.5) - dec!(35000) * dec!(2.5) / dec!(97.5);
    assert_eq!(summary.change_24h_value, expected);
}

#[tokio::test]
async fn test_quotes_are_normalised_and_formatted() {
    let f = fixture();
    let quotes = f
        .tracker
        .market_data
        .get_quotes(&["btc".to_string(), "BTC".to_string(), "xyz".to_string()])
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].symbol, "BTC");
    assert!(quotes[0].available);
    assert_eq!(quotes[0].price_display, "$50,000.00");
    assert_eq!(quotes[0].change_24h_display, "+2.50%");
    assert_eq!(quotes[1].symbol, "XYZ");
    assert!(!quotes[1].available);
    assert_eq!(quotes[1].market.trend, Trend::Neutral);
    assert_eq!(f.prices.call_count(), 1);

    let none = f.tracker.market_data.get_quotes(&[]).await.unwrap();
    assert!(none.is_empty());
    assert_eq!(f.prices.call_count(), 1);
}

#[tokio::test]
async fn test_debug_populate() {
    let f = fixture();
    let portfolio = f.tracker.debug_populate(&f.user).await.unwrap();
    assert!(portfolio.is_default);

    let symbols = f
        .tracker
        .holdings
        .get_symbols(&f.user, &portfolio.id)
        .await
        .unwrap();
    assert_eq!(symbols, ["BTC", "ETH", "SOL"]);
    assert!(f.tracker.watchlist.is_in_watchlist(&f.user, "doge").await.unwrap());
}
