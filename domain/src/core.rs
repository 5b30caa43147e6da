use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::error::Result;
use crate::holding::NewHolding;
use crate::holding_service::HoldingService;
use crate::market_data::{MarketDataProvider, MarketDataService};
use crate::portfolio::{NewPortfolio, Portfolio};
use crate::portfolio_service::PortfolioService;
use crate::store::Store;
use crate::transaction_service::TransactionService;
use crate::user::UserId;
use crate::watchlist::NewWatchlistItem;
use crate::watchlist_service::WatchlistService;

/// Entry point wiring the services over one store and one price feed.
#[derive(Debug, Clone)]
pub struct CoinTracker {
    pub store: Store,
    pub market_data: MarketDataService,
    pub portfolios: PortfolioService,
    pub holdings: HoldingService,
    pub transactions: TransactionService,
    pub watchlist: WatchlistService,
}

impl CoinTracker {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self::with_market_data(store, MarketDataService::new(provider))
    }

    #[must_use]
    pub fn with_market_data(store: Store, market_data: MarketDataService) -> Self {
        let holdings = HoldingService::new(store.clone(), market_data.clone());
        CoinTracker {
            portfolios: PortfolioService::new(store.clone(), holdings.clone()),
            transactions: TransactionService::new(store.clone()),
            watchlist: WatchlistService::new(store.clone(), market_data.clone()),
            holdings,
            market_data,
            store,
        }
    }

    /// Tracker over process memory
    #[must_use]
    pub fn in_memory(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self::new(Store::in_memory(), provider)
    }

    /// Gives `user_id` a portfolio with a few holdings and a short watchlist.
    /// # Errors
    /// Fails if the user already holds or watches the demo symbols
    pub async fn debug_populate(&self, user_id: &UserId) -> Result<Portfolio> {
        let portfolio = self
            .portfolios
            .create_portfolio(
                user_id,
                NewPortfolio {
                    name: "Main".to_string(),
                    description: Some("Demo portfolio".to_string()),
                    is_default: true,
                },
            )
            .await?;

        let holdings: [(&str, &str, Decimal, Decimal); 3] = [
            ("BTC", "Bitcoin", dec!(0.75), dec!(42000)),
            ("ETH", "Ethereum", dec!(6), dec!(2450)),
            ("SOL", "Solana", dec!(40), dec!(95.5)),
        ];
        for (symbol, name, quantity, average_cost) in holdings {
            self.holdings
                .add_holding(
                    user_id,
                    &portfolio.id,
                    NewHolding {
                        symbol: symbol.to_string(),
                        name: name.to_string(),
                        quantity,
                        average_cost,
                        notes: None,
                    },
                )
                .await?;
        }

        for (symbol, name) in [("ADA", "Cardano"), ("DOGE", "Dogecoin")] {
            self.watchlist
                .add_to_watchlist(
                    user_id,
                    NewWatchlistItem {
                        symbol: symbol.to_string(),
                        name: name.to_string(),
                        notes: None,
                    },
                )
                .await?;
        }
        info!("Populated demo data for user {user_id}");
        Ok(portfolio)
    }
}
