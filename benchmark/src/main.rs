use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use domain::core::CoinTracker;
use domain::holding::NewHolding;
use domain::market_data::PriceSnapshot;
use domain::market_data_factory::{MarketDataProviderFactory, demo_snapshots};
use domain::portfolio::{NewPortfolio, PortfolioId};
use domain::user::UserId;
use domain::watchlist::NewWatchlistItem;
use hdrhistogram::Histogram;
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cointracker-benchmark")]
#[command(about = "Read path benchmark for enriched holdings and watchlists")]
struct Args {
    /// Number of concurrent clients
    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    /// Duration of the test in seconds
    #[arg(short, long, default_value_t = 30)]
    duration: u64,

    /// Target throughput (requests per second)
    #[arg(long, default_value_t = 500)]
    rate: u64,

    /// Number of test users to create
    #[arg(long, default_value_t = 100)]
    users: usize,

    /// Holdings per user portfolio, capped by the number of priced symbols
    #[arg(long, default_value_t = 4)]
    holdings: usize,

    /// Share of requests that read the watchlist instead of the portfolio
    #[arg(long, default_value_t = 0.3)]
    watchlist_ratio: f64,

    /// Poll every user's holdings and watchlist on this period instead of
    /// running rate-limited workers
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

#[derive(Debug)]
struct BenchmarkMetrics {
    pub requests: AtomicU64,
    pub failures: AtomicU64,
    pub latency_histogram: Mutex<Histogram<u64>>,
    pub start_time: Instant,
}

impl BenchmarkMetrics {
    fn new() -> Result<Self> {
        Ok(Self {
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            // microseconds, up to 10 s
            latency_histogram: Mutex::new(Histogram::new_with_bounds(1, 10_000_000, 3)?),
            start_time: Instant::now(),
        })
    }

    fn record_success(&self, latency: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut hist) = self.latency_histogram.lock() {
            let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
            let _ = hist.record(micros.max(1));
        }
    }

    fn record_failure(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let served = self.requests.load(Ordering::Relaxed) as f64;
        if elapsed > 0.0 { served / elapsed } else { 0.0 }
    }

    fn print_report(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let success_rate = if requests == 0 {
            0.0
        } else {
            (requests - failures) as f64 / requests as f64 * 100.0
        };

        println!("\n=== COINTRACKER READ BENCHMARK RESULTS ===");
        println!("Test Duration: {:.2} seconds", self.start_time.elapsed().as_secs_f64());
        println!("Requests: {requests}");
        println!("Failures: {failures}");
        println!("Success Rate: {success_rate:.2}%");
        println!("Throughput: {:.2} requests/s", self.get_throughput());

        if let Ok(hist) = self.latency_histogram.lock() {
            println!("\n=== LATENCY DISTRIBUTION (us) ===");
            println!("Min: {}", hist.min());
            println!("P50: {}", hist.value_at_quantile(0.50));
            println!("P90: {}", hist.value_at_quantile(0.90));
            println!("P95: {}", hist.value_at_quantile(0.95));
            println!("P99: {}", hist.value_at_quantile(0.99));
            println!("Max: {}", hist.max());
        }
    }
}

#[derive(Debug)]
struct TestUser {
    id: UserId,
    portfolio: PortfolioId,
}

async fn setup_test_users(
    tracker: &CoinTracker,
    snapshots: &[PriceSnapshot],
    num_users: usize,
    holdings: usize,
) -> Result<Vec<TestUser>> {
    info!("Setting up {} test users...", num_users);
    let mut users = Vec::with_capacity(num_users);

    for i in 0..num_users {
        let id = Uuid::new_v4();
        let portfolio = tracker
            .portfolios
            .create_portfolio(
                &id,
                NewPortfolio {
                    name: format!("Benchmark {i}"),
                    ..NewPortfolio::default()
                },
            )
            .await
            .map_err(|e| eyre!("Failed to create portfolio for user {}: {}", i, e))?;

        for snapshot in snapshots.iter().take(holdings) {
            tracker
                .holdings
                .add_holding(
                    &id,
                    &portfolio.id,
                    NewHolding {
                        symbol: snapshot.symbol.clone(),
                        name: snapshot.symbol.clone(),
                        quantity: Decimal::from(i + 1),
                        average_cost: snapshot.price,
                        notes: None,
                    },
                )
                .await
                .map_err(|e| eyre!("Failed to add holding for user {}: {}", i, e))?;
        }

        for snapshot in snapshots.iter().skip(holdings) {
            tracker
                .watchlist
                .add_to_watchlist(
                    &id,
                    NewWatchlistItem {
                        symbol: snapshot.symbol.clone(),
                        name: snapshot.symbol.clone(),
                        notes: None,
                    },
                )
                .await
                .map_err(|e| eyre!("Failed to watch symbol for user {}: {}", i, e))?;
        }

        users.push(TestUser {
            id,
            portfolio: portfolio.id,
        });
    }

    info!("Successfully created {} test users", users.len());
    Ok(users)
}

async fn benchmark_worker(
    worker_id: usize,
    tracker: CoinTracker,
    users: Arc<Vec<TestUser>>,
    metrics: Arc<BenchmarkMetrics>,
    should_stop: Arc<AtomicBool>,
    target_rate_per_worker: f64,
    watchlist_ratio: f64,
) {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::from_entropy();

    let interval = Duration::from_secs_f64(1.0 / target_rate_per_worker);
    let mut next_request_time = Instant::now();

    info!(
        "Worker {} started with target rate {:.2} requests/s",
        worker_id, target_rate_per_worker
    );

    while !should_stop.load(Ordering::Relaxed) {
        // Rate limiting
        if Instant::now() < next_request_time {
            sleep(Duration::from_millis(1)).await;
            continue;
        }
        next_request_time += interval;

        let user = &users[rng.gen_range(0..users.len())];
        let started = Instant::now();
        let result = if rng.gen_bool(watchlist_ratio) {
            tracker
                .watchlist
                .get_watchlist(&user.id, None)
                .await
                .map(|items| items.len())
        } else {
            tracker
                .holdings
                .list_holdings(&user.id, &user.portfolio, None)
                .await
                .map(|holdings| holdings.len())
        };

        match result {
            Ok(_) => metrics.record_success(started.elapsed()),
            Err(e) => {
                warn!("Worker {} request failed: {}", worker_id, e);
                metrics.record_failure();
            }
        }
    }

    info!("Worker {} stopped", worker_id);
}

/// Refreshes one user's dashboard (holdings then watchlist) on a fixed period.
async fn poll_worker(
    tracker: CoinTracker,
    users: Arc<Vec<TestUser>>,
    index: usize,
    metrics: Arc<BenchmarkMetrics>,
    should_stop: Arc<AtomicBool>,
    period: Duration,
) {
    let user = &users[index];
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while !should_stop.load(Ordering::Relaxed) {
        interval.tick().await;

        let started = Instant::now();
        match tracker
            .holdings
            .list_holdings(&user.id, &user.portfolio, None)
            .await
        {
            Ok(_) => metrics.record_success(started.elapsed()),
            Err(e) => {
                warn!("Holdings refresh for {} failed: {}", user.id, e);
                metrics.record_failure();
            }
        }

        let started = Instant::now();
        match tracker.watchlist.get_watchlist(&user.id, None).await {
            Ok(_) => metrics.record_success(started.elapsed()),
            Err(e) => {
                warn!("Watchlist refresh for {} failed: {}", user.id, e);
                metrics.record_failure();
            }
        }
    }
}

async fn run_benchmark(args: Args) -> Result<()> {
    info!(
        "Starting CoinTracker benchmark with {} workers for {}s",
        args.workers, args.duration
    );
    if args.workers == 0 || args.users == 0 || args.rate == 0 {
        return Err(eyre!("workers, users and rate must be greater than zero"));
    }

    let snapshots = demo_snapshots();
    let provider = MarketDataProviderFactory::create_static_provider(snapshots.clone());
    let tracker = CoinTracker::in_memory(provider);
    let users = Arc::new(
        setup_test_users(&tracker, &snapshots, args.users, args.holdings).await?,
    );

    let metrics = Arc::new(BenchmarkMetrics::new()?);
    let should_stop = Arc::new(AtomicBool::new(false));
    let target_rate_per_worker = args.rate as f64 / args.workers as f64;
    let watchlist_ratio = args.watchlist_ratio.clamp(0.0, 1.0);

    info!(
        "Target rate per worker: {:.2} requests/s",
        target_rate_per_worker
    );

    let mut handles = Vec::new();
    if let Some(period_ms) = args.poll_interval_ms {
        let period = Duration::from_millis(period_ms.max(1));
        info!("Polling {} users every {:?}", users.len(), period);
        for index in 0..users.len() {
            handles.push(tokio::spawn(poll_worker(
                tracker.clone(),
                Arc::clone(&users),
                index,
                Arc::clone(&metrics),
                Arc::clone(&should_stop),
                period,
            )));
        }
    } else {
        for worker_id in 0..args.workers {
            handles.push(tokio::spawn(benchmark_worker(
                worker_id,
                tracker.clone(),
                Arc::clone(&users),
                Arc::clone(&metrics),
                Arc::clone(&should_stop),
                target_rate_per_worker,
                watchlist_ratio,
            )));
        }
    }

    // Status reporting task
    let status_handle = {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                info!(
                    "Status: {} served, {} failed, {:.2} requests/s",
                    metrics.requests.load(Ordering::Relaxed),
                    metrics.failures.load(Ordering::Relaxed),
                    metrics.get_throughput()
                );
            }
        })
    };

    sleep(Duration::from_secs(args.duration)).await;

    should_stop.store(true, Ordering::Relaxed);
    status_handle.abort();
    for handle in handles {
        let _ = handle.await;
    }

    metrics.print_report();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("benchmark=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("CoinTracker Benchmark");
    info!("Configuration: {:?}", args);

    run_benchmark(args).await?;

    Ok(())
}
