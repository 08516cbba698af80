//! Resolve a time window, fetch every stats series for it, and print the chart-ready snapshot as
//! JSON on stdout. Logs go to stderr.
//!
//! Environment:
//! - `STATS_FROM` / `STATS_TO`: window boundaries, eg/ "2024-03-01T12:30". Default to the
//!   configured look-back ending now.
//! - `STATS_API_URL`, `STATS_ASSETS`, `STATS_REQUEST_TIMEOUT_SECS`, `STATS_LOOKBACK_HOURS`,
//!   `STATS_SETTLE_TIMEOUT_SECS`: see [`StatsConfig::from_env`].
//!
//! Failed series are reported inside the snapshot; only invalid configuration or window
//! boundaries exit with a non-zero status.

use chrono::Local;
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info, warn};
use trading_stats::{
    ChartDomains, Dashboard, DashboardSnapshot, HttpSource, StatsConfig, TimeWindow, WindowError,
    window::{self, default_boundaries},
};

const ENV_FROM: &str = "STATS_FROM";
const ENV_TO: &str = "STATS_TO";

#[derive(Serialize)]
struct SnapshotReport {
    #[serde(flatten)]
    snapshot: DashboardSnapshot,
    domains: ChartDomains,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match StatsConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let window = match resolve_window(&config) {
        Ok(window) => window,
        Err(error) => {
            error!(%error, "invalid window");
            return ExitCode::FAILURE;
        }
    };

    info!(
        api_url = %config.api_url,
        assets = ?config.assets,
        from = window.from,
        to = window.to,
        duration_secs = window.duration_secs(),
        "collecting stats snapshot"
    );

    let mut dashboard = Dashboard::new(HttpSource::new(&config), config.assets.clone());
    dashboard.set_window(window);

    if !dashboard.settle(config.settle_timeout).await {
        warn!(
            pending = ?dashboard.pending_endpoints(),
            "reporting snapshot with unresolved series"
        );
    }

    let snapshot = dashboard.snapshot();
    for (symbol, series) in &snapshot.prices {
        info!(
            %symbol,
            points = series.data.len(),
            min_price = series.min_price,
            max_price = series.max_price,
            latest_price = series.latest().map(|point| point.price),
            "price series"
        );
    }
    info!(
        points = snapshot.pnl.series.len(),
        lower_bound = snapshot.pnl.lower_bound,
        upper_bound = snapshot.pnl.upper_bound,
        "pnl series"
    );
    info!(
        points = snapshot.liquidations.len(),
        total = snapshot.liquidations.last().map_or(0.0, |point| point.collateral),
        "liquidation series"
    );

    let report = SnapshotReport {
        domains: ChartDomains::from_snapshot(&snapshot),
        snapshot,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "failed to serialise snapshot");
            ExitCode::FAILURE
        }
    }
}

fn resolve_window(config: &StatsConfig) -> Result<TimeWindow, WindowError> {
    let (default_from, default_to) = default_boundaries(Local::now(), config.lookback);
    let boundary = |key: &str, default: String| {
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(default)
    };

    window::resolve(
        &boundary(ENV_FROM, default_from),
        &boundary(ENV_TO, default_to),
    )
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
