//! Windowed dashboard: issues one request per endpoint for the current [`TimeWindow`] and
//! re-derives each chart series as soon as its own response lands.
//!
//! Responses are delivered over an mpsc channel tagged with the generation of the window that
//! requested them. Changing the window aborts in-flight requests and bumps the generation, so any
//! response already queued for an older window is discarded on arrival.

use crate::{
    de::decode_records,
    endpoint::{AssetSymbol, Endpoint},
    error::{FetchError, SeriesError},
    liquidation::{self, LiquidationSeries, RawLiquidationEvent},
    pnl::{self, PnlChart, RawPnlRecord},
    price::{self, PriceSeries, RawPriceRecord},
    source::SeriesSource,
    state::SeriesState,
    window::TimeWindow,
};
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

/// Response of one endpoint for the window of `generation`.
#[derive(Debug, Clone)]
pub struct SeriesUpdate {
    pub generation: u64,
    pub endpoint: Endpoint,
    pub result: Result<Vec<Value>, FetchError>,
}

/// Failed series as reported to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFailure {
    pub endpoint: String,
    pub error: String,
}

impl From<&SeriesError> for SeriesFailure {
    fn from(error: &SeriesError) -> Self {
        Self {
            endpoint: error.endpoint().to_string(),
            error: error.to_string(),
        }
    }
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub window: Option<TimeWindow>,
    /// Resolved assets only, in configured order
    pub prices: IndexMap<AssetSymbol, PriceSeries>,
    pub pnl: PnlChart,
    pub liquidations: LiquidationSeries,
    pub failures: Vec<SeriesFailure>,
}

pub struct Dashboard<Source> {
    source: Arc<Source>,
    window: Option<TimeWindow>,
    generation: u64,
    price_states: IndexMap<AssetSymbol, SeriesState<Vec<RawPriceRecord>>>,
    pnl_state: SeriesState<Vec<RawPnlRecord>>,
    liquidation_state: SeriesState<Vec<RawLiquidationEvent>>,
    prices: IndexMap<AssetSymbol, PriceSeries>,
    pnl: PnlChart,
    liquidations: LiquidationSeries,
    in_flight: Vec<JoinHandle<()>>,
    update_tx: mpsc::UnboundedSender<SeriesUpdate>,
    update_rx: mpsc::UnboundedReceiver<SeriesUpdate>,
}

impl<Source> Dashboard<Source>
where
    Source: SeriesSource,
{
    pub fn new(source: Source, assets: Vec<AssetSymbol>) -> Self {
        Self::with_shared_source(Arc::new(source), assets)
    }

    pub fn with_shared_source(source: Arc<Source>, assets: Vec<AssetSymbol>) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        Self {
            source,
            window: None,
            generation: 0,
            price_states: assets
                .into_iter()
                .map(|symbol| (symbol, SeriesState::NotRequested))
                .collect(),
            pnl_state: SeriesState::NotRequested,
            liquidation_state: SeriesState::NotRequested,
            prices: IndexMap::new(),
            pnl: PnlChart::default(),
            liquidations: LiquidationSeries::new(),
            in_flight: Vec::new(),
            update_tx,
            update_rx,
        }
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetSymbol> {
        self.price_states.keys()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        Endpoint::all(&self.assets().cloned().collect::<Vec<_>>())
    }

    /// Query every endpoint for `window`, superseding any requests still in flight.
    ///
    /// Re-applying the current window is a no-op. Must be called within a tokio runtime.
    pub fn set_window(&mut self, window: TimeWindow) {
        if self.window == Some(window) {
            return;
        }

        for handle in self.in_flight.drain(..) {
            handle.abort();
        }

        self.window = Some(window);
        self.generation += 1;

        if window.is_inverted() {
            warn!(
                from = window.from,
                to = window.to,
                "inverted window, series resolve empty without requests"
            );
            self.price_states
                .values_mut()
                .for_each(|state| *state = SeriesState::Ready(Vec::new()));
            self.pnl_state = SeriesState::Ready(Vec::new());
            self.liquidation_state = SeriesState::Ready(Vec::new());
            self.recompute_all();
            return;
        }

        self.price_states
            .values_mut()
            .for_each(|state| *state = SeriesState::Pending);
        self.pnl_state = SeriesState::Pending;
        self.liquidation_state = SeriesState::Pending;
        self.recompute_all();

        info!(
            generation = self.generation,
            from = window.from,
            to = window.to,
            "requesting series for window"
        );

        for endpoint in self.endpoints() {
            let source = Arc::clone(&self.source);
            let update_tx = self.update_tx.clone();
            let generation = self.generation;

            self.in_flight.push(tokio::spawn(async move {
                let result = source.fetch(&endpoint, window).await;
                // Receiver only drops with the dashboard itself
                let _ = update_tx.send(SeriesUpdate {
                    generation,
                    endpoint,
                    result,
                });
            }));
        }
    }

    /// Apply a response, re-deriving the affected series.
    ///
    /// Returns `false` if the update was discarded: it belongs to a superseded window or to an
    /// endpoint this dashboard does not track.
    pub fn apply(&mut self, update: SeriesUpdate) -> bool {
        let SeriesUpdate {
            generation,
            endpoint,
            result,
        } = update;

        if generation != self.generation {
            debug!(
                %endpoint,
                generation,
                current = self.generation,
                "discarding stale series update"
            );
            return false;
        }

        match &endpoint {
            Endpoint::Prices(symbol) => {
                let Some(state) = self.price_states.get_mut(symbol) else {
                    debug!(%endpoint, "discarding update for untracked asset");
                    return false;
                };
                *state = resolve_state(&endpoint, result);
                log_state(&endpoint, state);
                self.recompute_prices();
            }
            Endpoint::MarginPnl => {
                self.pnl_state = resolve_state(&endpoint, result);
                log_state(&endpoint, &self.pnl_state);
                self.recompute_pnl();
            }
            Endpoint::Liquidations => {
                self.liquidation_state = resolve_state(&endpoint, result);
                log_state(&endpoint, &self.liquidation_state);
                self.recompute_liquidations();
            }
        }

        true
    }

    /// Await and apply the next response for the current window.
    ///
    /// Returns the endpoint that changed, or `None` once nothing is pending.
    pub async fn next_update(&mut self) -> Option<Endpoint> {
        while !self.is_settled() {
            let update = self.update_rx.recv().await?;
            let endpoint = update.endpoint.clone();
            if self.apply(update) {
                return Some(endpoint);
            }
        }
        None
    }

    /// Apply responses until every series has resolved or `timeout` elapses.
    ///
    /// Returns `true` if the dashboard settled in time. Series still pending afterwards stay
    /// pending and can be resolved by later calls.
    pub async fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while !self.is_settled() {
            match tokio::time::timeout_at(deadline, self.next_update()).await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = self.pending_endpoints().len(),
                        timeout_secs = timeout.as_secs(),
                        "series did not resolve before the deadline"
                    );
                    return false;
                }
            }
        }

        true
    }

    /// No endpoint is awaiting a response.
    pub fn is_settled(&self) -> bool {
        self.pending_endpoints().is_empty()
    }

    pub fn pending_endpoints(&self) -> Vec<Endpoint> {
        self.endpoints()
            .into_iter()
            .filter(|endpoint| match endpoint {
                Endpoint::Prices(symbol) => self
                    .price_states
                    .get(symbol)
                    .is_some_and(SeriesState::is_pending),
                Endpoint::MarginPnl => self.pnl_state.is_pending(),
                Endpoint::Liquidations => self.liquidation_state.is_pending(),
            })
            .collect()
    }

    pub fn price_state(&self, symbol: &AssetSymbol) -> Option<&SeriesState<Vec<RawPriceRecord>>> {
        self.price_states.get(symbol)
    }

    pub fn pnl_state(&self) -> &SeriesState<Vec<RawPnlRecord>> {
        &self.pnl_state
    }

    pub fn liquidation_state(&self) -> &SeriesState<Vec<RawLiquidationEvent>> {
        &self.liquidation_state
    }

    /// Normalized price series of every resolved asset.
    pub fn prices(&self) -> &IndexMap<AssetSymbol, PriceSeries> {
        &self.prices
    }

    /// PnL chart; empty until `marginPnl` resolves.
    pub fn pnl(&self) -> &PnlChart {
        &self.pnl
    }

    /// Liquidation running totals; empty until `liquidations` resolves.
    pub fn liquidations(&self) -> &LiquidationSeries {
        &self.liquidations
    }

    pub fn failures(&self) -> Vec<&SeriesError> {
        self.price_states
            .values()
            .filter_map(SeriesState::error)
            .chain(self.pnl_state.error())
            .chain(self.liquidation_state.error())
            .collect()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            window: self.window,
            prices: self.prices.clone(),
            pnl: self.pnl.clone(),
            liquidations: self.liquidations.clone(),
            failures: self
                .failures()
                .into_iter()
                .map(SeriesFailure::from)
                .collect(),
        }
    }

    fn recompute_all(&mut self) {
        self.recompute_prices();
        self.recompute_pnl();
        self.recompute_liquidations();
    }

    fn recompute_prices(&mut self) {
        self.prices = price::normalize_assets(
            self.price_states
                .iter()
                .map(|(symbol, state)| (symbol, state.ready().map(Vec::as_slice))),
        );
    }

    fn recompute_pnl(&mut self) {
        self.pnl = pnl::aggregate(
            self.pnl_state
                .ready()
                .map(Vec::as_slice)
                .unwrap_or_default(),
        );
    }

    fn recompute_liquidations(&mut self) {
        self.liquidations = liquidation::cumulate(
            self.liquidation_state
                .ready()
                .map(Vec::as_slice)
                .unwrap_or_default(),
        );
    }
}

impl<Source> Drop for Dashboard<Source> {
    fn drop(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

fn resolve_state<T>(
    endpoint: &Endpoint,
    result: Result<Vec<Value>, FetchError>,
) -> SeriesState<Vec<T>>
where
    T: DeserializeOwned,
{
    result
        .map_err(|source| SeriesError::Fetch {
            endpoint: endpoint.clone(),
            source,
        })
        .and_then(|values| {
            decode_records(values).map_err(|source| SeriesError::Malformed {
                endpoint: endpoint.clone(),
                source,
            })
        })
        .into()
}

fn log_state<T>(endpoint: &Endpoint, state: &SeriesState<Vec<T>>) {
    match state {
        SeriesState::Ready(records) => {
            info!(%endpoint, records = records.len(), "series ready")
        }
        SeriesState::Failed(error) => warn!(%endpoint, %error, "series failed"),
        other => debug!(%endpoint, state = other.label(), "series state changed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory source keyed by endpoint path. Unknown paths answer with an empty series.
    #[derive(Default)]
    struct StaticSource {
        responses: HashMap<String, Result<Vec<Value>, FetchError>>,
        requests: Mutex<Vec<(String, TimeWindow)>>,
    }

    impl StaticSource {
        fn with(mut self, path: &str, response: Result<Vec<Value>, FetchError>) -> Self {
            self.responses.insert(path.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl SeriesSource for StaticSource {
        async fn fetch(
            &self,
            endpoint: &Endpoint,
            window: TimeWindow,
        ) -> Result<Vec<Value>, FetchError> {
            self.requests.lock().await.push((endpoint.path(), window));
            self.responses
                .get(&endpoint.path())
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn assets() -> Vec<AssetSymbol> {
        vec![
            AssetSymbol::new("BTC"),
            AssetSymbol::new("ETH"),
            AssetSymbol::new("BNB"),
        ]
    }

    fn populated_source() -> StaticSource {
        StaticSource::default()
            .with(
                "prices/BTC",
                Ok(vec![
                    json!({"timestamp": 1000, "price": 250000000000i64, "poolAmount": 5}),
                    json!({"timestamp": 2000, "price": 260000000000i64, "poolAmount": 6}),
                ]),
            )
            .with(
                "prices/ETH",
                Ok(vec![json!({"timestamp": 1000, "price": "200000000000", "poolAmount": 50})]),
            )
            .with(
                "marginPnl",
                Ok(vec![json!({
                    "timestamp": 1,
                    "metrics": {"net": 5, "profits": 20, "loss": -15, "long": 3, "short": 2}
                })]),
            )
            .with(
                "liquidations",
                Ok(vec![
                    json!({"timestamp": 1, "collateral": 10, "isLong": true}),
                    json!({"timestamp": 2, "collateral": 5, "isLong": false}),
                ]),
            )
    }

    #[tokio::test]
    async fn test_dashboard_settles_and_derives_every_series() {
        let mut dashboard = Dashboard::new(populated_source(), assets());
        dashboard.set_window(TimeWindow::new(0, 10_000));

        assert!(dashboard.settle(Duration::from_secs(5)).await);

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.window, Some(TimeWindow::new(0, 10_000)));
        assert_eq!(
            snapshot.prices.keys().map(AssetSymbol::as_str).collect::<Vec<_>>(),
            vec!["BTC", "ETH", "BNB"]
        );
        assert_eq!(snapshot.prices[&AssetSymbol::new("BTC")].min_price, 2500.0);
        assert_eq!(snapshot.prices[&AssetSymbol::new("BTC")].max_price, 2600.0);
        assert_eq!(snapshot.prices[&AssetSymbol::new("ETH")].max_price, 2000.0);
        assert!(snapshot.prices[&AssetSymbol::new("BNB")].is_empty());

        assert_eq!(snapshot.pnl.lower_bound, -15.0);
        assert_eq!(snapshot.pnl.upper_bound, 20.0);

        let totals = snapshot
            .liquidations
            .iter()
            .map(|point| (point.collateral, point.long, point.short))
            .collect::<Vec<_>>();
        assert_eq!(totals, vec![(10.0, 10.0, 0.0), (15.0, 10.0, 5.0)]);

        assert!(snapshot.failures.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_requests_every_endpoint_for_window() {
        let source = Arc::new(StaticSource::default());
        let mut dashboard = Dashboard::with_shared_source(Arc::clone(&source), assets());
        let window = TimeWindow::new(1_700_000_000, 1_700_259_200);

        dashboard.set_window(window);
        assert!(dashboard.settle(Duration::from_secs(5)).await);

        let mut requests = source.requests.lock().await.clone();
        requests.sort();
        assert_eq!(
            requests,
            vec![
                ("liquidations".to_string(), window),
                ("marginPnl".to_string(), window),
                ("prices/BNB".to_string(), window),
                ("prices/BTC".to_string(), window),
                ("prices/ETH".to_string(), window),
            ]
        );
    }

    #[tokio::test]
    async fn test_dashboard_pending_until_applied() {
        let mut dashboard = Dashboard::new(populated_source(), assets());

        assert!(dashboard.is_settled());
        assert!(dashboard.pnl_state() == &SeriesState::NotRequested);

        dashboard.set_window(TimeWindow::new(0, 10_000));

        // Spawned fetches have not run yet on the current thread runtime
        assert_eq!(dashboard.pending_endpoints().len(), 5);
        assert!(dashboard.prices().is_empty());
        assert_eq!(dashboard.pnl(), &PnlChart::default());
        assert!(dashboard.liquidations().is_empty());

        let updated = dashboard.next_update().await;
        assert!(updated.is_some());
        assert_eq!(dashboard.pending_endpoints().len(), 4);
    }

    #[tokio::test]
    async fn test_dashboard_discards_stale_updates() {
        let mut dashboard = Dashboard::new(populated_source(), assets());

        dashboard.set_window(TimeWindow::new(0, 10_000));
        let stale_generation = dashboard.generation();
        dashboard.set_window(TimeWindow::new(0, 20_000));
        assert_eq!(dashboard.generation(), stale_generation + 1);

        let applied = dashboard.apply(SeriesUpdate {
            generation: stale_generation,
            endpoint: Endpoint::Liquidations,
            result: Ok(vec![json!({"timestamp": 1, "collateral": 999, "isLong": true})]),
        });
        assert!(!applied);
        assert!(dashboard.liquidation_state().is_pending());

        assert!(dashboard.settle(Duration::from_secs(5)).await);
        assert_eq!(dashboard.liquidations().len(), 2);
        assert_eq!(dashboard.liquidations()[1].collateral, 15.0);
    }

    #[tokio::test]
    async fn test_dashboard_same_window_is_not_requested_again() {
        let source = Arc::new(StaticSource::default());
        let mut dashboard = Dashboard::with_shared_source(Arc::clone(&source), assets());

        dashboard.set_window(TimeWindow::new(0, 1));
        assert!(dashboard.settle(Duration::from_secs(5)).await);
        dashboard.set_window(TimeWindow::new(0, 1));

        assert_eq!(dashboard.generation(), 1);
        assert!(dashboard.is_settled());
        assert_eq!(source.requests.lock().await.len(), 5);
    }

    #[tokio::test]
    async fn test_dashboard_isolates_failures_per_endpoint() {
        let source = populated_source()
            .with(
                "prices/ETH",
                Ok(vec![
                    json!({"timestamp": 1, "price": 100000000, "poolAmount": 1}),
                    json!({"timestamp": 2, "price": "abc", "poolAmount": 1}),
                ]),
            )
            .with(
                "marginPnl",
                Err(FetchError::Status {
                    status: 502,
                    url: "http://127.0.0.1:3113/api/marginPnl?from=0&to=10000".to_string(),
                }),
            );
        let mut dashboard = Dashboard::new(source, assets());

        dashboard.set_window(TimeWindow::new(0, 10_000));
        assert!(dashboard.settle(Duration::from_secs(5)).await);

        // Failed assets are skipped, the rest keep their configured order
        assert_eq!(
            dashboard.prices().keys().map(AssetSymbol::as_str).collect::<Vec<_>>(),
            vec!["BTC", "BNB"]
        );
        assert!(matches!(
            dashboard.price_state(&AssetSymbol::new("ETH")),
            Some(SeriesState::Failed(SeriesError::Malformed { source, .. })) if source.index == 1
        ));

        assert_eq!(dashboard.pnl(), &PnlChart::default());
        assert_eq!(dashboard.liquidations().len(), 2);

        let failures = dashboard.snapshot().failures;
        assert_eq!(
            failures
                .iter()
                .map(|failure| failure.endpoint.as_str())
                .collect::<Vec<_>>(),
            vec!["prices/ETH", "marginPnl"]
        );
        assert!(failures[1].error.contains("502"), "{}", failures[1].error);
    }

    #[tokio::test]
    async fn test_dashboard_inverted_window_resolves_empty() {
        let source = Arc::new(populated_source());
        let mut dashboard = Dashboard::with_shared_source(Arc::clone(&source), assets());

        dashboard.set_window(TimeWindow::new(10_000, 0));

        assert!(dashboard.is_settled());
        assert_eq!(dashboard.prices().len(), 3);
        assert!(dashboard.prices().values().all(PriceSeries::is_empty));
        assert_eq!(dashboard.pnl(), &PnlChart::default());
        assert!(dashboard.liquidations().is_empty());
        assert!(source.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_ignores_untracked_asset() {
        let mut dashboard = Dashboard::new(StaticSource::default(), assets());
        dashboard.set_window(TimeWindow::new(0, 1));

        let applied = dashboard.apply(SeriesUpdate {
            generation: dashboard.generation(),
            endpoint: Endpoint::Prices(AssetSymbol::new("DOGE")),
            result: Ok(vec![]),
        });

        assert!(!applied);
        assert!(!dashboard.prices().contains_key(&AssetSymbol::new("DOGE")));
    }

    #[tokio::test]
    async fn test_snapshot_serialises_for_presentation() {
        let mut dashboard = Dashboard::new(populated_source(), assets());
        dashboard.set_window(TimeWindow::new(0, 10_000));
        assert!(dashboard.settle(Duration::from_secs(5)).await);

        let value = serde_json::to_value(dashboard.snapshot()).unwrap();

        assert_eq!(value["window"], json!({"from": 0, "to": 10_000}));
        assert_eq!(value["prices"]["BTC"]["data"][1]["poolAmount"], json!(6.0));
        assert_eq!(value["pnl"]["lowerBound"], json!(-15.0));
        assert_eq!(value["liquidations"][1]["short"], json!(5.0));
        // +infinity has no JSON representation
        assert_eq!(value["prices"]["BNB"]["minPrice"], Value::Null);
    }
}
