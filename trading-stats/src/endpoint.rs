//! Stats API endpoints and request URL construction.

use crate::{error::FetchError, window::TimeWindow};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use url::Url;

/// Default assets charted by the dashboard, in display order.
pub const DEFAULT_ASSETS: [&str; 3] = ["BTC", "ETH", "BNB"];

/// Upper-case asset ticker (eg/ "BTC").
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, Display, From,
)]
#[serde(transparent)]
pub struct AssetSymbol(SmolStr);

impl AssetSymbol {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(SmolStr::new(symbol.as_ref().trim().to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for AssetSymbol {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

/// A logical series served by the stats API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Endpoint {
    #[display("prices/{_0}")]
    Prices(AssetSymbol),
    #[display("marginPnl")]
    MarginPnl,
    #[display("liquidations")]
    Liquidations,
}

impl Endpoint {
    /// Every endpoint the dashboard queries for the provided assets: one price series per asset,
    /// followed by PnL and liquidations.
    pub fn all(assets: &[AssetSymbol]) -> Vec<Endpoint> {
        assets
            .iter()
            .cloned()
            .map(Endpoint::Prices)
            .chain([Endpoint::MarginPnl, Endpoint::Liquidations])
            .collect()
    }

    /// Path relative to the API root, eg/ "prices/BTC".
    pub fn path(&self) -> String {
        self.to_string()
    }

    /// Build the request [`Url`] for this endpoint over `window`.
    ///
    /// `api_url` is treated as a directory regardless of a trailing slash, so both
    /// `http://host/api` and `http://host/api/` resolve to `http://host/api/<path>`.
    pub fn url(&self, api_url: &Url, window: TimeWindow) -> Result<Url, FetchError> {
        let mut base = api_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut url = base.join(&self.path())?;
        url.query_pairs_mut()
            .clear()
            .append_pair("from", &window.from.to_string())
            .append_pair("to", &window.to.to_string());

        Ok(url)
    }
}
