//! Price Normalizer.
//!
//! Maps raw fixed-point oracle prices and pool liquidity into chart-ready points, tracking the
//! price extrema used to scale the chart's price axis.

use crate::{de, endpoint::AssetSymbol};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Scale of raw fixed-point prices.
pub const PRICE_SCALE: f64 = 1e8;

/// Raw price snapshot served by `prices/<SYMBOL>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceRecord {
    #[serde(deserialize_with = "de::de_epoch_secs_as_datetime_utc")]
    pub timestamp: DateTime<Utc>,
    /// Fixed-point price, scaled by [`PRICE_SCALE`].
    #[serde(deserialize_with = "de::de_i64")]
    pub price: i64,
    #[serde(deserialize_with = "de::de_f64")]
    pub pool_amount: f64,
}

impl RawPriceRecord {
    /// Price as a float. Exact to the nearest `f64` for |price| below 2^53.
    pub fn scaled_price(&self) -> f64 {
        self.price as f64 / PRICE_SCALE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
    pub pool_amount: f64,
}

impl From<&RawPriceRecord> for PricePoint {
    fn from(record: &RawPriceRecord) -> Self {
        Self {
            date: record.timestamp,
            price: record.scaled_price(),
            pool_amount: record.pool_amount,
        }
    }
}

/// Normalized price series of one asset.
///
/// `min_price` starts at `+infinity` and `max_price` at `0`, so an empty series keeps exactly
/// those values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSeries {
    pub data: Vec<PricePoint>,
    pub max_price: f64,
    pub min_price: f64,
}

impl PriceSeries {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.data.last()
    }
}

impl Default for PriceSeries {
    fn default() -> Self {
        normalize(&[])
    }
}

/// Normalize raw price records, preserving their order.
pub fn normalize(records: &[RawPriceRecord]) -> PriceSeries {
    let data = records.iter().map(PricePoint::from).collect::<Vec<_>>();

    let (min_price, max_price) = data
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(min, max), point| {
            (min.min(point.price), max.max(point.price))
        });

    PriceSeries {
        data,
        max_price,
        min_price,
    }
}

/// Normalize several assets independently.
///
/// Assets without input (not fetched yet, or failed) are skipped; the output keeps the input
/// order of the remaining symbols.
pub fn normalize_assets<'a, Iter>(inputs: Iter) -> IndexMap<AssetSymbol, PriceSeries>
where
    Iter: IntoIterator<Item = (&'a AssetSymbol, Option<&'a [RawPriceRecord]>)>,
{
    inputs
        .into_iter()
        .filter_map(|(symbol, records)| Some((symbol.clone(), normalize(records?))))
        .collect()
}
