//! Chart axis domains derived from the transformed series.

use crate::{
    dashboard::DashboardSnapshot,
    endpoint::AssetSymbol,
    liquidation::LiquidationSeries,
    pnl::PnlChart,
    price::PriceSeries,
};
use derive_more::Constructor;
use indexmap::IndexMap;
use serde::Serialize;

/// Padding applied below the lowest price.
const PRICE_FLOOR_FACTOR: f64 = 0.99;
/// Padding applied above the highest price.
const PRICE_CEIL_FACTOR: f64 = 1.01;
/// Scale of the PnL lower bound.
const PNL_LOWER_FACTOR: f64 = 1.5;
/// Scale of the PnL upper bound.
const PNL_UPPER_FACTOR: f64 = 0.5;

/// Inclusive vertical range of one chart.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Constructor)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

/// Price axis padded by 1% either side and rounded to whole units.
///
/// `None` for an empty series, whose extrema are still the `+infinity` / `0` seeds.
pub fn price_domain(series: &PriceSeries) -> Option<AxisDomain> {
    if series.is_empty() {
        return None;
    }

    Some(AxisDomain::new(
        (series.min_price * PRICE_FLOOR_FACTOR).round(),
        (series.max_price * PRICE_CEIL_FACTOR).round(),
    ))
}

pub fn pnl_domain(chart: &PnlChart) -> AxisDomain {
    AxisDomain::new(
        chart.lower_bound * PNL_LOWER_FACTOR,
        chart.upper_bound * PNL_UPPER_FACTOR,
    )
}

/// From zero up to the final running total.
pub fn liquidation_domain(series: &LiquidationSeries) -> AxisDomain {
    AxisDomain::new(0.0, series.last().map_or(0.0, |point| point.collateral))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDomains {
    pub prices: IndexMap<AssetSymbol, AxisDomain>,
    pub pnl: AxisDomain,
    pub liquidations: AxisDomain,
}

impl ChartDomains {
    /// Assets with no price data get no domain.
    pub fn from_snapshot(snapshot: &DashboardSnapshot) -> Self {
        Self {
            prices: snapshot
                .prices
                .iter()
                .filter_map(|(symbol, series)| {
                    price_domain(series).map(|domain| (symbol.clone(), domain))
                })
                .collect(),
            pnl: pnl_domain(&snapshot.pnl),
            liquidations: liquidation_domain(&snapshot.liquidations),
        }
    }
}
