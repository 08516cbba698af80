//! Liquidation Cumulator.

use crate::de;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw liquidation event served by `liquidations`, ascending by time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLiquidationEvent {
    #[serde(deserialize_with = "de::de_epoch_secs_as_datetime_utc")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "de::de_f64")]
    pub collateral: f64,
    pub is_long: bool,
}

/// Running liquidated collateral at the time of one event.
///
/// `collateral == long + short` for every point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationPoint {
    pub date: DateTime<Utc>,
    pub collateral: f64,
    pub long: f64,
    pub short: f64,
}

pub type LiquidationSeries = Vec<LiquidationPoint>;

#[derive(Default, Clone, Debug)]
struct LiquidationTotals {
    long_total: f64,
    short_total: f64,
}

impl LiquidationTotals {
    fn add(&mut self, event: &RawLiquidationEvent) {
        if event.is_long {
            self.long_total += event.collateral;
        } else {
            self.short_total += event.collateral;
        }
    }

    /// Overall total. Equal to `long + short` by construction.
    fn total(&self) -> f64 {
        self.long_total + self.short_total
    }
}

/// Accumulate liquidated collateral across `events` in the order supplied.
pub fn cumulate(events: &[RawLiquidationEvent]) -> LiquidationSeries {
    events
        .iter()
        .scan(LiquidationTotals::default(), |totals, event| {
            totals.add(event);
            Some(LiquidationPoint {
                date: event.timestamp,
                collateral: totals.total(),
                long: totals.long_total,
                short: totals.short_total,
            })
        })
        .collect()
}
