//! PnL Aggregator
//!
//! Projects the global margin PnL snapshots into a chart series. Metrics arrive already
//! cumulative, so the latest record bounds the whole chart vertically.

use crate::de;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw snapshot served by `marginPnl`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPnlRecord {
    #[serde(deserialize_with = "de::de_epoch_secs_as_datetime_utc")]
    pub timestamp: DateTime<Utc>,
    pub metrics: PnlMetrics,
}

/// Cumulative PnL metrics of one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PnlMetrics {
    #[serde(deserialize_with = "de::de_f64")]
    pub net: f64,
    #[serde(deserialize_with = "de::de_f64")]
    pub profits: f64,
    #[serde(deserialize_with = "de::de_f64")]
    pub loss: f64,
    #[serde(deserialize_with = "de::de_f64")]
    pub long: f64,
    #[serde(deserialize_with = "de::de_f64")]
    pub short: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PnlPoint {
    pub date: DateTime<Utc>,
    pub net: f64,
    pub profits: f64,
    pub loss: f64,
    pub long: f64,
    pub short: f64,
}

impl From<&RawPnlRecord> for PnlPoint {
    fn from(record: &RawPnlRecord) -> Self {
        let PnlMetrics {
            net,
            profits,
            loss,
            long,
            short,
        } = record.metrics;

        Self {
            date: record.timestamp,
            net,
            profits,
            loss,
            long,
            short,
        }
    }
}

/// PnL series plus the unscaled vertical bounds of its chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlChart {
    pub series: Vec<PnlPoint>,
    /// `loss` of the latest point, 0 when empty.
    pub lower_bound: f64,
    /// `profits` of the latest point, 0 when empty.
    pub upper_bound: f64,
}

impl Default for PnlChart {
    fn default() -> Self {
        aggregate(&[])
    }
}

pub fn aggregate(records: &[RawPnlRecord]) -> PnlChart {
    let series = records.iter().map(PnlPoint::from).collect::<Vec<_>>();

    let (lower_bound, upper_bound) = series
        .last()
        .map(|latest| (latest.loss, latest.profits))
        .unwrap_or((0.0, 0.0));

    PnlChart {
        series,
        lower_bound,
        upper_bound,
    }
}
