//! Time window resolution.
//!
//! Converts the two `datetime-local` style boundaries a user edits into the epoch-second
//! `[from, to]` pair used to parameterise every stats API query.

use crate::error::WindowError;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Second resolution ISO local form used for default boundaries, eg/ "2024-03-01T12:30:00".
pub const BOUNDARY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Default look-back of the initial window, in hours.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 72;

/// Accepted boundary layouts, tried in order.
const BOUNDARY_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Epoch-second range over which all series are queried.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    /// Boundaries are out of order. No series can contain data for an inverted window.
    pub fn is_inverted(&self) -> bool {
        self.from > self.to
    }

    pub fn duration_secs(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }
}

/// Resolve two local boundaries using the system time zone.
pub fn resolve(from: &str, to: &str) -> Result<TimeWindow, WindowError> {
    resolve_in(&Local, from, to)
}

/// Resolve two local boundaries interpreted in `tz`.
///
/// Sub-second precision is truncated. Boundaries are not reordered: an inverted input yields an
/// inverted [`TimeWindow`].
pub fn resolve_in<Tz>(tz: &Tz, from: &str, to: &str) -> Result<TimeWindow, WindowError>
where
    Tz: TimeZone,
{
    Ok(TimeWindow {
        from: parse_boundary(tz, from)?,
        to: parse_boundary(tz, to)?,
    })
}

/// Default `(from, to)` boundaries: `now - lookback` and `now`, rendered in [`BOUNDARY_FORMAT`].
pub fn default_boundaries<Tz>(now: DateTime<Tz>, lookback: TimeDelta) -> (String, String)
where
    Tz: TimeZone,
{
    let to = now.naive_local();
    let from = to - lookback;
    (
        from.format(BOUNDARY_FORMAT).to_string(),
        to.format(BOUNDARY_FORMAT).to_string(),
    )
}

fn parse_boundary<Tz>(tz: &Tz, input: &str) -> Result<i64, WindowError>
where
    Tz: TimeZone,
{
    let trimmed = input.trim();

    let naive = BOUNDARY_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(trimmed, layout).ok())
        .ok_or_else(|| WindowError::InvalidBoundary {
            input: input.to_string(),
            reason: "expected YYYY-MM-DDTHH:MM[:SS]".to_string(),
        })?;

    // Ambiguous local times (clocks turned back) resolve to the earliest instant
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|datetime| datetime.timestamp())
        .ok_or_else(|| WindowError::InvalidBoundary {
            input: input.to_string(),
            reason: "local time does not exist in this time zone".to_string(),
        })
}
