//! Deserialisation helpers for stats API records.
//!
//! The API serialises large integers as decimal strings on some endpoints, so every numeric
//! field accepts either a JSON number or a string.

use crate::error::RecordError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Deserialize an integer from a JSON number or string.
///
/// Floats are accepted only when they carry no fractional part.
pub fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(value) => Ok(value),
        NumberOrString::Float(value) if value.is_finite() && value.fract() == 0.0 => {
            // Range checked: f64 values outside i64 saturate silently with `as`
            if value >= i64::MIN as f64 && value < i64::MAX as f64 {
                Ok(value as i64)
            } else {
                Err(serde::de::Error::custom(format!(
                    "integer {value} out of range"
                )))
            }
        }
        NumberOrString::Float(value) => Err(serde::de::Error::custom(format!(
            "expected an integer, found {value}"
        ))),
        NumberOrString::Str(value) => value.trim().parse::<i64>().map_err(|error| {
            serde::de::Error::custom(format!("invalid integer {value:?}: {error}"))
        }),
    }
}

/// Deserialize a finite `f64` from a JSON number or string.
pub fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(value) => value as f64,
        NumberOrString::Float(value) => value,
        NumberOrString::Str(value) => value.trim().parse::<f64>().map_err(|error| {
            serde::de::Error::custom(format!("invalid number {value:?}: {error}"))
        })?,
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a finite number, found {value}"
        )))
    }
}

/// Deserialize an epoch-second timestamp as a [`DateTime<Utc>`].
pub fn de_epoch_secs_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = de_i64(deserializer)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        serde::de::Error::custom(format!("timestamp {secs} out of range"))
    })
}

/// Decode every raw record of a fetched series, failing on the first malformed record.
pub fn decode_records<T>(values: Vec<Value>) -> Result<Vec<T>, RecordError>
where
    T: DeserializeOwned,
{
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|error| RecordError {
                index,
                reason: error.to_string(),
            })
        })
        .collect()
}
