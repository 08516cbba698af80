use crate::endpoint::Endpoint;
use thiserror::Error;

/// Failure to turn a user supplied boundary into an epoch timestamp.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum WindowError {
    #[error("invalid window boundary {input:?}: {reason}")]
    InvalidBoundary { input: String, reason: String },
}

/// All errors generated while requesting a raw series from the stats API.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FetchError {
    #[error("invalid request url: {0}")]
    Url(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("response body is not a JSON array of records: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(error: url::ParseError) -> Self {
        Self::Url(error.to_string())
    }
}

/// A single record of a fetched series that could not be decoded.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("record {index}: {reason}")]
pub struct RecordError {
    pub index: usize,
    pub reason: String,
}

/// Failure to derive one series. Scoped to a single [`Endpoint`] so other series are unaffected.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SeriesError {
    #[error("{endpoint}: {source}")]
    Fetch {
        endpoint: Endpoint,
        #[source]
        source: FetchError,
    },

    #[error("{endpoint}: malformed {source}")]
    Malformed {
        endpoint: Endpoint,
        #[source]
        source: RecordError,
    },
}

impl SeriesError {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            SeriesError::Fetch { endpoint, .. } | SeriesError::Malformed { endpoint, .. } => {
                endpoint
            }
        }
    }
}

/// Invalid configuration value supplied through the environment.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::AssetSymbol;

    #[test]
    fn test_fetch_error_from_conversions() {
        struct TestCase {
            input: FetchError,
            expected: &'static str,
        }

        let builder_error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let parse_error = url::Url::parse("http://[::1").unwrap_err();

        let tests = vec![
            TestCase {
                // TC0: request that could not be built
                input: FetchError::from(builder_error),
                expected: "request",
            },
            TestCase {
                // TC1: unparseable url
                input: FetchError::from(parse_error),
                expected: "url",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = match test.input {
                FetchError::Url(_) => "url",
                FetchError::Request(_) => "request",
                FetchError::Timeout(_) => "timeout",
                FetchError::Status { .. } => "status",
                FetchError::Decode(_) => "decode",
            };
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_fetch_error_status_display() {
        let error = FetchError::Status {
            status: 502,
            url: "http://127.0.0.1:3113/api/marginPnl?from=0&to=1".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "unexpected HTTP status 502 from http://127.0.0.1:3113/api/marginPnl?from=0&to=1"
        );
    }

    #[test]
    fn test_series_error_display_names_endpoint() {
        let error = SeriesError::Malformed {
            endpoint: Endpoint::Prices(AssetSymbol::new("eth")),
            source: RecordError {
                index: 3,
                reason: "missing field `price`".to_string(),
            },
        };

        assert_eq!(
            error.to_string(),
            "prices/ETH: malformed record 3: missing field `price`"
        );
        assert_eq!(error.endpoint(), &Endpoint::Prices(AssetSymbol::new("ETH")));
    }
}
