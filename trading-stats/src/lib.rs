//! Trading Stats - Shared Library
//!
//! Turns the raw series served by a windowed trading stats API into chart-ready data:
//! - prices: fixed-point oracle prices normalized per asset, with price extrema
//! - pnl: aggregate trader PnL with the bounds of the latest record
//! - liquidations: running liquidated collateral split by long and short
//!
//! The [`Dashboard`] requests every series for a [`TimeWindow`] concurrently and re-derives each
//! one as its response arrives, discarding responses for superseded windows.

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod de;
pub mod endpoint;
pub mod error;
pub mod liquidation;
pub mod pnl;
pub mod price;
pub mod source;
pub mod state;
pub mod window;

// Re-export commonly used types for convenience
pub use chart::{AxisDomain, ChartDomains};
pub use config::StatsConfig;
pub use dashboard::{Dashboard, DashboardSnapshot, SeriesFailure, SeriesUpdate};
pub use endpoint::{AssetSymbol, Endpoint};
pub use error::{ConfigError, FetchError, RecordError, SeriesError, WindowError};
pub use liquidation::{LiquidationPoint, LiquidationSeries, RawLiquidationEvent};
pub use pnl::{PnlChart, PnlPoint, RawPnlRecord};
pub use price::{PricePoint, PriceSeries, RawPriceRecord};
pub use source::{HttpSource, SeriesSource};
pub use state::SeriesState;
pub use window::TimeWindow;
