//! metro_growth
//!
//! A small Rust library for turning flat housing and labour-market records from
//! a stats backend into chart-ready series. Pairs with the `metro` CLI.
//!
//! ### Features
//! - Fetch housing starts/completions and labour-force records over HTTP
//! - Normalize loosely-typed records once, with defaults and diagnostics
//! - Group records into ordered per-month / per-city / per-province series
//! - Employment, unemployment and participation rates without NaN leaks
//! - Per-province comparison of labour rates against housing starts
//! - Export series as CSV or JSON, render SVG bar and line charts
//!
//! ### Example
//! ```no_run
//! use metro_growth::{Client, SeriesSpec, aggregate};
//!
//! let client = Client::new("http://localhost:8080")?;
//! let records = client.housing_stats()?;
//! let specs = [
//!     SeriesSpec::starts_by_month(&["Toronto", "Hamilton"]),
//!     SeriesSpec::completions_by_month(&["Toronto", "Hamilton"]),
//! ];
//! let result = aggregate(&records, &specs);
//! metro_growth::storage::save_csv(&result, "housing.csv")?;
//! println!("{:?}", result.key_domain);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod accumulator;
pub mod api;
pub mod config;
pub mod correlate;
pub mod dashboard;
pub mod lookup;
pub mod models;
pub mod normalize;
pub mod rates;
pub mod series;
pub mod stats;
pub mod storage;
pub mod synthetic;
pub mod viz;

pub use api::{Client, FetchError, RecordSource};
pub use config::DashboardConfig;
pub use models::{Dimension, Field, GroupKey, GroupedSeriesEntry, Loose, Measure, RawStatRecord};
pub use rates::derive_employment_rate;
pub use series::{AggregationResult, Series, SeriesSpec, aggregate};
