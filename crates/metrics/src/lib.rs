//! Metrics collection and export for reel.
//!
//! Call sites use the `metrics` facade macros re-exported here. Without an
//! installed recorder they are no-ops. With the `prometheus` feature,
//! [`init_metrics`] installs a Prometheus recorder whose snapshot can be
//! rendered as text.
//!
//! ```rust,ignore
//! use reel_metrics::{counter, downloads, labels};
//!
//! counter!(downloads::CACHE_HITS_TOTAL, labels::MODE => "audio").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
