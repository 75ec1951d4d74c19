//! Metric name and label definitions.
//!
//! Every metric the workspace records is named here so dashboards and the
//! recorder's bucket configuration stay in sync with the call sites.

/// Tool execution metrics
pub mod tools {
    /// Total number of tool executions
    pub const EXECUTIONS_TOTAL: &str = "reel_tool_executions_total";
    /// Tool execution duration in seconds
    pub const EXECUTION_DURATION_SECONDS: &str = "reel_tool_execution_duration_seconds";
    /// Tool execution errors
    pub const EXECUTION_ERRORS_TOTAL: &str = "reel_tool_execution_errors_total";
    /// Number of currently running tool executions
    pub const EXECUTIONS_IN_FLIGHT: &str = "reel_tool_executions_in_flight";
}

/// Download engine metrics
pub mod downloads {
    /// Downloads that invoked the engine
    pub const TOTAL: &str = "reel_downloads_total";
    /// Requests served from an existing output file
    pub const CACHE_HITS_TOTAL: &str = "reel_download_cache_hits_total";
    /// Engine download duration in seconds
    pub const DURATION_SECONDS: &str = "reel_download_duration_seconds";
    /// Failed engine invocations
    pub const ERRORS_TOTAL: &str = "reel_download_errors_total";
}

/// Transcoder metrics
pub mod transcode {
    /// Screenshots extracted
    pub const SCREENSHOTS_TOTAL: &str = "reel_screenshots_total";
    /// Screenshot extraction duration in seconds
    pub const SCREENSHOT_DURATION_SECONDS: &str = "reel_screenshot_duration_seconds";
}

/// External process metrics
pub mod process {
    /// Spawned external processes
    pub const SPAWNS_TOTAL: &str = "reel_process_spawns_total";
    /// External processes killed after exceeding their timeout
    pub const TIMEOUTS_TOTAL: &str = "reel_process_timeouts_total";
}

/// Common label keys
pub mod labels {
    pub const TOOL: &str = "tool";
    pub const SUCCESS: &str = "success";
    pub const ERROR_TYPE: &str = "error_type";
    pub const MODE: &str = "mode";
    pub const BINARY: &str = "binary";
}

/// Standard histogram buckets
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Downloads range from a cached instant to half an hour.
    pub static DOWNLOAD_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]
    });

    /// Frame grabs and probes, 10ms to 1 minute.
    pub static TRANSCODE_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    });
}
