pub mod logging;

#[cfg(feature = "prometheus")]
pub mod metrics;

pub use logging::init_tracing;

#[cfg(feature = "prometheus")]
pub use metrics::SubmissionMetrics;
