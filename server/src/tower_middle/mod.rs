//! Tower middleware wrapped around every listener's router.

pub mod metrics;
pub mod tower_metrics;

pub use metrics::Metrics;
pub use tower_metrics::{MetricsLayer, MetricsService};
