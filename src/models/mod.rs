pub mod metric;
pub mod registry;
pub mod view;

pub use metric::{MetricEventRow, MetricKind, RawMetricEvent, Surface};
pub use registry::{EmbeddedSponsor, EventRecord, SponsorRecord};
pub use view::{AnalyticsSummary, EventMetrics, SharedAnalyticsView, SponsorMetrics, SurfaceMetrics};
