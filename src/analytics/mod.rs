//! Shared analytics reporting
//!
//! Turns a brand's raw metric log into the organizer or sponsor view:
//! names are resolved by [`names`], records grouped by [`aggregator`],
//! ratios computed by [`derived`], highlights picked by [`ranking`], and
//! everything assembled by [`view`]. [`service`] is the request boundary.

pub mod aggregator;
pub mod derived;
pub mod error;
pub mod names;
pub mod ranking;
pub mod service;
pub mod view;

pub use error::{AnalyticsError, Envelope, ErrorKind};
pub use names::{NameResolver, NameSource, ResolvedNames};
pub use service::{AnalyticsService, SharedAnalyticsRequest, SponsorAnalyticsRequest};
pub use view::{ViewBuilder, ViewMode, ViewScope};
