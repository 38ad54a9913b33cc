//! Real-time charting core: series discovery, the bounded sample window and
//! the view that keeps a renderer in step with it.

pub mod series;
pub mod view;
pub mod window;

pub use series::{Axis, MetricKind, MetricTable, SeriesDescriptor, SeriesRegistry, Skipped};
pub use view::{ChartConfig, ChartOptions, ChartRenderer, ChartView};
pub use window::{ChartData, SlidingWindowStore, capacity_for_width};
