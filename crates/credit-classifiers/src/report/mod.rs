//! HTML reports: a small maud page builder and plotly charts.
pub mod plots;
#[allow(clippy::module_inception)]
pub mod report;

pub use report::{Report, ReportSection};
