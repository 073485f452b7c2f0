// ==========================================
// 物资供应链报表系统 - 引擎层
// ==========================================
// 职责: 上报及时性判定、库存水平判定与汇总、周期分段
// 红线: Engine 不拼 SQL；仅快照加载经由仓储取数
// ==========================================

pub mod datespan;
pub mod location_tree;
pub mod reporting;
pub mod repositories;
pub mod snapshot;
pub mod stock_status;
pub mod timeline;

// 重导出核心引擎
pub use datespan::{day_of_week, weekly_buckets, BucketDirection, DateBucket, DateSpan};
pub use location_tree::{LocationIndex, LocationTreeError};
pub use reporting::{
    classify_reporting, get_reporting_and_nonreporting_facilities, reporting_status,
    FacilityLastReport, ReportingBreakdown, ReportingStatusLists,
};
pub use repositories::ReportingRepositories;
pub use snapshot::{ProductFilter, ReportingSnapshot, SnapshotError};
pub use stock_status::{
    aggregate_stock_counts, classify_stock, estimate_monthly_consumption, months_of_stock,
    LocationStockSummary, StockCounts, StockThresholds,
};
pub use timeline::{ReportTimeline, TransactionTimeline};
