// ==========================================
// 物资供应链报表系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行和外部调用方使用
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod export_api;
pub mod format;
pub mod import_api;
pub mod reporting_api;
pub mod sms_api;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CommodityListItem, FacilityListItem};
pub use error::{ApiError, ApiResult};
pub use export_api::{ExportApi, ExportApiResponse};
pub use format::{date_last_stocked, months_available, percent};
pub use import_api::ImportApi;
pub use reporting_api::{
    AggregateRow, DistrictStockView, FacilityStockView, ProductStockBreakdown,
    ReportingApi, ReportingBreakdownView, StockCutoffs, StockInput, StockOnHandRow, UiSettings,
};
pub use sms_api::SmsApi;
