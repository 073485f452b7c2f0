// ==========================================
// 物资供应链报表系统 - 导出层
// ==========================================
// 职责: 周期统计与明细数据的 CSV 导出
// ==========================================

pub mod csv_export;
pub mod error;
pub mod request;

pub use csv_export::{
    ReportExporter, MESSAGE_LOG_HEADER, PERIODIC_REPORTING_HEADER, PERIODIC_STOCK_HEADER,
    REPORTING_HEADER,
};
pub use error::{ExportError, ExportResult};
pub use request::{ExportKind, ExportRequest};
