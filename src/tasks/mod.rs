// ==========================================
// 物资供应链报表系统 - 后台任务
// ==========================================
// 职责: 异步导出与下载存储
// ==========================================

pub mod download;
pub mod error;
pub mod runner;

pub use download::{CachedDownloadBackend, Download, DownloadBackend, FileDownloadBackend};
pub use error::{TaskError, TaskResult};
pub use runner::ExportTaskRunner;
