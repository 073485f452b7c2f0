// ==========================================
// 物资供应链报表系统 - 导出模块错误类型
// ==========================================

use crate::engine::SnapshotError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("未知导出类型: {0}")]
    UnknownKind(String),

    #[error("位置不存在: {0}")]
    LocationNotFound(String),

    #[error("CSV 写入失败: {0}")]
    CsvWriteError(#[from] csv::Error),

    #[error("文件写入失败: {0}")]
    IoError(#[from] std::io::Error),

    #[error("快照加载失败: {0}")]
    Snapshot(SnapshotError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SnapshotError> for ExportError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::LocationNotFound(code) => ExportError::LocationNotFound(code),
            SnapshotError::Repository(e) => ExportError::Repository(e),
            other => ExportError::Snapshot(other),
        }
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for ExportError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        ExportError::IoError(err.into_error())
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
