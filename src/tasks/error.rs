// ==========================================
// 物资供应链报表系统 - 后台任务错误类型
// ==========================================

use crate::export::ExportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("导出失败: {0}")]
    Export(#[from] ExportError),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error("下载存储失败: {0}")]
    Backend(String),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("下载元数据解析失败: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("任务执行失败: {0}")]
    Join(String),
}

pub type TaskResult<T> = Result<T, TaskError>;
