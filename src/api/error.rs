// ==========================================
// 物资供应链报表系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把下层技术错误转换为可展示的错误消息
// ==========================================

use crate::engine::SnapshotError;
use crate::export::ExportError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use crate::sms::SmsError;
use crate::tasks::TaskError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入/导出错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("导出失败: {0}")]
    ExportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    /// 表单录入校验失败；message 为可直接展示的提示
    #[error("录入校验失败: {message}")]
    InputValidationError {
        message: String,
        fields: Vec<String>,
    },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::LocationNotFound(code) => {
                ApiError::NotFound(format!("位置(code={})不存在", code))
            }
            SnapshotError::Tree(e) => ApiError::ValidationError(e.to_string()),
            SnapshotError::Repository(e) => e.into(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::LocationNotFound(code) => {
                ApiError::NotFound(format!("位置(code={})不存在", code))
            }
            ExportError::UnknownKind(kind) => ApiError::InvalidInput(format!("未知导出类型: {}", kind)),
            ExportError::Repository(e) => e.into(),
            other => ApiError::ExportError(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnknownKind(kind) => ApiError::InvalidInput(format!("未知导入类型: {}", kind)),
            ImportError::Repository(e) => e.into(),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<SmsError> for ApiError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Repository(e) => e.into(),
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Export(e) => e.into(),
            TaskError::Config(msg) => ApiError::ConfigError(msg),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("SupplyPoint", "SP9").into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("SupplyPoint"));
                assert!(msg.contains("SP9"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(msg) if msg.contains("poisoned")));
    }

    #[test]
    fn test_lower_layer_not_found_maps_to_not_found() {
        let api_err: ApiError = ExportError::LocationNotFound("X".to_string()).into();
        assert!(matches!(api_err, ApiError::NotFound(_)));

        let api_err: ApiError = TaskError::Export(ExportError::LocationNotFound("X".to_string())).into();
        assert!(matches!(api_err, ApiError::NotFound(_)));

        let api_err: ApiError = SnapshotError::LocationNotFound("X".to_string()).into();
        assert!(matches!(api_err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_sms_parse_errors_are_invalid_input() {
        let api_err: ApiError = SmsError::UnknownProduct("zz".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(msg) if msg.contains("zz")));
    }
}
