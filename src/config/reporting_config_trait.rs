// ==========================================
// 物资供应链报表系统 - 报表配置读取 Trait
// ==========================================
// 职责: 定义后台导出任务所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::ConfigResult;
use crate::config::reporting_config::ReportingConfig;
use async_trait::async_trait;

// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ReportingConfigReader: Send + Sync {
    /// 读取完整报表参数快照
    async fn read_reporting_config(&self) -> ConfigResult<ReportingConfig>;

    /// 下载有效期（秒）
    ///
    /// # 默认值
    /// - 36000
    async fn get_export_expiry_seconds(&self) -> ConfigResult<i64>;

    /// 是否开放 Excel 导出入口
    ///
    /// # 默认值
    /// - true
    async fn is_excel_export_enabled(&self) -> ConfigResult<bool>;
}
