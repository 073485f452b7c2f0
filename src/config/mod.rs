// ==========================================
// 物资供应链报表系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod reporting_config;
pub mod reporting_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigResult};
pub use reporting_config::{ReportingConfig, StockedBy};
pub use reporting_config_trait::ReportingConfigReader;
