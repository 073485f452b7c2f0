// ==========================================
// 物资供应链报表系统 - 报表参数快照
// ==========================================
// 职责: 一次查询内使用的全部阈值/窗口参数
// 红线: 引擎只读取该结构，不直接访问 config_kv
// ==========================================

use serde::{Deserialize, Serialize};

/// 库存跟踪方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockedBy {
    Facility,
    User,
    Product,
}

impl StockedBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "facility" => Some(StockedBy::Facility),
            "user" => Some(StockedBy::User),
            "product" => Some(StockedBy::Product),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockedBy::Facility => "facility",
            StockedBy::User => "user",
            StockedBy::Product => "product",
        }
    }
}

/// 报表参数（由 ConfigManager::load_reporting_config 加载）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// 再订货水平（月数）
    pub months_minimum: f64,
    /// 最高库存水平（月数）
    pub months_maximum: f64,
    /// 紧急水平（月数）
    pub months_emergency: f64,
    /// 周期统计的宽限天数
    pub days_for_late: i64,
    /// 未上报告警回看天数
    pub non_reporting_alert_days: i64,
    /// 上报状态列表回看天数
    pub reporting_view_days: i64,
    /// 周期导出的周数
    pub periodic_export_weeks: u32,
    /// 周期分界星期（0 = 周一）
    pub periodic_anchor_weekday: u32,
    /// 月消耗估算回看天数
    pub consumption_lookback_days: i64,
    /// 下载有效期（秒）
    pub export_expiry_seconds: i64,
    pub excel_export_enabled: bool,
    pub stocked_by: StockedBy,
    pub navigation_mode: String,
    pub locale: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            months_minimum: 1.0,
            months_maximum: 3.0,
            months_emergency: 0.5,
            days_for_late: 5,
            non_reporting_alert_days: 32,
            reporting_view_days: 7,
            periodic_export_weeks: 49,
            periodic_anchor_weekday: 3,
            consumption_lookback_days: 90,
            export_expiry_seconds: 36_000,
            excel_export_enabled: true,
            stocked_by: StockedBy::Facility,
            navigation_mode: "param".to_string(),
            locale: "en".to_string(),
        }
    }
}

impl ReportingConfig {
    /// 库存阈值是否单调（emergency <= minimum <= maximum）
    pub fn has_ordered_levels(&self) -> bool {
        self.months_emergency >= 0.0
            && self.months_emergency <= self.months_minimum
            && self.months_minimum <= self.months_maximum
    }
}
