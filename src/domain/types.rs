// ==========================================
// 物资供应链报表系统 - 领域类型定义
// ==========================================
// 上报类型 / 库存水平 / 上报状态 / 消息方向
// 序列化格式与数据库存储值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 上报类型 (Report Type)
// ==========================================
// 存储值: soh / rec / csm / req（短信关键字风格）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    StockOnHand, // 库存上报
    Receipt,     // 收货上报
    Consumption, // 消耗上报
    Requisition, // 申领
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::StockOnHand,
        ReportType::Receipt,
        ReportType::Consumption,
        ReportType::Requisition,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReportType::StockOnHand => "soh",
            ReportType::Receipt => "rec",
            ReportType::Consumption => "csm",
            ReportType::Requisition => "req",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "soh" => Some(ReportType::StockOnHand),
            "rec" => Some(ReportType::Receipt),
            "csm" => Some(ReportType::Consumption),
            "req" => Some(ReportType::Requisition),
            _ => None,
        }
    }

    /// 展示名称（导出 Report Type 列）
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportType::StockOnHand => "Stock on Hand",
            ReportType::Receipt => "Receipt",
            ReportType::Consumption => "Consumption",
            ReportType::Requisition => "Requisition",
        }
    }

    /// 是否影响库存余额（生成 stock_transaction）
    pub fn affects_balance(&self) -> bool {
        matches!(self, ReportType::StockOnHand | ReportType::Receipt)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ==========================================
// 库存水平 (Stock Level)
// ==========================================
// 顺序: StockOut < Emergency < Low < Adequate < Overstock
// Unknown: 窗口内无余额或无可用月均消耗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLevel {
    StockOut,
    Emergency,
    Low,
    Adequate,
    Overstock,
    Unknown,
}

impl StockLevel {
    /// 报表口径的“低库存”包含紧急与低两档
    pub fn is_emergency_or_low(&self) -> bool {
        matches!(self, StockLevel::Emergency | StockLevel::Low)
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::StockOut => write!(f, "STOCK_OUT"),
            StockLevel::Emergency => write!(f, "EMERGENCY"),
            StockLevel::Low => write!(f, "LOW"),
            StockLevel::Adequate => write!(f, "ADEQUATE"),
            StockLevel::Overstock => write!(f, "OVERSTOCK"),
            StockLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ==========================================
// 上报状态 (Reporting Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportingStatus {
    OnTime,
    Late,
    NonReporting,
}

impl fmt::Display for ReportingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingStatus::OnTime => write!(f, "ON_TIME"),
            ReportingStatus::Late => write!(f, "LATE"),
            ReportingStatus::NonReporting => write!(f, "NON_REPORTING"),
        }
    }
}

// ==========================================
// 消息方向 (Message Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MessageDirection::Incoming => "I",
            MessageDirection::Outgoing => "O",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "O" => MessageDirection::Outgoing,
            _ => MessageDirection::Incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_db_roundtrip_is_case_insensitive() {
        for rt in ReportType::ALL {
            assert_eq!(ReportType::from_db_str(rt.to_db_str()), Some(rt));
        }
        assert_eq!(ReportType::from_db_str("SOH"), Some(ReportType::StockOnHand));
        assert_eq!(ReportType::from_db_str("xyz"), None);
    }

    #[test]
    fn test_only_soh_and_receipt_affect_balance() {
        assert!(ReportType::StockOnHand.affects_balance());
        assert!(ReportType::Receipt.affects_balance());
        assert!(!ReportType::Consumption.affects_balance());
        assert!(!ReportType::Requisition.affects_balance());
    }
}
