// ==========================================
// 物资供应链报表系统 - 产品实体
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 产品类别（项目/program）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub code: String,
    pub name: String,
}

/// 产品（commodity）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// 短信代码（唯一，小写）
    pub sms_code: String,
    pub name: String,
    pub type_code: Option<String>,
    pub is_active: bool,
    pub units: Option<String>,
    /// 默认月均消耗（站点无手工值且无消耗上报时使用）
    pub average_monthly_consumption: Option<f64>,
}

impl Product {
    pub fn new(sms_code: &str, name: &str, type_code: Option<&str>) -> Self {
        Self {
            sms_code: normalize_sms_code(sms_code),
            name: name.to_string(),
            type_code: type_code.map(|t| t.to_string()),
            is_active: true,
            units: None,
            average_monthly_consumption: None,
        }
    }
}

/// 统一短信代码口径：去空白、小写
pub fn normalize_sms_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// 站点产品库存
///
/// 一行表示站点“经营”该产品；is_active=false 表示已停用（不参与统计）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStock {
    pub supply_point_code: String,
    pub product_code: String,
    pub is_active: bool,
    /// 当前库存（None 表示从未上报）
    pub quantity: Option<i64>,
    /// 手工维护的月均消耗
    pub monthly_consumption: Option<f64>,
    pub last_modified: NaiveDateTime,
}

impl ProductStock {
    /// 月库存量（quantity / monthly_consumption）
    pub fn months_remaining(&self) -> Option<f64> {
        match (self.quantity, self.monthly_consumption) {
            (Some(q), Some(c)) if c > 0.0 => Some(q as f64 / c),
            _ => None,
        }
    }
}
