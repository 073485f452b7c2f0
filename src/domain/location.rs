// ==========================================
// 物资供应链报表系统 - 位置与站点实体
// ==========================================
// 位置树: country → region → district → facility location
// 站点 (SupplyPoint) 挂在唯一一个位置下，是上报单位
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 位置类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationType {
    pub code: String,
    pub name: String,
    /// 展示顺序：1 最先，2 其次……（可为空，排在最后）
    pub display_order: Option<i32>,
}

/// 位置树节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub type_code: String,
    /// 根节点为 None
    pub parent_code: Option<String>,
}

impl Location {
    pub fn new(code: &str, name: &str, type_code: &str, parent_code: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            type_code: type_code.to_string(),
            parent_code: parent_code.map(|p| p.to_string()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_code.is_none()
    }
}

/// 供应站点（facility）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyPoint {
    pub code: String,
    pub name: String,
    pub location_code: String,
    pub active: bool,
    /// 最近一次库存上报时间（由 SOH 上报维护的冗余字段）
    pub last_reported: Option<NaiveDateTime>,
}

impl SupplyPoint {
    pub fn new(code: &str, name: &str, location_code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            location_code: location_code.to_string(),
            active: true,
            last_reported: None,
        }
    }
}
