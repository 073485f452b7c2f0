// ==========================================
// 物资供应链报表系统 - 上报人与短信
// ==========================================

use crate::domain::types::MessageDirection;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 主管职责：可查看站点最近上报
pub const REPORTEE_RESPONSIBILITY: &str = "reportee";

/// 上报人角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRole {
    pub code: String,
    pub responsibilities: Vec<String>,
}

impl ContactRole {
    pub fn has_responsibility(&self, code: &str) -> bool {
        self.responsibilities.iter().any(|r| r == code)
    }
}

/// 上报人（短信联系人）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub supply_point_code: Option<String>,
    pub role: Option<ContactRole>,
    pub needs_reminders: bool,
    pub is_active: bool,
}

impl Contact {
    pub fn is_supervisor(&self) -> bool {
        self.role
            .as_ref()
            .map(|r| r.has_responsibility(REPORTEE_RESPONSIBILITY))
            .unwrap_or(false)
    }
}

/// 短信日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub contact_id: Option<i64>,
    pub phone: String,
    pub text: String,
    pub direction: MessageDirection,
    pub date: NaiveDateTime,
}
