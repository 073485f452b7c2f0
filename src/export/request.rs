// ==========================================
// 物资供应链报表系统 - 导出请求
// ==========================================

use crate::engine::{DateSpan, ProductFilter};
use crate::export::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 导出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    PeriodicReporting,
    PeriodicStock,
    Reporting,
    MessageLog,
}

impl ExportKind {
    pub const ALL: [ExportKind; 4] = [
        ExportKind::PeriodicReporting,
        ExportKind::PeriodicStock,
        ExportKind::Reporting,
        ExportKind::MessageLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::PeriodicReporting => "periodic_reporting",
            ExportKind::PeriodicStock => "periodic_stock",
            ExportKind::Reporting => "reporting",
            ExportKind::MessageLog => "messagelog",
        }
    }

    /// 下载文件名
    pub fn filename(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    pub(crate) fn timer_label(&self) -> &'static str {
        match self {
            ExportKind::PeriodicReporting => "export.periodic_reporting",
            ExportKind::PeriodicStock => "export.periodic_stock",
            ExportKind::Reporting => "export.reporting",
            ExportKind::MessageLog => "export.messagelog",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "periodic_reporting" => Ok(ExportKind::PeriodicReporting),
            "periodic_stock" => Ok(ExportKind::PeriodicStock),
            "reporting" => Ok(ExportKind::Reporting),
            "messagelog" | "message_log" => Ok(ExportKind::MessageLog),
            _ => Err(ExportError::UnknownKind(s.to_string())),
        }
    }
}

/// 导出请求（各过滤条件之间为 AND）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub location_code: String,
    pub datespan: Option<DateSpan>,
    /// 产品类别（program）
    pub program: Option<String>,
    /// 产品编码（commodity）
    pub commodity: Option<String>,
    /// 短信日志按联系人过滤
    pub contact_id: Option<i64>,
}

impl ExportRequest {
    pub fn for_location(location_code: &str) -> Self {
        Self {
            location_code: location_code.to_string(),
            ..Default::default()
        }
    }

    pub fn with_datespan(mut self, span: DateSpan) -> Self {
        self.datespan = Some(span);
        self
    }

    /// 设置类别过滤；"all" 或空串视为不过滤
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = normalize_filter(program).map(|_| program.trim().to_string());
        self
    }

    /// 设置产品过滤；"all" 或空串视为不过滤
    pub fn with_commodity(mut self, commodity: &str) -> Self {
        self.commodity = normalize_filter(commodity);
        self
    }

    pub fn with_contact(mut self, contact_id: i64) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn product_filter(&self) -> ProductFilter {
        ProductFilter {
            product_code: self.commodity.clone(),
            product_type_code: self.program.clone(),
        }
    }
}

fn normalize_filter(raw: &str) -> Option<String> {
    let v = raw.trim().to_lowercase();
    if v.is_empty() || v == "all" {
        None
    } else {
        Some(v)
    }
}
