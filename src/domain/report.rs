// ==========================================
// 物资供应链报表系统 - 上报事实与库存流水
// ==========================================
// ProductReport: 不可变事实
// StockTransaction: 由 SOH/收货上报派生的余额流水
// ==========================================

use crate::domain::types::ReportType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 产品上报（不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub id: i64,
    pub supply_point_code: String,
    pub product_code: String,
    pub report_type: ReportType,
    pub quantity: i64,
    pub report_date: NaiveDateTime,
    /// 来源短信（网页录入时为 None）
    pub message_id: Option<i64>,
}

/// 待写入的产品上报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductReport {
    pub supply_point_code: String,
    pub product_code: String,
    pub report_type: ReportType,
    pub quantity: i64,
    pub report_date: NaiveDateTime,
    pub message_id: Option<i64>,
}

/// 库存余额流水
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: i64,
    pub supply_point_code: String,
    pub product_code: String,
    pub product_report_id: Option<i64>,
    pub date: NaiveDateTime,
    pub beginning_balance: i64,
    /// 变动量（ending - beginning）
    pub quantity: i64,
    pub ending_balance: i64,
}

/// 收货累加后余额超出 i64 范围
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("余额溢出: {product_code} 期初 {beginning} + {quantity}")]
pub struct BalanceOverflow {
    pub product_code: String,
    pub beginning: i64,
    pub quantity: i64,
}

impl StockTransaction {
    /// 根据上报与前一余额推导流水
    ///
    /// - SOH: 期末 = 上报数量
    /// - 收货: 期末 = 期初 + 上报数量
    /// - 其他类型不产生流水
    pub fn derive(
        report: &ProductReport,
        previous_balance: Option<i64>,
    ) -> Result<Option<Self>, BalanceOverflow> {
        let beginning = previous_balance.unwrap_or(0);
        let overflow = || BalanceOverflow {
            product_code: report.product_code.clone(),
            beginning,
            quantity: report.quantity,
        };
        let ending = match report.report_type {
            ReportType::StockOnHand => report.quantity,
            ReportType::Receipt => beginning.checked_add(report.quantity).ok_or_else(overflow)?,
            _ => return Ok(None),
        };
        let quantity = ending.checked_sub(beginning).ok_or_else(overflow)?;
        Ok(Some(Self {
            id: 0,
            supply_point_code: report.supply_point_code.clone(),
            product_code: report.product_code.clone(),
            product_report_id: Some(report.id),
            date: report.report_date,
            beginning_balance: beginning,
            quantity,
            ending_balance: ending,
        }))
    }
}

/// 供应商调拨（收货短信 "from xxx"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: i64,
    pub supply_point_code: String,
    pub supplier: String,
    pub product_code: String,
    pub quantity: i64,
    pub date: NaiveDateTime,
    pub product_report_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report(report_type: ReportType, quantity: i64) -> ProductReport {
        ProductReport {
            id: 7,
            supply_point_code: "SP1".to_string(),
            product_code: "jd".to_string(),
            report_type,
            quantity,
            report_date: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            message_id: None,
        }
    }

    #[test]
    fn test_derive_soh_replaces_balance() {
        let tx = StockTransaction::derive(&report(ReportType::StockOnHand, 40), Some(100))
            .unwrap()
            .unwrap();
        assert_eq!(tx.beginning_balance, 100);
        assert_eq!(tx.ending_balance, 40);
        assert_eq!(tx.quantity, -60);
        assert_eq!(tx.product_report_id, Some(7));
    }

    #[test]
    fn test_derive_receipt_adds_to_balance() {
        let tx = StockTransaction::derive(&report(ReportType::Receipt, 25), Some(10))
            .unwrap()
            .unwrap();
        assert_eq!(tx.ending_balance, 35);

        let first = StockTransaction::derive(&report(ReportType::Receipt, 25), None)
            .unwrap()
            .unwrap();
        assert_eq!(first.beginning_balance, 0);
        assert_eq!(first.ending_balance, 25);
    }

    #[test]
    fn test_derive_consumption_has_no_transaction() {
        assert!(StockTransaction::derive(&report(ReportType::Consumption, 5), Some(10))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_derive_receipt_overflow_is_rejected() {
        let err = StockTransaction::derive(&report(ReportType::Receipt, i64::MAX), Some(10))
            .unwrap_err();
        assert_eq!(err.product_code, "jd");
        assert_eq!(err.beginning, 10);

        // 负的期初余额下 SOH 变动量同样可能溢出
        assert!(StockTransaction::derive(&report(ReportType::StockOnHand, i64::MAX), Some(-1))
            .is_err());
    }
}
