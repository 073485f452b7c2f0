// ==========================================
// 物资供应链报表系统 - 上报写入助手
// ==========================================
// 一次提交（短信或网页表单）对应一个站点的一组产品数量
// save 在单个事务内依次写入: 上报、余额流水、站点库存、最近上报时间
// ==========================================

use crate::domain::report::{NewProductReport, ProductReport, StockTransaction};
use crate::domain::types::ReportType;
use crate::engine::ReportingRepositories;
use crate::repository::product_repo::set_stock_quantity;
use crate::repository::report_repo::{insert_report, insert_stock_transaction, latest_balance_at};
use crate::repository::supply_point_repo::mark_reported;
use crate::sms::error::SmsResult;
use crate::sms::parser::parse_product_quantities;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct ProductReportsHelper {
    supply_point_code: String,
    report_type: ReportType,
    message_id: Option<i64>,
    stock: Vec<(String, i64)>,
    receipts: Vec<(String, i64)>,
    consumption: Vec<(String, i64)>,
}

impl ProductReportsHelper {
    pub fn new(supply_point_code: &str, report_type: ReportType, message_id: Option<i64>) -> Self {
        Self {
            supply_point_code: supply_point_code.to_string(),
            report_type,
            message_id,
            stock: Vec::new(),
            receipts: Vec::new(),
            consumption: Vec::new(),
        }
    }

    pub fn supply_point_code(&self) -> &str {
        &self.supply_point_code
    }

    /// 解析短信文本，数量计入本次上报类型对应的列表
    pub fn parse<F>(&mut self, text: &str, is_known: F) -> SmsResult<()>
    where
        F: Fn(&str) -> bool,
    {
        for (code, quantity) in parse_product_quantities(text, is_known)? {
            match self.report_type {
                ReportType::Receipt => self.add_receipt(&code, quantity),
                ReportType::Consumption => self.add_consumption(&code, quantity),
                _ => self.add_stock(&code, quantity),
            }
        }
        Ok(())
    }

    pub fn add_stock(&mut self, product_code: &str, quantity: i64) {
        self.stock.push((product_code.to_string(), quantity));
    }

    pub fn add_receipt(&mut self, product_code: &str, quantity: i64) {
        self.receipts.push((product_code.to_string(), quantity));
    }

    pub fn add_consumption(&mut self, product_code: &str, quantity: i64) {
        self.consumption.push((product_code.to_string(), quantity));
    }

    pub fn receipts(&self) -> &[(String, i64)] {
        &self.receipts
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty() && self.receipts.is_empty() && self.consumption.is_empty()
    }

    /// 本次上报涉及的产品（库存、收货，去重保序）
    pub fn reported_products(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.stock
            .iter()
            .chain(self.receipts.iter())
            .filter(|(code, _)| seen.insert(code.clone()))
            .map(|(code, _)| code.clone())
            .collect()
    }

    fn stock_report_type(&self) -> ReportType {
        match self.report_type {
            ReportType::Requisition => ReportType::Requisition,
            _ => ReportType::StockOnHand,
        }
    }

    /// 写入全部上报，返回写入的记录
    #[instrument(skip(self, repos), fields(supply_point = %self.supply_point_code, report_type = %self.report_type))]
    pub fn save(
        &self,
        repos: &ReportingRepositories,
        at: NaiveDateTime,
    ) -> SmsResult<Vec<ProductReport>> {
        let stock_type = self.stock_report_type();
        let entries = self
            .stock
            .iter()
            .map(|(code, q)| (code, *q, stock_type))
            .chain(self.receipts.iter().map(|(c, q)| (c, *q, ReportType::Receipt)))
            .chain(
                self.consumption
                    .iter()
                    .map(|(c, q)| (c, *q, ReportType::Consumption)),
            );

        let saved = repos.report_repo.with_transaction(|conn| -> SmsResult<_> {
            let mut saved = Vec::new();
            let mut stock_reported = false;
            for (product_code, quantity, report_type) in entries {
                let report = insert_report(
                    conn,
                    &NewProductReport {
                        supply_point_code: self.supply_point_code.clone(),
                        product_code: product_code.clone(),
                        report_type,
                        quantity,
                        report_date: at,
                        message_id: self.message_id,
                    },
                )?;

                if report_type.affects_balance() {
                    let previous =
                        latest_balance_at(conn, &self.supply_point_code, product_code, at)?;
                    if let Some(tx) = StockTransaction::derive(&report, previous)? {
                        insert_stock_transaction(conn, &tx)?;
                        set_stock_quantity(
                            conn,
                            &self.supply_point_code,
                            product_code,
                            tx.ending_balance,
                            at,
                        )?;
                    }
                }
                stock_reported |= report_type == ReportType::StockOnHand;
                saved.push(report);
            }

            if stock_reported {
                mark_reported(conn, &self.supply_point_code, at)?;
            }
            Ok(saved)
        })?;

        tracing::info!(reports = saved.len(), "上报已保存");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(code: &str) -> bool {
        matches!(code, "jd" | "mc")
    }

    #[test]
    fn test_parse_routes_by_report_type() {
        let mut soh = ProductReportsHelper::new("SP1", ReportType::StockOnHand, None);
        soh.parse("jd 10 mc 0", known).unwrap();
        assert_eq!(soh.reported_products(), vec!["jd", "mc"]);
        assert!(soh.receipts().is_empty());

        let mut rec = ProductReportsHelper::new("SP1", ReportType::Receipt, Some(3));
        rec.parse("mc 5 mc 6", known).unwrap();
        assert_eq!(rec.receipts().len(), 2);
        assert_eq!(rec.reported_products(), vec!["mc"]);
    }

    #[test]
    fn test_parse_error_leaves_helper_empty() {
        let mut helper = ProductReportsHelper::new("SP1", ReportType::StockOnHand, None);
        assert!(helper.parse("jd 10 zz 4", known).is_err());
        assert!(helper.is_empty());
    }
}
