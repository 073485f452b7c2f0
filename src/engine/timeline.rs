// ==========================================
// 物资供应链报表系统 - 上报/流水时间线索引
// ==========================================
// 站点 → (类型|产品) → 按时间升序的记录
// 每次查询从仓储结果重新构建
// ==========================================

use crate::domain::report::{ProductReport, StockTransaction};
use crate::domain::types::ReportType;
use crate::engine::datespan::DateSpan;
use chrono::NaiveDateTime;
use std::collections::HashMap;

// ==========================================
// ReportTimeline - 上报时间线
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReportTimeline {
    by_supply_point: HashMap<String, HashMap<ReportType, Vec<ProductReport>>>,
}

impl ReportTimeline {
    pub fn from_reports(reports: Vec<ProductReport>) -> Self {
        let mut by_supply_point: HashMap<String, HashMap<ReportType, Vec<ProductReport>>> =
            HashMap::new();
        for report in reports {
            by_supply_point
                .entry(report.supply_point_code.clone())
                .or_default()
                .entry(report.report_type)
                .or_default()
                .push(report);
        }
        for by_type in by_supply_point.values_mut() {
            for list in by_type.values_mut() {
                list.sort_by(|a, b| (a.report_date, a.id).cmp(&(b.report_date, b.id)));
            }
        }
        Self { by_supply_point }
    }

    fn reports(&self, supply_point_code: &str, report_type: ReportType) -> &[ProductReport] {
        self.by_supply_point
            .get(supply_point_code)
            .and_then(|m| m.get(&report_type))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 严格早于 end 的最近一次上报（任意产品）
    pub fn latest_before(
        &self,
        supply_point_code: &str,
        report_type: ReportType,
        end: NaiveDateTime,
    ) -> Option<&ProductReport> {
        let list = self.reports(supply_point_code, report_type);
        let idx = list.partition_point(|r| r.report_date < end);
        idx.checked_sub(1).map(|i| &list[i])
    }

    /// 窗口内的上报
    pub fn in_window(
        &self,
        supply_point_code: &str,
        report_type: ReportType,
        span: &DateSpan,
    ) -> &[ProductReport] {
        let list = self.reports(supply_point_code, report_type);
        let lo = list.partition_point(|r| r.report_date < span.start);
        let hi = list.partition_point(|r| r.report_date < span.end);
        &list[lo..hi.max(lo)]
    }

    pub fn has_report_in(
        &self,
        supply_point_code: &str,
        report_type: ReportType,
        span: &DateSpan,
    ) -> bool {
        !self.in_window(supply_point_code, report_type, span).is_empty()
    }

    /// 窗口内某产品的上报数量合计
    pub fn quantity_in_window(
        &self,
        supply_point_code: &str,
        product_code: &str,
        report_type: ReportType,
        span: &DateSpan,
    ) -> i64 {
        self.in_window(supply_point_code, report_type, span)
            .iter()
            .filter(|r| r.product_code == product_code)
            .map(|r| r.quantity)
            .sum()
    }
}

// ==========================================
// TransactionTimeline - 库存流水时间线
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TransactionTimeline {
    by_supply_point: HashMap<String, HashMap<String, Vec<StockTransaction>>>,
}

impl TransactionTimeline {
    pub fn from_transactions(transactions: Vec<StockTransaction>) -> Self {
        let mut by_supply_point: HashMap<String, HashMap<String, Vec<StockTransaction>>> =
            HashMap::new();
        for tx in transactions {
            by_supply_point
                .entry(tx.supply_point_code.clone())
                .or_default()
                .entry(tx.product_code.clone())
                .or_default()
                .push(tx);
        }
        for by_product in by_supply_point.values_mut() {
            for list in by_product.values_mut() {
                list.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id)));
            }
        }
        Self { by_supply_point }
    }

    fn transactions(&self, supply_point_code: &str, product_code: &str) -> &[StockTransaction] {
        self.by_supply_point
            .get(supply_point_code)
            .and_then(|m| m.get(product_code))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 窗口内最后一笔流水的期末余额
    pub fn balance_in_window(
        &self,
        supply_point_code: &str,
        product_code: &str,
        span: &DateSpan,
    ) -> Option<i64> {
        let list = self.transactions(supply_point_code, product_code);
        let hi = list.partition_point(|t| t.date < span.end);
        let last = list[..hi].last()?;
        (last.date >= span.start).then_some(last.ending_balance)
    }

    /// 截至 at（包含）的最新余额
    pub fn balance_at(
        &self,
        supply_point_code: &str,
        product_code: &str,
        at: NaiveDateTime,
    ) -> Option<i64> {
        let list = self.transactions(supply_point_code, product_code);
        let hi = list.partition_point(|t| t.date <= at);
        list[..hi].last().map(|t| t.ending_balance)
    }

    /// 截至 at（包含）最后一次余额大于零的时间
    pub fn date_last_stocked(
        &self,
        supply_point_code: &str,
        product_code: &str,
        at: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let list = self.transactions(supply_point_code, product_code);
        let hi = list.partition_point(|t| t.date <= at);
        list[..hi]
            .iter()
            .rev()
            .find(|t| t.ending_balance > 0)
            .map(|t| t.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn report(id: i64, sp: &str, product: &str, t: ReportType, qty: i64, day: u32) -> ProductReport {
        ProductReport {
            id,
            supply_point_code: sp.to_string(),
            product_code: product.to_string(),
            report_type: t,
            quantity: qty,
            report_date: at(day),
            message_id: None,
        }
    }

    fn tx(id: i64, product: &str, day: u32, ending: i64) -> StockTransaction {
        StockTransaction {
            id,
            supply_point_code: "SP1".to_string(),
            product_code: product.to_string(),
            product_report_id: None,
            date: at(day),
            beginning_balance: 0,
            quantity: ending,
            ending_balance: ending,
        }
    }

    #[test]
    fn test_latest_before_excludes_end() {
        let timeline = ReportTimeline::from_reports(vec![
            report(2, "SP1", "jd", ReportType::StockOnHand, 5, 10),
            report(1, "SP1", "jd", ReportType::StockOnHand, 3, 2),
        ]);
        let latest = timeline.latest_before("SP1", ReportType::StockOnHand, at(10)).unwrap();
        assert_eq!(latest.id, 1);
        assert!(timeline.latest_before("SP1", ReportType::StockOnHand, at(2)).is_none());
        assert!(timeline.latest_before("SP9", ReportType::StockOnHand, at(20)).is_none());
    }

    #[test]
    fn test_quantity_in_window_filters_product() {
        let timeline = ReportTimeline::from_reports(vec![
            report(1, "SP1", "jd", ReportType::Consumption, 4, 3),
            report(2, "SP1", "co", ReportType::Consumption, 9, 3),
            report(3, "SP1", "jd", ReportType::Consumption, 6, 5),
            report(4, "SP1", "jd", ReportType::Consumption, 100, 8),
        ]);
        let span = DateSpan::new(at(3), at(8));
        assert_eq!(timeline.quantity_in_window("SP1", "jd", ReportType::Consumption, &span), 10);
    }

    #[test]
    fn test_balance_in_window() {
        let timeline = TransactionTimeline::from_transactions(vec![
            tx(1, "jd", 1, 20),
            tx(2, "jd", 5, 0),
            tx(3, "jd", 9, 12),
        ]);
        assert_eq!(timeline.balance_in_window("SP1", "jd", &DateSpan::new(at(2), at(9))), Some(0));
        assert_eq!(timeline.balance_in_window("SP1", "jd", &DateSpan::new(at(6), at(9))), None);
        assert_eq!(timeline.balance_at("SP1", "jd", at(9)), Some(12));
        assert_eq!(timeline.date_last_stocked("SP1", "jd", at(8)), Some(at(1)));
    }
}
