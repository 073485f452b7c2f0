// ==========================================
// 物资供应链报表系统 - 报表快照
// ==========================================
// 职责: 为一棵位置子树一次性加载全部只读数据，构建显式索引
//       位置树 / 产品 / 站点库存 / 上报时间线 / 流水时间线
// 红线: 快照构建后不再访问数据库；同一批上报重复计算结果一致
// ==========================================

use crate::config::ReportingConfig;
use crate::domain::location::{Location, SupplyPoint};
use crate::domain::product::{Product, ProductStock};
use crate::domain::types::{ReportType, StockLevel};
use crate::engine::datespan::DateSpan;
use crate::engine::location_tree::{LocationIndex, LocationTreeError};
use crate::engine::reporting::ReportingBreakdown;
use crate::engine::repositories::ReportingRepositories;
use crate::engine::stock_status::{
    aggregate_stock_counts, classify_stock, estimate_monthly_consumption, LocationStockSummary,
    StockThresholds,
};
use crate::engine::timeline::{ReportTimeline, TransactionTimeline};
use crate::repository::{ReportFilter, RepositoryError};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("位置不存在: {0}")]
    LocationNotFound(String),

    #[error(transparent)]
    Tree(#[from] LocationTreeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 产品过滤（编码优先于类别）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub product_code: Option<String>,
    pub product_type_code: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(code) = &self.product_code {
            return &product.sms_code == code;
        }
        if let Some(type_code) = &self.product_type_code {
            return product.type_code.as_deref() == Some(type_code.as_str());
        }
        true
    }
}

/// 一棵位置子树的只读快照
#[derive(Debug, Clone)]
pub struct ReportingSnapshot {
    root_code: String,
    index: LocationIndex,
    products: Vec<Product>,
    stocks: HashMap<(String, String), ProductStock>,
    reports: ReportTimeline,
    transactions: TransactionTimeline,
    config: ReportingConfig,
}

impl ReportingSnapshot {
    /// 从仓储加载 location_code 子树的快照
    #[instrument(skip(repos, config))]
    pub fn load(
        repos: &ReportingRepositories,
        location_code: &str,
        config: ReportingConfig,
    ) -> Result<Self, SnapshotError> {
        let index = repos.load_location_index()?;

        if index.location(location_code).is_none() {
            return Err(SnapshotError::LocationNotFound(location_code.to_string()));
        }

        let sp_codes: Vec<String> = index
            .supply_points_under(location_code, false)
            .iter()
            .map(|sp| sp.code.clone())
            .collect();

        let products = repos.product_repo.list_all()?;
        let stocks = repos
            .product_stock_repo
            .list_by_supply_points(&sp_codes)?
            .into_iter()
            .map(|s| ((s.supply_point_code.clone(), s.product_code.clone()), s))
            .collect();
        let reports = repos.report_repo.list(&ReportFilter {
            supply_point_codes: Some(sp_codes.clone()),
            ..Default::default()
        })?;
        let transactions = repos
            .transaction_repo
            .list_for_supply_points(&sp_codes, None)?;

        tracing::debug!(
            supply_points = sp_codes.len(),
            reports = reports.len(),
            transactions = transactions.len(),
            "快照加载完成"
        );

        Ok(Self::from_parts(
            location_code,
            index,
            products,
            stocks,
            ReportTimeline::from_reports(reports),
            TransactionTimeline::from_transactions(transactions),
            config,
        ))
    }

    /// 由已构建的索引组装快照
    pub fn from_parts(
        root_code: &str,
        index: LocationIndex,
        products: Vec<Product>,
        stocks: HashMap<(String, String), ProductStock>,
        reports: ReportTimeline,
        transactions: TransactionTimeline,
        config: ReportingConfig,
    ) -> Self {
        Self {
            root_code: root_code.to_string(),
            index,
            products,
            stocks,
            reports,
            transactions,
            config,
        }
    }

    // ===== 访问器 =====

    pub fn root(&self) -> Option<&Location> {
        self.index.location(&self.root_code)
    }

    pub fn root_code(&self) -> &str {
        &self.root_code
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn reports(&self) -> &ReportTimeline {
        &self.reports
    }

    pub fn transactions(&self) -> &TransactionTimeline {
        &self.transactions
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }

    /// 子树内的启用站点
    pub fn active_facilities(&self) -> Vec<&SupplyPoint> {
        self.index.all_child_facilities(&self.root_code)
    }

    /// 启用产品（按名称），按过滤条件筛选
    pub fn active_products(&self, filter: &ProductFilter) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.is_active && filter.matches(p))
            .collect()
    }

    pub fn product(&self, sms_code: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sms_code == sms_code)
    }

    pub fn product_stock(&self, supply_point_code: &str, product_code: &str) -> Option<&ProductStock> {
        self.stocks
            .get(&(supply_point_code.to_string(), product_code.to_string()))
    }

    /// 站点当前在用的库存行（按产品名称排序）
    pub fn stocks_for(&self, supply_point_code: &str) -> Vec<(&Product, &ProductStock)> {
        self.products
            .iter()
            .filter(|p| p.is_active)
            .filter_map(|p| {
                self.product_stock(supply_point_code, &p.sms_code)
                    .filter(|s| s.is_active)
                    .map(|s| (p, s))
            })
            .collect()
    }

    /// 站点是否在用该产品
    pub fn stocks_product(&self, supply_point_code: &str, product_code: &str) -> bool {
        self.product_stock(supply_point_code, product_code)
            .map(|s| s.is_active)
            .unwrap_or(false)
    }

    // ===== 计算 =====

    /// 月均消耗: 人工值 → 回看期估算 → 产品默认值
    pub fn monthly_consumption(
        &self,
        supply_point_code: &str,
        product_code: &str,
        at: NaiveDateTime,
    ) -> Option<f64> {
        let manual = self
            .product_stock(supply_point_code, product_code)
            .and_then(|s| s.monthly_consumption)
            .filter(|c| *c > 0.0);
        if manual.is_some() {
            return manual;
        }

        let lookback = self.config.consumption_lookback_days;
        let span = DateSpan::new(at - Duration::days(lookback), at);
        let consumed =
            self.reports
                .quantity_in_window(supply_point_code, product_code, ReportType::Consumption, &span);
        if let Some(estimate) = estimate_monthly_consumption(consumed, lookback) {
            return Some(estimate);
        }

        self.product(product_code)
            .and_then(|p| p.average_monthly_consumption)
            .filter(|c| *c > 0.0)
    }

    /// 单站点单产品在窗口内的库存水平；不计入时返回 None
    pub fn stock_level(
        &self,
        supply_point: &SupplyPoint,
        product: &Product,
        span: &DateSpan,
    ) -> Option<StockLevel> {
        if !supply_point.active || !product.is_active {
            return None;
        }
        if !self.stocks_product(&supply_point.code, &product.sms_code) {
            return None;
        }
        let quantity =
            self.transactions
                .balance_in_window(&supply_point.code, &product.sms_code, span);
        let consumption = self.monthly_consumption(&supply_point.code, &product.sms_code, span.end);
        Some(classify_stock(
            quantity,
            consumption,
            &StockThresholds::from(&self.config),
        ))
    }

    /// 某位置（需在快照子树内）某产品的递归计数汇总
    pub fn stock_summary(
        &self,
        location_code: &str,
        product: &Product,
        span: &DateSpan,
    ) -> Option<LocationStockSummary> {
        aggregate_stock_counts(&self.index, location_code, &|sp: &SupplyPoint| {
            self.stock_level(sp, product, span)
        })
    }

    /// 某位置子树的上报及时性
    pub fn reporting_breakdown(
        &self,
        location_code: &str,
        span: DateSpan,
        days_for_late: i64,
    ) -> ReportingBreakdown {
        let facilities = self.index.all_child_facilities(location_code);
        ReportingBreakdown::compute(&facilities, &self.reports, span, days_for_late)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::LocationType;
    use crate::domain::report::{ProductReport, StockTransaction};
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn stock(sp: &str, product: &str, active: bool, manual: Option<f64>) -> ProductStock {
        ProductStock {
            supply_point_code: sp.to_string(),
            product_code: product.to_string(),
            is_active: active,
            quantity: None,
            monthly_consumption: manual,
            last_modified: at(1),
        }
    }

    fn snapshot() -> ReportingSnapshot {
        let types = vec![LocationType { code: "d".into(), name: "District".into(), display_order: Some(1) }];
        let index = LocationIndex::build(
            vec![Location::new("D", "District", "d", None)],
            &types,
            vec![
                SupplyPoint::new("SP1", "One", "D"),
                SupplyPoint::new("SP2", "Two", "D"),
            ],
        )
        .unwrap();

        let mut jd = Product::new("jd", "Jadelle", Some("fp"));
        jd.average_monthly_consumption = Some(100.0);
        let products = vec![jd, Product::new("co", "Condoms", Some("fp"))];

        let stocks: HashMap<(String, String), ProductStock> = [
            stock("SP1", "jd", true, Some(10.0)),
            stock("SP2", "jd", true, None),
            stock("SP2", "co", false, None),
        ]
        .into_iter()
        .map(|s| ((s.supply_point_code.clone(), s.product_code.clone()), s))
        .collect();

        let reports = ReportTimeline::from_reports(vec![ProductReport {
            id: 1,
            supply_point_code: "SP2".into(),
            product_code: "jd".into(),
            report_type: ReportType::Consumption,
            quantity: 30,
            report_date: at(5),
            message_id: None,
        }]);
        let tx = |id, sp: &str, day, bal| StockTransaction {
            id,
            supply_point_code: sp.into(),
            product_code: "jd".into(),
            product_report_id: None,
            date: at(day),
            beginning_balance: 0,
            quantity: bal,
            ending_balance: bal,
        };
        let transactions =
            TransactionTimeline::from_transactions(vec![tx(1, "SP1", 10, 5), tx(2, "SP2", 10, 50)]);

        let mut config = ReportingConfig::default();
        config.consumption_lookback_days = 30;
        ReportingSnapshot::from_parts("D", index, products, stocks, reports, transactions, config)
    }

    #[test]
    fn test_consumption_sources() {
        let s = snapshot();
        // 人工值优先
        assert_eq!(s.monthly_consumption("SP1", "jd", at(20)), Some(10.0));
        // 回看期估算: 30 * 30 / 30
        assert_eq!(s.monthly_consumption("SP2", "jd", at(20)), Some(30.0));
        // 回看期无消耗时退回产品默认值
        assert_eq!(s.monthly_consumption("SP2", "jd", at(5)), Some(100.0));
    }

    #[test]
    fn test_stock_levels_and_summary() {
        let s = snapshot();
        let span = DateSpan::new(at(8), at(15));
        let jd = s.product("jd").unwrap().clone();

        let summary = s.stock_summary("D", &jd, &span).unwrap();
        // SP1: 5 / 10 → low; SP2: 50 / 30 → adequate
        assert_eq!(summary.emergency_plus_low(), 1);
        assert_eq!(summary.good_supply_count(), 1);
        assert_eq!(summary.total(), 2);

        // 站点停用该产品时不计入
        let co = s.product("co").unwrap().clone();
        assert_eq!(s.stock_summary("D", &co, &span).unwrap().total(), 0);
    }

    #[test]
    fn test_product_filter() {
        let s = snapshot();
        let by_code = ProductFilter { product_code: Some("co".into()), product_type_code: None };
        assert_eq!(s.active_products(&by_code).len(), 1);
        let by_type = ProductFilter { product_code: None, product_type_code: Some("fp".into()) };
        assert_eq!(s.active_products(&by_type).len(), 2);
        assert_eq!(s.stocks_for("SP2").len(), 1);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let s = snapshot();
        let span = DateSpan::new(at(8), at(15));
        let jd = s.product("jd").unwrap().clone();
        assert_eq!(s.stock_summary("D", &jd, &span), s.stock_summary("D", &jd, &span));
    }
}
