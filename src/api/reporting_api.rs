// ==========================================
// 物资供应链报表系统 - 报表 API
// ==========================================
// 职责: 上报及时性 / 库存水平汇总 / 站点库存 / 网页录入库存
// 架构: API 层 → Engine 层 (ReportingSnapshot) → Repository 层
// 每次查询加载一次配置与快照，不做跨请求缓存
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::alerts::{Alert, AlertService};
use crate::api::error::{ApiError, ApiResult};
use crate::api::format::{date_last_stocked, months_available, percent};
use crate::config::{ConfigManager, ReportingConfig, ReportingConfigReader};
use crate::domain::{Product, ProductReport, ReportType, ReportingStatus, StockLevel};
use crate::engine::{
    classify_stock, reporting_status, DateSpan, ProductFilter, ReportingBreakdown,
    ReportingRepositories, ReportingSnapshot, ReportingStatusLists, StockCounts, StockThresholds,
};
use crate::i18n::t_with_args;
use crate::repository::ContactRepository;
use crate::sms::ProductReportsHelper;

// ==========================================
// DTO
// ==========================================

/// 上报及时性汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingBreakdownView {
    pub location_code: String,
    pub location_name: String,
    pub breakdown: ReportingBreakdown,
    pub on_time_percent: String,
    pub late_percent: String,
    pub non_reporting_percent: String,
    pub reported_percent: String,
}

impl ReportingBreakdownView {
    fn new(location_code: &str, location_name: &str, breakdown: ReportingBreakdown) -> Self {
        let total = breakdown.total();
        Self {
            location_code: location_code.to_string(),
            location_name: location_name.to_string(),
            on_time_percent: percent(breakdown.on_time.len(), total),
            late_percent: percent(breakdown.late.len(), total),
            non_reporting_percent: percent(breakdown.non_reporting.len(), total),
            reported_percent: percent(breakdown.reported.len(), total),
            breakdown,
        }
    }
}

/// 单产品的库存水平计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockBreakdown {
    pub product_code: String,
    pub product_name: String,
    pub counts: StockCounts,
}

/// 汇总页的一行（下级位置，或无下级时的直属站点）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub code: String,
    pub name: String,
    pub is_facility: bool,
    pub on_time: usize,
    pub late: usize,
    pub non_reporting: usize,
    /// 按过滤后的产品累加
    pub stock: StockCounts,
}

/// 站点库存页的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOnHandRow {
    pub supply_point_code: String,
    pub supply_point_name: String,
    pub product_code: String,
    pub product_name: String,
    pub is_active: bool,
    pub quantity: Option<i64>,
    pub monthly_consumption: Option<f64>,
    pub months_available: Option<String>,
    pub level: StockLevel,
    pub date_last_stocked: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityStockView {
    pub supply_point_code: String,
    pub supply_point_name: String,
    pub last_reported: Option<NaiveDateTime>,
    pub stocks: Vec<StockOnHandRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictStockView {
    pub location_code: String,
    pub location_name: String,
    pub selected_commodity: Option<String>,
    pub selected_commodity_type: Option<String>,
    pub stocks: Vec<StockOnHandRow>,
}

/// 网页录入的一项；quantity/consumption 为原始表单文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInput {
    pub product_code: String,
    pub quantity: String,
    pub consumption: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockCutoffs {
    pub months_minimum: f64,
    pub months_maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    pub excel_export: bool,
    pub navigation_mode: String,
    pub stocked_by: String,
    pub locale: String,
    pub active_stocks: Vec<Product>,
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

// ==========================================
// ReportingApi - 报表 API
// ==========================================
pub struct ReportingApi {
    repos: ReportingRepositories,
    contact_repo: Arc<ContactRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ReportingApi {
    /// 创建新的ReportingApi实例
    ///
    /// # 参数
    /// - repos: 报表相关仓储
    /// - contact_repo: 上报人仓储（告警使用）
    /// - config_manager: 配置管理器
    pub fn new(
        repos: ReportingRepositories,
        contact_repo: Arc<ContactRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            repos,
            contact_repo,
            config_manager,
        }
    }

    fn load_config(&self) -> ApiResult<ReportingConfig> {
        self.config_manager
            .load_reporting_config()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    fn load_snapshot(&self, location_code: &str) -> ApiResult<ReportingSnapshot> {
        if location_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("位置编码不能为空".to_string()));
        }
        let config = self.load_config()?;
        Ok(ReportingSnapshot::load(&self.repos, location_code, config)?)
    }

    fn location_name(snapshot: &ReportingSnapshot) -> String {
        snapshot.root().map(|l| l.name.clone()).unwrap_or_default()
    }

    // ==========================================
    // 上报及时性
    // ==========================================

    /// 位置子树在窗口内的上报及时性
    ///
    /// # 参数
    /// - location_code: 位置编码
    /// - span: 统计窗口
    /// - days_for_late: 宽限天数；None 时取配置值
    #[instrument(skip(self, span), fields(window = %span))]
    pub fn reporting_breakdown(
        &self,
        location_code: &str,
        span: DateSpan,
        days_for_late: Option<i64>,
    ) -> ApiResult<ReportingBreakdownView> {
        let snapshot = self.load_snapshot(location_code)?;
        let days = days_for_late.unwrap_or(snapshot.config().days_for_late);
        let breakdown = snapshot.reporting_breakdown(location_code, span, days);
        Ok(ReportingBreakdownView::new(
            location_code,
            &Self::location_name(&snapshot),
            breakdown,
        ))
    }

    /// 最近 reporting_view_days 天内已上报 / 未上报的站点列表
    pub fn reporting_status(
        &self,
        location_code: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ReportingStatusLists> {
        let snapshot = self.load_snapshot(location_code)?;
        let facilities = snapshot.active_facilities();
        Ok(reporting_status(
            &facilities,
            snapshot.reports(),
            now,
            snapshot.config().reporting_view_days,
        ))
    }

    // ==========================================
    // 库存水平
    // ==========================================

    /// 每个启用产品在位置子树内的库存水平计数
    #[instrument(skip(self, span, filter), fields(window = %span))]
    pub fn stock_breakdown(
        &self,
        location_code: &str,
        span: DateSpan,
        filter: &ProductFilter,
    ) -> ApiResult<Vec<ProductStockBreakdown>> {
        let snapshot = self.load_snapshot(location_code)?;
        let rows = snapshot
            .active_products(filter)
            .into_iter()
            .filter_map(|product| {
                snapshot
                    .stock_summary(location_code, product, &span)
                    .map(|summary| ProductStockBreakdown {
                        product_code: product.sms_code.clone(),
                        product_name: product.name.clone(),
                        counts: summary.counts,
                    })
            })
            .collect();
        Ok(rows)
    }

    /// 下级位置的汇总行，随后是直属本位置的站点行
    ///
    /// 全部行的计数之和等于本位置的汇总
    #[instrument(skip(self, span, filter), fields(window = %span))]
    pub fn aggregate(
        &self,
        location_code: &str,
        span: DateSpan,
        filter: &ProductFilter,
    ) -> ApiResult<Vec<AggregateRow>> {
        let snapshot = self.load_snapshot(location_code)?;
        let index = snapshot.index();
        let days_for_late = snapshot.config().days_for_late;
        let products = snapshot.active_products(filter);

        let mut rows: Vec<AggregateRow> = index
            .children(location_code)
            .into_iter()
            .map(|child| {
                let breakdown = snapshot.reporting_breakdown(&child.code, span, days_for_late);
                let mut stock = StockCounts::default();
                for product in &products {
                    if let Some(summary) = snapshot.stock_summary(&child.code, product, &span) {
                        stock += summary.counts;
                    }
                }
                AggregateRow {
                    code: child.code.clone(),
                    name: child.name.clone(),
                    is_facility: false,
                    on_time: breakdown.on_time.len(),
                    late: breakdown.late.len(),
                    non_reporting: breakdown.non_reporting.len(),
                    stock,
                }
            })
            .collect();

        let facilities = index.supply_points_at(location_code, true);
        if facilities.is_empty() {
            return Ok(rows);
        }
        let breakdown = snapshot.reporting_breakdown(location_code, span, days_for_late);
        rows.extend(facilities.into_iter().map(|sp| {
            let status = breakdown.status_of(&sp.code);
            let mut stock = StockCounts::default();
            for product in &products {
                if let Some(level) = snapshot.stock_level(sp, product, &span) {
                    stock.record(level);
                }
            }
            AggregateRow {
                code: sp.code.clone(),
                name: sp.name.clone(),
                is_facility: true,
                on_time: usize::from(status == Some(ReportingStatus::OnTime)),
                late: usize::from(status == Some(ReportingStatus::Late)),
                non_reporting: usize::from(status == Some(ReportingStatus::NonReporting)),
                stock,
            }
        }));
        Ok(rows)
    }

    fn stock_row(
        snapshot: &ReportingSnapshot,
        thresholds: &StockThresholds,
        supply_point_code: &str,
        supply_point_name: &str,
        product: &Product,
        now: NaiveDateTime,
    ) -> Option<StockOnHandRow> {
        let stock = snapshot.product_stock(supply_point_code, &product.sms_code)?;
        let consumption = snapshot.monthly_consumption(supply_point_code, &product.sms_code, now);
        Some(StockOnHandRow {
            supply_point_code: supply_point_code.to_string(),
            supply_point_name: supply_point_name.to_string(),
            product_code: product.sms_code.clone(),
            product_name: product.name.clone(),
            is_active: stock.is_active,
            quantity: stock.quantity,
            monthly_consumption: consumption,
            months_available: months_available(stock.quantity, consumption),
            level: classify_stock(stock.quantity, consumption, thresholds),
            date_last_stocked: date_last_stocked(
                snapshot,
                supply_point_code,
                &product.sms_code,
                now,
            ),
        })
    }

    /// 单个站点的当前库存（按产品编码排序）
    #[instrument(skip(self))]
    pub fn stock_on_hand_facility(
        &self,
        facility_code: &str,
        now: NaiveDateTime,
    ) -> ApiResult<FacilityStockView> {
        let facility = self
            .repos
            .supply_point_repo
            .find_by_code(facility_code)?
            .ok_or_else(|| ApiError::NotFound(format!("站点(code={})不存在", facility_code)))?;
        let snapshot = self.load_snapshot(&facility.location_code)?;
        let thresholds = StockThresholds::from(snapshot.config());

        let mut products: Vec<&Product> = self
            .repos
            .product_stock_repo
            .list_by_supply_point(&facility.code)?
            .iter()
            .filter_map(|s| snapshot.product(&s.product_code))
            .collect();
        products.sort_by(|a, b| a.sms_code.cmp(&b.sms_code));

        let stocks = products
            .into_iter()
            .filter_map(|p| {
                Self::stock_row(&snapshot, &thresholds, &facility.code, &facility.name, p, now)
            })
            .collect();

        let last_reported = self
            .repos
            .report_repo
            .find_latest_for_supply_point(&facility.code)?
            .map(|r| r.report_date);

        Ok(FacilityStockView {
            supply_point_code: facility.code,
            supply_point_name: facility.name,
            last_reported,
            stocks,
        })
    }

    /// 位置直属站点的库存；商品编码优先于商品类别，未知编码视为全部
    #[instrument(skip(self))]
    pub fn district_stock(
        &self,
        location_code: &str,
        commodity: Option<&str>,
        commodity_type: Option<&str>,
        now: NaiveDateTime,
    ) -> ApiResult<DistrictStockView> {
        let snapshot = self.load_snapshot(location_code)?;
        let thresholds = StockThresholds::from(snapshot.config());

        let mut filter = ProductFilter::default();
        let mut selected_commodity = None;
        let mut selected_commodity_type = None;
        if let Some(code) = commodity {
            if let Some(product) = self.repos.product_repo.find_by_code(code)? {
                filter.product_code = Some(product.sms_code.clone());
                selected_commodity = Some(product.sms_code);
            }
        }
        if selected_commodity.is_none() {
            if let Some(code) = commodity_type {
                if let Some(product_type) = self.repos.product_repo.find_type(code)? {
                    filter.product_type_code = Some(product_type.code.clone());
                    selected_commodity_type = Some(product_type.code);
                }
            }
        }

        let mut stocks = Vec::new();
        for sp in snapshot.index().supply_points_at(location_code, false) {
            for product in snapshot.active_products(&filter) {
                if let Some(row) =
                    Self::stock_row(&snapshot, &thresholds, &sp.code, &sp.name, product, now)
                {
                    stocks.push(row);
                }
            }
        }

        Ok(DistrictStockView {
            location_code: location_code.to_string(),
            location_name: Self::location_name(&snapshot),
            selected_commodity,
            selected_commodity_type,
            stocks,
        })
    }

    // ==========================================
    // 网页录入
    // ==========================================

    /// 网页录入站点库存
    ///
    /// 只处理站点已有库存行的产品；任一数量不是非负整数时不写入上报，
    /// 但已处理的启用/停用状态保留。
    ///
    /// # 返回
    /// - 写入的上报记录
    /// - ApiError::InputValidationError: 有数量不合法
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn input_stock(
        &self,
        facility_code: &str,
        entries: &[StockInput],
        now: NaiveDateTime,
    ) -> ApiResult<Vec<ProductReport>> {
        let facility = self
            .repos
            .supply_point_repo
            .find_by_code(facility_code)?
            .ok_or_else(|| ApiError::NotFound(format!("站点(code={})不存在", facility_code)))?;

        let stocks = self
            .repos
            .product_stock_repo
            .list_by_supply_point(&facility.code)?;
        let mut helper = ProductReportsHelper::new(&facility.code, ReportType::StockOnHand, None);
        let mut bad_fields: Vec<String> = Vec::new();

        for stock in &stocks {
            let Some(entry) = entries
                .iter()
                .find(|e| e.product_code.trim().eq_ignore_ascii_case(&stock.product_code))
            else {
                continue;
            };
            let name = self
                .repos
                .product_repo
                .find_by_code(&stock.product_code)?
                .map(|p| p.name)
                .unwrap_or_else(|| stock.product_code.clone());

            let quantity = entry.quantity.trim();
            if !is_digits(quantity) {
                bad_fields.push(name);
                continue;
            }
            let Ok(quantity) = quantity.parse::<i64>() else {
                bad_fields.push(name);
                continue;
            };
            helper.add_stock(&stock.product_code, quantity);

            if let Some(consumption) = entry.consumption.as_deref().map(str::trim) {
                match consumption.parse::<i64>() {
                    Ok(c) if is_digits(consumption) => helper.add_consumption(&stock.product_code, c),
                    _ => {
                        bad_fields.push(name);
                        continue;
                    }
                }
            }

            self.repos.product_stock_repo.set_active(
                &facility.code,
                &stock.product_code,
                entry.is_active,
                now,
            )?;
        }

        if !bad_fields.is_empty() {
            let fields = bad_fields.join(", ");
            tracing::warn!(facility = %facility.code, fields = %fields, "录入数量不合法");
            return Err(ApiError::InputValidationError {
                message: t_with_args("input.invalid_integers", &[("fields", fields.as_str())]),
                fields: bad_fields,
            });
        }

        Ok(helper.save(&self.repos, now)?)
    }

    // ==========================================
    // 告警
    // ==========================================

    /// 仪表盘告警（三类合并）
    pub fn dashboard_alerts(&self, location_code: &str, now: NaiveDateTime) -> ApiResult<Vec<Alert>> {
        let config = self.load_config()?;
        let service = AlertService::new(self.repos.clone(), self.contact_repo.clone());

        let mut alerts = Vec::new();
        for batch in [
            service.non_reporting_facilities(location_code, now, &config)?,
            service.facilities_without_reminders(location_code)?,
            service.facilities_without_reporters(location_code)?,
        ]
        .into_iter()
        .flatten()
        {
            alerts.extend(batch);
        }
        Ok(alerts)
    }

    // ==========================================
    // 界面参数
    // ==========================================

    pub fn stock_cutoffs(&self) -> ApiResult<StockCutoffs> {
        let config = self.load_config()?;
        Ok(StockCutoffs {
            months_minimum: config.months_minimum,
            months_maximum: config.months_maximum,
        })
    }

    pub async fn ui_settings(&self) -> ApiResult<UiSettings> {
        let excel_export = self
            .config_manager
            .is_excel_export_enabled()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let config = self
            .config_manager
            .read_reporting_config()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        Ok(UiSettings {
            excel_export,
            navigation_mode: config.navigation_mode,
            stocked_by: config.stocked_by.as_str().to_string(),
            locale: config.locale,
            active_stocks: self.repos.product_repo.list_active(None)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_digits() {
        assert!(is_digits("100"));
        assert!(!is_digits(""));
        assert!(!is_digits("-5"));
        assert!(!is_digits("1.5"));
        assert!(!is_digits("ten"));
    }
}
