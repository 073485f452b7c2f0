// ==========================================
// 物资供应链报表系统 - 库存水平判定与汇总引擎
// ==========================================
// 判定（q = 窗口内余额, c = 月均消耗, 阈值单位为月）:
//   q == 0                    → StockOut
//   0 < q < emergency·c       → Emergency
//   q < minimum·c             → Low
//   q <= maximum·c            → Adequate
//   q > maximum·c             → Overstock
//   无余额 / 无可用 c         → Unknown
// 汇总: 位置计数 = 直属站点计数 + Σ 子位置计数（后序递归）
// ==========================================

use crate::config::ReportingConfig;
use crate::domain::location::SupplyPoint;
use crate::domain::types::StockLevel;
use crate::engine::location_tree::LocationIndex;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// 库存水平阈值（月数）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockThresholds {
    pub emergency: f64,
    pub minimum: f64,
    pub maximum: f64,
}

impl From<&ReportingConfig> for StockThresholds {
    fn from(config: &ReportingConfig) -> Self {
        Self {
            emergency: config.months_emergency,
            minimum: config.months_minimum,
            maximum: config.months_maximum,
        }
    }
}

impl Default for StockThresholds {
    fn default() -> Self {
        (&ReportingConfig::default()).into()
    }
}

/// 单站点单产品判定
pub fn classify_stock(
    quantity: Option<i64>,
    monthly_consumption: Option<f64>,
    thresholds: &StockThresholds,
) -> StockLevel {
    let Some(q) = quantity else {
        return StockLevel::Unknown;
    };
    if q == 0 {
        return StockLevel::StockOut;
    }
    let c = match monthly_consumption {
        Some(c) if c > 0.0 => c,
        _ => return StockLevel::Unknown,
    };

    let q = q as f64;
    if q < thresholds.emergency * c {
        StockLevel::Emergency
    } else if q < thresholds.minimum * c {
        StockLevel::Low
    } else if q <= thresholds.maximum * c {
        StockLevel::Adequate
    } else {
        StockLevel::Overstock
    }
}

/// 可用月数
pub fn months_of_stock(quantity: i64, monthly_consumption: Option<f64>) -> Option<f64> {
    match monthly_consumption {
        Some(c) if c > 0.0 => Some(quantity as f64 / c),
        _ => None,
    }
}

/// 由回看期内消耗合计估算月均消耗（按 30 天一月）
pub fn estimate_monthly_consumption(total_consumed: i64, lookback_days: i64) -> Option<f64> {
    if lookback_days <= 0 {
        return None;
    }
    let estimate = total_consumed as f64 * 30.0 / lookback_days as f64;
    (estimate > 0.0).then_some(estimate)
}

/// 各库存水平的站点计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCounts {
    pub stockout: usize,
    pub emergency: usize,
    pub low: usize,
    pub adequate: usize,
    pub overstock: usize,
    pub other: usize,
}

impl StockCounts {
    pub fn record(&mut self, level: StockLevel) {
        match level {
            StockLevel::StockOut => self.stockout += 1,
            StockLevel::Emergency => self.emergency += 1,
            StockLevel::Low => self.low += 1,
            StockLevel::Adequate => self.adequate += 1,
            StockLevel::Overstock => self.overstock += 1,
            StockLevel::Unknown => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.stockout + self.emergency + self.low + self.adequate + self.overstock + self.other
    }

    /// 导出/页面中 "low" 列口径
    pub fn emergency_plus_low(&self) -> usize {
        self.emergency + self.low
    }
}

impl AddAssign for StockCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.stockout += rhs.stockout;
        self.emergency += rhs.emergency;
        self.low += rhs.low;
        self.adequate += rhs.adequate;
        self.overstock += rhs.overstock;
        self.other += rhs.other;
    }
}

/// 位置树上某产品的计数汇总节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStockSummary {
    pub location_code: String,
    pub location_name: String,
    /// 直属站点计数
    pub own: StockCounts,
    /// 含全部后代的汇总计数
    pub counts: StockCounts,
    pub children: Vec<LocationStockSummary>,
}

impl LocationStockSummary {
    pub fn stockout_count(&self) -> usize {
        self.counts.stockout
    }

    pub fn emergency_plus_low(&self) -> usize {
        self.counts.emergency_plus_low()
    }

    pub fn good_supply_count(&self) -> usize {
        self.counts.adequate
    }

    pub fn overstocked_count(&self) -> usize {
        self.counts.overstock
    }

    pub fn other_count(&self) -> usize {
        self.counts.other
    }

    pub fn total(&self) -> usize {
        self.counts.total()
    }
}

/// 后序递归汇总；level_of 返回 None 表示该站点不计入（未启用该产品等）
pub fn aggregate_stock_counts<F>(
    index: &LocationIndex,
    location_code: &str,
    level_of: &F,
) -> Option<LocationStockSummary>
where
    F: Fn(&SupplyPoint) -> Option<StockLevel>,
{
    let location = index.location(location_code)?;

    let mut own = StockCounts::default();
    for sp in index.supply_points_at(location_code, true) {
        if let Some(level) = level_of(sp) {
            own.record(level);
        }
    }

    let children: Vec<LocationStockSummary> = index
        .children(location_code)
        .iter()
        .filter_map(|child| aggregate_stock_counts(index, &child.code, level_of))
        .collect();

    let mut counts = own;
    for child in &children {
        counts += child.counts;
    }

    Some(LocationStockSummary {
        location_code: location.code.clone(),
        location_name: location.name.clone(),
        own,
        counts,
        children,
    })
}
