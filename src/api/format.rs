// ==========================================
// 物资供应链报表系统 - 展示格式化
// ==========================================
// 百分比 / 可用月数 / 最近有货日期
// ==========================================

use crate::engine::{months_of_stock, ReportingSnapshot};
use chrono::NaiveDateTime;

/// a 占 b 的百分比，保留一位小数；b 为 0 时为 "0.0%"
pub fn percent(a: usize, b: usize) -> String {
    if b == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", a as f64 * 100.0 / b as f64)
}

/// 可用月数（一位小数）；无库存或无月均消耗时为 None
pub fn months_available(quantity: Option<i64>, monthly_consumption: Option<f64>) -> Option<String> {
    months_of_stock(quantity?, monthly_consumption).map(|m| format!("{:.1}", m))
}

/// 截至 at 最后一次有货的时间
pub fn date_last_stocked(
    snapshot: &ReportingSnapshot,
    supply_point_code: &str,
    product_code: &str,
    at: NaiveDateTime,
) -> Option<NaiveDateTime> {
    snapshot
        .transactions()
        .date_last_stocked(supply_point_code, product_code, at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), "33.3%");
        assert_eq!(percent(2, 2), "100.0%");
        assert_eq!(percent(5, 0), "0.0%");
    }

    #[test]
    fn test_months_available() {
        assert_eq!(months_available(Some(30), Some(20.0)), Some("1.5".to_string()));
        assert_eq!(months_available(Some(30), None), None);
        assert_eq!(months_available(None, Some(20.0)), None);
        assert_eq!(months_available(Some(30), Some(0.0)), None);
    }
}
