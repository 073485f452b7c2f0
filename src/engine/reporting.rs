// ==========================================
// 物资供应链报表系统 - 上报及时性判定引擎
// ==========================================
// 输入: 站点集合 + SOH 上报时间线 + 窗口 [start, end) + 宽限天数 d
// 判定: 取 end 之前最近一次 SOH 上报 t
//   - 无上报          → NonReporting
//   - t >= start - d  → OnTime
//   - 其余            → Late
// 三类互斥且覆盖全部站点
// ==========================================

use crate::domain::location::SupplyPoint;
use crate::domain::types::{ReportType, ReportingStatus};
use crate::engine::datespan::DateSpan;
use crate::engine::timeline::ReportTimeline;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 单站点判定
pub fn classify_reporting(
    latest: Option<NaiveDateTime>,
    span: &DateSpan,
    days_for_late: i64,
) -> ReportingStatus {
    match latest {
        None => ReportingStatus::NonReporting,
        Some(t) if t >= span.start - Duration::days(days_for_late) => ReportingStatus::OnTime,
        Some(_) => ReportingStatus::Late,
    }
}

/// 窗口内的上报及时性分类结果（存站点编码，按输入顺序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingBreakdown {
    pub span: DateSpan,
    pub days_for_late: i64,
    pub on_time: Vec<String>,
    pub late: Vec<String>,
    pub non_reporting: Vec<String>,
    /// 窗口内至少有一次 SOH 上报（on_time 的子集）
    pub reported: Vec<String>,
}

impl ReportingBreakdown {
    #[instrument(skip(supply_points, reports, span), fields(facilities = supply_points.len(), window = %span))]
    pub fn compute(
        supply_points: &[&SupplyPoint],
        reports: &ReportTimeline,
        span: DateSpan,
        days_for_late: i64,
    ) -> Self {
        let mut breakdown = Self {
            span,
            days_for_late,
            on_time: Vec::new(),
            late: Vec::new(),
            non_reporting: Vec::new(),
            reported: Vec::new(),
        };

        for sp in supply_points {
            let latest = reports
                .latest_before(&sp.code, ReportType::StockOnHand, span.end)
                .map(|r| r.report_date);
            match classify_reporting(latest, &span, days_for_late) {
                ReportingStatus::OnTime => breakdown.on_time.push(sp.code.clone()),
                ReportingStatus::Late => breakdown.late.push(sp.code.clone()),
                ReportingStatus::NonReporting => breakdown.non_reporting.push(sp.code.clone()),
            }
            if reports.has_report_in(&sp.code, ReportType::StockOnHand, &span) {
                breakdown.reported.push(sp.code.clone());
            }
        }

        tracing::debug!(
            on_time = breakdown.on_time.len(),
            late = breakdown.late.len(),
            non_reporting = breakdown.non_reporting.len(),
            "上报及时性判定完成"
        );
        breakdown
    }

    pub fn total(&self) -> usize {
        self.on_time.len() + self.late.len() + self.non_reporting.len()
    }

    pub fn status_of(&self, supply_point_code: &str) -> Option<ReportingStatus> {
        let has = |list: &Vec<String>| list.iter().any(|c| c == supply_point_code);
        if has(&self.on_time) {
            Some(ReportingStatus::OnTime)
        } else if has(&self.late) {
            Some(ReportingStatus::Late)
        } else if has(&self.non_reporting) {
            Some(ReportingStatus::NonReporting)
        } else {
            None
        }
    }
}

/// 告警口径: 最近上报不早于 deadline 的为按时，其余（含从未上报）为逾期
///
/// 返回 (on_time, late)
pub fn get_reporting_and_nonreporting_facilities<'a>(
    supply_points: &[&'a SupplyPoint],
    reports: &ReportTimeline,
    deadline: NaiveDateTime,
) -> (Vec<&'a SupplyPoint>, Vec<&'a SupplyPoint>) {
    supply_points.iter().copied().partition(|sp| {
        reports
            .latest_before(&sp.code, ReportType::StockOnHand, NaiveDateTime::MAX)
            .map(|r| r.report_date >= deadline)
            .unwrap_or(false)
    })
}

/// 上报状态列表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityLastReport {
    pub code: String,
    pub name: String,
    pub last_reported: Option<NaiveDateTime>,
}

/// 上报状态列表（均按最近上报时间倒序，从未上报的排最后）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingStatusLists {
    pub reporting: Vec<FacilityLastReport>,
    pub non_reporting: Vec<FacilityLastReport>,
}

/// 最近 view_days 天内有 SOH 上报的站点 vs 其余站点
pub fn reporting_status(
    supply_points: &[&SupplyPoint],
    reports: &ReportTimeline,
    now: NaiveDateTime,
    view_days: i64,
) -> ReportingStatusLists {
    let since = now - Duration::days(view_days);
    let mut lists = ReportingStatusLists::default();

    for sp in supply_points {
        let last_reported = reports
            .latest_before(&sp.code, ReportType::StockOnHand, NaiveDateTime::MAX)
            .map(|r| r.report_date);
        let row = FacilityLastReport {
            code: sp.code.clone(),
            name: sp.name.clone(),
            last_reported,
        };
        match last_reported {
            Some(t) if t >= since => lists.reporting.push(row),
            _ => lists.non_reporting.push(row),
        }
    }

    // Option 排序中 None 最小，倒序后自然排最后
    let by_recent = |a: &FacilityLastReport, b: &FacilityLastReport| {
        b.last_reported
            .cmp(&a.last_reported)
            .then_with(|| a.name.cmp(&b.name))
    };
    lists.reporting.sort_by(by_recent);
    lists.non_reporting.sort_by(by_recent);
    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ProductReport;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn soh(id: i64, sp: &str, day: u32) -> ProductReport {
        ProductReport {
            id,
            supply_point_code: sp.to_string(),
            product_code: "jd".to_string(),
            report_type: ReportType::StockOnHand,
            quantity: 10,
            report_date: at(day),
            message_id: None,
        }
    }

    fn facilities() -> Vec<SupplyPoint> {
        ["A", "B", "C", "D", "E"]
            .iter()
            .map(|c| SupplyPoint::new(c, &format!("Facility {}", c), "L"))
            .collect()
    }

    #[test]
    fn test_partition_covers_every_facility_once() {
        let sps = facilities();
        let refs: Vec<&SupplyPoint> = sps.iter().collect();
        let timeline = ReportTimeline::from_reports(vec![
            soh(1, "A", 12), // 窗口内
            soh(2, "B", 7),  // 宽限期内
            soh(3, "C", 2),  // 早于宽限期
            soh(4, "D", 20), // 窗口之后
        ]);
        let span = DateSpan::new(at(10), at(17));
        let b = ReportingBreakdown::compute(&refs, &timeline, span, 5);

        assert_eq!(b.on_time, vec!["A", "B"]);
        assert_eq!(b.late, vec!["C"]);
        assert_eq!(b.non_reporting, vec!["D", "E"]);
        assert_eq!(b.reported, vec!["A"]);
        assert_eq!(b.total(), sps.len());
        for sp in &sps {
            assert!(b.status_of(&sp.code).is_some());
        }
    }

    #[test]
    fn test_window_boundaries() {
        let span = DateSpan::new(at(10), at(17));
        assert_eq!(classify_reporting(Some(at(10)), &span, 0), ReportingStatus::OnTime);

        let sps = facilities();
        let refs: Vec<&SupplyPoint> = sps.iter().take(1).collect();
        let timeline = ReportTimeline::from_reports(vec![soh(1, "A", 17)]);
        let b = ReportingBreakdown::compute(&refs, &timeline, span, 0);
        assert!(b.reported.is_empty());
        assert_eq!(b.non_reporting, vec!["A"]);
    }

    #[test]
    fn test_alert_partition_counts_never_reported_as_late() {
        let sps = facilities();
        let refs: Vec<&SupplyPoint> = sps.iter().take(3).collect();
        let timeline = ReportTimeline::from_reports(vec![soh(1, "A", 20), soh(2, "B", 1)]);
        let (on_time, late) = get_reporting_and_nonreporting_facilities(&refs, &timeline, at(15));
        let codes = |v: Vec<&SupplyPoint>| v.iter().map(|s| s.code.clone()).collect::<Vec<_>>();
        assert_eq!(codes(on_time), vec!["A"]);
        assert_eq!(codes(late), vec!["B", "C"]);
    }

    #[test]
    fn test_reporting_status_ordering() {
        let sps = facilities();
        let refs: Vec<&SupplyPoint> = sps.iter().collect();
        let timeline = ReportTimeline::from_reports(vec![
            soh(1, "A", 25),
            soh(2, "B", 28),
            soh(3, "C", 2),
        ]);
        let lists = reporting_status(&refs, &timeline, at(30), 7);
        let codes: Vec<&str> = lists.reporting.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["B", "A"]);
        let codes: Vec<&str> = lists.non_reporting.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "D", "E"]);
    }
}
