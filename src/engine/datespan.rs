// ==========================================
// 物资供应链报表系统 - 时间窗口与周分段
// ==========================================
// 窗口语义: [start, end) 左闭右开
// 周分段: 在窗口内部每个分界星期的零点切分，首尾段可能不足一周
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 时间窗口 [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateSpan {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// 按日期构造，结束日期包含在内（即 end 为次日零点）
    pub fn from_dates(start: NaiveDate, end_inclusive: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: (end_inclusive + Duration::days(1)).and_time(NaiveTime::MIN),
        }
    }

    /// 最近 days 天: [now - days, now)
    pub fn since(days: i64, now: NaiveDateTime) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// 以 anchor 所在周的分界星期零点为终点，向前 weeks 周
    pub fn weeks_ending(anchor: NaiveDate, weekday: u32, weeks: u32) -> Self {
        let end = day_of_week(anchor, weekday).and_time(NaiveTime::MIN);
        Self {
            start: end - Duration::weeks(weeks as i64),
            end,
        }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// 同一周（周一起算）内指定星期的日期；weekday 0 = 周一
///
/// ```
/// use chrono::NaiveDate;
/// use logistics_reporting::engine::datespan::day_of_week;
///
/// // 2024-05-06 是周一
/// let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
/// assert_eq!(day_of_week(monday, 3), NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
/// let sunday = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
/// assert_eq!(day_of_week(sunday, 3), NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
/// ```
pub fn day_of_week(date: NaiveDate, weekday: u32) -> NaiveDate {
    let delta = weekday as i64 - date.weekday().num_days_from_monday() as i64;
    date + Duration::days(delta)
}

/// 分段输出顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketDirection {
    /// 最近的在前（导出顺序）
    Backward,
    /// 最早的在前
    Forward,
}

/// 周分段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBucket {
    pub span: DateSpan,
    /// 不足整周（首段或尾段）
    pub is_partial: bool,
}

/// 在窗口内部每个分界星期零点切分窗口
pub fn weekly_buckets(
    span: &DateSpan,
    anchor_weekday: u32,
    direction: BucketDirection,
) -> Vec<DateBucket> {
    if span.is_empty() {
        return Vec::new();
    }

    let mut boundary = day_of_week(span.start.date(), anchor_weekday).and_time(NaiveTime::MIN);
    while boundary <= span.start {
        boundary += Duration::weeks(1);
    }

    let mut cuts = vec![span.start];
    while boundary < span.end {
        cuts.push(boundary);
        boundary += Duration::weeks(1);
    }
    cuts.push(span.end);

    let mut buckets: Vec<DateBucket> = cuts
        .windows(2)
        .map(|w| {
            let s = DateSpan::new(w[0], w[1]);
            DateBucket {
                span: s,
                is_partial: s.duration() != Duration::weeks(1),
            }
        })
        .collect();

    if direction == BucketDirection::Backward {
        buckets.reverse();
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_contains_is_left_closed_right_open() {
        let span = DateSpan::new(dt(2024, 5, 1, 0), dt(2024, 5, 8, 0));
        assert!(span.contains(dt(2024, 5, 1, 0)));
        assert!(span.contains(dt(2024, 5, 7, 23)));
        assert!(!span.contains(dt(2024, 5, 8, 0)));
    }

    #[test]
    fn test_from_dates_includes_end_day() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let span = DateSpan::from_dates(d(1), d(3));
        assert_eq!(span.end, dt(2024, 5, 4, 0));
    }

    #[test]
    fn test_buckets_are_exhaustive_and_disjoint() {
        // 2024-05-01 周三 12:00 到 2024-05-20 周一 06:00，周四分界
        let span = DateSpan::new(dt(2024, 5, 1, 12), dt(2024, 5, 20, 6));
        let buckets = weekly_buckets(&span, 3, BucketDirection::Forward);

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.first().unwrap().span.start, span.start);
        assert_eq!(buckets.last().unwrap().span.end, span.end);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].span.end, pair[1].span.start);
        }
        assert_eq!(buckets[1].span.start, dt(2024, 5, 2, 0));
        assert!(buckets[0].is_partial);
        assert!(!buckets[1].is_partial);
        assert!(!buckets[2].is_partial);
        assert!(buckets[3].is_partial);

        let total = buckets
            .iter()
            .fold(Duration::zero(), |acc, b| acc + b.span.duration());
        assert_eq!(total, span.duration());
    }

    #[test]
    fn test_backward_is_reverse_of_forward() {
        let span = DateSpan::new(dt(2024, 1, 3, 0), dt(2024, 3, 1, 0));
        let mut forward = weekly_buckets(&span, 0, BucketDirection::Forward);
        let backward = weekly_buckets(&span, 0, BucketDirection::Backward);
        forward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_weeks_ending_gives_full_buckets() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let span = DateSpan::weeks_ending(today, 3, 49);
        assert_eq!(span.end, dt(2024, 5, 16, 0));

        let buckets = weekly_buckets(&span, 3, BucketDirection::Backward);
        assert_eq!(buckets.len(), 49);
        assert!(buckets.iter().all(|b| !b.is_partial));
        assert_eq!(buckets[0].span.end, span.end);
    }

    #[test]
    fn test_empty_span_has_no_buckets() {
        let t = dt(2024, 5, 1, 0);
        assert!(weekly_buckets(&DateSpan::new(t, t), 3, BucketDirection::Forward).is_empty());
    }
}
