// ==========================================
// 物资供应链报表系统 - 查询耗时统计
// ==========================================
// 快照加载与导出会集中发出大量 SQL，这里统计每个操作的
// 耗时、语句数与慢语句数
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 开启 SQL 统计的环境变量
pub const PERF_SQL_ENV: &str = "LOGISTICS_PERF_SQL";
/// 慢语句阈值（毫秒）的环境变量
pub const SLOW_SQL_MS_ENV: &str = "LOGISTICS_SLOW_SQL_MS";

static SQL_STATS_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static OPEN_TIMERS: Cell<u32> = const { Cell::new(0) };
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
    static SLOW_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn one_line(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// 为连接安装 trace/profile 回调
///
/// - 调试构建默认开启，发布构建默认关闭
/// - `LOGISTICS_PERF_SQL=0/1` 强制关闭/开启
/// - `LOGISTICS_SLOW_SQL_MS` 慢语句阈值，默认调试 50ms / 发布 200ms
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag(PERF_SQL_ENV).unwrap_or(cfg!(debug_assertions));
    SQL_STATS_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_statement));
    conn.profile(Some(on_statement_done));
}

fn timer_open() -> bool {
    OPEN_TIMERS.with(|d| d.get() > 0)
}

fn on_statement(_sql: &str) {
    if SQL_STATS_ENABLED.load(Ordering::Relaxed) && timer_open() {
        STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_statement_done(sql: &str, duration: Duration) {
    if !SQL_STATS_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %one_line(sql, 400), "慢查询");
    if timer_open() {
        SLOW_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 操作计时器，drop 时输出耗时与语句统计
///
/// ```ignore
/// let _timer = logistics_reporting::perf::QueryTimer::start("export.periodic_stock");
/// ```
pub struct QueryTimer {
    op: &'static str,
    started: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl QueryTimer {
    pub fn start(op: &'static str) -> Self {
        OPEN_TIMERS.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            started: Instant::now(),
            statements_at_start: STATEMENTS.with(|c| c.get()),
            slow_at_start: SLOW_STATEMENTS.with(|c| c.get()),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let statements = STATEMENTS.with(|c| c.get()).saturating_sub(self.statements_at_start);
        let slow = SLOW_STATEMENTS.with(|c| c.get()).saturating_sub(self.slow_at_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            statements,
            slow,
            "操作完成"
        );

        OPEN_TIMERS.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
