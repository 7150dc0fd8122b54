// ==========================================
// 课表审计引擎 - 性能统计
// ==========================================
// 职责: 审计操作耗时 + 快照加载 SQL 计数 + 慢 SQL 告警
// 开关:
// - Debug 默认开启；Release 默认关闭
// - `TIMETABLE_AUDIT_PERF_SQL=1` 强制开启
// - `TIMETABLE_AUDIT_SLOW_SQL_MS=50` 慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "TIMETABLE_AUDIT_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "TIMETABLE_AUDIT_SLOW_SQL_MS";

static SQL_TRACING_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE_GUARDS: Cell<u32> = const { Cell::new(0) };
    static SQL_STATEMENTS: Cell<u64> = const { Cell::new(0) };
    static SLOW_SQL_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

// ==========================================
// PerfSettings - 性能统计开关
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub sql_tracing: bool,
    pub slow_sql_ms: u64,
}

impl PerfSettings {
    /// 从环境变量读取
    pub fn from_env() -> Self {
        let sql_tracing = match std::env::var(PERF_SQL_ENV) {
            Ok(v) => matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            Err(_) => cfg!(debug_assertions),
        };

        let slow_sql_ms = std::env::var(SLOW_SQL_MS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });

        Self {
            sql_tracing,
            slow_sql_ms,
        }
    }
}

/// 为连接安装 SQL trace/profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection, settings: PerfSettings) {
    SQL_TRACING_ENABLED.store(settings.sql_tracing, Ordering::Relaxed);
    SLOW_SQL_MS.store(settings.slow_sql_ms, Ordering::Relaxed);

    if settings.sql_tracing {
        conn.trace(Some(on_sql_statement));
        conn.profile(Some(on_sql_profiled));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
}

fn guard_active() -> bool {
    ACTIVE_GUARDS.with(|d| d.get() > 0)
}

fn on_sql_statement(_sql: &str) {
    if SQL_TRACING_ENABLED.load(Ordering::Relaxed) && guard_active() {
        SQL_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_sql_profiled(sql: &str, duration: Duration) {
    if !SQL_TRACING_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let elapsed_ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold == 0 || elapsed_ms < threshold {
        return;
    }

    let compact: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    tracing::warn!(target: "slow_sql", duration_ms = elapsed_ms, sql = %compact, "slow sql");

    if guard_active() {
        SLOW_SQL_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

// ==========================================
// PerfGuard - 操作耗时统计
// ==========================================
/// 离开作用域时记录 elapsed_ms、SQL 语句数、慢 SQL 数与处理条目数
///
/// ```ignore
/// let _perf = timetable_audit::perf::PerfGuard::new("build_readiness_report");
/// ```
pub struct PerfGuard {
    op: &'static str,
    started: Instant,
    sql_baseline: u64,
    slow_sql_baseline: u64,
    items: Option<usize>,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            started: Instant::now(),
            sql_baseline: SQL_STATEMENTS.with(|c| c.get()),
            slow_sql_baseline: SLOW_SQL_STATEMENTS.with(|c| c.get()),
            items: None,
        }
    }

    /// 记录本次操作处理的条目数（如快照中的时段数）
    pub fn set_items(&mut self, items: usize) {
        self.items = Some(items);
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let sql_count = SQL_STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.sql_baseline);
        let slow_sql_count = SLOW_SQL_STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_baseline);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            sql_count,
            slow_sql_count,
            items = self.items,
            "done"
        );

        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
