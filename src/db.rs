// ==========================================
// 课表审计引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，审计只读连接与外部写入并存时减少 busy 错误
// - 提供课表库的建表语句（演示库与测试库共用）
// ==========================================

use crate::perf::{install_sqlite_tracing, PerfSettings};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：版本号只用于告警，不做自动迁移。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置（含 SQL 性能统计回调）
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    install_sqlite_tracing(&mut conn, PerfSettings::from_env());
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 检查 schema_version，与期望不一致时只告警
pub fn warn_on_schema_mismatch(conn: &Connection) -> rusqlite::Result<()> {
    match read_schema_version(conn)? {
        Some(v) if v == CURRENT_SCHEMA_VERSION => {}
        Some(v) => tracing::warn!(
            found = v,
            expected = CURRENT_SCHEMA_VERSION,
            "数据库 schema_version 与当前代码不一致"
        ),
        None => tracing::warn!("数据库缺少 schema_version 表"),
    }
    Ok(())
}

// ==========================================
// 建表
// ==========================================
// 关联字段以 JSON 数组文本存储（与文档存储导出格式一致）
// 时间戳为 RFC3339 文本；时刻为 HH:MM 文本
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS routine_slot (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL DEFAULT 0,
    day TEXT,
    start_time TEXT,
    end_time TEXT,
    subject_id TEXT,
    batches_json TEXT,
    teachers_json TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    deleted_at TEXT,
    deleted_by TEXT,
    delete_reason TEXT,
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS batch (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    subjects_json TEXT,
    teachers_json TEXT,
    routines_json TEXT
);

CREATE TABLE IF NOT EXISTS teacher (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    subjects_json TEXT,
    batches_json TEXT,
    routines_json TEXT
);

CREATE TABLE IF NOT EXISTS subject (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    batches_json TEXT,
    teachers_json TEXT,
    routines_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_routine_slot_active ON routine_slot(is_active, seq);
"#;

/// 初始化课表库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
