// ==========================================
// 课表审计引擎 - 实体存储适配器
// ==========================================
// 职责: 为审计提供四个集合的只读访问
// 红线: Repository 不含业务逻辑，只负责数据访问
// 红线: 只读，不回写审计结果
// ==========================================
// 畸形列（非数组 JSON、非法时刻、非法时间戳）按缺失处理并告警，
// 不作为错误返回；审计引擎把它们报告为数据缺陷
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::entity::{lenient_id_list, Batch, Subject, Teacher};
use crate::domain::routine::RoutineSlot;
use crate::domain::types::{parse_time, Weekday};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ActiveFilter - 有效性过滤
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFilter {
    /// 全部记录（含软删除）
    #[default]
    All,
    /// 仅 is_active = true
    ActiveOnly,
}

impl ActiveFilter {
    pub fn admits(self, is_active: bool) -> bool {
        match self {
            ActiveFilter::All => true,
            ActiveFilter::ActiveOnly => is_active,
        }
    }

    fn sql_clause(self) -> &'static str {
        match self {
            ActiveFilter::All => "",
            ActiveFilter::ActiveOnly => "WHERE is_active = 1",
        }
    }
}

// ==========================================
// Trait: EntityStore
// ==========================================
// 用途: 审计层依赖的外部协作者接口
// 实现者: SqliteEntityStore（SQLite）、InMemoryEntityStore（测试/嵌入）
// 返回顺序即快照顺序（冲突扫描的确定性依赖于此）
pub trait EntityStore: Send + Sync {
    fn list_routine_slots(&self, filter: ActiveFilter) -> RepositoryResult<Vec<RoutineSlot>>;

    fn list_batches(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Batch>>;

    fn list_teachers(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Teacher>>;

    fn list_subjects(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Subject>>;
}

// ==========================================
// SqliteEntityStore - SQLite 实现
// ==========================================
pub struct SqliteEntityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityStore {
    /// 打开数据库文件并创建存储
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建存储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_rows<T>(
        &self,
        sql: &str,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepositoryResult<Vec<T>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl EntityStore for SqliteEntityStore {
    fn list_routine_slots(&self, filter: ActiveFilter) -> RepositoryResult<Vec<RoutineSlot>> {
        let sql = format!(
            r#"
            SELECT
                id, day, start_time, end_time,
                subject_id, batches_json, teachers_json,
                is_active, deleted_at, deleted_by, delete_reason,
                created_at, updated_at
            FROM routine_slot
            {}
            ORDER BY seq ASC, rowid ASC
            "#,
            filter.sql_clause()
        );

        self.query_rows(&sql, |row| {
            let id: String = row.get(0)?;
            Ok(RoutineSlot {
                day: decode_weekday("routine_slot", &id, row.get(1)?),
                start_time: decode_time("routine_slot", &id, "start_time", row.get(2)?),
                end_time: decode_time("routine_slot", &id, "end_time", row.get(3)?),
                subject: row
                    .get::<_, Option<String>>(4)?
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                batches: decode_id_list("routine_slot", &id, "batches_json", row.get(5)?),
                teachers: decode_id_list("routine_slot", &id, "teachers_json", row.get(6)?),
                is_active: row.get::<_, i64>(7)? != 0,
                deleted_at: decode_timestamp("routine_slot", &id, "deleted_at", row.get(8)?),
                deleted_by: row.get(9)?,
                delete_reason: row.get(10)?,
                created_at: decode_timestamp("routine_slot", &id, "created_at", row.get(11)?),
                updated_at: decode_timestamp("routine_slot", &id, "updated_at", row.get(12)?),
                id,
            })
        })
    }

    fn list_batches(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Batch>> {
        let sql = format!(
            "SELECT id, name, is_active, subjects_json, teachers_json, routines_json \
             FROM batch {} ORDER BY seq ASC, rowid ASC",
            filter.sql_clause()
        );

        self.query_rows(&sql, |row| {
            let id: String = row.get(0)?;
            Ok(Batch {
                name: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
                subjects: decode_id_list("batch", &id, "subjects_json", row.get(3)?),
                teachers: decode_id_list("batch", &id, "teachers_json", row.get(4)?),
                routines: decode_id_list("batch", &id, "routines_json", row.get(5)?),
                id,
            })
        })
    }

    fn list_teachers(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Teacher>> {
        let sql = format!(
            "SELECT id, name, is_active, subjects_json, batches_json, routines_json \
             FROM teacher {} ORDER BY seq ASC, rowid ASC",
            filter.sql_clause()
        );

        self.query_rows(&sql, |row| {
            let id: String = row.get(0)?;
            Ok(Teacher {
                name: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
                subjects: decode_id_list("teacher", &id, "subjects_json", row.get(3)?),
                batches: decode_id_list("teacher", &id, "batches_json", row.get(4)?),
                routines: decode_id_list("teacher", &id, "routines_json", row.get(5)?),
                id,
            })
        })
    }

    fn list_subjects(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Subject>> {
        let sql = format!(
            "SELECT id, name, is_active, batches_json, teachers_json, routines_json \
             FROM subject {} ORDER BY seq ASC, rowid ASC",
            filter.sql_clause()
        );

        self.query_rows(&sql, |row| {
            let id: String = row.get(0)?;
            Ok(Subject {
                name: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
                batches: decode_id_list("subject", &id, "batches_json", row.get(3)?),
                teachers: decode_id_list("subject", &id, "teachers_json", row.get(4)?),
                routines: decode_id_list("subject", &id, "routines_json", row.get(5)?),
                id,
            })
        })
    }
}

// ==========================================
// 列解码（宽松）
// ==========================================

/// JSON 数组列 → 标识符列表
///
/// NULL → 空；非法 JSON → 空并告警；非数组 JSON → 空（与文档存储读取一致）
fn decode_id_list(table: &str, id: &str, column: &str, raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => lenient_id_list(value).unwrap_or_default(),
        Err(e) => {
            warn!(table, id, column, error = %e, "JSON 列解析失败，按空数组处理");
            Vec::new()
        }
    }
}

fn decode_weekday(table: &str, id: &str, raw: Option<String>) -> Option<Weekday> {
    let raw = raw?;
    let day = Weekday::parse(&raw);
    if day.is_none() {
        warn!(table, id, raw = %raw, "无法识别的星期，按缺失处理");
    }
    day
}

fn decode_time(
    table: &str,
    id: &str,
    column: &str,
    raw: Option<String>,
) -> Option<chrono::NaiveTime> {
    let raw = raw?;
    let time = parse_time(&raw);
    if time.is_none() {
        warn!(table, id, column, raw = %raw, "无法解析的时刻，按缺失处理");
    }
    time
}

fn decode_timestamp(
    table: &str,
    id: &str,
    column: &str,
    raw: Option<String>,
) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(table, id, column, raw = %raw, error = %e, "无法解析的时间戳，按缺失处理");
            None
        }
    }
}

// ==========================================
// InMemoryEntityStore - 内存实现
// ==========================================
/// 持有四个集合的内存存储（测试与嵌入调用方使用）
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    slots: Vec<RoutineSlot>,
    batches: Vec<Batch>,
    teachers: Vec<Teacher>,
    subjects: Vec<Subject>,
}

impl InMemoryEntityStore {
    pub fn new(
        slots: Vec<RoutineSlot>,
        batches: Vec<Batch>,
        teachers: Vec<Teacher>,
        subjects: Vec<Subject>,
    ) -> Self {
        Self {
            slots,
            batches,
            teachers,
            subjects,
        }
    }

    /// 从文档存储导出的 JSON 构造
    ///
    /// 格式: {"routines": [...], "batches": [...], "teachers": [...], "subjects": [...]}
    /// 缺失的集合视为空
    pub fn from_json(raw: &str) -> RepositoryResult<Self> {
        #[derive(serde::Deserialize)]
        struct Export {
            #[serde(default)]
            routines: Vec<RoutineSlot>,
            #[serde(default)]
            batches: Vec<Batch>,
            #[serde(default)]
            teachers: Vec<Teacher>,
            #[serde(default)]
            subjects: Vec<Subject>,
        }

        let export: Export = serde_json::from_str(raw).map_err(|e| RepositoryError::DecodeError {
            table: "export".to_string(),
            id: "-".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::new(
            export.routines,
            export.batches,
            export.teachers,
            export.subjects,
        ))
    }
}

fn filtered<T: Clone>(items: &[T], filter: ActiveFilter, is_active: impl Fn(&T) -> bool) -> Vec<T> {
    items
        .iter()
        .filter(|item| filter.admits(is_active(item)))
        .cloned()
        .collect()
}

impl EntityStore for InMemoryEntityStore {
    fn list_routine_slots(&self, filter: ActiveFilter) -> RepositoryResult<Vec<RoutineSlot>> {
        Ok(filtered(&self.slots, filter, |s| s.is_active))
    }

    fn list_batches(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Batch>> {
        Ok(filtered(&self.batches, filter, |b| b.is_active))
    }

    fn list_teachers(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Teacher>> {
        Ok(filtered(&self.teachers, filter, |t| t.is_active))
    }

    fn list_subjects(&self, filter: ActiveFilter) -> RepositoryResult<Vec<Subject>> {
        Ok(filtered(&self.subjects, filter, |s| s.is_active))
    }
}
