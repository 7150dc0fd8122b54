// ==========================================
// 课表审计引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、快照导出
// 存储: config_kv 表 (key-value + scope)，与课表数据同库
// ==========================================

use crate::config::audit_config::{AuditConfig, AuditConfigReader};
use crate::db::open_sqlite_connection;
use crate::engine::cleanup::{DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
use crate::i18n::{DEFAULT_LOCALE, SUPPORTED_LOCALES};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 配置层 Result（错误需跨 await 与线程传递）
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 冲突扫描分片数上限
pub const MAX_CONFLICT_SCAN_SHARDS: usize = 64;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON格式，按 key 排序）
    ///
    /// # 用途
    /// - 随审计报告一起归档，说明报告是在哪组配置下生成的
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// AuditConfigReader Trait 实现
// ==========================================
// 非法值回退到默认值并告警，不中断审计
#[async_trait]
impl AuditConfigReader for ConfigManager {
    async fn get_cleanup_retention_days(&self) -> ConfigResult<i64> {
        let default = DEFAULT_RETENTION_DAYS.to_string();
        let value = self.get_config_or_default(config_keys::CLEANUP_RETENTION_DAYS, &default)?;
        match value.trim().parse::<i64>() {
            Ok(days) if (0..=MAX_RETENTION_DAYS).contains(&days) => Ok(days),
            _ => {
                tracing::warn!(
                    config_key = config_keys::CLEANUP_RETENTION_DAYS,
                    raw_value = %value,
                    "保留期配置非法，使用默认值"
                );
                Ok(DEFAULT_RETENTION_DAYS)
            }
        }
    }

    async fn get_conflict_scan_shards(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::CONFLICT_SCAN_SHARDS, "1")?;
        match value.trim().parse::<usize>() {
            Ok(shards) if (1..=MAX_CONFLICT_SCAN_SHARDS).contains(&shards) => Ok(shards),
            _ => {
                tracing::warn!(
                    config_key = config_keys::CONFLICT_SCAN_SHARDS,
                    raw_value = %value,
                    "分片数配置非法，使用默认值 1"
                );
                Ok(1)
            }
        }
    }

    async fn get_report_locale(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::REPORT_LOCALE, DEFAULT_LOCALE)?;
        let trimmed = value.trim();
        if SUPPORTED_LOCALES.contains(&trimmed) {
            Ok(trimmed.to_string())
        } else {
            tracing::warn!(
                config_key = config_keys::REPORT_LOCALE,
                raw_value = %value,
                "报告语言配置不受支持，使用默认语言"
            );
            Ok(DEFAULT_LOCALE.to_string())
        }
    }

    async fn load_audit_config(&self) -> ConfigResult<AuditConfig> {
        Ok(AuditConfig {
            cleanup_retention_days: self.get_cleanup_retention_days().await?,
            conflict_scan_shards: self.get_conflict_scan_shards().await?,
            report_locale: self.get_report_locale().await?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 清理预览保留期（天）
    pub const CLEANUP_RETENTION_DAYS: &str = "cleanup_retention_days";

    // 冲突扫描分片数（1 = 顺序扫描）
    pub const CONFLICT_SCAN_SHARDS: &str = "conflict_scan_shards";

    // 就绪报告说明的语言
    pub const REPORT_LOCALE: &str = "report_locale";
}
