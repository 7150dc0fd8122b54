// ==========================================
// 课表审计引擎 - 审计配置读取 Trait
// ==========================================
// 职责: 定义审计所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::ConfigResult;
use crate::engine::cleanup::DEFAULT_RETENTION_DAYS;
use crate::engine::error::{AuditError, AuditResult};
use crate::i18n::DEFAULT_LOCALE;
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

// ==========================================
// AuditConfig - 一次审计使用的配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// 软删除时段的保留期（天）
    pub cleanup_retention_days: i64,

    /// 冲突扫描分片数（1 = 顺序扫描）
    pub conflict_scan_shards: usize,

    /// 就绪报告说明的语言
    pub report_locale: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            cleanup_retention_days: DEFAULT_RETENTION_DAYS,
            conflict_scan_shards: 1,
            report_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl AuditConfig {
    /// 保留期;天数超出 Duration 可表示范围时报错
    pub fn retention(&self) -> AuditResult<Duration> {
        Duration::try_days(self.cleanup_retention_days).ok_or(
            AuditError::RetentionWindowOutOfRange {
                days: self.cleanup_retention_days,
            },
        )
    }
}

// ==========================================
// AuditConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AuditConfigReader: Send + Sync {
    /// 清理预览保留期（天）
    ///
    /// # 默认值
    /// - 30
    async fn get_cleanup_retention_days(&self) -> ConfigResult<i64>;

    /// 冲突扫描分片数
    ///
    /// # 默认值
    /// - 1
    async fn get_conflict_scan_shards(&self) -> ConfigResult<usize>;

    /// 报告语言
    ///
    /// # 默认值
    /// - zh-CN
    async fn get_report_locale(&self) -> ConfigResult<String>;

    /// 一次读取全部审计配置
    async fn load_audit_config(&self) -> ConfigResult<AuditConfig>;
}
