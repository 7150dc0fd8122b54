// ==========================================
// 课表审计引擎 - 配置层
// ==========================================
// 职责: 审计配置读取、数据库默认路径
// 存储: config_kv 表
// ==========================================

pub mod audit_config;
pub mod config_manager;

// 重导出核心配置管理器
pub use audit_config::{AuditConfig, AuditConfigReader};
pub use config_manager::{config_keys, ConfigManager, ConfigResult};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "TIMETABLE_AUDIT_DB_PATH";

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 TIMETABLE_AUDIT_DB_PATH（非空时）
/// - 否则: 用户数据目录/timetable-audit/timetable.db
/// - 拿不到用户数据目录时: ./timetable.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./timetable.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("timetable-audit");
        // 目录创建失败时由后续打开连接报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("timetable.db");
    }

    path.to_string_lossy().to_string()
}
