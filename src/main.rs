// ==========================================
// 课表审计引擎 - 命令行入口
// ==========================================
// 用法:
//   timetable-audit [db_path] [readiness|conflicts|integrity|cleanup|all] [checklist.csv]
// 输出: JSON 报告写到 stdout，日志写到 stderr
// 退出码: 0 = 成功；2 = 课表未就绪（readiness / all 模式）
// ==========================================

use anyhow::{anyhow, Context};
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex};
use timetable_audit::api::{export_checklist, AuditApi};
use timetable_audit::config::{get_default_db_path, AuditConfigReader, ConfigManager};
use timetable_audit::db::{open_sqlite_connection, warn_on_schema_mismatch};
use timetable_audit::repository::SqliteEntityStore;
use timetable_audit::{i18n, logging};

/// 课表未就绪时的退出码
const EXIT_NOT_READY: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Readiness,
    Conflicts,
    Integrity,
    Cleanup,
    All,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "readiness" => Some(Mode::Readiness),
            "conflicts" => Some(Mode::Conflicts),
            "integrity" => Some(Mode::Integrity),
            "cleanup" => Some(Mode::Cleanup),
            "all" => Some(Mode::All),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", i18n::t("cli.usage"));
        return Ok(());
    }

    let db_path = args
        .first()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let mode = match args.get(1) {
        Some(raw) => Mode::parse(raw).ok_or_else(|| {
            anyhow!("未知的审计模式: {}\n{}", raw, i18n::t("cli.usage"))
        })?,
        None => Mode::All,
    };
    let checklist_path = args.get(2).cloned();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", timetable_audit::APP_NAME, timetable_audit::VERSION);
    tracing::info!(db_path = %db_path, mode = ?mode, "开始审计");
    tracing::info!("==================================================");

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    warn_on_schema_mismatch(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = ConfigManager::from_connection(Arc::clone(&conn)).map_err(|e| anyhow!(e))?;
    let config = config_manager
        .load_audit_config()
        .await
        .map_err(|e| anyhow!(e))?;
    i18n::set_locale(&config.report_locale);
    tracing::debug!(config = ?config, "审计配置已加载");

    let store = Arc::new(SqliteEntityStore::from_connection(conn));
    let api = AuditApi::new(store, config);

    let mut not_ready = false;
    let output = match mode {
        Mode::Readiness => {
            let report = api.build_readiness_report()?;
            not_ready = !report.is_ready;
            serde_json::to_string_pretty(&report)?
        }
        Mode::Conflicts => serde_json::to_string_pretty(&api.detect_conflicts()?)?,
        Mode::Integrity => serde_json::to_string_pretty(&api.audit_integrity()?)?,
        Mode::Cleanup => serde_json::to_string_pretty(&api.preview_cleanup(Utc::now())?)?,
        Mode::All => {
            let report = api.run_full_audit(Utc::now()).await?;
            not_ready = !report.readiness.is_ready;
            if let Some(path) = checklist_path.as_deref() {
                export_checklist(&report, Path::new(path))?;
            }
            serde_json::to_string_pretty(&report)?
        }
    };

    println!("{}", output);

    if not_ready {
        tracing::warn!("课表未就绪，退出码 {}", EXIT_NOT_READY);
        std::process::exit(EXIT_NOT_READY);
    }
    Ok(())
}
