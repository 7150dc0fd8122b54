// ==========================================
// 课表审计引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 审计与建议（只读，人工最终控制权）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 只读数据访问
pub mod repository;

// 引擎层 - 审计规则
pub mod engine;

// 配置层 - 审计配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 审计入口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityKind, TimeRange, Weekday};

// 领域实体
pub use domain::{Batch, RoutineSlot, ScheduledEntity, Subject, Teacher, TimetableSnapshot};

// 引擎
pub use engine::{
    AuditError, AuditResult, CleanupPreview, CleanupSelector, ConflictDetector, ConflictReport,
    IntegrityAuditor, IntegrityReport, OverlapEvaluator, ReadinessAggregator, ReadinessReport,
};

// 仓储
pub use repository::{
    ActiveFilter, EntityStore, InMemoryEntityStore, RepositoryError, SnapshotLoader,
    SqliteEntityStore,
};

// API
pub use api::{ApiError, ApiResult, AuditApi, FullAuditReport};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "课表审计引擎";
