// ==========================================
// 课表审计引擎 - 引擎层
// ==========================================
// 职责: 实现审计规则,不拼 SQL
// 红线: 引擎只读,所有组件是快照上的纯计算
// 红线: 每次审计是独立计算,组件间无共享可变状态
// ==========================================

pub mod cleanup;
pub mod conflict;
pub mod error;
pub mod integrity;
pub mod overlap;
pub mod readiness;

// 重导出核心引擎
pub use cleanup::{default_retention, CleanupPreview, CleanupSelector, SoftDeletedCandidate};
pub use conflict::{ConflictDetector, ConflictReport, ConflictType, ScheduleConflict};
pub use error::{AuditError, AuditResult};
pub use integrity::{IntegrityAuditor, IntegrityCounts, IntegrityReport};
pub use overlap::OverlapEvaluator;
pub use readiness::{
    BlockingCategory, BlockingIssue, ReadinessAggregator, ReadinessMetrics, ReadinessReport,
};
