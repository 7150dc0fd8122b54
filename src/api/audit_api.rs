// ==========================================
// 课表审计引擎 - 审计 API
// ==========================================
// 职责: 从 EntityStore 加载快照，调用引擎，返回报告
// 架构: API 层 → Repository 层 (EntityStore) → Engine 层
// 红线: 只读；报告是建议，不阻止、不修复任何数据
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AuditConfig;
use crate::domain::snapshot::TimetableSnapshot;
use crate::engine::cleanup::{CleanupPreview, CleanupSelector};
use crate::engine::conflict::{ConflictDetector, ConflictReport};
use crate::engine::error::AuditError;
use crate::engine::integrity::{IntegrityAuditor, IntegrityReport};
use crate::engine::readiness::{ReadinessAggregator, ReadinessReport};
use crate::perf::PerfGuard;
use crate::repository::entity_store::EntityStore;
use crate::repository::snapshot_loader::SnapshotLoader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ==========================================
// FullAuditReport - 完整审计报告
// ==========================================
/// 同一快照上的四项审计结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullAuditReport {
    pub taken_at: DateTime<Utc>,
    pub conflicts: ConflictReport,
    pub integrity: IntegrityReport,
    pub readiness: ReadinessReport,
    pub cleanup: CleanupPreview,
}

// ==========================================
// AuditApi - 审计 API
// ==========================================
pub struct AuditApi {
    store: Arc<dyn EntityStore>,
    config: AuditConfig,
    conflict_detector: ConflictDetector,
    integrity_auditor: IntegrityAuditor,
    readiness_aggregator: ReadinessAggregator,
    cleanup_selector: CleanupSelector,
}

impl AuditApi {
    /// 创建新的 AuditApi 实例
    ///
    /// # 参数
    /// - store: 实体存储（SQLite 或内存）
    /// - config: 审计配置（保留期、分片数）
    pub fn new(store: Arc<dyn EntityStore>, config: AuditConfig) -> Self {
        Self {
            store,
            config,
            conflict_detector: ConflictDetector::new(),
            integrity_auditor: IntegrityAuditor::new(),
            readiness_aggregator: ReadinessAggregator::new(),
            cleanup_selector: CleanupSelector::new(),
        }
    }

    /// 使用默认配置创建
    pub fn with_default_config(store: Arc<dyn EntityStore>) -> Self {
        Self::new(store, AuditConfig::default())
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// 加载审计快照
    pub fn load_snapshot(&self, taken_at: DateTime<Utc>) -> ApiResult<TimetableSnapshot> {
        let mut perf = PerfGuard::new("api.load_snapshot");
        let snapshot = SnapshotLoader::load(self.store.as_ref(), taken_at)?;
        perf.set_items(snapshot.slots.len());
        Ok(snapshot)
    }

    // ==========================================
    // 单项审计
    // ==========================================

    /// 冲突检测（顺序扫描）
    pub fn detect_conflicts(&self) -> ApiResult<ConflictReport> {
        let _perf = PerfGuard::new("api.detect_conflicts");
        let snapshot = self.load_snapshot(Utc::now())?;
        Ok(self.conflict_detector.detect(&snapshot.slots))
    }

    /// 完整性审计
    pub fn audit_integrity(&self) -> ApiResult<IntegrityReport> {
        let _perf = PerfGuard::new("api.audit_integrity");
        let snapshot = self.load_snapshot(Utc::now())?;
        Ok(self.integrity_auditor.audit(&snapshot))
    }

    /// 发布就绪报告
    pub fn build_readiness_report(&self) -> ApiResult<ReadinessReport> {
        let _perf = PerfGuard::new("api.build_readiness_report");
        let snapshot = self.load_snapshot(Utc::now())?;
        Ok(self.readiness_aggregator.build(&snapshot))
    }

    /// 清理候选预览
    ///
    /// # 参数
    /// - now: 当前时间（保留期的计算基准）
    pub fn preview_cleanup(&self, now: DateTime<Utc>) -> ApiResult<CleanupPreview> {
        let _perf = PerfGuard::new("api.preview_cleanup");
        let retention = self.config.retention()?;
        // 保留期非法时在加载快照前失败
        self.cleanup_selector.validate_retention(retention)?;

        let snapshot = self.load_snapshot(now)?;
        Ok(self.cleanup_selector.preview(&snapshot.slots, retention, now)?)
    }

    // ==========================================
    // 完整审计
    // ==========================================

    /// 在同一快照上运行全部审计
    ///
    /// # 说明
    /// - 快照加载在阻塞线程池中执行
    /// - 分片数 > 1 时冲突扫描分片并行，结果与顺序扫描一致
    /// - 就绪报告由冲突报告与完整性报告组合，不重复扫描
    pub async fn run_full_audit(&self, now: DateTime<Utc>) -> ApiResult<FullAuditReport> {
        let mut perf = PerfGuard::new("api.run_full_audit");

        let retention = self.config.retention()?;
        self.cleanup_selector.validate_retention(retention)?;
        if self.config.conflict_scan_shards == 0 {
            return Err(AuditError::InvalidShardCount.into());
        }

        let store = Arc::clone(&self.store);
        let snapshot = tokio::task::spawn_blocking(move || SnapshotLoader::load(store.as_ref(), now))
            .await
            .map_err(|e| ApiError::InternalError(format!("快照加载任务失败: {}", e)))??;
        perf.set_items(snapshot.slots.len());

        let conflicts = if self.config.conflict_scan_shards > 1 {
            let slots = Arc::new(snapshot.slots.clone());
            self.conflict_detector
                .detect_sharded(slots, self.config.conflict_scan_shards)
                .await?
        } else {
            self.conflict_detector.detect(&snapshot.slots)
        };

        let integrity = self.integrity_auditor.audit(&snapshot);
        let readiness = ReadinessAggregator::compose(&conflicts, &integrity);
        let cleanup = self
            .cleanup_selector
            .preview(&snapshot.slots, retention, now)?;

        info!(
            is_ready = readiness.is_ready,
            conflicts = conflicts.total(),
            cleanup_candidates = cleanup.total(),
            "完整审计完成"
        );

        Ok(FullAuditReport {
            taken_at: snapshot.taken_at,
            conflicts,
            integrity,
            readiness,
            cleanup,
        })
    }
}
