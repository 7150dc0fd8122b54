// ==========================================
// 课表审计引擎 - 清理候选预览
// ==========================================
// 职责: 找出可清理的时段（孤立时段、超过保留期的软删除时段）
// 输入: 课表时段 + 保留期 + 当前时间
// 输出: 清理预览（只读,不删除、不修改）
// ==========================================
// 红线: 仅预览,执行清理是管理员的操作
// 红线: 相同快照 + 相同 now → 相同输出
// ==========================================

use crate::domain::routine::RoutineSlot;
use crate::engine::error::{AuditError, AuditResult};
use crate::engine::integrity::SlotFinding;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// 默认保留期（天）
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// 保留期上限（天）
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// 默认保留期
pub fn default_retention() -> Duration {
    Duration::days(DEFAULT_RETENTION_DAYS)
}

// ==========================================
// SoftDeletedCandidate - 超期软删除时段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeletedCandidate {
    pub id: String,
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: Option<String>,
    pub delete_reason: Option<String>,
}

// ==========================================
// CleanupPreview - 清理预览
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPreview {
    /// 有效的孤立时段（最早修改在前）
    pub orphan_routines: Vec<SlotFinding>,

    /// 超过保留期的软删除时段（最早删除在前）
    pub old_soft_deleted_routines: Vec<SoftDeletedCandidate>,
}

impl CleanupPreview {
    pub fn total(&self) -> usize {
        self.orphan_routines.len() + self.old_soft_deleted_routines.len()
    }
}

// ==========================================
// CleanupSelector - 清理候选选择器
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct CleanupSelector {}

impl CleanupSelector {
    pub fn new() -> Self {
        Self {}
    }

    /// 校验保留期（扫描前快速失败）
    pub fn validate_retention(&self, retention: Duration) -> AuditResult<()> {
        if retention < Duration::zero() {
            warn!(retention_secs = retention.num_seconds(), "保留期为负数");
            return Err(AuditError::NegativeRetentionWindow {
                seconds: retention.num_seconds(),
            });
        }
        Ok(())
    }

    /// 生成清理预览
    ///
    /// # 参数
    /// - `slots`: 课表时段
    /// - `retention`: 保留期（不可为负）
    /// - `now`: 当前时间（由调用方传入,保证可重复）
    ///
    /// # 规则
    /// - 孤立时段: 与完整性审计相同的判定,按 updated_at 升序（缺失视为最早,平局按 id）
    /// - 软删除时段: deleted_at <= now - retention,按 deleted_at 升序（平局按 id）
    /// - 软删除但缺少 deleted_at 的时段无法判定保留期,不列入
    pub fn preview(
        &self,
        slots: &[RoutineSlot],
        retention: Duration,
        now: DateTime<Utc>,
    ) -> AuditResult<CleanupPreview> {
        self.validate_retention(retention)?;

        let cutoff = now
            .checked_sub_signed(retention)
            .ok_or(AuditError::RetentionWindowOutOfRange {
                days: retention.num_days(),
            })?;
        debug!(
            slots = slots.len(),
            retention_days = retention.num_days(),
            cutoff = %cutoff,
            "开始生成清理预览"
        );

        let mut orphans: Vec<&RoutineSlot> = slots
            .iter()
            .filter(|s| s.is_active && s.is_orphan())
            .collect();
        orphans.sort_by(|a, b| compare_by_timestamp(a.updated_at, b.updated_at, &a.id, &b.id));

        let mut soft_deleted: Vec<SoftDeletedCandidate> = slots
            .iter()
            .filter(|s| !s.is_active)
            .filter_map(|s| {
                let deleted_at = s.deleted_at?;
                if deleted_at <= cutoff {
                    Some(SoftDeletedCandidate {
                        id: s.id.clone(),
                        deleted_at,
                        deleted_by: s.deleted_by.clone(),
                        delete_reason: s.delete_reason.clone(),
                    })
                } else {
                    None
                }
            })
            .collect();
        soft_deleted.sort_by(|a, b| {
            a.deleted_at
                .cmp(&b.deleted_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let preview = CleanupPreview {
            orphan_routines: orphans.into_iter().map(SlotFinding::from).collect(),
            old_soft_deleted_routines: soft_deleted,
        };

        info!(
            orphan_routines = preview.orphan_routines.len(),
            old_soft_deleted_routines = preview.old_soft_deleted_routines.len(),
            "清理预览生成完成"
        );

        Ok(preview)
    }
}

fn compare_by_timestamp(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    a_id: &str,
    b_id: &str,
) -> Ordering {
    // Option 排序: None < Some
    a.cmp(&b).then_with(|| a_id.cmp(b_id))
}
