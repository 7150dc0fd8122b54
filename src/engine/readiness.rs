// ==========================================
// 课表审计引擎 - 发布就绪评估
// ==========================================
// 职责: 汇总冲突检测与完整性审计,给出是否可发布课表的判定
// 输入: 审计快照（或已计算的冲突报告 + 完整性报告）
// 输出: is_ready + 阻断问题列表 + 计数指标
// ==========================================
// 红线: 纯组合层,无 I/O
// 红线: 阻断问题顺序固定: 孤立 → 不完整 → 班级冲突 → 教师冲突 → 未排课科目
// ==========================================

use crate::domain::snapshot::TimetableSnapshot;
use crate::engine::conflict::{ConflictDetector, ConflictReport};
use crate::engine::integrity::{IntegrityAuditor, IntegrityReport};
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

// ==========================================
// BlockingCategory - 阻断类别
// ==========================================
// 声明顺序即报告顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingCategory {
    OrphanRoutines,
    IncompleteRoutines,
    BatchConflicts,
    TeacherConflicts,
    UnscheduledSubjects,
}

impl BlockingCategory {
    pub const ORDERED: [BlockingCategory; 5] = [
        BlockingCategory::OrphanRoutines,
        BlockingCategory::IncompleteRoutines,
        BlockingCategory::BatchConflicts,
        BlockingCategory::TeacherConflicts,
        BlockingCategory::UnscheduledSubjects,
    ];

    /// 稳定标签
    pub fn tag(&self) -> &'static str {
        match self {
            BlockingCategory::OrphanRoutines => "ORPHAN_ROUTINES",
            BlockingCategory::IncompleteRoutines => "INCOMPLETE_ROUTINES",
            BlockingCategory::BatchConflicts => "BATCH_CONFLICTS",
            BlockingCategory::TeacherConflicts => "TEACHER_CONFLICTS",
            BlockingCategory::UnscheduledSubjects => "UNSCHEDULED_SUBJECTS",
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            BlockingCategory::OrphanRoutines => "readiness.orphan_routines",
            BlockingCategory::IncompleteRoutines => "readiness.incomplete_routines",
            BlockingCategory::BatchConflicts => "readiness.batch_conflicts",
            BlockingCategory::TeacherConflicts => "readiness.teacher_conflicts",
            BlockingCategory::UnscheduledSubjects => "readiness.unscheduled_subjects",
        }
    }

    fn count_in(&self, metrics: &ReadinessMetrics) -> usize {
        match self {
            BlockingCategory::OrphanRoutines => metrics.orphan_routines,
            BlockingCategory::IncompleteRoutines => metrics.incomplete_routines,
            BlockingCategory::BatchConflicts => metrics.batch_conflicts,
            BlockingCategory::TeacherConflicts => metrics.teacher_conflicts,
            BlockingCategory::UnscheduledSubjects => metrics.subjects_assigned_not_scheduled,
        }
    }
}

impl fmt::Display for BlockingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ==========================================
// BlockingIssue - 阻断问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingIssue {
    pub category: BlockingCategory,
    pub count: usize,

    /// 面向管理员的说明（按当前语言渲染）
    pub message: String,
}

// ==========================================
// ReadinessMetrics - 计数指标
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessMetrics {
    // ===== 阻断项 =====
    pub orphan_routines: usize,
    pub incomplete_routines: usize,
    pub batch_conflicts: usize,
    pub teacher_conflicts: usize,
    pub subjects_assigned_not_scheduled: usize,

    // ===== 提示项（不阻断） =====
    pub batches_without_routines: usize,
    pub teachers_without_routines: usize,
}

// ==========================================
// ReadinessReport - 就绪报告
// ==========================================
// 只读结果,不提供修改输入的方法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub is_ready: bool,
    pub blocking_issues: Vec<BlockingIssue>,
    pub metrics: ReadinessMetrics,
}

impl ReadinessReport {
    /// 阻断类别标签（按报告顺序）
    pub fn blocking_tags(&self) -> Vec<&'static str> {
        self.blocking_issues.iter().map(|i| i.category.tag()).collect()
    }
}

// ==========================================
// ReadinessAggregator - 就绪评估器
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct ReadinessAggregator {
    conflict_detector: ConflictDetector,
    integrity_auditor: IntegrityAuditor,
}

impl ReadinessAggregator {
    pub fn new() -> Self {
        Self {
            conflict_detector: ConflictDetector::new(),
            integrity_auditor: IntegrityAuditor::new(),
        }
    }

    /// 对快照运行冲突检测与完整性审计并汇总
    pub fn build(&self, snapshot: &TimetableSnapshot) -> ReadinessReport {
        let conflicts = self.conflict_detector.detect(&snapshot.slots);
        let integrity = self.integrity_auditor.audit(snapshot);
        Self::compose(&conflicts, &integrity)
    }

    /// 由已计算的报告汇总（同一快照）
    pub fn compose(conflicts: &ConflictReport, integrity: &IntegrityReport) -> ReadinessReport {
        let metrics = ReadinessMetrics {
            orphan_routines: integrity.orphan_slots.len(),
            incomplete_routines: integrity.incomplete_slots.len(),
            batch_conflicts: conflicts.batch_conflicts.len(),
            teacher_conflicts: conflicts.teacher_conflicts.len(),
            subjects_assigned_not_scheduled: integrity.subjects_assigned_not_scheduled.len(),
            batches_without_routines: integrity.batches_without_routines.len(),
            teachers_without_routines: integrity.teachers_without_routines.len(),
        };

        let blocking_issues: Vec<BlockingIssue> = BlockingCategory::ORDERED
            .iter()
            .filter_map(|category| {
                let count = category.count_in(&metrics);
                if count == 0 {
                    return None;
                }
                Some(BlockingIssue {
                    category: *category,
                    count,
                    message: t_with_args(category.message_key(), &[("count", &count.to_string())]),
                })
            })
            .collect();

        let is_ready = blocking_issues.is_empty();

        if is_ready {
            info!(
                batches_without_routines = metrics.batches_without_routines,
                teachers_without_routines = metrics.teachers_without_routines,
                "课表已就绪,可发布"
            );
        } else {
            warn!(
                blocking_issues = blocking_issues.len(),
                orphan_routines = metrics.orphan_routines,
                incomplete_routines = metrics.incomplete_routines,
                batch_conflicts = metrics.batch_conflicts,
                teacher_conflicts = metrics.teacher_conflicts,
                subjects_assigned_not_scheduled = metrics.subjects_assigned_not_scheduled,
                "课表未就绪"
            );
        }

        ReadinessReport {
            is_ready,
            blocking_issues,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Subject;
    use crate::domain::routine::RoutineSlot;
    use crate::domain::types::Weekday;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn create_test_slot(
        id: &str,
        subject: Option<&str>,
        start: NaiveTime,
        end: NaiveTime,
        batches: &[&str],
        teachers: &[&str],
    ) -> RoutineSlot {
        RoutineSlot {
            id: id.to_string(),
            day: Some(Weekday::Monday),
            start_time: Some(start),
            end_time: Some(end),
            subject: subject.map(|s| s.to_string()),
            batches: batches.iter().map(|s| s.to_string()).collect(),
            teachers: teachers.iter().map(|s| s.to_string()).collect(),
            is_active: true,
            deleted_at: None,
            deleted_by: None,
            delete_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn snapshot(slots: Vec<RoutineSlot>, subjects: Vec<Subject>) -> TimetableSnapshot {
        TimetableSnapshot::new(
            slots,
            vec![],
            vec![],
            subjects,
            Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_snapshot_is_ready() {
        let report = ReadinessAggregator::new().build(&snapshot(vec![], vec![]));

        assert!(report.is_ready);
        assert!(report.blocking_issues.is_empty());
        assert_eq!(report.metrics, ReadinessMetrics::default());
    }

    #[test]
    fn test_unscheduled_subject_blocks() {
        let subject = Subject {
            id: "S1".to_string(),
            name: "Physics".to_string(),
            is_active: true,
            batches: vec!["B2".to_string()],
            teachers: vec!["T1".to_string()],
            routines: vec![],
        };

        let report = ReadinessAggregator::new().build(&snapshot(vec![], vec![subject]));

        assert!(!report.is_ready);
        assert_eq!(report.blocking_tags(), vec!["UNSCHEDULED_SUBJECTS"]);
        assert_eq!(report.metrics.subjects_assigned_not_scheduled, 1);
        assert_eq!(report.blocking_issues[0].count, 1);
    }

    #[test]
    fn test_blocking_issue_order_is_fixed() {
        let slots = vec![
            create_test_slot("R1", None, t(9, 0), t(10, 0), &[], &[]),
            create_test_slot("R2", Some("S1"), t(9, 0), t(10, 0), &["B1"], &["T1"]),
            create_test_slot("R3", Some("S1"), t(9, 30), t(10, 30), &["B1"], &["T1"]),
            create_test_slot("R4", Some("S1"), t(12, 0), t(13, 0), &["B2"], &[]),
        ];

        let report = ReadinessAggregator::new().build(&snapshot(slots, vec![]));

        assert!(!report.is_ready);
        assert_eq!(
            report.blocking_tags(),
            vec![
                "ORPHAN_ROUTINES",
                "INCOMPLETE_ROUTINES",
                "BATCH_CONFLICTS",
                "TEACHER_CONFLICTS"
            ]
        );
        assert_eq!(report.metrics.incomplete_routines, 2);
    }

    #[test]
    fn test_adding_conflicting_slot_never_makes_ready() {
        let base = vec![create_test_slot("R1", Some("S1"), t(9, 0), t(10, 0), &["B1"], &["T1"])];
        let aggregator = ReadinessAggregator::new();

        let before = aggregator.build(&snapshot(base.clone(), vec![]));
        assert!(before.is_ready);

        let mut extended = base;
        extended.push(create_test_slot("R2", Some("S2"), t(9, 15), t(9, 45), &["B1"], &["T2"]));
        let after = aggregator.build(&snapshot(extended, vec![]));

        assert!(!after.is_ready);
        assert_eq!(after.blocking_tags(), vec!["BATCH_CONFLICTS"]);
    }

    #[test]
    fn test_informational_counts_do_not_block() {
        let integrity = IntegrityReport {
            batches_without_routines: vec![crate::engine::integrity::EntityFinding {
                kind: crate::domain::types::EntityKind::Batch,
                id: "B9".to_string(),
                name: String::new(),
            }],
            ..Default::default()
        };

        let report = ReadinessAggregator::compose(&ConflictReport::default(), &integrity);

        assert!(report.is_ready);
        assert_eq!(report.metrics.batches_without_routines, 1);
    }
}
