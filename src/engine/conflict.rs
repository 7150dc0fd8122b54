// ==========================================
// 课表审计引擎 - 冲突检测引擎
// ==========================================
// 职责: 两两扫描有效时段,检出班级/教师重复占用
// 输入: 课表时段列表（软删除时段不参与）
// 输出: 班级冲突列表 + 教师冲突列表
// ==========================================
// 红线: 同一无序时段对最多产生一条班级冲突、一条教师冲突
// 红线: 时段不与自身冲突（即使输入中重复出现）
// 红线: 固定输入 → 固定输出顺序（外层/内层循环顺序）
// ==========================================
// 注: O(n²) 扫描,单机构规模为数百条时段;
//     大规模时可按外层循环分片并行,见 detect_sharded
// ==========================================

use crate::domain::routine::{RoutineSlot, SlotWindow};
use crate::domain::types::{TimeRange, Weekday};
use crate::engine::error::{AuditError, AuditResult};
use crate::engine::overlap::OverlapEvaluator;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// ConflictType - 冲突类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    BatchConflict,
    TeacherConflict,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::BatchConflict => write!(f, "BATCH_CONFLICT"),
            ConflictType::TeacherConflict => write!(f, "TEACHER_CONFLICT"),
        }
    }
}

// ==========================================
// ScheduleConflict - 单条冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    /// 冲突类型
    pub conflict_type: ConflictType,

    /// 造成冲突的共享班级/教师标识符（按第一个时段中的顺序）
    pub shared_ids: Vec<String>,

    /// 冲突时段对（扫描顺序）
    pub slot_ids: [String; 2],

    /// 星期
    pub day: Weekday,

    /// 第一个时段的时间段
    pub first_range: TimeRange,

    /// 第二个时段的时间段
    pub second_range: TimeRange,
}

// ==========================================
// ConflictReport - 冲突报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub batch_conflicts: Vec<ScheduleConflict>,
    pub teacher_conflicts: Vec<ScheduleConflict>,
}

impl ConflictReport {
    /// 冲突总数
    pub fn total(&self) -> usize {
        self.batch_conflicts.len() + self.teacher_conflicts.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// 按顺序追加另一份报告（分片合并）
    fn append(&mut self, other: ConflictReport) {
        self.batch_conflicts.extend(other.batch_conflicts);
        self.teacher_conflicts.extend(other.teacher_conflicts);
    }
}

// 参与扫描的时段: 有效、三元组齐全且 start < end
#[derive(Debug, Clone)]
struct ScanCandidate {
    slot_index: usize,
    window: SlotWindow,
}

// ==========================================
// ConflictDetector - 冲突检测引擎
// ==========================================
// 无状态引擎
#[derive(Debug, Default, Clone)]
pub struct ConflictDetector {}

impl ConflictDetector {
    /// 创建新的冲突检测引擎
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 检测班级/教师冲突（顺序扫描）
    ///
    /// # 参数
    /// - `slots`: 课表时段（可包含软删除时段,会被排除）
    ///
    /// # 返回
    /// 冲突报告;空输入返回空报告
    pub fn detect(&self, slots: &[RoutineSlot]) -> ConflictReport {
        let candidates = Self::collect_candidates(slots);

        debug!(
            total_slots = slots.len(),
            scanned_slots = candidates.len(),
            "开始检测课表冲突"
        );

        let mut report = ConflictReport::default();
        Self::scan_outer_range(slots, &candidates, 0..candidates.len(), &mut report);

        Self::log_outcome(&report);
        report
    }

    /// 检测班级/教师冲突（外层循环分片并行）
    ///
    /// # 参数
    /// - `slots`: 共享的课表时段快照
    /// - `shards`: 分片数（> 0）
    ///
    /// # 返回
    /// 与 [`ConflictDetector::detect`] 完全相同的报告
    ///
    /// # 说明
    /// 外层循环按连续区间切分,每个分片在阻塞线程池中执行,
    /// 完成后按分片顺序合并,因此输出顺序与顺序扫描一致。
    pub async fn detect_sharded(
        &self,
        slots: Arc<Vec<RoutineSlot>>,
        shards: usize,
    ) -> AuditResult<ConflictReport> {
        if shards == 0 {
            warn!("冲突扫描分片数为 0");
            return Err(AuditError::InvalidShardCount);
        }

        let candidates = Arc::new(Self::collect_candidates(&slots));
        let ranges = Self::partition(candidates.len(), shards);

        debug!(
            total_slots = slots.len(),
            scanned_slots = candidates.len(),
            shards = ranges.len(),
            "开始分片检测课表冲突"
        );

        let tasks = ranges.into_iter().map(|range| {
            let slots = Arc::clone(&slots);
            let candidates = Arc::clone(&candidates);
            tokio::task::spawn_blocking(move || {
                let mut partial = ConflictReport::default();
                Self::scan_outer_range(&slots, &candidates, range, &mut partial);
                partial
            })
        });

        let mut report = ConflictReport::default();
        for result in join_all(tasks).await {
            let partial = result.map_err(|e| AuditError::ShardFailed(e.to_string()))?;
            report.append(partial);
        }

        Self::log_outcome(&report);
        Ok(report)
    }

    // ==========================================
    // 扫描实现
    // ==========================================

    /// 同一标识符重复出现时只保留第一条有效记录
    fn collect_candidates(slots: &[RoutineSlot]) -> Vec<ScanCandidate> {
        let mut seen: HashSet<&str> = HashSet::new();
        slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active)
            .filter(|&(_, slot)| seen.insert(slot.id.as_str()))
            .filter_map(|(slot_index, slot)| {
                let window = slot.window()?;
                if window.range.is_valid() {
                    Some(ScanCandidate { slot_index, window })
                } else {
                    None
                }
            })
            .collect()
    }

    /// 扫描外层下标区间 [range.start, range.end) 对应的所有 (i, j>i) 时段对
    fn scan_outer_range(
        slots: &[RoutineSlot],
        candidates: &[ScanCandidate],
        range: Range<usize>,
        report: &mut ConflictReport,
    ) {
        for i in range {
            let a = &candidates[i];
            let slot_a = &slots[a.slot_index];

            for b in &candidates[i + 1..] {
                let slot_b = &slots[b.slot_index];

                if a.window.day != b.window.day {
                    continue;
                }

                if !OverlapEvaluator::windows_overlap(&a.window, &b.window) {
                    continue;
                }

                let shared_batches = shared_ids(&slot_a.batches, &slot_b.batches);
                if !shared_batches.is_empty() {
                    report.batch_conflicts.push(Self::build_conflict(
                        ConflictType::BatchConflict,
                        shared_batches,
                        slot_a,
                        slot_b,
                        a,
                        b,
                    ));
                }

                let shared_teachers = shared_ids(&slot_a.teachers, &slot_b.teachers);
                if !shared_teachers.is_empty() {
                    report.teacher_conflicts.push(Self::build_conflict(
                        ConflictType::TeacherConflict,
                        shared_teachers,
                        slot_a,
                        slot_b,
                        a,
                        b,
                    ));
                }
            }
        }
    }

    fn build_conflict(
        conflict_type: ConflictType,
        shared: Vec<String>,
        slot_a: &RoutineSlot,
        slot_b: &RoutineSlot,
        a: &ScanCandidate,
        b: &ScanCandidate,
    ) -> ScheduleConflict {
        ScheduleConflict {
            conflict_type,
            shared_ids: shared,
            slot_ids: [slot_a.id.clone(), slot_b.id.clone()],
            day: a.window.day,
            first_range: a.window.range,
            second_range: b.window.range,
        }
    }

    /// 将 [0, len) 切分为至多 shards 个连续区间
    fn partition(len: usize, shards: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return Vec::new();
        }
        let shards = shards.min(len);
        let chunk = len.div_ceil(shards);
        (0..len)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(len))
            .collect()
    }

    fn log_outcome(report: &ConflictReport) {
        if report.is_clean() {
            info!("未检测到课表冲突");
        } else {
            warn!(
                batch_conflicts = report.batch_conflicts.len(),
                teacher_conflicts = report.teacher_conflicts.len(),
                "检测到课表冲突"
            );
        }
    }
}

/// 两个标识符列表的交集（保持 a 中顺序,去重）
fn shared_ids(a: &[String], b: &[String]) -> Vec<String> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut shared = Vec::new();
    for id in a {
        if b_set.contains(id.as_str()) && seen.insert(id.as_str()) {
            shared.push(id.clone());
        }
    }
    shared
}
