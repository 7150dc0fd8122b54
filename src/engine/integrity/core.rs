// ==========================================
// 课表审计引擎 - 完整性审计引擎
// ==========================================
// 红线: 每个检查项都是纯过滤,互不依赖
// 红线: 审计必须是全函数,畸形数据视为空,不报错不崩溃
// 红线: 反向引用数组仅用于悬空引用与"无课表"检查,不在其他地方被信任
// ==========================================
// 职责: 时段/科目/教师/班级的分类判定
// 输入: 审计快照
// 输出: 按检查项分列的发现列表
// ==========================================

use crate::domain::entity::{Batch, ScheduledEntity, Subject, Teacher};
use crate::domain::routine::RoutineSlot;
use crate::domain::snapshot::TimetableSnapshot;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::report::{
    BatchSubjectGap, DanglingReference, EntityFinding, IntegrityReport, SlotFinding,
};

// ==========================================
// ActiveReferenceIndex - 有效时段的正向引用索引
// ==========================================
// 由时段集合正向状态推导,是"已排课"判定的唯一依据
#[derive(Debug, Default)]
pub struct ActiveReferenceIndex<'a> {
    subjects: HashSet<&'a str>,
    teachers: HashSet<&'a str>,
    batches: HashSet<&'a str>,
    batch_subject_pairs: HashSet<(&'a str, &'a str)>,
}

impl<'a> ActiveReferenceIndex<'a> {
    /// 从时段集合构建索引（仅有效时段）
    pub fn build(slots: &'a [RoutineSlot]) -> Self {
        let mut index = Self::default();
        for slot in slots.iter().filter(|s| s.is_active) {
            if let Some(subject) = slot.subject.as_deref() {
                index.subjects.insert(subject);
                for batch in &slot.batches {
                    index.batch_subject_pairs.insert((batch.as_str(), subject));
                }
            }
            index.teachers.extend(slot.teachers.iter().map(String::as_str));
            index.batches.extend(slot.batches.iter().map(String::as_str));
        }
        index
    }

    pub fn has_subject(&self, subject_id: &str) -> bool {
        self.subjects.contains(subject_id)
    }

    pub fn has_teacher(&self, teacher_id: &str) -> bool {
        self.teachers.contains(teacher_id)
    }

    pub fn has_batch(&self, batch_id: &str) -> bool {
        self.batches.contains(batch_id)
    }

    pub fn links_batch_subject(&self, batch_id: &str, subject_id: &str) -> bool {
        self.batch_subject_pairs.contains(&(batch_id, subject_id))
    }
}

// ==========================================
// IntegrityAuditor - 完整性审计引擎
// ==========================================
// 无状态引擎
#[derive(Debug, Default, Clone)]
pub struct IntegrityAuditor {}

impl IntegrityAuditor {
    /// 创建新的完整性审计引擎
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 对快照执行全部完整性检查
    pub fn audit(&self, snapshot: &TimetableSnapshot) -> IntegrityReport {
        debug!(
            slots = snapshot.slots.len(),
            batches = snapshot.batches.len(),
            teachers = snapshot.teachers.len(),
            subjects = snapshot.subjects.len(),
            "开始完整性审计"
        );

        let index = ActiveReferenceIndex::build(&snapshot.slots);

        let report = IntegrityReport {
            orphan_slots: self.find_orphan_slots(&snapshot.slots),
            incomplete_slots: self.find_incomplete_slots(&snapshot.slots),
            slots_missing_batches: self.find_slots_missing_batches(&snapshot.slots),
            slots_missing_teachers: self.find_slots_missing_teachers(&snapshot.slots),
            slots_missing_subject: self.find_slots_missing_subject(&snapshot.slots),
            invalid_time_range_slots: self.find_invalid_time_range_slots(&snapshot.slots),
            subjects_without_routines: self.find_subjects_without_routines(&snapshot.subjects),
            subjects_without_teachers: self.find_subjects_without_teachers(&snapshot.subjects),
            subjects_assigned_not_scheduled: self
                .find_subjects_assigned_not_scheduled(&snapshot.subjects, &index),
            teachers_without_routines: self.find_teachers_without_routines(&snapshot.teachers),
            teachers_assigned_not_scheduled: self
                .find_teachers_assigned_not_scheduled(&snapshot.teachers, &index),
            batches_without_routines: self.find_batches_without_routines(&snapshot.batches, &index),
            batch_subjects_assigned_not_scheduled: self
                .find_batch_subjects_assigned_not_scheduled(&snapshot.batches, &index),
            dangling_references: self.find_dangling_references(snapshot),
        };

        let counts = report.counts();
        if report.is_clean() {
            info!("完整性审计通过,无发现");
        } else {
            warn!(
                orphan_slots = counts.orphan_slots,
                incomplete_slots = counts.incomplete_slots,
                invalid_time_range_slots = counts.invalid_time_range_slots,
                subjects_assigned_not_scheduled = counts.subjects_assigned_not_scheduled,
                teachers_assigned_not_scheduled = counts.teachers_assigned_not_scheduled,
                batches_without_routines = counts.batches_without_routines,
                dangling_references = counts.dangling_references,
                "完整性审计存在发现"
            );
        }

        report
    }

    // ==========================================
    // 时段检查
    // ==========================================

    /// 孤立时段: 无科目 且 无班级 且 无教师
    pub fn find_orphan_slots(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, RoutineSlot::is_orphan)
    }

    /// 不完整时段: 科目/班级/教师/星期/开始/结束 任一缺失
    pub fn find_incomplete_slots(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, RoutineSlot::is_incomplete)
    }

    pub fn find_slots_missing_batches(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, |s| s.batches.is_empty())
    }

    pub fn find_slots_missing_teachers(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, |s| s.teachers.is_empty())
    }

    pub fn find_slots_missing_subject(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, |s| s.subject.is_none())
    }

    /// 时间倒置: 三元组齐全但 start >= end
    pub fn find_invalid_time_range_slots(&self, slots: &[RoutineSlot]) -> Vec<SlotFinding> {
        Self::filter_active_slots(slots, RoutineSlot::has_inverted_range)
    }

    // ==========================================
    // 科目检查
    // ==========================================

    /// 科目反向引用为空
    pub fn find_subjects_without_routines(&self, subjects: &[Subject]) -> Vec<EntityFinding> {
        Self::filter_active_entities(subjects, |s| s.routines.is_empty())
    }

    pub fn find_subjects_without_teachers(&self, subjects: &[Subject]) -> Vec<EntityFinding> {
        Self::filter_active_entities(subjects, |s| s.teachers.is_empty())
    }

    /// 科目已分配班级,但没有任何有效时段引用该科目
    pub fn find_subjects_assigned_not_scheduled(
        &self,
        subjects: &[Subject],
        index: &ActiveReferenceIndex<'_>,
    ) -> Vec<EntityFinding> {
        Self::filter_active_entities(subjects, |s| {
            !s.batches.is_empty() && !index.has_subject(&s.id)
        })
    }

    // ==========================================
    // 教师检查
    // ==========================================

    pub fn find_teachers_without_routines(&self, teachers: &[Teacher]) -> Vec<EntityFinding> {
        Self::filter_active_entities(teachers, |t| t.routines.is_empty())
    }

    /// 教师已分配科目,但没有任何有效时段引用该教师
    pub fn find_teachers_assigned_not_scheduled(
        &self,
        teachers: &[Teacher],
        index: &ActiveReferenceIndex<'_>,
    ) -> Vec<EntityFinding> {
        Self::filter_active_entities(teachers, |t| {
            !t.subjects.is_empty() && !index.has_teacher(&t.id)
        })
    }

    // ==========================================
    // 班级检查
    // ==========================================

    /// 没有任何有效时段引用该班级（正向状态判定）
    pub fn find_batches_without_routines(
        &self,
        batches: &[Batch],
        index: &ActiveReferenceIndex<'_>,
    ) -> Vec<EntityFinding> {
        Self::filter_active_entities(batches, |b| !index.has_batch(&b.id))
    }

    /// 班级的每个已分配科目,检查是否存在同时引用班级与科目的有效时段
    pub fn find_batch_subjects_assigned_not_scheduled(
        &self,
        batches: &[Batch],
        index: &ActiveReferenceIndex<'_>,
    ) -> Vec<BatchSubjectGap> {
        batches
            .iter()
            .filter(|b| b.is_active)
            .filter_map(|batch| {
                let unscheduled = dedup_preserving_order(
                    batch
                        .subjects
                        .iter()
                        .filter(|subject| !index.links_batch_subject(&batch.id, subject)),
                );
                if unscheduled.is_empty() {
                    None
                } else {
                    Some(BatchSubjectGap {
                        batch_id: batch.id.clone(),
                        batch_name: batch.name.clone(),
                        unscheduled_subjects: unscheduled,
                    })
                }
            })
            .collect()
    }

    // ==========================================
    // 引用一致性检查
    // ==========================================

    /// 悬空引用: 反向引用数组中的标识符在时段集合中不存在（含软删除时段）
    ///
    /// # 返回
    /// 每个实体最多一条记录,列出全部缺失标识符;顺序为 班级 → 教师 → 科目
    pub fn find_dangling_references(&self, snapshot: &TimetableSnapshot) -> Vec<DanglingReference> {
        let slot_ids = snapshot.slot_ids();
        let mut dangling = Vec::new();
        Self::collect_dangling(&snapshot.batches, &slot_ids, &mut dangling);
        Self::collect_dangling(&snapshot.teachers, &slot_ids, &mut dangling);
        Self::collect_dangling(&snapshot.subjects, &slot_ids, &mut dangling);
        dangling
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn filter_active_slots<F>(slots: &[RoutineSlot], predicate: F) -> Vec<SlotFinding>
    where
        F: Fn(&RoutineSlot) -> bool,
    {
        slots
            .iter()
            .filter(|s| s.is_active && predicate(*s))
            .map(SlotFinding::from)
            .collect()
    }

    fn filter_active_entities<E, F>(entities: &[E], predicate: F) -> Vec<EntityFinding>
    where
        E: ScheduledEntity,
        F: Fn(&E) -> bool,
    {
        entities
            .iter()
            .filter(|e| e.is_active() && predicate(*e))
            .map(EntityFinding::of)
            .collect()
    }

    fn collect_dangling<E: ScheduledEntity>(
        entities: &[E],
        slot_ids: &HashSet<&str>,
        out: &mut Vec<DanglingReference>,
    ) {
        for entity in entities.iter().filter(|e| e.is_active()) {
            let missing = dedup_preserving_order(
                entity
                    .routines()
                    .iter()
                    .filter(|id| !slot_ids.contains(id.as_str())),
            );
            if !missing.is_empty() {
                debug!(
                    kind = %entity.kind(),
                    entity_id = entity.id(),
                    missing = missing.len(),
                    "发现悬空反向引用"
                );
                out.push(DanglingReference {
                    kind: entity.kind(),
                    entity_id: entity.id().to_string(),
                    entity_name: entity.name().to_string(),
                    missing_routine_ids: missing,
                });
            }
        }
    }
}

fn dedup_preserving_order<'a, I>(ids: I) -> Vec<String>
where
    I: Iterator<Item = &'a String>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    out
}
