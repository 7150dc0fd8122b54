use crate::domain::entity::ScheduledEntity;
use crate::domain::routine::RoutineSlot;
use crate::domain::types::{hhmm_opt, EntityKind, Weekday};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// SlotFinding - 时段审计发现（裁剪为识别字段）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFinding {
    pub id: String,
    pub day: Option<Weekday>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    pub subject: Option<String>,
    pub batch_count: usize,
    pub teacher_count: usize,

    /// 缺失的必填字段
    pub missing_fields: Vec<String>,
}

impl From<&RoutineSlot> for SlotFinding {
    fn from(slot: &RoutineSlot) -> Self {
        Self {
            id: slot.id.clone(),
            day: slot.day,
            start_time: slot.start_time,
            end_time: slot.end_time,
            subject: slot.subject.clone(),
            batch_count: slot.batches.len(),
            teacher_count: slot.teachers.len(),
            missing_fields: slot
                .missing_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

// ==========================================
// EntityFinding - 班级/教师/科目审计发现
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFinding {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
}

impl EntityFinding {
    pub fn of<E: ScheduledEntity>(entity: &E) -> Self {
        Self {
            kind: entity.kind(),
            id: entity.id().to_string(),
            name: entity.name().to_string(),
        }
    }
}

// ==========================================
// BatchSubjectGap - 班级已分配但未排课的科目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubjectGap {
    pub batch_id: String,
    pub batch_name: String,
    pub unscheduled_subjects: Vec<String>,
}

// ==========================================
// DanglingReference - 悬空的反向引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub kind: EntityKind,
    pub entity_id: String,
    pub entity_name: String,

    /// 课表时段集合中不存在的标识符（去重,保持原顺序）
    pub missing_routine_ids: Vec<String>,
}

// ==========================================
// IntegrityReport - 完整性审计报告
// ==========================================
// 各检查项独立成表,便于按类别分拣
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    // ===== 时段 =====
    pub orphan_slots: Vec<SlotFinding>,
    pub incomplete_slots: Vec<SlotFinding>,
    pub slots_missing_batches: Vec<SlotFinding>,
    pub slots_missing_teachers: Vec<SlotFinding>,
    pub slots_missing_subject: Vec<SlotFinding>,
    pub invalid_time_range_slots: Vec<SlotFinding>,

    // ===== 科目 =====
    pub subjects_without_routines: Vec<EntityFinding>,
    pub subjects_without_teachers: Vec<EntityFinding>,
    pub subjects_assigned_not_scheduled: Vec<EntityFinding>,

    // ===== 教师 =====
    pub teachers_without_routines: Vec<EntityFinding>,
    pub teachers_assigned_not_scheduled: Vec<EntityFinding>,

    // ===== 班级 =====
    pub batches_without_routines: Vec<EntityFinding>,
    pub batch_subjects_assigned_not_scheduled: Vec<BatchSubjectGap>,

    // ===== 引用一致性 =====
    pub dangling_references: Vec<DanglingReference>,
}

// ==========================================
// IntegrityCounts - 各检查项计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCounts {
    pub orphan_slots: usize,
    pub incomplete_slots: usize,
    pub slots_missing_batches: usize,
    pub slots_missing_teachers: usize,
    pub slots_missing_subject: usize,
    pub invalid_time_range_slots: usize,
    pub subjects_without_routines: usize,
    pub subjects_without_teachers: usize,
    pub subjects_assigned_not_scheduled: usize,
    pub teachers_without_routines: usize,
    pub teachers_assigned_not_scheduled: usize,
    pub batches_without_routines: usize,
    pub batch_subjects_assigned_not_scheduled: usize,
    pub dangling_references: usize,
}

impl IntegrityReport {
    pub fn counts(&self) -> IntegrityCounts {
        IntegrityCounts {
            orphan_slots: self.orphan_slots.len(),
            incomplete_slots: self.incomplete_slots.len(),
            slots_missing_batches: self.slots_missing_batches.len(),
            slots_missing_teachers: self.slots_missing_teachers.len(),
            slots_missing_subject: self.slots_missing_subject.len(),
            invalid_time_range_slots: self.invalid_time_range_slots.len(),
            subjects_without_routines: self.subjects_without_routines.len(),
            subjects_without_teachers: self.subjects_without_teachers.len(),
            subjects_assigned_not_scheduled: self.subjects_assigned_not_scheduled.len(),
            teachers_without_routines: self.teachers_without_routines.len(),
            teachers_assigned_not_scheduled: self.teachers_assigned_not_scheduled.len(),
            batches_without_routines: self.batches_without_routines.len(),
            batch_subjects_assigned_not_scheduled: self.batch_subjects_assigned_not_scheduled.len(),
            dangling_references: self.dangling_references.len(),
        }
    }

    /// 所有检查项均无发现
    pub fn is_clean(&self) -> bool {
        self.counts() == IntegrityCounts::default()
    }
}
