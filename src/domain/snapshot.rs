// ==========================================
// 课表审计引擎 - 审计快照
// ==========================================
// 职责: 单次审计所观察的四个集合（不可变）
// 红线: 一次审计中的所有组件观察同一快照
// 红线: 快照可经 Arc 在并发审计间共享,无需加锁
// ==========================================

use crate::domain::entity::{Batch, Subject, Teacher};
use crate::domain::routine::RoutineSlot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableSnapshot {
    pub slots: Vec<RoutineSlot>,
    pub batches: Vec<Batch>,
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,

    /// 快照拉取时间（仅用于展示,不参与审计判定）
    pub taken_at: DateTime<Utc>,
}

impl TimetableSnapshot {
    pub fn new(
        slots: Vec<RoutineSlot>,
        batches: Vec<Batch>,
        teachers: Vec<Teacher>,
        subjects: Vec<Subject>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            slots,
            batches,
            teachers,
            subjects,
            taken_at,
        }
    }

    /// 空快照
    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new(), taken_at)
    }

    /// 有效时段（按快照顺序）
    pub fn active_slots(&self) -> impl Iterator<Item = &RoutineSlot> {
        self.slots.iter().filter(|s| s.is_active)
    }

    /// 全部时段标识符（含软删除）
    pub fn slot_ids(&self) -> HashSet<&str> {
        self.slots.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
            && self.batches.is_empty()
            && self.teachers.is_empty()
            && self.subjects.is_empty()
    }
}
