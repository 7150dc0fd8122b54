// ==========================================
// 课表审计引擎 - 快照加载
// ==========================================
// 职责: 从 EntityStore 拉取四个集合，组装为一次审计的不可变快照
// 说明: 时段与实体均拉取全部记录（含软删除）
//       - 悬空引用检查需要软删除时段的标识符
//       - 清理预览需要软删除时段
//       - 实体的有效性由审计器自行过滤
// ==========================================

use crate::domain::snapshot::TimetableSnapshot;
use crate::repository::entity_store::{ActiveFilter, EntityStore};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub struct SnapshotLoader;

impl SnapshotLoader {
    /// 加载审计快照
    ///
    /// # 参数
    /// - `store`: 实体存储
    /// - `taken_at`: 快照时间（由调用方传入）
    pub fn load(store: &dyn EntityStore, taken_at: DateTime<Utc>) -> RepositoryResult<TimetableSnapshot> {
        debug!(taken_at = %taken_at, "开始加载课表快照");

        let slots = store.list_routine_slots(ActiveFilter::All)?;
        let batches = store.list_batches(ActiveFilter::All)?;
        let teachers = store.list_teachers(ActiveFilter::All)?;
        let subjects = store.list_subjects(ActiveFilter::All)?;

        info!(
            slots = slots.len(),
            batches = batches.len(),
            teachers = teachers.len(),
            subjects = subjects.len(),
            "课表快照加载完成"
        );

        Ok(TimetableSnapshot::new(slots, batches, teachers, subjects, taken_at))
    }
}
