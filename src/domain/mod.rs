// ==========================================
// 课表审计引擎 - 领域模型层
// ==========================================
// 职责: 定义课表时段、班级、教师、科目与审计快照
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod entity;
pub mod routine;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use entity::{Batch, ScheduledEntity, Subject, Teacher};
pub use routine::{RoutineSlot, SlotWindow};
pub use snapshot::TimetableSnapshot;
pub use types::{EntityKind, TimeRange, Weekday};
