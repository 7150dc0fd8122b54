// ==========================================
// 课表审计引擎 - 完整性审计
// ==========================================
// 职责: 孤立/不完整时段、已分配未排课、悬空反向引用
// 输入: 审计快照（时段 + 班级 + 教师 + 科目）
// 输出: 按检查项分列的完整性报告
// ==========================================
// 注: 审计只报告问题,不修复（修复由管理员经常规写入路径完成）
// ==========================================

mod core;
mod report;

#[cfg(test)]
mod tests;

pub use core::{ActiveReferenceIndex, IntegrityAuditor};
pub use report::{
    BatchSubjectGap, DanglingReference, EntityFinding, IntegrityCounts, IntegrityReport,
    SlotFinding,
};
