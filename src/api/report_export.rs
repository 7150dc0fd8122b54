// ==========================================
// 课表审计引擎 - 审计清单导出
// ==========================================
// 职责: 将阻断问题与冲突明细导出为 CSV，供管理员逐项处理
// 格式: 每行一项；多值字段以 '|' 连接
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::audit_api::FullAuditReport;
use crate::engine::conflict::{ConflictReport, ScheduleConflict};
use crate::engine::readiness::ReadinessReport;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// 多值字段分隔符
pub const LIST_SEPARATOR: &str = "|";

// ==========================================
// ChecklistRow - 清单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistRow {
    /// BLOCKING | CONFLICT
    pub section: &'static str,
    /// 阻断标签或冲突类型
    pub tag: String,
    pub count: usize,
    pub slot_ids: String,
    pub shared_ids: String,
    pub day: String,
    pub detail: String,
}

/// 由就绪报告与冲突报告生成清单行
///
/// 顺序: 阻断问题（报告顺序）→ 班级冲突 → 教师冲突
pub fn build_checklist(readiness: &ReadinessReport, conflicts: &ConflictReport) -> Vec<ChecklistRow> {
    let blocking = readiness.blocking_issues.iter().map(|issue| ChecklistRow {
        section: "BLOCKING",
        tag: issue.category.tag().to_string(),
        count: issue.count,
        slot_ids: String::new(),
        shared_ids: String::new(),
        day: String::new(),
        detail: issue.message.clone(),
    });

    let conflict_rows = conflicts
        .batch_conflicts
        .iter()
        .chain(conflicts.teacher_conflicts.iter())
        .map(conflict_row);

    blocking.chain(conflict_rows).collect()
}

fn conflict_row(conflict: &ScheduleConflict) -> ChecklistRow {
    ChecklistRow {
        section: "CONFLICT",
        tag: conflict.conflict_type.to_string(),
        count: 1,
        slot_ids: conflict.slot_ids.join(LIST_SEPARATOR),
        shared_ids: conflict.shared_ids.join(LIST_SEPARATOR),
        day: conflict.day.to_string(),
        detail: format!("{} / {}", conflict.first_range, conflict.second_range),
    }
}

/// 写出 CSV（含表头）
///
/// # 返回
/// - 写出的数据行数
pub fn write_checklist<W: Write>(rows: &[ChecklistRow], writer: W) -> ApiResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer
        .flush()
        .map_err(|e| ApiError::ExportError(e.to_string()))?;
    Ok(rows.len())
}

/// 渲染为 CSV 文本
pub fn render_checklist(report: &FullAuditReport) -> ApiResult<String> {
    let rows = build_checklist(&report.readiness, &report.conflicts);
    let mut buffer = Vec::new();
    write_checklist(&rows, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ApiError::ExportError(e.to_string()))
}

/// 导出到文件
pub fn export_checklist(report: &FullAuditReport, path: &Path) -> ApiResult<usize> {
    let rows = build_checklist(&report.readiness, &report.conflicts);
    let file = std::fs::File::create(path)
        .map_err(|e| ApiError::ExportError(format!("{}: {}", path.display(), e)))?;
    let written = write_checklist(&rows, file)?;

    info!(path = %path.display(), rows = written, "审计清单已导出");
    Ok(written)
}
