// ==========================================
// 课表审计引擎 - API 层
// ==========================================
// 职责: 对外的审计入口与报告导出
// ==========================================

pub mod audit_api;
pub mod error;
pub mod report_export;

pub use audit_api::{AuditApi, FullAuditReport};
pub use error::{ApiError, ApiResult};
pub use report_export::{build_checklist, export_checklist, render_checklist, ChecklistRow};
