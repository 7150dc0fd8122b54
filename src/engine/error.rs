// ==========================================
// 课表审计引擎 - 引擎层错误类型
// ==========================================
// 职责: 调用方契约违反（在扫描开始前快速失败）
// 注: 输入数据缺陷不是错误,而是审计发现,见 integrity 模块
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    // ===== 参数校验错误 =====
    #[error("保留期不能为负数: {seconds} 秒")]
    NegativeRetentionWindow { seconds: i64 },

    #[error("保留期超出可表示范围: {days} 天")]
    RetentionWindowOutOfRange { days: i64 },

    #[error("冲突扫描分片数必须大于 0")]
    InvalidShardCount,

    // ===== 执行错误 =====
    #[error("冲突扫描分片执行失败: {0}")]
    ShardFailed(String),
}

/// Result 类型别名
pub type AuditResult<T> = Result<T, AuditError>;
