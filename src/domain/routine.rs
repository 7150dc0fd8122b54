// ==========================================
// 课表审计引擎 - 课表时段领域模型
// ==========================================
// 职责: 定义 RoutineSlot 及其字段级判定
// 红线: 本模块只读判定,不修改时段
// ==========================================
// 生命周期: 排课流程创建 (is_active = true)
//          → 软删除 (is_active = false + deleted_at/deleted_by)
//          → 从不物理删除
// ==========================================

use crate::domain::entity::{default_true, lenient_id_list, lenient_ref};
use crate::domain::types::{hhmm_opt, TimeRange, Weekday};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 缺失字段名（与文档存储字段名一致）
pub mod slot_fields {
    pub const SUBJECT: &str = "subject";
    pub const BATCHES: &str = "batches";
    pub const TEACHERS: &str = "teachers";
    pub const DAY: &str = "day";
    pub const START_TIME: &str = "startTime";
    pub const END_TIME: &str = "endTime";
}

fn lenient_weekday<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Weekday>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => Weekday::parse(&s),
        _ => None,
    })
}

// ==========================================
// SlotWindow - 时段的 (星期, 开始, 结束) 三元组
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub day: Weekday,
    pub range: TimeRange,
}

// ==========================================
// RoutineSlot - 课表时段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSlot {
    // ===== 主键 =====
    #[serde(alias = "_id")]
    pub id: String,

    // ===== 时间 =====
    #[serde(default, deserialize_with = "lenient_weekday")]
    pub day: Option<Weekday>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,

    // ===== 关联 =====
    #[serde(default, deserialize_with = "lenient_ref")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub batches: Vec<String>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub teachers: Vec<String>,

    // ===== 软删除 =====
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_by: Option<String>,
    #[serde(default)]
    pub delete_reason: Option<String>,

    // ===== 审计时间戳 =====
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoutineSlot {
    /// (星期, 开始, 结束) 三者齐全时返回时段窗口
    ///
    /// 注: 不校验 start < end,见 [`RoutineSlot::has_valid_range`]
    pub fn window(&self) -> Option<SlotWindow> {
        match (self.day, self.start_time, self.end_time) {
            (Some(day), Some(start), Some(end)) => Some(SlotWindow {
                day,
                range: TimeRange::new(start, end),
            }),
            _ => None,
        }
    }

    /// 三元组齐全且 start < end
    pub fn has_valid_range(&self) -> bool {
        self.window().map(|w| w.range.is_valid()).unwrap_or(false)
    }

    /// 三元组齐全但 start >= end
    pub fn has_inverted_range(&self) -> bool {
        self.window().map(|w| !w.range.is_valid()).unwrap_or(false)
    }

    /// 孤立时段: 无科目、无班级、无教师
    pub fn is_orphan(&self) -> bool {
        self.subject.is_none() && self.batches.is_empty() && self.teachers.is_empty()
    }

    /// 缺失的必填字段（固定顺序）
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.subject.is_none() {
            missing.push(slot_fields::SUBJECT);
        }
        if self.batches.is_empty() {
            missing.push(slot_fields::BATCHES);
        }
        if self.teachers.is_empty() {
            missing.push(slot_fields::TEACHERS);
        }
        if self.day.is_none() {
            missing.push(slot_fields::DAY);
        }
        if self.start_time.is_none() {
            missing.push(slot_fields::START_TIME);
        }
        if self.end_time.is_none() {
            missing.push(slot_fields::END_TIME);
        }
        missing
    }

    /// 不完整时段: 任一必填字段缺失
    pub fn is_incomplete(&self) -> bool {
        !self.missing_fields().is_empty()
    }
}
