// ==========================================
// 课表审计引擎 - 领域类型定义
// ==========================================
// 职责: 星期枚举、时间段、实体种类
// 红线: 标识符由实体存储分配,本引擎不生成、不修改
// ==========================================

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 课表时间的文本格式（HH:MM）
pub const TIME_FORMAT: &str = "%H:%M";

// ==========================================
// 星期 (Weekday)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与文档存储一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 转换为存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "MONDAY",
            Weekday::Tuesday => "TUESDAY",
            Weekday::Wednesday => "WEDNESDAY",
            Weekday::Thursday => "THURSDAY",
            Weekday::Friday => "FRIDAY",
            Weekday::Saturday => "SATURDAY",
            Weekday::Sunday => "SUNDAY",
        }
    }

    /// 从存储字符串解析（大小写不敏感）
    ///
    /// 无法识别的值返回 None,由完整性审计归为"缺少星期"
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|day| day.as_str() == normalized)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 时间段 (TimeRange)
// ==========================================
// 半开区间 [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// start < end 才是有效时间段
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

// ==========================================
// 实体种类 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Batch,
    Teacher,
    Subject,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Batch => write!(f, "BATCH"),
            EntityKind::Teacher => write!(f, "TEACHER"),
            EntityKind::Subject => write!(f, "SUBJECT"),
        }
    }
}

/// 解析 HH:MM 或 HH:MM:SS
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

// ==========================================
// serde 辅助: NaiveTime <-> "HH:MM"
// ==========================================
pub mod hhmm {
    use super::{parse_time, TIME_FORMAT};
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time(&raw).ok_or_else(|| de::Error::custom(format!("无效时间: {}", raw)))
    }
}

// 可缺失的时间字段: 无法解析的值视为缺失（数据缺陷由审计报告暴露,而不是反序列化失败）
pub mod hhmm_opt {
    use super::{parse_time, TIME_FORMAT};
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&t.format(TIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => parse_time(&s),
            _ => None,
        })
    }
}
