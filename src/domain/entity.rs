// ==========================================
// 课表审计引擎 - 班级/教师/科目领域模型
// ==========================================
// 职责: 定义被课表时段引用的三类实体
// 红线: routines 反向引用数组是外部写入路径维护的缓存,未经校验
// 红线: 反序列化必须是全函数（畸形数组视为空数组）
// ==========================================

use crate::domain::types::EntityKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub(crate) fn default_true() -> bool {
    true
}

// ==========================================
// 宽松反序列化
// ==========================================

/// 从引用值中提取标识符
///
/// 支持: "id" 字符串,或文档存储展开后的 {"_id": "..."} / {"id": "..."} 对象。
/// 空字符串视为缺失。
fn extract_ref(value: Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s,
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)?
            .to_string(),
        _ => return None,
    };
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 宽松的标识符数组
///
/// null / 缺失 / 非数组 → 空数组;数组中无法识别的元素被跳过
pub fn lenient_id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => items.into_iter().filter_map(extract_ref).collect(),
        _ => Vec::new(),
    })
}

/// 宽松的单个引用（null / 空串 / 非法类型 → None）
pub fn lenient_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(extract_ref))
}

// ==========================================
// Trait: ScheduledEntity
// ==========================================
// 用途: 悬空引用检查对三类实体统一处理
pub trait ScheduledEntity {
    /// 实体种类
    fn kind(&self) -> EntityKind;

    /// 实体标识符
    fn id(&self) -> &str;

    /// 显示名称
    fn name(&self) -> &str;

    /// 是否有效（未软删除）
    fn is_active(&self) -> bool;

    /// 反向引用的课表时段标识符（未经校验的缓存）
    fn routines(&self) -> &[String];
}

// ==========================================
// Batch - 班级
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// 分配给该班级的科目
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub subjects: Vec<String>,

    /// 分配给该班级的教师
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub teachers: Vec<String>,

    /// 反向引用: 该班级出现的课表时段
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub routines: Vec<String>,
}

// ==========================================
// Teacher - 教师
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// 教师可授科目
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub subjects: Vec<String>,

    /// 教师负责的班级
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub batches: Vec<String>,

    #[serde(default, deserialize_with = "lenient_id_list")]
    pub routines: Vec<String>,
}

// ==========================================
// Subject - 科目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// 开设该科目的班级
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub batches: Vec<String>,

    /// 讲授该科目的教师
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub teachers: Vec<String>,

    #[serde(default, deserialize_with = "lenient_id_list")]
    pub routines: Vec<String>,
}

macro_rules! impl_scheduled_entity {
    ($ty:ty, $kind:expr) => {
        impl ScheduledEntity for $ty {
            fn kind(&self) -> EntityKind {
                $kind
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn is_active(&self) -> bool {
                self.is_active
            }

            fn routines(&self) -> &[String] {
                &self.routines
            }
        }
    };
}

impl_scheduled_entity!(Batch, EntityKind::Batch);
impl_scheduled_entity!(Teacher, EntityKind::Teacher);
impl_scheduled_entity!(Subject, EntityKind::Subject);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_routines_treated_as_empty() {
        let teacher: Teacher = serde_json::from_str(
            r#"{"_id": "T1", "name": "Asha", "routines": "R1", "subjects": null}"#,
        )
        .unwrap();

        assert_eq!(teacher.id, "T1");
        assert!(teacher.routines.is_empty());
        assert!(teacher.subjects.is_empty());
        assert!(teacher.is_active);
    }

    #[test]
    fn test_populated_refs_are_flattened() {
        let batch: Batch = serde_json::from_str(
            r#"{"id": "B1", "subjects": [{"_id": "S1", "name": "Physics"}, "S2", 42, ""]}"#,
        )
        .unwrap();

        assert_eq!(batch.subjects, vec!["S1".to_string(), "S2".to_string()]);
        assert!(batch.routines.is_empty());
    }

    #[test]
    fn test_scheduled_entity_kind() {
        let subject: Subject =
            serde_json::from_str(r#"{"id": "S1", "routines": ["R1", "R2"]}"#).unwrap();
        assert_eq!(subject.kind(), EntityKind::Subject);
        assert_eq!(subject.routines().len(), 2);
    }
}
