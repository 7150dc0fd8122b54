use super::*;
use crate::domain::entity::{Batch, Subject, Teacher};
use crate::domain::routine::RoutineSlot;
use crate::domain::snapshot::TimetableSnapshot;
use crate::domain::types::{EntityKind, Weekday};
use chrono::{NaiveTime, TimeZone, Utc};

// ==========================================
// 测试辅助函数
// ==========================================

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// 创建测试用的完整时段
fn create_test_slot(id: &str, subject: Option<&str>, batches: &[&str], teachers: &[&str]) -> RoutineSlot {
    RoutineSlot {
        id: id.to_string(),
        day: Some(Weekday::Monday),
        start_time: Some(t(9, 0)),
        end_time: Some(t(10, 0)),
        subject: subject.map(|s| s.to_string()),
        batches: ids(batches),
        teachers: ids(teachers),
        is_active: true,
        deleted_at: None,
        deleted_by: None,
        delete_reason: None,
        created_at: None,
        updated_at: None,
    }
}

fn create_test_batch(id: &str, subjects: &[&str], routines: &[&str]) -> Batch {
    Batch {
        id: id.to_string(),
        name: format!("Batch {}", id),
        is_active: true,
        subjects: ids(subjects),
        teachers: Vec::new(),
        routines: ids(routines),
    }
}

fn create_test_teacher(id: &str, subjects: &[&str], routines: &[&str]) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: format!("Teacher {}", id),
        is_active: true,
        subjects: ids(subjects),
        batches: Vec::new(),
        routines: ids(routines),
    }
}

fn create_test_subject(id: &str, batches: &[&str], teachers: &[&str], routines: &[&str]) -> Subject {
    Subject {
        id: id.to_string(),
        name: format!("Subject {}", id),
        is_active: true,
        batches: ids(batches),
        teachers: ids(teachers),
        routines: ids(routines),
    }
}

fn snapshot(
    slots: Vec<RoutineSlot>,
    batches: Vec<Batch>,
    teachers: Vec<Teacher>,
    subjects: Vec<Subject>,
) -> TimetableSnapshot {
    TimetableSnapshot::new(
        slots,
        batches,
        teachers,
        subjects,
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
    )
}

// ==========================================
// 正常案例测试
// ==========================================

#[test]
fn test_empty_snapshot_is_clean() {
    let report = IntegrityAuditor::new().audit(&snapshot(vec![], vec![], vec![], vec![]));
    assert!(report.is_clean());
    assert_eq!(report.counts(), IntegrityCounts::default());
}

#[test]
fn test_consistent_snapshot_is_clean() {
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B1"], &["T1"])],
        vec![create_test_batch("B1", &["S1"], &["R1"])],
        vec![create_test_teacher("T1", &["S1"], &["R1"])],
        vec![create_test_subject("S1", &["B1"], &["T1"], &["R1"])],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert!(report.is_clean(), "unexpected findings: {:?}", report.counts());
}

// ==========================================
// 时段检查
// ==========================================

#[test]
fn test_orphan_slot_is_also_incomplete() {
    let snap = snapshot(
        vec![create_test_slot("R1", None, &[], &[])],
        vec![],
        vec![],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.orphan_slots.len(), 1);
    assert_eq!(report.incomplete_slots.len(), 1);
    assert_eq!(report.orphan_slots[0].id, "R1");
    assert_eq!(
        report.incomplete_slots[0].missing_fields,
        ids(&["subject", "batches", "teachers"])
    );
    assert_eq!(report.slots_missing_batches.len(), 1);
    assert_eq!(report.slots_missing_teachers.len(), 1);
    assert_eq!(report.slots_missing_subject.len(), 1);
}

#[test]
fn test_partial_slot_is_incomplete_not_orphan() {
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B1"], &[])],
        vec![],
        vec![],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert!(report.orphan_slots.is_empty());
    assert_eq!(report.incomplete_slots.len(), 1);
    assert_eq!(report.slots_missing_teachers.len(), 1);
    assert!(report.slots_missing_batches.is_empty());
    assert!(report.slots_missing_subject.is_empty());
}

#[test]
fn test_missing_time_is_incomplete() {
    let mut slot = create_test_slot("R1", Some("S1"), &["B1"], &["T1"]);
    slot.end_time = None;

    let report = IntegrityAuditor::new().audit(&snapshot(vec![slot], vec![], vec![], vec![]));

    assert_eq!(report.incomplete_slots.len(), 1);
    assert_eq!(report.incomplete_slots[0].missing_fields, ids(&["endTime"]));
    assert!(report.invalid_time_range_slots.is_empty());
}

#[test]
fn test_inverted_time_range_detected() {
    let mut slot = create_test_slot("R1", Some("S1"), &["B1"], &["T1"]);
    slot.start_time = Some(t(11, 0));
    slot.end_time = Some(t(11, 0));

    let report = IntegrityAuditor::new().audit(&snapshot(vec![slot], vec![], vec![], vec![]));

    assert_eq!(report.invalid_time_range_slots.len(), 1);
    assert!(report.incomplete_slots.is_empty());
}

#[test]
fn test_soft_deleted_slots_ignored_by_slot_checks() {
    let mut slot = create_test_slot("R1", None, &[], &[]);
    slot.is_active = false;
    slot.deleted_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

    let report = IntegrityAuditor::new().audit(&snapshot(vec![slot], vec![], vec![], vec![]));

    assert!(report.orphan_slots.is_empty());
    assert!(report.incomplete_slots.is_empty());
}

// ==========================================
// 科目检查
// ==========================================

#[test]
fn test_subject_assigned_but_not_scheduled() {
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B1"], &["T1"])],
        vec![],
        vec![],
        vec![
            create_test_subject("S1", &["B1"], &["T1"], &["R1"]),
            create_test_subject("S2", &["B2"], &["T1"], &[]),
        ],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.subjects_assigned_not_scheduled.len(), 1);
    let finding = &report.subjects_assigned_not_scheduled[0];
    assert_eq!(finding.kind, EntityKind::Subject);
    assert_eq!(finding.id, "S2");
    assert_eq!(report.subjects_without_routines.len(), 1);
}

#[test]
fn test_subject_scheduled_only_in_deleted_slot_is_unscheduled() {
    let mut slot = create_test_slot("R1", Some("S1"), &["B1"], &["T1"]);
    slot.is_active = false;

    let snap = snapshot(
        vec![slot],
        vec![],
        vec![],
        vec![create_test_subject("S1", &["B1"], &["T1"], &["R1"])],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.subjects_assigned_not_scheduled.len(), 1);
    // 反向引用指向已软删除的时段不算悬空
    assert!(report.dangling_references.is_empty());
}

#[test]
fn test_subject_without_teachers() {
    let snap = snapshot(
        vec![],
        vec![],
        vec![],
        vec![create_test_subject("S1", &[], &[], &[])],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.subjects_without_teachers.len(), 1);
    assert_eq!(report.subjects_without_routines.len(), 1);
    // 没有分配班级,不算"已分配未排课"
    assert!(report.subjects_assigned_not_scheduled.is_empty());
}

#[test]
fn test_inactive_subject_skipped() {
    let mut subject = create_test_subject("S1", &["B1"], &[], &["GONE"]);
    subject.is_active = false;

    let report = IntegrityAuditor::new().audit(&snapshot(vec![], vec![], vec![], vec![subject]));

    assert!(report.is_clean());
}

// ==========================================
// 教师检查
// ==========================================

#[test]
fn test_teacher_assigned_not_scheduled() {
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B1"], &["T1"])],
        vec![],
        vec![
            create_test_teacher("T1", &["S1"], &["R1"]),
            create_test_teacher("T2", &["S1"], &[]),
            create_test_teacher("T3", &[], &[]),
        ],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    let unscheduled: Vec<&str> = report
        .teachers_assigned_not_scheduled
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(unscheduled, vec!["T2"]);

    let without_routines: Vec<&str> = report
        .teachers_without_routines
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(without_routines, vec!["T2", "T3"]);
}

#[test]
fn test_teacher_dangling_reference() {
    let snap = snapshot(
        vec![],
        vec![],
        vec![create_test_teacher("T1", &[], &["X"])],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.dangling_references.len(), 1);
    let dangling = &report.dangling_references[0];
    assert_eq!(dangling.kind, EntityKind::Teacher);
    assert_eq!(dangling.entity_id, "T1");
    assert_eq!(dangling.missing_routine_ids, ids(&["X"]));
}

// ==========================================
// 班级检查
// ==========================================

#[test]
fn test_batch_without_routines_uses_forward_state() {
    // B1 的反向引用声称有 R1,但没有有效时段引用 B1
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B2"], &["T1"])],
        vec![
            create_test_batch("B1", &[], &["R1"]),
            create_test_batch("B2", &[], &[]),
        ],
        vec![],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    let ids_found: Vec<&str> = report
        .batches_without_routines
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(ids_found, vec!["B1"]);
}

#[test]
fn test_batch_subject_pairs_not_scheduled() {
    let snap = snapshot(
        vec![
            create_test_slot("R1", Some("S1"), &["B1"], &["T1"]),
            create_test_slot("R2", Some("S2"), &["B2"], &["T1"]),
        ],
        vec![
            create_test_batch("B1", &["S1", "S2", "S3", "S2"], &["R1"]),
            create_test_batch("B2", &["S2"], &["R2"]),
        ],
        vec![],
        vec![],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.batch_subjects_assigned_not_scheduled.len(), 1);
    let gap = &report.batch_subjects_assigned_not_scheduled[0];
    assert_eq!(gap.batch_id, "B1");
    assert_eq!(gap.unscheduled_subjects, ids(&["S2", "S3"]));
}

// ==========================================
// 引用一致性检查
// ==========================================

#[test]
fn test_dangling_references_grouped_per_entity() {
    let snap = snapshot(
        vec![create_test_slot("R1", Some("S1"), &["B1"], &["T1"])],
        vec![create_test_batch("B1", &["S1"], &["R1", "R9", "R9", "R8"])],
        vec![create_test_teacher("T1", &["S1"], &["R1"])],
        vec![create_test_subject("S1", &["B1"], &["T1"], &["R7"])],
    );

    let report = IntegrityAuditor::new().audit(&snap);

    assert_eq!(report.dangling_references.len(), 2);
    assert_eq!(report.dangling_references[0].kind, EntityKind::Batch);
    assert_eq!(report.dangling_references[0].missing_routine_ids, ids(&["R9", "R8"]));
    assert_eq!(report.dangling_references[1].kind, EntityKind::Subject);
    assert_eq!(report.dangling_references[1].missing_routine_ids, ids(&["R7"]));
}

#[test]
fn test_audit_is_idempotent() {
    let snap = snapshot(
        vec![
            create_test_slot("R1", None, &[], &[]),
            create_test_slot("R2", Some("S1"), &["B1"], &[]),
        ],
        vec![create_test_batch("B1", &["S1", "S2"], &["R2", "R404"])],
        vec![create_test_teacher("T1", &["S1"], &["X"])],
        vec![create_test_subject("S2", &["B1"], &[], &[])],
    );

    let auditor = IntegrityAuditor::new();
    let first = serde_json::to_string(&auditor.audit(&snap)).unwrap();
    let second = serde_json::to_string(&auditor.audit(&snap)).unwrap();

    assert_eq!(first, second);
}
