// ==========================================
// AuditApi 端到端测试
// ==========================================
// 测试目标: SQLite 数据 → 快照 → 冲突/完整性/就绪/清理 全链路
// ==========================================


use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use test_helpers::{
    create_test_db, insert_batch, insert_subject, insert_teacher, open_test_connection,
    SlotRowBuilder,
};
use timetable_audit::api::{ApiError, AuditApi};
use timetable_audit::config::AuditConfig;
use timetable_audit::engine::ConflictType;
use timetable_audit::repository::SqliteEntityStore;
use timetable_audit::EntityKind;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn create_api(db_path: &str) -> AuditApi {
    let store = SqliteEntityStore::new(db_path).expect("Failed to create store");
    AuditApi::with_default_config(Arc::new(store))
}

#[tokio::test]
async fn test_empty_database_is_ready() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let report = create_api(&db_path).run_full_audit(now()).await.unwrap();

    assert!(report.readiness.is_ready);
    assert!(report.readiness.blocking_issues.is_empty());
    assert!(report.conflicts.is_clean());
    assert!(report.integrity.is_clean());
    assert_eq!(report.cleanup.total(), 0);
}

#[tokio::test]
async fn test_shared_batch_overlap_blocks_readiness() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    SlotRowBuilder::scheduled("R1", "MONDAY", "09:00", "10:00")
        .subject("S1")
        .batches(&["B1"])
        .teachers(&["T1"])
        .insert(&conn, 0)
        .unwrap();
    SlotRowBuilder::scheduled("R2", "MONDAY", "09:30", "10:30")
        .subject("S2")
        .batches(&["B1"])
        .teachers(&["T2"])
        .insert(&conn, 1)
        .unwrap();
    // 首尾相接，不冲突
    SlotRowBuilder::scheduled("R3", "MONDAY", "10:30", "11:30")
        .subject("S1")
        .batches(&["B1"])
        .teachers(&["T2"])
        .insert(&conn, 2)
        .unwrap();

    let report = create_api(&db_path).run_full_audit(now()).await.unwrap();

    assert_eq!(report.conflicts.batch_conflicts.len(), 1);
    assert!(report.conflicts.teacher_conflicts.is_empty());
    let conflict = &report.conflicts.batch_conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::BatchConflict);
    assert_eq!(conflict.slot_ids, ["R1".to_string(), "R2".to_string()]);
    assert_eq!(conflict.shared_ids, vec!["B1".to_string()]);

    assert!(!report.readiness.is_ready);
    assert_eq!(report.readiness.blocking_tags(), vec!["BATCH_CONFLICTS"]);
}

#[tokio::test]
async fn test_orphan_and_dangling_reference() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    SlotRowBuilder::new("R1").insert(&conn, 0).unwrap();
    insert_teacher(&conn, 0, "T1", &[], r#"["X"]"#).unwrap();

    let report = create_api(&db_path).run_full_audit(now()).await.unwrap();

    let orphan_ids: Vec<&str> = report.integrity.orphan_slots.iter().map(|f| f.id.as_str()).collect();
    let incomplete_ids: Vec<&str> = report
        .integrity
        .incomplete_slots
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(orphan_ids, vec!["R1"]);
    assert_eq!(incomplete_ids, vec!["R1"]);

    assert_eq!(report.integrity.dangling_references.len(), 1);
    let dangling = &report.integrity.dangling_references[0];
    assert_eq!(dangling.kind, EntityKind::Teacher);
    assert_eq!(dangling.entity_id, "T1");
    assert_eq!(dangling.missing_routine_ids, vec!["X".to_string()]);

    assert_eq!(
        report.readiness.blocking_tags(),
        vec!["ORPHAN_ROUTINES", "INCOMPLETE_ROUTINES"]
    );
    assert_eq!(report.cleanup.orphan_routines.len(), 1);
}

#[tokio::test]
async fn test_unscheduled_subject_blocks_readiness() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    SlotRowBuilder::scheduled("R1", "TUESDAY", "09:00", "10:00")
        .subject("S1")
        .batches(&["B1"])
        .teachers(&["T1"])
        .insert(&conn, 0)
        .unwrap();
    insert_subject(&conn, 0, "S1", &["B1"], &["T1"], r#"["R1"]"#, true).unwrap();
    insert_subject(&conn, 1, "S2", &["B2"], &["T1"], "[]", true).unwrap();
    // 停用的科目不参与实体级检查
    insert_subject(&conn, 2, "S3", &["B2"], &[], "[]", false).unwrap();
    insert_batch(&conn, 0, "B2", &["S2"], &[], "[]").unwrap();

    let report = create_api(&db_path).run_full_audit(now()).await.unwrap();

    let unscheduled: Vec<&str> = report
        .integrity
        .subjects_assigned_not_scheduled
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(unscheduled, vec!["S2"]);
    assert!(!report.readiness.is_ready);
    assert_eq!(report.readiness.blocking_tags(), vec!["UNSCHEDULED_SUBJECTS"]);
    assert_eq!(report.readiness.metrics.batches_without_routines, 1);

    let gaps = &report.integrity.batch_subjects_assigned_not_scheduled;
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].batch_id, "B2");
    assert_eq!(gaps[0].unscheduled_subjects, vec!["S2".to_string()]);
}

#[tokio::test]
async fn test_adding_conflict_never_makes_ready() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    SlotRowBuilder::scheduled("R1", "WEDNESDAY", "09:00", "10:00")
        .subject("S1")
        .batches(&["B1"])
        .teachers(&["T1"])
        .insert(&conn, 0)
        .unwrap();
    SlotRowBuilder::new("R2").insert(&conn, 1).unwrap();

    let api = create_api(&db_path);
    let before = api.build_readiness_report().unwrap();
    assert!(!before.is_ready);

    SlotRowBuilder::scheduled("R3", "WEDNESDAY", "09:15", "09:45")
        .subject("S2")
        .batches(&["B2"])
        .teachers(&["T1"])
        .insert(&conn, 2)
        .unwrap();

    let after = api.build_readiness_report().unwrap();
    assert!(!after.is_ready);
    assert_eq!(after.metrics.teacher_conflicts, 1);
    assert!(after.blocking_issues.len() > before.blocking_issues.len());
}

#[tokio::test]
async fn test_full_audit_is_idempotent() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    for (seq, (id, start, end)) in [("R1", "09:00", "10:00"), ("R2", "09:30", "11:00"), ("R3", "10:30", "12:00")]
        .iter()
        .enumerate()
    {
        SlotRowBuilder::scheduled(id, "FRIDAY", start, end)
            .subject("S1")
            .batches(&["B1", "B2"])
            .teachers(&["T1"])
            .insert(&conn, seq as i64)
            .unwrap();
    }

    let api = create_api(&db_path);
    let first = api.run_full_audit(now()).await.unwrap();
    let second = api.run_full_audit(now()).await.unwrap();

    assert_eq!(first.conflicts.batch_conflicts.len(), 2);
    assert_eq!(first.conflicts.teacher_conflicts.len(), 2);
    assert_eq!(
        serde_json::to_string(&first.conflicts).unwrap(),
        serde_json::to_string(&second.conflicts).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.integrity).unwrap(),
        serde_json::to_string(&second.integrity).unwrap()
    );
    assert_eq!(first.cleanup, second.cleanup);
}

#[test]
fn test_cleanup_retention_window() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    SlotRowBuilder::scheduled("OLD", "MONDAY", "09:00", "10:00")
        .soft_deleted(now() - Duration::days(31))
        .insert(&conn, 0)
        .unwrap();
    SlotRowBuilder::scheduled("RECENT", "MONDAY", "09:00", "10:00")
        .soft_deleted(now() - Duration::days(29))
        .insert(&conn, 1)
        .unwrap();

    let preview = create_api(&db_path).preview_cleanup(now()).unwrap();

    let ids: Vec<&str> = preview
        .old_soft_deleted_routines
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["OLD"]);
    assert!(preview.orphan_routines.is_empty());
}

#[tokio::test]
async fn test_sharded_full_audit_matches_sequential() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    let days = ["MONDAY", "TUESDAY"];
    for i in 0..24i64 {
        let start = format!("{:02}:00", 8 + (i % 6));
        let end = format!("{:02}:30", 9 + (i % 6));
        let batch = format!("B{}", i % 4);
        let teacher = format!("T{}", i % 5);
        SlotRowBuilder::scheduled(&format!("R{:02}", i), days[(i % 2) as usize], &start, &end)
            .subject("S1")
            .batches(&[batch.as_str()])
            .teachers(&[teacher.as_str()])
            .insert(&conn, i)
            .unwrap();
    }

    let sequential = create_api(&db_path).run_full_audit(now()).await.unwrap();
    let store = SqliteEntityStore::new(&db_path).unwrap();
    let sharded = AuditApi::new(
        Arc::new(store),
        AuditConfig {
            conflict_scan_shards: 5,
            ..AuditConfig::default()
        },
    )
    .run_full_audit(now())
    .await
    .unwrap();

    assert!(!sequential.conflicts.is_clean());
    assert_eq!(sequential.conflicts, sharded.conflicts);
}

#[tokio::test]
async fn test_zero_shards_rejected() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let store = SqliteEntityStore::new(&db_path).unwrap();
    let api = AuditApi::new(
        Arc::new(store),
        AuditConfig {
            conflict_scan_shards: 0,
            ..AuditConfig::default()
        },
    );

    let result = api.run_full_audit(now()).await;

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}
