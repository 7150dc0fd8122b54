// ==========================================
// 课表审计引擎 - 演示数据库生成工具
// ==========================================
// 用法: cargo run --bin seed_demo_timetable -- [db_path]
// 内置缺陷: 班级冲突、教师冲突、孤立时段、不完整时段、时间倒置、
//          悬空反向引用、已分配未排课科目、两条软删除时段（一条超过 30 天保留期）
// 生成后运行: timetable-audit <db_path> all
// ==========================================

use chrono::{DateTime, Duration, Local, Utc};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use timetable_audit::config::{config_keys, get_default_db_path};
use timetable_audit::db::{init_schema, open_sqlite_connection};

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

fn json_ids(ids: &[&str]) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string(ids)?)
}

struct SlotSeed<'a> {
    id: &'a str,
    day: Option<&'a str>,
    start: Option<&'a str>,
    end: Option<&'a str>,
    subject: Option<&'a str>,
    batches: &'a [&'a str],
    teachers: &'a [&'a str],
    deleted_at: Option<DateTime<Utc>>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    seed_demo(&conn)?;
    print_quick_counts(&conn)?;

    eprintln!("Seeded {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_demo(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let tx = conn.unchecked_transaction()?;

    // ===== 配置 =====
    for (key, value) in [
        (config_keys::CLEANUP_RETENTION_DAYS, "30"),
        (config_keys::CONFLICT_SCAN_SHARDS, "2"),
        (config_keys::REPORT_LOCALE, "zh-CN"),
    ] {
        tx.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
            params![key, value],
        )?;
    }

    // ===== 标识符 =====
    let math = new_id("SUB");
    let physics = new_id("SUB");
    let chemistry = new_id("SUB");
    let biology = new_id("SUB");

    let asha = new_id("TCH");
    let ravi = new_id("TCH");
    let meera = new_id("TCH");

    let jee = new_id("BAT");
    let neet = new_id("BAT");
    let foundation = new_id("BAT");

    let slot_ids: Vec<String> = (0..10).map(|_| new_id("RTN")).collect();
    let ghost_slot = new_id("RTN");

    let (math, physics, chemistry, biology) =
        (math.as_str(), physics.as_str(), chemistry.as_str(), biology.as_str());
    let (asha, ravi, meera) = (asha.as_str(), ravi.as_str(), meera.as_str());
    let (jee, neet, foundation) = (jee.as_str(), neet.as_str(), foundation.as_str());
    let ghost_slot = ghost_slot.as_str();
    let s: Vec<&str> = slot_ids.iter().map(String::as_str).collect();

    // ===== 课表时段 =====
    let slots = [
        // 0 与 1 班级冲突（JEE）
        SlotSeed {
            id: s[0],
            day: Some("MONDAY"),
            start: Some("09:00"),
            end: Some("10:00"),
            subject: Some(math),
            batches: &[jee],
            teachers: &[asha],
            deleted_at: None,
        },
        SlotSeed {
            id: s[1],
            day: Some("MONDAY"),
            start: Some("09:30"),
            end: Some("10:30"),
            subject: Some(physics),
            batches: &[jee],
            teachers: &[ravi],
            deleted_at: None,
        },
        // 2 与 0 首尾相接，不冲突
        SlotSeed {
            id: s[2],
            day: Some("MONDAY"),
            start: Some("10:00"),
            end: Some("11:00"),
            subject: Some(math),
            batches: &[neet],
            teachers: &[asha],
            deleted_at: None,
        },
        // 3 与 4 教师冲突（Asha）
        SlotSeed {
            id: s[3],
            day: Some("TUESDAY"),
            start: Some("09:00"),
            end: Some("10:00"),
            subject: Some(math),
            batches: &[neet],
            teachers: &[asha],
            deleted_at: None,
        },
        SlotSeed {
            id: s[4],
            day: Some("TUESDAY"),
            start: Some("09:30"),
            end: Some("10:00"),
            subject: Some(math),
            batches: &[jee],
            teachers: &[asha],
            deleted_at: None,
        },
        // 5 孤立时段
        SlotSeed {
            id: s[5],
            day: Some("WEDNESDAY"),
            start: None,
            end: None,
            subject: None,
            batches: &[],
            teachers: &[],
            deleted_at: None,
        },
        // 6 不完整（无教师）
        SlotSeed {
            id: s[6],
            day: Some("THURSDAY"),
            start: Some("14:00"),
            end: Some("15:00"),
            subject: Some(physics),
            batches: &[jee],
            teachers: &[],
            deleted_at: None,
        },
        // 7 时间倒置
        SlotSeed {
            id: s[7],
            day: Some("FRIDAY"),
            start: Some("12:00"),
            end: Some("11:00"),
            subject: Some(physics),
            batches: &[neet],
            teachers: &[ravi],
            deleted_at: None,
        },
        // 8 超过保留期的软删除
        SlotSeed {
            id: s[8],
            day: Some("SATURDAY"),
            start: Some("09:00"),
            end: Some("10:00"),
            subject: Some(chemistry),
            batches: &[neet],
            teachers: &[meera],
            deleted_at: Some(now - Duration::days(45)),
        },
        // 9 保留期内的软删除
        SlotSeed {
            id: s[9],
            day: Some("SATURDAY"),
            start: Some("10:00"),
            end: Some("11:00"),
            subject: Some(chemistry),
            batches: &[neet],
            teachers: &[meera],
            deleted_at: Some(now - Duration::days(5)),
        },
    ];

    for (seq, slot) in slots.iter().enumerate() {
        let created_at = (now - Duration::days(60)).to_rfc3339();
        let updated_at = (now - Duration::days(60 - seq as i64)).to_rfc3339();
        tx.execute(
            r#"
            INSERT INTO routine_slot (
                id, seq, day, start_time, end_time,
                subject_id, batches_json, teachers_json,
                is_active, deleted_at, deleted_by, delete_reason,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                slot.id,
                seq as i64,
                slot.day,
                slot.start,
                slot.end,
                slot.subject,
                json_ids(slot.batches)?,
                json_ids(slot.teachers)?,
                slot.deleted_at.is_none() as i64,
                slot.deleted_at.map(|t| t.to_rfc3339()),
                slot.deleted_at.map(|_| "admin".to_string()),
                slot.deleted_at.map(|_| "timetable revision".to_string()),
                created_at,
                updated_at,
            ],
        )?;
    }

    // ===== 科目 =====
    // 化学分配给 NEET 但没有有效时段；生物没有教师也没有时段
    let subjects: [(&str, &str, Vec<&str>, Vec<&str>, Vec<&str>); 4] = [
        (
            math,
            "Mathematics",
            vec![jee, neet],
            vec![asha],
            vec![s[0], s[2], s[3], s[4]],
        ),
        (
            physics,
            "Physics",
            vec![jee, neet],
            vec![ravi],
            vec![s[1], s[6], s[7]],
        ),
        (
            chemistry,
            "Chemistry",
            vec![neet],
            vec![meera],
            vec![s[8], s[9]],
        ),
        (biology, "Biology", vec![foundation], vec![], vec![]),
    ];
    for (seq, (id, name, batches, teachers, routines)) in subjects.iter().enumerate() {
        tx.execute(
            "INSERT INTO subject (id, seq, name, is_active, batches_json, teachers_json, routines_json)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
            params![
                id,
                seq as i64,
                name,
                json_ids(batches)?,
                json_ids(teachers)?,
                json_ids(routines)?
            ],
        )?;
    }

    // ===== 教师 =====
    // Ravi 的反向引用里有一个不存在的时段
    let teachers: [(&str, &str, Vec<&str>, Vec<&str>, Vec<&str>); 3] = [
        (
            asha,
            "Asha Verma",
            vec![math],
            vec![jee, neet],
            vec![s[0], s[2], s[3], s[4]],
        ),
        (
            ravi,
            "Ravi Kumar",
            vec![physics],
            vec![jee, neet],
            vec![s[1], s[7], ghost_slot],
        ),
        (
            meera,
            "Meera Iyer",
            vec![chemistry],
            vec![neet],
            vec![s[8], s[9]],
        ),
    ];
    for (seq, (id, name, subjects, batches, routines)) in teachers.iter().enumerate() {
        tx.execute(
            "INSERT INTO teacher (id, seq, name, is_active, subjects_json, batches_json, routines_json)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
            params![
                id,
                seq as i64,
                name,
                json_ids(subjects)?,
                json_ids(batches)?,
                json_ids(routines)?
            ],
        )?;
    }

    // ===== 班级 =====
    let batches: [(&str, &str, Vec<&str>, Vec<&str>); 3] = [
        (jee, "JEE 2026 - A", vec![math, physics], vec![asha, ravi]),
        (
            neet,
            "NEET 2026 - A",
            vec![math, physics, chemistry],
            vec![asha, ravi, meera],
        ),
        (foundation, "Foundation 2027", vec![biology], vec![]),
    ];
    for (seq, (id, name, subjects, teachers)) in batches.iter().enumerate() {
        tx.execute(
            "INSERT INTO batch (id, seq, name, is_active, subjects_json, teachers_json, routines_json)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, '[]')",
            params![id, seq as i64, name, json_ids(subjects)?, json_ids(teachers)?],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let tables = ["routine_slot", "batch", "teacher", "subject", "config_kv"];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let c: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<16} {}", t, c);
    }
    Ok(())
}
