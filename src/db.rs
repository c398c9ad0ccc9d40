use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::class_code::generate_class_code;
use crate::roster::roster_for;
use crate::models::{
    parse_taken_at, AttendanceRecord, AttendanceStatus, ClassConfig, ClassRecord, NewClass,
};

const CLASS_COLUMNS: &str = "id, class_code, owner, course_code, course_name, batch, \
     starting_roll, ending_roll, excluded_rolls";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn class_from_row(row: &PgRow) -> ClassRecord {
    ClassRecord {
        id: row.get("id"),
        class_code: row.get("class_code"),
        owner: row.get("owner"),
        course_code: row.get("course_code"),
        course_name: row.get("course_name"),
        batch: row.get("batch"),
        config: ClassConfig {
            starting_roll: row.get("starting_roll"),
            ending_roll: row.get("ending_roll"),
            excluded_rolls: row.get("excluded_rolls"),
        },
    }
}

async fn code_in_use(pool: &PgPool, code: &str) -> anyhow::Result<bool> {
    let row = sqlx::query("SELECT 1 FROM roll_call.classes WHERE class_code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn create_class(
    pool: &PgPool,
    owner: &str,
    class: &NewClass,
) -> anyhow::Result<ClassRecord> {
    class.validate()?;

    let mut code = generate_class_code(&mut rand::thread_rng());
    while code_in_use(pool, &code).await? {
        debug!(code = %code, "class code taken, drawing another");
        code = generate_class_code(&mut rand::thread_rng());
    }

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO roll_call.classes
        (id, class_code, owner, course_code, course_name, batch,
         starting_roll, ending_roll, excluded_rolls)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {CLASS_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(owner)
    .bind(class.course_code.trim())
    .bind(class.course_name.trim())
    .bind(class.batch.trim())
    .bind(class.config.starting_roll.trim())
    .bind(class.config.ending_roll.trim())
    .bind(class.config.excluded_rolls.as_deref())
    .fetch_one(pool)
    .await?;

    let created = class_from_row(&row);
    info!(class_code = %created.class_code, course = %created.course_code, "class created");
    Ok(created)
}

pub async fn list_classes(pool: &PgPool, owner: &str) -> anyhow::Result<Vec<ClassRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {CLASS_COLUMNS} FROM roll_call.classes WHERE owner = $1 ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(class_from_row).collect())
}

/// Looks a class up by its share code. Any owner may read a class by code.
pub async fn find_class_by_code(pool: &PgPool, code: &str) -> anyhow::Result<ClassRecord> {
    let code = code.trim().to_uppercase();
    let row = sqlx::query(&format!(
        "SELECT {CLASS_COLUMNS} FROM roll_call.classes WHERE class_code = $1"
    ))
    .bind(&code)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no class with code {code}"))?;
    Ok(class_from_row(&row))
}

/// Looks up a class the caller owns.
pub async fn owned_class(pool: &PgPool, owner: &str, code: &str) -> anyhow::Result<ClassRecord> {
    let class = find_class_by_code(pool, code).await?;
    anyhow::ensure!(
        class.owner == owner,
        "class {} does not belong to {owner}",
        class.class_code
    );
    Ok(class)
}

/// A class the caller owns, with its roster and every attendance record.
#[derive(Debug, Clone)]
pub struct ClassAttendance {
    pub class: ClassRecord,
    pub roster: Vec<String>,
    pub records: Vec<AttendanceRecord>,
}

pub async fn load_class_attendance(
    pool: &PgPool,
    owner: &str,
    code: &str,
) -> anyhow::Result<ClassAttendance> {
    let class = owned_class(pool, owner, code).await?;
    let records = fetch_attendance(pool, class.id).await?;
    let roster = roster_for(&class.config);
    Ok(ClassAttendance {
        class,
        roster,
        records,
    })
}

pub async fn delete_class(pool: &PgPool, class_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM roll_call.classes WHERE id = $1")
        .bind(class_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_attendance(
    pool: &PgPool,
    class_id: Uuid,
    taken_on: NaiveDate,
    roll_number: &str,
    status: AttendanceStatus,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO roll_call.attendance (id, class_id, taken_on, roll_number, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (class_id, taken_on, roll_number) DO UPDATE
        SET status = EXCLUDED.status, updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(taken_on)
    .bind(roll_number)
    .bind(status.code().to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes every record of a class on one date, returning how many went.
pub async fn clear_date(
    pool: &PgPool,
    class_id: Uuid,
    taken_on: NaiveDate,
) -> anyhow::Result<u64> {
    let result =
        sqlx::query("DELETE FROM roll_call.attendance WHERE class_id = $1 AND taken_on = $2")
            .bind(class_id)
            .bind(taken_on)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_attendance(
    pool: &PgPool,
    class_id: Uuid,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT roll_number, taken_on, status
        FROM roll_call.attendance
        WHERE class_id = $1
        ORDER BY taken_on ASC, roll_number ASC
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        records.push(AttendanceRecord::on_date(
            row.get::<String, _>("roll_number"),
            row.get("taken_on"),
            AttendanceStatus::from_code(&status)?,
        ));
    }
    debug!(%class_id, count = records.len(), "attendance fetched");
    Ok(records)
}

pub async fn import_csv(
    pool: &PgPool,
    class_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        roll_number: String,
        date: String,
        status: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let taken_at = parse_taken_at(&row.date).with_context(|| format!("row {}", line + 1))?;
        let status = AttendanceStatus::from_code(&row.status)
            .with_context(|| format!("row {}", line + 1))?;
        let roll_number = row.roll_number.trim();
        mark_attendance(pool, class_id, taken_at.date_naive(), roll_number, status).await?;
        written += 1;
    }

    Ok(written)
}

pub async fn seed(pool: &PgPool, owner: &str) -> anyhow::Result<ClassRecord> {
    let class = create_class(
        pool,
        owner,
        &NewClass {
            course_code: "CSE 3201".to_string(),
            course_name: "Operating Systems".to_string(),
            batch: "2k21".to_string(),
            config: ClassConfig {
                starting_roll: "2107001".to_string(),
                ending_roll: "2107010".to_string(),
                excluded_rolls: Some("2107004, 2107009".to_string()),
            },
        },
    )
    .await?;

    let marks = [
        ("2025-01-06", ["P", "P", "A", "P", "L", "P", "P", "A"]),
        ("2025-01-08", ["P", "A", "A", "P", "P", "P", "L", "P"]),
        ("2025-01-13", ["P", "P", "A", "L", "P", "P", "P", "P"]),
    ];
    let roster = roster_for(&class.config);

    for (date, statuses) in marks {
        let taken_on = NaiveDate::parse_from_str(date, "%Y-%m-%d").context("invalid seed date")?;
        for (roll, code) in roster.iter().zip(statuses) {
            let status = AttendanceStatus::from_code(code)?;
            mark_attendance(pool, class.id, taken_on, roll, status).await?;
        }
    }

    Ok(class)
}
