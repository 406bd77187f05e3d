use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{EnrollmentRecord, ProfileAttributes, RawDataset, RawRecord};
use crate::provider::{RawDataProvider, Scope};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn at(date: (i32, u32, u32), hour: u32) -> anyhow::Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .context("invalid date")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let courses = [(1_i64, "Algebra I"), (2, "Historia de Chile")];
    for (id, name) in courses {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.courses (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let tasks = [
        (11_i64, "Guia 1", at((2026, 3, 9), 23)?),
        (12, "Guia 2", at((2026, 3, 16), 23)?),
        (13, "Control 1", at((2026, 3, 23), 23)?),
        (14, "Guia 3", at((2026, 3, 30), 23)?),
    ];
    for (id, title, due_date) in tasks {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.tasks (id, course_id, title, due_date, created_at)
            VALUES ($1, 1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(due_date)
        .bind(at((2026, 3, 2), 9)?)
        .execute(pool)
        .await?;
    }

    // 101 keeps up, 102 falls behind, 103 is enrolled only in a course
    // with no tasks yet.
    let enrollments = [(101_i64, 1_i64), (102, 1), (103, 2)];
    for (student_id, course_id) in enrollments {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.enrollments (student_id, course_id, enrollment_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, course_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(at((2026, 3, 1), 8)?)
        .execute(pool)
        .await?;
    }

    let profiles = [
        (101_i64, [8.0, 7.0, 7.0, 7.0, 7.0, 7.0, 3.0], "Femenino"),
        (102, [4.0, 2.0, 5.0, 3.0, 4.0, 5.0, 8.0], "Masculino"),
        (103, [6.0, 6.0, 2.0, 5.0, 6.0, 7.0, 5.0], "Prefiero no decir"),
    ];
    for (student_id, values, gender) in profiles {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.student_profiles
            (student_id, motivation, available_time, sleep_hours, study_hours,
             enjoyment_studying, study_place_tranquility, academic_pressure, gender)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (student_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(values[0])
        .bind(values[1])
        .bind(values[2])
        .bind(values[3])
        .bind(values[4])
        .bind(values[5])
        .bind(values[6])
        .bind(gender)
        .execute(pool)
        .await?;
    }

    let submissions = [
        (1001_i64, 11_i64, 101_i64, at((2026, 3, 8), 20)?, Some(6.2)),
        (1002, 12, 101, at((2026, 3, 15), 18)?, Some(5.8)),
        (1003, 13, 101, at((2026, 3, 23), 10)?, Some(6.5)),
        (1004, 14, 101, at((2026, 3, 29), 21)?, None),
        (1005, 11, 102, at((2026, 3, 12), 23)?, Some(2.0)),
    ];
    for (id, task_id, student_id, submitted_at, grade) in submissions {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.submissions (id, task_id, student_id, submitted_at, grade)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(task_id)
        .bind(student_id)
        .bind(submitted_at)
        .bind(grade)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Reads raw rows straight from Postgres. The pool is owned by the caller and
/// handed in, never held globally.
pub struct PgProvider {
    pool: PgPool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RawDataProvider for PgProvider {
    async fn fetch(&self, scope: &Scope) -> anyhow::Result<RawDataset> {
        let records = fetch_records(&self.pool, scope).await?;
        let enrollments = fetch_enrollments(&self.pool, scope).await?;
        info!(
            scope = %scope.label(),
            records = records.len(),
            enrollments = enrollments.len(),
            "loaded raw rows from postgres"
        );

        Ok(RawDataset {
            records,
            enrollments,
            warnings: Vec::new(),
        })
    }
}

fn scope_filter(scope: &Scope) -> (&'static str, Vec<i64>) {
    match *scope {
        Scope::All => ("", Vec::new()),
        Scope::Course(course_id) => (" WHERE e.course_id = $1", vec![course_id]),
        Scope::StudentCourse {
            student_id,
            course_id,
        } => (
            " WHERE e.student_id = $1 AND e.course_id = $2",
            vec![student_id, course_id],
        ),
    }
}

async fn fetch_records(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<RawRecord>> {
    let (filter, binds) = scope_filter(scope);
    let mut query = String::from(
        "SELECT t.id AS task_id, t.course_id, t.due_date, t.created_at AS task_created_at, \
         e.student_id, e.enrollment_date, \
         s.id AS submission_id, s.submitted_at, s.grade, \
         sp.motivation, sp.available_time, sp.sleep_hours, sp.study_hours, \
         sp.enjoyment_studying, sp.study_place_tranquility, sp.academic_pressure, sp.gender \
         FROM academic_risk.tasks t \
         JOIN academic_risk.enrollments e ON e.course_id = t.course_id \
         LEFT JOIN academic_risk.submissions s ON s.task_id = t.id AND s.student_id = e.student_id \
         LEFT JOIN academic_risk.student_profiles sp ON sp.student_id = e.student_id",
    );
    query.push_str(filter);
    query.push_str(" ORDER BY e.student_id, t.course_id, t.due_date");

    let mut rows = sqlx::query(&query);
    for value in binds {
        rows = rows.bind(value);
    }

    let mut records = Vec::new();
    for row in rows.fetch_all(pool).await? {
        records.push(RawRecord {
            student_id: row.try_get("student_id")?,
            course_id: row.try_get("course_id")?,
            task_id: row.try_get("task_id")?,
            due_date: Some(row.try_get("due_date")?),
            task_created_at: Some(row.try_get("task_created_at")?),
            enrollment_date: Some(row.try_get("enrollment_date")?),
            submission_id: row.try_get("submission_id")?,
            submitted_at: row.try_get("submitted_at")?,
            grade: row.try_get("grade")?,
            profile: profile_from_row(&row)?,
        });
    }

    Ok(records)
}

async fn fetch_enrollments(
    pool: &PgPool,
    scope: &Scope,
) -> anyhow::Result<Vec<EnrollmentRecord>> {
    let (filter, binds) = scope_filter(scope);
    let mut query = String::from(
        "SELECT e.student_id, e.course_id, e.enrollment_date, \
         sp.motivation, sp.available_time, sp.sleep_hours, sp.study_hours, \
         sp.enjoyment_studying, sp.study_place_tranquility, sp.academic_pressure, sp.gender \
         FROM academic_risk.enrollments e \
         LEFT JOIN academic_risk.student_profiles sp ON sp.student_id = e.student_id",
    );
    query.push_str(filter);
    query.push_str(" ORDER BY e.student_id, e.course_id");

    let mut rows = sqlx::query(&query);
    for value in binds {
        rows = rows.bind(value);
    }

    let mut enrollments = Vec::new();
    for row in rows.fetch_all(pool).await? {
        enrollments.push(EnrollmentRecord {
            student_id: row.try_get("student_id")?,
            course_id: row.try_get("course_id")?,
            enrollment_date: Some(row.try_get("enrollment_date")?),
            profile: profile_from_row(&row)?,
        });
    }

    Ok(enrollments)
}

fn profile_from_row(row: &PgRow) -> Result<ProfileAttributes, sqlx::Error> {
    Ok(ProfileAttributes {
        motivation: row.try_get("motivation")?,
        available_time: row.try_get("available_time")?,
        sleep_hours: row.try_get("sleep_hours")?,
        study_hours: row.try_get("study_hours")?,
        enjoyment_studying: row.try_get("enjoyment_studying")?,
        study_place_tranquility: row.try_get("study_place_tranquility")?,
        academic_pressure: row.try_get("academic_pressure")?,
        gender: row.try_get("gender")?,
    })
}
