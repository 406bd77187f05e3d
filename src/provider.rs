use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{
    DataWarning, EnrollmentRecord, GroupKey, ProfileAttributes, RawDataset, RawRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Course(i64),
    StudentCourse { student_id: i64, course_id: i64 },
}

impl Scope {
    pub fn from_args(course: Option<i64>, student: Option<i64>) -> Self {
        match (course, student) {
            (Some(course_id), Some(student_id)) => Scope::StudentCourse {
                student_id,
                course_id,
            },
            (Some(course_id), None) => Scope::Course(course_id),
            _ => Scope::All,
        }
    }

    pub fn contains(&self, student_id: i64, course_id: i64) -> bool {
        match *self {
            Scope::All => true,
            Scope::Course(id) => id == course_id,
            Scope::StudentCourse {
                student_id: s,
                course_id: c,
            } => s == student_id && c == course_id,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::All => "all courses".to_string(),
            Scope::Course(id) => format!("course {id}"),
            Scope::StudentCourse {
                student_id,
                course_id,
            } => format!("student {student_id} in course {course_id}"),
        }
    }
}

/// Supplies the raw task/submission/profile join. Task rows must come from a
/// left join so unsubmitted tasks are present with empty submission fields.
pub trait RawDataProvider {
    async fn fetch(&self, scope: &Scope) -> anyhow::Result<RawDataset>;
}

/// Serves a fixed dataset; used to run the pipeline against fixtures.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    dataset: RawDataset,
}

#[cfg(test)]
impl InMemoryProvider {
    pub fn new(dataset: RawDataset) -> Self {
        Self { dataset }
    }
}

#[cfg(test)]
impl RawDataProvider for InMemoryProvider {
    async fn fetch(&self, scope: &Scope) -> anyhow::Result<RawDataset> {
        Ok(filter_dataset(&self.dataset, scope))
    }
}

fn filter_dataset(dataset: &RawDataset, scope: &Scope) -> RawDataset {
    RawDataset {
        records: dataset
            .records
            .iter()
            .filter(|r| scope.contains(r.student_id, r.course_id))
            .cloned()
            .collect(),
        enrollments: dataset
            .enrollments
            .iter()
            .filter(|e| scope.contains(e.student_id, e.course_id))
            .cloned()
            .collect(),
        warnings: dataset
            .warnings
            .iter()
            .filter(|w| scope.contains(w.key().student_id, w.key().course_id))
            .cloned()
            .collect(),
    }
}

/// Reads the historical export: one row per enrolled student and task, with
/// the student's questionnaire answers repeated on every row.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RawDataProvider for CsvProvider {
    async fn fetch(&self, scope: &Scope) -> anyhow::Result<RawDataset> {
        let dataset = read_csv(&self.path)?;
        Ok(filter_dataset(&dataset, scope))
    }
}

// Nullable integer columns are frequently exported as floats ("12.0").
#[derive(Debug, Deserialize)]
struct CsvRow {
    task_id: Option<f64>,
    course_id: f64,
    due_date: Option<String>,
    task_created_at: Option<String>,
    student_id: f64,
    enrollment_date: Option<String>,
    submission_id: Option<f64>,
    submitted_at: Option<String>,
    grade: Option<f64>,
    #[serde(default)]
    motivation: Option<f64>,
    #[serde(default)]
    available_time: Option<f64>,
    #[serde(default)]
    sleep_hours: Option<f64>,
    #[serde(default)]
    study_hours: Option<f64>,
    #[serde(default)]
    enjoyment_studying: Option<f64>,
    #[serde(default)]
    study_place_tranquility: Option<f64>,
    #[serde(default)]
    academic_pressure: Option<f64>,
    #[serde(default)]
    gender: Option<String>,
}

pub fn read_csv(path: &Path) -> anyhow::Result<RawDataset> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut dataset = RawDataset::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("{}: bad row at line {line}", path.display()))?;
        let warnings = &mut dataset.warnings;

        let student_id = integral_id(line, "student_id", row.student_id)?;
        let course_id = integral_id(line, "course_id", row.course_id)?;
        let key = GroupKey {
            student_id,
            course_id,
        };
        let enrollment_date =
            timestamp_column(line, key, "enrollment_date", row.enrollment_date, warnings);
        let profile = ProfileAttributes {
            motivation: row.motivation,
            available_time: row.available_time,
            sleep_hours: row.sleep_hours,
            study_hours: row.study_hours,
            enjoyment_studying: row.enjoyment_studying,
            study_place_tranquility: row.study_place_tranquility,
            academic_pressure: row.academic_pressure,
            gender: row.gender,
        };

        let Some(task_id) = row.task_id else {
            dataset.enrollments.push(EnrollmentRecord {
                student_id,
                course_id,
                enrollment_date,
                profile,
            });
            continue;
        };

        dataset.records.push(RawRecord {
            student_id,
            course_id,
            task_id: integral_id(line, "task_id", task_id)?,
            due_date: timestamp_column(line, key, "due_date", row.due_date, warnings),
            task_created_at: timestamp_column(
                line,
                key,
                "task_created_at",
                row.task_created_at,
                warnings,
            ),
            enrollment_date,
            submission_id: row
                .submission_id
                .map(|id| integral_id(line, "submission_id", id))
                .transpose()?,
            submitted_at: timestamp_column(line, key, "submitted_at", row.submitted_at, warnings),
            grade: row.grade,
            profile,
        });
    }

    info!(
        path = %path.display(),
        records = dataset.records.len(),
        enrollments = dataset.enrollments.len(),
        malformed = dataset.warnings.len(),
        "loaded raw rows from csv"
    );

    Ok(dataset)
}

/// Ids arrive as floats; anything but a whole number is a broken export.
fn integral_id(line: usize, column: &'static str, value: f64) -> anyhow::Result<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    if !value.is_finite() || value.fract() != 0.0 || !in_range {
        anyhow::bail!("line {line}: {column} {value} is not a whole-number id");
    }
    Ok(value as i64)
}

fn timestamp_column(
    line: usize,
    key: GroupKey,
    column: &'static str,
    value: Option<String>,
    warnings: &mut Vec<DataWarning>,
) -> Option<NaiveDateTime> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = parse_timestamp(trimmed);
    if parsed.is_none() {
        warn!(line, column, value = trimmed, "unparseable timestamp, treating as missing");
        warnings.push(DataWarning::MalformedTimestamp {
            key,
            line,
            column,
            value: trimmed.to_string(),
        });
    }
    parsed
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.naive_utc());
    }
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
