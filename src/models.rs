use chrono::NaiveDateTime;
use serde::Serialize;

/// Ordered names of the classifier inputs. Profile features come first so a
/// cold-start vector only differs from a full one in its tail.
pub const FEATURE_NAMES: [&str; 12] = [
    "motivation",
    "available_time",
    "sleep_hours",
    "study_hours",
    "enjoyment_studying",
    "study_place_tranquility",
    "academic_pressure",
    "gender_encoded",
    "submission_delay_rate",
    "non_submission_rate",
    "average_grade",
    "grade_variability",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub student_id: i64,
    pub course_id: i64,
}

/// Self-reported questionnaire answers, each on a 1-10 scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileAttributes {
    pub motivation: Option<f64>,
    pub available_time: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub study_hours: Option<f64>,
    pub enjoyment_studying: Option<f64>,
    pub study_place_tranquility: Option<f64>,
    pub academic_pressure: Option<f64>,
    pub gender: Option<String>,
}

impl ProfileAttributes {
    pub fn numeric(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("motivation", self.motivation),
            ("available_time", self.available_time),
            ("sleep_hours", self.sleep_hours),
            ("study_hours", self.study_hours),
            ("enjoyment_studying", self.enjoyment_studying),
            ("study_place_tranquility", self.study_place_tranquility),
            ("academic_pressure", self.academic_pressure),
        ]
    }
}

/// One row per student x course x task. Submission fields are empty when the
/// task was never handed in.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub task_id: i64,
    /// `None` only when the stored value could not be parsed.
    pub due_date: Option<NaiveDateTime>,
    pub task_created_at: Option<NaiveDateTime>,
    pub enrollment_date: Option<NaiveDateTime>,
    pub submission_id: Option<i64>,
    pub submitted_at: Option<NaiveDateTime>,
    pub grade: Option<f64>,
    pub profile: ProfileAttributes,
}

impl RawRecord {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            student_id: self.student_id,
            course_id: self.course_id,
        }
    }
}

/// A student enrolled in a course, independent of whether the course has
/// any tasks yet.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub enrollment_date: Option<NaiveDateTime>,
    pub profile: ProfileAttributes,
}

impl EnrollmentRecord {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            student_id: self.student_id,
            course_id: self.course_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub records: Vec<RawRecord>,
    pub enrollments: Vec<EnrollmentRecord>,
    pub warnings: Vec<DataWarning>,
}

impl RawDataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.enrollments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub motivation: f64,
    pub available_time: f64,
    pub sleep_hours: f64,
    pub study_hours: f64,
    pub enjoyment_studying: f64,
    pub study_place_tranquility: f64,
    pub academic_pressure: f64,
    pub gender_encoded: f64,
    pub submission_delay_rate: f64,
    pub non_submission_rate: f64,
    pub average_grade: f64,
    pub grade_variability: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order.
    pub fn as_array(&self) -> [f64; 12] {
        [
            self.motivation,
            self.available_time,
            self.sleep_hours,
            self.study_hours,
            self.enjoyment_studying,
            self.study_place_tranquility,
            self.academic_pressure,
            self.gender_encoded,
            self.submission_delay_rate,
            self.non_submission_rate,
            self.average_grade,
            self.grade_variability,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLabel {
    Low = 0,
    High = 1,
}

impl RiskLabel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataWarning {
    MalformedTimestamp {
        key: GroupKey,
        line: usize,
        column: &'static str,
        value: String,
    },
    InconsistentProfile {
        key: GroupKey,
        attribute: &'static str,
        values: Vec<String>,
    },
    Unlabelable {
        key: GroupKey,
    },
}

impl DataWarning {
    pub fn key(&self) -> GroupKey {
        match self {
            DataWarning::MalformedTimestamp { key, .. }
            | DataWarning::InconsistentProfile { key, .. }
            | DataWarning::Unlabelable { key } => *key,
        }
    }
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::MalformedTimestamp {
                key,
                line,
                column,
                value,
            } => write!(
                f,
                "line {line} (student {} course {}): unparseable {column} {value:?}",
                key.student_id, key.course_id
            ),
            DataWarning::InconsistentProfile {
                key,
                attribute,
                values,
            } => write!(
                f,
                "student {} course {}: conflicting {attribute} values [{}]",
                key.student_id,
                key.course_id,
                values.join(", ")
            ),
            DataWarning::Unlabelable { key } => write!(
                f,
                "student {} course {}: no transactional or profile signal to label",
                key.student_id, key.course_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupFeatures {
    pub key: GroupKey,
    pub features: FeatureVector,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub groups: Vec<GroupFeatures>,
    pub warnings: Vec<DataWarning>,
}
