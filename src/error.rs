use thiserror::Error;

use crate::models::GroupKey;

/// Structurally invalid input. Missing submissions, grades or profile answers
/// are not errors; they fall back to neutral feature values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("grade {grade} for student {student_id} task {task_id} is outside the 1.0-7.0 scale")]
    GradeOutOfRange {
        student_id: i64,
        task_id: i64,
        grade: f64,
    },

    #[error("{attribute} = {value} for student {student_id} is outside the 1-10 scale")]
    ProfileOutOfRange {
        student_id: i64,
        attribute: &'static str,
        value: f64,
    },

    #[error("student {student_id} task {task_id} has submitted_at without a submission")]
    SubmittedWithoutSubmission { student_id: i64, task_id: i64 },

    #[error("student {student_id} task {task_id} has a grade without a submission")]
    GradeWithoutSubmission { student_id: i64, task_id: i64 },

    #[error(
        "student {} course {} has neither transactional nor profile data to label",
        .0.student_id,
        .0.course_id
    )]
    NoUsableSignal(GroupKey),
}
