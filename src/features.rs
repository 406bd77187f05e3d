//! Per (student, course) feature calculation.
//!
//! Every feature lands in [0, 1]. Anything that cannot be computed from the
//! available rows takes [`NEUTRAL_FALLBACK`], so a brand-new student with only
//! a questionnaire still gets a complete vector.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::models::{
    DataWarning, FeatureSet, FeatureVector, GroupFeatures, GroupKey, ProfileAttributes,
    RawDataset, RawRecord,
};

/// The single fallback used for every feature that has no data behind it.
pub const NEUTRAL_FALLBACK: f64 = 0.5;
pub const DELAY_RATE_FALLBACK: f64 = NEUTRAL_FALLBACK;
pub const NON_SUBMISSION_FALLBACK: f64 = NEUTRAL_FALLBACK;
pub const AVERAGE_GRADE_FALLBACK: f64 = NEUTRAL_FALLBACK;
pub const GRADE_VARIABILITY_FALLBACK: f64 = NEUTRAL_FALLBACK;
pub const PROFILE_FALLBACK: f64 = NEUTRAL_FALLBACK;
pub const GENDER_UNKNOWN: f64 = NEUTRAL_FALLBACK;

pub const GRADE_MIN: f64 = 1.0;
pub const GRADE_MAX: f64 = 7.0;
pub const PROFILE_MIN: f64 = 1.0;
pub const PROFILE_MAX: f64 = 10.0;
const GRADE_STD_SCALE: f64 = 3.0;

// Feminine markers are checked first: "female" contains "male".
const FEMININE_MARKERS: [&str; 3] = ["femenino", "mujer", "female"];
const MASCULINE_MARKERS: [&str; 3] = ["masculino", "hombre", "male"];

/// Raw rows belonging to one (student, course) pair.
#[derive(Debug, Default)]
pub struct RecordGroup<'a> {
    pub records: Vec<&'a RawRecord>,
    pub profiles: Vec<&'a ProfileAttributes>,
}

impl RecordGroup<'_> {
    pub fn total_tasks(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.task_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn submitted_tasks(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.submission_id.is_some())
            .map(|record| record.task_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn grades(&self) -> Vec<f64> {
        self.records.iter().filter_map(|record| record.grade).collect()
    }

    /// `None` when the group has no tasks at all.
    pub fn non_submission_rate(&self) -> Option<f64> {
        let total = self.total_tasks();
        if total == 0 {
            return None;
        }
        let rate = 1.0 - self.submitted_tasks() as f64 / total as f64;
        Some(rate.clamp(0.0, 1.0))
    }
}

pub fn group_dataset(dataset: &RawDataset) -> BTreeMap<GroupKey, RecordGroup<'_>> {
    let mut groups: BTreeMap<GroupKey, RecordGroup<'_>> = BTreeMap::new();

    for enrollment in &dataset.enrollments {
        groups
            .entry(enrollment.key())
            .or_default()
            .profiles
            .push(&enrollment.profile);
    }

    for record in &dataset.records {
        let group = groups.entry(record.key()).or_default();
        group.records.push(record);
        group.profiles.push(&record.profile);
    }

    groups
}

/// Rejects rows that no fallback can make sense of.
pub fn validate_group(key: GroupKey, group: &RecordGroup<'_>) -> Result<(), PipelineError> {
    for record in &group.records {
        if record.submitted_at.is_some() && record.submission_id.is_none() {
            return Err(PipelineError::SubmittedWithoutSubmission {
                student_id: record.student_id,
                task_id: record.task_id,
            });
        }
        if record.grade.is_some() && record.submission_id.is_none() {
            return Err(PipelineError::GradeWithoutSubmission {
                student_id: record.student_id,
                task_id: record.task_id,
            });
        }
        if let Some(grade) = record.grade {
            if !grade.is_finite() || !(GRADE_MIN..=GRADE_MAX).contains(&grade) {
                return Err(PipelineError::GradeOutOfRange {
                    student_id: record.student_id,
                    task_id: record.task_id,
                    grade,
                });
            }
        }
    }

    for profile in &group.profiles {
        for (attribute, value) in profile.numeric() {
            if let Some(value) = value {
                if !value.is_finite() || !(PROFILE_MIN..=PROFILE_MAX).contains(&value) {
                    return Err(PipelineError::ProfileOutOfRange {
                        student_id: key.student_id,
                        attribute,
                        value,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Collapses the per-row copies of the student's profile into one. Rows of a
/// single group must agree; disagreement is reported, and the first value
/// seen wins.
pub fn resolve_profile(
    key: GroupKey,
    group: &RecordGroup<'_>,
    warnings: &mut Vec<DataWarning>,
) -> ProfileAttributes {
    let profiles = &group.profiles;
    ProfileAttributes {
        motivation: consistent_value(key, "motivation", profiles, |p| p.motivation, warnings),
        available_time: consistent_value(
            key,
            "available_time",
            profiles,
            |p| p.available_time,
            warnings,
        ),
        sleep_hours: consistent_value(key, "sleep_hours", profiles, |p| p.sleep_hours, warnings),
        study_hours: consistent_value(key, "study_hours", profiles, |p| p.study_hours, warnings),
        enjoyment_studying: consistent_value(
            key,
            "enjoyment_studying",
            profiles,
            |p| p.enjoyment_studying,
            warnings,
        ),
        study_place_tranquility: consistent_value(
            key,
            "study_place_tranquility",
            profiles,
            |p| p.study_place_tranquility,
            warnings,
        ),
        academic_pressure: consistent_value(
            key,
            "academic_pressure",
            profiles,
            |p| p.academic_pressure,
            warnings,
        ),
        gender: consistent_value(
            key,
            "gender",
            profiles,
            |p| {
                p.gender
                    .as_deref()
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
            },
            warnings,
        ),
    }
}

fn consistent_value<T, F>(
    key: GroupKey,
    attribute: &'static str,
    profiles: &[&ProfileAttributes],
    extract: F,
    warnings: &mut Vec<DataWarning>,
) -> Option<T>
where
    T: PartialEq + std::fmt::Display,
    F: Fn(&ProfileAttributes) -> Option<T>,
{
    let mut distinct: Vec<T> = Vec::new();
    for profile in profiles {
        if let Some(value) = extract(*profile) {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
    }

    if distinct.len() > 1 {
        let values: Vec<String> = distinct.iter().map(ToString::to_string).collect();
        warn!(
            student_id = key.student_id,
            course_id = key.course_id,
            attribute,
            ?values,
            "profile attribute differs across rows of one group"
        );
        warnings.push(DataWarning::InconsistentProfile {
            key,
            attribute,
            values,
        });
    }

    distinct.into_iter().next()
}

pub fn compute_features(dataset: &RawDataset) -> Result<FeatureSet, PipelineError> {
    let mut warnings = dataset.warnings.clone();
    let mut groups = Vec::new();

    for (key, group) in group_dataset(dataset) {
        validate_group(key, &group)?;
        let profile = resolve_profile(key, &group, &mut warnings);
        groups.push(compute_group(key, &group, &profile));
    }

    info!(
        groups = groups.len(),
        rows = dataset.records.len(),
        "computed feature vectors"
    );

    Ok(FeatureSet { groups, warnings })
}

pub fn compute_group(
    key: GroupKey,
    group: &RecordGroup<'_>,
    profile: &ProfileAttributes,
) -> GroupFeatures {
    let total_tasks = group.total_tasks();
    if total_tasks == 0 {
        debug!(
            student_id = key.student_id,
            course_id = key.course_id,
            "no tasks for group, transactional features use fallback"
        );
    }

    let grades = group.grades();
    let features = FeatureVector {
        motivation: rescale_profile(profile.motivation),
        available_time: rescale_profile(profile.available_time),
        sleep_hours: rescale_profile(profile.sleep_hours),
        study_hours: rescale_profile(profile.study_hours),
        enjoyment_studying: rescale_profile(profile.enjoyment_studying),
        study_place_tranquility: rescale_profile(profile.study_place_tranquility),
        academic_pressure: rescale_profile(profile.academic_pressure),
        gender_encoded: encode_gender(profile.gender.as_deref()),
        submission_delay_rate: submission_delay_rate(group),
        non_submission_rate: group
            .non_submission_rate()
            .unwrap_or(NON_SUBMISSION_FALLBACK),
        average_grade: average_grade(&grades),
        grade_variability: grade_variability(&grades),
    };

    GroupFeatures {
        key,
        features,
        total_tasks,
    }
}

/// Share of judged submissions handed in after the due date. A row is judged
/// only when both timestamps are present.
pub fn submission_delay_rate(group: &RecordGroup<'_>) -> f64 {
    let judged: Vec<bool> = group
        .records
        .iter()
        .filter_map(|record| match (record.submitted_at, record.due_date) {
            (Some(submitted_at), Some(due_date)) => {
                Some(submitted_at - due_date > Duration::zero())
            }
            _ => None,
        })
        .collect();

    if judged.is_empty() {
        return DELAY_RATE_FALLBACK;
    }

    let late = judged.iter().filter(|late| **late).count();
    late as f64 / judged.len() as f64
}

pub fn average_grade(grades: &[f64]) -> f64 {
    match mean(grades) {
        Some(mean) => ((mean - GRADE_MIN) / (GRADE_MAX - GRADE_MIN)).clamp(0.0, 1.0),
        None => AVERAGE_GRADE_FALLBACK,
    }
}

pub fn grade_variability(grades: &[f64]) -> f64 {
    match sample_std(grades) {
        Some(std) => (std / GRADE_STD_SCALE).min(1.0),
        None => GRADE_VARIABILITY_FALLBACK,
    }
}

pub fn rescale_profile(value: Option<f64>) -> f64 {
    value
        .map(|v| ((v - PROFILE_MIN) / (PROFILE_MAX - PROFILE_MIN)).clamp(0.0, 1.0))
        .unwrap_or(PROFILE_FALLBACK)
}

pub fn encode_gender(gender: Option<&str>) -> f64 {
    let Some(gender) = gender.map(str::to_lowercase) else {
        return GENDER_UNKNOWN;
    };

    if FEMININE_MARKERS.iter().any(|marker| gender.contains(marker)) {
        1.0
    } else if MASCULINE_MARKERS.iter().any(|marker| gender.contains(marker)) {
        0.0
    } else {
        GENDER_UNKNOWN
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1); needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::EnrollmentRecord;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    pub(crate) fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    pub(crate) fn task_row(
        student_id: i64,
        course_id: i64,
        task_id: i64,
        submitted_at: Option<NaiveDateTime>,
        grade: Option<f64>,
    ) -> RawRecord {
        RawRecord {
            student_id,
            course_id,
            task_id,
            due_date: Some(ts(10, 23)),
            task_created_at: Some(ts(1, 9)),
            enrollment_date: Some(ts(1, 8)),
            submission_id: submitted_at.map(|_| student_id * 1000 + task_id),
            submitted_at,
            grade,
            profile: ProfileAttributes::default(),
        }
    }

    pub(crate) fn full_profile() -> ProfileAttributes {
        ProfileAttributes {
            motivation: Some(8.0),
            available_time: Some(7.0),
            sleep_hours: Some(7.0),
            study_hours: Some(7.0),
            enjoyment_studying: Some(7.0),
            study_place_tranquility: Some(7.0),
            academic_pressure: Some(3.0),
            gender: Some("Femenino".to_string()),
        }
    }

    fn single_group(dataset: &RawDataset) -> GroupFeatures {
        let set = compute_features(dataset).unwrap();
        assert_eq!(set.groups.len(), 1);
        set.groups[0].clone()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn on_time_graded_group_scores_clean() {
        let records = (1..=4)
            .map(|task| task_row(1, 10, task, Some(ts(9, 12)), Some(6.0)))
            .collect();
        let dataset = RawDataset {
            records,
            ..Default::default()
        };

        let group = single_group(&dataset);
        assert_eq!(group.features.non_submission_rate, 0.0);
        assert_eq!(group.features.submission_delay_rate, 0.0);
        assert!(close(group.features.average_grade, 0.8333));
        assert_eq!(group.features.grade_variability, 0.0);
        assert_eq!(group.total_tasks, 4);
    }

    #[test]
    fn single_late_submission_out_of_four() {
        let mut records = vec![task_row(2, 10, 1, Some(ts(13, 23)), Some(2.0))];
        records.extend((2..=4).map(|task| task_row(2, 10, task, None, None)));
        let dataset = RawDataset {
            records,
            ..Default::default()
        };

        let group = single_group(&dataset);
        assert_eq!(group.features.non_submission_rate, 0.75);
        assert_eq!(group.features.submission_delay_rate, 1.0);
        assert!(close(group.features.average_grade, 0.1667));
        assert_eq!(group.features.grade_variability, GRADE_VARIABILITY_FALLBACK);
    }

    #[test]
    fn enrollment_without_tasks_uses_fallbacks() {
        let dataset = RawDataset {
            enrollments: vec![EnrollmentRecord {
                student_id: 3,
                course_id: 11,
                enrollment_date: Some(ts(1, 8)),
                profile: ProfileAttributes::default(),
            }],
            ..Default::default()
        };

        let group = single_group(&dataset);
        assert_eq!(group.total_tasks, 0);
        assert_eq!(group.features.submission_delay_rate, DELAY_RATE_FALLBACK);
        assert_eq!(group.features.non_submission_rate, NON_SUBMISSION_FALLBACK);
        assert_eq!(group.features.average_grade, AVERAGE_GRADE_FALLBACK);
        assert_eq!(group.features.grade_variability, GRADE_VARIABILITY_FALLBACK);
        assert!(group.features.as_array().iter().all(|v| *v == NEUTRAL_FALLBACK));
    }

    #[test]
    fn cold_start_profile_is_rescaled() {
        let dataset = RawDataset {
            enrollments: vec![EnrollmentRecord {
                student_id: 4,
                course_id: 11,
                enrollment_date: None,
                profile: full_profile(),
            }],
            ..Default::default()
        };

        let features = single_group(&dataset).features;
        assert!(close(features.motivation, 0.7778));
        assert!(close(features.available_time, 0.6667));
        assert!(close(features.academic_pressure, 0.2222));
        assert_eq!(features.gender_encoded, 1.0);
        assert_eq!(features.average_grade, AVERAGE_GRADE_FALLBACK);
    }

    #[test]
    fn all_tasks_missed_is_full_non_submission() {
        let records = (1..=3).map(|task| task_row(5, 10, task, None, None)).collect();
        let dataset = RawDataset {
            records,
            ..Default::default()
        };

        let features = single_group(&dataset).features;
        assert_eq!(features.non_submission_rate, 1.0);
        assert_eq!(features.submission_delay_rate, DELAY_RATE_FALLBACK);
    }

    #[test]
    fn unparsed_due_date_is_not_judged() {
        let mut late = task_row(6, 10, 1, Some(ts(12, 9)), Some(5.0));
        late.due_date = None;
        let on_time = task_row(6, 10, 2, Some(ts(9, 9)), Some(5.0));
        let dataset = RawDataset {
            records: vec![late, on_time],
            ..Default::default()
        };

        let features = single_group(&dataset).features;
        assert_eq!(features.submission_delay_rate, 0.0);
        assert_eq!(features.non_submission_rate, 0.0);
    }

    #[test]
    fn grade_variability_uses_sample_std() {
        // grades 3 and 7: sample std = 2.828..., scaled by 1/3
        let grades = [3.0, 7.0];
        assert!(close(grade_variability(&grades), 8.0_f64.sqrt() / 3.0));
        // spread wide enough to exceed the scale is clamped
        assert_eq!(grade_variability(&[1.0, 7.0, 1.0, 7.0]), 1.0);
    }

    #[test]
    fn gender_markers() {
        assert_eq!(encode_gender(Some("FEMENINO")), 1.0);
        assert_eq!(encode_gender(Some("femenino-x")), 1.0);
        assert_eq!(encode_gender(Some("Female")), 1.0);
        assert_eq!(encode_gender(Some("Mujer")), 1.0);
        assert_eq!(encode_gender(Some("Masculino")), 0.0);
        assert_eq!(encode_gender(Some("male")), 0.0);
        assert_eq!(encode_gender(Some("no binario")), 0.5);
        assert_eq!(encode_gender(None), 0.5);
    }

    #[test]
    fn empty_gender_string_is_unknown() {
        let mut profile = full_profile();
        profile.gender = Some("   ".to_string());
        let dataset = RawDataset {
            enrollments: vec![EnrollmentRecord {
                student_id: 7,
                course_id: 10,
                enrollment_date: None,
                profile,
            }],
            ..Default::default()
        };

        assert_eq!(single_group(&dataset).features.gender_encoded, 0.5);
    }

    #[test]
    fn conflicting_profile_values_are_reported() {
        let mut first = task_row(8, 10, 1, None, None);
        first.profile = full_profile();
        let mut second = task_row(8, 10, 2, None, None);
        second.profile = full_profile();
        second.profile.motivation = Some(2.0);
        let dataset = RawDataset {
            records: vec![first, second],
            ..Default::default()
        };

        let set = compute_features(&dataset).unwrap();
        assert!(close(set.groups[0].features.motivation, 0.7778));
        assert_eq!(
            set.warnings,
            vec![DataWarning::InconsistentProfile {
                key: GroupKey {
                    student_id: 8,
                    course_id: 10
                },
                attribute: "motivation",
                values: vec!["8".to_string(), "2".to_string()],
            }]
        );
    }

    #[test]
    fn grade_outside_scale_is_rejected() {
        let dataset = RawDataset {
            records: vec![task_row(9, 10, 1, Some(ts(9, 9)), Some(70.0))],
            ..Default::default()
        };

        assert_eq!(
            compute_features(&dataset).unwrap_err(),
            PipelineError::GradeOutOfRange {
                student_id: 9,
                task_id: 1,
                grade: 70.0
            }
        );
    }

    #[test]
    fn profile_outside_scale_is_rejected() {
        let mut record = task_row(9, 10, 1, None, None);
        record.profile.sleep_hours = Some(0.0);
        let dataset = RawDataset {
            records: vec![record],
            ..Default::default()
        };

        assert!(matches!(
            compute_features(&dataset),
            Err(PipelineError::ProfileOutOfRange {
                student_id: 9,
                attribute: "sleep_hours",
                ..
            })
        ));
    }

    #[test]
    fn submitted_at_requires_submission() {
        let mut record = task_row(9, 10, 1, Some(ts(9, 9)), None);
        record.submission_id = None;
        let dataset = RawDataset {
            records: vec![record],
            ..Default::default()
        };

        assert!(matches!(
            compute_features(&dataset),
            Err(PipelineError::SubmittedWithoutSubmission { .. })
        ));
    }

    #[test]
    fn grade_requires_submission() {
        let mut record = task_row(9, 10, 2, None, Some(5.5));
        record.submission_id = None;
        let dataset = RawDataset {
            records: vec![task_row(9, 10, 1, Some(ts(9, 9)), Some(6.0)), record],
            ..Default::default()
        };

        assert_eq!(
            compute_features(&dataset).unwrap_err(),
            PipelineError::GradeWithoutSubmission {
                student_id: 9,
                task_id: 2,
            }
        );
    }

    #[test]
    fn groups_come_out_in_key_order() {
        let dataset = RawDataset {
            records: vec![
                task_row(2, 20, 1, None, None),
                task_row(1, 30, 1, None, None),
                task_row(1, 20, 1, None, None),
            ],
            ..Default::default()
        };

        let keys: Vec<(i64, i64)> = compute_features(&dataset)
            .unwrap()
            .groups
            .iter()
            .map(|g| (g.key.student_id, g.key.course_id))
            .collect();
        assert_eq!(keys, vec![(1, 20), (1, 30), (2, 20)]);
    }

    prop_compose! {
        fn arb_row(student_id: i64)(
            task_id in 1i64..6,
            submitted in any::<bool>(),
            delay_hours in -200i64..200,
            grade in proptest::option::of(1.0f64..=7.0),
            motivation in proptest::option::of(1.0f64..=10.0),
            pressure in proptest::option::of(1.0f64..=10.0),
        ) -> RawRecord {
            let mut row = task_row(student_id, 10, task_id, None, None);
            if submitted {
                row.submission_id = Some(task_id);
                row.submitted_at = Some(ts(10, 23) + Duration::hours(delay_hours));
                row.grade = grade;
            }
            row.profile.motivation = motivation;
            row.profile.academic_pressure = pressure;
            row
        }
    }

    fn arb_dataset() -> impl Strategy<Value = RawDataset> {
        (
            proptest::collection::vec(arb_row(1), 0..12),
            proptest::collection::vec(arb_row(2), 0..12),
        )
            .prop_map(|(a, b)| RawDataset {
                records: a.into_iter().chain(b).collect(),
                enrollments: vec![EnrollmentRecord {
                    student_id: 3,
                    course_id: 10,
                    enrollment_date: None,
                    profile: ProfileAttributes::default(),
                }],
                warnings: Vec::new(),
            })
    }

    proptest! {
        #[test]
        fn every_feature_is_in_unit_interval(dataset in arb_dataset()) {
            let set = compute_features(&dataset).unwrap();
            for group in &set.groups {
                for value in group.features.as_array() {
                    prop_assert!((0.0..=1.0).contains(&value), "{value} out of range");
                }
            }
        }

        #[test]
        fn repeated_runs_are_bit_identical(dataset in arb_dataset()) {
            let first = compute_features(&dataset).unwrap();
            let second = compute_features(&dataset).unwrap();
            prop_assert_eq!(first.groups.len(), second.groups.len());
            for (a, b) in first.groups.iter().zip(&second.groups) {
                prop_assert_eq!(a.key, b.key);
                let bits_a: Vec<u64> = a.features.as_array().iter().map(|v| v.to_bits()).collect();
                let bits_b: Vec<u64> = b.features.as_array().iter().map(|v| v.to_bits()).collect();
                prop_assert_eq!(bits_a, bits_b);
            }
        }

        #[test]
        fn every_task_handed_in_means_no_missed_work(
            tasks in 1i64..10,
            copies in 1usize..4,
            grade in 1.0f64..=7.0,
        ) {
            let records = (1..=tasks)
                .flat_map(move |task| {
                    let row = task_row(1, 10, task, Some(ts(9, 12)), Some(grade));
                    std::iter::repeat(row).take(copies)
                })
                .collect();
            let dataset = RawDataset { records, ..Default::default() };

            let set = compute_features(&dataset).unwrap();
            prop_assert_eq!(set.groups.len(), 1);
            prop_assert_eq!(set.groups[0].total_tasks, tasks as usize);
            prop_assert_eq!(set.groups[0].features.non_submission_rate, 0.0);
        }

        #[test]
        fn nothing_handed_in_means_all_work_missed(tasks in 1i64..10, copies in 1usize..4) {
            let records = (1..=tasks)
                .flat_map(move |task| {
                    std::iter::repeat(task_row(1, 10, task, None, None)).take(copies)
                })
                .collect();
            let dataset = RawDataset { records, ..Default::default() };

            let set = compute_features(&dataset).unwrap();
            prop_assert_eq!(set.groups[0].total_tasks, tasks as usize);
            prop_assert_eq!(set.groups[0].features.non_submission_rate, 1.0);
        }

        #[test]
        fn average_grade_inverts_to_raw_mean(
            grades in proptest::collection::vec(1.0f64..=7.0, 1..20),
        ) {
            let raw_mean = mean(&grades).unwrap();
            let restored = average_grade(&grades) * 6.0 + 1.0;
            prop_assert!((restored - raw_mean).abs() < 1e-9);
        }

        #[test]
        fn gender_ignores_case_and_padding(
            prefix in "[a-z ]{0,4}",
            suffix in "[a-z0-9 -]{0,4}",
            upper in any::<bool>(),
        ) {
            let word = if upper { "FEMENINO" } else { "femenino" };
            let value = format!("{prefix}{word}{suffix}");
            prop_assert_eq!(encode_gender(Some(value.as_str())), 1.0);
        }
    }
}
