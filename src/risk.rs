use crate::error::PipelineError;
use crate::features::{self, RecordGroup};
use crate::models::{GroupKey, ProfileAttributes, RiskLabel};

pub const PASSING_GRADE: f64 = 4.0;
pub const MAX_NON_SUBMISSION_RATE: f64 = 0.5;

// Cold-start thresholds, on the raw 1-10 questionnaire scale.
pub const LOW_MOTIVATION: f64 = 3.0;
pub const HIGH_ACADEMIC_PRESSURE: f64 = 7.5;
pub const LOW_AVAILABLE_TIME: f64 = 3.0;
pub const LOW_SLEEP_HOURS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionalAggregates {
    /// Unscaled mean on the 1-7 grading scale; `None` if nothing was graded.
    pub mean_grade: Option<f64>,
    pub non_submission_rate: f64,
}

/// Label inputs, built straight from raw rows. This never sees a feature
/// vector, so changing feature scaling cannot change what a label means.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAggregates {
    pub key: GroupKey,
    pub transactional: Option<TransactionalAggregates>,
    pub profile: ProfileAttributes,
}

impl RawAggregates {
    pub fn from_group(key: GroupKey, group: &RecordGroup<'_>, profile: &ProfileAttributes) -> Self {
        let transactional = group
            .non_submission_rate()
            .map(|non_submission_rate| TransactionalAggregates {
                mean_grade: features::mean(&group.grades()),
                non_submission_rate,
            });

        Self {
            key,
            transactional,
            profile: profile.clone(),
        }
    }
}

pub fn label(aggregates: &RawAggregates) -> Result<RiskLabel, PipelineError> {
    let high = match &aggregates.transactional {
        Some(transactional) => transactional_risk(transactional),
        None => profile_risk(&aggregates.profile)
            .ok_or(PipelineError::NoUsableSignal(aggregates.key))?,
    };

    Ok(if high { RiskLabel::High } else { RiskLabel::Low })
}

fn transactional_risk(aggregates: &TransactionalAggregates) -> bool {
    let failing = aggregates
        .mean_grade
        .is_some_and(|grade| grade < PASSING_GRADE);
    failing || aggregates.non_submission_rate > MAX_NON_SUBMISSION_RATE
}

/// `None` when none of the attributes the rule looks at were answered.
fn profile_risk(profile: &ProfileAttributes) -> Option<bool> {
    let checks = [
        profile.motivation.map(|v| v < LOW_MOTIVATION),
        profile.academic_pressure.map(|v| v > HIGH_ACADEMIC_PRESSURE),
        profile.available_time.map(|v| v < LOW_AVAILABLE_TIME),
        profile.sleep_hours.map(|v| v < LOW_SLEEP_HOURS),
    ];

    if checks.iter().all(Option::is_none) {
        return None;
    }
    Some(checks.iter().any(|check| *check == Some(true)))
}
