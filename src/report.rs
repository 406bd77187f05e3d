use std::fmt::Write;

use crate::models::{FeatureSet, GroupKey, RiskLabel, FEATURE_NAMES};
use crate::pipeline::TrainingSet;

#[derive(Debug, Clone)]
pub struct FeatureSummary {
    pub name: &'static str,
    pub mean: f64,
}

pub fn summarize_features(features: &FeatureSet) -> Vec<FeatureSummary> {
    let count = features.groups.len();
    let mut totals = [0.0_f64; 12];
    for group in &features.groups {
        for (total, value) in totals.iter_mut().zip(group.features.as_array()) {
            *total += value;
        }
    }

    FEATURE_NAMES
        .iter()
        .zip(totals)
        .map(|(name, total)| FeatureSummary {
            name: *name,
            mean: if count == 0 { 0.0 } else { total / count as f64 },
        })
        .collect()
}

/// High-risk rows first; within them, lowest raw grade first and ungraded
/// rows last.
fn riskiest(training: &TrainingSet) -> Vec<(GroupKey, Option<f64>)> {
    let mut rows: Vec<(GroupKey, Option<f64>)> = training
        .keys
        .iter()
        .zip(&training.labels)
        .zip(&training.raw_mean_grades)
        .filter(|((_, label), _)| **label == RiskLabel::High)
        .map(|((key, _), grade)| (*key, *grade))
        .collect();

    rows.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });
    rows
}

pub fn build_report(scope: &str, training: &TrainingSet, features: &FeatureSet) -> String {
    let mut output = String::new();
    let (low, high) = training.class_counts();

    let _ = writeln!(output, "# Academic Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} student-course pairs)",
        scope,
        features.groups.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Label Mix");

    if training.is_empty() {
        let _ = writeln!(output, "No labeled pairs in this scope.");
    } else {
        let _ = writeln!(output, "- high risk: {high}");
        let _ = writeln!(output, "- low risk: {low}");
    }
    if !training.unlabeled.is_empty() {
        let _ = writeln!(output, "- unlabeled: {}", training.unlabeled.len());
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Feature Means");

    if features.groups.is_empty() {
        let _ = writeln!(output, "No feature vectors computed.");
    } else {
        for summary in summarize_features(features) {
            let _ = writeln!(output, "- {}: {:.3}", summary.name, summary.mean);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Pairs");

    let flagged = riskiest(training);
    if flagged.is_empty() {
        let _ = writeln!(output, "No high-risk pairs in this scope.");
    } else {
        for (key, grade) in flagged.iter().take(10) {
            let grade = grade.map_or_else(
                || "no grades".to_string(),
                |g| format!("mean grade {g:.2}"),
            );
            let _ = writeln!(
                output,
                "- student {} in course {} ({})",
                key.student_id, key.course_id, grade
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Warnings");

    if training.warnings.is_empty() {
        let _ = writeln!(output, "None.");
    } else {
        for warning in training.warnings.iter().take(20) {
            let _ = writeln!(output, "- {warning}");
        }
        if training.warnings.len() > 20 {
            let _ = writeln!(output, "- ... and {} more", training.warnings.len() - 20);
        }
    }

    output
}
