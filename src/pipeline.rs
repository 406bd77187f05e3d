use tracing::{info, warn};

use crate::error::PipelineError;
use crate::features::{self, compute_group, group_dataset, resolve_profile, validate_group};
use crate::models::{
    DataWarning, FeatureSet, GroupFeatures, GroupKey, RawDataset, RiskLabel, FEATURE_NAMES,
};
use crate::provider::{RawDataProvider, Scope};
use crate::risk::{self, RawAggregates};

/// Training rows paired with their labels. `features` and `labels` are
/// parallel; groups that could not be labeled are kept out of both and
/// only appear in `unlabeled`.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub feature_names: &'static [&'static str; 12],
    pub keys: Vec<GroupKey>,
    pub features: Vec<[f64; 12]>,
    pub labels: Vec<RiskLabel>,
    /// Unscaled mean grade per row, for reporting.
    pub raw_mean_grades: Vec<Option<f64>>,
    pub unlabeled: Vec<GroupFeatures>,
    pub warnings: Vec<DataWarning>,
}

impl TrainingSet {
    pub fn from_dataset(dataset: &RawDataset) -> Result<Self, PipelineError> {
        let mut warnings = dataset.warnings.clone();
        let mut set = TrainingSet {
            feature_names: &FEATURE_NAMES,
            keys: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
            raw_mean_grades: Vec::new(),
            unlabeled: Vec::new(),
            warnings: Vec::new(),
        };

        for (key, group) in group_dataset(dataset) {
            validate_group(key, &group)?;
            let profile = resolve_profile(key, &group, &mut warnings);
            let computed = compute_group(key, &group, &profile);
            let aggregates = RawAggregates::from_group(key, &group, &profile);

            match risk::label(&aggregates) {
                Ok(label) => {
                    set.keys.push(key);
                    set.features.push(computed.features.as_array());
                    set.labels.push(label);
                    set.raw_mean_grades.push(
                        aggregates
                            .transactional
                            .as_ref()
                            .and_then(|t| t.mean_grade),
                    );
                }
                Err(err @ PipelineError::NoUsableSignal(_)) => {
                    warn!(%err, "leaving group out of training rows");
                    warnings.push(DataWarning::Unlabelable { key });
                    set.unlabeled.push(computed);
                }
                Err(err) => return Err(err),
            }
        }

        set.warnings = warnings;
        let (low, high) = set.class_counts();
        info!(rows = set.len(), low, high, "built training set");
        if !set.is_empty() && (low == 0 || high == 0) {
            warn!(low, high, "training set contains a single risk class");
        }

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// (low, high)
    pub fn class_counts(&self) -> (usize, usize) {
        let high = self
            .labels
            .iter()
            .filter(|label| **label == RiskLabel::High)
            .count();
        (self.labels.len() - high, high)
    }

    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = vec!["student_id", "course_id"];
        header.extend(self.feature_names.iter());
        header.push("risk");
        out.write_record(&header)?;

        for ((key, features), label) in self.keys.iter().zip(&self.features).zip(&self.labels) {
            let mut record = vec![key.student_id.to_string(), key.course_id.to_string()];
            record.extend(features.iter().map(|v| format!("{v:.6}")));
            record.push(label.as_u8().to_string());
            out.write_record(&record)?;
        }

        out.flush()?;
        Ok(())
    }
}

/// Prediction path: features only, no labels.
pub async fn build_feature_set<P: RawDataProvider>(
    provider: &P,
    scope: &Scope,
) -> anyhow::Result<FeatureSet> {
    let dataset = provider.fetch(scope).await?;
    Ok(features::compute_features(&dataset)?)
}

pub async fn build_training_set<P: RawDataProvider>(
    provider: &P,
    scope: &Scope,
) -> anyhow::Result<TrainingSet> {
    let dataset = provider.fetch(scope).await?;
    if dataset.is_empty() {
        anyhow::bail!("no raw rows available for {}", scope.label());
    }
    Ok(TrainingSet::from_dataset(&dataset)?)
}
