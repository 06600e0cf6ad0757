//! Data-quality reporting for skipped records.

use serde::{Deserialize, Serialize};
use urban_risk_models::FeatureLayer;

/// A raw record that was skipped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityWarning {
    /// Layer the record came from.
    pub layer: FeatureLayer,
    /// Position of the record in its input list.
    pub index: usize,
    /// Why the record was skipped.
    pub reason: String,
}

/// Every warning raised while normalizing one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub warnings: Vec<DataQualityWarning>,
}

impl DataQualityReport {
    /// Records a skipped record.
    pub fn push(&mut self, layer: FeatureLayer, index: usize, reason: impl Into<String>) {
        self.warnings.push(DataQualityWarning {
            layer,
            index,
            reason: reason.into(),
        });
    }

    /// Number of skipped records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of skipped records from one layer.
    #[must_use]
    pub fn count_for(&self, layer: FeatureLayer) -> usize {
        self.warnings.iter().filter(|w| w.layer == layer).count()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
