use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Indicator value for one region. `value` is `None` when it could not be computed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPoint {
    pub value: Option<f64>,
    #[serde(default)]
    pub is_missing: bool,
    #[serde(default)]
    pub is_not_expected: bool,
    #[serde(default)]
    pub human: String,
}

/// Region slug -> data point, for one (period, region, indicator) triple.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRecord(pub HashMap<String, DataPoint>);

impl DataRecord {
    pub fn get(&self, slug: &str) -> Option<&DataPoint> {
        self.0.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-null, finite values. This is what scales are fitted on.
    pub fn dataset(&self) -> Vec<f64> {
        self.0
            .values()
            .filter_map(|point| point.value)
            .filter(|value| value.is_finite())
            .collect()
    }
}

impl FromIterator<(String, DataPoint)> for DataRecord {
    fn from_iter<T: IntoIterator<Item = (String, DataPoint)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Address of one data record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub period: String,
    pub region: String,
    pub indicator: String,
}

impl RecordKey {
    pub fn new(
        period: impl Into<String>,
        region: impl Into<String>,
        indicator: impl Into<String>,
    ) -> Self {
        Self {
            period: period.into(),
            region: region.into(),
            indicator: indicator.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.period, self.region, self.indicator)
    }
}

#[cfg(test)]
mod tests {
    use super::{DataPoint, DataRecord, RecordKey};

    #[test]
    fn record_parses_flat_mapping_with_defaults() {
        let record: DataRecord = serde_json::from_str(
            r#"{
                "a": {"value": 12.5, "is_missing": false, "is_not_expected": false, "human": "12,5 %"},
                "b": {"value": null, "is_missing": true, "is_not_expected": false, "human": "n/a"},
                "c": {"value": null}
            }"#,
        )
        .expect("record should parse");

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("a").and_then(|p| p.value), Some(12.5));
        assert!(record.get("b").is_some_and(|p| p.is_missing));
        assert_eq!(record.get("c"), Some(&DataPoint::default()));
        assert!(!record.contains("d"));
    }

    #[test]
    fn dataset_keeps_only_present_values() {
        let record: DataRecord = [
            ("a".to_string(), DataPoint { value: Some(1.0), ..DataPoint::default() }),
            ("b".to_string(), DataPoint::default()),
            ("c".to_string(), DataPoint { value: Some(3.0), ..DataPoint::default() }),
        ]
        .into_iter()
        .collect();

        let mut dataset = record.dataset();
        dataset.sort_by(f64::total_cmp);
        assert_eq!(dataset, vec![1.0, 3.0]);
    }

    #[test]
    fn record_key_displays_as_path() {
        assert_eq!(RecordKey::new("2016-01", "root", "ind").to_string(), "2016-01/root/ind");
    }
}
