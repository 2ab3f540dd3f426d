use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Feature properties consumed by the info overlay and title.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub uuid: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub display_typed_name: String,
}

/// GeoJSON feature. The geometry itself is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: serde_json::Value,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn new(properties: FeatureProperties, geometry: serde_json::Value) -> Self {
        Self {
            kind: feature_type(),
            properties,
            geometry,
        }
    }
}

/// Region slug -> feature, scoped to the children of one region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryPayload(pub BTreeMap<String, Feature>);

impl GeometryPayload {
    pub fn get(&self, slug: &str) -> Option<&Feature> {
        self.0.get(slug)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Feature)> for GeometryPayload {
    fn from_iter<T: IntoIterator<Item = (String, Feature)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
