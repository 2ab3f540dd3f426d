use std::fmt;

use serde::{Deserialize, Serialize};

/// Indicator family. The known variants come from the default type list; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndicatorType {
    Survey,
    Routine,
    Other(String),
}

impl IndicatorType {
    pub fn slug(&self) -> &str {
        match self {
            Self::Survey => "survey",
            Self::Routine => "routine",
            Self::Other(slug) => slug,
        }
    }

    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "survey" => Self::Survey,
            "routine" => Self::Routine,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl From<String> for IndicatorType {
    fn from(value: String) -> Self {
        Self::from_slug(&value)
    }
}

impl From<IndicatorType> for String {
    fn from(value: IndicatorType) -> Self {
        value.slug().to_string()
    }
}

/// One row of the indicator-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    pub slug: String,
    pub number: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub slug: String,
    pub number: String,
    pub name: String,
    pub indicator_type: IndicatorType,
}

impl Indicator {
    pub fn from_entry(entry: IndicatorEntry, indicator_type: IndicatorType) -> Self {
        Self {
            slug: entry.slug,
            number: entry.number,
            name: entry.name,
            indicator_type,
        }
    }

    /// Selector label: `#<number> <name>`.
    pub fn label(&self) -> String {
        format!("#{} {}", self.number, self.name)
    }
}
