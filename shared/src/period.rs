use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reporting period. Identity and ordering are by slug only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Period {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: None,
        }
    }

    pub fn with_label(slug: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: Some(label.into()),
        }
    }

    /// Grouping year: everything before the first `-` of the slug.
    pub fn year(&self) -> &str {
        self.slug.split('-').next().unwrap_or(&self.slug)
    }

    /// Configured label, else "Month YYYY" for `YYYY-MM` slugs, else the slug itself.
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        NaiveDate::parse_from_str(&format!("{}-01", self.slug), "%Y-%m-%d")
            .map(|date| date.format("%B %Y").to_string())
            .unwrap_or_else(|_| self.slug.clone())
    }
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state);
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slug.cmp(&other.slug)
    }
}

/// Two-sided period selection used by the static (pre-rendered image) map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodSpan {
    pub first: Option<String>,
    pub second: Option<String>,
}

impl PeriodSpan {
    pub fn new(first: Option<&str>, second: Option<&str>) -> Self {
        Self {
            first: first.map(str::to_owned),
            second: second.map(str::to_owned),
        }
    }

    /// `first_second`, or `p_p` when only one side is set. `None` when both are empty.
    pub fn slug(&self) -> Option<String> {
        match (&self.first, &self.second) {
            (Some(first), Some(second)) => Some(format!("{first}_{second}")),
            (Some(single), None) | (None, Some(single)) => Some(format!("{single}_{single}")),
            (None, None) => None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.first.is_some() || self.second.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Period, PeriodSpan};

    #[test]
    fn year_is_slug_prefix() {
        assert_eq!(Period::new("2016-03").year(), "2016");
        assert_eq!(Period::new("2016").year(), "2016");
        assert_eq!(Period::new("q1").year(), "q1");
    }

    #[test]
    fn ordering_and_equality_ignore_labels() {
        let a = Period::with_label("2015-12", "December");
        let b = Period::with_label("2016-01", "January");
        assert!(a < b);
        assert_eq!(Period::new("2016-01"), b);

        let mut periods = vec![Period::new("2016-02"), Period::new("2015-11"), Period::new("2016-01")];
        periods.sort();
        let slugs: Vec<_> = periods.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["2015-11", "2016-01", "2016-02"]);
    }

    #[test]
    fn display_name_prefers_label_then_month_name() {
        assert_eq!(Period::with_label("2016-03", "Mars 2016").display_name(), "Mars 2016");
        assert_eq!(Period::new("2016-03").display_name(), "March 2016");
        assert_eq!(Period::new("2016-W12").display_name(), "2016-W12");
    }

    #[test]
    fn span_slug_composes_both_sides() {
        assert_eq!(
            PeriodSpan::new(Some("2016-01"), Some("2016-06")).slug().as_deref(),
            Some("2016-01_2016-06")
        );
        assert_eq!(
            PeriodSpan::new(None, Some("2016-06")).slug().as_deref(),
            Some("2016-06_2016-06")
        );
        assert_eq!(
            PeriodSpan::new(Some("2016-01"), None).slug().as_deref(),
            Some("2016-01_2016-01")
        );
        assert_eq!(PeriodSpan::default().slug(), None);
        assert!(!PeriodSpan::default().is_set());
    }
}
