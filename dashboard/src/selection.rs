use choropleth_shared::paths::selected_value;
use choropleth_shared::{Indicator, IndicatorType, Period, RecordKey, Region};

use crate::error::SelectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorTypeOption {
    pub indicator_type: IndicatorType,
    pub label: String,
}

impl IndicatorTypeOption {
    pub fn new(indicator_type: IndicatorType, label: impl Into<String>) -> Self {
        Self {
            indicator_type,
            label: label.into(),
        }
    }
}

pub fn default_indicator_types() -> Vec<IndicatorTypeOption> {
    vec![
        IndicatorTypeOption::new(IndicatorType::Survey, "Enquête"),
        IndicatorTypeOption::new(IndicatorType::Routine, "Routine"),
    ]
}

/// Current user selection plus the option lists it is validated against.
///
/// Every setter accepts `None` or the `"-1"` sentinel to clear the field, rejects slugs that are not
/// among the known options without touching the state, and returns whether the selection is ready.
#[derive(Debug, Clone)]
pub struct SelectionState {
    root: Region,
    indicator_types: Vec<IndicatorTypeOption>,
    indicators: Vec<Indicator>,
    periods: Vec<Period>,
    parents: Vec<Region>,

    indicator_type: Option<IndicatorType>,
    indicator: Option<Indicator>,
    period: Option<Period>,
    region: Option<Region>,
}

impl SelectionState {
    pub fn new(root: Region) -> Self {
        Self {
            root,
            indicator_types: default_indicator_types(),
            indicators: Vec::new(),
            periods: Vec::new(),
            parents: Vec::new(),
            indicator_type: None,
            indicator: None,
            period: None,
            region: None,
        }
    }

    pub fn with_periods(mut self, periods: Vec<Period>) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_indicator_types(mut self, indicator_types: Vec<IndicatorTypeOption>) -> Self {
        self.indicator_types = indicator_types;
        self
    }

    pub fn root(&self) -> &Region {
        &self.root
    }

    pub fn indicator_types(&self) -> &[IndicatorTypeOption] {
        &self.indicator_types
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn parents(&self) -> &[Region] {
        &self.parents
    }

    pub fn indicator_type(&self) -> Option<&IndicatorType> {
        self.indicator_type.as_ref()
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn period(&self) -> Option<&Period> {
        self.period.as_ref()
    }

    /// Explicitly selected Parent, `None` at the root.
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn current_region(&self) -> &Region {
        self.region.as_ref().unwrap_or(&self.root)
    }

    pub fn is_ready(&self) -> bool {
        self.indicator.is_some() && self.period.is_some()
    }

    /// Record address for the current selection, once ready.
    pub fn record_key(&self) -> Option<RecordKey> {
        let indicator = self.indicator.as_ref()?;
        let period = self.period.as_ref()?;
        Some(RecordKey::new(
            period.slug.as_str(),
            self.current_region().slug.as_str(),
            indicator.slug.as_str(),
        ))
    }

    pub fn set_indicator_type(&mut self, value: Option<&str>) -> Result<bool, SelectionError> {
        let next = match selected_value(value) {
            None => None,
            Some(slug) => Some(
                self.indicator_types
                    .iter()
                    .find(|option| option.indicator_type.slug() == slug)
                    .map(|option| option.indicator_type.clone())
                    .ok_or_else(|| unknown("indicator type", slug))?,
            ),
        };
        if next != self.indicator_type {
            self.indicator_type = next;
            self.indicator = None;
            self.indicators.clear();
        }
        Ok(self.is_ready())
    }

    pub fn set_indicator(&mut self, value: Option<&str>) -> Result<bool, SelectionError> {
        self.indicator = match selected_value(value) {
            None => None,
            Some(slug) => Some(
                self.indicators
                    .iter()
                    .find(|indicator| indicator.slug == slug)
                    .cloned()
                    .ok_or_else(|| unknown("indicator", slug))?,
            ),
        };
        Ok(self.is_ready())
    }

    pub fn set_period(&mut self, value: Option<&str>) -> Result<bool, SelectionError> {
        self.period = match selected_value(value) {
            None => None,
            Some(slug) => Some(
                self.periods
                    .iter()
                    .find(|period| period.slug == slug)
                    .cloned()
                    .ok_or_else(|| unknown("period", slug))?,
            ),
        };
        Ok(self.is_ready())
    }

    /// Selecting the root slug is the same as clearing the region.
    pub fn set_region(&mut self, value: Option<&str>) -> Result<bool, SelectionError> {
        self.region = match selected_value(value) {
            None => None,
            Some(slug) if slug == self.root.slug => None,
            Some(slug) => Some(
                self.parents
                    .iter()
                    .find(|parent| parent.slug == slug)
                    .cloned()
                    .ok_or_else(|| unknown("region", slug))?,
            ),
        };
        Ok(self.is_ready())
    }

    /// Replace the indicator options for `indicator_type`. Ignored unless that type is still current.
    /// Returns whether the options were applied.
    pub fn set_indicator_options(
        &mut self,
        indicator_type: &IndicatorType,
        indicators: Vec<Indicator>,
    ) -> bool {
        if self.indicator_type.as_ref() != Some(indicator_type) {
            return false;
        }
        if let Some(current) = &self.indicator
            && !indicators.iter().any(|candidate| candidate.slug == current.slug)
        {
            self.indicator = None;
        }
        self.indicators = indicators;
        true
    }

    pub fn set_periods(&mut self, periods: Vec<Period>) {
        if let Some(current) = &self.period
            && !periods.contains(current)
        {
            self.period = None;
        }
        self.periods = periods;
    }

    /// Parents become known once the root-level geometry has loaded.
    pub fn set_parents(&mut self, parents: Vec<Region>) {
        if let Some(current) = &self.region
            && !parents.iter().any(|parent| parent.slug == current.slug)
        {
            self.region = None;
        }
        self.parents = parents;
    }

    /// Periods in configured order, grouped under their year in order of first appearance.
    pub fn periods_by_year(&self) -> Vec<(&str, Vec<&Period>)> {
        let mut groups: Vec<(&str, Vec<&Period>)> = Vec::new();
        for period in &self.periods {
            let year = period.year();
            match groups.iter_mut().find(|(group, _)| *group == year) {
                Some((_, members)) => members.push(period),
                None => groups.push((year, vec![period])),
            }
        }
        groups
    }
}

fn unknown(field: &'static str, value: &str) -> SelectionError {
    SelectionError::UnknownOption {
        field,
        value: value.to_string(),
    }
}
