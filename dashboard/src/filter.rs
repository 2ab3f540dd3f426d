//! N-level dependent selectors fed by the "children of parent" endpoint.

use tracing::debug;

use choropleth_shared::paths::selected_value;
use choropleth_shared::{EntityChild, NONE_SENTINEL};

use crate::error::FilterError;
use crate::source::ChildrenSource;

pub const DEFAULT_LINEAGE: [&str; 5] = [
    "pays",
    "centre_sante",
    "division_provinciale_sante",
    "zone_sante",
    "aire_sante",
];
pub const DEFAULT_OPTION_LABEL: &str = "Tous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLevel {
    pub name: String,
    pub options: Vec<EntityChild>,
    pub selected: Option<String>,
    /// Value re-selected automatically whenever this level is repopulated.
    pub remembered: Option<String>,
}

impl FilterLevel {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            selected: None,
            remembered: None,
        }
    }

    fn clear(&mut self) {
        self.options.clear();
        self.selected = None;
    }

    fn offers(&self, uuid: &str) -> bool {
        self.options.iter().any(|option| option.uuid == uuid)
    }
}

pub struct CascadingFilter<S> {
    source: S,
    levels: Vec<FilterLevel>,
    root: String,
    default_option: Option<EntityChild>,
}

impl<S: ChildrenSource> CascadingFilter<S> {
    pub fn new<I, N>(source: S, lineage: I, root: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            source,
            levels: lineage.into_iter().map(FilterLevel::new).collect(),
            root: root.into(),
            default_option: None,
        }
    }

    /// Prepend a "none" entry labelled `label` to every level's options.
    pub fn with_default_option(mut self, label: impl Into<String>) -> Self {
        self.default_option = Some(EntityChild {
            uuid: NONE_SENTINEL.to_string(),
            short_name: label.into(),
        });
        self
    }

    /// Initial remembered value per level, in lineage order.
    pub fn with_remembered<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        for (level, value) in self.levels.iter_mut().zip(values) {
            level.remembered = value.filter(|v| v != NONE_SENTINEL);
        }
        self
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[FilterLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&FilterLevel> {
        self.levels.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.name == name)
    }

    /// Options as shown to the user, including the "none" entry if configured.
    pub fn options(&self, index: usize) -> Vec<EntityChild> {
        let Some(level) = self.levels.get(index) else {
            return Vec::new();
        };
        self.default_option
            .iter()
            .cloned()
            .chain(level.options.iter().cloned())
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), FilterError> {
        if index < self.levels.len() {
            Ok(())
        } else {
            Err(FilterError::LevelOutOfRange {
                index,
                depth: self.levels.len(),
            })
        }
    }

    /// Populate a level directly, typically the first one. Deeper levels are cleared.
    pub fn set_level_options(
        &mut self,
        index: usize,
        options: Vec<EntityChild>,
    ) -> Result<(), FilterError> {
        self.check_index(index)?;
        for level in &mut self.levels[index..] {
            level.clear();
        }
        self.levels[index].options = options;
        Ok(())
    }

    /// Apply a selection at `index` and cascade: deeper levels are cleared, the next one is
    /// fetched for the new value, and a remembered value found among the fetched options is
    /// selected in turn. `None` or the sentinel leaves every deeper level empty.
    pub async fn on_level_changed(
        &mut self,
        index: usize,
        value: Option<&str>,
    ) -> Result<(), FilterError> {
        self.check_index(index)?;
        let selected = selected_value(value).map(str::to_owned);
        let level = &mut self.levels[index];
        level.selected = selected.clone();
        level.remembered = selected.clone();

        let mut current = index;
        let mut parent = selected;
        loop {
            for level in &mut self.levels[current + 1..] {
                level.clear();
            }
            let Some(parent_uuid) = parent.take() else {
                break;
            };
            let next = current + 1;
            if next >= self.levels.len() {
                break;
            }

            let children = self.source.fetch_children(&parent_uuid).await?;
            debug!(
                level = %self.levels[next].name,
                parent = %parent_uuid,
                options = children.len(),
                "repopulated filter level"
            );
            let level = &mut self.levels[next];
            level.options = children;

            match level.remembered.clone() {
                Some(remembered) if level.offers(&remembered) => {
                    level.selected = Some(remembered.clone());
                    current = next;
                    parent = Some(remembered);
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Select the remembered first-level value and cascade from it.
    pub async fn auto_launch(&mut self) -> Result<(), FilterError> {
        let first = self.check_index(0).map(|()| self.levels[0].remembered.clone())?;
        match first {
            Some(value) => self.on_level_changed(0, Some(&value)).await,
            None => Ok(()),
        }
    }

    /// Deepest concrete selection, or the root when nothing is selected.
    pub fn deepest_selected(&self) -> &str {
        self.levels
            .iter()
            .rev()
            .find_map(|level| selected_value(level.selected.as_deref()))
            .unwrap_or(self.root.as_str())
    }
}
