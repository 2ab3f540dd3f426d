//! Boundary between the controller and whatever draws the map.

use std::collections::BTreeMap;
use std::rc::Rc;

use choropleth_shared::{Color, GeometryPayload, Region};

use crate::recolor::LegendEntry;

/// Selector option as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub slug: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Disable interactive controls while a fetch is outstanding.
    SetLoading(bool),
    /// Replace the drawn layer with the children of `region`, all painted `fill`.
    SetLayer {
        region: Region,
        features: Rc<GeometryPayload>,
        fill: Color,
    },
    /// Per-feature fills for the current layer.
    Recolor(Vec<(String, Color)>),
    SetLegend(Vec<LegendEntry>),
    SetTitle { title: String, subtitle: String },
    SetIndicatorOptions(Vec<SelectOption>),
    /// Info box text.
    SetInfo(String),
    /// Child polygon picked for the detail box; `None` clears it.
    SetSelectedChild(Option<Region>),
}

pub trait ViewAdapter {
    fn apply(&mut self, command: RenderCommand);
}

impl<V: ViewAdapter + ?Sized> ViewAdapter for Box<V> {
    fn apply(&mut self, command: RenderCommand) {
        (**self).apply(command);
    }
}

/// Keeps every command it receives. Useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub commands: Vec<RenderCommand>,
}

impl RecordingView {
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl ViewAdapter for RecordingView {
    fn apply(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

/// Read-only view of what is on screen, for static exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySnapshot {
    pub title: String,
    pub subtitle: String,
    pub legend: Vec<LegendEntry>,
    /// Region whose children form the drawn layer.
    pub layer: Option<Region>,
    pub colors: BTreeMap<String, Color>,
}

impl DisplaySnapshot {
    /// Track a command so the snapshot always mirrors the last applied state.
    pub fn observe(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::SetLayer {
                region,
                features,
                fill,
            } => {
                self.layer = Some(region.clone());
                self.colors = features.slugs().map(|slug| (slug.to_string(), *fill)).collect();
            }
            RenderCommand::Recolor(fills) => {
                for (slug, color) in fills {
                    self.colors.insert(slug.clone(), *color);
                }
            }
            RenderCommand::SetLegend(entries) => self.legend = entries.clone(),
            RenderCommand::SetTitle { title, subtitle } => {
                self.title = title.clone();
                self.subtitle = subtitle.clone();
            }
            RenderCommand::SetLoading(_)
            | RenderCommand::SetIndicatorOptions(_)
            | RenderCommand::SetInfo(_)
            | RenderCommand::SetSelectedChild(_) => {}
        }
    }
}
