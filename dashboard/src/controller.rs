//! Two-level drill state machine of the map.
//!
//! The controller never performs I/O: it consumes [`Msg`]s (user gestures and fetch completions) and
//! returns [`Effect`]s (fetches to start, commands to render). Each fetch carries a ticket; a completion
//! whose ticket is no longer the pending one, or whose target no longer matches the selection, is dropped.

use std::rc::Rc;

use tracing::{debug, info, warn};

use choropleth_shared::{
    DataRecord, GeometryPayload, Indicator, IndicatorEntry, IndicatorType, RecordKey, Region,
};

use crate::config::{DashboardConfig, Palette};
use crate::error::{FetchError, SelectionError};
use crate::recolor::{INFO_PLACEHOLDER, build_legend, info_text, paint_layer};
use crate::scale::{ColorScale, ScaleKind};
use crate::selection::SelectionState;
use crate::view::{DisplaySnapshot, RenderCommand, SelectOption};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillState {
    /// Showing the Parent polygons under the root.
    AtRoot,
    /// Showing the Child polygons of this Parent.
    AtParent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryTicket {
    pub nonce: u64,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTicket {
    pub nonce: u64,
    pub key: RecordKey,
}

#[derive(Debug, Clone)]
pub enum Msg {
    SetIndicatorType(Option<String>),
    SetIndicator(Option<String>),
    SetPeriod(Option<String>),
    SetRegion(Option<String>),
    /// Pointer entered a feature of the active layer, or left all of them.
    Hover(Option<String>),
    FeatureClicked(String),
    /// Click on the map outside any feature.
    MapClicked,
    IndicatorsLoaded {
        nonce: u64,
        indicator_type: IndicatorType,
        result: Result<Vec<IndicatorEntry>, FetchError>,
    },
    GeometryLoaded {
        ticket: GeometryTicket,
        result: Result<Rc<GeometryPayload>, FetchError>,
    },
    RecordLoaded {
        ticket: RecordTicket,
        result: Result<Rc<DataRecord>, FetchError>,
    },
}

impl Msg {
    /// Completions answer exactly one earlier fetch effect.
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::IndicatorsLoaded { .. } | Self::GeometryLoaded { .. } | Self::RecordLoaded { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchIndicators {
        nonce: u64,
        indicator_type: IndicatorType,
    },
    FetchGeometry(GeometryTicket),
    FetchRecord(RecordTicket),
    Render(RenderCommand),
}

pub struct RegionDrillController {
    selection: SelectionState,
    palette: Palette,
    scale_kind: ScaleKind,
    drill: DrillState,

    base_layer: Option<Rc<GeometryPayload>>,
    active_layer: Option<Rc<GeometryPayload>>,
    record: Option<Rc<DataRecord>>,
    applied_key: Option<RecordKey>,
    scale: Option<ColorScale>,
    selected_child: Option<Region>,

    pending_base: Option<u64>,
    pending_geometry: Option<GeometryTicket>,
    pending_record: Option<RecordTicket>,
    pending_indicators: Option<u64>,
    next_nonce: u64,
    in_flight: usize,

    snapshot: DisplaySnapshot,
}

impl RegionDrillController {
    pub fn new(selection: SelectionState, palette: Palette, scale_kind: ScaleKind) -> Self {
        Self {
            selection,
            palette,
            scale_kind,
            drill: DrillState::AtRoot,
            base_layer: None,
            active_layer: None,
            record: None,
            applied_key: None,
            scale: None,
            selected_child: None,
            pending_base: None,
            pending_geometry: None,
            pending_record: None,
            pending_indicators: None,
            next_nonce: 0,
            in_flight: 0,
            snapshot: DisplaySnapshot::default(),
        }
    }

    pub fn from_config(config: &DashboardConfig, selection: SelectionState) -> Self {
        Self::new(selection, config.palette.clone(), config.scale.clone())
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn drill(&self) -> &DrillState {
        &self.drill
    }

    pub fn snapshot(&self) -> &DisplaySnapshot {
        &self.snapshot
    }

    pub fn scale(&self) -> Option<&ColorScale> {
        self.scale.as_ref()
    }

    pub fn selected_child(&self) -> Option<&Region> {
        self.selected_child.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn base_loaded(&self) -> bool {
        self.base_layer.is_some()
    }

    /// Start loading the root-level geometry and clear the info box.
    pub fn boot(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.render(&mut fx, RenderCommand::SetInfo(INFO_PLACEHOLDER.to_string()));
        self.request_base(&mut fx);
        fx
    }

    pub fn handle(&mut self, msg: Msg) -> Vec<Effect> {
        let mut fx = Vec::new();
        match msg {
            Msg::SetIndicatorType(value) => self.on_indicator_type(value.as_deref(), &mut fx),
            Msg::SetIndicator(value) => {
                if self.apply_selection("indicator", |s| s.set_indicator(value.as_deref())) {
                    self.sync(&mut fx);
                }
            }
            Msg::SetPeriod(value) => {
                if self.apply_selection("period", |s| s.set_period(value.as_deref())) {
                    self.sync(&mut fx);
                }
            }
            Msg::SetRegion(value) => {
                if self.apply_selection("region", |s| s.set_region(value.as_deref())) {
                    self.sync(&mut fx);
                }
            }
            Msg::Hover(slug) => self.on_hover(slug.as_deref(), &mut fx),
            Msg::FeatureClicked(slug) => self.on_feature_clicked(&slug, &mut fx),
            Msg::MapClicked => {
                if matches!(self.drill, DrillState::AtParent(_))
                    && self.apply_selection("region", |s| s.set_region(None))
                {
                    self.sync(&mut fx);
                }
            }
            Msg::IndicatorsLoaded {
                nonce,
                indicator_type,
                result,
            } => self.on_indicators_loaded(nonce, indicator_type, result, &mut fx),
            Msg::GeometryLoaded { ticket, result } => {
                self.on_geometry_loaded(ticket, result, &mut fx)
            }
            Msg::RecordLoaded { ticket, result } => self.on_record_loaded(ticket, result, &mut fx),
        }
        fx
    }

    fn apply_selection<F>(&mut self, field: &str, update: F) -> bool
    where
        F: FnOnce(&mut SelectionState) -> Result<bool, SelectionError>,
    {
        match update(&mut self.selection) {
            Ok(_) => true,
            Err(error) => {
                debug!(field, %error, "ignoring selection");
                false
            }
        }
    }

    fn next_nonce(&mut self) -> u64 {
        self.next_nonce = self.next_nonce.wrapping_add(1);
        self.next_nonce
    }

    fn render(&mut self, fx: &mut Vec<Effect>, command: RenderCommand) {
        self.snapshot.observe(&command);
        fx.push(Effect::Render(command));
    }

    fn start_loading(&mut self, fx: &mut Vec<Effect>) {
        if self.in_flight == 0 {
            self.render(fx, RenderCommand::SetLoading(true));
        }
        self.in_flight += 1;
    }

    fn finish_loading(&mut self, fx: &mut Vec<Effect>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.render(fx, RenderCommand::SetLoading(false));
        }
    }

    fn request_base(&mut self, fx: &mut Vec<Effect>) {
        if self.pending_base.is_some() {
            return;
        }
        let nonce = self.next_nonce();
        self.pending_base = Some(nonce);
        self.start_loading(fx);
        fx.push(Effect::FetchGeometry(GeometryTicket {
            nonce,
            region: self.selection.root().clone(),
        }));
    }

    /// Bring layer and colors in line with the selection.
    fn sync(&mut self, fx: &mut Vec<Effect>) {
        if self.base_layer.is_none() {
            self.request_base(fx);
            return;
        }
        if !self.selection.is_ready() {
            return;
        }

        match self.selection.region().cloned() {
            None => {
                self.pending_geometry = None;
                if self.drill != DrillState::AtRoot
                    && let Some(base) = self.base_layer.clone()
                {
                    info!("returning to root layer");
                    self.drill = DrillState::AtRoot;
                    let root = self.selection.root().clone();
                    self.swap_layer(root, base, fx);
                }
                self.recolor(fx);
            }
            Some(parent) if self.drill == DrillState::AtParent(parent.slug.clone()) => {
                self.pending_geometry = None;
                self.recolor(fx);
            }
            Some(parent) => {
                let already_pending = self
                    .pending_geometry
                    .as_ref()
                    .is_some_and(|ticket| ticket.region.slug == parent.slug);
                if already_pending {
                    return;
                }
                // The current layer stays on screen until the new geometry arrives.
                let nonce = self.next_nonce();
                let ticket = GeometryTicket {
                    nonce,
                    region: parent,
                };
                self.pending_geometry = Some(ticket.clone());
                self.start_loading(fx);
                fx.push(Effect::FetchGeometry(ticket));
            }
        }
    }

    fn swap_layer(&mut self, region: Region, features: Rc<GeometryPayload>, fx: &mut Vec<Effect>) {
        self.active_layer = Some(Rc::clone(&features));
        self.record = None;
        self.applied_key = None;
        self.scale = None;
        if self.selected_child.take().is_some() {
            self.render(fx, RenderCommand::SetSelectedChild(None));
        }
        let fill = self.palette.initial;
        self.render(
            fx,
            RenderCommand::SetLayer {
                region,
                features,
                fill,
            },
        );
    }

    fn recolor(&mut self, fx: &mut Vec<Effect>) {
        let Some(key) = self.selection.record_key() else {
            return;
        };
        if self.applied_key.as_ref() == Some(&key) {
            self.pending_record = None;
            return;
        }
        if self
            .pending_record
            .as_ref()
            .is_some_and(|ticket| ticket.key == key)
        {
            return;
        }
        let nonce = self.next_nonce();
        let ticket = RecordTicket { nonce, key };
        self.pending_record = Some(ticket.clone());
        self.start_loading(fx);
        fx.push(Effect::FetchRecord(ticket));
    }

    fn on_indicator_type(&mut self, value: Option<&str>, fx: &mut Vec<Effect>) {
        let before = self.selection.indicator_type().cloned();
        if !self.apply_selection("indicator type", |s| s.set_indicator_type(value)) {
            return;
        }
        let after = self.selection.indicator_type().cloned();
        if before == after {
            return;
        }

        self.pending_indicators = None;
        self.render(fx, RenderCommand::SetIndicatorOptions(Vec::new()));
        if let Some(indicator_type) = after {
            let nonce = self.next_nonce();
            self.pending_indicators = Some(nonce);
            self.start_loading(fx);
            fx.push(Effect::FetchIndicators {
                nonce,
                indicator_type,
            });
        }
    }

    fn on_indicators_loaded(
        &mut self,
        nonce: u64,
        indicator_type: IndicatorType,
        result: Result<Vec<IndicatorEntry>, FetchError>,
        fx: &mut Vec<Effect>,
    ) {
        self.finish_loading(fx);
        if self.pending_indicators != Some(nonce) {
            debug!(nonce, %indicator_type, "discarding stale indicator list");
            return;
        }
        self.pending_indicators = None;

        let entries = match result {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%indicator_type, %error, "failed to load indicator list");
                return;
            }
        };
        let indicators: Vec<Indicator> = entries
            .into_iter()
            .map(|entry| Indicator::from_entry(entry, indicator_type.clone()))
            .collect();
        let options = indicators
            .iter()
            .map(|indicator| SelectOption {
                slug: indicator.slug.clone(),
                label: indicator.label(),
            })
            .collect();
        if self
            .selection
            .set_indicator_options(&indicator_type, indicators)
        {
            self.render(fx, RenderCommand::SetIndicatorOptions(options));
        }
    }

    fn on_geometry_loaded(
        &mut self,
        ticket: GeometryTicket,
        result: Result<Rc<GeometryPayload>, FetchError>,
        fx: &mut Vec<Effect>,
    ) {
        self.finish_loading(fx);

        if self.pending_base == Some(ticket.nonce) {
            self.pending_base = None;
            match result {
                Ok(features) => self.on_base_loaded(ticket.region, features, fx),
                Err(error) => warn!(region = %ticket.region.slug, %error, "failed to load base geometry"),
            }
            return;
        }

        let is_pending = self.pending_geometry.as_ref() == Some(&ticket);
        let still_selected = self
            .selection
            .region()
            .is_some_and(|region| region.slug == ticket.region.slug);
        if !is_pending || !still_selected {
            debug!(region = %ticket.region.slug, nonce = ticket.nonce, "discarding stale geometry");
            return;
        }
        self.pending_geometry = None;

        match result {
            Ok(features) => {
                info!(parent = %ticket.region.slug, features = features.len(), "entering parent layer");
                self.drill = DrillState::AtParent(ticket.region.slug.clone());
                self.swap_layer(ticket.region, features, fx);
                self.recolor(fx);
            }
            Err(error) => {
                warn!(region = %ticket.region.slug, %error, "failed to load child geometry");
                self.restore_displayed_region(fx);
            }
        }
    }

    /// Point the Region selection back at the layer on screen, then catch up on any
    /// indicator or period change made while the geometry was loading.
    fn restore_displayed_region(&mut self, fx: &mut Vec<Effect>) {
        let displayed = match &self.drill {
            DrillState::AtRoot => None,
            DrillState::AtParent(slug) => Some(slug.clone()),
        };
        if let Err(error) = self.selection.set_region(displayed.as_deref()) {
            debug!(%error, "displayed region is no longer selectable");
            return;
        }
        self.sync(fx);
    }

    fn on_base_loaded(&mut self, root: Region, features: Rc<GeometryPayload>, fx: &mut Vec<Effect>) {
        let parents = features
            .0
            .iter()
            .map(|(slug, feature)| Region::parent(slug.as_str(), feature.properties.short_name.as_str()))
            .collect();
        self.selection.set_parents(parents);
        self.base_layer = Some(Rc::clone(&features));
        info!(parents = features.len(), "base geometry loaded");

        if self.drill == DrillState::AtRoot {
            self.swap_layer(root, features, fx);
        }
        self.sync(fx);
    }

    fn on_record_loaded(
        &mut self,
        ticket: RecordTicket,
        result: Result<Rc<DataRecord>, FetchError>,
        fx: &mut Vec<Effect>,
    ) {
        self.finish_loading(fx);

        let is_pending = self.pending_record.as_ref() == Some(&ticket);
        let still_selected = self.selection.record_key().as_ref() == Some(&ticket.key);
        if !is_pending || !still_selected {
            debug!(key = %ticket.key, nonce = ticket.nonce, "discarding stale record");
            return;
        }
        self.pending_record = None;

        match result {
            Ok(record) => self.apply_record(ticket.key, record, fx),
            Err(error) => warn!(key = %ticket.key, %error, "failed to load record"),
        }
    }

    fn apply_record(&mut self, key: RecordKey, record: Rc<DataRecord>, fx: &mut Vec<Effect>) {
        let Some(layer) = self.active_layer.clone() else {
            return;
        };
        let scale = self.scale_kind.fit(&record.dataset(), &self.palette.colors);
        let fills = paint_layer(&layer, &record, &scale, &self.palette);
        let legend = build_legend(&scale, &self.palette);

        self.render(fx, RenderCommand::Recolor(fills));
        self.render(fx, RenderCommand::SetLegend(legend));
        if let Some((title, subtitle)) = self.title() {
            self.render(fx, RenderCommand::SetTitle { title, subtitle });
        }

        self.scale = Some(scale);
        self.record = Some(record);
        self.applied_key = Some(key);
    }

    fn title(&self) -> Option<(String, String)> {
        let indicator = self.selection.indicator()?;
        let period = self.selection.period()?;
        let region = self.selection.current_region();
        Some((
            indicator.label(),
            format!("{}, {}", region.name, period.display_name()),
        ))
    }

    fn on_hover(&mut self, slug: Option<&str>, fx: &mut Vec<Effect>) {
        let hovered = slug.and_then(|slug| Some((slug, self.active_layer.as_ref()?.get(slug)?)));
        let text = match hovered {
            Some((slug, feature)) => info_text(slug, feature, self.record.as_deref()),
            None => INFO_PLACEHOLDER.to_string(),
        };
        self.render(fx, RenderCommand::SetInfo(text));
    }

    fn on_feature_clicked(&mut self, slug: &str, fx: &mut Vec<Effect>) {
        match &self.drill {
            DrillState::AtRoot => {
                if self.apply_selection("region", |s| s.set_region(Some(slug))) {
                    self.sync(fx);
                }
            }
            DrillState::AtParent(_) => {
                let Some(feature) = self.active_layer.as_ref().and_then(|layer| layer.get(slug))
                else {
                    return;
                };
                let child = Region::child(slug, feature.properties.short_name.as_str());
                self.selected_child = Some(child.clone());
                self.render(fx, RenderCommand::SetSelectedChild(Some(child)));
            }
        }
    }
}
