//! Runs the controller on a single thread: effects become `spawn_local` tasks whose completions are
//! fed back, one at a time, through an unbounded channel.

use std::future::Future;
use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::DataCache;
use crate::config::DashboardConfig;
use crate::controller::{Effect, Msg, RegionDrillController};
use crate::selection::SelectionState;
use crate::source::DataSource;
use crate::view::ViewAdapter;

pub struct Dashboard<S, V> {
    controller: RegionDrillController,
    cache: Rc<DataCache<S>>,
    view: V,
    tx: mpsc::UnboundedSender<Msg>,
    rx: mpsc::UnboundedReceiver<Msg>,
    outstanding: usize,
}

impl<S, V> Dashboard<S, V>
where
    S: DataSource + 'static,
    V: ViewAdapter,
{
    pub fn new(config: &DashboardConfig, selection: SelectionState, source: Rc<S>, view: V) -> Self {
        Self::with_cache(
            RegionDrillController::from_config(config, selection),
            Rc::new(DataCache::new(source)),
            view,
        )
    }

    /// Share `cache` with other dashboards of the same session.
    pub fn with_cache(controller: RegionDrillController, cache: Rc<DataCache<S>>, view: V) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller,
            cache,
            view,
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub fn controller(&self) -> &RegionDrillController {
        &self.controller
    }

    pub fn cache(&self) -> &Rc<DataCache<S>> {
        &self.cache
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Handle for view code that reports gestures from elsewhere.
    pub fn sender(&self) -> mpsc::UnboundedSender<Msg> {
        self.tx.clone()
    }

    /// Must be called from within a `LocalSet`.
    pub fn boot(&mut self) {
        let fx = self.controller.boot();
        self.execute(fx);
    }

    /// Must be called from within a `LocalSet`.
    pub fn dispatch(&mut self, msg: Msg) {
        if msg.is_completion() {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        let fx = self.controller.handle(msg);
        self.execute(fx);
    }

    /// Process queued messages until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while self.outstanding > 0 {
            let Some(msg) = self.rx.recv().await else {
                break;
            };
            self.dispatch(msg);
        }
    }

    /// Process messages for as long as the dashboard lives.
    pub async fn run(&mut self) {
        while let Some(msg) = self.rx.recv().await {
            self.dispatch(msg);
        }
    }

    fn execute(&mut self, fx: Vec<Effect>) {
        for effect in fx {
            match effect {
                Effect::Render(command) => self.view.apply(command),
                Effect::FetchRecord(ticket) => {
                    let cache = Rc::clone(&self.cache);
                    self.spawn(async move {
                        let result = cache.get_record(&ticket.key).await;
                        Msg::RecordLoaded { ticket, result }
                    });
                }
                Effect::FetchGeometry(ticket) => {
                    let cache = Rc::clone(&self.cache);
                    self.spawn(async move {
                        let result = cache.get_child_geometry(&ticket.region.slug).await;
                        Msg::GeometryLoaded { ticket, result }
                    });
                }
                Effect::FetchIndicators {
                    nonce,
                    indicator_type,
                } => {
                    let source = Rc::clone(self.cache.source());
                    self.spawn(async move {
                        let result = source.fetch_indicators(&indicator_type).await;
                        Msg::IndicatorsLoaded {
                            nonce,
                            indicator_type,
                            result,
                        }
                    });
                }
            }
        }
    }

    fn spawn<F>(&mut self, fetch: F)
    where
        F: Future<Output = Msg> + 'static,
    {
        self.outstanding += 1;
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            if tx.send(fetch.await).is_err() {
                debug!("dashboard dropped before fetch completed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use choropleth_shared::{
        DataPoint, DataRecord, Feature, FeatureProperties, GeometryPayload, IndicatorEntry,
        IndicatorType, Period, RecordKey, Region,
    };
    use tokio::task::LocalSet;

    use super::*;
    use crate::config::Palette;
    use crate::controller::DrillState;
    use crate::error::FetchError;
    use crate::recolor::INFO_PLACEHOLDER;
    use crate::view::{RecordingView, RenderCommand};

    #[derive(Default)]
    struct FixtureSource {
        geometry: HashMap<String, GeometryPayload>,
        records: HashMap<RecordKey, DataRecord>,
        record_calls: Cell<usize>,
    }

    fn not_found(url: String) -> FetchError {
        FetchError::Status { url, status: 404 }
    }

    impl DataSource for FixtureSource {
        async fn fetch_indicators(
            &self,
            indicator_type: &IndicatorType,
        ) -> Result<Vec<IndicatorEntry>, FetchError> {
            match indicator_type {
                IndicatorType::Routine => Ok(vec![IndicatorEntry {
                    slug: "cas".into(),
                    number: "7".into(),
                    name: "Cas confirmés".into(),
                }]),
                other => Err(not_found(format!("indicators/{other}"))),
            }
        }

        async fn fetch_record(&self, key: &RecordKey) -> Result<DataRecord, FetchError> {
            self.record_calls.set(self.record_calls.get() + 1);
            tokio::task::yield_now().await;
            self.records
                .get(key)
                .cloned()
                .ok_or_else(|| not_found(key.to_string()))
        }

        async fn fetch_geometry(&self, region: &str) -> Result<GeometryPayload, FetchError> {
            tokio::task::yield_now().await;
            self.geometry
                .get(region)
                .cloned()
                .ok_or_else(|| not_found(region.to_string()))
        }
    }

    fn layer(slugs: &[(&str, &str)]) -> GeometryPayload {
        slugs
            .iter()
            .map(|(slug, name)| {
                (
                    slug.to_string(),
                    Feature::new(
                        FeatureProperties {
                            uuid: slug.to_string(),
                            short_name: name.to_string(),
                            display_typed_name: name.to_string(),
                        },
                        serde_json::Value::Null,
                    ),
                )
            })
            .collect()
    }

    fn values(values: &[(&str, f64)]) -> DataRecord {
        values
            .iter()
            .map(|(slug, value)| {
                (
                    slug.to_string(),
                    DataPoint {
                        value: Some(*value),
                        human: value.to_string(),
                        ..DataPoint::default()
                    },
                )
            })
            .collect()
    }

    fn fixtures() -> FixtureSource {
        let mut source = FixtureSource::default();
        source.geometry.insert(
            "root".into(),
            layer(&[("dps-1", "Kinshasa"), ("dps-2", "Kwilu")]),
        );
        source
            .geometry
            .insert("dps-1".into(), layer(&[("zs-1", "Gombe"), ("zs-2", "Limete")]));
        source.records.insert(
            RecordKey::new("2016-01", "root", "cas"),
            values(&[("dps-1", 10.0), ("dps-2", 20.0)]),
        );
        source.records.insert(
            RecordKey::new("2016-01", "dps-1", "cas"),
            values(&[("zs-1", 1.0)]),
        );
        source
    }

    fn dashboard(source: Rc<FixtureSource>) -> Dashboard<FixtureSource, RecordingView> {
        let config = DashboardConfig {
            root: Region::root("root", "R.D.C"),
            ..DashboardConfig::default()
        };
        let selection = SelectionState::new(config.root.clone())
            .with_periods(vec![Period::new("2016-01"), Period::new("2016-02")]);
        Dashboard::new(&config, selection, source, RecordingView::default())
    }

    #[tokio::test]
    async fn drives_selection_to_a_colored_map_and_back() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(fixtures());
                let mut dash = dashboard(Rc::clone(&source));

                dash.boot();
                dash.settle().await;
                assert!(dash.controller().base_loaded());

                dash.dispatch(Msg::SetIndicatorType(Some("routine".into())));
                dash.settle().await;
                dash.dispatch(Msg::SetIndicator(Some("cas".into())));
                dash.dispatch(Msg::SetPeriod(Some("2016-01".into())));
                dash.settle().await;

                let snapshot = dash.controller().snapshot().clone();
                assert_eq!(snapshot.title, "#7 Cas confirmés");
                assert_eq!(snapshot.colors.len(), 2);
                assert_ne!(snapshot.colors.get("dps-1"), snapshot.colors.get("dps-2"));

                dash.dispatch(Msg::FeatureClicked("dps-1".into()));
                dash.settle().await;
                assert_eq!(dash.controller().drill(), &DrillState::AtParent("dps-1".into()));
                let colors = &dash.controller().snapshot().colors;
                assert_eq!(colors.get("zs-2"), Some(&Palette::default().missing));

                dash.dispatch(Msg::MapClicked);
                dash.settle().await;
                assert_eq!(dash.controller().drill(), &DrillState::AtRoot);
                // The root record came back from the cache.
                assert_eq!(source.record_calls.get(), 2);
                assert_eq!(dash.cache().stats().hits, 1);

                let commands = dash.view_mut().take();
                assert_eq!(
                    commands.first(),
                    Some(&RenderCommand::SetInfo(INFO_PLACEHOLDER.into()))
                );
                let last_loading = commands
                    .iter()
                    .rev()
                    .find(|command| matches!(command, RenderCommand::SetLoading(_)));
                assert_eq!(last_loading, Some(&RenderCommand::SetLoading(false)));
                assert!(!dash.controller().is_loading());
            })
            .await;
    }

    #[tokio::test]
    async fn failed_fetches_settle_without_changing_the_map() {
        LocalSet::new()
            .run_until(async {
                let mut dash = dashboard(Rc::new(fixtures()));
                dash.boot();
                dash.settle().await;
                dash.dispatch(Msg::SetIndicatorType(Some("routine".into())));
                dash.settle().await;
                dash.dispatch(Msg::SetIndicator(Some("cas".into())));
                dash.dispatch(Msg::SetPeriod(Some("2016-01".into())));
                dash.settle().await;
                let before = dash.controller().snapshot().clone();

                // No record exists for February.
                dash.dispatch(Msg::SetPeriod(Some("2016-02".into())));
                dash.settle().await;
                assert_eq!(dash.controller().snapshot(), &before);
                assert_eq!(dash.cache().stats().failures, 1);

                // Nor child geometry for dps-2.
                dash.dispatch(Msg::SetRegion(Some("dps-2".into())));
                dash.settle().await;
                assert_eq!(dash.controller().drill(), &DrillState::AtRoot);
                assert!(dash.controller().selection().region().is_none());
                assert!(!dash.controller().is_loading());
            })
            .await;
    }

    #[tokio::test]
    async fn messages_from_the_sender_are_processed_by_settle() {
        LocalSet::new()
            .run_until(async {
                let mut dash = dashboard(Rc::new(fixtures()));
                dash.boot();
                let sender = dash.sender();
                sender
                    .send(Msg::Hover(Some("dps-1".into())))
                    .expect("dashboard alive");
                dash.settle().await;

                let infos: Vec<_> = dash
                    .view()
                    .commands
                    .iter()
                    .filter(|command| matches!(command, RenderCommand::SetInfo(_)))
                    .collect();
                assert!(!infos.is_empty());
                assert!(dash.controller().base_loaded());
            })
            .await;
    }
}
