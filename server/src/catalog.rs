//! Reads dashboard payloads from the data directory.
//!
//! Layout under `DATA_DIR`:
//! `indicators/<type>.json`, `records/<period>/<region>/<indicator>.json`,
//! `geometry/<region>.json` and `entities/<parent>.json`.

use std::io::ErrorKind;
use std::path::PathBuf;

use axum::http::StatusCode;
use bytes::Bytes;
use choropleth_shared::{
    DataRecord, EntityChild, GeometryPayload, IndicatorEntry, IndicatorType, RecordKey,
};
use tracing::{debug, warn};

use crate::config::{RECORD_CACHE_CONTROL, REFERENCE_CACHE_CONTROL};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Indicators(IndicatorType),
    Record(RecordKey),
    Geometry(String),
    Children(String),
}

impl Resource {
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Indicators(indicator_type) => {
                PathBuf::from("indicators").join(format!("{}.json", indicator_type.slug()))
            }
            Self::Record(key) => PathBuf::from("records")
                .join(&key.period)
                .join(&key.region)
                .join(format!("{}.json", key.indicator)),
            Self::Geometry(region) => PathBuf::from("geometry").join(format!("{region}.json")),
            Self::Children(parent) => PathBuf::from("entities").join(format!("{parent}.json")),
        }
    }

    pub fn cache_control(&self) -> &'static str {
        match self {
            Self::Record(_) => RECORD_CACHE_CONTROL,
            _ => REFERENCE_CACHE_CONTROL,
        }
    }

    /// Files are served verbatim, but only once they decode as the type the dashboard expects.
    fn check_payload(&self, raw: &[u8]) -> Result<(), serde_json::Error> {
        match self {
            Self::Indicators(_) => serde_json::from_slice::<Vec<IndicatorEntry>>(raw).map(drop),
            Self::Record(_) => serde_json::from_slice::<DataRecord>(raw).map(drop),
            Self::Geometry(_) => serde_json::from_slice::<GeometryPayload>(raw).map(drop),
            Self::Children(_) => serde_json::from_slice::<Vec<EntityChild>>(raw).map(drop),
        }
    }
}

pub async fn load(state: &AppState, resource: &Resource) -> Result<Bytes, StatusCode> {
    let relative = resource.relative_path();
    let key = relative.to_string_lossy().into_owned();

    if let Some(cached) = state.payload_cache.get(&key) {
        state.observability.record_cache_hit();
        debug!(%key, "payload cache hit");
        return Ok(cached.clone());
    }
    state.observability.record_cache_miss();

    let path = state.data_dir.join(&relative);
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            state.observability.record_not_found();
            debug!(%key, "payload not found");
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            state.observability.record_read_failure();
            warn!(error = %e, path = %path.display(), "failed to read payload");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if let Err(e) = resource.check_payload(&raw) {
        state.observability.record_read_failure();
        warn!(error = %e, path = %path.display(), "payload does not decode");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let payload = Bytes::from(raw);
    state
        .payload_cache
        .entry(key)
        .or_insert_with(|| payload.clone());
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("fixture has a parent"))
            .expect("create fixture dir");
        std::fs::write(path, body).expect("write fixture");
    }

    #[test]
    fn relative_paths_follow_the_data_layout() {
        assert_eq!(
            Resource::Indicators(IndicatorType::Routine).relative_path(),
            PathBuf::from("indicators/routine.json")
        );
        assert_eq!(
            Resource::Record(RecordKey::new("2016-01", "rdc", "cas")).relative_path(),
            PathBuf::from("records/2016-01/rdc/cas.json")
        );
        assert_eq!(
            Resource::Geometry("kinshasa".into()).relative_path(),
            PathBuf::from("geometry/kinshasa.json")
        );
        assert_eq!(
            Resource::Children("rdc".into()).relative_path(),
            PathBuf::from("entities/rdc.json")
        );
    }

    #[tokio::test]
    async fn second_load_is_served_from_the_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "entities/rdc.json",
            r#"[{"uuid":"kin","short_name":"Kinshasa"}]"#,
        );
        let state = AppState::new(dir.path().to_path_buf());
        let resource = Resource::Children("rdc".into());

        let first = load(&state, &resource).await.expect("first load");
        std::fs::remove_file(dir.path().join("entities/rdc.json")).expect("remove fixture");
        let second = load(&state, &resource).await.expect("cached load");

        assert_eq!(first, second);
        let counters = state.observability.snapshot();
        assert_eq!(counters.cache_misses_total, 1);
        assert_eq!(counters.cache_hits_total, 1);
    }

    #[tokio::test]
    async fn missing_and_malformed_files_are_not_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "geometry/broken.json", r#"{"a": 1}"#);
        let state = AppState::new(dir.path().to_path_buf());

        assert_eq!(
            load(&state, &Resource::Geometry("absent".into())).await,
            Err(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            load(&state, &Resource::Geometry("broken".into())).await,
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert!(state.payload_cache.is_empty());

        // A file that appears later is picked up.
        write(dir.path(), "geometry/absent.json", "{}");
        assert!(load(&state, &Resource::Geometry("absent".into())).await.is_ok());

        let counters = state.observability.snapshot();
        assert_eq!(counters.not_found_total, 1);
        assert_eq!(counters.read_failures_total, 1);
    }
}
