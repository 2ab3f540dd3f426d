use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use choropleth_shared::{
    DataRecord, EntityChild, GeometryPayload, IndicatorEntry, IndicatorType, RecordKey,
};

use crate::config::{DashboardConfig, Endpoints};
use crate::error::FetchError;

/// Network seam of the map core. Futures are not `Send`: everything runs on one thread.
pub trait DataSource {
    fn fetch_indicators(
        &self,
        indicator_type: &IndicatorType,
    ) -> impl Future<Output = Result<Vec<IndicatorEntry>, FetchError>>;

    fn fetch_record(&self, key: &RecordKey)
    -> impl Future<Output = Result<DataRecord, FetchError>>;

    /// Features of every child of `region` (Parents for the root, Children for a Parent).
    fn fetch_geometry(
        &self,
        region: &str,
    ) -> impl Future<Output = Result<GeometryPayload, FetchError>>;
}

/// "Children of parent" endpoint used by cascading selectors.
pub trait ChildrenSource {
    fn fetch_children(
        &self,
        parent: &str,
    ) -> impl Future<Output = Result<Vec<EntityChild>, FetchError>>;
}

/// JSON-over-HTTP source. Endpoint URLs must be absolute.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpSource {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("choropleth-dashboard/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { client, endpoints })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.endpoints.clone(), config.http_timeout)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        debug!(%url, "fetching");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            message: format!("failed to read response body: {e}"),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

impl DataSource for HttpSource {
    async fn fetch_indicators(
        &self,
        indicator_type: &IndicatorType,
    ) -> Result<Vec<IndicatorEntry>, FetchError> {
        self.get_json(self.endpoints.indicators_url(indicator_type))
            .await
    }

    async fn fetch_record(&self, key: &RecordKey) -> Result<DataRecord, FetchError> {
        self.get_json(self.endpoints.record_url(key)).await
    }

    async fn fetch_geometry(&self, region: &str) -> Result<GeometryPayload, FetchError> {
        self.get_json(self.endpoints.geometry_url(region)).await
    }
}

impl ChildrenSource for HttpSource {
    async fn fetch_children(&self, parent: &str) -> Result<Vec<EntityChild>, FetchError> {
        self.get_json(self.endpoints.children_url(parent)).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    async fn spawn_fixture_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route(
                "/api/malaria/indicators/routine",
                get(|| async { r#"[{"slug":"cas","number":"3","name":"Cas confirmés"}]"# }),
            )
            .route(
                "/api/data/2016-01/root/cas",
                get(|| async {
                    r#"{"dps-1":{"value":4.5,"is_missing":false,"is_not_expected":false,"human":"4,5"}}"#
                }),
            )
            .route(
                "/api/malaria/geojson/root",
                get(|| async { r#"{"dps-1":{"type":"Feature","properties":{"uuid":"dps-1","short_name":"Kinshasa"}}}"# }),
            )
            .route("/api/malaria/geojson/broken", get(|| async { "not json" }))
            .route(
                "/api/entities/getchildren/dps-1",
                get(|| async { r#"[{"uuid":"zs-1","short_name":"Gombe"}]"# }),
            )
            .route(
                "/api/entities/getchildren/down",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fixtures");
        });
        (addr, handle)
    }

    fn source_for(addr: SocketAddr) -> HttpSource {
        HttpSource::new(
            Endpoints::with_base(&format!("http://{addr}")),
            Duration::from_secs(5),
        )
        .expect("build http source")
    }

    #[tokio::test]
    async fn http_source_decodes_every_endpoint() {
        let (addr, server) = spawn_fixture_server().await;
        let source = source_for(addr);

        let indicators = source
            .fetch_indicators(&IndicatorType::Routine)
            .await
            .expect("indicators");
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].number, "3");

        let record = source
            .fetch_record(&RecordKey::new("2016-01", "root", "cas"))
            .await
            .expect("record");
        assert_eq!(record.get("dps-1").and_then(|p| p.value), Some(4.5));

        let geometry = source.fetch_geometry("root").await.expect("geometry");
        assert_eq!(
            geometry.get("dps-1").map(|f| f.properties.short_name.as_str()),
            Some("Kinshasa")
        );

        let children = source.fetch_children("dps-1").await.expect("children");
        assert_eq!(children[0].uuid, "zs-1");

        server.abort();
    }

    #[tokio::test]
    async fn http_source_classifies_failures() {
        let (addr, server) = spawn_fixture_server().await;
        let source = source_for(addr);

        let err = source.fetch_children("down").await.expect_err("503");
        assert!(matches!(err, FetchError::Status { status: 503, .. }));

        let err = source
            .fetch_record(&RecordKey::new("2016-01", "root", "unknown"))
            .await
            .expect_err("404");
        assert!(matches!(err, FetchError::Status { status: 404, .. }));

        let err = source.fetch_geometry("broken").await.expect_err("decode");
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.url().ends_with("/api/malaria/geojson/broken"));

        server.abort();
    }

    #[tokio::test]
    async fn http_source_reports_unreachable_hosts_as_transport_errors() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe listener");
        let addr = listener.local_addr().expect("probe address");
        drop(listener);

        let err = source_for(addr)
            .fetch_geometry("root")
            .await
            .expect_err("nothing listens on the port");
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
