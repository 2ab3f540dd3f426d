use std::time::Duration;

use choropleth_shared::colors::parse_palette;
use choropleth_shared::paths::join_url;
use choropleth_shared::{Color, IndicatorType, RecordKey, Region};

use crate::scale::ScaleKind;

pub const DEFAULT_INDICATOR_API_URL: &str = "/api/malaria/indicators";
pub const DEFAULT_GEOJSON_API_URL: &str = "/api/malaria/geojson";
pub const DEFAULT_DATA_API_URL: &str = "/api/data";
pub const DEFAULT_CHILDREN_API_URL: &str = "/api/entities/getchildren";

pub const DEFAULT_ROOT_SLUG: &str = "9616cf8b-5c47-49e2-8702-4f8179565a0c";
pub const DEFAULT_ROOT_NAME: &str = "R.D.C";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_PALETTE: [Color; 4] = [
    Color::rgb(0xfe, 0xf0, 0xd9),
    Color::rgb(0xfd, 0xcc, 0x8a),
    Color::rgb(0xfc, 0x8d, 0x59),
    Color::rgb(0xd7, 0x30, 0x1f),
];
pub const COLOR_INITIAL: Color = Color::rgb(0x09, 0x19, 0x2a);
pub const COLOR_MISSING: Color = Color::rgb(0x1d, 0x3f, 0x61);
pub const COLOR_NOT_EXPECTED: Color = Color::rgb(0x73, 0x77, 0x80);

/// Ordered scale colors plus the fixed status colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub colors: Vec<Color>,
    /// Placeholder fill for polygons without data; also the legend's "missing" swatch.
    pub initial: Color,
    pub missing: Color,
    pub not_expected: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
            initial: COLOR_INITIAL,
            missing: COLOR_MISSING,
            not_expected: COLOR_NOT_EXPECTED,
        }
    }
}

impl Palette {
    pub fn with_colors(colors: Vec<Color>) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }
}

/// Base URLs of the four endpoints the dashboard reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub indicators: String,
    pub geometry: String,
    pub records: String,
    pub children: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            indicators: DEFAULT_INDICATOR_API_URL.to_string(),
            geometry: DEFAULT_GEOJSON_API_URL.to_string(),
            records: DEFAULT_DATA_API_URL.to_string(),
            children: DEFAULT_CHILDREN_API_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Default endpoint paths mounted under `base` (e.g. `http://127.0.0.1:3000`).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            indicators: format!("{base}{DEFAULT_INDICATOR_API_URL}"),
            geometry: format!("{base}{DEFAULT_GEOJSON_API_URL}"),
            records: format!("{base}{DEFAULT_DATA_API_URL}"),
            children: format!("{base}{DEFAULT_CHILDREN_API_URL}"),
        }
    }

    pub fn indicators_url(&self, indicator_type: &IndicatorType) -> String {
        join_url(&self.indicators, &[indicator_type.slug()])
    }

    pub fn record_url(&self, key: &RecordKey) -> String {
        join_url(
            &self.records,
            &[
                key.period.as_str(),
                key.region.as_str(),
                key.indicator.as_str(),
            ],
        )
    }

    pub fn geometry_url(&self, region: &str) -> String {
        join_url(&self.geometry, &[region])
    }

    pub fn children_url(&self, parent: &str) -> String {
        join_url(&self.children, &[parent])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub endpoints: Endpoints,
    pub root: Region,
    pub palette: Palette,
    pub scale: ScaleKind,
    pub http_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            root: Region::root(DEFAULT_ROOT_SLUG, DEFAULT_ROOT_NAME),
            palette: Palette::default(),
            scale: ScaleKind::Quantize,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `CHOROPLETH_*` environment variables. Invalid values fall back silently.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoints: api_base()
                .map(|base| Endpoints::with_base(&base))
                .unwrap_or(defaults.endpoints),
            root: Region::root(
                env_string("CHOROPLETH_ROOT_SLUG").unwrap_or(defaults.root.slug),
                env_string("CHOROPLETH_ROOT_NAME").unwrap_or(defaults.root.name),
            ),
            palette: palette_colors()
                .map(Palette::with_colors)
                .unwrap_or(defaults.palette),
            scale: scale_kind().unwrap_or(defaults.scale),
            http_timeout: http_timeout(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn api_base() -> Option<String> {
    env_string("CHOROPLETH_API_BASE")
}

pub fn palette_colors() -> Option<Vec<Color>> {
    env_string("CHOROPLETH_PALETTE")
        .and_then(|value| parse_palette(&value))
        .filter(|colors| !colors.is_empty())
}

pub fn scale_kind() -> Option<ScaleKind> {
    env_string("CHOROPLETH_SCALE").and_then(|value| value.parse().ok())
}

pub fn http_timeout() -> Duration {
    std::env::var("CHOROPLETH_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "CHOROPLETH_API_BASE",
        "CHOROPLETH_ROOT_SLUG",
        "CHOROPLETH_ROOT_NAME",
        "CHOROPLETH_PALETTE",
        "CHOROPLETH_SCALE",
        "CHOROPLETH_HTTP_TIMEOUT_SECS",
    ];

    #[test]
    fn from_env_without_overrides_matches_defaults() {
        temp_env::with_vars_unset(VARS, || {
            assert_eq!(DashboardConfig::from_env(), DashboardConfig::default());
        });
    }

    #[test]
    fn from_env_applies_valid_overrides() {
        temp_env::with_vars(
            [
                ("CHOROPLETH_API_BASE", Some("http://127.0.0.1:3000/")),
                ("CHOROPLETH_ROOT_SLUG", Some("root-1")),
                ("CHOROPLETH_ROOT_NAME", Some("Root")),
                ("CHOROPLETH_PALETTE", Some("#000000,#ffffff")),
                ("CHOROPLETH_SCALE", Some("quantile")),
                ("CHOROPLETH_HTTP_TIMEOUT_SECS", Some("3")),
            ],
            || {
                let config = DashboardConfig::from_env();
                assert_eq!(
                    config.endpoints.records,
                    "http://127.0.0.1:3000/api/data"
                );
                assert_eq!(config.root, Region::root("root-1", "Root"));
                assert_eq!(
                    config.palette.colors,
                    vec![Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)]
                );
                assert_eq!(config.palette.initial, COLOR_INITIAL);
                assert_eq!(config.scale, ScaleKind::Quantile);
                assert_eq!(config.http_timeout, Duration::from_secs(3));
            },
        );
    }

    #[test]
    fn from_env_ignores_invalid_values() {
        temp_env::with_vars(
            [
                ("CHOROPLETH_API_BASE", Some("  ")),
                ("CHOROPLETH_ROOT_SLUG", None),
                ("CHOROPLETH_ROOT_NAME", None),
                ("CHOROPLETH_PALETTE", Some("#000000,blue")),
                ("CHOROPLETH_SCALE", Some("logarithmic")),
                ("CHOROPLETH_HTTP_TIMEOUT_SECS", Some("0")),
            ],
            || {
                assert_eq!(DashboardConfig::from_env(), DashboardConfig::default());
            },
        );
    }

    #[test]
    fn endpoint_urls_follow_path_layout() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.indicators_url(&IndicatorType::Survey),
            "/api/malaria/indicators/survey"
        );
        assert_eq!(
            endpoints.record_url(&RecordKey::new("2016-01", "root", "ind-1")),
            "/api/data/2016-01/root/ind-1"
        );
        assert_eq!(endpoints.geometry_url("dps-1"), "/api/malaria/geojson/dps-1");
        assert_eq!(endpoints.children_url("dps-1"), "/api/entities/getchildren/dps-1");
    }
}
