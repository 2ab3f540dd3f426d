use std::path::PathBuf;

pub const SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const MAX_SLUG_LEN: usize = 128;

// Indicator lists, geometry and entity trees only change on redeploys.
pub const REFERENCE_CACHE_CONTROL: &str = "public, max-age=3600";
pub const RECORD_CACHE_CONTROL: &str = "public, max-age=300";
pub const MAP_IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

pub fn data_dir() -> PathBuf {
    std::env::var("DATA_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(SERVER_PORT)
}

pub fn cors_allow_any() -> bool {
    std::env::var("CORS_ALLOW_ANY")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_falls_back_when_unset_or_blank() {
        temp_env::with_var_unset("DATA_DIR", || {
            assert_eq!(data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
        });
        temp_env::with_var("DATA_DIR", Some("   "), || {
            assert_eq!(data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
        });
        temp_env::with_var("DATA_DIR", Some("/srv/choropleth"), || {
            assert_eq!(data_dir(), PathBuf::from("/srv/choropleth"));
        });
    }

    #[test]
    fn server_port_ignores_invalid_values() {
        temp_env::with_var("SERVER_PORT", Some("8081"), || {
            assert_eq!(server_port(), 8081);
        });
        temp_env::with_var("SERVER_PORT", Some("0"), || {
            assert_eq!(server_port(), SERVER_PORT);
        });
        temp_env::with_var("SERVER_PORT", Some("http"), || {
            assert_eq!(server_port(), SERVER_PORT);
        });
    }

    #[test]
    fn cors_flag_accepts_common_truthy_spellings() {
        temp_env::with_var_unset("CORS_ALLOW_ANY", || assert!(!cors_allow_any()));
        for value in ["1", "true", "YES", " on "] {
            temp_env::with_var("CORS_ALLOW_ANY", Some(value), || assert!(cors_allow_any()));
        }
        temp_env::with_var("CORS_ALLOW_ANY", Some("off"), || assert!(!cors_allow_any()));
    }
}
