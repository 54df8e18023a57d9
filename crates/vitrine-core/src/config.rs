//! Configuration management for the media resolution layer.
//!
//! Settings are stored as TOML in the platform config directory. Every section
//! is optional; anything left out falls back to the defaults below, which
//! reproduce the tuning the gallery shipped with.
//!
//! ## File Location
//!
//! - Linux: `~/.config/vitrine/config.toml`
//! - macOS: `~/Library/Application Support/dev.vitrine.vitrine/config.toml`
//! - Windows: `%APPDATA%\vitrine\vitrine\config\config.toml`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [cache]
//! ttl_hours = 168
//! version = "v1"
//!
//! [probe]
//! timeout_ms = 4000
//!
//! [network.high]
//! max_concurrency = 24
//! video_concurrency = 3
//! preload_distance_px = 200
//!
//! [media]
//! image_placeholder = "/placeholder.svg"
//! alternate_dirs = ["/lovable-uploads/galeria"]
//! video_alternate_dirs = []
//!
//! [formats]
//! webp = true
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persistent hint cache settings
    pub cache: CacheConfig,
    /// Existence probe settings
    pub probe: ProbeConfig,
    /// Per-tier scheduling and prefetch tuning
    pub network: NetworkConfig,
    /// Candidate generation and placeholder settings
    pub media: MediaConfig,
    /// Image formats the rendering surface can decode
    pub formats: FormatSupport,
    /// File system paths
    pub paths: PathsConfig,
}

/// Persistent hint cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries older than this are dropped when the cache is loaded.
    pub ttl_hours: u64,
    /// Storage format version. Bumping it orphans every previously persisted entry.
    pub version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 7 * 24,
            version: "v1".to_string(),
        }
    }
}

impl CacheConfig {
    /// TTL as a duration.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60))
    }

    /// Versioned storage key for the given cache namespace.
    #[must_use]
    pub fn storage_key(&self, namespace: &str) -> String {
        format!("{namespace}_cache_{}", self.version)
    }
}

/// Existence probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-probe timeout in milliseconds. `None` leaves requests bounded only
    /// by the transport's own behavior.
    pub timeout_ms: Option<u64>,
    /// User agent sent with probe requests.
    pub user_agent: String,
    /// Require the `Content-Type` of a hit to match the media family when present.
    pub check_content_type: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            user_agent: concat!("vitrine/", env!("CARGO_PKG_VERSION")).to_string(),
            check_content_type: true,
        }
    }
}

impl ProbeConfig {
    /// Per-probe timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Scheduling and prefetch numbers for one network tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSettings {
    /// Concurrent image resolutions.
    pub max_concurrency: usize,
    /// Concurrent video resolutions.
    pub video_concurrency: usize,
    /// How far beyond the viewport an element counts as near, in pixels.
    pub preload_distance_px: u32,
}

/// Per-tier tuning table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 2g, slow-2g, slow 3g, or data-saver
    pub low: TierSettings,
    /// fast 3g or unknown
    pub medium: TierSettings,
    /// 4g
    pub high: TierSettings,
    /// Downlink (Mbps) above which a 3g connection is treated as medium.
    pub medium_downlink_mbps: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            low: TierSettings {
                max_concurrency: 2,
                video_concurrency: 1,
                preload_distance_px: 50,
            },
            medium: TierSettings {
                max_concurrency: 6,
                video_concurrency: 2,
                preload_distance_px: 100,
            },
            high: TierSettings {
                max_concurrency: 20,
                video_concurrency: 3,
                preload_distance_px: 200,
            },
            medium_downlink_mbps: 1.5,
        }
    }
}

/// Candidate generation and placeholder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Asset substituted when every image candidate fails.
    pub image_placeholder: String,
    /// Extra directories searched for a same-named image, in order.
    pub alternate_dirs: Vec<String>,
    /// Extra directories searched for a same-named video, in order.
    pub video_alternate_dirs: Vec<String>,
    /// Image extensions tried after the requested one, in order.
    pub image_extensions: Vec<String>,
    /// Video extensions tried after the requested one, in order.
    pub video_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_placeholder: "/placeholder.svg".to_string(),
            alternate_dirs: vec!["/lovable-uploads/galeria".to_string()],
            video_alternate_dirs: Vec::new(),
            image_extensions: ["jpg", "jpeg", "png", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            video_extensions: ["mp4", "webm", "mov"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Image formats the rendering surface is known to decode.
///
/// Detected once by the host at startup and handed to the resolver; never
/// re-detected for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSupport {
    /// `WebP` decoding is available.
    pub webp: bool,
    /// AVIF decoding is available.
    pub avif: bool,
}

impl Default for FormatSupport {
    fn default() -> Self {
        Self {
            webp: true,
            avif: false,
        }
    }
}

/// File system paths configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the persisted hint cache.
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: directories::ProjectDirs::from("dev", "vitrine", "vitrine").map_or_else(
                || {
                    directories::BaseDirs::new().map_or_else(
                        || PathBuf::from(".vitrine"),
                        |base| base.home_dir().join(".vitrine"),
                    )
                },
                |dirs| dirs.data_dir().to_path_buf(),
            ),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined, or the
    /// file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Path of the global configuration file.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("dev", "vitrine", "vitrine")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_shipped_tuning() {
        let config = Config::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.cache.storage_key("image"), "image_cache_v1");
        assert_eq!(config.probe.timeout(), None);
        assert_eq!(config.network.low.max_concurrency, 2);
        assert_eq!(config.network.high.video_concurrency, 3);
        assert_eq!(config.network.medium_downlink_mbps, 1.5);
        assert!(config.formats.webp);
        assert_eq!(config.media.image_placeholder, "/placeholder.svg");
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let cache = CacheConfig {
            ttl_hours: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(cache.ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            version = "v2"

            [probe]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.version, "v2");
        assert_eq!(config.cache.ttl_hours, 168);
        assert_eq!(config.probe.timeout(), Some(Duration::from_millis(2500)));
        assert!(config.probe.check_content_type);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.network.high.max_concurrency = 24;
        config.media.alternate_dirs = vec!["/media/fotos".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[cache\nttl_hours = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
