//! Player configuration loaded from `~/.config/voodoo-player/config.toml`.
//!
//! Every field is optional in the file; anything left out falls back to the
//! built-in defaults. The configuration is never mutated after construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PlayerError, Result};

pub const DEFAULT_HOST: &str = "spatial.streamvoodoo.com";
pub const DEFAULT_CLOUD_HOST: &str = "voodoospatial-nyc.nyc3.digitaloceanspaces.com";
pub const DEFAULT_PREVIEW_PATH: &str = "/intro/prog_index.m3u8";

/// Hosts and paths used to validate input URLs and build backend URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Public host that input URLs must use; also serves `live2` and `vod`.
    pub host: String,
    /// Object-storage host serving `live` playlists and the preview clip.
    pub cloud_host: String,
    /// Path of the placeholder clip on `cloud_host`.
    pub preview_path: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            cloud_host: DEFAULT_CLOUD_HOST.to_string(),
            preview_path: DEFAULT_PREVIEW_PATH.to_string(),
        }
    }
}

impl Configuration {
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_cloud_host(mut self, cloud_host: impl Into<String>) -> Self {
        self.cloud_host = cloud_host.into();
        self
    }

    #[must_use]
    pub fn with_preview_path(mut self, preview_path: impl Into<String>) -> Self {
        self.preview_path = preview_path.into();
        self
    }

    /// Load the configuration from the default location.
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    /// Load and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlayerError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&content)
            .map_err(|e| PlayerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| PlayerError::Config(format!("invalid TOML: {e}")))?;
        // Parsed URLs always report a lower-case host.
        config.host.make_ascii_lowercase();
        config.validate()?;
        Ok(config)
    }

    /// Check that hosts are bare host names and the preview path is absolute.
    ///
    /// `host` is matched against parsed input URLs, which carry neither a
    /// port nor upper-case letters in their host, so both are rejected.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("host", &self.host), ("cloud_host", &self.cloud_host)] {
            if value.is_empty() || value.contains('/') {
                return Err(PlayerError::Config(format!(
                    "{field} must be a bare host name, got {value:?}"
                )));
            }
        }
        if self.host.contains(':') || self.host.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(PlayerError::Config(format!(
                "host must be a lower-case host name without a port, got {:?}",
                self.host
            )));
        }
        if !self.preview_path.starts_with('/') {
            return Err(PlayerError::Config(format!(
                "preview_path must start with '/', got {:?}",
                self.preview_path
            )));
        }
        Ok(())
    }

    /// URL of the placeholder clip shown while a live stream is pending.
    pub fn preview_url(&self) -> Result<Url> {
        let raw = format!("https://{}{}", self.cloud_host, self.preview_path);
        Url::parse(&raw).map_err(|e| PlayerError::Config(format!("bad preview URL {raw}: {e}")))
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voodoo-player")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = Configuration::from_toml("").unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn parse_partial_config() {
        let config = Configuration::from_toml(r#"host = "staging.streamvoodoo.com""#).unwrap();
        assert_eq!(config.host, "staging.streamvoodoo.com");
        assert_eq!(config.cloud_host, DEFAULT_CLOUD_HOST);
        assert_eq!(config.preview_path, DEFAULT_PREVIEW_PATH);
    }

    #[test]
    fn reject_host_with_path() {
        let err = Configuration::from_toml(r#"host = "example.com/api""#).unwrap_err();
        assert!(matches!(err, PlayerError::Config(_)));
    }

    #[test]
    fn reject_host_with_port() {
        let err = Configuration::from_toml(r#"host = "localhost:8080""#).unwrap_err();
        assert!(err.to_string().contains("without a port"));
    }

    #[test]
    fn upper_case_host_is_lowered_and_resolves() {
        let config = Configuration::from_toml(r#"host = "Staging.StreamVoodoo.com""#).unwrap();
        assert_eq!(config.host, "staging.streamvoodoo.com");

        let d = crate::stream::resolve_str("https://STAGING.streamvoodoo.com/live2/alice/5", &config)
            .unwrap();
        assert_eq!(
            d.canonical_url.as_str(),
            "https://staging.streamvoodoo.com/api/stream/alice/5"
        );
    }

    #[test]
    fn validate_rejects_upper_case_host() {
        let config = Configuration {
            host: "Example.com".to_string(),
            ..Configuration::default()
        };
        assert!(matches!(config.validate(), Err(PlayerError::Config(_))));
        assert_eq!(Configuration::default().with_host("Example.com").host, "example.com");
    }

    #[test]
    fn reject_relative_preview_path() {
        let err = Configuration::from_toml(r#"preview_path = "intro.m3u8""#).unwrap_err();
        assert!(matches!(err, PlayerError::Config(_)));
    }

    #[test]
    fn reject_garbage_toml() {
        assert!(Configuration::from_toml("host = ").is_err());
    }

    #[test]
    fn default_preview_url() {
        let url = Configuration::default().preview_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://voodoospatial-nyc.nyc3.digitaloceanspaces.com/intro/prog_index.m3u8"
        );
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cloud_host = \"cdn.example.com\"\n").unwrap();
        let config = Configuration::from_path(&path).unwrap();
        assert_eq!(config.cloud_host, "cdn.example.com");
    }

    #[test]
    fn from_path_missing_file_is_error() {
        let err = Configuration::from_path(Path::new("/nonexistent/voodoo.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
