use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::DirectoryIdentity;

/// Settings for a [`BlobDirectory`](crate::BlobDirectory), loadable from TOML.
///
/// ```toml
/// container = "search"
/// root_prefix = "catalog/en"
/// cache_dir = "/var/cache/search"
/// compress_blobs = true
/// lock_poll_interval_ms = 500
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub container: String,
    pub root_prefix: Option<String>,
    /// Cache location. Defaults to a per-directory path under the system
    /// temp dir.
    pub cache_dir: Option<PathBuf>,
    pub compress_blobs: bool,
    pub lock_poll_interval_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            container: String::new(),
            root_prefix: None,
            cache_dir: None,
            compress_blobs: true,
            lock_poll_interval_ms: 1000,
        }
    }
}

impl DirectoryConfig {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> DirectoryResult<Self> {
        toml::from_str(text).map_err(|e| DirectoryError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> DirectoryResult<String> {
        toml::to_string(self).map_err(|e| DirectoryError::Config(e.to_string()))
    }

    pub fn identity(&self) -> DirectoryResult<DirectoryIdentity> {
        DirectoryIdentity::new(&self.container, self.root_prefix.as_deref())
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// Cache directory for `identity`: the configured path, or
    /// `<temp>/blobdir/<container>/<root prefix>`.
    pub fn cache_path(&self, identity: &DirectoryIdentity) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        let mut path = std::env::temp_dir().join("blobdir").join(identity.container());
        for segment in identity.root_prefix().split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = DirectoryConfig::default();
        assert!(c.compress_blobs);
        assert_eq!(c.lock_poll_interval(), Duration::from_secs(1));
        assert!(c.cache_dir.is_none());
        assert!(c.identity().is_err());
    }

    #[test]
    fn parse_partial_toml() {
        let c = DirectoryConfig::from_toml_str(
            r#"
            container = "Search"
            root_prefix = "catalog/en"
            compress_blobs = false
            "#,
        )
        .unwrap();
        assert!(!c.compress_blobs);
        assert_eq!(c.lock_poll_interval_ms, 1000);
        let id = c.identity().unwrap();
        assert_eq!(id.container(), "search");
        assert_eq!(id.root_prefix(), "catalog/en/");
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = DirectoryConfig::from_toml_str("compress_blobs = \"yes\"").unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut c = DirectoryConfig::new("search");
        c.cache_dir = Some(PathBuf::from("/var/cache/search"));
        c.lock_poll_interval_ms = 250;
        let text = c.to_toml_string().unwrap();
        assert_eq!(DirectoryConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobdir.toml");
        std::fs::write(&path, "container = \"logs\"\nlock_poll_interval_ms = 50\n").unwrap();
        let c = DirectoryConfig::load(&path).unwrap();
        assert_eq!(c.container, "logs");
        assert_eq!(c.lock_poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn default_cache_path_follows_identity() {
        let c = DirectoryConfig::new("search");
        let id = DirectoryIdentity::new("search", Some("catalog/en")).unwrap();
        let path = c.cache_path(&id);
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with("blobdir/search/catalog/en"));

        let mut pinned = c.clone();
        pinned.cache_dir = Some(PathBuf::from("/srv/cache"));
        assert_eq!(pinned.cache_path(&id), PathBuf::from("/srv/cache"));
    }
}
