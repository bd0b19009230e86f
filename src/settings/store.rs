use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::capture::error::{CaptureError, Result};
use crate::settings::types::ScanConfig;

/// Configuration file bound to a path.
pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<ScanConfig>,
}

impl ConfigStore {
    /// Open the store at `path`, loading the file if it exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = Self::load(&path)?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Load configuration from a JSON file, returning default on missing file.
    pub fn load(path: &Path) -> Result<ScanConfig> {
        if !path.exists() {
            tracing::debug!(target: "settings", "{} not found, using defaults", path.display());
            return Ok(ScanConfig::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| CaptureError::Config(format!("{}: {e}", path.display())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> ScanConfig {
        self.data.lock().clone()
    }

    /// Save the current configuration atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| CaptureError::Config(e.to_string()))?;
        let io_err = |e: std::io::Error| CaptureError::Config(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        tracing::debug!(target: "settings", "saved {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ContentMode;
    use crate::recognition::RecognitionMode;
    use tempfile::TempDir;

    fn temp_store() -> (ConfigStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join("scan.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let config = ConfigStore::load(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn load_parses_valid_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{"bridge":{"capacity":8}}"#).unwrap();
        assert_eq!(ConfigStore::load(&path).unwrap().bridge.capacity, 8);
    }

    #[test]
    fn load_returns_error_for_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, "not valid json!!!").unwrap();
        assert!(matches!(
            ConfigStore::load(&path),
            Err(CaptureError::Config(_))
        ));
    }

    #[test]
    fn save_round_trips_through_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(
            &path,
            r#"{"session":{"contentMode":"aspect_fit"},"recognition":{"mode":"single"}}"#,
        )
        .unwrap();
        let store = ConfigStore::open(path.clone()).unwrap();
        std::fs::remove_file(&path).unwrap();
        store.save().unwrap();

        let loaded = ConfigStore::load(&path).unwrap();
        assert_eq!(loaded.session.content_mode, ContentMode::AspectFit);
        assert_eq!(loaded.recognition.mode, RecognitionMode::Single);
        assert_eq!(loaded, store.config());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("scan.json");
        let store = ConfigStore::open(path.clone()).unwrap();
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_is_atomic() {
        let (store, dir) = temp_store();
        store.save().unwrap();
        assert!(
            !dir.path().join("scan.json.tmp").exists(),
            ".tmp file should be cleaned up after rename"
        );
    }

    #[test]
    fn open_loads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{"recognition":{"expiryMs":750}}"#).unwrap();
        let store = ConfigStore::open(path).unwrap();
        assert_eq!(store.config().recognition.expiry_ms, Some(750));
    }
}
