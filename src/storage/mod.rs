use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::engine::models::ConvertedAppRecord;
use crate::env;
use crate::i18n::Language;

pub const CONVERTED_APPS_KEY: &str = "oukaroConvertedApps";
pub const LANGUAGE_KEY: &str = "oukaroLanguage";

/// String key/value store persisted as one JSON object on disk.
#[derive(Clone)]
pub struct StorageManager {
    file: PathBuf,
}

impl StorageManager {
    pub fn new(data_dir: &Path) -> Self {
        // Best-effort directory creation; failures are surfaced on write.
        let _ = env::ensure_base_dirs(data_dir);
        Self {
            file: env::local_storage_file(data_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    fn read_items(&self) -> Result<BTreeMap<String, String>, String> {
        match fs::read(&self.file) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| format!("local storage is corrupt: {e}")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(format!("unable to read local storage: {err}")),
        }
    }

    fn write_items(&self, items: &BTreeMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("unable to create storage dir: {e}"))?;
        }
        let bytes = serde_json::to_vec_pretty(items)
            .map_err(|e| format!("unable to encode local storage: {e}"))?;
        fs::write(&self.file, bytes).map_err(|e| format!("unable to persist local storage: {e}"))
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        match self.read_items() {
            Ok(mut items) => items.remove(key),
            Err(err) => {
                warn!("storage: {err}");
                None
            }
        }
    }

    pub fn set_item(&self, key: &str, value: String) -> Result<(), String> {
        // A corrupt store is overwritten.
        let mut items = self.read_items().unwrap_or_default();
        items.insert(key.to_owned(), value);
        self.write_items(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), String> {
        let mut items = self.read_items().unwrap_or_default();
        if items.remove(key).is_some() {
            self.write_items(&items)?;
        }
        Ok(())
    }

    /// Converted records from the last session; missing or corrupt data reads as empty.
    pub fn load_converted_apps(&self) -> Vec<ConvertedAppRecord> {
        let Some(raw) = self.get_item(CONVERTED_APPS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<ConvertedAppRecord>>(&raw) {
            Ok(apps) => {
                debug!("storage: loaded {} converted apps", apps.len());
                apps
            }
            Err(err) => {
                warn!("failed to load converted apps: {err}");
                Vec::new()
            }
        }
    }

    pub fn save_converted_apps(&self, apps: &[ConvertedAppRecord]) -> Result<(), String> {
        let raw = serde_json::to_string(apps)
            .map_err(|e| format!("unable to encode converted apps: {e}"))?;
        self.set_item(CONVERTED_APPS_KEY, raw)
    }

    pub fn clear_converted_apps(&self) -> Result<(), String> {
        self.remove_item(CONVERTED_APPS_KEY)
    }

    pub fn load_language(&self) -> Option<String> {
        self.get_item(LANGUAGE_KEY)
    }

    pub fn save_language(&self, language: Language) -> Result<(), String> {
        self.set_item(LANGUAGE_KEY, language.code().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::engine::models::{AppRecord, ConversionMode};

    fn record(package: &str) -> ConvertedAppRecord {
        ConvertedAppRecord::new(
            AppRecord::new("App", package),
            ConversionMode::System,
            Utc::now(),
        )
    }

    #[test]
    fn converted_apps_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());
        assert!(storage.load_converted_apps().is_empty());

        let apps = vec![record("com.a"), record("com.b")];
        storage.save_converted_apps(&apps).unwrap();
        assert_eq!(storage.load_converted_apps(), apps);

        storage.clear_converted_apps().unwrap();
        assert!(storage.get_item(CONVERTED_APPS_KEY).is_none());
    }

    #[test]
    fn corrupt_values_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());
        storage
            .set_item(CONVERTED_APPS_KEY, "[{broken".into())
            .unwrap();
        assert!(storage.load_converted_apps().is_empty());
    }

    #[test]
    fn corrupt_store_file_reads_as_empty_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());
        fs::write(storage.path(), "garbage").unwrap();
        assert!(storage.load_converted_apps().is_empty());
        assert_eq!(storage.load_language(), None);

        storage.save_language(Language::Chinese).unwrap();
        assert_eq!(storage.load_language().as_deref(), Some("zh"));
    }

    #[test]
    fn keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());
        storage.save_language(Language::English).unwrap();
        storage.save_converted_apps(&[record("com.a")]).unwrap();
        storage.clear_converted_apps().unwrap();
        assert_eq!(storage.load_language().as_deref(), Some("en"));
    }
}
