//! Key/value persistence for progress blobs.
//!
//! Values are opaque JSON strings; the `load_*` helpers run them through the
//! normalizers, so a corrupt or missing entry always yields a usable value.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::progression::{parse_character_stats, CharacterStats};
use crate::questmaster::{parse_questmaster_save, QuestmasterSave};

pub const CHARACTER_STATS_KEY: &str = "character_stats_v1";
pub const QUESTMASTER_KEY: &str = "questmaster_v1";

pub trait SaveStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), String>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), String> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// All entries in one JSON object on disk. Every `set` rewrites the file
/// through a sibling temporary and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!(
                        "Save file '{}' is unreadable, starting fresh: {e}",
                        path.display()
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No save file at '{}', starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                log::warn!("Failed to read save file '{}': {e}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("Failed to create save dir '{}': {e}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| format!("Failed to serialize save file: {e}"))?;
        let temp_path = temporary_path(&self.path);
        fs::write(&temp_path, json)
            .map_err(|e| format!("Failed to write '{}': {e}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            format!(
                "Failed to move '{}' -> '{}': {e}",
                temp_path.display(),
                self.path.display()
            )
        })
    }
}

impl SaveStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), String> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save");
    path.with_file_name(format!("{file_name}.tmp"))
}

pub fn load_character_stats(store: &dyn SaveStore) -> CharacterStats {
    parse_character_stats(store.get(CHARACTER_STATS_KEY).as_deref())
}

pub fn save_character_stats(store: &mut dyn SaveStore, stats: &CharacterStats) -> Result<(), String> {
    let json = serde_json::to_string(stats)
        .map_err(|e| format!("Failed to serialize character stats: {e}"))?;
    store.set(CHARACTER_STATS_KEY, json)
}

pub fn load_questmaster_save(store: &dyn SaveStore, today: &str) -> QuestmasterSave {
    parse_questmaster_save(store.get(QUESTMASTER_KEY).as_deref(), today)
}

pub fn save_questmaster_save(store: &mut dyn SaveStore, save: &QuestmasterSave) -> Result<(), String> {
    let json = serde_json::to_string(save)
        .map_err(|e| format!("Failed to serialize quest save: {e}"))?;
    store.set(QUESTMASTER_KEY, json)
}
