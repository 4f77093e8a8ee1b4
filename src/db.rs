use std::collections::HashMap;
use std::fs;
use std::path::Path;

use failure::Error;
use log::warn;
use serde_json::Value;

/// Client-side key store for the identifiers the server hands back
/// (image_id, chat_room_id). Persisted as a flat JSON object so the ids
/// survive restarts, like the browser localStorage it replaces.
#[derive(Debug, Default)]
pub struct TornedgeDatabase {
    data: HashMap<String, Value>,
}

impl TornedgeDatabase {
    pub fn new() -> Self {
        TornedgeDatabase {
            data: HashMap::new(),
        }
    }

    /// Load the store from `path`. A missing or unreadable file yields an
    /// empty store rather than an error: first run and corrupt store look
    /// the same to the caller.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return TornedgeDatabase::new(),
        };
        match serde_json::from_str::<HashMap<String, Value>>(&raw) {
            Ok(data) => TornedgeDatabase { data },
            Err(e) => {
                warn!("store file {} is not valid JSON ({}), starting empty", path.display(), e);
                TornedgeDatabase::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let raw = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|value| value.as_str())
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove_clear() {
        let mut db = TornedgeDatabase::new();
        db.set("image_id", json!("7"));
        assert!(db.contains("image_id"));
        assert_eq!(db.get_str("image_id"), Some("7"));

        db.set("chat_room_id", json!("room_x"));
        db.remove("image_id");
        assert!(!db.contains("image_id"));
        assert!(db.contains("chat_room_id"));

        db.clear();
        assert!(!db.contains("chat_room_id"));
    }

    #[test]
    fn get_str_rejects_non_strings() {
        let mut db = TornedgeDatabase::new();
        db.set("image_id", json!(7));
        assert_eq!(db.get_str("image_id"), None);
        assert!(db.get("image_id").is_some());
    }

    #[test]
    fn loading_a_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = TornedgeDatabase::load(&dir.path().join("absent.json"));
        assert!(!db.contains("image_id"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut db = TornedgeDatabase::new();
        db.set("image_id", json!("11"));
        db.set("chat_room_id", json!("chat_room202101_011200_00"));
        db.save(&path).unwrap();

        let reloaded = TornedgeDatabase::load(&path);
        assert_eq!(reloaded.get_str("image_id"), Some("11"));
        assert_eq!(reloaded.get_str("chat_room_id"), Some("chat_room202101_011200_00"));
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        let db = TornedgeDatabase::load(&path);
        assert!(!db.contains("image_id"));
    }
}
