use std::path::{Path, PathBuf};
use std::time::Duration;

use failure::{err_msg, Error};
use log::{info, warn};
use serde_json::json;
use tokio::fs;
use tokio::time;
use uuid::Uuid;

use crate::db::TornedgeDatabase;
use crate::http_api_wrapper::HttpApiWrapper;
use crate::types::{ChatMessage, Config, FileRecord, Speaker};

pub const IMAGE_ID_KEY: &str = "image_id";
pub const CHAT_ROOM_ID_KEY: &str = "chat_room_id";

/// High-level client: owns the HTTP wrapper and the local id store, and
/// exposes one method per user-facing flow. Identifiers returned by the
/// server are persisted immediately so a restarted client keeps its pairing.
pub struct Tornedge {
    pub config: Config,
    pub http_client: HttpApiWrapper,
    pub db: TornedgeDatabase,
}

impl Tornedge {
    pub fn new(config: Config) -> Result<Self, Error> {
        config.endpoint()?;
        let http_client = HttpApiWrapper::new(&config);
        let db = TornedgeDatabase::load(Path::new(&config.store_path));
        Ok(Self {
            config,
            http_client,
            db,
        })
    }

    /// The locally stored identity, or an error telling the user which
    /// step is missing. No request is made without it.
    pub fn image_id(&self) -> Result<String, Error> {
        self.db
            .get_str(IMAGE_ID_KEY)
            .map(str::to_string)
            .ok_or_else(|| err_msg("no paper registered yet, upload a photo first"))
    }

    pub fn chat_room_id(&self) -> Result<String, Error> {
        self.db
            .get_str(CHAT_ROOM_ID_KEY)
            .map(str::to_string)
            .ok_or_else(|| err_msg("not in a chat room, create or enter one first"))
    }

    fn persist(&self) {
        if let Err(e) = self.db.save(Path::new(&self.config.store_path)) {
            warn!("failed to save the client store: {}", e);
        }
    }

    /// Register a photo of the torn paper. A new photo starts a new
    /// pairing, so ids from the previous paper are dropped first.
    pub async fn upload_image(&mut self, image_path: &Path) -> Result<String, Error> {
        let image_id = self.http_client.upload_image(image_path).await?;
        self.db.clear();
        self.db.set(IMAGE_ID_KEY, json!(image_id));
        self.persist();
        Ok(image_id)
    }

    pub async fn create_chat_room(&mut self) -> Result<String, Error> {
        let image_id = self.image_id()?;
        let chat_room_id = self.http_client.create_chat_room(&image_id).await?;
        self.db.set(CHAT_ROOM_ID_KEY, json!(chat_room_id));
        self.persist();
        info!("created chat room {}", chat_room_id);
        Ok(chat_room_id)
    }

    pub async fn enter_chat_room(&mut self) -> Result<String, Error> {
        let image_id = self.image_id()?;
        let chat_room_id = self.http_client.enter_chat_room(&image_id).await?;
        self.db.set(CHAT_ROOM_ID_KEY, json!(chat_room_id));
        self.persist();
        info!("entered chat room {}", chat_room_id);
        Ok(chat_room_id)
    }

    /// Send one message and return the refreshed log.
    pub async fn send_chat(&self, text: &str) -> Result<Vec<ChatMessage>, Error> {
        let image_id = self.image_id()?;
        let chat_room_id = self.chat_room_id()?;
        let line = ChatMessage::new(&image_id, text).to_line();
        let lines = self.http_client.send_chat(&chat_room_id, &line).await?;
        Ok(parse_chat_log(&lines))
    }

    pub async fn update_chat(&self) -> Result<Vec<ChatMessage>, Error> {
        let chat_room_id = self.chat_room_id()?;
        let lines = self.http_client.update_chat(&chat_room_id).await?;
        Ok(parse_chat_log(&lines))
    }

    /// Poll the room until the log grows past `seen` lines, returning the
    /// new tail. The screens refresh on demand; this is the same refresh in
    /// a loop for callers without a pull gesture.
    pub async fn wait_for_chat(
        &self,
        seen: usize,
        interval: Duration,
    ) -> Result<Vec<ChatMessage>, Error> {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            let log = self.update_chat().await?;
            if log.len() > seen {
                return Ok(log.into_iter().skip(seen).collect());
            }
        }
    }

    /// Tell the server we left, then drop the stored room id.
    pub async fn exit_chat_room(&mut self) -> Result<(), Error> {
        let image_id = self.image_id()?;
        self.http_client.exit_chat_room(&image_id).await?;
        self.db.remove(CHAT_ROOM_ID_KEY);
        self.persist();
        Ok(())
    }

    pub async fn send_file(&self, file_path: &Path) -> Result<(), Error> {
        let image_id = self.image_id()?;
        self.http_client.upload_file(&image_id, file_path).await
    }

    pub async fn receive_file(&self) -> Result<FileRecord, Error> {
        let image_id = self.image_id()?;
        let path = self.http_client.download_file(&image_id).await?;
        Ok(FileRecord::new(path))
    }

    /// Fetch the record's bytes from the server and write them under `dir`,
    /// named after the server-side basename.
    pub async fn save_received_file(
        &self,
        record: &FileRecord,
        dir: &Path,
    ) -> Result<PathBuf, Error> {
        let bytes = self.http_client.fetch_file(&record.path).await?;
        let mut name = record.file_name().to_string();
        if name.is_empty() {
            name = format!("tornedge_{}", Uuid::new_v4());
        }
        fs::create_dir_all(dir).await?;
        let dest = dir.join(name);
        fs::write(&dest, &bytes).await?;
        info!("saved received file to {}", dest.display());
        Ok(dest)
    }

    /// Debug seeding against a fresh server: registers the image, attaches
    /// the file and opens a room, storing both returned ids.
    pub async fn create_stub_data(
        &mut self,
        image_path: &Path,
        file_path: &Path,
    ) -> Result<(String, String), Error> {
        let (image_id, chat_room_id) = self
            .http_client
            .create_stub_data(image_path, file_path)
            .await?;
        self.db.clear();
        self.db.set(IMAGE_ID_KEY, json!(image_id));
        self.db.set(CHAT_ROOM_ID_KEY, json!(chat_room_id));
        self.persist();
        Ok((image_id, chat_room_id))
    }

    /// Classify a message against the stored identity. With no identity
    /// stored everything reads as the partner's.
    pub fn speaker(&self, message: &ChatMessage) -> Speaker {
        match self.db.get_str(IMAGE_ID_KEY) {
            Some(own_image_id) => message.speaker(own_image_id),
            None => Speaker::Partner,
        }
    }
}

/// Parse raw log lines into messages, skipping blank lines (the server's
/// log files end with a trailing newline).
pub fn parse_chat_log(lines: &[String]) -> Vec<ChatMessage> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| ChatMessage::from_line(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_client(dir: &TempDir) -> Tornedge {
        Tornedge::new(Config {
            server_uri: "http://localhost:56060".to_string(),
            store_path: dir.path().join("store.json").to_string_lossy().into_owned(),
        })
        .unwrap()
    }

    #[test]
    fn missing_ids_are_client_side_errors() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);
        assert!(client.image_id().is_err());
        assert!(client.chat_room_id().is_err());
    }

    #[test]
    fn a_bad_server_uri_is_rejected_up_front() {
        let result = Tornedge::new(Config {
            server_uri: "56060".to_string(),
            store_path: "store.json".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn speaker_follows_the_stored_image_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&dir);
        client.db.set(IMAGE_ID_KEY, json!("9"));

        assert_eq!(client.speaker(&ChatMessage::new("9", "hi")), Speaker::Me);
        assert_eq!(client.speaker(&ChatMessage::new("4", "hey")), Speaker::Partner);
    }

    #[test]
    fn without_an_identity_everything_is_the_partner() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);
        assert_eq!(client.speaker(&ChatMessage::new("9", "hi")), Speaker::Partner);
    }

    #[test]
    fn parse_chat_log_skips_blank_lines() {
        let lines = vec![
            "3, The chat room was created.".to_string(),
            "".to_string(),
            "3,hello".to_string(),
        ];
        let log = parse_chat_log(&lines);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], ChatMessage::new("3", "The chat room was created."));
        assert_eq!(log[1], ChatMessage::new("3", "hello"));
    }
}
