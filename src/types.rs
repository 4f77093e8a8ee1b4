use std::env;

use failure::Error;
use serde_derive::{Serialize, Deserialize};
use url::Url;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub server_uri: String,
    pub store_path: String,
}

impl Config {
    /// Build a config from `TORNEDGE_SERVER` / `TORNEDGE_STORE`, falling
    /// back to the stock local server and a store file in the working
    /// directory.
    pub fn from_env() -> Self {
        Config {
            server_uri: env::var("TORNEDGE_SERVER")
                .unwrap_or_else(|_| "http://localhost:56060".to_string()),
            store_path: env::var("TORNEDGE_STORE")
                .unwrap_or_else(|_| "tornedge_store.json".to_string()),
        }
    }

    pub fn endpoint(&self) -> Result<Url, Error> {
        Url::parse(&self.server_uri).map_err(Error::from)
    }
}

/// One chat message. On the wire a message is a single log line with the
/// sender identifier and the text joined by a comma.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(sender: &str, text: &str) -> Self {
        ChatMessage {
            sender: sender.to_string(),
            text: text.to_string(),
        }
    }

    /// Parse one chat-log line, splitting on the first comma only so the
    /// text may itself contain commas. The server seeds each room log with
    /// `"<image_id>, The chat room was created."` (space after the comma),
    /// so both halves are trimmed. A line with no comma parses as text with
    /// no sender.
    pub fn from_line(line: &str) -> Self {
        match line.split_once(',') {
            Some((sender, text)) => ChatMessage {
                sender: sender.trim().to_string(),
                text: text.trim().to_string(),
            },
            None => ChatMessage {
                sender: String::new(),
                text: line.trim().to_string(),
            },
        }
    }

    pub fn to_line(&self) -> String {
        format!("{},{}", self.sender, self.text)
    }

    pub fn speaker(&self, own_image_id: &str) -> Speaker {
        if !own_image_id.is_empty() && self.sender == own_image_id {
            Speaker::Me
        } else {
            Speaker::Partner
        }
    }
}

/// Which side of the chat a message belongs to, relative to the local
/// image_id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Me,
    Partner,
}

/// Server-side path of a shared file, as returned by a download request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
}

impl FileRecord {
    pub fn new(path: String) -> Self {
        FileRecord { path }
    }

    /// Basename of the server-side path, used for display and for naming
    /// the local copy.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_line_round_trip() {
        let message = ChatMessage::new("42", "hello there");
        assert_eq!(message.to_line(), "42,hello there");
        assert_eq!(ChatMessage::from_line(&message.to_line()), message);
    }

    #[test]
    fn text_keeps_commas_after_the_first() {
        let message = ChatMessage::from_line("7,one, two, three");
        assert_eq!(message.sender, "7");
        assert_eq!(message.text, "one, two, three");
    }

    #[test]
    fn room_seed_line_parses() {
        let message = ChatMessage::from_line("3, The chat room was created.");
        assert_eq!(message.sender, "3");
        assert_eq!(message.text, "The chat room was created.");
    }

    #[test]
    fn line_without_comma_is_text_only() {
        let message = ChatMessage::from_line("hello");
        assert_eq!(message.sender, "");
        assert_eq!(message.text, "hello");
    }

    #[test]
    fn speaker_matches_own_image_id() {
        let message = ChatMessage::new("12", "hi");
        assert_eq!(message.speaker("12"), Speaker::Me);
        assert_eq!(message.speaker("13"), Speaker::Partner);
        // An empty local id never claims a message as its own.
        assert_eq!(ChatMessage::from_line("no comma here").speaker(""), Speaker::Partner);
    }

    #[test]
    fn endpoint_requires_an_absolute_uri() {
        let mut config = Config {
            server_uri: "http://localhost:56060".to_string(),
            store_path: "store.json".to_string(),
        };
        assert!(config.endpoint().is_ok());

        config.server_uri = "not a uri".to_string();
        assert!(config.endpoint().is_err());
    }

    #[test]
    fn file_record_exposes_the_basename() {
        assert_eq!(FileRecord::new("./client_data/files/report.pdf".to_string()).file_name(), "report.pdf");
        assert_eq!(FileRecord::new("report.pdf".to_string()).file_name(), "report.pdf");
        assert_eq!(FileRecord::new("./client_data/files/".to_string()).file_name(), "");
    }
}
