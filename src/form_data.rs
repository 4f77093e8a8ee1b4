use std::path::Path;

use failure::Error;
use reqwest::multipart::{Form, Part};
use tokio::fs;

/// Multipart body for one server command. Every operation is a flat list of
/// text fields plus at most two file parts, so the builder just folds
/// key/value pairs behind the `cmd` field and attaches named files.
#[derive(Debug)]
pub struct FormData {
    cmd: String,
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

#[derive(Debug)]
struct FilePart {
    key: String,
    file_name: String,
    bytes: Vec<u8>,
}

impl FormData {
    pub fn new(cmd: &str) -> Self {
        FormData {
            cmd: cmd.to_string(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Fold a list of key/value pairs into a command body in one call.
    pub fn with_fields(cmd: &str, pairs: &[(&str, &str)]) -> Self {
        let mut form = FormData::new(cmd);
        for (key, value) in pairs {
            form = form.field(key, value);
        }
        form
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a file part read from disk. The part carries the source
    /// file's basename, like a browser form submission would.
    pub async fn file(mut self, key: &str, path: &Path) -> Result<Self, Error> {
        let bytes = fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file")
            .to_string();
        self.files.push(FilePart {
            key: key.to_string(),
            file_name,
            bytes,
        });
        Ok(self)
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn into_form(self) -> Form {
        let mut form = Form::new().text("cmd", self.cmd);
        for (key, value) in self.fields {
            form = form.text(key, value);
        }
        for file in self.files {
            form = form.part(file.key, Part::bytes(file.bytes).file_name(file.file_name));
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_pairs_behind_the_command() {
        let form = FormData::new("send_chat")
            .field("chat_room_id", "room_1")
            .field("message", "5,hi there");
        assert_eq!(form.cmd(), "send_chat");
        assert_eq!(
            form.fields,
            vec![
                ("chat_room_id".to_string(), "room_1".to_string()),
                ("message".to_string(), "5,hi there".to_string()),
            ]
        );
        assert!(form.files.is_empty());
    }

    #[test]
    fn with_fields_matches_manual_folding() {
        let folded = FormData::with_fields("create_chat_room", &[("image_id", "9")]);
        let manual = FormData::new("create_chat_room").field("image_id", "9");
        assert_eq!(folded.fields, manual.fields);
        assert_eq!(folded.cmd(), manual.cmd());
    }

    #[tokio::test]
    async fn attaches_file_parts_with_their_basename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"torn paper").unwrap();

        let form = FormData::new("upload_file")
            .field("image_id", "4")
            .file("file", &path)
            .await
            .unwrap();
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].key, "file");
        assert_eq!(form.files[0].file_name, "note.txt");
        assert_eq!(form.files[0].bytes, b"torn paper");

        // Conversion to a reqwest form must not lose parts.
        let _ = form.into_form();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FormData::new("upload_image")
            .file("image", &dir.path().join("absent.jpg"))
            .await;
        assert!(result.is_err());
    }
}
