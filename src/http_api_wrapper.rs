use std::path::Path;

use failure::{err_msg, Error, Fail};
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;

use crate::form_data::FormData;
use crate::types::Config;

/// Server-reported failure for a single command (`data.result` was
/// `"failure"`).
#[derive(Debug, Fail)]
#[fail(display = "command {} failed: {}", cmd, message)]
pub struct CommandFailed {
    pub cmd: String,
    pub message: String,
}

/// Thin wrapper over the Tornedge command endpoint. Every operation is a
/// multipart POST against the server root, selected by the `cmd` field; the
/// only GET is the static fetch of a shared file's bytes.
pub struct HttpApiWrapper {
    http_client: Client,
    server_uri: String,
}

impl HttpApiWrapper {
    pub fn new(config: &Config) -> Self {
        HttpApiWrapper {
            http_client: Client::new(),
            server_uri: config.server_uri.trim_end_matches('/').to_string(),
        }
    }

    /// Post one command body and return its `data` object, rejecting
    /// failure results and malformed responses.
    async fn post_command(&self, form: FormData) -> Result<Value, Error> {
        let cmd = form.cmd().to_string();
        debug!("POST {} cmd={}", self.server_uri, cmd);
        let response_body = self
            .http_client
            .post(self.server_uri.as_str())
            .multipart(form.into_form())
            .send()
            .await?
            .json::<Value>()
            .await?;
        command_data(&cmd, &response_body)
    }

    /// Register a photo of a torn paper. The returned image_id is the
    /// client's identity for every later call.
    pub async fn upload_image(&self, image_path: &Path) -> Result<String, Error> {
        let form = FormData::new("upload_image").file("image", image_path).await?;
        let data = self.post_command(form).await?;
        let image_id = id_field(&data, "image_id")?;
        info!("registered paper image, image_id={}", image_id);
        Ok(image_id)
    }

    /// Attach a file to the registered paper for the matched partner to
    /// pick up.
    pub async fn upload_file(&self, image_id: &str, file_path: &Path) -> Result<(), Error> {
        let form = FormData::new("upload_file")
            .field("image_id", image_id)
            .file("file", file_path)
            .await?;
        self.post_command(form).await?;
        Ok(())
    }

    /// Ask the server to match our paper and return the partner's shared
    /// file path.
    pub async fn download_file(&self, image_id: &str) -> Result<String, Error> {
        let form = FormData::with_fields("download_file", &[("image_id", image_id)]);
        let data = self.post_command(form).await?;
        data["file_path"]
            .as_str()
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .ok_or_else(|| err_msg("file path not found in the response"))
    }

    /// Fetch the bytes of a shared file. The server serves everything under
    /// its working directory over GET, and download paths come back
    /// server-relative (`./client_data/files/...`).
    pub async fn fetch_file(&self, file_path: &str) -> Result<Vec<u8>, Error> {
        let relative = file_path.trim_start_matches("./").trim_start_matches('/');
        let url = format!("{}/{}", self.server_uri, relative);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn create_chat_room(&self, image_id: &str) -> Result<String, Error> {
        let form = FormData::with_fields("create_chat_room", &[("image_id", image_id)]);
        let data = self.post_command(form).await?;
        id_field(&data, "chat_room_id")
    }

    /// Match our paper against the papers with an open room and return the
    /// partner's chat_room_id.
    pub async fn enter_chat_room(&self, image_id: &str) -> Result<String, Error> {
        let form = FormData::with_fields("enter_chat_room", &[("image_id", image_id)]);
        let data = self.post_command(form).await?;
        id_field(&data, "chat_room_id")
    }

    /// Append one message line to the room log. The server echoes the full
    /// log back, so a send doubles as a refresh.
    pub async fn send_chat(&self, chat_room_id: &str, message: &str) -> Result<Vec<String>, Error> {
        let form = FormData::with_fields(
            "send_chat",
            &[("chat_room_id", chat_room_id), ("message", message)],
        );
        let data = self.post_command(form).await?;
        Ok(chat_log(&data))
    }

    pub async fn update_chat(&self, chat_room_id: &str) -> Result<Vec<String>, Error> {
        let form = FormData::with_fields("update_chat", &[("chat_room_id", chat_room_id)]);
        let data = self.post_command(form).await?;
        Ok(chat_log(&data))
    }

    pub async fn exit_chat_room(&self, image_id: &str) -> Result<(), Error> {
        let form = FormData::with_fields("exit_chat_room", &[("image_id", image_id)]);
        self.post_command(form).await?;
        Ok(())
    }

    /// Debug seeding: register an image, attach a file and open a room in
    /// one shot. Only useful against a fresh server.
    pub async fn create_stub_data(
        &self,
        image_path: &Path,
        file_path: &Path,
    ) -> Result<(String, String), Error> {
        let form = FormData::new("debug_create_stub_data")
            .file("image", image_path)
            .await?
            .file("file", file_path)
            .await?;
        let data = self.post_command(form).await?;
        Ok((id_field(&data, "image_id")?, id_field(&data, "chat_room_id")?))
    }
}

/// Pull the `data` object out of a response body, turning a `failure`
/// result into a typed error.
fn command_data(cmd: &str, body: &Value) -> Result<Value, Error> {
    let data = body
        .get("data")
        .ok_or_else(|| err_msg(format!("no data object in the {} response", cmd)))?;
    match data["result"].as_str() {
        Some("success") => Ok(data.clone()),
        Some(_) => Err(CommandFailed {
            cmd: cmd.to_string(),
            message: data["message"].as_str().unwrap_or("no message").to_string(),
        }
        .into()),
        None => Err(err_msg(format!("no result field in the {} response", cmd))),
    }
}

/// The server stores ids as database row numbers, so a fresh upload comes
/// back as a JSON number while everything else round-trips them as strings.
/// Normalize both to strings; the ids stay opaque to the client.
fn id_field(data: &Value, key: &str) -> Result<String, Error> {
    match &data[key] {
        Value::String(id) if !id.is_empty() => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(err_msg(format!("{} not found in the response", key))),
    }
}

fn chat_log(data: &Value) -> Vec<String> {
    data["chat_log"]
        .as_array()
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| line.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
