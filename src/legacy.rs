//! Submit flow of the first-generation single-page client. That client
//! predates the command protocol: it posts a role-based form (`type` plus
//! `receipt`/`image` file parts) and the server answers with either a plain
//! message or the matched image. Kept for servers still running the old
//! engine; the form is built inline because the old page did the same.

use std::path::Path;

use failure::{err_msg, Error};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tokio::fs;

use crate::types::Config;

/// Receiver-side result: the old server either explains itself in a
/// message or hands back the matched sender's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Message(String),
    Matched { image_path: String, image_name: String },
}

pub struct LegacyClient {
    http_client: Client,
    server_uri: String,
}

impl LegacyClient {
    pub fn new(config: &Config) -> Self {
        LegacyClient {
            http_client: Client::new(),
            server_uri: config.server_uri.trim_end_matches('/').to_string(),
        }
    }

    /// Sender role: register a receipt photo together with the image to
    /// hand over. Returns the server's status message.
    pub async fn submit_sender(&self, receipt: &Path, image: &Path) -> Result<String, Error> {
        let form = Form::new()
            .text("type", "sender")
            .part("receipt", file_part(receipt).await?)
            .part("image", file_part(image).await?);
        let body = self.post(form).await?;
        body["message"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| err_msg("message not found in the response"))
    }

    /// Receiver role: submit only the receipt photo and get the matched
    /// sender's image back.
    pub async fn submit_receiver(&self, receipt: &Path) -> Result<MatchOutcome, Error> {
        let form = Form::new()
            .text("type", "receiver")
            .part("receipt", file_part(receipt).await?);
        let body = self.post(form).await?;
        parse_receiver_response(&body)
    }

    async fn post(&self, form: Form) -> Result<Value, Error> {
        debug!("POST {} (legacy form)", self.server_uri);
        let body = self
            .http_client
            .post(self.server_uri.as_str())
            .multipart(form)
            .send()
            .await?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

async fn file_part(path: &Path) -> Result<Part, Error> {
    let bytes = fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file")
        .to_string();
    Ok(Part::bytes(bytes).file_name(file_name))
}

/// The old page branches on the presence of `message`: set means "no
/// match, here is why", unset means the match fields are populated.
fn parse_receiver_response(body: &Value) -> Result<MatchOutcome, Error> {
    if let Some(message) = body["message"].as_str() {
        return Ok(MatchOutcome::Message(message.to_string()));
    }
    match (body["imagepath"].as_str(), body["imagename"].as_str()) {
        (Some(image_path), Some(image_name)) => Ok(MatchOutcome::Matched {
            image_path: image_path.to_string(),
            image_name: image_name.to_string(),
        }),
        _ => Err(err_msg("neither a message nor a match in the response")),
    }
}
