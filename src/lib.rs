mod db;
mod form_data;
mod http_api_wrapper;
mod legacy;
mod sdk;
mod types;

pub use db::TornedgeDatabase;
pub use form_data::FormData;
pub use http_api_wrapper::{CommandFailed, HttpApiWrapper};
pub use legacy::{LegacyClient, MatchOutcome};
pub use sdk::{parse_chat_log, Tornedge, CHAT_ROOM_ID_KEY, IMAGE_ID_KEY};
pub use types::{ChatMessage, Config, FileRecord, Speaker};
