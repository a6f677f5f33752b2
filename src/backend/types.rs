//! Bot API wire types, limited to the fields this service reads.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<u16>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub channel_post: Option<Message>,
}

impl Update {
    /// The message carried by this update. A channel post wins over a direct message.
    pub fn message(&self) -> Option<&Message> {
        self.channel_post.as_ref().or(self.message.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFile {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl MediaFile {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub document: Option<MediaFile>,
    #[serde(default)]
    pub audio: Option<MediaFile>,
    #[serde(default)]
    pub video: Option<MediaFile>,
    #[serde(default)]
    pub sticker: Option<MediaFile>,
}

impl Message {
    /// Reference of an object we just uploaded. The backend may reclassify a
    /// document as audio, video or sticker, so all four kinds are checked.
    pub fn stored_reference(&self) -> Option<&str> {
        first_reference(&[&self.document, &self.audio, &self.video, &self.sticker])
    }

    /// Reference a "get" command can link to. Audio is not linkable here.
    pub fn linkable_reference(&self) -> Option<&str> {
        first_reference(&[&self.document, &self.video, &self.sticker])
    }
}

fn first_reference<'a>(candidates: &[&'a Option<MediaFile>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|media| media.as_ref())
        .map(|media| media.file_id.as_str())
        .find(|id| !id.is_empty())
}

/// Metadata returned by `getFile`.
#[derive(Debug, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Outbound text message sent as a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
    pub reply_to_message_id: i64,
}
