use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::types::{ApiResponse, FileInfo, Message, Reply, Update};
use super::{Backend, BackendError, FetchedObject};
use crate::config::BotConfig;

/// Extra time granted to the HTTP request on top of the long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API backend. Objects are documents posted to the target channel.
pub struct TelegramBackend {
    api_url: String,
    channel: String,
    client: Client,
    token: String,
}

impl TelegramBackend {
    pub fn new(config: &BotConfig) -> Result<Self, BackendError> {
        let client = Client::builder().build()?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            channel: config.channel.clone(),
            client,
            token: config.token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let resp: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("{method}: {e}")))?;

        if !resp.ok {
            return Err(BackendError::Rejected {
                method: method.to_string(),
                code: resp.error_code.unwrap_or(status),
                description: resp.description.unwrap_or_default(),
            });
        }

        resp.result
            .ok_or_else(|| BackendError::Malformed(format!("{method}: missing result")))
    }
}

#[async_trait]
impl Backend for TelegramBackend {
    async fn put_object(&self, file_name: &str, data: Bytes) -> Result<Message, BackendError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let length = data.len() as u64;

        let part = Part::stream_with_length(data, length)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new()
            .text("chat_id", self.channel.clone())
            .part("document", part);

        let request = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form);
        self.call("sendDocument", request).await
    }

    async fn get_object_url(&self, reference: &str) -> Result<String, BackendError> {
        let request = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", reference)]);
        // An unknown or foreign file_id is answered with 400 "invalid file_id".
        let info: FileInfo = self
            .call("getFile", request)
            .await
            .map_err(|e| match e {
                BackendError::Rejected { code: 400 | 404, .. } => {
                    BackendError::NotFound(reference.to_string())
                }
                other => other,
            })?;

        let file_path = info.file_path.ok_or_else(|| {
            BackendError::Malformed(format!("getFile: no file_path for {}", info.file_id))
        })?;
        Ok(self.file_url(&file_path))
    }

    async fn fetch(&self, url: &str) -> Result<FetchedObject, BackendError> {
        let resp = self.client.get(url).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(url.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!(
                "file download failed ({status}): {body}"
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = resp.bytes_stream().map_err(BackendError::from).boxed();

        Ok(FetchedObject { content_type, body })
    }

    async fn poll_events(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, BackendError> {
        let request = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
            ])
            .timeout(timeout + POLL_GRACE);
        self.call("getUpdates", request).await
    }

    async fn send_reply(&self, reply: &Reply) -> Result<(), BackendError> {
        let request = self.client.post(self.method_url("sendMessage")).json(reply);
        let _sent: Message = self.call("sendMessage", request).await?;
        Ok(())
    }

    async fn verify(&self) -> Result<(), BackendError> {
        let request = self.client.get(self.method_url("getMe"));
        let _me: serde_json::Value = self.call("getMe", request).await?;
        Ok(())
    }
}
