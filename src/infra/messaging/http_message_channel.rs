use std::time::Duration;
use crate::domain::ports::MessageChannel;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::error;

/// Hands messages to an HTTP gateway (SMS/WhatsApp relay) with a bearer token.
pub struct HttpMessageChannel {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpMessageChannel {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to build message client: {}", e)))?;
        Ok(Self { client, api_url, api_key })
    }
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    to: &'a str,
    text: &'a str,
}

#[async_trait]
impl MessageChannel for HttpMessageChannel {
    async fn send_message(&self, phone: &str, text: &str) -> Result<(), AppError> {
        let res = self.client.post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&MessagePayload { to: phone, text })
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Message gateway connection error: {}", e);
                error!("{}", msg);
                AppError::SyncDeferred(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Message gateway failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::SyncDeferred(msg));
        }

        Ok(())
    }
}
