//! WhatsApp channel: sends messages through the Cloud (Graph) API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::channels::channel::{MessagingGateway, OutboundMessage};
use crate::config::WhatsAppConfig;
use crate::error::ChannelError;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// WhatsApp channel backed by the Graph API `/{phone_number_id}/messages` endpoint.
pub struct WhatsAppChannel {
    client: reqwest::Client,
    access_token: SecretString,
    phone_number_id: String,
    api_version: String,
    base_url: String,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: http_client(SEND_TIMEOUT),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
            api_version: config.api_version.clone(),
            base_url: GRAPH_BASE_URL.to_string(),
        }
    }

    /// Point the channel at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }
}

/// Build the Graph API request body for a message.
pub fn to_payload(to: &str, message: &OutboundMessage) -> Value {
    let interactive = match message {
        OutboundMessage::Text { body } => {
            return json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "body": body },
            });
        }
        OutboundMessage::Buttons { body, buttons } => json!({
            "type": "button",
            "body": { "text": body },
            "action": {
                "buttons": buttons
                    .iter()
                    .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": b.title } }))
                    .collect::<Vec<_>>(),
            },
        }),
        OutboundMessage::List {
            header,
            body,
            button_label,
            sections,
        } => {
            let mut interactive = json!({
                "type": "list",
                "body": { "text": body },
                "action": {
                    "button": button_label,
                    "sections": sections,
                },
            });
            if let Some(header) = header {
                interactive["header"] = json!({ "type": "text", "text": header });
            }
            interactive
        }
        OutboundMessage::LocationRequest { body } => json!({
            "type": "location_request_message",
            "body": { "text": body },
            "action": { "name": "send_location" },
        }),
    };

    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "interactive",
        "interactive": interactive,
    })
}

#[async_trait]
impl MessagingGateway for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        message.validate()?;

        let resp = self
            .client
            .post(self.api_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&to_payload(to, message))
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                name: "whatsapp".into(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to, interactive = message.is_interactive(), "WhatsApp message sent");
        Ok(())
    }
}
