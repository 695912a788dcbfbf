//! WhatsApp Cloud API webhook types: the inbound envelope and what we
//! extract from it.

use serde::{Deserialize, Deserializer};

use crate::conversation::state::Coordinates;

/// Top-level webhook body: `{ object, entry: [{ changes: [{ value }] }] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    /// Messages that parsed; malformed siblings are skipped individually.
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<InboundMessage>,
    /// Delivery receipts. Carried so they deserialize, never acted on.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<InboundMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed webhook message");
                None
            }
        })
        .collect())
}

/// One user message as delivered by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Interactive {
    #[serde(default)]
    pub button_reply: Option<Reply>,
    #[serde(default)]
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// The part of an inbound message the conversation cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Text(String),
    ButtonReply(String),
    ListReply(String),
    Location(Coordinates),
}

impl WebhookEnvelope {
    /// All user messages in the envelope, in delivery order.
    pub fn messages(&self) -> impl Iterator<Item = &InboundMessage> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .flat_map(|c| c.value.messages.iter())
    }

    /// Consume the envelope, yielding owned messages.
    pub fn into_messages(self) -> Vec<InboundMessage> {
        self.entry
            .into_iter()
            .flat_map(|e| e.changes)
            .flat_map(|c| c.value.messages)
            .collect()
    }
}

impl InboundMessage {
    /// Extract the actionable payload. Returns `None` for messages with no
    /// text, reply or location (reactions, media, receipts).
    ///
    /// Button replies win over list replies, which win over location and
    /// text. Blank text counts as absent.
    pub fn payload(&self) -> Option<InboundPayload> {
        if let Some(interactive) = &self.interactive {
            if let Some(reply) = &interactive.button_reply {
                return Some(InboundPayload::ButtonReply(reply.id.clone()));
            }
            if let Some(reply) = &interactive.list_reply {
                return Some(InboundPayload::ListReply(reply.id.clone()));
            }
        }
        if let Some(loc) = &self.location {
            return Some(InboundPayload::Location(Coordinates {
                lat: loc.latitude,
                lng: loc.longitude,
            }));
        }
        self.text
            .as_ref()
            .map(|t| t.body.trim())
            .filter(|body| !body.is_empty())
            .map(|body| InboundPayload::Text(body.to_string()))
    }
}
