//! Outbound message model and the `MessagingGateway` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// WhatsApp allows at most three reply buttons per message.
pub const MAX_BUTTONS: usize = 3;
/// WhatsApp caps reply button titles at 20 characters.
pub const MAX_BUTTON_TITLE: usize = 20;
/// Maximum rows across all sections of a list message.
pub const MAX_LIST_ROWS: usize = 10;
/// Maximum list row title length.
pub const MAX_ROW_TITLE: usize = 24;
/// Maximum list row description length.
pub const MAX_ROW_DESCRIPTION: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

/// A message the bot wants to send, independent of provider wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Buttons {
        body: String,
        buttons: Vec<Button>,
    },
    List {
        header: Option<String>,
        body: String,
        button_label: String,
        sections: Vec<ListSection>,
    },
    /// Asks the client to share its current location.
    LocationRequest {
        body: String,
    },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// The body text shown to the user.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { body }
            | Self::Buttons { body, .. }
            | Self::List { body, .. }
            | Self::LocationRequest { body } => body,
        }
    }

    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    /// All list rows, flattened across sections.
    pub fn list_rows(&self) -> Vec<&ListRow> {
        match self {
            Self::List { sections, .. } => sections.iter().flat_map(|s| s.rows.iter()).collect(),
            _ => Vec::new(),
        }
    }

    /// Check the structural limits the provider enforces.
    pub fn validate(&self) -> Result<(), ChannelError> {
        match self {
            Self::Buttons { buttons, .. } => {
                if buttons.is_empty() || buttons.len() > MAX_BUTTONS {
                    return Err(ChannelError::InvalidMessage(format!(
                        "button message needs 1..={MAX_BUTTONS} buttons, got {}",
                        buttons.len()
                    )));
                }
                if let Some(b) = buttons
                    .iter()
                    .find(|b| b.title.chars().count() > MAX_BUTTON_TITLE)
                {
                    return Err(ChannelError::InvalidMessage(format!(
                        "button title too long: {}",
                        b.title
                    )));
                }
            }
            Self::List { .. } => {
                let rows = self.list_rows();
                if rows.is_empty() || rows.len() > MAX_LIST_ROWS {
                    return Err(ChannelError::InvalidMessage(format!(
                        "list message needs 1..={MAX_LIST_ROWS} rows, got {}",
                        rows.len()
                    )));
                }
                for row in rows {
                    if row.title.chars().count() > MAX_ROW_TITLE {
                        return Err(ChannelError::InvalidMessage(format!(
                            "row title too long: {}",
                            row.title
                        )));
                    }
                    if row
                        .description
                        .as_deref()
                        .is_some_and(|d| d.chars().count() > MAX_ROW_DESCRIPTION)
                    {
                        return Err(ChannelError::InvalidMessage(format!(
                            "row description too long for {}",
                            row.id
                        )));
                    }
                }
            }
            Self::Text { .. } | Self::LocationRequest { .. } => {}
        }
        Ok(())
    }
}

/// An outbound message plus the plain text to send if the rich form fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub message: OutboundMessage,
    pub fallback: Option<String>,
}

impl Outbound {
    pub fn new(message: OutboundMessage) -> Self {
        Self {
            message,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }
}

impl From<OutboundMessage> for Outbound {
    fn from(message: OutboundMessage) -> Self {
        Self::new(message)
    }
}

/// Result of delivering one `Outbound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The rich form failed and the plain-text fallback went out instead.
    SentFallback,
    Failed,
}

/// Sends messages to a user on a chat provider.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Send a single message to `to`.
    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), ChannelError>;
}

/// Send an outbound message, falling back to plain text when the rich form
/// is rejected. Failures are logged, never propagated.
pub async fn deliver(gateway: &dyn MessagingGateway, to: &str, outbound: &Outbound) -> SendOutcome {
    let err = match gateway.send(to, &outbound.message).await {
        Ok(()) => return SendOutcome::Sent,
        Err(e) => e,
    };

    tracing::warn!(
        channel = gateway.name(),
        to,
        error = %err,
        "Outbound message failed"
    );

    let Some(fallback) = outbound.fallback.as_deref() else {
        return SendOutcome::Failed;
    };

    match gateway.send(to, &OutboundMessage::text(fallback)).await {
        Ok(()) => SendOutcome::SentFallback,
        Err(e) => {
            tracing::warn!(
                channel = gateway.name(),
                to,
                error = %e,
                "Fallback text also failed"
            );
            SendOutcome::Failed
        }
    }
}
