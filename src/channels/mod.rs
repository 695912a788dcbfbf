//! Outbound messaging and the WhatsApp wire format.

pub mod channel;
pub mod whatsapp;
pub mod whatsapp_types;

pub use channel::*;
pub use whatsapp::WhatsAppChannel;
pub use whatsapp_types::{InboundMessage, InboundPayload, WebhookEnvelope};
