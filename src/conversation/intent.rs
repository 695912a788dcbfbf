//! Classify inbound payloads into dialogue intents.

use crate::channels::whatsapp_types::InboundPayload;
use crate::conversation::state::Coordinates;

/// Reply button ids.
pub mod buttons {
    pub const NEW_BOOKING: &str = "new_booking";
    pub const MY_BOOKINGS: &str = "my_bookings";
    pub const CHOOSE_TIME: &str = "choose_time";
    pub const CONFIRM: &str = "confirm_booking";
    pub const EDIT: &str = "edit_booking";
    pub const CANCEL: &str = "cancel_booking";
}

/// List row id prefixes.
pub mod rows {
    pub const PICKUP: &str = "pickup_";
    pub const DROPOFF: &str = "drop_";
    pub const VEHICLE: &str = "car_";
}

/// What an inbound message means, before looking at the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// "book" or the new-booking button: start over from any step.
    Restart,
    /// "my bookings" or the my-bookings button.
    MyBookings,
    Text(String),
    Location(Coordinates),
    ListSelect(String),
    Button(String),
}

impl Intent {
    pub fn classify(payload: InboundPayload) -> Self {
        match payload {
            InboundPayload::Text(text) => {
                let lowered = text.trim().to_lowercase();
                match lowered.as_str() {
                    "book" => Self::Restart,
                    "my bookings" => Self::MyBookings,
                    _ => Self::Text(text),
                }
            }
            InboundPayload::ButtonReply(id) => match id.as_str() {
                buttons::NEW_BOOKING => Self::Restart,
                buttons::MY_BOOKINGS => Self::MyBookings,
                _ => Self::Button(id),
            },
            InboundPayload::ListReply(id) => Self::ListSelect(id),
            InboundPayload::Location(c) => Self::Location(c),
        }
    }

    /// Whether the user asked to confirm, by button or by typing "confirm".
    pub fn is_confirm(&self) -> bool {
        self.is_command(buttons::CONFIRM, "confirm")
    }

    pub fn is_edit(&self) -> bool {
        self.is_command(buttons::EDIT, "edit")
    }

    pub fn is_cancel(&self) -> bool {
        self.is_command(buttons::CANCEL, "cancel")
    }

    fn is_command(&self, button: &str, word: &str) -> bool {
        match self {
            Self::Button(id) => id == button,
            Self::Text(text) => text.trim().eq_ignore_ascii_case(word),
            _ => false,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::MyBookings => "my_bookings",
            Self::Text(_) => "text",
            Self::Location(_) => "location",
            Self::ListSelect(_) => "list_select",
            Self::Button(_) => "button",
        }
    }
}
