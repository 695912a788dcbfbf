//! Conversation state machine: tracks which step each phone is on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::model::VehicleClass;

/// The steps of the booking dialogue.
///
/// Progresses AskName → AskPickup → (PickupChoose) → AskDropoff →
/// (DropoffChoose) → AskDatetime → AskVehicle → Confirm → Done.
/// The restart command returns any step to AskName.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    AskName,
    AskPickup,
    PickupChoose,
    AskDropoff,
    DropoffChoose,
    AskDatetime,
    AskVehicle,
    Confirm,
    Done,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::AskName,
        Step::AskPickup,
        Step::PickupChoose,
        Step::AskDropoff,
        Step::DropoffChoose,
        Step::AskDatetime,
        Step::AskVehicle,
        Step::Confirm,
        Step::Done,
    ];

    /// Check if a transition from `self` to `target` is a dialogue edge.
    ///
    /// Staying on the same step is always allowed (re-prompts). Restarting to
    /// `AskName` is allowed from anywhere.
    pub fn can_transition_to(&self, target: Step) -> bool {
        use Step::*;
        if *self == target || target == AskName {
            return true;
        }
        matches!(
            (self, target),
            (AskName, AskPickup)
                | (AskPickup, PickupChoose)
                | (AskPickup, AskDropoff)
                | (PickupChoose, AskDropoff)
                | (AskDropoff, DropoffChoose)
                | (AskDropoff, AskDatetime)
                | (DropoffChoose, AskDatetime)
                | (AskDatetime, AskVehicle)
                | (AskVehicle, Confirm)
                | (Confirm, Done)
        )
    }

    /// Whether this step is the resting state after a booking.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskName => "ASK_NAME",
            Self::AskPickup => "ASK_PICKUP",
            Self::PickupChoose => "PICKUP_CHOOSE",
            Self::AskDropoff => "ASK_DROPOFF",
            Self::DropoffChoose => "DROPOFF_CHOOSE",
            Self::AskDatetime => "ASK_DATETIME",
            Self::AskVehicle => "ASK_VEHICLE",
            Self::Confirm => "CONFIRM",
            Self::Done => "DONE",
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::AskName
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown step: {s}"))
    }
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One disambiguation option returned by the address resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    /// Opaque resolver id (a Google place id in production).
    pub id: String,
    /// Full display address.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

impl AddressCandidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            name: None,
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(Coordinates { lat, lng });
        self
    }

    /// Short label: the place name, or the first comma-separated part of the address.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.text.split(',').next().unwrap_or(&self.text).trim(),
        }
    }
}

/// Scratch data collected while the dialogue is in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempData {
    pub name: Option<String>,
    pub pickup: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pickup_options: Vec<AddressCandidate>,
    pub dropoff: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropoff_options: Vec<AddressCandidate>,
    /// Normalized `YYYY-MM-DD`.
    pub booking_date: Option<String>,
    /// Normalized `HH:MM`.
    pub booking_time: Option<String>,
    pub vehicle: Option<VehicleClass>,
}

impl TempData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted per-phone conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub phone: String,
    pub step: Step,
    pub temp: TempData,
    /// Optimistic concurrency token; 0 means never persisted.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// A fresh conversation for a phone we have not seen before.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            step: Step::AskName,
            temp: TempData::default(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether this state has never been written to the store.
    pub fn is_new(&self) -> bool {
        self.version == 0
    }

    /// Reset to the start of the dialogue, clearing all scratch data.
    pub fn reset(&mut self) {
        self.step = Step::AskName;
        self.temp = TempData::default();
    }

    /// Move to `target` if the edge is legal. Returns false (and leaves the
    /// step untouched) otherwise.
    pub fn move_to(&mut self, target: Step) -> bool {
        if !self.step.can_transition_to(target) {
            tracing::warn!(
                phone = %self.phone,
                from = %self.step,
                to = %target,
                "Rejected illegal step transition"
            );
            return false;
        }
        self.step = target;
        if target.is_terminal() {
            self.temp = TempData::default();
        }
        true
    }
}
