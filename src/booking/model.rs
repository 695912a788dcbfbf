//! Booking data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vehicle classes offered in the fleet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Sedan,
    Executive,
    Mpv,
    Suv,
    Van,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 5] = [
        VehicleClass::Sedan,
        VehicleClass::Executive,
        VehicleClass::Mpv,
        VehicleClass::Suv,
        VehicleClass::Van,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Executive => "executive",
            Self::Mpv => "mpv",
            Self::Suv => "suv",
            Self::Van => "van",
        }
    }

    /// Human-readable label for list rows.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sedan => "Sedan",
            Self::Executive => "Executive",
            Self::Mpv => "MPV",
            Self::Suv => "SUV",
            Self::Van => "Van",
        }
    }
}

impl std::fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VehicleClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        VehicleClass::ALL
            .into_iter()
            .find(|v| v.as_str() == needle)
            .ok_or_else(|| format!("unknown vehicle class: {s}"))
    }
}

/// Where a booking came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Website,
    Whatsapp,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl std::str::FromStr for BookingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "website" => Ok(Self::Website),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(format!("unknown booking source: {other}")),
        }
    }
}

/// Lifecycle status of a booking. Only the first three are set by this
/// service; the rest belong to the admin side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Draft,
    Pending,
    Confirmed,
    DriverAssigned,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::DriverAssigned => "driver_assigned",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "driver_assigned" => Ok(Self::DriverAssigned),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Cash,
    Whatsapp,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Cash => "cash",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "cash" => Ok(Self::Cash),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Per-channel defaults applied to new bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPolicy {
    pub source: BookingSource,
    pub initial_status: BookingStatus,
    pub payment_method: PaymentMethod,
}

impl ChannelPolicy {
    /// Chat bookings are confirmed on the spot and paid in cash.
    pub const WHATSAPP: ChannelPolicy = ChannelPolicy {
        source: BookingSource::Whatsapp,
        initial_status: BookingStatus::Confirmed,
        payment_method: PaymentMethod::Cash,
    };
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        Self::WHATSAPP
    }
}

/// A chat customer, keyed by phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a booking from a finished conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub customer_id: Uuid,
    pub source: BookingSource,
    pub from_address: String,
    pub to_address: String,
    pub booking_date: String,
    pub booking_time: String,
    pub vehicle: VehicleClass,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub source: BookingSource,
    pub from_address: String,
    pub to_address: String,
    pub booking_date: String,
    pub booking_time: String,
    pub vehicle: VehicleClass,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Materialize a draft with a fresh id. Pricing happens elsewhere, so the
    /// amount starts at zero.
    pub fn from_draft(draft: BookingDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            source: draft.source,
            from_address: draft.from_address,
            to_address: draft.to_address,
            booking_date: draft.booking_date,
            booking_time: draft.booking_time,
            vehicle: draft.vehicle,
            status: draft.status,
            payment_method: draft.payment_method,
            amount: Decimal::ZERO,
            currency: "GBP".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_parse_is_case_insensitive() {
        assert_eq!("SUV".parse::<VehicleClass>().unwrap(), VehicleClass::Suv);
        assert_eq!(" van ".parse::<VehicleClass>().unwrap(), VehicleClass::Van);
        assert!("limo".parse::<VehicleClass>().is_err());
    }

    #[test]
    fn vehicle_display_matches_serde() {
        for v in VehicleClass::ALL {
            assert_eq!(serde_json::to_string(&v).unwrap(), format!("\"{v}\""));
        }
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            BookingStatus::Draft,
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::DriverAssigned,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(s.as_str().parse::<BookingStatus>().unwrap(), s);
        }
    }

    #[test]
    fn whatsapp_policy_defaults() {
        let policy = ChannelPolicy::default();
        assert_eq!(policy.source, BookingSource::Whatsapp);
        assert_eq!(policy.initial_status, BookingStatus::Confirmed);
        assert_eq!(policy.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn from_draft_sets_defaults() {
        let draft = BookingDraft {
            customer_id: Uuid::new_v4(),
            source: BookingSource::Whatsapp,
            from_address: "A".into(),
            to_address: "B".into(),
            booking_date: "2026-10-19".into(),
            booking_time: "10:15".into(),
            vehicle: VehicleClass::Mpv,
            payment_method: PaymentMethod::Cash,
            status: BookingStatus::Confirmed,
        };
        let booking = Booking::from_draft(draft.clone());
        assert_eq!(booking.amount, rust_decimal_macros::dec!(0));
        assert_eq!(booking.currency, "GBP");
        assert_eq!(booking.customer_id, draft.customer_id);
        assert_eq!(booking.vehicle, VehicleClass::Mpv);
    }
}
