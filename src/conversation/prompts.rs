//! User-facing messages for each step of the booking dialogue.

use crate::booking::model::{Booking, VehicleClass};
use crate::channels::channel::{
    Button, ListRow, ListSection, MAX_ROW_DESCRIPTION, MAX_ROW_TITLE, Outbound, OutboundMessage,
};
use crate::conversation::intent::{buttons, rows};
use crate::conversation::state::{AddressCandidate, TempData};
use crate::datetime::QuickOption;

/// Disambiguation lists never show more than this many candidates.
pub const MAX_CANDIDATES: usize = 8;

/// Bookings shown by "my bookings".
pub const RECENT_BOOKINGS: usize = 3;

const ELLIPSIS: char = '…';

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Which leg of the trip a candidate list is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Pickup,
    Dropoff,
}

impl Leg {
    pub fn row_prefix(&self) -> &'static str {
        match self {
            Self::Pickup => rows::PICKUP,
            Self::Dropoff => rows::DROPOFF,
        }
    }

    fn header(&self) -> &'static str {
        match self {
            Self::Pickup => "Pickup Location",
            Self::Dropoff => "Destination",
        }
    }
}

pub fn name_prompt() -> Outbound {
    OutboundMessage::text("Welcome! What is your name?").into()
}

/// Ask for the pickup as a shared location, with typed address as fallback.
pub fn pickup_prompt(name: &str) -> Outbound {
    Outbound::new(OutboundMessage::LocationRequest {
        body: format!("📍 Where should we pick you up, {name}?"),
    })
    .with_fallback("📍 Please type your pickup address.")
}

pub fn pickup_not_found() -> Outbound {
    OutboundMessage::text(
        "😕 We couldn't find that pickup address. Please type it again or share your location.",
    )
    .into()
}

pub fn dropoff_prompt() -> Outbound {
    OutboundMessage::text("🏁 Where are you going?").into()
}

pub fn dropoff_not_found() -> Outbound {
    OutboundMessage::text("😕 We couldn't find that destination. Please try a different address.")
        .into()
}

/// Disambiguation list for pickup or dropoff candidates, capped at
/// `MAX_CANDIDATES` rows.
pub fn candidate_list(leg: Leg, candidates: &[AddressCandidate]) -> Outbound {
    let candidate_rows = candidates
        .iter()
        .take(MAX_CANDIDATES)
        .map(|c| ListRow {
            id: format!("{}{}", leg.row_prefix(), c.id),
            title: truncate(c.label(), MAX_ROW_TITLE),
            description: Some(truncate(&c.text, MAX_ROW_DESCRIPTION)),
        })
        .collect();

    let mut fallback = String::from("Please reply with one of these addresses:\n");
    for c in candidates.iter().take(MAX_CANDIDATES) {
        fallback.push_str(&format!("• {}\n", c.text));
    }

    Outbound::new(OutboundMessage::List {
        header: Some(leg.header().to_string()),
        body: "Please select the best match:".to_string(),
        button_label: "Select".to_string(),
        sections: vec![ListSection {
            title: "Results".to_string(),
            rows: candidate_rows,
        }],
    })
    .with_fallback(fallback.trim_end())
}

pub fn time_prompt() -> Outbound {
    Outbound::new(OutboundMessage::Buttons {
        body: "🕒 When is the pickup?\n\nSelect a quick option or type (e.g. 'tomorrow 10am')"
            .to_string(),
        buttons: vec![Button::new(buttons::CHOOSE_TIME, "Quick Options")],
    })
    .with_fallback("🕒 When is the pickup? Type 'asap', '+30m' or a time like 'tomorrow 10am'.")
}

pub fn time_list() -> Outbound {
    Outbound::new(OutboundMessage::List {
        header: None,
        body: "Select a pickup window:".to_string(),
        button_label: "Select".to_string(),
        sections: vec![ListSection {
            title: "Options".to_string(),
            rows: QuickOption::ALL
                .into_iter()
                .map(|q| ListRow {
                    id: q.id().to_string(),
                    title: q.title().to_string(),
                    description: None,
                })
                .collect(),
        }],
    })
    .with_fallback("Reply 'asap', '+15m', '+30m' or '+1h'.")
}

pub fn time_not_understood() -> Outbound {
    OutboundMessage::text(
        "Sorry, I couldn't understand that time. Try 'tomorrow 10am', '18:30' or 'in 30 mins'.",
    )
    .into()
}

pub fn time_in_past() -> Outbound {
    OutboundMessage::text("That time has already passed. Please choose a time in the future.")
        .into()
}

pub fn vehicle_list() -> Outbound {
    let names: Vec<&str> = VehicleClass::ALL.iter().map(|v| v.label()).collect();
    Outbound::new(OutboundMessage::List {
        header: None,
        body: "Select your car type:".to_string(),
        button_label: "Choose Car".to_string(),
        sections: vec![ListSection {
            title: "Fleet Options".to_string(),
            rows: VehicleClass::ALL
                .into_iter()
                .map(|v| ListRow {
                    id: format!("{}{}", rows::VEHICLE, v.as_str()),
                    title: v.label().to_string(),
                    description: None,
                })
                .collect(),
        }],
    })
    .with_fallback(format!("Reply with a car type: {}.", names.join(", ")))
}

fn summary_text(temp: &TempData) -> String {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let car = temp
        .vehicle
        .map(|v| v.label().to_uppercase())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "📋 *Booking Summary*\n\n📍 From: {}\n🏁 To: {}\n📅 Date: {}\n🕒 Time: {}\n🚗 Car: {}",
        or_dash(&temp.pickup),
        or_dash(&temp.dropoff),
        or_dash(&temp.booking_date),
        or_dash(&temp.booking_time),
        car
    )
}

/// Booking summary with confirm / edit / cancel buttons.
pub fn summary(temp: &TempData) -> Outbound {
    let body = summary_text(temp);
    let fallback =
        format!("{body}\n\nReply 'confirm' to book, 'edit' to start over or 'cancel' to stop.");
    Outbound::new(OutboundMessage::Buttons {
        body,
        buttons: vec![
            Button::new(buttons::CONFIRM, "Confirm & Book"),
            Button::new(buttons::EDIT, "Edit"),
            Button::new(buttons::CANCEL, "Cancel"),
        ],
    })
    .with_fallback(fallback)
}

pub fn booking_failed() -> Outbound {
    OutboundMessage::text("⚠️ We couldn't save your booking. Please confirm again.").into()
}

pub fn editing() -> Outbound {
    OutboundMessage::text("✏️ No problem, let's go through it again.").into()
}

pub fn cancelled() -> Outbound {
    OutboundMessage::text("❌ Booking cancelled. Nothing was booked.").into()
}

pub fn post_booking_menu() -> Outbound {
    Outbound::new(OutboundMessage::Buttons {
        body: "✅ Booking Confirmed! We are looking for your driver.".to_string(),
        buttons: vec![
            Button::new(buttons::NEW_BOOKING, "Book Another"),
            Button::new(buttons::MY_BOOKINGS, "View All"),
        ],
    })
    .with_fallback(
        "✅ Booking Confirmed! Reply 'book' for another ride or 'my bookings' to see your rides.",
    )
}

pub fn main_menu() -> Outbound {
    Outbound::new(OutboundMessage::Buttons {
        body: "Welcome! How can we help you today?".to_string(),
        buttons: vec![
            Button::new(buttons::NEW_BOOKING, "Book a Ride"),
            Button::new(buttons::MY_BOOKINGS, "My Bookings"),
        ],
    })
    .with_fallback("Reply 'book' to book a ride or 'my bookings' to see your rides.")
}

/// Plain-text list of recent bookings, newest first.
pub fn bookings_list(bookings: &[Booking]) -> Outbound {
    if bookings.is_empty() {
        return OutboundMessage::text("You have no bookings.").into();
    }
    let mut text = format!("📋 *Last {} Bookings:*\n", bookings.len().min(RECENT_BOOKINGS));
    for (i, b) in bookings.iter().take(RECENT_BOOKINGS).enumerate() {
        text.push_str(&format!(
            "\n{}. {}\n📅 {} at {}\n",
            i + 1,
            truncate(&b.to_address, 25),
            b.booking_date,
            b.booking_time
        ));
    }
    OutboundMessage::text(text.trim_end()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::{BookingDraft, BookingSource, BookingStatus, PaymentMethod};

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 24), "short");
        assert_eq!(truncate("exactly-five", 12), "exactly-five");
        let cut = truncate("The Grand Central Railway Terminus", 24);
        assert_eq!(cut.chars().count(), 24);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn candidate_list_caps_and_truncates() {
        let candidates: Vec<_> = (0..12)
            .map(|i| {
                AddressCandidate::new(
                    format!("p{i}"),
                    format!(
                        "{i} A Very Long Street Name Indeed, Some Borough, Greater London, England, United Kingdom"
                    ),
                )
            })
            .collect();
        let out = candidate_list(Leg::Dropoff, &candidates);
        out.message.validate().unwrap();
        let rows = out.message.list_rows();
        assert_eq!(rows.len(), MAX_CANDIDATES);
        for row in &rows {
            assert!(row.id.starts_with("drop_"));
            assert!(row.title.chars().count() <= 24);
            let desc = row.description.as_deref().unwrap();
            assert!(desc.chars().count() <= 72);
            assert!(desc.ends_with('…'));
        }
        assert_eq!(rows[0].title, "0 A Very Long Street Na…");
        assert!(out.fallback.is_some());
    }

    #[test]
    fn pickup_and_dropoff_rows_are_distinct() {
        let c = [AddressCandidate::new("x", "X Road"), AddressCandidate::new("y", "Y Road")];
        let p = candidate_list(Leg::Pickup, &c);
        let d = candidate_list(Leg::Dropoff, &c);
        assert_eq!(p.message.list_rows()[0].id, "pickup_x");
        assert_eq!(d.message.list_rows()[0].id, "drop_x");
    }

    #[test]
    fn pickup_prompt_has_text_fallback() {
        let out = pickup_prompt("John");
        assert!(matches!(out.message, OutboundMessage::LocationRequest { .. }));
        assert!(out.message.body().contains("John"));
        assert_eq!(
            out.fallback.as_deref(),
            Some("📍 Please type your pickup address.")
        );
    }

    #[test]
    fn fixed_messages_are_valid() {
        for out in [
            time_prompt(),
            time_list(),
            vehicle_list(),
            post_booking_menu(),
            main_menu(),
            summary(&TempData::default()),
        ] {
            out.message.validate().unwrap();
        }
    }

    #[test]
    fn vehicle_rows_use_car_prefix() {
        let out = vehicle_list();
        let ids: Vec<_> = out.message.list_rows().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["car_sedan", "car_executive", "car_mpv", "car_suv", "car_van"]);
    }

    #[test]
    fn summary_lists_every_field() {
        let temp = TempData {
            pickup: Some("10 Downing St".into()),
            dropoff: Some("King's Cross".into()),
            booking_date: Some("2026-10-19".into()),
            booking_time: Some("10:15".into()),
            vehicle: Some(VehicleClass::Mpv),
            ..Default::default()
        };
        let out = summary(&temp);
        let body = out.message.body();
        for needle in ["10 Downing St", "King's Cross", "2026-10-19", "10:15", "MPV"] {
            assert!(body.contains(needle), "summary missing {needle}");
        }
        match &out.message {
            OutboundMessage::Buttons { buttons, .. } => {
                let ids: Vec<_> = buttons.iter().map(|b| b.id.as_str()).collect();
                assert_eq!(ids, ["confirm_booking", "edit_booking", "cancel_booking"]);
            }
            other => panic!("expected buttons, got {other:?}"),
        }
    }

    #[test]
    fn bookings_list_formats_recent() {
        let booking = |to: &str| {
            Booking::from_draft(BookingDraft {
                customer_id: uuid::Uuid::new_v4(),
                source: BookingSource::Whatsapp,
                from_address: "A".into(),
                to_address: to.into(),
                booking_date: "2026-10-19".into(),
                booking_time: "10:15".into(),
                vehicle: VehicleClass::Sedan,
                payment_method: PaymentMethod::Cash,
                status: BookingStatus::Confirmed,
            })
        };
        let out = bookings_list(&[
            booking("Heathrow Airport Terminal 5, Longford, Hounslow"),
            booking("Gatwick"),
        ]);
        let body = out.message.body();
        assert!(body.contains("Last 2 Bookings"));
        assert!(body.contains("1. Heathrow Airport Termina…"));
        assert!(body.contains("2. Gatwick"));
        assert!(body.contains("2026-10-19 at 10:15"));
    }

    #[test]
    fn no_bookings() {
        assert_eq!(bookings_list(&[]).message.body(), "You have no bookings.");
    }
}
