//! BookingFactory: materializes exactly one booking per confirmed
//! conversation.

use std::sync::Arc;

use uuid::Uuid;

use crate::booking::model::{Booking, BookingDraft, ChannelPolicy, Customer};
use crate::conversation::state::{ConversationState, Step};
use crate::error::BookingError;
use crate::store::Database;

pub struct BookingFactory {
    db: Arc<dyn Database>,
    policy: ChannelPolicy,
}

impl BookingFactory {
    pub fn new(db: Arc<dyn Database>, policy: ChannelPolicy) -> Self {
        Self { db, policy }
    }

    /// Build a draft from a conversation awaiting confirmation.
    pub fn draft(
        &self,
        state: &ConversationState,
        customer_id: Uuid,
    ) -> Result<BookingDraft, BookingError> {
        if state.step != Step::Confirm {
            return Err(BookingError::NotConfirmable {
                phone: state.phone.clone(),
                step: state.step.to_string(),
            });
        }
        let missing = |field: &'static str| BookingError::Incomplete {
            phone: state.phone.clone(),
            field,
        };
        let temp = &state.temp;

        Ok(BookingDraft {
            customer_id,
            source: self.policy.source,
            from_address: temp.pickup.clone().ok_or_else(|| missing("pickup"))?,
            to_address: temp.dropoff.clone().ok_or_else(|| missing("dropoff"))?,
            booking_date: temp
                .booking_date
                .clone()
                .ok_or_else(|| missing("booking_date"))?,
            booking_time: temp
                .booking_time
                .clone()
                .ok_or_else(|| missing("booking_time"))?,
            vehicle: temp.vehicle.ok_or_else(|| missing("vehicle"))?,
            payment_method: self.policy.payment_method,
            status: self.policy.initial_status,
        })
    }

    /// Create the booking for `loaded` and persist `next` (the DONE state)
    /// in the same commit.
    ///
    /// Fails with a conflict, writing nothing, if the conversation changed
    /// since `loaded` was read.
    pub async fn create(
        &self,
        loaded: &ConversationState,
        next: &ConversationState,
    ) -> Result<Booking, BookingError> {
        // Validate before touching the customer table.
        let draft = self.draft(loaded, Uuid::nil())?;

        let customer: Customer = self
            .db
            .find_or_create_customer(&loaded.phone, loaded.temp.name.as_deref())
            .await?;
        let booking = Booking::from_draft(BookingDraft {
            customer_id: customer.id,
            ..draft
        });

        self.db
            .commit_booking(next, loaded.version, &booking)
            .await?;

        tracing::info!(
            phone = %loaded.phone,
            booking_id = %booking.id,
            customer_id = %customer.id,
            "Booking created"
        );
        Ok(booking)
    }
}
