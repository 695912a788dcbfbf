//! Dispatcher: runs one inbound message through dedup, the transition
//! engine, persistence and outbound delivery.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::booking::BookingFactory;
use crate::channels::channel::{MessagingGateway, Outbound, deliver};
use crate::channels::whatsapp_types::{InboundMessage, WebhookEnvelope};
use crate::conversation::engine::{Command, Transition, TransitionEngine};
use crate::conversation::intent::Intent;
use crate::conversation::prompts::{self, RECENT_BOOKINGS};
use crate::conversation::state::{ConversationState, Step};
use crate::error::DatabaseError;
use crate::store::Database;

/// How often the dedup table is swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing actionable: malformed event or input the current step ignores.
    Ignored,
    /// Message id already processed.
    Duplicate,
    /// State advanced and was persisted.
    Advanced { step: Step },
    /// Messages sent without changing state.
    Replied,
    BookingCreated { booking_id: Uuid },
    /// Booking could not be stored; the conversation stays at CONFIRM.
    BookingFailed,
    /// Another delivery changed the conversation first; event dropped.
    Conflict,
    /// Storage was unavailable; event dropped.
    Failed,
}

pub struct Dispatcher {
    db: Arc<dyn Database>,
    engine: TransitionEngine,
    gateway: Arc<dyn MessagingGateway>,
    bookings: BookingFactory,
}

impl Dispatcher {
    pub fn new(
        db: Arc<dyn Database>,
        engine: TransitionEngine,
        gateway: Arc<dyn MessagingGateway>,
        bookings: BookingFactory,
    ) -> Self {
        Self {
            db,
            engine,
            gateway,
            bookings,
        }
    }

    /// Process every message in a webhook body, in order.
    pub async fn handle_envelope(&self, envelope: WebhookEnvelope) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for message in envelope.into_messages() {
            outcomes.push(self.handle(message).await);
        }
        outcomes
    }

    /// Process a single inbound message. Never fails: every error is logged
    /// and folded into the outcome.
    pub async fn handle(&self, message: InboundMessage) -> DispatchOutcome {
        let Some(payload) = message.payload() else {
            tracing::debug!(message_id = %message.id, kind = ?message.kind, "Ignoring message without usable content");
            return DispatchOutcome::Ignored;
        };
        let phone = message.from.as_str();

        match self.db.mark_message_processed(&message.id, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(message_id = %message.id, phone, "Duplicate delivery");
                return DispatchOutcome::Duplicate;
            }
            Err(e) => {
                tracing::error!(message_id = %message.id, phone, error = %e, "Dedup check failed");
                return DispatchOutcome::Failed;
            }
        }

        let loaded = match self.db.get_conversation(phone).await {
            Ok(Some(state)) => state,
            Ok(None) => ConversationState::new(phone),
            Err(e) => {
                tracing::error!(phone, error = %e, "Failed to load conversation");
                return DispatchOutcome::Failed;
            }
        };

        let intent = Intent::classify(payload);
        tracing::info!(
            phone,
            message_id = %message.id,
            step = %loaded.step,
            intent = intent.kind(),
            "Inbound message"
        );

        let transition = self.engine.transition(&loaded, &intent, Utc::now()).await;
        if transition.is_ignored() {
            return DispatchOutcome::Ignored;
        }
        self.apply(&loaded, transition).await
    }

    async fn apply(&self, loaded: &ConversationState, transition: Transition) -> DispatchOutcome {
        let Transition {
            next,
            outbound,
            command,
        } = transition;
        let phone = loaded.phone.as_str();

        match (command, next) {
            (Some(Command::ListBookings), _) => {
                let list = self.recent_bookings(phone).await;
                self.send(phone, &[list]).await;
                DispatchOutcome::Replied
            }
            (Some(Command::CreateBooking), Some(next)) => {
                match self.bookings.create(loaded, &next).await {
                    Ok(booking) => {
                        self.send(phone, &outbound).await;
                        DispatchOutcome::BookingCreated {
                            booking_id: booking.id,
                        }
                    }
                    Err(e) if e.is_conflict() => {
                        tracing::info!(phone, "Confirm lost a race; dropping");
                        DispatchOutcome::Conflict
                    }
                    Err(e) => {
                        tracing::error!(phone, error = %e, "Booking creation failed");
                        self.send(
                            phone,
                            &[prompts::booking_failed(), prompts::summary(&loaded.temp)],
                        )
                        .await;
                        DispatchOutcome::BookingFailed
                    }
                }
            }
            (Some(Command::CreateBooking), None) => {
                tracing::error!(phone, "Booking requested without a next state");
                DispatchOutcome::Failed
            }
            (None, Some(next)) => match self.db.save_conversation(&next, loaded.version).await {
                Ok(_) => {
                    self.send(phone, &outbound).await;
                    DispatchOutcome::Advanced { step: next.step }
                }
                Err(DatabaseError::Conflict { .. }) => {
                    tracing::info!(phone, step = %loaded.step, "Stale conversation write; dropping");
                    DispatchOutcome::Conflict
                }
                Err(e) => {
                    tracing::error!(phone, error = %e, "Failed to save conversation");
                    DispatchOutcome::Failed
                }
            },
            (None, None) => {
                self.send(phone, &outbound).await;
                DispatchOutcome::Replied
            }
        }
    }

    async fn recent_bookings(&self, phone: &str) -> Outbound {
        let customer = match self.db.get_customer_by_phone(phone).await {
            Ok(Some(customer)) => customer,
            Ok(None) => return prompts::bookings_list(&[]),
            Err(e) => {
                tracing::warn!(phone, error = %e, "Customer lookup failed");
                return prompts::bookings_list(&[]);
            }
        };
        match self
            .db
            .list_bookings_for_customer(customer.id, RECENT_BOOKINGS)
            .await
        {
            Ok(bookings) => prompts::bookings_list(&bookings),
            Err(e) => {
                tracing::warn!(phone, error = %e, "Booking history lookup failed");
                prompts::bookings_list(&[])
            }
        }
    }

    async fn send(&self, phone: &str, outbound: &[Outbound]) {
        for message in outbound {
            deliver(self.gateway.as_ref(), phone, message).await;
        }
    }
}

/// Spawn a background task that forgets processed message ids older than
/// `ttl`, every ten minutes.
pub fn spawn_dedup_prune_task(db: Arc<dyn Database>, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match db.prune_processed_messages(Utc::now() - ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Pruned processed message ids"),
                Err(e) => tracing::warn!(error = %e, "Dedup prune failed"),
            }
        }
    })
}
