//! Unified `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::model::{Booking, Customer};
use crate::conversation::state::ConversationState;
use crate::error::DatabaseError;

/// Backend-agnostic database trait covering conversations, dedup, customers
/// and bookings.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Conversations ───────────────────────────────────────────────

    /// Load the conversation for a phone, if one exists.
    async fn get_conversation(
        &self,
        phone: &str,
    ) -> Result<Option<ConversationState>, DatabaseError>;

    /// Conditionally write a conversation.
    ///
    /// Succeeds only if the stored version still equals `expected_version`
    /// (0 = the row must not exist yet). Returns the new version, or
    /// `DatabaseError::Conflict` when another write got there first.
    async fn save_conversation(
        &self,
        state: &ConversationState,
        expected_version: i64,
    ) -> Result<i64, DatabaseError>;

    // ── Dedup ───────────────────────────────────────────────────────

    /// Record a provider message id. Returns `true` the first time an id is
    /// seen and `false` on every redelivery.
    async fn mark_message_processed(
        &self,
        message_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Forget processed ids recorded before `cutoff`. Returns the number removed.
    async fn prune_processed_messages(&self, cutoff: DateTime<Utc>)
    -> Result<usize, DatabaseError>;

    // ── Customers ───────────────────────────────────────────────────

    /// Look up a customer by phone, creating one with `name` if absent.
    async fn find_or_create_customer(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Customer, DatabaseError>;

    async fn get_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>, DatabaseError>;

    // ── Bookings ────────────────────────────────────────────────────

    /// Atomically write the post-confirmation conversation state and insert
    /// the booking. Nothing is written unless the conversation is still at
    /// `expected_version`. Returns the conversation's new version.
    async fn commit_booking(
        &self,
        state: &ConversationState,
        expected_version: i64,
        booking: &Booking,
    ) -> Result<i64, DatabaseError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, DatabaseError>;

    /// Most recent bookings for a customer, newest first.
    async fn list_bookings_for_customer(
        &self,
        customer_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Booking>, DatabaseError>;
}
