//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::booking::model::{Booking, Customer};
use crate::conversation::state::{ConversationState, Step, TempData};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations. Statements
/// go through `gate` so that a booking transaction never interleaves with
/// other statements on the shared connection.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    gate: Mutex<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            gate: Mutex::new(()),
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn parse_column<T>(raw: &str, column: &str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| DatabaseError::Serialization(format!("{column}: {e}")))
}

fn row_err(context: &str) -> impl FnOnce(libsql::Error) -> DatabaseError + '_ {
    move |e| DatabaseError::Query(format!("{context}: {e}"))
}

/// Column order matches CONVERSATION_COLUMNS.
fn row_to_conversation(row: &libsql::Row) -> Result<ConversationState, DatabaseError> {
    let phone: String = row.get(0).map_err(row_err("conversation.phone"))?;
    let step_str: String = row.get(1).map_err(row_err("conversation.step"))?;
    let temp_str: String = row.get(2).map_err(row_err("conversation.temp"))?;
    let version: i64 = row.get(3).map_err(row_err("conversation.version"))?;
    let updated_str: String = row.get(4).map_err(row_err("conversation.updated_at"))?;

    let step: Step = step_str.parse().map_err(DatabaseError::Serialization)?;
    let temp: TempData = serde_json::from_str(&temp_str)
        .map_err(|e| DatabaseError::Serialization(format!("conversation.temp: {e}")))?;

    Ok(ConversationState {
        phone,
        step,
        temp,
        version,
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_customer(row: &libsql::Row) -> Result<Customer, DatabaseError> {
    let id_str: String = row.get(0).map_err(row_err("customer.id"))?;
    let created_str: String = row.get(3).map_err(row_err("customer.created_at"))?;
    Ok(Customer {
        id: parse_column(&id_str, "customer.id")?,
        phone: row.get(1).map_err(row_err("customer.phone"))?,
        name: row.get::<String>(2).ok(),
        created_at: parse_datetime(&created_str),
    })
}

/// Column order matches BOOKING_COLUMNS.
fn row_to_booking(row: &libsql::Row) -> Result<Booking, DatabaseError> {
    let id_str: String = row.get(0).map_err(row_err("booking.id"))?;
    let customer_str: String = row.get(1).map_err(row_err("booking.customer_id"))?;
    let source_str: String = row.get(2).map_err(row_err("booking.source"))?;
    let car_str: String = row.get(7).map_err(row_err("booking.car_type"))?;
    let status_str: String = row.get(8).map_err(row_err("booking.status"))?;
    let payment_str: String = row
        .get::<String>(9)
        .unwrap_or_else(|_| "cash".to_string());
    let amount_str: String = row.get(10).map_err(row_err("booking.amount"))?;
    let created_str: String = row.get(12).map_err(row_err("booking.created_at"))?;

    Ok(Booking {
        id: parse_column(&id_str, "booking.id")?,
        customer_id: parse_column(&customer_str, "booking.customer_id")?,
        source: parse_column(&source_str, "booking.source")?,
        from_address: row.get(3).map_err(row_err("booking.from_address"))?,
        to_address: row.get(4).map_err(row_err("booking.to_address"))?,
        booking_date: row.get(5).map_err(row_err("booking.booking_date"))?,
        booking_time: row.get(6).map_err(row_err("booking.booking_time"))?,
        vehicle: parse_column(&car_str, "booking.car_type")?,
        status: parse_column(&status_str, "booking.status")?,
        payment_method: parse_column(&payment_str, "booking.payment_method")?,
        amount: amount_str.parse::<Decimal>().unwrap_or(Decimal::ZERO),
        currency: row.get(11).map_err(row_err("booking.currency"))?,
        created_at: parse_datetime(&created_str),
    })
}

/// Insert-or-update a conversation guarded by its version. Returns the number
/// of rows written (0 means the guard failed).
async fn write_conversation(
    conn: &Connection,
    state: &ConversationState,
    expected_version: i64,
) -> Result<u64, DatabaseError> {
    let temp_json = serde_json::to_string(&state.temp)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    let now = Utc::now().to_rfc3339();
    let next_version = expected_version + 1;

    let written = if expected_version == 0 {
        conn.execute(
            "INSERT INTO conversations (phone, step, temp, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (phone) DO NOTHING",
            params![
                state.phone.as_str(),
                state.step.as_str(),
                temp_json,
                next_version,
                now
            ],
        )
        .await
    } else {
        conn.execute(
            "UPDATE conversations SET step = ?1, temp = ?2, version = ?3, updated_at = ?4
             WHERE phone = ?5 AND version = ?6",
            params![
                state.step.as_str(),
                temp_json,
                next_version,
                now,
                state.phone.as_str(),
                expected_version
            ],
        )
        .await
    };

    written.map_err(|e| DatabaseError::Query(format!("write_conversation: {e}")))
}

fn conflict(phone: &str, expected: i64) -> DatabaseError {
    DatabaseError::Conflict {
        entity: "conversation".into(),
        id: phone.to_string(),
        expected,
    }
}

// ── Trait implementation ────────────────────────────────────────────

const CONVERSATION_COLUMNS: &str = "phone, step, temp, version, updated_at";

const CUSTOMER_COLUMNS: &str = "id, phone, name, created_at";

const BOOKING_COLUMNS: &str = "id, customer_id, source, from_address, to_address, booking_date, booking_time, car_type, status, payment_method, amount, currency, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        let _gate = self.gate.lock().await;
        migrations::run_migrations(self.conn()).await
    }

    // ── Conversations ───────────────────────────────────────────────

    async fn get_conversation(
        &self,
        phone: &str,
    ) -> Result<Option<ConversationState>, DatabaseError> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE phone = ?1"),
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_conversation: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_conversation(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_conversation: {e}"))),
        }
    }

    async fn save_conversation(
        &self,
        state: &ConversationState,
        expected_version: i64,
    ) -> Result<i64, DatabaseError> {
        let _gate = self.gate.lock().await;
        let written = write_conversation(self.conn(), state, expected_version).await?;
        if written == 0 {
            return Err(conflict(&state.phone, expected_version));
        }

        debug!(phone = %state.phone, step = %state.step, version = expected_version + 1, "Conversation saved");
        Ok(expected_version + 1)
    }

    // ── Dedup ───────────────────────────────────────────────────────

    async fn mark_message_processed(
        &self,
        message_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let _gate = self.gate.lock().await;
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO processed_messages (message_id, received_at) VALUES (?1, ?2)
                 ON CONFLICT (message_id) DO NOTHING",
                params![message_id, received_at.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("mark_message_processed: {e}")))?;
        Ok(inserted == 1)
    }

    async fn prune_processed_messages(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let _gate = self.gate.lock().await;
        let count = self
            .conn()
            .execute(
                "DELETE FROM processed_messages WHERE received_at < ?1",
                params![cutoff.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("prune_processed_messages: {e}")))?;

        if count > 0 {
            info!(count, "Pruned processed message ids");
        }
        Ok(count as usize)
    }

    // ── Customers ───────────────────────────────────────────────────

    async fn find_or_create_customer(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Customer, DatabaseError> {
        let _gate = self.gate.lock().await;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO customers (id, phone, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (phone) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                phone,
                opt_text(name),
                Utc::now().to_rfc3339()
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("find_or_create_customer: {e}")))?;

        let mut rows = conn
            .query(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"),
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_or_create_customer: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_customer(&row),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "customer".into(),
                id: phone.to_string(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("find_or_create_customer: {e}"))),
        }
    }

    async fn get_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>, DatabaseError> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"),
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_customer_by_phone: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_customer(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_customer_by_phone: {e}"))),
        }
    }

    // ── Bookings ────────────────────────────────────────────────────

    async fn commit_booking(
        &self,
        state: &ConversationState,
        expected_version: i64,
        booking: &Booking,
    ) -> Result<i64, DatabaseError> {
        let _gate = self.gate.lock().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_booking begin: {e}")))?;

        let written = match write_conversation(&tx, state, expected_version).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };
        if written == 0 {
            let _ = tx.rollback().await;
            return Err(conflict(&state.phone, expected_version));
        }

        let inserted = tx
            .execute(
                &format!("INSERT INTO bookings ({BOOKING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    booking.id.to_string(),
                    booking.customer_id.to_string(),
                    booking.source.as_str(),
                    booking.from_address.as_str(),
                    booking.to_address.as_str(),
                    booking.booking_date.as_str(),
                    booking.booking_time.as_str(),
                    booking.vehicle.as_str(),
                    booking.status.as_str(),
                    booking.payment_method.as_str(),
                    booking.amount.to_string(),
                    booking.currency.as_str(),
                    booking.created_at.to_rfc3339()
                ],
            )
            .await;

        if let Err(e) = inserted {
            let _ = tx.rollback().await;
            return Err(DatabaseError::Query(format!("commit_booking insert: {e}")));
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_booking commit: {e}")))?;

        info!(
            booking_id = %booking.id,
            phone = %state.phone,
            "Booking committed with conversation state"
        );
        Ok(expected_version + 1)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, DatabaseError> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_booking: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_booking(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_booking: {e}"))),
        }
    }

    async fn list_bookings_for_customer(
        &self,
        customer_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Booking>, DatabaseError> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1
                     ORDER BY created_at DESC LIMIT ?2"
                ),
                params![customer_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_bookings_for_customer: {e}")))?;

        let mut bookings = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_booking(&row) {
                Ok(b) => bookings.push(b),
                Err(e) => {
                    tracing::warn!("Skipping booking row: {e}");
                }
            }
        }
        Ok(bookings)
    }
}
