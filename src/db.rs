use crate::models::{
    Event, EventChanges, NewEvent, NewParticipant, Participant, ParticipantChanges,
};
use chrono::Utc;
use nanoid::nanoid;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Storage failures, classified once so callers can match on them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record to update or delete does not exist")]
    RecordNotFound,
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error(transparent)]
    Other(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation;
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::RecordNotFound;
        }
        StoreError::Other(err)
    }
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            date TIMESTAMP NOT NULL,
            location TEXT NOT NULL,
            capacity INTEGER NOT NULL CHECK (capacity > 0),
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS participants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            event_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            FOREIGN KEY (event_id) REFERENCES events (id) ON DELETE CASCADE,
            UNIQUE(event_id, email)
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS participants_event_id ON participants (event_id);")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn list_events(pool: &SqlitePool) -> Result<Vec<Event>, StoreError> {
    sqlx::query_as("SELECT * FROM events ORDER BY created_at, rowid")
        .fetch_all(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn find_event(pool: &SqlitePool, id: &str) -> Result<Option<Event>, StoreError> {
    sqlx::query_as("SELECT * FROM events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn insert_event(pool: &SqlitePool, new_event: NewEvent) -> Result<Event, StoreError> {
    let now = Utc::now();
    let event = sqlx::query_as(
        "INSERT INTO events (id, name, description, date, location, capacity, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(nanoid!(10))
    .bind(new_event.name)
    .bind(new_event.description)
    .bind(new_event.date)
    .bind(new_event.location)
    .bind(new_event.capacity)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(event)
}

/// Applies only the provided columns. An empty change set returns the stored row as is.
pub async fn update_event(
    pool: &SqlitePool,
    id: &str,
    changes: EventChanges,
) -> Result<Event, StoreError> {
    if changes.is_empty() {
        return find_event(pool, id).await?.ok_or(StoreError::RecordNotFound);
    }

    sqlx::query_as(
        "UPDATE events SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            date = COALESCE(?, date),
            location = COALESCE(?, location),
            capacity = COALESCE(?, capacity),
            updated_at = ?
         WHERE id = ? RETURNING *",
    )
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.date)
    .bind(changes.location)
    .bind(changes.capacity)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::RecordNotFound)
}

/// Participants of the event go with it (`ON DELETE CASCADE`).
pub async fn delete_event(pool: &SqlitePool, id: &str) -> Result<(), StoreError> {
    let deleted = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(StoreError::RecordNotFound);
    }
    Ok(())
}

pub async fn list_all_participants(pool: &SqlitePool) -> Result<Vec<Participant>, StoreError> {
    sqlx::query_as("SELECT * FROM participants ORDER BY created_at, rowid")
        .fetch_all(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn list_participants(
    pool: &SqlitePool,
    event_id: &str,
) -> Result<Vec<Participant>, StoreError> {
    sqlx::query_as("SELECT * FROM participants WHERE event_id = ? ORDER BY created_at, rowid")
        .bind(event_id)
        .fetch_all(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn find_participant(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Participant>, StoreError> {
    sqlx::query_as("SELECT * FROM participants WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn find_participant_in_event(
    pool: &SqlitePool,
    id: &str,
    event_id: &str,
) -> Result<Option<Participant>, StoreError> {
    sqlx::query_as("SELECT * FROM participants WHERE id = ? AND event_id = ?")
        .bind(id)
        .bind(event_id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn count_participants(pool: &SqlitePool, event_id: &str) -> Result<i64, StoreError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants WHERE event_id = ?")
        .bind(event_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Inserts the participant only while the event still has room.
///
/// The capacity comparison and the insert are one statement, so SQLite's
/// write lock keeps concurrent registrations from overshooting `capacity`.
/// Returns `None` when nothing was inserted (event full or gone).
pub async fn insert_participant_within_capacity(
    pool: &SqlitePool,
    new_participant: NewParticipant,
) -> Result<Option<Participant>, StoreError> {
    let now = Utc::now();
    let participant = sqlx::query_as(
        "INSERT INTO participants (id, name, email, phone, event_id, created_at, updated_at)
         SELECT ?, ?, ?, ?, ?, ?, ?
         WHERE (SELECT COUNT(*) FROM participants WHERE event_id = ?)
             < (SELECT capacity FROM events WHERE id = ?)
         RETURNING *",
    )
    .bind(nanoid!(10))
    .bind(new_participant.name)
    .bind(new_participant.email)
    .bind(new_participant.phone)
    .bind(&new_participant.event_id)
    .bind(now)
    .bind(now)
    .bind(&new_participant.event_id)
    .bind(&new_participant.event_id)
    .fetch_optional(pool)
    .await?;
    Ok(participant)
}

pub async fn update_participant(
    pool: &SqlitePool,
    id: &str,
    changes: ParticipantChanges,
) -> Result<Participant, StoreError> {
    if changes.is_empty() {
        return find_participant(pool, id)
            .await?
            .ok_or(StoreError::RecordNotFound);
    }

    sqlx::query_as(
        "UPDATE participants SET
            name = COALESCE(?, name),
            email = COALESCE(?, email),
            phone = COALESCE(?, phone),
            updated_at = ?
         WHERE id = ? RETURNING *",
    )
    .bind(changes.name)
    .bind(changes.email)
    .bind(changes.phone)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::RecordNotFound)
}

pub async fn delete_participant(pool: &SqlitePool, id: &str) -> Result<(), StoreError> {
    let deleted = sqlx::query("DELETE FROM participants WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(StoreError::RecordNotFound);
    }
    Ok(())
}
