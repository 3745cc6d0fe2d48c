use crate::db::{self, StoreError};
use crate::error::{AppError, Resource};
use crate::models::{Event, EventChanges, EventWithParticipants, NewEvent, Participant};
use crate::validation::{CreateEvent, UpdateEvent, parse_event_date};
use sqlx::SqlitePool;
use std::collections::HashMap;

#[derive(Clone)]
pub struct EventManager {
    pool: SqlitePool,
}

/// Maps storage failures of one operation; `RecordNotFound` means the event is gone.
fn store_error(message: &'static str) -> impl Fn(StoreError) -> AppError {
    move |err| match err {
        StoreError::RecordNotFound => AppError::NotFound(Resource::Event),
        StoreError::UniqueViolation | StoreError::Other(_) => AppError::Internal {
            message,
            source: err,
        },
    }
}

fn convert_date(input: &str) -> Result<chrono::DateTime<chrono::Utc>, AppError> {
    parse_event_date(input).ok_or_else(|| AppError::BadRequest("Invalid date".to_string()))
}

impl EventManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<EventWithParticipants>, AppError> {
        let on_error = store_error("Failed to fetch events");
        let events = db::list_events(&self.pool).await.map_err(&on_error)?;
        let participants = db::list_all_participants(&self.pool)
            .await
            .map_err(&on_error)?;

        let mut by_event: HashMap<String, Vec<Participant>> = HashMap::new();
        for participant in participants {
            by_event
                .entry(participant.event_id.clone())
                .or_default()
                .push(participant);
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let participants = by_event.remove(&event.id).unwrap_or_default();
                EventWithParticipants {
                    event,
                    participants,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<EventWithParticipants, AppError> {
        let on_error = store_error("Failed to fetch event");
        let event = db::find_event(&self.pool, id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Event))?;
        let participants = db::list_participants(&self.pool, &event.id)
            .await
            .map_err(&on_error)?;
        Ok(EventWithParticipants {
            event,
            participants,
        })
    }

    pub async fn create(&self, input: CreateEvent) -> Result<Event, AppError> {
        let date = convert_date(&input.date)?;
        let event = db::insert_event(
            &self.pool,
            NewEvent {
                name: input.name,
                description: input.description,
                date,
                location: input.location,
                capacity: input.capacity,
            },
        )
        .await
        .map_err(store_error("Failed to create event"))?;

        tracing::info!(event_id = %event.id, capacity = event.capacity, "event created");
        Ok(event)
    }

    /// A missing event wins over a bad `date`: existence is checked first.
    pub async fn update(&self, id: &str, input: UpdateEvent) -> Result<Event, AppError> {
        let on_error = store_error("Failed to update event");
        db::find_event(&self.pool, id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Event))?;

        let date = input.date.as_deref().map(convert_date).transpose()?;
        let changes = EventChanges {
            name: input.name,
            description: input.description,
            date,
            location: input.location,
            capacity: input.capacity,
        };
        db::update_event(&self.pool, id, changes)
            .await
            .map_err(&on_error)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        db::delete_event(&self.pool, id)
            .await
            .map_err(store_error("Failed to delete event"))?;
        tracing::info!(event_id = %id, "event deleted");
        Ok(())
    }
}
