use crate::db::{self, StoreError};
use crate::error::{AppError, Resource};
use crate::models::{NewParticipant, Participant, ParticipantChanges, ParticipantWithEvent};
use crate::validation::{CreateParticipant, UpdateParticipant};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct ParticipantManager {
    pool: SqlitePool,
}

/// Maps storage failures of one operation. A missing row on write is the
/// participant, a uniqueness violation is always the `(event_id, email)` pair.
fn store_error(message: &'static str) -> impl Fn(StoreError) -> AppError {
    move |err| match err {
        StoreError::RecordNotFound => AppError::NotFound(Resource::Participant),
        StoreError::UniqueViolation => AppError::DuplicateEmail,
        StoreError::Other(_) => AppError::Internal {
            message,
            source: err,
        },
    }
}

impl ParticipantManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// An unknown event yields an empty list, not an error.
    pub async fn list(&self, event_id: &str) -> Result<Vec<Participant>, AppError> {
        db::list_participants(&self.pool, event_id)
            .await
            .map_err(store_error("Failed to fetch participants"))
    }

    /// Checks the event first, then the participant within it; each miss has its own message.
    pub async fn get(&self, id: &str, event_id: &str) -> Result<ParticipantWithEvent, AppError> {
        let on_error = store_error("Failed to fetch participant");
        let event = db::find_event(&self.pool, event_id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Event))?;

        let participant = db::find_participant_in_event(&self.pool, id, &event.id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Participant))?;

        Ok(ParticipantWithEvent { participant, event })
    }

    pub async fn create(&self, input: CreateParticipant) -> Result<Participant, AppError> {
        let on_error = store_error("Failed to register participant");
        let event = db::find_event(&self.pool, &input.event_id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Event))?;

        let registered = db::count_participants(&self.pool, &event.id)
            .await
            .map_err(&on_error)?;
        if registered >= event.capacity {
            tracing::warn!(event_id = %event.id, capacity = event.capacity, "registration rejected, event full");
            return Err(AppError::CapacityExceeded);
        }

        let inserted = db::insert_participant_within_capacity(
            &self.pool,
            NewParticipant {
                name: input.name,
                email: input.email,
                phone: input.phone,
                event_id: event.id.clone(),
            },
        )
        .await
        .map_err(|err| {
            if matches!(err, StoreError::UniqueViolation) {
                tracing::info!(event_id = %event.id, "email already registered");
            }
            on_error(err)
        })?;

        match inserted {
            Some(participant) => {
                tracing::info!(participant_id = %participant.id, event_id = %event.id, "participant registered");
                Ok(participant)
            }
            // Lost a race: either the last seat went or the event was deleted meanwhile.
            None => match db::find_event(&self.pool, &event.id).await.map_err(&on_error)? {
                Some(_) => {
                    tracing::warn!(event_id = %event.id, capacity = event.capacity, "registration rejected, event full");
                    Err(AppError::CapacityExceeded)
                }
                None => Err(AppError::NotFound(Resource::Event)),
            },
        }
    }

    pub async fn update(&self, id: &str, input: UpdateParticipant) -> Result<Participant, AppError> {
        let on_error = store_error("Failed to update participant");
        let existing = db::find_participant(&self.pool, id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Participant))?;

        db::find_event(&self.pool, &existing.event_id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Event))?;

        let changes = ParticipantChanges {
            name: input.name,
            email: input.email,
            phone: input.phone,
        };
        db::update_participant(&self.pool, id, changes)
            .await
            .map_err(&on_error)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let on_error = store_error("Failed to delete participant");
        db::find_participant(&self.pool, id)
            .await
            .map_err(&on_error)?
            .ok_or(AppError::NotFound(Resource::Participant))?;

        // A concurrent delete between the lookup and here still surfaces as NotFound.
        db::delete_participant(&self.pool, id)
            .await
            .map_err(&on_error)?;
        tracing::info!(participant_id = %id, "participant deleted");
        Ok(())
    }
}
