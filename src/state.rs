use crate::events::EventManager;
use crate::participants::ParticipantManager;
use sqlx::SqlitePool;

/// Both managers share the one pool created at startup.
#[derive(Clone)]
pub struct AppState {
    pub events: EventManager,
    pub participants: ParticipantManager,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            events: EventManager::new(pool.clone()),
            participants: ParticipantManager::new(pool),
        }
    }
}
