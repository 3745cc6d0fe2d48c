use crate::db::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use validator::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Event,
    Participant,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Event => f.write_str("Event"),
            Resource::Participant => f.write_str("Participant"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("Event is at full capacity")]
    CapacityExceeded,
    #[error("Email already registered for this event")]
    DuplicateEmail,
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::CapacityExceeded
            | AppError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Field name -> failed rule messages, falling back to the rule code.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, failures)| {
            let messages = failures
                .iter()
                .map(|failure| {
                    failure
                        .message
                        .as_ref()
                        .map_or_else(|| failure.code.to_string(), ToString::to_string)
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": field_messages(errors),
            }),
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
                json!({ "message": message })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::NotFound(Resource::Event).to_string(), "Event not found");
        assert_eq!(
            AppError::NotFound(Resource::Participant).to_string(),
            "Participant not found"
        );
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::CapacityExceeded.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::BadRequest("Invalid date".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound(Resource::Event).status(), StatusCode::NOT_FOUND);
        let internal = AppError::Internal {
            message: "Failed to fetch events",
            source: StoreError::Other(sqlx::Error::PoolClosed),
        };
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.to_string(), "Failed to fetch events");
    }

    async fn rendered(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_error_body_hides_the_source() {
        let err = AppError::Internal {
            message: "Failed to register participant",
            source: StoreError::Other(sqlx::Error::Protocol("disk I/O error".to_string())),
        };
        let (status, body) = rendered(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "Failed to register participant" }));
    }

    #[tokio::test]
    async fn client_error_bodies_carry_only_the_message() {
        let (status, body) = rendered(AppError::CapacityExceeded).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Event is at full capacity" }));

        let (status, body) = rendered(AppError::NotFound(Resource::Participant)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Participant not found" }));
    }

    #[test]
    fn field_messages_prefer_message_over_code() {
        let mut errors = ValidationErrors::new();
        errors.add("name", ValidationError::new("length").with_message("Name is required".into()));
        errors.add("capacity", ValidationError::new("range"));

        let messages = field_messages(&errors);
        assert_eq!(messages["name"], vec!["Name is required".to_string()]);
        assert_eq!(messages["capacity"], vec!["range".to_string()]);
    }
}
