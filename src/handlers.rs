use crate::{
    error::AppError,
    models::{Event, EventWithParticipants, Participant, ParticipantWithEvent},
    state::AppState,
    validation::{
        CreateEvent, CreateParticipant, ParticipantIdParam, ParticipantQuery, UpdateEvent,
        UpdateParticipant, ValidatedJson, ValidatedPath, ValidatedQuery,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

/// Body of every successful response: `{ data?, message }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    message: &'static str,
}

fn with_data<T>(data: T, message: &'static str) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        data: Some(data),
        message,
    })
}

fn message_only(message: &'static str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        data: None,
        message,
    })
}

pub async fn list_events(
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<EventWithParticipants>>>, AppError> {
    let events = app_state.events.list().await?;
    Ok(with_data(events, "Events fetched successfully"))
}

pub async fn get_event(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EventWithParticipants>>, AppError> {
    let event = app_state.events.get(&id).await?;
    Ok(with_data(event, "Event fetched successfully"))
}

pub async fn create_event(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateEvent>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), AppError> {
    let event = app_state.events.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        with_data(event, "Event created successfully"),
    ))
}

pub async fn update_event(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateEvent>,
) -> Result<Json<ApiResponse<Event>>, AppError> {
    let event = app_state.events.update(&id, payload).await?;
    Ok(with_data(event, "Event updated successfully"))
}

pub async fn delete_event(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.events.delete(&id).await?;
    Ok(message_only("Event deleted successfully"))
}

pub async fn list_participants(
    State(app_state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ParticipantQuery>,
) -> Result<Json<ApiResponse<Vec<Participant>>>, AppError> {
    let participants = app_state.participants.list(&query.event_id).await?;
    Ok(with_data(participants, "Participants fetched successfully"))
}

pub async fn get_participant(
    State(app_state): State<AppState>,
    ValidatedPath(param): ValidatedPath<ParticipantIdParam>,
    ValidatedQuery(query): ValidatedQuery<ParticipantQuery>,
) -> Result<Json<ApiResponse<ParticipantWithEvent>>, AppError> {
    let participant = app_state
        .participants
        .get(&param.id, &query.event_id)
        .await?;
    Ok(with_data(participant, "Participant fetched successfully"))
}

pub async fn create_participant(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateParticipant>,
) -> Result<(StatusCode, Json<ApiResponse<Participant>>), AppError> {
    let participant = app_state.participants.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        with_data(participant, "Participant registered successfully"),
    ))
}

pub async fn update_participant(
    State(app_state): State<AppState>,
    ValidatedPath(param): ValidatedPath<ParticipantIdParam>,
    ValidatedJson(payload): ValidatedJson<UpdateParticipant>,
) -> Result<Json<ApiResponse<Participant>>, AppError> {
    let participant = app_state.participants.update(&param.id, payload).await?;
    Ok(with_data(participant, "Participant updated successfully"))
}

pub async fn delete_participant(
    State(app_state): State<AppState>,
    ValidatedPath(param): ValidatedPath<ParticipantIdParam>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.participants.delete(&param.id).await?;
    Ok(message_only("Participant deleted successfully"))
}
