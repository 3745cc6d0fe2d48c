//! Request schemas and the extractors that enforce them.
//!
//! Each schema is deserialized and then checked with [`validator::Validate`];
//! either step failing rejects the request with a 400 before a handler runs.

use crate::error::AppError;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_regex::{Lazy, Regex, lazy_regex};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvent {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<String>,
    pub date: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[validate(range(min = 1, message = "Capacity must be a positive number"))]
    pub capacity: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEvent {
    #[serde(default, deserialize_with = "present")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[validate(range(min = 1, message = "Capacity must be a positive number"))]
    pub capacity: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipant {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "email_address", message = "Invalid email format"))]
    pub email: String,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Event ID is required"))]
    pub event_id: String,
}

/// Email is deliberately not format-checked on update.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateParticipant {
    #[serde(default, deserialize_with = "present")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ParticipantIdParam {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Participant ID is required"))]
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantQuery {
    #[serde(deserialize_with = "trimmed")]
    pub event_id: String,
}

/// Optional field that may be omitted but not sent as `null`.
/// Pair with `#[serde(default)]` so a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

static EMAIL_REGEX: Lazy<Regex> =
    lazy_regex!(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$");

/// Local part and dotted domain with an alphabetic TLD of two or more letters.
fn email_address(email: &str) -> Result<(), ValidationError> {
    if email.starts_with('.') || email.contains("..") || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::new("email"));
    }
    Ok(())
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Converts the loosely formatted `date` field into a UTC timestamp.
///
/// Accepts RFC 3339, a naive date-time (taken as UTC) or a bare date (midnight UTC).
pub fn parse_event_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
        return Some(date_time.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// JSON body that has passed its schema.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_event() -> CreateEvent {
        CreateEvent {
            name: "Launch".to_string(),
            description: None,
            date: "2025-01-01".to_string(),
            location: "HQ".to_string(),
            capacity: 2,
        }
    }

    #[test]
    fn create_event_accepts_valid_input() {
        assert!(create_event().validate().is_ok());
    }

    #[test]
    fn create_event_rejects_blank_name_and_zero_capacity() {
        let input = CreateEvent {
            name: String::new(),
            capacity: 0,
            ..create_event()
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("capacity"));
        assert!(!fields.contains_key("location"));
    }

    #[test]
    fn update_event_only_checks_present_fields() {
        assert!(UpdateEvent::default().validate().is_ok());

        let negative = UpdateEvent {
            capacity: Some(-3),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let empty_location = UpdateEvent {
            location: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_location.validate().is_err());
    }

    #[test]
    fn create_participant_requires_well_formed_email() {
        let input: CreateParticipant = serde_json::from_value(serde_json::json!({
            "name": "Ola",
            "email": "not-an-email",
            "eventId": "abc",
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn email_needs_a_dotted_domain() {
        for valid in ["a@x.com", "first.last+tag@sub.domain.org", "o'brien@x.co"] {
            assert!(email_address(valid).is_ok(), "{valid}");
        }
        for invalid in ["a@x", "a@x.c", ".a@x.com", "a..b@x.com", "a.@x.com", "@x.com", "a@.com", "a@x.c0m"] {
            assert!(email_address(invalid).is_err(), "{invalid}");
        }
    }

    #[test]
    fn explicit_null_is_rejected_but_missing_keys_are_fine() {
        let missing: UpdateEvent = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(missing.name.is_none());
        assert!(missing.capacity.is_none());

        for field in ["name", "description", "date", "location", "capacity"] {
            let body = serde_json::json!({ field: null });
            assert!(serde_json::from_value::<UpdateEvent>(body).is_err(), "{field}");
        }
        for field in ["name", "email", "phone"] {
            let body = serde_json::json!({ field: null });
            assert!(serde_json::from_value::<UpdateParticipant>(body).is_err(), "{field}");
        }

        let with_null_phone = serde_json::json!({
            "name": "Ola",
            "email": "a@x.com",
            "phone": null,
            "eventId": "abc",
        });
        assert!(serde_json::from_value::<CreateParticipant>(with_null_phone).is_err());
    }

    #[test]
    fn update_participant_does_not_check_email_format() {
        let input = UpdateParticipant {
            email: Some("whatever".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn participant_id_is_trimmed_before_validation() {
        let param: ParticipantIdParam =
            serde_json::from_value(serde_json::json!({ "id": "   " })).unwrap();
        assert_eq!(param.id, "");
        assert!(param.validate().is_err());

        let query: ParticipantQuery =
            serde_json::from_value(serde_json::json!({ "eventId": " ev1 " })).unwrap();
        assert_eq!(query.event_id, "ev1");
    }

    #[test]
    fn parses_the_usual_date_shapes() {
        let midnight = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_event_date("2025-01-01"), Some(midnight));
        assert_eq!(parse_event_date("2025-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_event_date("2025-01-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_event_date("2025-01-01T00:00:00.000"), Some(midnight));
        assert_eq!(parse_event_date("2025-01-01 00:00:00"), Some(midnight));
        assert_eq!(parse_event_date("2025-01-01T00:00"), Some(midnight));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_event_date("tomorrow"), None);
        assert_eq!(parse_event_date("2025-13-01"), None);
        assert_eq!(parse_event_date(""), None);
    }
}
