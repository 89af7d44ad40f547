//! Path and validation extractors for API routes

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::domain::query::EntityType;

/// Raw path extractor for tenant-scoped entity routes (internal use)
#[derive(Debug, Deserialize)]
struct TenantEntityPathRaw {
    tenant: String,
    entity: String,
}

/// Validated `/tenants/{tenant}/{entity}` path
#[derive(Debug)]
pub struct TenantEntityPath {
    pub tenant: String,
    pub entity: EntityType,
}

/// Validate tenant: 1-64 chars, alphanumeric + dash/underscore
pub fn is_valid_tenant(tenant: &str) -> bool {
    !tenant.is_empty()
        && tenant.len() <= 64
        && tenant
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

impl<S> FromRequestParts<S> for TenantEntityPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<TenantEntityPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_tenant(&raw.tenant) {
            return Err(ValidationRejection::InvalidTenant);
        }
        let entity = raw
            .entity
            .parse::<EntityType>()
            .map_err(ValidationRejection::UnknownEntity)?;

        Ok(Self {
            tenant: raw.tenant,
            entity,
        })
    }
}

/// Rejection for the extractors in this module
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Invalid tenant format
    InvalidTenant,
    /// Entity segment names no known entity
    UnknownEntity(String),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::Path(rejection) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "PATH_PARSE_ERROR",
                rejection.body_text(),
            ),
            Self::InvalidTenant => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "INVALID_TENANT",
                "Invalid tenant: must be 1-64 alphanumeric chars, dashes, or underscores"
                    .to_string(),
            ),
            Self::UnknownEntity(message) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "UNKNOWN_ENTITY",
                message,
            ),
            Self::Json(rejection) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "JSON_PARSE_ERROR",
                rejection.body_text(),
            ),
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "VALIDATION_ERROR",
                format_validation_errors(&errors),
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: invalid value", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// JSON body extractor with validation.
///
/// Deserializes JSON body and validates it using the `validator` crate.
/// Returns a `ValidationRejection` on parse or validation failure.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}
