//! JSON body extractor that also runs `validator` rules
//!
//! Both malformed JSON and rule violations are request errors and answer
//! 400 in the standard envelope, like [`DomainError::Validation`] does.
//!
//! [`DomainError::Validation`]: crate::shared::errors::DomainError::Validation

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::ApiError;

/// `axum::Json<T>` followed by `T::validate()`.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CheckinBody {
///     #[validate(range(min = 0, max = 100))]
///     fuel_level: i32,
/// }
///
/// async fn handler(ValidatedJson(body): ValidatedJson<CheckinBody>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Invalid(ValidationErrors),
}

/// One `field: message` line per violated rule, sorted for stable output.
fn describe(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    lines.sort();

    if lines.is_empty() {
        "Validation failed".to_string()
    } else {
        format!("Validation failed: {}", lines.join("; "))
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let error = match self {
            Self::Json(rejection) => ApiError::bad_request(format!("Invalid JSON: {rejection}")),
            Self::Invalid(errors) => ApiError::bad_request(describe(&errors)),
        };
        error.into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;
        value.validate().map_err(ValidatedJsonRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────
