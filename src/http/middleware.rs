//! Admission checks and token middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::config::Config;

/// Admission error types
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("Origin not allowed")]
    OriginRejected,

    #[error("Missing access token")]
    MissingToken,

    #[error("Invalid access token")]
    InvalidToken,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdmissionError::OriginRejected => StatusCode::FORBIDDEN,
            AdmissionError::MissingToken => StatusCode::UNAUTHORIZED,
            AdmissionError::InvalidToken => StatusCode::UNAUTHORIZED,
        };

        (status, self.to_string()).into_response()
    }
}

/// Check the `Origin` header against the allow-list. An empty list admits everyone.
pub fn check_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), AdmissionError> {
    if allowed.is_empty() {
        return Ok(());
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .ok_or(AdmissionError::OriginRejected)?;

    if allowed.iter().any(|a| a == origin) {
        Ok(())
    } else {
        Err(AdmissionError::OriginRejected)
    }
}

/// Compare a presented token with the configured secret, if any
pub fn check_token(presented: Option<&str>, expected: Option<&str>) -> Result<(), AdmissionError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = presented.ok_or(AdmissionError::MissingToken)?;

    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AdmissionError::InvalidToken)
    }
}

/// Full admission for a game socket, evaluated before any role is assigned
pub fn admit(headers: &HeaderMap, token: Option<&str>, config: &Config) -> Result<(), AdmissionError> {
    check_origin(headers, &config.allowed_origins)?;
    check_token(token, config.access_token.as_deref())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Middleware requiring `Authorization: Bearer <ACCESS_TOKEN>` when a token is configured
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AdmissionError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);

    check_token(presented, state.config.access_token.as_deref())?;

    Ok(next.run(request).await)
}
