use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bootcamp_core::InterfaceError;
use serde::Serialize;
use uuid::Uuid;

/// Response wrapper for `InterfaceError`; keeps internal detail out of the body.
#[derive(Debug)]
pub struct HttpError(pub InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    correlation_id: &'a str,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InterfaceError> for HttpError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body =
            ErrorBody { error: self.0.user_message(), correlation_id: self.0.correlation_id() };
        (self.status(), Json(body)).into_response()
    }
}

pub fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use bootcamp_core::ApplicationError;

    use super::{new_correlation_id, HttpError};

    #[test]
    fn application_errors_map_to_http_statuses() {
        let cases = [
            (ApplicationError::InvalidPayload("x".to_owned()), StatusCode::BAD_REQUEST),
            (ApplicationError::Signature("x".to_owned()), StatusCode::UNAUTHORIZED),
            (ApplicationError::Integration("x".to_owned()), StatusCode::BAD_GATEWAY),
            (ApplicationError::Configuration("x".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let response = HttpError::from(error.into_interface("req-1")).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn correlation_ids_are_unique_and_prefixed() {
        let first = new_correlation_id();
        let second = new_correlation_id();

        assert!(first.starts_with("req-"));
        assert_ne!(first, second);
    }
}
