use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use error_stack::Report;
use serde::Serialize;
use std::error::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Maps an error context onto the HTTP status an endpoint should answer with.
pub trait ErrorStatus {
    fn status_code(&self) -> StatusCode;
}

/// Body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(thiserror::Error)]
#[error("there was an error running the endpoint")]
pub struct EndpointError<T: Error + Send + Sync + 'static>(Report<T>);

impl<T: Error + Send + Sync + 'static> EndpointError<T> {
    pub fn report(&self) -> &Report<T> {
        &self.0
    }
}

impl<T: Error + Send + Sync + 'static> std::fmt::Debug for EndpointError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> From<Report<T>> for EndpointError<T>
where
    T: Error + Send + Sync + 'static,
{
    fn from(value: Report<T>) -> Self {
        Self(value)
    }
}

impl<T> IntoResponse for EndpointError<T>
where
    T: Error + ErrorStatus + Send + Sync + 'static,
{
    fn into_response(self) -> axum::response::Response {
        let context = self.0.current_context();
        let status_code = context.status_code();

        // client errors are expected outcomes, only server side failures carry a full report
        if status_code.is_server_error() {
            error!("endpoint failed: {:?}", self.0);
        } else {
            debug!("endpoint rejected request with {status_code}: {context}");
        }

        let body = ErrorBody {
            message: context.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}
