use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use engine::error::ErrorBody;
use tracing::debug;
use voting_core::model::UserEmail;

/// Header carrying the email of the user making the request. Authentication happens upstream.
pub const USER_HEADER: &str = "x-user-email";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub UserEmail);

#[derive(Debug)]
pub struct MissingUser;

impl IntoResponse for MissingUser {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: format!("the '{USER_HEADER}' header must name the acting user"),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(UserEmail::parse);

        match user {
            Some(user) => Ok(ActingUser(user)),
            None => {
                debug!("request has no usable {USER_HEADER} header");
                Err(MissingUser)
            }
        }
    }
}
