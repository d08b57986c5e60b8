use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use bloglist_common::{
    model::{
        Id,
        auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordHashError},
        post::{InvalidPostError, PostMarker},
        user::{InvalidUserError, UserMarker},
    },
    util::PositiveDuration,
};
use bloglist_db::client::{DbClient, DbError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub auth_config: AuthConfig,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct AuthConfig {
    /// Tokens never expire if unset.
    pub token_lifetime: Option<PositiveDuration>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("token missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("token missing or invalid: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("token missing or invalid")]
    InvalidToken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    InvalidPost(#[from] InvalidPostError),
    #[error(transparent)]
    InvalidUser(#[from] InvalidUserError),
    #[error("username is already used")]
    UsernameTaken,
    #[error("Only the owner may modify post {0}")]
    NotPostOwner(Id<PostMarker>),
    #[error(transparent)]
    Database(DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::UsernameTaken(_) => ServerError::UsernameTaken,
            err => ServerError::Database(err),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::NotPostOwner(_) => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(JsonRejection::MissingJsonContentType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidPost(_)
            | ServerError::InvalidUser(_)
            | ServerError::UsernameTaken => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error = if status.is_server_error() {
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        let error_response = ErrorResponse {
            status: status.as_u16(),
            error,
        };
        (status, Json(error_response)).into_response()
    }
}
