use crate::server::{
    AuthConfig, Result, ServerError, ServerRouter,
    auth::issue_token,
    json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::model::user::Username;
use bloglist_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(login)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

impl Debug for LoginRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct LoginResponse {
    token: String,
    username: Username,
    name: Option<String>,
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(auth_config): State<AuthConfig>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    // A name that is not a valid username cannot belong to anyone.
    let username = Username::new(request.username).map_err(|_| ServerError::InvalidCredentials)?;

    let credentials = db
        .fetch_credentials(&username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !credentials.password_hash.verify(&request.password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let user = credentials.user;
    let token = issue_token(&db, auth_config, user.id).await?;

    info!(user = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        token: token.as_token_str(),
        username: user.username,
        name: user.name,
    }))
}
