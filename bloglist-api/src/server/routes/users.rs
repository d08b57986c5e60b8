use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Created, Json},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::model::{
    Id,
    auth::PasswordHash,
    user::{CreateUser, NewUser, User, UserMarker},
};
use bloglist_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_post(create_user)
        .typed_get(get_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn list_users(
    UsersPath(): UsersPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<User>>> {
    let users = db.fetch_users().await?;

    Ok(Json(users))
}

async fn create_user(
    UsersPath(): UsersPath,
    State(db): State<Arc<DbClient>>,
    Json(user): Json<NewUser>,
) -> Result<Created<User>> {
    let user = CreateUser::try_from(user)?;

    // The store enforces uniqueness as well; checking first spares the hashing.
    if db.fetch_credentials(&user.username).await?.is_some() {
        return Err(ServerError::UsernameTaken);
    }

    let password_hash = PasswordHash::hash(&user.password)?;
    let created = db
        .create_user(&user.username, user.name.as_deref(), &password_hash)
        .await?;

    info!(user = %created.id, username = created.username.get(), "Created user");
    Ok(Created(created))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}
