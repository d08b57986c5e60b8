use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::{
    model::{
        Id,
        post::{NewPost, Post, PostContent, PostMarker, PostUpdate},
    },
    stats::{self, PostStats},
};
use bloglist_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post_stats)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

/// Only the owner of a post may change it. Posts without owner are frozen.
fn ensure_owner(post: &Post, user: AuthenticatedUser) -> Result<()> {
    match &post.user {
        Some(owner) if owner.id == user.user_id() => Ok(()),
        _ => Err(ServerError::NotPostOwner(post.id)),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(posts))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(post): Json<NewPost>,
) -> Result<Created<Post>> {
    let content = PostContent::try_from(post)?;
    let post = db.create_post(&content, Some(user.user_id())).await?;

    info!(post = %post.id, user = %user.user_id(), "Created post");
    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/stats", rejection(ServerError))]
struct PostStatsPath();

async fn get_post_stats(
    PostStatsPath(): PostStatsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostStats>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(stats::summarize(posts.iter().map(|post| &post.content))))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<PostUpdate>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    ensure_owner(&post, user)?;

    let content = update.apply(post.content)?;
    let post = db
        .update_post(id, &content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    ensure_owner(&post, user)?;

    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    info!(post = %id, user = %user.user_id(), "Deleted post");
    Ok(StatusCode::NO_CONTENT)
}
