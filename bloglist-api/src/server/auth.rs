use crate::server::{AuthConfig, Result, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use bloglist_common::model::{
    Id,
    auth::{AuthToken, Authentication},
    user::UserMarker,
};
use bloglist_db::client::DbClient;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user a valid bearer token belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let db = Arc::<DbClient>::from_ref(state);
        let authentication = db
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        // The user id in the token is not covered by the hash.
        if authentication.user != request_token.user_id {
            return Err(ServerError::InvalidToken);
        }

        if authentication.is_expired_at(UtcDateTime::now()) {
            debug!(user = %authentication.user, "Rejecting and removing expired token");
            db.delete_auth(&token_hash).await?;
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            id: authentication.user,
        })
    }
}

/// Creates and stores a new token for `user_id`.
pub async fn issue_token(
    db: &DbClient,
    config: AuthConfig,
    user_id: Id<UserMarker>,
) -> Result<AuthToken> {
    let token = AuthToken::generate_random(user_id);

    let authentication = Authentication {
        user: user_id,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after: config.token_lifetime,
    };
    db.create_auth(&authentication).await?;

    debug!(user = %user_id, "Issued auth token");
    Ok(token)
}
