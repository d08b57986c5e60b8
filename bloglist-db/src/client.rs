use crate::{memory::MemoryBackend, postgres::PgBackend};
use bloglist_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication, PasswordHash, UserCredentials},
        post::{Post, PostContent, PostMarker},
        user::{User, UserMarker, Username},
    },
    snowflake::{SnowflakeGenerator, SnowflakeTimestampError, WorkerId},
};
use sqlx::{migrate::MigrateError, postgres::PgPoolOptions};
use thiserror::Error;
use tracing::info;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

const MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Username {} is already taken", .0.get())]
    UsernameTaken(Username),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeTimestampError),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
enum Backend {
    Postgres(PgBackend),
    Memory(MemoryBackend),
}

/// Access to users, posts and authentications.
///
/// Ids are assigned here rather than by the backend, so both backends hand
/// out the same kind of snowflakes.
#[derive(Debug)]
pub struct DbClient {
    backend: Backend,
    snowflake_generator: SnowflakeGenerator,
}

impl DbClient {
    pub async fn connect(database_url: &str, worker_id: WorkerId) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        Ok(Self {
            backend: Backend::Postgres(PgBackend::new(pool)),
            snowflake_generator: SnowflakeGenerator::new(worker_id),
        })
    }

    /// A client that keeps everything in process memory and forgets it on drop.
    #[must_use]
    pub fn in_memory(worker_id: WorkerId) -> Self {
        Self {
            backend: Backend::Memory(MemoryBackend::default()),
            snowflake_generator: SnowflakeGenerator::new(worker_id),
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        match &self.backend {
            Backend::Postgres(pg) => {
                pg.migrate().await?;
                info!("Database migrations applied");
            }
            Backend::Memory(_) => {}
        }

        Ok(())
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_users().await,
            Backend::Memory(memory) => Ok(memory.fetch_users().await),
        }
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_user(user_id).await,
            Backend::Memory(memory) => Ok(memory.fetch_user(user_id).await),
        }
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<UserCredentials>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_credentials(username).await,
            Backend::Memory(memory) => Ok(memory.fetch_credentials(username).await),
        }
    }

    pub async fn create_user(
        &self,
        username: &Username,
        name: Option<&str>,
        password_hash: &PasswordHash,
    ) -> Result<User> {
        let user_id = self.snowflake_generator.generate()?.into();

        match &self.backend {
            Backend::Postgres(pg) => {
                pg.create_user(user_id, username, name, password_hash)
                    .await
            }
            Backend::Memory(memory) => {
                memory
                    .create_user(user_id, username, name, password_hash)
                    .await
            }
        }
    }

    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_posts().await,
            Backend::Memory(memory) => Ok(memory.fetch_posts().await),
        }
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_post(post_id).await,
            Backend::Memory(memory) => Ok(memory.fetch_post(post_id).await),
        }
    }

    /// Stores a new post. An `owner` that does not exist is a foreign key
    /// violation on Postgres and leaves the post without owner in memory.
    pub async fn create_post(
        &self,
        content: &PostContent,
        owner: Option<Id<UserMarker>>,
    ) -> Result<Post> {
        let post_id = self.snowflake_generator.generate()?.into();

        match &self.backend {
            Backend::Postgres(pg) => pg.create_post(post_id, content, owner).await,
            Backend::Memory(memory) => Ok(memory.create_post(post_id, content, owner).await),
        }
    }

    /// Replaces the content of a post, returning `None` if it does not exist.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.update_post(post_id, content).await,
            Backend::Memory(memory) => Ok(memory.update_post(post_id, content).await),
        }
    }

    /// Returns whether a post was deleted.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        match &self.backend {
            Backend::Postgres(pg) => pg.delete_post(post_id).await,
            Backend::Memory(memory) => Ok(memory.delete_post(post_id).await),
        }
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        match &self.backend {
            Backend::Postgres(pg) => pg.create_auth(authentication).await,
            Backend::Memory(memory) => {
                memory.create_auth(authentication).await;
                Ok(())
            }
        }
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        match &self.backend {
            Backend::Postgres(pg) => pg.fetch_auth(token_hash).await,
            Backend::Memory(memory) => Ok(memory.fetch_auth(token_hash).await),
        }
    }

    /// Returns whether an authentication was deleted.
    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        match &self.backend {
            Backend::Postgres(pg) => pg.delete_auth(token_hash).await,
            Backend::Memory(memory) => Ok(memory.delete_auth(token_hash).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, DbError};
    use bloglist_common::{
        model::{
            auth::{AuthToken, Authentication, PasswordHash},
            post::PostContent,
            user::Username,
        },
        snowflake::WorkerId,
    };
    use time::UtcDateTime;

    fn client() -> DbClient {
        DbClient::in_memory(WorkerId::default())
    }

    fn content(title: &str, likes: u32) -> PostContent {
        PostContent {
            title: title.to_owned(),
            author: "Edsger W. Dijkstra".to_owned(),
            url: "https://example.com".to_owned(),
            likes,
        }
    }

    fn username(username: &str) -> Username {
        Username::new(username.to_owned()).unwrap()
    }

    #[tokio::test]
    async fn users_own_their_posts() {
        let db = client();
        let hash = PasswordHash::hash("sekret").unwrap();
        let root = db
            .create_user(&username("root"), Some("Superuser"), &hash)
            .await
            .unwrap();
        assert!(root.posts.is_empty());

        let owned = db
            .create_post(&content("owned", 5), Some(root.id))
            .await
            .unwrap();
        let orphan = db.create_post(&content("orphan", 1), None).await.unwrap();

        assert_eq!(owned.user.as_ref().map(|user| user.id), Some(root.id));
        assert_eq!(orphan.user, None);

        let root = db.fetch_user(root.id).await.unwrap().unwrap();
        assert_eq!(root.posts.len(), 1);
        assert_eq!(root.posts[0].id, owned.id);

        let posts = db.fetch_posts().await.unwrap();
        assert_eq!(posts, vec![owned.clone(), orphan]);

        assert!(db.delete_post(owned.id).await.unwrap());
        assert!(!db.delete_post(owned.id).await.unwrap());
        assert!(db.fetch_user(root.id).await.unwrap().unwrap().posts.is_empty());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = client();
        let hash = PasswordHash::hash("sekret").unwrap();
        db.create_user(&username("root"), None, &hash).await.unwrap();

        let result = db.create_user(&username("root"), None, &hash).await;
        assert!(matches!(result, Err(DbError::UsernameTaken(_))));
        assert_eq!(db.fetch_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn credentials_by_username() {
        let db = client();
        let hash = PasswordHash::hash("sekret").unwrap();
        let user = db.create_user(&username("root"), None, &hash).await.unwrap();

        let credentials = db.fetch_credentials(&username("root")).await.unwrap().unwrap();
        assert_eq!(credentials.user.id, user.id);
        assert!(credentials.password_hash.verify("sekret").unwrap());
        assert_eq!(db.fetch_credentials(&username("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_replaces_content() {
        let db = client();
        let post = db.create_post(&content("before", 1), None).await.unwrap();

        let updated = db
            .update_post(post.id, &content("after", 100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.content, content("after", 100));
        assert_eq!(db.fetch_post(post.id).await.unwrap(), Some(updated));

        db.delete_post(post.id).await.unwrap();
        assert_eq!(db.update_post(post.id, &content("gone", 0)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn authentications_by_hash() {
        let db = client();
        let hash = PasswordHash::hash("sekret").unwrap();
        let user = db.create_user(&username("root"), None, &hash).await.unwrap();

        let token = AuthToken::generate_random(user.id);
        let authentication = Authentication {
            user: user.id,
            token_hash: token.hash().unwrap(),
            created_at: UtcDateTime::now(),
            expires_after: None,
        };
        db.create_auth(&authentication).await.unwrap();

        assert_eq!(
            db.fetch_auth(&token.hash().unwrap()).await.unwrap(),
            Some(authentication)
        );
        let other = AuthToken::generate_random(user.id).hash().unwrap();
        assert_eq!(db.fetch_auth(&other).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleted_authentications_are_gone() {
        let db = client();
        let hash = PasswordHash::hash("sekret").unwrap();
        let user = db.create_user(&username("root"), None, &hash).await.unwrap();

        let token_hash = AuthToken::generate_random(user.id).hash().unwrap();
        db.create_auth(&Authentication {
            user: user.id,
            token_hash: token_hash.clone(),
            created_at: UtcDateTime::now(),
            expires_after: None,
        })
        .await
        .unwrap();

        assert!(db.delete_auth(&token_hash).await.unwrap());
        assert!(!db.delete_auth(&token_hash).await.unwrap());
        assert_eq!(db.fetch_auth(&token_hash).await.unwrap(), None);
    }
}
