use crate::{
    client::{DbError, Result},
    record::{
        AuthenticationRecord, CredentialsRecord, FullPostRecord, PartialPostRecord, UserRecord,
    },
};
use bloglist_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication, PasswordHash, UserCredentials},
    post::{PartialPost, Post, PostContent, PostMarker},
    user::{User, UserMarker, UserSummary, Username},
};
use sqlx::{PgPool, migrate::Migrator, query, query_as};
use std::collections::HashMap;
use time::PrimitiveDateTime;

static MIGRATOR: Migrator = sqlx::migrate!();

const FULL_POST_SELECT: &str = "
    SELECT
        posts.post_snowflake,
        posts.title,
        posts.author,
        posts.url,
        posts.likes,
        users.user_snowflake,
        users.username,
        users.name
    FROM
        posts.posts LEFT JOIN users.users USING (user_snowflake)
";

#[derive(Debug)]
pub(crate) struct PgBackend {
    pool: PgPool,
}

fn snowflake<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

fn with_posts(user: UserSummary, posts: Vec<PartialPost>) -> User {
    User {
        id: user.id,
        username: user.username,
        name: user.name,
        posts,
    }
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let user_records = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.name
            FROM
                users.users
            ORDER BY
                users.user_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let post_records = query_as::<_, PartialPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.author,
                posts.url,
                posts.likes,
                posts.user_snowflake
            FROM
                posts.posts
            WHERE
                posts.user_snowflake IS NOT NULL
            ORDER BY
                posts.post_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut posts_by_user = HashMap::<i64, Vec<PartialPost>>::new();
        for record in post_records {
            if let Some(user_snowflake) = record.user_snowflake {
                posts_by_user
                    .entry(user_snowflake)
                    .or_default()
                    .push(record.try_into()?);
            }
        }

        user_records
            .into_iter()
            .map(|record| {
                let posts = posts_by_user
                    .remove(&record.user_snowflake)
                    .unwrap_or_default();
                Ok::<_, DbError>(with_posts(record.try_into()?, posts))
            })
            .collect()
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.name
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(snowflake(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let posts = self.fetch_user_posts(user_id).await?;
        Ok(Some(with_posts(record.try_into()?, posts)))
    }

    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<PartialPost>> {
        let records = query_as::<_, PartialPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.author,
                posts.url,
                posts.likes,
                posts.user_snowflake
            FROM
                posts.posts
            WHERE
                posts.user_snowflake = $1
            ORDER BY
                posts.post_snowflake
            ",
        )
        .bind(snowflake(user_id))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.name,
                users.password_hash
            FROM
                users.users
            WHERE
                users.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(UserCredentials::try_from).transpose()?;
        Ok(credentials)
    }

    pub async fn create_user(
        &self,
        user_id: Id<UserMarker>,
        username: &Username,
        name: Option<&str>,
        password_hash: &PasswordHash,
    ) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, username, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_snowflake, username, name
            ",
        )
        .bind(snowflake(user_id))
        .bind(username.get())
        .bind(name)
        .bind(password_hash.as_phc())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UsernameTaken(username.clone())
            }
            err => err.into(),
        })?;

        Ok(with_posts(record.try_into()?, Vec::new()))
    }

    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{FULL_POST_SELECT} ORDER BY posts.post_snowflake"
        ))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "{FULL_POST_SELECT} WHERE posts.post_snowflake = $1"
        ))
        .bind(snowflake(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
        owner: Option<Id<UserMarker>>,
    ) -> Result<Post> {
        query(
            "
            INSERT INTO posts.posts (post_snowflake, title, author, url, likes, user_snowflake)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(snowflake(post_id))
        .bind(&content.title)
        .bind(&content.author)
        .bind(&content.url)
        .bind(i64::from(content.likes))
        .bind(owner.map(snowflake))
        .execute(&self.pool)
        .await?;

        self.fetch_post(post_id)
            .await?
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let result = query(
            "
            UPDATE posts.posts
            SET title = $2, author = $3, url = $4, likes = $5
            WHERE post_snowflake = $1
            ",
        )
        .bind(snowflake(post_id))
        .bind(&content.title)
        .bind(&content.author)
        .bind(&content.url)
        .bind(i64::from(content.likes))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_post(post_id).await
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(snowflake(post_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = authentication.created_at;

        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(snowflake(authentication.user))
        .bind(PrimitiveDateTime::new(created_at.date(), created_at.time()))
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        let result = query("DELETE FROM users.authentications WHERE token_hash = $1")
            .bind(&token_hash.0[..])
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
