use crate::client::{DbError, Result};
use bloglist_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication, PasswordHash, UserCredentials},
    post::{PartialPost, Post, PostContent, PostMarker},
    user::{User, UserMarker, UserSummary, Username},
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug)]
struct UserRow {
    username: Username,
    name: Option<String>,
    password_hash: PasswordHash,
}

#[derive(Debug)]
struct PostRow {
    content: PostContent,
    owner: Option<Id<UserMarker>>,
}

#[derive(Debug, Default)]
struct Tables {
    // Keyed by snowflake, so iteration follows creation order.
    users: BTreeMap<Id<UserMarker>, UserRow>,
    posts: BTreeMap<Id<PostMarker>, PostRow>,
    authentications: HashMap<AuthTokenHash, Authentication>,
}

impl Tables {
    fn summary(&self, user_id: Id<UserMarker>) -> Option<UserSummary> {
        self.users.get(&user_id).map(|row| UserSummary {
            id: user_id,
            username: row.username.clone(),
            name: row.name.clone(),
        })
    }

    fn post(&self, post_id: Id<PostMarker>, row: &PostRow) -> Post {
        Post {
            id: post_id,
            content: row.content.clone(),
            user: row.owner.and_then(|owner| self.summary(owner)),
        }
    }

    fn user(&self, user_id: Id<UserMarker>, row: &UserRow) -> User {
        let posts = self
            .posts
            .iter()
            .filter(|(_, post)| post.owner == Some(user_id))
            .map(|(id, post)| PartialPost {
                id: *id,
                content: post.content.clone(),
            })
            .collect();

        User {
            id: user_id,
            username: row.username.clone(),
            name: row.name.clone(),
            posts,
        }
    }
}

/// Backend without any persistence, for development and tests.
#[derive(Debug, Default)]
pub(crate) struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub async fn fetch_users(&self) -> Vec<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .map(|(id, row)| tables.user(*id, row))
            .collect()
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Option<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&user_id)
            .map(|row| tables.user(user_id, row))
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Option<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|(_, row)| row.username == *username)
            .map(|(id, row)| UserCredentials {
                user: UserSummary {
                    id: *id,
                    username: row.username.clone(),
                    name: row.name.clone(),
                },
                password_hash: row.password_hash.clone(),
            })
    }

    pub async fn create_user(
        &self,
        user_id: Id<UserMarker>,
        username: &Username,
        name: Option<&str>,
        password_hash: &PasswordHash,
    ) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|row| row.username == *username) {
            return Err(DbError::UsernameTaken(username.clone()));
        }

        let row = UserRow {
            username: username.clone(),
            name: name.map(str::to_owned),
            password_hash: password_hash.clone(),
        };
        let user = tables.user(user_id, &row);
        tables.users.insert(user_id, row);

        Ok(user)
    }

    pub async fn fetch_posts(&self) -> Vec<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .map(|(id, row)| tables.post(*id, row))
            .collect()
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&post_id)
            .map(|row| tables.post(post_id, row))
    }

    pub async fn create_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
        owner: Option<Id<UserMarker>>,
    ) -> Post {
        let mut tables = self.tables.write().await;
        let row = PostRow {
            content: content.clone(),
            owner: owner.filter(|owner| tables.users.contains_key(owner)),
        };
        let post = tables.post(post_id, &row);
        tables.posts.insert(post_id, row);

        post
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Option<Post> {
        let mut tables = self.tables.write().await;
        let row = tables.posts.get_mut(&post_id)?;
        row.content = content.clone();

        let tables = tables.downgrade();
        tables
            .posts
            .get(&post_id)
            .map(|row| tables.post(post_id, row))
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> bool {
        self.tables
            .write()
            .await
            .posts
            .remove(&post_id)
            .is_some()
    }

    pub async fn create_auth(&self, authentication: &Authentication) {
        self.tables
            .write()
            .await
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Option<Authentication> {
        self.tables
            .read()
            .await
            .authentications
            .get(token_hash)
            .cloned()
    }

    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> bool {
        self.tables
            .write()
            .await
            .authentications
            .remove(token_hash)
            .is_some()
    }
}
