use bloglist_common::model::{
    ModelValidationError,
    auth::{Authentication, PasswordHash, UserCredentials},
    post::{PartialPost, Post, PostContent},
    user::{UserSummary, Username},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub name: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// A post joined with its (optional) owner.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: i64,
    pub user_snowflake: Option<i64>,
    pub username: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PartialPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: i64,
    pub user_snowflake: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

fn post_content(
    title: String,
    author: String,
    url: String,
    likes: i64,
) -> Result<PostContent, ModelValidationError> {
    Ok(PostContent {
        title,
        author,
        url,
        likes: u32::try_from(likes)?,
    })
}

impl TryFrom<UserRecord> for UserSummary {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            name: value.name,
        })
    }
}

impl TryFrom<CredentialsRecord> for UserCredentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: UserSummary {
                id: value.user_snowflake.cast_unsigned().into(),
                username: Username::new(value.username)?,
                name: value.name,
            },
            password_hash: PasswordHash::from_phc(value.password_hash)?,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        let user = match (value.user_snowflake, value.username) {
            (Some(user_snowflake), Some(username)) => Some(UserSummary {
                id: user_snowflake.cast_unsigned().into(),
                username: Username::new(username)?,
                name: value.name,
            }),
            _ => None,
        };

        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            content: post_content(value.title, value.author, value.url, value.likes)?,
            user,
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            content: post_content(value.title, value.author, value.url, value.likes)?,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{FullPostRecord, PartialPostRecord};
    use bloglist_common::model::{
        ModelValidationError,
        post::{PartialPost, Post},
    };

    fn record() -> FullPostRecord {
        FullPostRecord {
            post_snowflake: 7,
            title: "Type wars".to_owned(),
            author: "Robert C. Martin".to_owned(),
            url: "http://blog.cleancoder.com/uncle-bob/2016/05/01/TypeWars.html".to_owned(),
            likes: 2,
            user_snowflake: Some(3),
            username: Some("root".to_owned()),
            name: None,
        }
    }

    #[test]
    fn post_with_owner() {
        let post = Post::try_from(record()).unwrap();

        assert_eq!(u64::from(post.id), 7);
        assert_eq!(post.content.likes, 2);
        let user = post.user.unwrap();
        assert_eq!(u64::from(user.id), 3);
        assert_eq!(user.username.get(), "root");
    }

    #[test]
    fn post_without_owner() {
        let record = FullPostRecord {
            user_snowflake: None,
            username: None,
            ..record()
        };

        assert_eq!(Post::try_from(record).unwrap().user, None);
    }

    #[test]
    fn invalid_records() {
        let negative_likes = PartialPostRecord {
            post_snowflake: 1,
            likes: -1,
            ..PartialPostRecord::default()
        };
        assert!(matches!(
            PartialPost::try_from(negative_likes),
            Err(ModelValidationError::Likes(_))
        ));

        let short_username = FullPostRecord {
            username: Some("ro".to_owned()),
            ..record()
        };
        assert!(matches!(
            Post::try_from(short_username),
            Err(ModelValidationError::Username(_))
        ));
    }
}
