use crate::model::{Id, user::UserSummary};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post with its owner expanded.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    #[serde(flatten)]
    pub content: PostContent,
    pub user: Option<UserSummary>,
}

/// A post as listed under its owner.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    #[serde(flatten)]
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: u32,
}

impl From<Post> for PartialPost {
    fn from(value: Post) -> Self {
        Self {
            id: value.id,
            content: value.content,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("title missing")]
    TitleMissing,
    #[error("author missing")]
    AuthorMissing,
    #[error("url missing")]
    UrlMissing,
}

/// Creation payload as sent by clients. `likes` defaults to zero.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct NewPost {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<u32>,
}

/// Update payload. Absent fields keep their current value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<u32>,
}

fn required(value: Option<String>, err: InvalidPostError) -> Result<String, InvalidPostError> {
    value.filter(|value| !value.trim().is_empty()).ok_or(err)
}

impl TryFrom<NewPost> for PostContent {
    type Error = InvalidPostError;

    fn try_from(value: NewPost) -> Result<Self, Self::Error> {
        Ok(Self {
            title: required(value.title, InvalidPostError::TitleMissing)?,
            author: required(value.author, InvalidPostError::AuthorMissing)?,
            url: required(value.url, InvalidPostError::UrlMissing)?,
            likes: value.likes.unwrap_or_default(),
        })
    }
}

impl PostUpdate {
    pub fn apply(self, content: PostContent) -> Result<PostContent, InvalidPostError> {
        let title = match self.title {
            Some(title) => required(Some(title), InvalidPostError::TitleMissing)?,
            None => content.title,
        };
        let author = match self.author {
            Some(author) => required(Some(author), InvalidPostError::AuthorMissing)?,
            None => content.author,
        };
        let url = match self.url {
            Some(url) => required(Some(url), InvalidPostError::UrlMissing)?,
            None => content.url,
        };

        Ok(PostContent {
            title,
            author,
            url,
            likes: self.likes.unwrap_or(content.likes),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{InvalidPostError, NewPost, Post, PostContent, PostUpdate};
    use serde_json::json;

    fn content() -> PostContent {
        PostContent {
            title: "React patterns".to_owned(),
            author: "Michael Chan".to_owned(),
            url: "https://reactpatterns.com/".to_owned(),
            likes: 7,
        }
    }

    #[test]
    fn likes_default_to_zero() {
        let new_post: NewPost = serde_json::from_value(json!({
            "title": "TDD harms architecture",
            "author": "Robert C. Martin",
            "url": "http://blog.cleancoder.com/uncle-bob/2017/03/03/TDD-Harms-Architecture.html",
        }))
        .unwrap();

        let content = PostContent::try_from(new_post).unwrap();
        assert_eq!(content.likes, 0);
        assert_eq!(content.author, "Robert C. Martin");
    }

    #[test]
    fn required_fields() {
        let complete = NewPost {
            title: Some("a".to_owned()),
            author: Some("b".to_owned()),
            url: Some("c".to_owned()),
            likes: Some(1),
        };

        let without_title = NewPost {
            title: None,
            ..complete.clone()
        };
        let blank_author = NewPost {
            author: Some("  ".to_owned()),
            ..complete.clone()
        };
        let without_url = NewPost {
            url: None,
            ..complete.clone()
        };

        assert!(PostContent::try_from(complete).is_ok());
        assert_eq!(
            PostContent::try_from(without_title),
            Err(InvalidPostError::TitleMissing)
        );
        assert_eq!(
            PostContent::try_from(blank_author),
            Err(InvalidPostError::AuthorMissing)
        );
        assert_eq!(
            PostContent::try_from(without_url),
            Err(InvalidPostError::UrlMissing)
        );
    }

    #[test]
    fn update_keeps_absent_fields() {
        let update = PostUpdate {
            title: Some("Changed Title".to_owned()),
            likes: Some(100),
            ..PostUpdate::default()
        };

        let updated = update.apply(content()).unwrap();
        assert_eq!(updated.title, "Changed Title");
        assert_eq!(updated.likes, 100);
        assert_eq!(updated.author, "Michael Chan");
        assert_eq!(updated.url, "https://reactpatterns.com/");

        let blank = PostUpdate {
            url: Some(String::new()),
            ..PostUpdate::default()
        };
        assert_eq!(blank.apply(content()), Err(InvalidPostError::UrlMissing));
    }

    #[test]
    fn post_json_is_flat() {
        let post = Post {
            id: 42.into(),
            content: content(),
            user: None,
        };

        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            json!({
                "id": "42",
                "title": "React patterns",
                "author": "Michael Chan",
                "url": "https://reactpatterns.com/",
                "likes": 7,
                "user": null,
            })
        );
    }
}
