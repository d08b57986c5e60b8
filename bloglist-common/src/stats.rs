//! Summary statistics over a list of posts.
//!
//! Every function accepts anything that iterates over [`PostContent`]
//! references, so they work on stored posts as well as on plain content.
//! Ties are always resolved in favour of whatever comes first in the input:
//! the first post for [`favorite_post`], the first-seen author otherwise.

use crate::model::post::PostContent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct FavoritePost {
    pub title: String,
    pub author: String,
    pub likes: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct AuthorPosts {
    pub author: String,
    pub count: usize,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct AuthorLikes {
    pub author: String,
    pub likes: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostStats {
    pub total_likes: u64,
    pub favorite_post: Option<FavoritePost>,
    pub most_posts: Option<AuthorPosts>,
    pub most_likes: Option<AuthorLikes>,
}

#[must_use]
pub fn total_likes<'a>(posts: impl IntoIterator<Item = &'a PostContent>) -> u64 {
    posts.into_iter().map(|post| u64::from(post.likes)).sum()
}

#[must_use]
pub fn favorite_post<'a>(
    posts: impl IntoIterator<Item = &'a PostContent>,
) -> Option<FavoritePost> {
    // `max_by_key` keeps the last maximum, hence the explicit loop.
    let mut favorite: Option<&PostContent> = None;
    for post in posts {
        if favorite.is_none_or(|favorite| post.likes > favorite.likes) {
            favorite = Some(post);
        }
    }

    favorite.map(|post| FavoritePost {
        title: post.title.clone(),
        author: post.author.clone(),
        likes: post.likes,
    })
}

/// Groups the posts by author, in order of first appearance.
fn group_by_author<'a, T>(
    posts: impl IntoIterator<Item = &'a PostContent>,
    mut accumulate: impl FnMut(&mut T, &PostContent),
) -> IndexMap<&'a str, T>
where
    T: Default,
{
    let mut groups = IndexMap::<&str, T>::new();
    for post in posts {
        accumulate(groups.entry(post.author.as_str()).or_default(), post);
    }
    groups
}

/// The first entry with the greatest value.
fn first_max<K, V: Ord>(groups: IndexMap<K, V>) -> Option<(K, V)> {
    let mut max: Option<(K, V)> = None;
    for (key, value) in groups {
        if max.as_ref().is_none_or(|(_, max_value)| value > *max_value) {
            max = Some((key, value));
        }
    }
    max
}

#[must_use]
pub fn author_with_most_posts<'a>(
    posts: impl IntoIterator<Item = &'a PostContent>,
) -> Option<AuthorPosts> {
    let groups = group_by_author(posts, |count: &mut usize, _| *count += 1);

    first_max(groups).map(|(author, count)| AuthorPosts {
        author: author.to_owned(),
        count,
    })
}

#[must_use]
pub fn author_with_most_likes<'a>(
    posts: impl IntoIterator<Item = &'a PostContent>,
) -> Option<AuthorLikes> {
    let groups = group_by_author(posts, |likes: &mut u64, post| {
        *likes += u64::from(post.likes);
    });

    first_max(groups).map(|(author, likes)| AuthorLikes {
        author: author.to_owned(),
        likes,
    })
}

#[must_use]
pub fn summarize<'a, I>(posts: I) -> PostStats
where
    I: IntoIterator<Item = &'a PostContent>,
    I::IntoIter: Clone,
{
    let posts = posts.into_iter();

    PostStats {
        total_likes: total_likes(posts.clone()),
        favorite_post: favorite_post(posts.clone()),
        most_posts: author_with_most_posts(posts.clone()),
        most_likes: author_with_most_likes(posts),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::post::PostContent,
        stats::{
            AuthorLikes, AuthorPosts, FavoritePost, PostStats, author_with_most_likes,
            author_with_most_posts, favorite_post, group_by_author, summarize, total_likes,
        },
    };
    use serde_json::json;

    fn post(title: &str, author: &str, likes: u32) -> PostContent {
        PostContent {
            title: title.to_owned(),
            author: author.to_owned(),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            likes,
        }
    }

    fn posts() -> Vec<PostContent> {
        vec![
            post("React patterns", "Michael Chan", 7),
            post("Go To Statement Considered Harmful", "Edsger W. Dijkstra", 5),
            post("Canonical string reduction", "Edsger W. Dijkstra", 12),
            post("First class tests", "Robert C. Martin", 10),
            post("TDD harms architecture", "Robert C. Martin", 0),
            post("Type wars", "Robert C. Martin", 2),
        ]
    }

    #[test]
    fn empty_list() {
        let posts: Vec<PostContent> = Vec::new();

        assert_eq!(total_likes(&posts), 0);
        assert_eq!(favorite_post(&posts), None);
        assert_eq!(author_with_most_posts(&posts), None);
        assert_eq!(author_with_most_likes(&posts), None);
        assert_eq!(summarize(&posts), PostStats::default());
    }

    #[test]
    fn single_post() {
        let posts = [post("Go To Statement Considered Harmful", "Edsger W. Dijkstra", 5)];

        assert_eq!(total_likes(&posts), 5);
        assert_eq!(
            author_with_most_posts(&posts),
            Some(AuthorPosts {
                author: "Edsger W. Dijkstra".to_owned(),
                count: 1,
            })
        );
    }

    #[test]
    fn total_likes_of_bigger_list() {
        let mut posts = posts();
        assert_eq!(total_likes(&posts), 36);

        posts.reverse();
        assert_eq!(total_likes(&posts), 36);
    }

    #[test]
    fn favorite_post_has_most_likes() {
        assert_eq!(
            favorite_post(&posts()),
            Some(FavoritePost {
                title: "Canonical string reduction".to_owned(),
                author: "Edsger W. Dijkstra".to_owned(),
                likes: 12,
            })
        );
    }

    #[test]
    fn favorite_post_ties_go_to_the_first() {
        let posts = [post("a", "x", 3), post("b", "y", 9), post("c", "z", 9)];

        assert_eq!(favorite_post(&posts).unwrap().title, "b");
    }

    #[test]
    fn most_posts() {
        let posts = posts();
        let result = author_with_most_posts(&posts).unwrap();

        assert_eq!(
            result,
            AuthorPosts {
                author: "Robert C. Martin".to_owned(),
                count: 3,
            }
        );
    }

    #[test]
    fn most_likes() {
        assert_eq!(
            author_with_most_likes(&posts()),
            Some(AuthorLikes {
                author: "Edsger W. Dijkstra".to_owned(),
                likes: 17,
            })
        );
    }

    #[test]
    fn author_ties_go_to_the_first_seen() {
        let posts = [
            post("a", "Second", 1),
            post("b", "First", 4),
            post("c", "Second", 3),
            post("d", "First", 0),
        ];

        // Both have two posts and four likes; "Second" appeared first.
        assert_eq!(author_with_most_posts(&posts).unwrap().author, "Second");
        assert_eq!(author_with_most_likes(&posts).unwrap().author, "Second");
    }

    #[test]
    fn authors_are_compared_exactly() {
        let posts = [
            post("a", "Robert C. Martin", 1),
            post("b", "robert c. martin", 1),
            post("c", "Robert C. Martin ", 1),
            post("d", "Michael Chan", 1),
            post("e", "Michael Chan", 1),
        ];

        assert_eq!(
            author_with_most_posts(&posts),
            Some(AuthorPosts {
                author: "Michael Chan".to_owned(),
                count: 2,
            })
        );
    }

    #[test]
    fn summary_matches_individual_results() {
        let posts = posts();
        let stats = summarize(&posts);

        assert_eq!(stats.total_likes, total_likes(&posts));
        assert_eq!(stats.favorite_post, favorite_post(&posts));
        assert_eq!(stats.most_posts, author_with_most_posts(&posts));
        assert_eq!(stats.most_likes, author_with_most_likes(&posts));
    }

    /// The canonical fixture in several orders, plus a few unrelated lists.
    fn permutations() -> Vec<Vec<PostContent>> {
        let mut lists = Vec::new();

        let fixture = posts();
        for shift in 0..fixture.len() {
            let mut rotated = fixture.clone();
            rotated.rotate_left(shift);
            lists.push(rotated.clone());
            rotated.reverse();
            lists.push(rotated);
        }

        lists.push(vec![post("only", "Solo", 0)]);
        lists.push(vec![
            post("a", "A", 4),
            post("b", "B", 4),
            post("c", "A", 0),
            post("d", "C", 9),
            post("e", "B", 1),
        ]);
        lists.push(vec![
            post("x", "Same", 1),
            post("y", "Same", 1),
            post("z", "Same", 1),
        ]);

        lists
    }

    #[test]
    fn properties_hold_for_any_order() {
        for posts in permutations() {
            let favorite = favorite_post(&posts).unwrap();
            assert!(posts.iter().all(|post| favorite.likes >= post.likes));
            assert!(posts.iter().any(|post| post.title == favorite.title
                && post.author == favorite.author
                && post.likes == favorite.likes));

            let counts = group_by_author(&posts, |count: &mut usize, _| *count += 1);
            assert_eq!(counts.values().sum::<usize>(), posts.len());

            let most_posts = author_with_most_posts(&posts).unwrap();
            assert_eq!(Some(&most_posts.count), counts.values().max());
            assert_eq!(counts[most_posts.author.as_str()], most_posts.count);

            let likes = group_by_author(&posts, |likes: &mut u64, post| {
                *likes += u64::from(post.likes);
            });
            assert_eq!(likes.values().sum::<u64>(), total_likes(&posts));

            let most_likes = author_with_most_likes(&posts).unwrap();
            assert_eq!(Some(&most_likes.likes), likes.values().max());
            assert_eq!(likes[most_likes.author.as_str()], most_likes.likes);
        }
    }

    #[test]
    fn serialized_shape() {
        let stats = summarize(&posts());

        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({
                "total_likes": 36,
                "favorite_post": {
                    "title": "Canonical string reduction",
                    "author": "Edsger W. Dijkstra",
                    "likes": 12,
                },
                "most_posts": { "author": "Robert C. Martin", "count": 3 },
                "most_likes": { "author": "Edsger W. Dijkstra", "likes": 17 },
            })
        );
    }
}
