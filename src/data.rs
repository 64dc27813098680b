use std::sync::Arc;

use thiserror::Error;

use crate::reddit::{self, ListingOptions, SortOption, ThreadNode};

/// The content source failed; the viewer shows a status message and keeps
/// the current page.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content source unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

pub trait FeedService: Send + Sync {
    /// One batch of submissions for a subreddit (front page when the name
    /// is empty), optionally continuing from an earlier batch's token.
    fn list_items(
        &self,
        subreddit: &str,
        sort: SortOption,
        limit: u32,
        after: Option<&str>,
    ) -> SourceResult<reddit::Listing<reddit::Post>>;
}

pub trait CommentService: Send + Sync {
    /// The reply tree of a submission, flattened to pre-order with parent
    /// references intact.
    fn list_replies(&self, post: &reddit::Post) -> SourceResult<Vec<ThreadNode>>;
}

pub struct RedditFeedService {
    client: Arc<reddit::Client>,
}

impl RedditFeedService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for RedditFeedService {
    fn list_items(
        &self,
        subreddit: &str,
        sort: SortOption,
        limit: u32,
        after: Option<&str>,
    ) -> SourceResult<reddit::Listing<reddit::Post>> {
        let opts = ListingOptions {
            after: after.map(str::to_string),
            before: None,
            limit: Some(limit),
        };
        self.client
            .subreddit_listing(subreddit, sort, opts)
            .map_err(SourceError::Unavailable)
    }
}

pub struct RedditCommentService {
    client: Arc<reddit::Client>,
}

impl RedditCommentService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for RedditCommentService {
    fn list_replies(&self, post: &reddit::Post) -> SourceResult<Vec<ThreadNode>> {
        let payload = self
            .client
            .comments(&post.id, ListingOptions::default())
            .map_err(SourceError::Unavailable)?;
        Ok(reddit::flatten_replies(&payload.comments))
    }
}

#[derive(Default)]
pub struct MockFeedService;

impl FeedService for MockFeedService {
    fn list_items(
        &self,
        subreddit: &str,
        _sort: SortOption,
        limit: u32,
        _after: Option<&str>,
    ) -> SourceResult<reddit::Listing<reddit::Post>> {
        let count = limit.min(3) as usize;
        let children = (0..count)
            .map(|index| reddit::Thing {
                kind: "t3".to_string(),
                data: mock_post(&format!("mock{index}"), subreddit),
            })
            .collect();
        Ok(reddit::Listing {
            after: None,
            before: None,
            children,
        })
    }
}

#[derive(Default)]
pub struct MockCommentService;

impl CommentService for MockCommentService {
    fn list_replies(&self, post: &reddit::Post) -> SourceResult<Vec<ThreadNode>> {
        Ok(vec![
            ThreadNode::Reply(reddit::Comment {
                id: "c1".to_string(),
                name: "t1_c1".to_string(),
                parent_id: format!("t3_{}", post.id),
                body: "Sample reply provided for offline browsing.".to_string(),
                author: "redterm".to_string(),
                score: 1,
                created_utc: 0.0,
                permalink: String::new(),
                count: 0,
                replies: None,
            }),
            ThreadNode::More {
                id: "m1".to_string(),
                parent_id: format!("t3_{}", post.id),
                count: 4,
            },
        ])
    }
}

fn mock_post(id: &str, subreddit: &str) -> reddit::Post {
    let subreddit = if subreddit.is_empty() {
        "frontpage"
    } else {
        subreddit
    };
    reddit::Post {
        id: id.to_string(),
        name: format!("t3_{id}"),
        title: format!("Sample post {id}"),
        subreddit: subreddit.to_string(),
        author: "redterm".to_string(),
        selftext: "Sample content provided for offline browsing.".to_string(),
        url: String::new(),
        permalink: format!("/r/{subreddit}/comments/{id}/"),
        score: 1234,
        num_comments: 42,
        created_utc: 0.0,
        stickied: false,
        over_18: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_feed_honors_the_limit() {
        let listing = MockFeedService
            .list_items("rust", SortOption::Hot, 2, None)
            .unwrap();
        assert_eq!(listing.children.len(), 2);
        assert_eq!(listing.children[0].data.subreddit, "rust");
    }

    #[test]
    fn mock_replies_end_in_a_stub() {
        let post = mock_post("p1", "rust");
        let nodes = MockCommentService.list_replies(&post).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(nodes[1], ThreadNode::More { count: 4, .. }));
    }

    #[test]
    fn source_errors_carry_their_cause() {
        let err = SourceError::Unavailable(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }
}
