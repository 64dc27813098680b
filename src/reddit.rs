use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::USER_AGENT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com/";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: Option<u32>,
}

impl ListingOptions {
    fn into_params(self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(after) = self.after {
            params.push(("after".into(), after));
        }
        if let Some(before) = self.before {
            params.push(("before".into(), before));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Hot,
    New,
    Top,
    Best,
    Rising,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Hot => "hot",
            SortOption::New => "new",
            SortOption::Top => "top",
            SortOption::Best => "best",
            SortOption::Rising => "rising",
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("reddit client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn subreddit_listing(
        &self,
        subreddit: &str,
        sort: SortOption,
        opts: ListingOptions,
    ) -> Result<Listing<Post>> {
        let path = if subreddit.is_empty() {
            format!("{}.json", sort.as_str())
        } else {
            format!(
                "r/{}/{}.json",
                subreddit.trim_start_matches("r/"),
                sort.as_str()
            )
        };
        self.fetch_listing(&path, opts)
    }

    pub fn front_page(&self, sort: SortOption, opts: ListingOptions) -> Result<Listing<Post>> {
        self.subreddit_listing("", sort, opts)
    }

    /// Fetch a submission together with its comment tree. The endpoint
    /// answers with a two-element array: a listing holding the post, then
    /// the comment listing.
    pub fn comments(&self, article: &str, opts: ListingOptions) -> Result<PostComments> {
        let path = format!("comments/{}.json", article);
        let params = opts.into_params();
        let resp = self.request(Method::GET, &path, &params)?;
        let payload: Vec<Value> = resp.json()?;
        if payload.len() < 2 {
            bail!("reddit: comments payload missing elements");
        }
        let post_listing: ListingEnvelope<Post> =
            serde_json::from_value(payload[0].clone()).context("reddit: decode post listing")?;
        let comments_listing: ListingEnvelope<Comment> =
            serde_json::from_value(payload[1].clone()).context("reddit: decode comment listing")?;
        let post = post_listing
            .data
            .children
            .into_iter()
            .next()
            .map(|thing| thing.data)
            .ok_or_else(|| anyhow!("reddit: post listing empty"))?;
        Ok(PostComments {
            post,
            comments: comments_listing.data,
        })
    }

    fn fetch_listing<T>(&self, path: &str, opts: ListingOptions) -> Result<Listing<T>>
    where
        T: DeserializeOwned,
    {
        let params = opts.into_params();
        let resp = self.request(Method::GET, path, &params)?;
        let listing: ListingEnvelope<T> = resp.json()?;
        Ok(listing.data)
    }

    fn request(&self, method: Method, path: &str, params: &[(String, String)]) -> Result<Response> {
        let mut url = self.base_url.join(path)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }

        let req = self
            .http
            .request(method, url)
            .header(USER_AGENT, self.user_agent.clone());
        let resp = req.send()?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            match status.as_u16() {
                403 => Err(anyhow!("reddit: forbidden")),
                404 => Err(anyhow!("reddit: not found")),
                429 => Err(anyhow!("reddit: rate limited: {}", body)),
                _ => Err(anyhow!("reddit: api error {}: {}", status, body)),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    pub after: Option<String>,
    pub before: Option<String>,
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub name: String,
    pub title: String,
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub over_18: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub replies: Option<Box<Listing<Comment>>>,
}

impl<'de> Deserialize<'de> for Comment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Reddit sends `replies: ""` instead of null on leaf comments, so
        // the field needs a by-hand decode. "more" stubs arrive through
        // the same children array with most fields missing.
        #[derive(Deserialize)]
        struct CommentHelper {
            #[serde(default)]
            id: String,
            #[serde(default)]
            name: String,
            #[serde(default)]
            parent_id: String,
            #[serde(default)]
            body: String,
            #[serde(default)]
            author: String,
            #[serde(default)]
            score: i64,
            #[serde(default)]
            created_utc: f64,
            #[serde(default)]
            permalink: String,
            #[serde(default)]
            count: i64,
            #[serde(default)]
            replies: serde_json::Value,
        }

        let helper = CommentHelper::deserialize(deserializer)?;
        let replies = if helper.replies.is_null() || helper.replies == "" {
            None
        } else {
            serde_json::from_value::<ListingEnvelope<Comment>>(helper.replies)
                .ok()
                .map(|listing| Box::new(listing.data))
        };
        Ok(Comment {
            id: helper.id,
            name: helper.name,
            parent_id: helper.parent_id,
            body: helper.body,
            author: helper.author,
            score: helper.score,
            created_utc: helper.created_utc,
            permalink: helper.permalink,
            count: helper.count,
            replies,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostComments {
    pub post: Post,
    pub comments: Listing<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ListingEnvelope<T> {
    kind: String,
    data: Listing<T>,
}

/// One entry of a comment tree flattened to pre-order: a reply, or a stub
/// standing in for a truncated subtree.
#[derive(Debug, Clone)]
pub enum ThreadNode {
    Reply(Comment),
    More {
        id: String,
        parent_id: String,
        count: i64,
    },
}

impl ThreadNode {
    pub fn id(&self) -> &str {
        match self {
            ThreadNode::Reply(comment) => &comment.id,
            ThreadNode::More { id, .. } => id,
        }
    }

    pub fn parent_id(&self) -> &str {
        match self {
            ThreadNode::Reply(comment) => &comment.parent_id,
            ThreadNode::More { parent_id, .. } => parent_id,
        }
    }
}

/// Flatten a comment listing into the depth-first order it renders in,
/// keeping "more" placeholders in place.
pub fn flatten_replies(listing: &Listing<Comment>) -> Vec<ThreadNode> {
    let mut nodes = Vec::new();
    collect_nodes(listing, &mut nodes);
    nodes
}

fn collect_nodes(listing: &Listing<Comment>, out: &mut Vec<ThreadNode>) {
    for thing in &listing.children {
        let comment = &thing.data;
        if thing.kind == "more" {
            out.push(ThreadNode::More {
                id: comment.id.clone(),
                parent_id: comment.parent_id.clone(),
                count: comment.count,
            });
            continue;
        }
        out.push(ThreadNode::Reply(comment.clone()));
        if let Some(replies) = &comment.replies {
            collect_nodes(replies, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment_listing(value: serde_json::Value) -> Listing<Comment> {
        let envelope: ListingEnvelope<Comment> = serde_json::from_value(value).unwrap();
        envelope.data
    }

    #[test]
    fn decodes_empty_string_replies_as_none() {
        let listing = comment_listing(json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "before": null,
                "children": [{
                    "kind": "t1",
                    "data": {
                        "id": "c1",
                        "name": "t1_c1",
                        "parent_id": "t3_post",
                        "body": "leaf",
                        "author": "ann",
                        "replies": ""
                    }
                }]
            }
        }));
        assert!(listing.children[0].data.replies.is_none());
    }

    #[test]
    fn flatten_walks_depth_first_and_keeps_stubs() {
        let listing = comment_listing(json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "before": null,
                "children": [
                    {
                        "kind": "t1",
                        "data": {
                            "id": "c1",
                            "name": "t1_c1",
                            "parent_id": "t3_post",
                            "body": "first",
                            "replies": {
                                "kind": "Listing",
                                "data": {
                                    "after": null,
                                    "before": null,
                                    "children": [{
                                        "kind": "t1",
                                        "data": {
                                            "id": "c2",
                                            "name": "t1_c2",
                                            "parent_id": "t1_c1",
                                            "body": "nested",
                                            "replies": ""
                                        }
                                    }]
                                }
                            }
                        }
                    },
                    {
                        "kind": "more",
                        "data": {
                            "id": "m1",
                            "parent_id": "t3_post",
                            "count": 12
                        }
                    }
                ]
            }
        }));

        let nodes = flatten_replies(&listing);
        let ids: Vec<&str> = nodes.iter().map(|node| node.id()).collect();
        assert_eq!(ids, vec!["c1", "c2", "m1"]);
        assert!(matches!(nodes[2], ThreadNode::More { count: 12, .. }));
    }
}
