use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config;
use crate::data::{self, CommentService, FeedService};
use crate::logging;
use crate::reddit;
use crate::term;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub subreddit: Option<String>,
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file,
        env_prefix: None,
    })
    .context("load config")?;

    if let Some(path) = cfg.log.file.as_ref() {
        logging::init(path).context("init logging")?;
    }
    info!(version = crate::VERSION, "starting redterm");

    let client = reddit::Client::new(reddit::ClientConfig {
        user_agent: cfg.reddit.user_agent.clone(),
        base_url: cfg.reddit.base_url.clone(),
        http_client: None,
    })
    .context("create reddit client")?;
    let client = Arc::new(client);

    let feed: Arc<dyn FeedService + Send + Sync> =
        Arc::new(data::RedditFeedService::new(client.clone()));
    let comments: Arc<dyn CommentService + Send + Sync> =
        Arc::new(data::RedditCommentService::new(client));

    let subreddit = opts
        .subreddit
        .unwrap_or_else(|| cfg.fetch.subreddit.clone());

    let options = ui::Options {
        feed,
        comments,
        subreddit,
        sort: cfg.fetch.sort,
        fetch_limit: cfg.fetch.limit,
        poll_interval: cfg.input.poll_interval,
        indent_unit: cfg.ui.indent_unit,
        base_indent: cfg.ui.base_indent,
        separators: cfg.ui.separators,
        keep_root: cfg.ui.keep_root,
    };

    let mut model = ui::Model::new(term::Terminal::new(), options);
    model.run()
}
