use std::collections::HashMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::reddit::{self, ThreadNode};
use crate::text;

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("static pattern"));

/// One displayable unit on a page.
#[derive(Debug, Clone)]
pub enum Item {
    Submission(reddit::Post),
    Comment(reddit::Comment),
    MoreStub { count: i64 },
}

impl Item {
    /// Link to open externally, if the item has one.
    pub fn link(&self) -> Option<String> {
        match self {
            Item::Submission(post) => {
                if !post.url.trim().is_empty() {
                    Some(post.url.clone())
                } else if !post.permalink.is_empty() {
                    Some(format!("https://www.reddit.com{}", post.permalink))
                } else {
                    None
                }
            }
            Item::Comment(comment) => {
                if comment.permalink.is_empty() {
                    None
                } else {
                    Some(format!("https://www.reddit.com{}", comment.permalink))
                }
            }
            Item::MoreStub { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PageKind {
    Listing {
        subreddit: String,
        sort: reddit::SortOption,
        after: Option<String>,
    },
    Thread,
}

/// Layout knobs for [`Page::display_model`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayOptions {
    pub width: usize,
    pub indent_unit: usize,
    pub base_indent: usize,
    pub separators: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            width: 80,
            indent_unit: 2,
            base_indent: 2,
            separators: true,
        }
    }
}

/// The wrapped, fixed-width rendering of a page: every entry of `lines` is
/// exactly `width` display columns, and `item_lines[i]` is the index of the
/// first line belonging to item `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayModel {
    pub lines: Vec<String>,
    pub item_lines: Vec<usize>,
    pub width: usize,
}

impl DisplayModel {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn first_line(&self, item: usize) -> usize {
        self.item_lines.get(item).copied().unwrap_or(0)
    }
}

/// An ordered list of items with their rendered text blocks, indentation
/// depths, and the currently selected item.
#[derive(Debug, Clone)]
pub struct Page {
    title: String,
    kind: PageKind,
    items: Vec<Item>,
    blocks: Vec<String>,
    depths: Vec<usize>,
    selected: usize,
}

impl Page {
    /// A subreddit (or front page) listing. Rows are numbered in insertion
    /// order and sit at depth 0.
    pub fn listing(
        subreddit: &str,
        sort: reddit::SortOption,
        listing: reddit::Listing<reddit::Post>,
    ) -> Page {
        let name = subreddit.trim_start_matches("r/");
        let title = if name.is_empty() {
            "frontpage".to_string()
        } else {
            format!("/r/{}", name)
        };
        let mut page = Page {
            title,
            kind: PageKind::Listing {
                subreddit: name.to_string(),
                sort,
                after: None,
            },
            items: Vec::new(),
            blocks: Vec::new(),
            depths: Vec::new(),
            selected: 0,
        };
        page.append_posts(listing);
        page
    }

    /// A submission with its flattened reply tree. The post itself is the
    /// first item at depth 0; reply depths come from [`resolve_depths`].
    pub fn thread(post: reddit::Post, nodes: Vec<ThreadNode>) -> Page {
        let title = format!("/r/{}/{}", post.subreddit, post.title);

        let pairs: Vec<(&str, &str)> = nodes
            .iter()
            .map(|node| (node.id(), node.parent_id()))
            .collect();
        let reply_depths = resolve_depths(&post.id, &pairs);

        let mut items = vec![Item::Submission(post.clone())];
        let mut blocks = vec![post_block(&post)];
        let mut depths = vec![0];

        for (node, depth) in nodes.into_iter().zip(reply_depths) {
            match node {
                ThreadNode::Reply(comment) => {
                    blocks.push(comment_block(&comment));
                    items.push(Item::Comment(comment));
                }
                ThreadNode::More { count, .. } => {
                    blocks.push(more_block(count));
                    items.push(Item::MoreStub { count });
                }
            }
            depths.push(depth);
        }

        Page {
            title,
            kind: PageKind::Thread,
            items,
            blocks,
            depths,
            selected: 0,
        }
    }

    /// Append another batch of posts to a listing page, continuing the
    /// ordinal numbering. Any display model computed before this call is
    /// stale. Returns the number of items added.
    pub fn extend(&mut self, listing: reddit::Listing<reddit::Post>) -> usize {
        let before = self.items.len();
        self.append_posts(listing);
        self.items.len() - before
    }

    fn append_posts(&mut self, listing: reddit::Listing<reddit::Post>) {
        if let PageKind::Listing { after, .. } = &mut self.kind {
            *after = listing.after.clone();
        }
        for thing in listing.children {
            let post = thing.data;
            let ordinal = self.items.len() + 1;
            self.blocks.push(listing_row(ordinal, &post));
            self.depths.push(0);
            self.items.push(Item::Submission(post));
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &PageKind {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.items.get(self.selected)
    }

    pub fn depth(&self, index: usize) -> usize {
        self.depths.get(index).copied().unwrap_or(0)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Move the cursor. Out-of-range values are rejected, so callers may
    /// increment and decrement blindly.
    pub fn set_selected(&mut self, index: usize) {
        if index < self.items.len() {
            self.selected = index;
        }
    }

    /// Wrap every item's block at the given width and flatten the result
    /// into the fixed-width line buffer. Recomputed on demand; the output
    /// is a pure function of the page contents and `opts`.
    pub fn display_model(&self, opts: &DisplayOptions) -> DisplayModel {
        let width = opts.width.max(1);
        let mut lines = Vec::new();
        let mut item_lines = Vec::with_capacity(self.items.len());

        for (block, depth) in self.blocks.iter().zip(&self.depths) {
            // Leave at least one content column even when indentation
            // would swallow a narrow terminal.
            let indentation = (opts.base_indent + opts.indent_unit * depth)
                .min(width.saturating_sub(1));
            let budget = (width - indentation).max(1);

            item_lines.push(lines.len());
            let wrapped =
                text::wrap(block, budget).expect("wrap budget is clamped to at least one column");
            for line in wrapped {
                lines.push(pad_row(&line, indentation, width));
            }
            if opts.separators {
                lines.push(" ".repeat(width));
            }
        }

        debug_assert_eq!(item_lines.len(), self.items.len());
        debug_assert!(item_lines.windows(2).all(|pair| pair[0] <= pair[1]));

        DisplayModel {
            lines,
            item_lines,
            width,
        }
    }

    #[cfg(test)]
    pub(crate) fn fixture(blocks: Vec<String>) -> Page {
        let depths = vec![0; blocks.len()];
        let items = blocks
            .iter()
            .map(|_| Item::MoreStub { count: 0 })
            .collect();
        Page {
            title: "fixture".to_string(),
            kind: PageKind::Thread,
            items,
            blocks,
            depths,
            selected: 0,
        }
    }
}

fn pad_row(line: &str, indentation: usize, width: usize) -> String {
    let mut row = String::with_capacity(width);
    for _ in 0..indentation {
        row.push(' ');
    }
    row.push_str(line);
    let used = indentation + text::display_width(line);
    for _ in used..width {
        row.push(' ');
    }
    row
}

/// Compute the nesting depth of each entry of a flattened pre-order reply
/// walk, given `(id, parent_id)` pairs. The root sits at depth 0, so a
/// direct reply to it has depth 1.
///
/// A chain of ancestor ids tracks the path from the root to the entry most
/// recently placed: an entry whose parent is on the chain at position `k`
/// lands at depth `k + 1` and truncates everything deeper; an entry whose
/// parent is unknown (a malformed walk) nests one below its predecessor.
pub fn resolve_depths(root_id: &str, entries: &[(&str, &str)]) -> Vec<usize> {
    let root = strip_kind_prefix(root_id);
    let mut chain: Vec<String> = vec![root.to_string()];
    let mut positions: HashMap<String, usize> = HashMap::new();
    positions.insert(root.to_string(), 0);

    let mut depth = 0usize;
    let mut depths = Vec::with_capacity(entries.len());

    for (id, parent_id) in entries {
        let id = strip_kind_prefix(id);
        let parent = strip_kind_prefix(parent_id);

        if let Some(pos) = positions.get(parent).copied() {
            depth = pos + 1;
            for dropped in chain.drain(pos + 1..) {
                positions.remove(&dropped);
            }
        } else {
            depth += 1;
        }

        chain.push(id.to_string());
        positions.insert(id.to_string(), chain.len() - 1);
        depths.push(depth);
    }

    depths
}

/// Drop Reddit's `tN_` type prefix from a fullname, leaving the bare id.
fn strip_kind_prefix(id: &str) -> &str {
    match id.split_once('_') {
        Some((kind, rest)) if kind.len() == 2 && kind.starts_with('t') && !rest.is_empty() => rest,
        _ => id,
    }
}

fn listing_row(ordinal: usize, post: &reddit::Post) -> String {
    let mut meta = format!("{}pts {} comments by {}", post.score, post.num_comments, author_label(&post.author));
    if !post.subreddit.is_empty() {
        meta.push_str(&format!(" /r/{}", post.subreddit));
    }
    if let Some(age) = relative_age(post.created_utc) {
        meta.push_str(&format!(" {}", age));
    }
    format!("{}. {} ({})\n{}", ordinal, post.title, host_label(post), meta)
}

fn post_block(post: &reddit::Post) -> String {
    let mut block = format!(
        "{} ({})\n{}pts {} comments by {}",
        post.title,
        host_label(post),
        post.score,
        post.num_comments,
        author_label(&post.author),
    );
    let body = squeeze_blank_lines(post.selftext.trim_end());
    if !body.trim().is_empty() {
        block.push_str("\n\n");
        block.push_str(&body);
    }
    block
}

fn comment_block(comment: &reddit::Comment) -> String {
    format!(
        "* {} {}pts\n{}",
        author_label(&comment.author),
        comment.score,
        comment.body.trim_end(),
    )
}

fn more_block(count: i64) -> String {
    if count > 0 {
        format!("* {} more comments...", count)
    } else {
        "* More comments...".to_string()
    }
}

fn author_label(author: &str) -> &str {
    if author.trim().is_empty() {
        "[deleted]"
    } else {
        author
    }
}

fn host_label(post: &reddit::Post) -> String {
    Url::parse(&post.url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "self".to_string())
}

/// Collapse runs of blank lines into a single paragraph break.
fn squeeze_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

fn relative_age(created_utc: f64) -> Option<String> {
    if created_utc <= 0.0 {
        return None;
    }
    let created = created_utc.trunc() as i64;
    let elapsed = Utc::now().timestamp().saturating_sub(created);
    if elapsed < 0 {
        return None;
    }
    let label = match elapsed {
        secs if secs < 60 => format!("{}s", secs),
        secs if secs < 3600 => format!("{}m", secs / 60),
        secs if secs < 86_400 => format!("{}h", secs / 3600),
        secs => format!("{}d", secs / 86_400),
    };
    Some(label)
}
