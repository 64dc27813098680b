use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::data::{CommentService, FeedService, SourceError};
use crate::page::{DisplayModel, DisplayOptions, Item, Page, PageKind};
use crate::reddit;
use crate::session::{PopOutcome, Session};
use crate::term::{self, InputEvent, Key, OutputDevice, ScreenGuard};
use crate::text;

pub struct Options {
    pub feed: Arc<dyn FeedService + Send + Sync>,
    pub comments: Arc<dyn CommentService + Send + Sync>,
    pub subreddit: String,
    pub sort: reddit::SortOption,
    pub fetch_limit: u32,
    pub poll_interval: Duration,
    pub indent_unit: usize,
    pub base_indent: usize,
    pub separators: bool,
    pub keep_root: bool,
}

/// The visible window over a page's line buffer.
///
/// `render_offset` is the page-snapped scroll position, always within the
/// buffer. `render_offset_item` shifts the window inside a single item
/// taller than the screen; it goes negative while scrolling back up into
/// such an item from below.
#[derive(Debug, Default)]
struct Viewport {
    render_offset: usize,
    render_offset_item: isize,
    width: u16,
    height: u16,
}

impl Viewport {
    /// Rows available for content; one row is the title/status bar.
    fn content_height(&self) -> usize {
        (self.height as usize).saturating_sub(1)
    }

    fn reset_offsets(&mut self) {
        self.render_offset = 0;
        self.render_offset_item = 0;
    }

    fn first_visible_line(&self) -> usize {
        (self.render_offset as isize + self.render_offset_item).max(0) as usize
    }
}

pub struct Model<D: OutputDevice> {
    device: D,
    opts: Options,
    session: Session,
    viewport: Viewport,
    display: Option<DisplayModel>,
    status: Option<String>,
    needs_redraw: bool,
}

impl<D: OutputDevice> Model<D> {
    pub fn new(device: D, opts: Options) -> Self {
        let keep_root = opts.keep_root;
        Self {
            device,
            opts,
            session: Session::new(keep_root),
            viewport: Viewport::default(),
            display: None,
            status: None,
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let _screen = ScreenGuard::enter()?;
        let (width, height) = self.device.size()?;
        self.viewport.width = width;
        self.viewport.height = height;
        self.device.clear()?;

        self.load_initial()?;
        self.event_loop()
    }

    fn event_loop(&mut self) -> Result<()> {
        loop {
            if self.needs_redraw {
                self.paint()?;
            }

            match term::poll_event(self.opts.poll_interval)? {
                Some(InputEvent::Key(key)) => match self.handle_key(key) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => {
                        warn!("key handler failed: {err:#}");
                        self.status = Some(format!("Error: {err}"));
                        self.needs_redraw = true;
                    }
                },
                Some(InputEvent::Resize(width, height)) => self.resize(width, height)?,
                None => {}
            }
        }
        Ok(())
    }

    fn load_initial(&mut self) -> Result<()> {
        let subreddit = self.opts.subreddit.clone();
        let listing = match self.opts.feed.list_items(
            &subreddit,
            self.opts.sort,
            self.opts.fetch_limit,
            None,
        ) {
            Ok(listing) => listing,
            Err(err) => {
                warn!("initial fetch failed: {err}");
                self.status = Some(err.to_string());
                reddit::Listing {
                    after: None,
                    before: None,
                    children: Vec::new(),
                }
            }
        };
        let page = Page::listing(&subreddit, self.opts.sort, listing);
        info!(items = page.len(), title = page.title(), "opened listing");
        self.session.push(page);
        self.reset_view();
        Ok(())
    }

    /// Returns true when the application should quit.
    fn handle_key(&mut self, key: Key) -> Result<bool> {
        match key {
            Key::Escape | Key::Char('q') => return Ok(true),
            Key::Up | Key::Char('k') => self.select_prev_item()?,
            Key::Down | Key::Char('j') => self.select_next_item()?,
            Key::PageUp => self.select_prev_screen()?,
            Key::PageDown => self.select_next_screen()?,
            Key::Enter => self.open_selected()?,
            Key::Backspace => {
                if self.go_back()? {
                    return Ok(true);
                }
            }
            Key::Char('o') => self.open_link()?,
            Key::Char('m') => self.load_more()?,
            Key::Char('r') => self.refresh()?,
            _ => {}
        }
        Ok(false)
    }

    fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            width: self.viewport.width as usize,
            indent_unit: self.opts.indent_unit,
            base_indent: self.opts.base_indent,
            separators: self.opts.separators,
        }
    }

    fn ensure_display(&mut self) -> Result<()> {
        if self.display.is_none() {
            let opts = self.display_options();
            let page = self.session.current()?;
            self.display = Some(page.display_model(&opts));
        }
        Ok(())
    }

    /// Forget the display model and offsets; the next paint starts from
    /// the top of the (new) current page.
    fn reset_view(&mut self) {
        self.viewport.reset_offsets();
        self.display = None;
        self.needs_redraw = true;
    }

    fn select_next_item(&mut self) -> Result<()> {
        self.ensure_display()?;
        let height = self.viewport.content_height() as isize;
        let page = self.session.current_mut()?;
        if page.is_empty() || height == 0 {
            return Ok(());
        }
        let display = self.display.as_ref().expect("display ensured above");

        let current = page.selected();
        let distance = distance_between(display, current, current + 1) as isize;
        // A next item within one screen is selected outright; otherwise
        // the current item is taller than the window and the window slides
        // down inside it first.
        if distance - self.viewport.render_offset_item < height {
            page.set_selected(current + 1);
            self.viewport.render_offset_item = 0;
        } else {
            self.viewport.render_offset_item += height;
        }

        self.clamp_render_offset();
        self.needs_redraw = true;
        Ok(())
    }

    fn select_prev_item(&mut self) -> Result<()> {
        self.ensure_display()?;
        let height = self.viewport.content_height() as isize;
        let page = self.session.current_mut()?;
        if page.is_empty() || height == 0 {
            return Ok(());
        }
        let display = self.display.as_ref().expect("display ensured above");

        let current = page.selected();
        let distance = match current.checked_sub(1) {
            Some(prev) => distance_between(display, current, prev) as isize,
            None => 0,
        };
        if distance + self.viewport.render_offset_item < height {
            page.set_selected(current.saturating_sub(1));
            self.viewport.render_offset_item = 0;
        } else {
            // Scrolling back up into an item taller than the window: the
            // sub-item offset goes negative until its top comes into view.
            self.viewport.render_offset_item -= height;
        }

        self.clamp_render_offset();
        self.needs_redraw = true;
        Ok(())
    }

    fn select_next_screen(&mut self) -> Result<()> {
        self.jump_screen(true)
    }

    fn select_prev_screen(&mut self) -> Result<()> {
        self.jump_screen(false)
    }

    fn jump_screen(&mut self, forward: bool) -> Result<()> {
        self.ensure_display()?;
        let height = self.viewport.content_height();
        let page = self.session.current_mut()?;
        if page.is_empty() || height == 0 {
            return Ok(());
        }
        let display = self.display.as_ref().expect("display ensured above");

        let current_first = display.first_line(page.selected());
        let target = if forward {
            current_first + height
        } else {
            current_first.saturating_sub(height)
        };
        page.set_selected(closest_item(&display.item_lines, target));
        self.viewport.render_offset_item = 0;

        self.clamp_render_offset();
        self.needs_redraw = true;
        Ok(())
    }

    /// Recompute the display model at the new size and re-anchor the
    /// window so the selected item stays visible.
    fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        debug!(width, height, "terminal resized");
        self.viewport.width = width;
        self.viewport.height = height;
        self.display = None;
        self.ensure_display()?;

        let page = self.session.current()?;
        let display = self.display.as_ref().expect("display ensured above");
        self.viewport.render_offset = display.first_line(page.selected());
        self.viewport.render_offset_item = 0;
        self.needs_redraw = true;
        Ok(())
    }

    /// Keep the selected item's first line inside the window, moving the
    /// scroll position a whole screen at a time so scrolling stays snapped
    /// to page boundaries.
    fn clamp_render_offset(&mut self) {
        let Some(display) = self.display.as_ref() else {
            return;
        };
        let Ok(page) = self.session.current() else {
            return;
        };
        if page.is_empty() {
            return;
        }
        let height = self.viewport.content_height();
        if height == 0 {
            return;
        }

        let first = display.first_line(page.selected());
        while first >= self.viewport.render_offset + height {
            self.viewport.render_offset += height;
        }
        while first < self.viewport.render_offset {
            self.viewport.render_offset = self.viewport.render_offset.saturating_sub(height);
        }
    }

    fn open_selected(&mut self) -> Result<()> {
        let page = self.session.current()?;
        if !matches!(page.kind(), PageKind::Listing { .. }) {
            return Ok(());
        }
        let post = match page.selected_item() {
            Some(Item::Submission(post)) => post.clone(),
            _ => return Ok(()),
        };

        match self.opts.comments.list_replies(&post) {
            Ok(nodes) => {
                let thread = Page::thread(post, nodes);
                info!(items = thread.len(), title = thread.title(), "opened thread");
                self.session.push(thread);
                self.status = None;
                self.reset_view();
            }
            Err(err) => self.report_source_error(err),
        }
        Ok(())
    }

    fn go_back(&mut self) -> Result<bool> {
        match self.session.pop() {
            PopOutcome::Popped | PopOutcome::KeptRoot => {
                self.status = None;
                self.reset_view();
                Ok(false)
            }
            PopOutcome::Exit => Ok(true),
        }
    }

    fn open_link(&mut self) -> Result<()> {
        let Some(link) = self.session.current()?.selected_item().and_then(Item::link) else {
            return Ok(());
        };
        match webbrowser::open(&link) {
            Ok(()) => self.status = Some(format!("Opened {link}")),
            Err(err) => {
                warn!("browser launch failed: {err}");
                self.status = Some(format!("Could not open {link}"));
            }
        }
        self.needs_redraw = true;
        Ok(())
    }

    fn load_more(&mut self) -> Result<()> {
        let (subreddit, sort, after) = match self.session.current()?.kind() {
            PageKind::Listing {
                subreddit,
                sort,
                after,
            } => (subreddit.clone(), *sort, after.clone()),
            PageKind::Thread => return Ok(()),
        };
        let Some(after) = after else {
            self.status = Some("No more posts.".to_string());
            self.needs_redraw = true;
            return Ok(());
        };

        match self
            .opts
            .feed
            .list_items(&subreddit, sort, self.opts.fetch_limit, Some(&after))
        {
            Ok(listing) => {
                let page = self.session.current_mut()?;
                let added = page.extend(listing);
                // The buffer grew at the end only, so the offsets stay
                // valid; re-clamp and redraw with the fresh model.
                self.display = None;
                self.ensure_display()?;
                self.clamp_render_offset();
                self.status = Some(format!("Loaded {added} more posts."));
                self.needs_redraw = true;
            }
            Err(err) => self.report_source_error(err),
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        let (subreddit, sort) = match self.session.current()?.kind() {
            PageKind::Listing {
                subreddit, sort, ..
            } => (subreddit.clone(), *sort),
            PageKind::Thread => return Ok(()),
        };

        match self
            .opts
            .feed
            .list_items(&subreddit, sort, self.opts.fetch_limit, None)
        {
            Ok(listing) => {
                let fresh = Page::listing(&subreddit, sort, listing);
                *self.session.current_mut()? = fresh;
                self.status = Some("Refreshed.".to_string());
                self.reset_view();
            }
            Err(err) => self.report_source_error(err),
        }
        Ok(())
    }

    fn report_source_error(&mut self, err: SourceError) {
        warn!("content source failed: {err}");
        self.status = Some(err.to_string());
        self.needs_redraw = true;
    }

    fn paint(&mut self) -> Result<()> {
        self.ensure_display()?;
        let page = self.session.current()?;
        let display = self.display.as_ref().expect("display ensured above");
        let width = self.viewport.width as usize;
        let height = self.viewport.content_height();
        if width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        self.device.set_title(page.title())?;
        let header = header_line(page.title(), self.status.as_deref(), width);
        self.device.write_at(0, 0, &header)?;

        let blank = " ".repeat(width);
        if page.is_empty() {
            // Nothing to render or select; keep the content area clear so
            // only the status bar speaks.
            for row in 0..height {
                self.device.write_at(row as u16 + 1, 0, &blank)?;
            }
            self.device.flush()?;
            self.needs_redraw = false;
            return Ok(());
        }

        let start = self.viewport.first_visible_line();
        for row in 0..height {
            let line = display.lines.get(start + row).unwrap_or(&blank);
            self.device.write_at(row as u16 + 1, 0, line)?;
        }

        // The cursor only makes sense when the selected item's first line
        // is on screen; a nonzero sub-item offset means it is not.
        if self.viewport.render_offset_item == 0 {
            let first = display.first_line(page.selected());
            if first >= self.viewport.render_offset {
                let row = first - self.viewport.render_offset;
                if row < height {
                    let marker = cursor_marker(page.depth(page.selected()), self.opts.indent_unit);
                    self.device.write_at(row as u16 + 1, 0, &marker)?;
                }
            }
        }

        self.device.flush()?;
        self.needs_redraw = false;
        Ok(())
    }
}

/// Vertical distance in wrapped lines between two items' first lines.
/// Either index out of bounds yields zero, so navigating past the ends is
/// harmless.
fn distance_between(display: &DisplayModel, a: usize, b: usize) -> usize {
    match (display.item_lines.get(a), display.item_lines.get(b)) {
        (Some(&first_a), Some(&first_b)) => first_a.abs_diff(first_b),
        _ => 0,
    }
}

/// Index of the item whose first line is closest to `target`; ties go to
/// the earlier item.
fn closest_item(item_lines: &[usize], target: usize) -> usize {
    let mut best = 0;
    let mut best_distance = usize::MAX;
    for (index, &line) in item_lines.iter().enumerate() {
        let distance = line.abs_diff(target);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn cursor_marker(depth: usize, indent_unit: usize) -> String {
    let mut marker = String::from(">");
    for _ in 0..depth * indent_unit {
        marker.push('-');
    }
    marker
}

fn header_line(title: &str, status: Option<&str>, width: usize) -> String {
    let mut bar = format!(" {title}");
    if let Some(status) = status {
        bar.push_str("  |  ");
        bar.push_str(status);
    }
    clip_and_pad(&bar, width)
}

fn clip_and_pad(line: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in line.chars() {
        let w = text::char_width(ch);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    for _ in used..width {
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockCommentService, MockFeedService, SourceResult};
    use crate::text::display_width;

    #[derive(Default)]
    struct RecordingDevice {
        writes: Vec<(u16, u16, String)>,
        titles: Vec<String>,
    }

    impl OutputDevice for RecordingDevice {
        fn size(&self) -> Result<(u16, u16)> {
            Ok((80, 24))
        }

        fn write_at(&mut self, row: u16, col: u16, text: &str) -> Result<()> {
            self.writes.push((row, col, text.to_string()));
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_title(&mut self, title: &str) -> Result<()> {
            self.titles.push(title.to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct FailingFeed;

    impl FeedService for FailingFeed {
        fn list_items(
            &self,
            _subreddit: &str,
            _sort: reddit::SortOption,
            _limit: u32,
            _after: Option<&str>,
        ) -> SourceResult<reddit::Listing<reddit::Post>> {
            Err(SourceError::Unavailable(anyhow::anyhow!(
                "connection refused"
            )))
        }
    }

    struct FailingComments;

    impl CommentService for FailingComments {
        fn list_replies(&self, _post: &reddit::Post) -> SourceResult<Vec<reddit::ThreadNode>> {
            Err(SourceError::Unavailable(anyhow::anyhow!(
                "connection refused"
            )))
        }
    }

    fn test_options() -> Options {
        Options {
            feed: Arc::new(MockFeedService),
            comments: Arc::new(MockCommentService),
            subreddit: String::new(),
            sort: reddit::SortOption::Hot,
            fetch_limit: 25,
            poll_interval: Duration::from_millis(10),
            indent_unit: 0,
            base_indent: 0,
            separators: false,
            keep_root: true,
        }
    }

    /// A model showing one fixture page whose items have the given block
    /// heights, so the item line index is their running sum.
    fn fixture_model(heights: &[usize], width: u16, height: u16) -> Model<RecordingDevice> {
        let blocks = heights
            .iter()
            .map(|&lines| vec!["x"; lines].join("\n"))
            .collect();
        let mut model = Model::new(RecordingDevice::default(), test_options());
        model.viewport.width = width;
        model.viewport.height = height;
        model.session.push(Page::fixture(blocks));
        model
    }

    fn selected(model: &Model<RecordingDevice>) -> usize {
        model.session.current().unwrap().selected()
    }

    #[test]
    fn next_item_advances_and_snaps_the_window() {
        // Two-line items, five content rows: items start at 0,2,4,6,8.
        let mut model = fixture_model(&[2, 2, 2, 2, 2], 20, 6);
        for _ in 0..3 {
            model.select_next_item().unwrap();
        }
        assert_eq!(selected(&model), 3);
        // First line 6 fell off the five-row window, so it advanced by a
        // whole screen, not a line.
        assert_eq!(model.viewport.render_offset, 5);
    }

    #[test]
    fn next_item_scrolls_inside_a_tall_item_first() {
        let mut model = fixture_model(&[30, 5], 20, 11);
        model.select_next_item().unwrap();
        assert_eq!(selected(&model), 0);
        assert_eq!(model.viewport.render_offset_item, 10);
        model.select_next_item().unwrap();
        assert_eq!(model.viewport.render_offset_item, 20);
        model.select_next_item().unwrap();
        assert_eq!(model.viewport.render_offset_item, 30);
        model.select_next_item().unwrap();
        assert_eq!(selected(&model), 1);
        assert_eq!(model.viewport.render_offset_item, 0);
        // The second item's first line (30) is three screens down.
        assert_eq!(model.viewport.render_offset, 30);
    }

    #[test]
    fn prev_item_scrolls_back_up_through_a_tall_item() {
        let mut model = fixture_model(&[30, 5], 20, 11);
        for _ in 0..4 {
            model.select_next_item().unwrap();
        }
        assert_eq!(selected(&model), 1);

        model.select_prev_item().unwrap();
        assert_eq!(selected(&model), 1);
        assert_eq!(model.viewport.render_offset_item, -10);
        assert_eq!(model.viewport.first_visible_line(), 20);

        model.select_prev_item().unwrap();
        assert_eq!(model.viewport.render_offset_item, -20);

        model.select_prev_item().unwrap();
        assert_eq!(model.viewport.render_offset_item, -30);

        model.select_prev_item().unwrap();
        assert_eq!(selected(&model), 0);
        assert_eq!(model.viewport.render_offset_item, 0);
        assert_eq!(model.viewport.render_offset, 0);
    }

    #[test]
    fn ends_of_the_page_are_inert() {
        let mut model = fixture_model(&[2, 2], 20, 6);
        model.select_prev_item().unwrap();
        assert_eq!(selected(&model), 0);
        model.select_next_item().unwrap();
        model.select_next_item().unwrap();
        model.select_next_item().unwrap();
        assert_eq!(selected(&model), 1);
    }

    #[test]
    fn screen_jump_lands_on_the_closest_item() {
        // Items start at lines 0, 5, 12, 30; a ten-row window jumping
        // from 0 targets line 10, and 12 is nearer than 5 or 30.
        let mut model = fixture_model(&[5, 7, 18, 3], 20, 11);
        model.select_next_screen().unwrap();
        assert_eq!(selected(&model), 2);
    }

    #[test]
    fn screen_jump_ties_break_toward_the_earlier_item() {
        // Starts at 0, 8, 12; target 10 is two lines from both.
        let mut model = fixture_model(&[8, 4, 4], 20, 11);
        model.select_next_screen().unwrap();
        assert_eq!(selected(&model), 1);
    }

    #[test]
    fn screen_jump_back_returns_home() {
        let mut model = fixture_model(&[5, 7, 18, 3], 20, 11);
        model.select_next_screen().unwrap();
        model.select_prev_screen().unwrap();
        assert_eq!(selected(&model), 0);
        assert_eq!(model.viewport.render_offset, 0);
    }

    #[test]
    fn resize_reanchors_to_the_selected_item() {
        let mut model = fixture_model(&[5, 7, 18, 3], 20, 11);
        model.select_next_screen().unwrap();
        assert_eq!(selected(&model), 2);

        model.resize(40, 8).unwrap();
        let display = model.display.as_ref().unwrap();
        assert_eq!(model.viewport.render_offset, display.first_line(2));
        assert_eq!(model.viewport.render_offset_item, 0);
        assert_eq!(selected(&model), 2);
    }

    #[test]
    fn resize_storm_never_loses_the_selection() {
        let mut model = fixture_model(&[5, 7, 18, 3], 20, 11);
        model.select_next_screen().unwrap();
        for (width, height) in [(10, 4), (120, 50), (3, 2), (80, 24), (20, 11)] {
            model.resize(width, height).unwrap();
            let page = model.session.current().unwrap();
            assert!(page.selected() < page.len());
            let display = model.display.as_ref().unwrap();
            assert!(display.first_line(page.selected()) >= model.viewport.render_offset);
        }
    }

    #[test]
    fn paint_fills_every_row_and_draws_the_cursor() {
        let mut model = fixture_model(&[2, 2, 2], 20, 6);
        model.select_next_item().unwrap();
        model.device.writes.clear();
        model.paint().unwrap();

        // Header plus five content rows, then the cursor marker.
        let rows: Vec<u16> = model.device.writes.iter().map(|w| w.0).collect();
        assert_eq!(&rows[..6], &[0, 1, 2, 3, 4, 5]);
        for (_, _, line) in &model.device.writes[..6] {
            assert_eq!(display_width(line), 20);
        }
        let (cursor_row, cursor_col, marker) = model.device.writes.last().unwrap();
        assert_eq!((*cursor_row, *cursor_col), (3, 0));
        assert_eq!(marker, ">");
        assert_eq!(model.device.titles.last().unwrap(), "fixture");
    }

    #[test]
    fn paint_skips_cursor_while_inside_a_tall_item() {
        let mut model = fixture_model(&[30, 5], 20, 11);
        model.select_next_item().unwrap();
        model.device.writes.clear();
        model.paint().unwrap();
        assert!(model
            .device
            .writes
            .iter()
            .all(|(_, _, text)| !text.starts_with('>')));
    }

    #[test]
    fn empty_page_paints_only_the_status_bar_area() {
        let mut model = Model::new(RecordingDevice::default(), test_options());
        model.viewport.width = 60;
        model.viewport.height = 6;
        model.status = Some("content source unavailable".to_string());
        model.session.push(Page::fixture(Vec::new()));
        model.paint().unwrap();

        assert!(model.device.writes[0].2.contains("unavailable"));
        for (_, _, line) in &model.device.writes[1..] {
            assert!(line.trim().is_empty());
        }
        // Navigation on the empty page is a no-op, not a crash.
        model.select_next_item().unwrap();
        model.select_next_screen().unwrap();
    }

    #[test]
    fn quit_keys_end_the_loop() {
        let mut model = fixture_model(&[2], 20, 6);
        assert!(model.handle_key(Key::Escape).unwrap());
        assert!(model.handle_key(Key::Char('q')).unwrap());
        assert!(!model.handle_key(Key::Char('z')).unwrap());
    }

    #[test]
    fn enter_pushes_a_thread_and_backspace_returns() {
        let mut model = Model::new(RecordingDevice::default(), test_options());
        model.viewport.width = 40;
        model.viewport.height = 12;
        model.load_initial().unwrap();
        assert_eq!(model.session.depth(), 1);

        model.handle_key(Key::Enter).unwrap();
        assert_eq!(model.session.depth(), 2);
        assert!(matches!(
            model.session.current().unwrap().kind(),
            PageKind::Thread
        ));
        assert_eq!(model.viewport.render_offset, 0);

        assert!(!model.handle_key(Key::Backspace).unwrap());
        assert_eq!(model.session.depth(), 1);
        // keep_root holds the listing in place.
        assert!(!model.handle_key(Key::Backspace).unwrap());
        assert_eq!(model.session.depth(), 1);
    }

    #[test]
    fn backspace_on_root_quits_without_keep_root() {
        let mut opts = test_options();
        opts.keep_root = false;
        let mut model = Model::new(RecordingDevice::default(), opts);
        model.viewport.width = 40;
        model.viewport.height = 12;
        model.load_initial().unwrap();
        assert!(model.handle_key(Key::Backspace).unwrap());
    }

    #[test]
    fn failed_fetch_leaves_the_page_and_reports() {
        let mut opts = test_options();
        opts.comments = Arc::new(FailingComments);
        let mut model = Model::new(RecordingDevice::default(), opts);
        model.viewport.width = 40;
        model.viewport.height = 12;
        model.load_initial().unwrap();

        model.handle_key(Key::Enter).unwrap();
        assert_eq!(model.session.depth(), 1);
        assert!(model
            .status
            .as_deref()
            .unwrap()
            .contains("content source unavailable"));
    }

    #[test]
    fn failed_initial_fetch_yields_an_empty_page() {
        let mut opts = test_options();
        opts.feed = Arc::new(FailingFeed);
        let mut model = Model::new(RecordingDevice::default(), opts);
        model.viewport.width = 40;
        model.viewport.height = 12;
        model.load_initial().unwrap();
        assert!(model.session.current().unwrap().is_empty());
        assert!(model.status.is_some());
        model.paint().unwrap();
    }

    #[test]
    fn closest_item_scans_ascending() {
        assert_eq!(closest_item(&[0, 5, 12, 30], 10), 2);
        assert_eq!(closest_item(&[0, 5, 12, 30], 0), 0);
        assert_eq!(closest_item(&[0, 5, 12, 30], 100), 3);
    }

    #[test]
    fn header_clips_wide_content_to_width() {
        let header = header_line("山本太郎のスレッド", Some("status"), 10);
        assert_eq!(display_width(&header), 10);
    }
}
