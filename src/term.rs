use std::io::{self, Stdout, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen, SetTitle,
};
use crossterm::{ExecutableCommand, QueueableCommand};

/// Keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    PageUp,
    PageDown,
    Enter,
    Backspace,
    Escape,
    Char(char),
}

/// One event from the input device. Terminal resize arrives on the same
/// queue as key presses, so the control loop sees a single ordered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    Resize(u16, u16),
}

/// Wait up to `timeout` for the next event. `None` means the poll timed
/// out, which keeps the loop responsive without burning a core.
pub fn poll_event(timeout: Duration) -> Result<Option<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            Ok(map_key(key.code).map(InputEvent::Key))
        }
        Event::Resize(width, height) => Ok(Some(InputEvent::Resize(width, height))),
        _ => Ok(None),
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::PageUp => Some(Key::PageUp),
        KeyCode::PageDown => Some(Key::PageDown),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char(ch) => Some(Key::Char(ch)),
        _ => None,
    }
}

/// A character grid addressable by (row, column). The viewport paints
/// through this handle; tests substitute a recording implementation.
pub trait OutputDevice {
    fn size(&self) -> Result<(u16, u16)>;
    fn write_at(&mut self, row: u16, col: u16, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// The real terminal, drawn via crossterm's queued commands.
pub struct Terminal {
    out: Stdout,
}

impl Terminal {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDevice for Terminal {
    fn size(&self) -> Result<(u16, u16)> {
        Ok(terminal::size()?)
    }

    fn write_at(&mut self, row: u16, col: u16, text: &str) -> Result<()> {
        self.out.queue(MoveTo(col, row))?.queue(Print(text))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.out.queue(Clear(ClearType::All))?;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.out.queue(SetTitle(title))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Scoped raw-mode + alternate-screen + hidden-cursor acquisition. The
/// terminal is restored when the guard drops, whichever way the scope
/// exits.
pub struct ScreenGuard(());

impl ScreenGuard {
    pub fn enter() -> Result<Self> {
        // Raw mode first: if it fails nothing has touched the screen yet
        // and there is nothing to restore.
        enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(err) = out
            .execute(EnterAlternateScreen)
            .and_then(|out| out.execute(Hide))
        {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        Ok(Self(()))
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = out.execute(Show);
        let _ = out.execute(LeaveAlternateScreen);
        if let Err(err) = disable_raw_mode() {
            tracing::warn!("failed to leave raw mode: {err}");
        }
    }
}
