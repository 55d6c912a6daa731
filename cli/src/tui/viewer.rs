//! # Log Viewer Model
//!
//! File: cli/src/tui/viewer.rs
//!
//! ## Overview
//!
//! The state machine behind `octo logs`. It owns the ring buffer, the
//! filtered view over it, the scroll position and the cancel handle of the
//! live stream. All state changes happen in [`LogViewer::update`], which
//! takes one [`Message`] and returns the [`Command`] the runtime should run
//! next. Nothing here touches the terminal or the engine directly, so the
//! whole model is testable with plain messages.
//!
//! ## Keys
//!
//! | Key                 | Effect                                        |
//! |---------------------|-----------------------------------------------|
//! | `k`/`Up`, `j`/`Down`| scroll one line                               |
//! | `PageUp`/`PageDown` | scroll one viewport                           |
//! | `g` / `G`           | top (stop following) / bottom (follow)        |
//! | `f`                 | toggle follow mode                            |
//! | `/`                 | plain filter, applied as you type             |
//! | `ctrl+r`            | regex filter, compiled on `Enter`             |
//! | `e`                 | export the buffer to `{export_dir}/{id}.log`  |
//! | `Esc`               | clear the active filter, or quit if none      |
//! | `q`, `ctrl+c`       | quit                                          |
//!
use super::ring::RingBuffer;
use crate::common::docker::service::CancelHandle;
use crate::common::docker::types::{truncate_id, LogEntry, SHORT_ID_LEN};
use crate::core::error::{OctoError, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a status message stays on screen.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

/// Rows reserved around the log window.
const CHROME_ROWS: u16 = 7;
const MIN_VIEWPORT: usize = 5;
/// Terminal height assumed until the first resize.
const DEFAULT_TERMINAL_HEIGHT: u16 = 24;

/// Computes the number of log rows visible for a terminal of `height` rows.
pub fn viewport_for(height: u16) -> usize {
    (height.saturating_sub(CHROME_ROWS) as usize).max(MIN_VIEWPORT)
}

/// Which filter, if any, is being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Plain,
    Regex,
}

/// Inputs to the model.
#[derive(Debug)]
pub enum Message {
    /// Result of the initial tail fetch.
    InitialLogs(Result<Vec<LogEntry>>),
    /// The live stream has started.
    StreamStarted(CancelHandle),
    StreamLog(LogEntry),
    /// The stream ended, with the error if it failed.
    StreamErr(Option<anyhow::Error>),
    Key(KeyEvent),
    Resize(u16, u16),
    /// Clears the status if it is still the one with this generation.
    ClearStatus(u64),
    ExportDone(Result<usize>),
}

/// Work the runtime performs on behalf of the model.
#[derive(Debug, PartialEq)]
pub enum Command {
    None,
    FetchInitial,
    StartStream,
    NextStreamItem,
    /// Send `ClearStatus(generation)` after [`STATUS_TTL`].
    ClearStatusAfter(u64),
    Export { path: PathBuf, lines: Vec<String> },
    Quit,
}

pub struct LogViewer {
    container_id: String,
    container_name: String,
    export_dir: PathBuf,
    buffer: RingBuffer,
    view_lines: Vec<String>,
    offset: usize,
    following: bool,
    mode: InputMode,
    filter_text: String,
    /// Plain filter in effect before regex input started.
    saved_plain_filter: String,
    using_regex: bool,
    compiled_regex: Option<Regex>,
    status_message: Option<String>,
    status_generation: u64,
    truncation_warning: Option<String>,
    viewport_height: usize,
    err: Option<String>,
    cancel: Option<CancelHandle>,
    streaming: bool,
    quitting: bool,
}

impl LogViewer {
    pub fn new(
        container_id: impl Into<String>,
        container_name: impl Into<String>,
        capacity: usize,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            container_name: container_name.into(),
            export_dir,
            buffer: RingBuffer::new(capacity),
            view_lines: Vec::new(),
            offset: 0,
            following: true,
            mode: InputMode::Normal,
            filter_text: String::new(),
            saved_plain_filter: String::new(),
            using_regex: false,
            compiled_regex: None,
            status_message: None,
            status_generation: 0,
            truncation_warning: None,
            viewport_height: viewport_for(DEFAULT_TERMINAL_HEIGHT),
            err: None,
            cancel: None,
            streaming: false,
            quitting: false,
        }
    }

    /// The first command to run: fetch the initial tail.
    pub fn init(&self) -> Command {
        Command::FetchInitial
    }

    pub fn update(&mut self, msg: Message) -> Command {
        match msg {
            Message::InitialLogs(Ok(entries)) => {
                info!("Loaded {} initial log lines", entries.len());
                self.buffer
                    .append_batch(entries.iter().map(LogEntry::formatted));
                self.refresh();
                Command::StartStream
            }
            Message::InitialLogs(Err(e)) => {
                warn!("Initial log fetch failed: {:#}", e);
                self.err = Some(format!("{:#}", e));
                Command::None
            }
            Message::StreamStarted(cancel) => {
                self.cancel = Some(cancel);
                self.streaming = true;
                if self.quitting {
                    self.cancel_stream();
                    return Command::None;
                }
                Command::NextStreamItem
            }
            Message::StreamLog(entry) => {
                self.buffer.append(entry.formatted());
                self.refresh();
                Command::NextStreamItem
            }
            Message::StreamErr(Some(e)) => {
                self.streaming = false;
                self.set_status(format!("Log stream error: {:#}", e))
            }
            Message::StreamErr(None) => {
                debug!("Log stream closed");
                self.streaming = false;
                Command::None
            }
            Message::Key(key) => self.handle_key(key),
            Message::Resize(_, height) => {
                self.viewport_height = viewport_for(height);
                self.clamp_offset();
                if self.following {
                    self.scroll_to_bottom();
                }
                Command::None
            }
            Message::ClearStatus(generation) => {
                if generation == self.status_generation {
                    self.status_message = None;
                }
                Command::None
            }
            Message::ExportDone(Ok(count)) => {
                let path = self.export_path();
                self.set_status(format!("Exported {} lines to {}", count, path.display()))
            }
            Message::ExportDone(Err(e)) => self.set_status(format!("{:#}", e)),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Command {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.quit();
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Plain | InputMode::Regex => self.handle_filter_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Command {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('r') {
                self.begin_regex_input();
            }
            return Command::None;
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(self.viewport_height),
            KeyCode::PageDown => self.scroll_down(self.viewport_height),
            KeyCode::Char('g') | KeyCode::Home => {
                self.offset = 0;
                self.following = false;
            }
            KeyCode::Char('G') | KeyCode::End => self.scroll_to_bottom(),
            KeyCode::Char('f') => {
                self.following = !self.following;
                if self.following {
                    self.scroll_to_bottom();
                }
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Plain;
                self.using_regex = false;
                self.compiled_regex = None;
                self.filter_text.clear();
                self.refresh();
            }
            KeyCode::Char('e') => {
                return Command::Export {
                    path: self.export_path(),
                    lines: self.buffer.lines(),
                }
            }
            KeyCode::Esc if self.has_filter() => self.clear_filter(),
            KeyCode::Esc | KeyCode::Char('q') => return self.quit(),
            _ => {}
        }
        Command::None
    }

    /// Switches to regex input, keeping any plain filter to fall back on.
    fn begin_regex_input(&mut self) {
        self.saved_plain_filter = if self.using_regex {
            String::new()
        } else {
            self.filter_text.clone()
        };
        self.mode = InputMode::Regex;
        self.filter_text.clear();
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Command {
        // Control chords are never filter text.
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('r') && self.mode == InputMode::Plain {
                self.begin_regex_input();
            }
            return Command::None;
        }
        match key.code {
            KeyCode::Enter => {
                let mode = self.mode;
                self.mode = InputMode::Normal;
                if mode == InputMode::Regex {
                    return self.apply_regex();
                }
            }
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                self.clear_filter();
            }
            KeyCode::Backspace => {
                self.filter_text.pop();
                if self.mode == InputMode::Plain {
                    self.refresh();
                }
            }
            KeyCode::Char(c) => {
                self.filter_text.push(c);
                if self.mode == InputMode::Plain {
                    self.refresh();
                }
            }
            _ => {}
        }
        Command::None
    }

    fn apply_regex(&mut self) -> Command {
        match Regex::new(&self.filter_text) {
            Ok(re) => {
                debug!("Applying regex filter {:?}", self.filter_text);
                self.compiled_regex = Some(re);
                self.using_regex = !self.filter_text.is_empty();
                self.refresh();
                Command::None
            }
            Err(e) => {
                let err = OctoError::FilterCompile(e.to_string());
                self.compiled_regex = None;
                self.using_regex = false;
                self.filter_text = std::mem::take(&mut self.saved_plain_filter);
                self.refresh();
                self.set_status(err.to_string())
            }
        }
    }

    fn has_filter(&self) -> bool {
        !self.filter_text.is_empty() || self.using_regex
    }

    fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.saved_plain_filter.clear();
        self.using_regex = false;
        self.compiled_regex = None;
        self.refresh();
    }

    fn quit(&mut self) -> Command {
        self.quitting = true;
        self.cancel_stream();
        Command::Quit
    }

    fn cancel_stream(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    fn set_status(&mut self, text: String) -> Command {
        self.status_generation += 1;
        self.status_message = Some(text);
        Command::ClearStatusAfter(self.status_generation)
    }

    /// Rebuilds the filtered view and truncation banner, then re-clamps.
    fn refresh(&mut self) {
        let lines = self.buffer.lines();
        self.view_lines = if self.using_regex {
            match &self.compiled_regex {
                Some(re) => lines.into_iter().filter(|l| re.is_match(l)).collect(),
                None => lines,
            }
        } else if self.filter_text.is_empty() || self.mode == InputMode::Regex {
            lines
        } else {
            let needle = self.filter_text.to_lowercase();
            lines
                .into_iter()
                .filter(|l| l.to_lowercase().contains(&needle))
                .collect()
        };

        let dropped = self.buffer.dropped();
        self.truncation_warning = (dropped > 0)
            .then(|| format!("Logs truncated: oldest {} lines dropped", dropped));

        if self.following {
            self.scroll_to_bottom();
        } else {
            self.clamp_offset();
        }
    }

    fn max_offset(&self) -> usize {
        self.view_lines.len().saturating_sub(self.viewport_height)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
        self.following = false;
    }

    fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
        if self.offset == self.max_offset() {
            self.following = true;
        }
    }

    fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.following = true;
    }

    fn export_path(&self) -> PathBuf {
        self.export_dir.join(format!("{}.log", self.container_id))
    }

    // --- Read access for the renderer ---

    pub fn title(&self) -> String {
        format!(
            "{} ({})",
            self.container_name,
            truncate_id(&self.container_id, SHORT_ID_LEN)
        )
    }

    /// The slice of `view_lines` that fits the viewport.
    pub fn visible_lines(&self) -> &[String] {
        let end = (self.offset + self.viewport_height).min(self.view_lines.len());
        &self.view_lines[self.offset.min(end)..end]
    }

    pub fn view_len(&self) -> usize {
        self.view_lines.len()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn using_regex(&self) -> bool {
        self.using_regex
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn truncation_warning(&self) -> Option<&str> {
        self.truncation_warning.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.err.as_deref()
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }
}

impl Drop for LogViewer {
    fn drop(&mut self) {
        self.cancel_stream();
    }
}
