//! # Log Viewer Runtime
//!
//! File: cli/src/tui/runtime.rs
//!
//! Drives a [`LogViewer`] on a real terminal. Each loop iteration:
//!
//! 1. runs the commands the model returned (engine fetches, export, timers),
//! 2. redraws,
//! 3. checks the initial log fetch without waiting on it,
//! 4. hands queued stream entries to the model, a bounded batch per frame,
//! 5. fires expired status timers,
//! 6. waits up to 50ms for a key or resize event.
//!
//! The initial fetch stays pending across iterations, so keys keep flowing
//! while it runs and quitting drops it.
//!
//! The terminal is put into raw mode on the alternate screen for the lifetime
//! of a [`TerminalGuard`] and restored when it drops, including on errors.
//!
use super::render;
use super::viewer::{Command, LogViewer, Message, STATUS_TTL};
use crate::common::docker::service::LogStreamHandle;
use crate::common::docker::types::LogEntry;
use crate::common::docker::EngineService;
use crate::common::fs::io::{ensure_dir_exists, write_lines};
use crate::core::error::Result;
use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::future::{FutureExt, LocalBoxFuture};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

/// Input poll interval; also the redraw cadence while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Stream entries handed to the model per frame.
const MAX_ENTRIES_PER_FRAME: usize = 500;

/// Raw mode plus alternate screen, undone on drop.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw terminal mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// What the runtime holds on the model's behalf.
struct Effects<'a> {
    service: &'a EngineService,
    container_id: String,
    tail: u32,
    initial: Option<LocalBoxFuture<'a, Result<Vec<LogEntry>>>>,
    stream: Option<LogStreamHandle>,
    want_next: bool,
    timers: Vec<(Instant, u64)>,
}

impl<'a> Effects<'a> {
    fn new(service: &'a EngineService, container_id: &str, tail: u32) -> Self {
        Self {
            service,
            container_id: container_id.to_string(),
            tail,
            initial: None,
            stream: None,
            want_next: false,
            timers: Vec::new(),
        }
    }

    /// Runs one command. Returns the message it produced, if any.
    fn run(&mut self, cmd: Command) -> Option<Message> {
        match cmd {
            Command::None | Command::Quit => None,
            Command::FetchInitial => {
                let service = self.service;
                let id = self.container_id.clone();
                let tail = self.tail;
                self.initial =
                    Some(async move { service.get_container_logs(&id, tail).await }.boxed_local());
                None
            }
            Command::StartStream => {
                let handle = self.service.stream_container_logs(&self.container_id);
                let cancel = handle.cancel.clone();
                self.stream = Some(handle);
                Some(Message::StreamStarted(cancel))
            }
            Command::NextStreamItem => {
                self.want_next = true;
                None
            }
            Command::ClearStatusAfter(generation) => {
                self.timers.push((Instant::now() + STATUS_TTL, generation));
                None
            }
            Command::Export { path, lines } => Some(Message::ExportDone(export(&path, &lines))),
        }
    }

    /// The initial fetch's result, once it has one.
    fn poll_initial(&mut self) -> Option<Message> {
        let result = self.initial.as_mut()?.now_or_never()?;
        self.initial = None;
        Some(Message::InitialLogs(result))
    }

    /// Takes the next stream message if one is ready.
    async fn poll_stream(&mut self) -> Option<Message> {
        if !self.want_next {
            return None;
        }
        let handle = self.stream.as_mut()?;
        match handle.logs.try_recv() {
            Ok(entry) => {
                self.want_next = false;
                Some(Message::StreamLog(entry))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // The worker closes `errors` right after `logs`.
                let err = handle.errors.recv().await;
                self.stream = None;
                self.want_next = false;
                Some(Message::StreamErr(err))
            }
        }
    }

    fn expired_timers(&mut self) -> Vec<u64> {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(at, _)| *at <= now);
        self.timers = pending;
        due.into_iter().map(|(_, generation)| generation).collect()
    }
}

fn export(path: &Path, lines: &[String]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    let count = write_lines(path, lines)?;
    info!("Exported {} log lines to {}", count, path.display());
    Ok(count)
}

/// Opens the interactive log viewer for one container and blocks until the user quits.
pub async fn run_log_viewer(
    service: &EngineService,
    mut viewer: LogViewer,
    container_id: &str,
    tail: u32,
) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let size = guard.terminal.size()?;
    viewer.update(Message::Resize(size.width, size.height));

    let mut effects = Effects::new(service, container_id, tail);
    let mut commands = VecDeque::from([viewer.init()]);

    loop {
        while let Some(cmd) = commands.pop_front() {
            if cmd == Command::Quit {
                debug!("Log viewer quitting");
                return Ok(());
            }
            if let Some(msg) = effects.run(cmd) {
                commands.push_back(viewer.update(msg));
            }
        }

        guard.terminal.draw(|f| render::draw(f, &viewer))?;

        if let Some(msg) = effects.poll_initial() {
            commands.push_back(viewer.update(msg));
        }

        for _ in 0..MAX_ENTRIES_PER_FRAME {
            match effects.poll_stream().await {
                Some(msg) => commands.push_back(viewer.update(msg)),
                None => break,
            }
            // Only the NextStreamItem request is expected here; run it now
            // so the next entry can be taken in the same frame.
            while let Some(Command::NextStreamItem) = commands.front() {
                commands.pop_front();
                effects.want_next = true;
            }
        }

        for generation in effects.expired_timers() {
            commands.push_back(viewer.update(Message::ClearStatus(generation)));
        }

        if !commands.is_empty() || !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                commands.push_back(viewer.update(Message::Key(key)));
            }
            Event::Resize(width, height) => {
                commands.push_back(viewer.update(Message::Resize(width, height)));
            }
            _ => {}
        }
    }
}
