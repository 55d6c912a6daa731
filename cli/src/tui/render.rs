//! Draws a [`LogViewer`] into a ratatui frame.
//!
//! Layout, top to bottom: header, truncation banner, bordered log window,
//! filter bar, status line, key hints. The log window's inner height equals
//! the model's viewport height for the same terminal size.

use super::viewer::{InputMode, LogViewer};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEY_HINTS: &str =
    "q quit  j/k scroll  g/G top/bottom  f follow  / filter  ctrl+r regex  e export";

pub fn draw(f: &mut Frame, viewer: &LogViewer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(Paragraph::new(header(viewer)), chunks[0]);

    if let Some(warning) = viewer.truncation_warning() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                warning.to_string(),
                Style::default().fg(Color::Yellow),
            ))),
            chunks[1],
        );
    }

    let body: Vec<Line> = match viewer.error() {
        Some(err) => vec![Line::from(Span::styled(
            format!("Error: {}", err),
            Style::default().fg(Color::Red),
        ))],
        None => viewer
            .visible_lines()
            .iter()
            .map(|line| styled_line(line))
            .collect(),
    };
    let title = format!(
        " {}/{} lines{} ",
        viewer.view_len(),
        viewer.buffered(),
        if viewer.using_regex() { " (regex)" } else { "" }
    );
    f.render_widget(
        Paragraph::new(body).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[2],
    );

    f.render_widget(Paragraph::new(filter_bar(viewer)), chunks[3]);

    if let Some(status) = viewer.status_message() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Cyan),
            ))),
            chunks[4],
        );
    }

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            KEY_HINTS,
            Style::default().fg(Color::DarkGray),
        ))),
        chunks[5],
    );
}

fn header(viewer: &LogViewer) -> Line<'static> {
    let (state, color) = if viewer.is_following() {
        ("FOLLOWING", Color::Green)
    } else {
        ("PAUSED", Color::Yellow)
    };
    let mut spans = vec![
        Span::styled(
            format!("Logs: {} ", viewer.title()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("[{}]", state), Style::default().fg(color)),
    ];
    if !viewer.is_streaming() {
        spans.push(Span::styled(
            " (stream closed)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn filter_bar(viewer: &LogViewer) -> Line<'static> {
    match viewer.mode() {
        InputMode::Plain => Line::from(format!("/{}_", viewer.filter_text())),
        InputMode::Regex => Line::from(format!("regex: {}_", viewer.filter_text())),
        InputMode::Normal if viewer.using_regex() => Line::from(Span::styled(
            format!("regex filter: {}  (Esc clears)", viewer.filter_text()),
            Style::default().fg(Color::Magenta),
        )),
        InputMode::Normal if !viewer.filter_text().is_empty() => Line::from(Span::styled(
            format!("filter: {}  (Esc clears)", viewer.filter_text()),
            Style::default().fg(Color::Magenta),
        )),
        InputMode::Normal => Line::default(),
    }
}

/// Dims the timestamp and colors stderr lines red.
fn styled_line(line: &str) -> Line<'static> {
    let stderr = line.contains("  stderr  ");
    let content_style = if stderr {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    match line.split_once("  ") {
        Some((ts, rest)) => Line::from(vec![
            Span::styled(ts.to_string(), Style::default().fg(Color::DarkGray)),
            Span::raw("  "),
            Span::styled(rest.to_string(), content_style),
        ]),
        None => Line::from(Span::styled(line.to_string(), content_style)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::types::{LogEntry, LogStream};
    use crate::tui::viewer::Message;
    use chrono::Utc;
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    fn screen_text(viewer: &LogViewer, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, viewer)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_draw_shows_header_lines_and_banner() {
        let mut viewer = LogViewer::new("abc123def4567890", "web", 2, PathBuf::from("/tmp"));
        viewer.update(Message::Resize(100, 20));
        let entries = ["one", "two", "three"]
            .iter()
            .map(|c| LogEntry {
                timestamp: Utc::now(),
                stream: LogStream::Stderr,
                content: c.to_string(),
            })
            .collect();
        viewer.update(Message::InitialLogs(Ok(entries)));

        let text = screen_text(&viewer, 100, 20);
        assert!(text.contains("Logs: web (abc123def456)"));
        assert!(text.contains("[FOLLOWING]"));
        assert!(text.contains("Logs truncated: oldest 1 lines dropped"));
        assert!(text.contains("three"));
        assert!(!text.contains("one"));
    }

    #[test]
    fn test_window_height_matches_viewport() {
        let mut viewer = LogViewer::new("abc", "web", 100, PathBuf::from("/tmp"));
        viewer.update(Message::Resize(60, 15));
        let entries = (0..40)
            .map(|i| LogEntry {
                timestamp: Utc::now(),
                stream: LogStream::Stdout,
                content: format!("row{:02}", i),
            })
            .collect();
        viewer.update(Message::InitialLogs(Ok(entries)));
        let text = screen_text(&viewer, 60, 15);
        let rows = (0..40).filter(|i| text.contains(&format!("row{:02}", i))).count();
        assert_eq!(rows, viewer.viewport_height());
        assert!(text.contains("row39"));
    }
}
