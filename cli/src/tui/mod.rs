//! # Octo Log Viewer (`tui`)
//!
//! File: cli/src/tui/mod.rs
//!
//! The interactive viewer behind `octo logs`:
//!
//! - **`ring`**: the bounded, thread-safe line buffer.
//! - **`viewer`**: the message-driven model (follow mode, filters, export).
//! - **`render`**: ratatui drawing of the model.
//! - **`runtime`**: the crossterm event loop that connects the model to the
//!   engine service and the terminal.
//!

pub mod render;
pub mod ring;
pub mod runtime;
pub mod viewer;

pub use runtime::run_log_viewer;
pub use viewer::LogViewer;
