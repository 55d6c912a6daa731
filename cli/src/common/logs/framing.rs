//! # Log Stream Framing
//!
//! File: cli/src/common/logs/framing.rs
//!
//! ## Overview
//!
//! Non-TTY containers send their logs multiplexed: every frame starts with an
//! 8-byte header `{stream:1, 0, 0, 0, size:u32be}` followed by `size` payload
//! bytes. Stream `1` is stdout, `2` is stderr; `0` (stdin) is shown as stdout.
//! TTY containers send raw bytes with no framing at all.
//!
//! `FrameDecoder` is an incremental parser over arbitrary chunk boundaries.
//! `Demuxer` sits on top of it, decides between framed and raw input, and
//! hands complete lines to the caller tagged with their stream.
//!
use super::lines::LineAssembler;
use crate::common::docker::types::LogStream;
use crate::core::error::{OctoError, Result};
use anyhow::anyhow;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 8;

/// Builds one wire frame for `payload` on stream `stream`.
pub fn encode_frame(stream: u8, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_u8(stream);
    frame.put_slice(&[0, 0, 0]);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame.freeze()
}

fn stream_of(tag: u8) -> Option<LogStream> {
    match tag {
        0 | 1 => Some(LogStream::Stdout),
        2 => Some(LogStream::Stderr),
        _ => None,
    }
}

fn header_is_valid(header: &[u8]) -> bool {
    stream_of(header[0]).is_some() && header[1..4] == [0, 0, 0]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub stream: LogStream,
    pub payload: Bytes,
}

/// Incremental frame parser.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete frame, `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        if !header_is_valid(&self.buf[..HEADER_LEN]) {
            return Err(anyhow!(OctoError::LogFraming(format!(
                "invalid frame header {:02x?}",
                &self.buf[..HEADER_LEN]
            ))));
        }
        let size = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        if self.buf.len() < HEADER_LEN + size {
            return Ok(None);
        }
        let stream = stream_of(self.buf[0]).unwrap_or(LogStream::Stdout);
        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(size).freeze();
        Ok(Some(Frame { stream, payload }))
    }

    /// Bytes received but not yet consumed as frames.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn take_pending(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Undecided: inspect the first header, fall back to raw if it is invalid.
    Auto,
    /// Framing required from the first byte.
    Strict,
    Framed,
    Raw,
}

/// Turns a log body into `(stream, line)` pairs.
#[derive(Debug)]
pub struct Demuxer {
    mode: Mode,
    decoder: FrameDecoder,
    stdout: LineAssembler,
    stderr: LineAssembler,
}

impl Demuxer {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            decoder: FrameDecoder::default(),
            stdout: LineAssembler::default(),
            stderr: LineAssembler::default(),
        }
    }

    /// Detects framing on the first header and falls back to raw stdout.
    pub fn auto() -> Self {
        Self::with_mode(Mode::Auto)
    }

    /// Requires framing; an invalid first header is a `LogFraming` error.
    pub fn framed() -> Self {
        Self::with_mode(Mode::Strict)
    }

    /// Treats the whole body as stdout.
    pub fn raw() -> Self {
        Self::with_mode(Mode::Raw)
    }

    pub fn is_raw(&self) -> bool {
        self.mode == Mode::Raw
    }

    /// Consumes a chunk and returns the lines it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<(LogStream, String)>> {
        let mut out = Vec::new();
        if self.mode == Mode::Raw {
            push_lines(&mut out, LogStream::Stdout, self.stdout.push(chunk));
            return Ok(out);
        }

        self.decoder.push(chunk);
        if matches!(self.mode, Mode::Auto | Mode::Strict) {
            if self.decoder.pending() < HEADER_LEN {
                return Ok(out);
            }
            match self.decoder.next_frame() {
                Ok(first) => {
                    self.mode = Mode::Framed;
                    if let Some(frame) = first {
                        self.route(&mut out, frame);
                    }
                }
                Err(e) if self.mode == Mode::Auto => {
                    tracing::debug!("Log body is not multiplexed ({}), reading raw", e);
                    self.mode = Mode::Raw;
                    let raw = self.decoder.take_pending();
                    push_lines(&mut out, LogStream::Stdout, self.stdout.push(&raw));
                    return Ok(out);
                }
                Err(e) => return Err(e),
            }
        }

        while let Some(frame) = self.decoder.next_frame()? {
            self.route(&mut out, frame);
        }
        Ok(out)
    }

    /// Flushes partial lines at end of body.
    pub fn finish(&mut self) -> Result<Vec<(LogStream, String)>> {
        let mut out = Vec::new();
        if self.decoder.pending() > 0 {
            match self.mode {
                // Too short to ever hold a header: plain text.
                Mode::Auto => {
                    self.mode = Mode::Raw;
                    let raw = self.decoder.take_pending();
                    push_lines(&mut out, LogStream::Stdout, self.stdout.push(&raw));
                }
                _ => {
                    return Err(anyhow!(OctoError::LogFraming(format!(
                        "body ended inside a frame ({} bytes left)",
                        self.decoder.pending()
                    ))))
                }
            }
        }
        if let Some(line) = self.stdout.finish() {
            out.push((LogStream::Stdout, line));
        }
        if let Some(line) = self.stderr.finish() {
            out.push((LogStream::Stderr, line));
        }
        Ok(out)
    }

    fn route(&mut self, out: &mut Vec<(LogStream, String)>, frame: Frame) {
        let assembler = match frame.stream {
            LogStream::Stdout => &mut self.stdout,
            LogStream::Stderr => &mut self.stderr,
        };
        push_lines(out, frame.stream, assembler.push(&frame.payload));
    }
}

fn push_lines(out: &mut Vec<(LogStream, String)>, stream: LogStream, lines: Vec<String>) {
    out.extend(lines.into_iter().map(|line| (stream, line)));
}
