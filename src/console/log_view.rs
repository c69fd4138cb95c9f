// src/console/log_view.rs

//! Render model for one script's output.
//!
//! Scripts either print whole lines or draw progress by starting a chunk with
//! `\r`, meaning "overwrite the line I printed last". The supervisor passes
//! that text through untouched; `LogView` is where the convention is applied:
//!
//! - `\n` commits the current line,
//! - `\r\n` is a plain newline,
//! - any other `\r` clears the current line so the text after it replaces it,
//! - a `\r` ending a chunk is held until the next chunk shows whether a `\n`
//!   follows.

use std::collections::VecDeque;

pub const DEFAULT_MAX_LINES: usize = 1000;

#[derive(Debug, Clone)]
pub struct LogView {
    lines: VecDeque<String>,
    current: String,
    pending_cr: bool,
    max_lines: usize,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new()
    }
}

impl LogView {
    pub fn new() -> Self {
        Self::with_max_lines(DEFAULT_MAX_LINES)
    }

    /// Keep at most `max_lines` committed lines; older ones are dropped.
    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            current: String::new(),
            pending_cr: false,
            max_lines: max_lines.max(1),
        }
    }

    /// Apply one chunk of output. Returns the lines it committed, in order.
    pub fn apply(&mut self, text: &str) -> Vec<String> {
        let mut committed = Vec::new();
        if text.is_empty() {
            return committed;
        }

        if self.pending_cr {
            self.pending_cr = false;
            if !text.starts_with('\n') {
                self.current.clear();
            }
        }

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\n' => committed.push(self.commit()),
                '\r' => match chars.peek() {
                    Some('\n') => {}
                    Some(_) => self.current.clear(),
                    None => self.pending_cr = true,
                },
                other => self.current.push(other),
            }
        }

        committed
    }

    /// Commit the unterminated line, if any (used when the stream ends).
    pub fn take_partial(&mut self) -> Option<String> {
        self.pending_cr = false;
        if self.current.is_empty() {
            None
        } else {
            Some(self.commit())
        }
    }

    /// The line still being written.
    pub fn current_line(&self) -> &str {
        &self.current
    }

    /// Committed lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// What a viewer sees: committed lines plus the current line if it has
    /// any content.
    pub fn visible_lines(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.lines().collect();
        if !self.current.is_empty() {
            out.push(&self.current);
        }
        out
    }

    pub fn render(&self) -> String {
        self.visible_lines().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.pending_cr = false;
    }

    fn commit(&mut self) -> String {
        let line = std::mem::take(&mut self.current);
        self.lines.push_back(line.clone());
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
        line
    }
}
