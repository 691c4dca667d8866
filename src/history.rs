//! Command history for tinyterm
//!
//! Provides the in-session history with its navigation cursor, plus
//! optional persistence to `~/.tinyterm/history`.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::config::config_dir;

/// Default number of entries kept on disk
pub const HISTORY_LIMIT: usize = 1000;

/// Outcome of a history navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recall {
    /// Load this entry into the input
    Entry(String),
    /// Back past the newest entry: empty input
    Fresh,
    /// Already at the boundary
    Unchanged,
}

/// Command history with a navigation cursor.
///
/// The cursor ranges over `0..=len()`; `len()` means fresh input.
pub struct CommandHistory {
    /// All entries (newest last)
    entries: Vec<String>,
    cursor: usize,
    /// File path for persistence
    file_path: Option<PathBuf>,
    /// Maximum entries written to disk
    max_entries: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// In-memory history for this session only
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            file_path: None,
            max_entries: HISTORY_LIMIT,
        }
    }

    /// History that loads from and saves to `~/.tinyterm/history`
    pub fn persistent(max_entries: usize) -> Self {
        let mut history = Self::new();
        history.file_path = config_dir().map(|dir| dir.join("history"));
        history.max_entries = max_entries;
        history.load();
        history
    }

    #[cfg(test)]
    fn with_file(path: PathBuf, max_entries: usize) -> Self {
        let mut history = Self::new();
        history.file_path = Some(path);
        history.max_entries = max_entries;
        history.load();
        history
    }

    /// Load history from file
    fn load(&mut self) {
        let Some(path) = &self.file_path else {
            return;
        };
        if !path.exists() {
            return;
        }
        match fs::read_to_string(path) {
            Ok(content) => {
                self.entries = content
                    .lines()
                    .map(unescape)
                    .filter(|cmd| !cmd.trim().is_empty())
                    .collect();
                self.cursor = self.entries.len();
            }
            Err(e) => warn!("Failed to read history {}: {}", path.display(), e),
        }
    }

    /// Save the newest entries to file
    fn save(&self) {
        let Some(path) = &self.file_path else {
            return;
        };
        let skip = self.entries.len().saturating_sub(self.max_entries);
        let content: String = self.entries[skip..]
            .iter()
            .map(|cmd| escape(cmd))
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = fs::write(path, content) {
            warn!("Failed to write history {}: {}", path.display(), e);
        }
    }

    /// Append a command and reset the cursor to fresh input.
    ///
    /// Returns false (and records nothing) for blank commands.
    pub fn push(&mut self, command: &str) -> bool {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.entries.push(trimmed.to_string());
        self.cursor = self.entries.len();
        self.save();
        true
    }

    /// Step towards older entries
    pub fn previous(&mut self) -> Recall {
        if self.cursor == 0 {
            return Recall::Unchanged;
        }
        self.cursor -= 1;
        Recall::Entry(self.entries[self.cursor].clone())
    }

    /// Step towards newer entries, ending at fresh input
    pub fn next(&mut self) -> Recall {
        let len = self.entries.len();
        if self.cursor + 1 < len {
            self.cursor += 1;
            Recall::Entry(self.entries[self.cursor].clone())
        } else if self.cursor + 1 == len {
            self.cursor = len;
            Recall::Fresh
        } else {
            Recall::Unchanged
        }
    }

    #[allow(dead_code)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(dead_code)]
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// One entry per line: escape backslashes and line breaks
fn escape(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    for ch in command.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
