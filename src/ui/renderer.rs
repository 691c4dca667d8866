//! Terminal renderer using crossterm
//!
//! Draws the output log above a multi-line input area and keeps a
//! scrollback offset for paging through older output.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        DisableBracketedPaste, EnableBracketedPaste, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::{Color, ColorScheme};
use crate::core::input::InputBuffer;
use crate::core::output::{expand_tabs, LineKind, OutputLog, RenderedLine};
use crate::core::session::Session;

/// Role of a screen row, used to pick its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Banner,
    Command,
    Result,
}

/// One physical screen row of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub kind: RowKind,
}

/// Display text for a rendered line: prompt on commands, tabs expanded
pub fn format_line(line: &RenderedLine, prompt: &str, tab_width: usize) -> String {
    match line.kind() {
        LineKind::Command => format!("{}{}", prompt, line.display_text(tab_width)),
        LineKind::Result => line.display_text(tab_width),
    }
}

/// Characters safe to hand to the terminal as-is.
///
/// `\r` is dropped; other control characters would move the cursor or
/// start an escape sequence, so they show as U+FFFD.
fn printable(ch: char) -> Option<char> {
    match ch {
        '\r' => None,
        '\n' | '\t' => Some(ch),
        c if c.is_control() => Some('\u{FFFD}'),
        c => Some(c),
    }
}

/// Break text into rows no wider than `width` columns
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for segment in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;
        for ch in segment.chars().filter_map(printable) {
            let w = ch.width().unwrap_or(0);
            if row_width + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(ch);
            row_width += w;
        }
        rows.push(row);
    }
    rows
}

/// Lay the whole output log out as screen rows
pub fn layout_output(log: &OutputLog, prompt: &str, tab_width: usize, width: usize) -> Vec<Row> {
    let mut rows: Vec<Row> = wrap(&expand_tabs(log.banner(), tab_width), width)
        .into_iter()
        .map(|text| Row {
            text,
            kind: RowKind::Banner,
        })
        .collect();

    for line in log.lines() {
        let kind = match line.kind() {
            LineKind::Command => RowKind::Command,
            LineKind::Result => RowKind::Result,
        };
        rows.extend(
            wrap(&format_line(line, prompt, tab_width), width)
                .into_iter()
                .map(|text| Row { text, kind }),
        );
    }
    rows
}

/// Input lines as displayed, plus the caret's screen (row, col)
pub fn layout_input(input: &InputBuffer, prompt: &str, tab_width: usize) -> (Vec<String>, (usize, usize)) {
    let indent = " ".repeat(prompt.width());
    let lines: Vec<String> = input
        .text()
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            let lead = if i == 0 { prompt } else { indent.as_str() };
            let shown: String = line.chars().filter_map(printable).collect();
            format!("{}{}", lead, expand_tabs(&shown, tab_width))
        })
        .collect();

    let (caret_line, caret_col) = input.caret_line_col();
    let before: String = input
        .text()
        .split('\n')
        .nth(caret_line)
        .unwrap_or_default()
        .chars()
        .take(caret_col)
        .filter_map(printable)
        .collect();
    let col = prompt.width() + expand_tabs(&before, tab_width).width();
    (lines, (caret_line, col))
}

/// Terminal renderer
pub struct Renderer {
    /// Whether the terminal has been initialized
    initialized: bool,
    /// Whether the keyboard enhancement flags were pushed
    enhanced_keys: bool,
    /// Rows scrolled up from the newest output
    scroll_offset: usize,
    /// Output rows visible in the last frame
    view_rows: usize,
    colors: ColorScheme,
    prompt: String,
    tab_width: usize,
}

impl Renderer {
    pub fn new(colors: ColorScheme, prompt: &str, tab_width: usize) -> Self {
        Self {
            initialized: false,
            enhanced_keys: false,
            scroll_offset: 0,
            view_rows: 0,
            colors,
            prompt: prompt.to_string(),
            tab_width,
        }
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Initialize the terminal for rendering.
    ///
    /// Returns whether the terminal reports modifier keys on Enter.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableBracketedPaste,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
            self.enhanced_keys = true;
        }
        info!("Keyboard enhancement: {}", self.enhanced_keys);

        self.initialized = true;
        Ok(self.enhanced_keys)
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        if self.enhanced_keys {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(stdout, Show);
        let _ = execute!(stdout, EnableLineWrap);
        let _ = execute!(stdout, DisableBracketedPaste);
        let _ = execute!(stdout, LeaveAlternateScreen);
        let _ = stdout.flush();

        // Disable raw mode - this is the most important part
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    /// Rows to move for one page of scrolling
    pub fn page(&self) -> usize {
        self.view_rows.saturating_sub(1).max(1)
    }

    /// Render the session
    pub fn render(&mut self, session: &mut Session) -> io::Result<()> {
        // Deferred scroll: new output was laid out since the last frame
        if session.output_mut().take_scroll_request() {
            self.scroll_offset = 0;
        }

        let (cols, rows) = Self::size()?;
        let (cols, rows) = (cols as usize, rows as usize);

        let (input_lines, (caret_row, caret_col)) =
            layout_input(session.input(), &self.prompt, self.tab_width);
        let input_rows = input_lines.len().min(rows.saturating_sub(1)).max(1);
        let view_rows = rows.saturating_sub(input_rows);
        self.view_rows = view_rows;

        let output = layout_output(session.output(), &self.prompt, self.tab_width, cols);
        let max_offset = output.len().saturating_sub(view_rows);
        self.scroll_offset = self.scroll_offset.min(max_offset);
        let end = output.len() - self.scroll_offset;
        let start = end.saturating_sub(view_rows);

        let stdout = io::stdout();
        let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());
        queue!(stdout, Hide)?;

        for screen_row in 0..view_rows {
            queue!(stdout, MoveTo(0, screen_row as u16), Clear(ClearType::CurrentLine))?;
            if let Some(row) = output.get(start + screen_row) {
                let color = self.row_color(row.kind);
                queue!(stdout, SetForegroundColor(color.to_crossterm()), Print(&row.text))?;
            }
        }

        if self.scroll_offset > 0 {
            let marker = format!("[+{}]", self.scroll_offset);
            let x = cols.saturating_sub(marker.width());
            queue!(
                stdout,
                MoveTo(x as u16, 0),
                SetForegroundColor(self.colors.notice.to_crossterm()),
                Print(marker)
            )?;
        }

        // Keep the caret line visible when the input is taller than the screen
        let first_input = (caret_row + 1).saturating_sub(input_rows);
        for i in 0..input_rows {
            let y = (view_rows + i) as u16;
            queue!(stdout, MoveTo(0, y), Clear(ClearType::CurrentLine))?;
            if let Some(line) = input_lines.get(first_input + i) {
                if first_input + i == 0 {
                    let rest = &line[self.prompt.len()..];
                    queue!(
                        stdout,
                        SetForegroundColor(self.colors.prompt.to_crossterm()),
                        Print(&self.prompt),
                        SetForegroundColor(self.colors.input.to_crossterm()),
                        Print(rest)
                    )?;
                } else {
                    queue!(
                        stdout,
                        SetForegroundColor(self.colors.input.to_crossterm()),
                        Print(line)
                    )?;
                }
            }
        }

        let caret_y = view_rows + caret_row - first_input;
        queue!(
            stdout,
            ResetColor,
            MoveTo(caret_col.min(cols.saturating_sub(1)) as u16, caret_y as u16),
            Show
        )?;
        stdout.flush()?;

        debug!(
            "Rendered {} output rows (offset {})",
            output.len(),
            self.scroll_offset
        );
        Ok(())
    }

    fn row_color(&self, kind: RowKind) -> Color {
        match kind {
            RowKind::Banner => self.colors.banner,
            RowKind::Command => self.colors.command,
            RowKind::Result => self.colors.result,
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
