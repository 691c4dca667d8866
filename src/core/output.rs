//! Rendered output log
//!
//! Lines are only ever appended; `clear` drops them all and leaves the
//! banner, which always renders first.

/// What produced a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The submitted command, echoed after the prompt
    Command,
    /// Text returned by a command
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    text: String,
    kind: LineKind,
}

impl RenderedLine {
    pub fn new(text: impl Into<String>, kind: LineKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Stored text, tabs intact
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Text as shown on screen, tabs expanded to `tab_width` spaces
    pub fn display_text(&self, tab_width: usize) -> String {
        expand_tabs(&self.text, tab_width)
    }
}

pub fn expand_tabs(text: &str, tab_width: usize) -> String {
    text.replace('\t', &" ".repeat(tab_width))
}

#[derive(Debug, Clone)]
pub struct OutputLog {
    banner: String,
    lines: Vec<RenderedLine>,
    scroll_requested: bool,
}

impl OutputLog {
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            lines: Vec::new(),
            scroll_requested: true,
        }
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn lines(&self) -> &[RenderedLine] {
        &self.lines
    }

    /// Rendered line count, banner included
    pub fn len(&self) -> usize {
        self.lines.len() + 1
    }

    pub fn push(&mut self, text: impl Into<String>, kind: LineKind) {
        self.lines.push(RenderedLine::new(text, kind));
        self.scroll_requested = true;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll_requested = true;
    }

    /// Consume the pending scroll-to-bottom request.
    ///
    /// Set by every append or clear and honoured by the renderer on its
    /// next frame, once the new lines have been laid out.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}
