//! Session management
//!
//! The REPL session controller: edits the input buffer, walks the
//! command history, dispatches submitted commands to meta-command
//! handlers or the engine, and appends what they produce to the output
//! log.

use tracing::{debug, info, warn};

use super::engine::{EngineAdapter, EngineState};
use super::host::Host;
use super::input::InputBuffer;
use super::meta::MetaCommand;
use super::output::{LineKind, OutputLog};
use crate::history::{CommandHistory, Recall};

/// Semantic input gestures reported by the input surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    Insert(char),
    Paste(String),
    /// Execute the input
    Submit,
    /// Line break without executing
    SoftNewline,
    /// Literal tab
    Tab,
    HistoryPrevious,
    HistoryNext,
    /// Discard the current input
    Interrupt,
    Backspace,
    Delete,
    CaretLeft,
    CaretRight,
    CaretHome,
    CaretEnd,
}

/// A REPL session
pub struct Session {
    input: InputBuffer,
    history: CommandHistory,
    output: OutputLog,
    engine: EngineAdapter,
    host: Box<dyn Host>,
    docs_url: String,
}

impl Session {
    /// Create a new session around an (already initialized) engine
    pub fn new(
        engine: EngineAdapter,
        history: CommandHistory,
        host: Box<dyn Host>,
        banner: &str,
        docs_url: &str,
    ) -> Self {
        Self {
            input: InputBuffer::new(),
            history,
            output: OutputLog::new(banner),
            engine,
            host,
            docs_url: docs_url.to_string(),
        }
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    #[allow(dead_code)]
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputLog {
        &mut self.output
    }

    #[allow(dead_code)]
    pub fn engine(&self) -> &EngineAdapter {
        &self.engine
    }

    /// Append a free-standing line, e.g. a startup notice
    pub fn notice(&mut self, text: &str) {
        self.output.push(text, LineKind::Result);
    }

    /// Apply one gesture
    pub fn handle(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Insert(ch) => self.input.insert(ch),
            Gesture::Paste(text) => self.input.insert_str(&text),
            Gesture::Submit => self.submit(),
            Gesture::SoftNewline => self.input.insert('\n'),
            Gesture::Tab => self.input.insert('\t'),
            Gesture::HistoryPrevious => self.recall(|history| history.previous()),
            Gesture::HistoryNext => self.recall(|history| history.next()),
            Gesture::Interrupt => self.input.clear(),
            Gesture::Backspace => self.input.backspace(),
            Gesture::Delete => self.input.delete(),
            Gesture::CaretLeft => self.input.move_left(),
            Gesture::CaretRight => self.input.move_right(),
            Gesture::CaretHome => self.input.move_line_start(),
            Gesture::CaretEnd => self.input.move_line_end(),
        }
    }

    fn recall<F>(&mut self, step: F)
    where
        F: FnOnce(&mut CommandHistory) -> Recall,
    {
        match step(&mut self.history) {
            Recall::Entry(command) => self.input.set(&command),
            Recall::Fresh => self.input.clear(),
            Recall::Unchanged => {}
        }
    }

    /// Execute the current input
    pub fn submit(&mut self) {
        let raw = self.input.take();
        let command = raw.trim();
        if command.is_empty() {
            return;
        }

        self.history.push(command);
        // Leading indentation is echoed as typed; trailing blank lines are not
        self.output.push(raw.trim_end(), LineKind::Command);
        self.dispatch(command);
    }

    fn dispatch(&mut self, command: &str) {
        match MetaCommand::parse(command) {
            Some(meta) => self.run_meta(meta),
            None => self.run_engine(command),
        }
    }

    fn run_meta(&mut self, meta: MetaCommand) {
        debug!("Meta command {}", meta.name());
        match meta {
            MetaCommand::Help => {
                if let Err(e) = self.host.open_docs(&self.docs_url) {
                    warn!("Failed to open {}: {}", self.docs_url, e);
                }
                self.output.push("", LineKind::Result);
            }
            MetaCommand::Clear => self.output.clear(),
            MetaCommand::Commands => {
                for line in MetaCommand::listing() {
                    self.output.push(line, LineKind::Result);
                }
            }
        }
    }

    fn run_engine(&mut self, command: &str) {
        if !self.engine.is_ready() {
            let reason = match self.engine.state() {
                EngineState::Failed(reason) => reason.clone(),
                _ => "not initialized".to_string(),
            };
            self.output.push(
                format!("Engine unavailable ({}); try ?commands", reason),
                LineKind::Result,
            );
            return;
        }

        match self.engine.run(command) {
            Ok(result) => self.output.push(result, LineKind::Result),
            Err(e) => {
                warn!("Command failed: {}", e);
                self.output.push(format!("error: {}", e), LineKind::Result);
            }
        }
        info!("Executed command ({} in history)", self.history.len());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use super::*;
    use crate::core::engine::{Engine, EngineError};
    use crate::core::testing::ScriptedEngine;

    const BANNER: &str = "Welcome to TINYLISP!";

    #[derive(Clone, Default)]
    struct RecordingHost {
        opened: Rc<RefCell<Vec<String>>>,
    }

    impl Host for RecordingHost {
        fn open_docs(&mut self, url: &str) -> io::Result<()> {
            self.opened.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn session_with(engine: ScriptedEngine) -> Session {
        let mut adapter = EngineAdapter::new();
        adapter
            .initialize(move || Ok(Box::new(engine) as Box<dyn Engine>))
            .unwrap();
        Session::new(
            adapter,
            CommandHistory::new(),
            Box::new(RecordingHost::default()),
            BANNER,
            "https://example.org/docs",
        )
    }

    fn session() -> Session {
        session_with(ScriptedEngine::new().respond("(+ 1 2)", "3"))
    }

    fn type_text(session: &mut Session, text: &str) {
        for ch in text.chars() {
            session.handle(Gesture::Insert(ch));
        }
    }

    fn submit(session: &mut Session, text: &str) {
        type_text(session, text);
        session.handle(Gesture::Submit);
    }

    fn rendered(session: &Session) -> Vec<(String, LineKind)> {
        session
            .output()
            .lines()
            .iter()
            .map(|line| (line.text().to_string(), line.kind()))
            .collect()
    }

    #[test]
    fn test_submit_records_trimmed_command() {
        let mut session = session();
        submit(&mut session, "  (+ 1 2)  ");

        assert_eq!(session.history().last(), Some("(+ 1 2)"));
        assert_eq!(session.history().cursor(), session.history().len());
        assert!(session.input().is_empty());
        assert_eq!(
            rendered(&session),
            vec![
                ("  (+ 1 2)".to_string(), LineKind::Command),
                ("3".to_string(), LineKind::Result),
            ]
        );
    }

    #[test]
    fn test_trailing_newline_not_echoed() {
        let mut session = session();
        type_text(&mut session, "(+ 1 2)");
        session.handle(Gesture::SoftNewline);
        session.handle(Gesture::Submit);

        assert_eq!(
            rendered(&session),
            vec![
                ("(+ 1 2)".to_string(), LineKind::Command),
                ("3".to_string(), LineKind::Result),
            ]
        );
    }

    #[test]
    fn test_multiline_echo_keeps_inner_lines() {
        let mut session = session();
        type_text(&mut session, "(define x");
        session.handle(Gesture::SoftNewline);
        type_text(&mut session, "  1)");
        session.handle(Gesture::Submit);

        assert_eq!(rendered(&session)[0].0, "(define x\n  1)");
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut session = session();
        submit(&mut session, "");
        submit(&mut session, " \t ");
        session.handle(Gesture::SoftNewline);
        session.handle(Gesture::Submit);

        assert!(session.history().is_empty());
        assert_eq!(session.output().len(), 1);
    }

    #[test]
    fn test_history_round_trip_through_fresh() {
        let mut session = session();
        submit(&mut session, "(+ 1 2)");

        session.handle(Gesture::HistoryPrevious);
        assert_eq!(session.input().text(), "(+ 1 2)");
        session.handle(Gesture::HistoryNext);
        assert_eq!(session.input().text(), "");
        assert_eq!(session.history().cursor(), 1);
    }

    #[test]
    fn test_history_clamps() {
        let mut session = session();
        submit(&mut session, "(a)");
        submit(&mut session, "(b)");

        for _ in 0..5 {
            session.handle(Gesture::HistoryPrevious);
        }
        assert_eq!(session.history().cursor(), 0);
        assert_eq!(session.input().text(), "(a)");

        for _ in 0..5 {
            session.handle(Gesture::HistoryNext);
        }
        assert_eq!(session.history().cursor(), 2);
        assert_eq!(session.input().text(), "");
    }

    #[test]
    fn test_history_previous_on_empty_keeps_input() {
        let mut session = session();
        type_text(&mut session, "(draft");
        session.handle(Gesture::HistoryPrevious);
        assert_eq!(session.input().text(), "(draft");
    }

    #[test]
    fn test_interrupt_keeps_history_cursor() {
        let mut session = session();
        submit(&mut session, "(a)");
        submit(&mut session, "(b)");
        session.handle(Gesture::HistoryPrevious);
        session.handle(Gesture::Interrupt);

        assert!(session.input().is_empty());
        assert_eq!(session.history().cursor(), 1);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_soft_newline_does_not_submit() {
        let mut session = session();
        type_text(&mut session, "(define x");
        session.handle(Gesture::SoftNewline);
        type_text(&mut session, "  1)");

        assert_eq!(session.input().text(), "(define x\n  1)");
        assert!(session.history().is_empty());
        assert_eq!(session.output().len(), 1);
    }

    #[test]
    fn test_tab_inserted_at_caret() {
        let mut session = session();
        type_text(&mut session, "(f x)");
        session.handle(Gesture::CaretLeft);
        session.handle(Gesture::CaretLeft);
        let caret = session.input().caret();
        session.handle(Gesture::Tab);

        assert_eq!(session.input().text(), "(f \tx)");
        assert_eq!(session.input().caret(), caret + 1);

        session.handle(Gesture::Submit);
        // Stored text keeps the tab; only display expands it
        assert_eq!(session.history().last(), Some("(f \tx)"));
        let echo = &session.output().lines()[0];
        assert_eq!(echo.text(), "(f \tx)");
        assert_eq!(echo.display_text(4), "(f     x)");
    }

    #[test]
    fn test_clear_leaves_banner() {
        let mut session = session();
        submit(&mut session, "(+ 1 2)");
        submit(&mut session, "(+ 1 2)");
        submit(&mut session, "?clear");

        assert_eq!(session.output().len(), 1);
        assert_eq!(session.output().banner(), BANNER);
        // Still recorded in history
        assert_eq!(session.history().last(), Some("?clear"));
    }

    #[test]
    fn test_commands_listing() {
        let mut session = session();
        submit(&mut session, "?commands");

        let lines: Vec<String> = session.output().lines()[1..]
            .iter()
            .map(|line| line.text().to_string())
            .collect();
        assert_eq!(lines, MetaCommand::listing());
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_help_opens_docs() {
        let host = RecordingHost::default();
        let opened = Rc::clone(&host.opened);
        let mut session = session();
        session.host = Box::new(host);

        submit(&mut session, "?help");
        assert_eq!(*opened.borrow(), vec!["https://example.org/docs".to_string()]);
        assert_eq!(
            rendered(&session),
            vec![
                ("?help".to_string(), LineKind::Command),
                (String::new(), LineKind::Result),
            ]
        );
    }

    #[test]
    fn test_meta_commands_never_reach_engine() {
        let engine = ScriptedEngine::new();
        let stats = engine.stats();
        let mut session = session_with(engine);

        submit(&mut session, "?commands");
        submit(&mut session, "?clear");
        submit(&mut session, "?help");
        assert!(stats.borrow().commands.is_empty());

        submit(&mut session, "?unknown");
        assert_eq!(stats.borrow().commands, vec!["?unknown".to_string()]);
    }

    #[test]
    fn test_empty_result_still_renders() {
        let mut session = session_with(ScriptedEngine::new().respond("(define x 1)", ""));
        submit(&mut session, "(define x 1)");
        assert_eq!(session.output().len(), 3);
        assert_eq!(session.output().lines()[1].text(), "");
    }

    #[test]
    fn test_consecutive_commands_do_not_leak() {
        let engine = ScriptedEngine::new()
            .respond("(a)", "first")
            .respond("(b)", "second");
        let mut session = session_with(engine);
        submit(&mut session, "(a)");
        submit(&mut session, "(b)");

        let results: Vec<&str> = session
            .output()
            .lines()
            .iter()
            .filter(|line| line.kind() == LineKind::Result)
            .map(|line| line.text())
            .collect();
        assert_eq!(results, vec!["first", "second"]);
    }

    #[test]
    fn test_engine_unavailable() {
        let mut adapter = EngineAdapter::new();
        let _ = adapter.initialize(|| Err(EngineError::Load("tinylisp.wasm".into())));
        let mut session = Session::new(
            adapter,
            CommandHistory::new(),
            Box::new(RecordingHost::default()),
            BANNER,
            "https://example.org/docs",
        );

        submit(&mut session, "(+ 1 2)");
        assert_eq!(session.history().last(), Some("(+ 1 2)"));
        assert!(session.output().lines()[1]
            .text()
            .starts_with("Engine unavailable"));

        // Meta commands still work
        submit(&mut session, "?clear");
        assert_eq!(session.output().len(), 1);
    }

    #[test]
    fn test_boundary_violation_renders_notice_and_continues() {
        let mut session = session_with(ScriptedEngine::new().with_bad_output_span());
        submit(&mut session, "(+ 1 2)");

        assert!(session.output().lines()[1].text().starts_with("error:"));
        assert_eq!(session.history().len(), 1);

        submit(&mut session, "?clear");
        assert_eq!(session.output().len(), 1);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_appends_request_scroll() {
        let mut session = session();
        session.output_mut().take_scroll_request();
        submit(&mut session, "(+ 1 2)");
        assert!(session.output_mut().take_scroll_request());
    }
}
