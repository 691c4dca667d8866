//! tinyterm - a terminal REPL for WebAssembly interpreters
//!
//! tinyterm loads a compiled interpreter module (tinylisp by default),
//! hands it each submitted command through linear memory, and shows what
//! it writes back.
//!
//! # Features
//!
//! - **Multi-line Input**: Enter breaks the line, Shift+Enter runs it
//! - **Command History**: Up/Down walk previously submitted commands
//! - **Meta Commands**: `?help`, `?clear`, `?commands`
//! - **Scrollback**: PageUp/PageDown page through older output
//! - **Color Schemes**: built-in themes selected in config.toml
//!
//! # Quick Start
//!
//! ```text
//! tinyterm                              # Load ./tinylisp.wasm
//! tinyterm -e zig-out/bin/tinylisp.wasm # Load a specific module
//! tinyterm --eval "(+ 1 2)"             # Run without the UI
//! ```

mod config;
mod core;
mod history;
mod ui;

use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{ColorScheme, Config};
use crate::core::engine::{Engine, EngineAdapter, EngineError};
use crate::core::host::SystemHost;
use crate::core::session::{Gesture, Session};
use crate::history::CommandHistory;
use crate::ui::{format_line, KeyAction, KeyBindings, KeyMapper, Renderer};

/// Command line options
#[derive(Debug, Default)]
struct CliOptions {
    /// Interpreter module, overrides config.toml
    engine: Option<PathBuf>,
    /// Alternative config file
    config: Option<PathBuf>,
    /// Commands to run without the UI
    eval: Vec<String>,
    /// Don't load or save history
    no_history: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("tinyterm {}", VERSION);
}

fn print_help() {
    eprintln!("tinyterm {} - A terminal REPL for WebAssembly interpreters", VERSION);
    eprintln!();
    eprintln!("Usage: tinyterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e, --engine <PATH>   Interpreter module (.wasm)");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.tinyterm/config.toml)");
    eprintln!("      --eval <CMD>      Run CMD and print the result (repeatable)");
    eprintln!("      --no-history      Don't load or save command history");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Shift+Enter           Run the input (Enter on terminals without");
    eprintln!("                        keyboard enhancement)");
    eprintln!("  Enter                 New line (Alt+Enter / Ctrl+J on such terminals)");
    eprintln!("  Tab                   Insert a tab");
    eprintln!("  Up/Down               Previous/next command in history");
    eprintln!("  Ctrl+C, Esc           Clear the input");
    eprintln!("  Ctrl+V                Paste from clipboard");
    eprintln!("  PageUp/PageDown       Scroll output");
    eprintln!("  Ctrl+D                Quit (on empty input)");
    eprintln!();
    eprintln!("Meta commands: ?help, ?clear, ?commands");
    eprintln!();
    eprintln!("Color schemes: {}", ColorScheme::list().join(", "));
    eprintln!();
    eprintln!("Log file: ~/.tinyterm/tinyterm.log (level from TINYTERM_LOG)");
}

fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = CliOptions::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-e" | "--engine" => {
                i += 1;
                let path = args.get(i).ok_or("Missing engine path")?;
                options.engine = Some(PathBuf::from(path));
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--eval" => {
                i += 1;
                let command = args.get(i).ok_or("Missing command for --eval")?;
                options.eval.push(command.clone());
            }
            "--no-history" => {
                options.no_history = true;
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to a file; stdout belongs to the terminal UI
fn init_logging() {
    let log_path = config::config_dir()
        .map(|dir| dir.join("tinyterm.log"))
        .unwrap_or_else(|| PathBuf::from("tinyterm.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("TINYTERM_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

#[cfg(feature = "wasm")]
fn load_engine(config: &Config) -> Result<Box<dyn Engine>, EngineError> {
    let engine = crate::core::wasm::WasmEngine::load(&config.engine, &config.exports)?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "wasm"))]
fn load_engine(_config: &Config) -> Result<Box<dyn Engine>, EngineError> {
    Err(EngineError::Unsupported)
}

fn build_session(config: &Config, no_history: bool) -> Session {
    let mut adapter = EngineAdapter::new();
    let init = adapter.initialize(|| load_engine(config));

    let history = if config.history.persist && !no_history {
        CommandHistory::persistent(config.history.limit)
    } else {
        CommandHistory::new()
    };

    let mut session = Session::new(
        adapter,
        history,
        Box::new(SystemHost),
        &config.banner,
        &config.docs_url,
    );
    if let Err(e) = init {
        session.notice(&format!("Failed to start engine: {}", e));
        session.notice("Only meta commands are available (?commands)");
    }
    session
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("tinyterm {} starting...", VERSION);

    let mut config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(engine) = options.engine.clone() {
        config.engine = engine;
    }
    info!("Engine: {}", config.engine.display());

    let mut session = build_session(&config, options.no_history);

    if !options.eval.is_empty() {
        return run_batch(&mut session, &options.eval, &config);
    }

    if !std::io::stdout().is_terminal() {
        anyhow::bail!("stdout is not a terminal; use --eval to run commands non-interactively");
    }

    run_interactive(&mut session, &config)
}

/// Run each command and print the lines it produced
fn run_batch(session: &mut Session, commands: &[String], config: &Config) -> anyhow::Result<()> {
    for line in session.output().lines() {
        eprintln!("{}", format_line(line, &config.prompt, config.tab_width));
    }

    for command in commands {
        let before = session.output().lines().len();
        session.handle(Gesture::Paste(command.clone()));
        session.handle(Gesture::Submit);

        // `?clear` shrinks the log; there is nothing new to print
        let lines = session.output().lines();
        for line in lines.iter().skip(before) {
            println!("{}", format_line(line, &config.prompt, config.tab_width));
        }
    }
    Ok(())
}

fn run_interactive(session: &mut Session, config: &Config) -> anyhow::Result<()> {
    let mut renderer = Renderer::new(config.get_color_scheme(), &config.prompt, config.tab_width);
    let enhanced = renderer.init()?;

    let bindings = match KeyBindings::from_config(&config.keys, enhanced) {
        Ok(b) => b,
        Err(e) => {
            warn!("Invalid key binding ({}); using defaults", e);
            if enhanced {
                KeyBindings::enhanced()
            } else {
                KeyBindings::legacy()
            }
        }
    };

    let result = run_main_loop(session, &mut renderer, &bindings);

    let _ = renderer.cleanup();
    if let Err(e) = &result {
        error!("Main loop failed: {}", e);
    }
    info!("tinyterm exiting");
    result
}

fn run_main_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    bindings: &KeyBindings,
) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(250);
    renderer.render(session)?;

    loop {
        if !event::poll(poll_timeout)? {
            continue;
        }

        match event::read()? {
            Event::Key(key_event) => {
                // Only process key press events
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }

                let input_empty = session.input().is_empty();
                match KeyMapper::map(&key_event, bindings, input_empty) {
                    Some(KeyAction::Gesture(gesture)) => session.handle(gesture),
                    Some(KeyAction::ScrollUp) => {
                        let page = renderer.page();
                        renderer.scroll_up(page);
                    }
                    Some(KeyAction::ScrollDown) => {
                        let page = renderer.page();
                        renderer.scroll_down(page);
                    }
                    Some(KeyAction::PasteClipboard) => {
                        match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
                            Ok(text) => session.handle(Gesture::Paste(normalize_newlines(&text))),
                            Err(e) => warn!("Failed to read clipboard: {}", e),
                        }
                    }
                    Some(KeyAction::Quit) => {
                        info!("Quit requested");
                        break;
                    }
                    None => continue,
                }
            }

            Event::Paste(text) => {
                session.handle(Gesture::Paste(normalize_newlines(&text)));
            }

            Event::Resize(cols, rows) => {
                info!("Resize: {}x{}", cols, rows);
            }

            _ => continue,
        }

        renderer.render(session)?;
    }

    Ok(())
}

/// Pasted text may carry CRLF or bare CR line endings
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
