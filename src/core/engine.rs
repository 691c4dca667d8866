//! Engine adapter
//!
//! Mediates every interaction with the interpreter: one-time
//! initialization, command execution through linear memory, and the
//! paired allocate/free around each call.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::bridge::{self, BridgeError};
use super::sink::OutputSink;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to load engine: {0}")]
    Load(String),

    #[error("Failed to instantiate engine: {0}")]
    Instantiate(String),

    #[error("Engine export `{0}` is missing or has the wrong signature")]
    MissingExport(String),

    #[error("Engine trapped: {0}")]
    Trap(String),

    #[error("Engine could not allocate {0} bytes")]
    AllocationFailed(u32),

    #[cfg(test)]
    #[error("Engine released address {0} that was not allocated")]
    InvalidFree(u32),

    #[error("Memory boundary violation: {0}")]
    Boundary(#[from] BridgeError),

    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("Engine is already initialized")]
    AlreadyInitialized,

    #[cfg(not(feature = "wasm"))]
    #[error("No engine backend is compiled in")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// The interpreter as seen from the host.
///
/// The sink is lent to the engine for the duration of `init` and `run`;
/// output written through the host callbacks lands there.
pub trait Engine {
    /// One-time interpreter setup
    fn init(&mut self, sink: &mut OutputSink) -> Result<()>;

    /// Execute the NUL-terminated command stored at `address`
    fn run(&mut self, address: u32, length: u32, sink: &mut OutputSink) -> Result<()>;

    /// Allocate `size` bytes in linear memory; 0 means failure
    fn alloc(&mut self, size: u32) -> Result<u32>;

    fn free(&mut self, address: u32) -> Result<()>;

    #[allow(dead_code)]
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];
}

/// Lifecycle of the engine handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Failed(String),
}

/// Owns the engine handle and its output sink
pub struct EngineAdapter {
    engine: Option<Box<dyn Engine>>,
    sink: OutputSink,
    state: EngineState,
}

impl Default for EngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineAdapter {
    pub fn new() -> Self {
        Self {
            engine: None,
            sink: OutputSink::new(),
            state: EngineState::Uninitialized,
        }
    }

    /// Load the engine and run its `init` entry point.
    ///
    /// Runs at most once. On failure the adapter stays unusable for
    /// engine commands and the error is logged and returned.
    pub fn initialize<F>(&mut self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<Box<dyn Engine>>,
    {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::AlreadyInitialized);
        }

        let result = loader().and_then(|mut engine| {
            engine.init(&mut self.sink)?;
            Ok(engine)
        });

        match result {
            Ok(engine) => {
                self.engine = Some(engine);
                self.state = EngineState::Ready;
                // Anything printed during init is not a command result
                let banner = self.sink.flush_terminal();
                if !banner.is_empty() {
                    debug!("Engine init output: {}", banner);
                }
                self.sink.flush_log();
                info!("Engine initialized");
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize engine: {}", e);
                self.sink.flush_terminal();
                self.sink.flush_log();
                self.state = EngineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Run one command and return exactly the terminal text it produced.
    ///
    /// The command span is released even when the engine call fails.
    pub fn run(&mut self, command: &str) -> Result<String> {
        let engine = match (&self.state, self.engine.as_mut()) {
            (EngineState::Ready, Some(engine)) => engine,
            _ => return Err(EngineError::NotInitialized),
        };

        let stale = self.sink.flush_terminal();
        if !stale.is_empty() {
            warn!("Discarding {} bytes of stale terminal output", stale.len());
        }

        let encoded = bridge::encode(command);
        let length = u32::try_from(encoded.len())
            .map_err(|_| EngineError::AllocationFailed(u32::MAX))?;

        let address = engine.alloc(length)?;
        if address == 0 {
            return Err(EngineError::AllocationFailed(length));
        }
        debug!("Allocated {} bytes at {:#x}", length, address);

        let outcome = bridge::write(engine.memory_mut(), address, &encoded)
            .map_err(EngineError::from)
            .and_then(|()| engine.run(address, length, &mut self.sink));

        let output = self.sink.flush_terminal();
        self.sink.flush_log();
        let released = engine.free(address);

        outcome?;
        released?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::ScriptedEngine;

    fn ready_adapter(engine: ScriptedEngine) -> EngineAdapter {
        let mut adapter = EngineAdapter::new();
        adapter
            .initialize(move || Ok(Box::new(engine) as Box<dyn Engine>))
            .unwrap();
        adapter
    }

    #[test]
    fn test_run_returns_accumulated_output() {
        let engine = ScriptedEngine::new().respond("(+ 1 2)", "3");
        let stats = engine.stats();
        let mut adapter = ready_adapter(engine);

        assert_eq!(adapter.run("(+ 1 2)").unwrap(), "3");
        assert_eq!(stats.borrow().commands, vec!["(+ 1 2)".to_string()]);
        assert!(adapter.sink.is_empty());
    }

    #[test]
    fn test_allocation_paired_with_free() {
        let engine = ScriptedEngine::new();
        let stats = engine.stats();
        let mut adapter = ready_adapter(engine);

        adapter.run("(car '(a b))").unwrap();
        adapter.run("(cdr '(a b))").unwrap();

        let stats = stats.borrow();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.frees, 2);
        assert!(stats.live.is_empty());
        // NUL terminator is part of the span
        assert_eq!(stats.last_length, "(cdr '(a b))".len() as u32 + 1);
    }

    #[test]
    fn test_engine_error_text_is_plain_output() {
        let engine = ScriptedEngine::new().respond("(undefined)", "ERR");
        let mut adapter = ready_adapter(engine);
        assert_eq!(adapter.run("(undefined)").unwrap(), "ERR");
    }

    #[test]
    fn test_no_leakage_between_commands() {
        let engine = ScriptedEngine::new()
            .respond("(first)", "one")
            .respond("(second)", "two");
        let mut adapter = ready_adapter(engine);

        assert_eq!(adapter.run("(first)").unwrap(), "one");
        assert_eq!(adapter.run("(second)").unwrap(), "two");
    }

    #[test]
    fn test_empty_result() {
        let engine = ScriptedEngine::new().respond("(define x 1)", "");
        let mut adapter = ready_adapter(engine);
        assert_eq!(adapter.run("(define x 1)").unwrap(), "");
    }

    #[test]
    fn test_run_before_initialize() {
        let mut adapter = EngineAdapter::new();
        assert!(matches!(
            adapter.run("(+ 1 2)"),
            Err(EngineError::NotInitialized)
        ));
    }

    #[test]
    fn test_initialize_failure_blocks_run() {
        let mut adapter = EngineAdapter::new();
        let result = adapter.initialize(|| Err(EngineError::Load("missing.wasm".into())));
        assert!(result.is_err());
        assert!(!adapter.is_ready());
        assert!(matches!(adapter.state(), EngineState::Failed(_)));
        assert!(matches!(
            adapter.run("(+ 1 2)"),
            Err(EngineError::NotInitialized)
        ));
    }

    #[test]
    fn test_initialize_runs_once() {
        let engine = ScriptedEngine::new();
        let stats = engine.stats();
        let mut adapter = ready_adapter(engine);

        let again = adapter.initialize(|| Ok(Box::new(ScriptedEngine::new()) as Box<dyn Engine>));
        assert!(matches!(again, Err(EngineError::AlreadyInitialized)));
        assert_eq!(stats.borrow().inits, 1);
    }

    #[test]
    fn test_init_output_is_not_a_result() {
        let engine = ScriptedEngine::new()
            .with_init_output("tinylisp ready")
            .respond("(+ 1 2)", "3");
        let mut adapter = ready_adapter(engine);
        assert_eq!(adapter.run("(+ 1 2)").unwrap(), "3");
    }

    #[test]
    fn test_allocation_failure() {
        let engine = ScriptedEngine::new().failing_alloc();
        let mut adapter = ready_adapter(engine);
        assert!(matches!(
            adapter.run("(+ 1 2)"),
            Err(EngineError::AllocationFailed(_))
        ));
    }

    #[test]
    fn test_boundary_violation_still_frees() {
        let engine = ScriptedEngine::new().with_bad_output_span();
        let stats = engine.stats();
        let mut adapter = ready_adapter(engine);

        let err = adapter.run("(+ 1 2)").unwrap_err();
        assert!(matches!(err, EngineError::Boundary(_)));
        assert!(stats.borrow().live.is_empty());
        assert!(adapter.sink.is_empty());

        // The adapter stays usable afterwards
        assert!(adapter.is_ready());
    }

    #[test]
    fn test_command_too_large_for_memory() {
        let engine = ScriptedEngine::with_memory_size(64);
        let stats = engine.stats();
        let mut adapter = ready_adapter(engine);

        let big = "x".repeat(100);
        assert!(adapter.run(&big).is_err());
        assert!(stats.borrow().live.is_empty());
    }

    #[test]
    fn test_log_is_flushed_after_each_command() {
        let engine = ScriptedEngine::new()
            .respond("(+ 1 2)", "3")
            .with_unflushed_log("note");
        let mut adapter = ready_adapter(engine);
        adapter.run("(+ 1 2)").unwrap();
        assert!(!adapter.sink.has_pending_log());
    }
}
