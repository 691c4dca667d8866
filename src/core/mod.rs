//! Core REPL components.
//!
//! This module contains everything between a key press and the
//! interpreter:
//!
//! - **bridge**: text <-> linear memory encoding
//! - **sink**: terminal/log accumulators the engine writes into
//! - **engine**: engine trait and the adapter that owns it
//! - **wasm**: WebAssembly backend (feature `wasm`)
//! - **session**: input editing, history and command dispatch
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── InputBuffer (text + caret)
//! ├── CommandHistory (entries + cursor)
//! ├── OutputLog (banner + rendered lines)
//! └── EngineAdapter
//!     ├── OutputSink (terminal + log accumulators)
//!     └── dyn Engine (WasmEngine)
//! ```

pub mod bridge;
pub mod engine;
pub mod host;
pub mod input;
pub mod meta;
pub mod output;
pub mod session;
pub mod sink;
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(test)]
pub mod testing;
