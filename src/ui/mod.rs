//! User interface rendering and input handling.
//!
//! - **renderer**: crossterm surface for the output log and input area
//! - **keymapper**: key events to session gestures, with configurable
//!   submit/newline bindings

pub mod keymapper;
pub mod renderer;

pub use keymapper::*;
pub use renderer::*;
