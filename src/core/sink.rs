//! Output accumulators the engine writes into while it runs

use tracing::{debug, info};

use super::bridge::{self, BridgeError};

/// Which accumulator an engine write targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Interpreter result text
    Terminal,
    /// Diagnostic text, emitted to the log on flush
    Log,
}

/// Terminal and log accumulators for a single engine.
#[derive(Debug, Default)]
pub struct OutputSink {
    terminal: String,
    log: String,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to a channel
    pub fn write(&mut self, channel: Channel, text: &str) {
        match channel {
            Channel::Terminal => self.terminal.push_str(text),
            Channel::Log => self.log.push_str(text),
        }
    }

    /// Decode an engine span and append it to a channel
    pub fn write_bytes(
        &mut self,
        channel: Channel,
        memory: &[u8],
        address: u32,
        length: u32,
    ) -> Result<(), BridgeError> {
        let text = bridge::decode(memory, address, length)?;
        self.write(channel, &text);
        Ok(())
    }

    /// Take the terminal text, leaving the accumulator empty
    pub fn flush_terminal(&mut self) -> String {
        std::mem::take(&mut self.terminal)
    }

    /// Take the log text and emit it to the diagnostic log.
    ///
    /// Every flush emits one event and clears; an empty flush is
    /// emitted at debug level.
    pub fn flush_log(&mut self) -> String {
        let text = std::mem::take(&mut self.log);
        if text.is_empty() {
            debug!(target: "engine", "(empty log flush)");
        } else {
            info!(target: "engine", "{}", text);
        }
        text
    }

    #[allow(dead_code)]
    pub fn has_pending_terminal(&self) -> bool {
        !self.terminal.is_empty()
    }

    #[allow(dead_code)]
    pub fn has_pending_log(&self) -> bool {
        !self.log.is_empty()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.terminal.is_empty() && self.log.is_empty()
    }
}
