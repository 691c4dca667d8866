//! In-process engine double for tests
//!
//! Behaves like a compiled interpreter module: commands arrive through
//! linear memory and output goes back through decoded spans.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::bridge;
use super::engine::{Engine, EngineError, Result};
use super::sink::{Channel, OutputSink};

const DEFAULT_MEMORY: usize = 64 * 1024;
/// Scratch region the engine stages its output in
const SCRATCH: u32 = 1024;
const HEAP_START: u32 = 8 * 1024;

#[derive(Debug, Default)]
pub struct EngineStats {
    pub inits: usize,
    pub allocations: usize,
    pub frees: usize,
    pub live: HashSet<u32>,
    pub last_length: u32,
    pub commands: Vec<String>,
}

pub struct ScriptedEngine {
    memory: Vec<u8>,
    next: u32,
    responses: HashMap<String, String>,
    init_output: Option<String>,
    unflushed_log: Option<String>,
    fail_alloc: bool,
    bad_span: bool,
    stats: Rc<RefCell<EngineStats>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::with_memory_size(DEFAULT_MEMORY)
    }

    pub fn with_memory_size(size: usize) -> Self {
        Self {
            memory: vec![0; size],
            next: if size > HEAP_START as usize { HEAP_START } else { 8 },
            responses: HashMap::new(),
            init_output: None,
            unflushed_log: None,
            fail_alloc: false,
            bad_span: false,
            stats: Rc::new(RefCell::new(EngineStats::default())),
        }
    }

    /// Reply to `command` with `output`; unknown commands echo back
    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses.insert(command.to_string(), output.to_string());
        self
    }

    pub fn with_init_output(mut self, text: &str) -> Self {
        self.init_output = Some(text.to_string());
        self
    }

    pub fn with_unflushed_log(mut self, text: &str) -> Self {
        self.unflushed_log = Some(text.to_string());
        self
    }

    pub fn failing_alloc(mut self) -> Self {
        self.fail_alloc = true;
        self
    }

    pub fn with_bad_output_span(mut self) -> Self {
        self.bad_span = true;
        self
    }

    pub fn stats(&self) -> Rc<RefCell<EngineStats>> {
        Rc::clone(&self.stats)
    }

    /// Stage `text` in memory and hand it to the sink as the host
    /// callbacks would.
    fn emit(&mut self, channel: Channel, text: &str, sink: &mut OutputSink) -> Result<()> {
        let bytes = text.as_bytes();
        bridge::write(&mut self.memory, SCRATCH, bytes)?;
        sink.write_bytes(channel, &self.memory, SCRATCH, bytes.len() as u32)?;
        Ok(())
    }
}

impl Engine for ScriptedEngine {
    fn init(&mut self, sink: &mut OutputSink) -> Result<()> {
        self.stats.borrow_mut().inits += 1;
        if let Some(text) = self.init_output.clone() {
            self.emit(Channel::Terminal, &text, sink)?;
        }
        Ok(())
    }

    fn run(&mut self, address: u32, length: u32, sink: &mut OutputSink) -> Result<()> {
        // Strip the NUL terminator
        let command = bridge::decode(&self.memory, address, length.saturating_sub(1))?;
        self.stats.borrow_mut().commands.push(command.clone());

        if self.bad_span {
            let size = self.memory.len() as u32;
            sink.write_bytes(Channel::Terminal, &self.memory, size - 2, 16)?;
        }

        let output = self
            .responses
            .get(&command)
            .cloned()
            .unwrap_or_else(|| command.clone());
        self.emit(Channel::Terminal, &output, sink)?;

        self.emit(Channel::Log, &format!("ran {}", command), sink)?;
        sink.flush_log();

        if let Some(text) = self.unflushed_log.clone() {
            self.emit(Channel::Log, &text, sink)?;
        }
        Ok(())
    }

    fn alloc(&mut self, size: u32) -> Result<u32> {
        if self.fail_alloc {
            return Ok(0);
        }
        let address = self.next;
        self.next = self.next.saturating_add(size.max(1));
        let mut stats = self.stats.borrow_mut();
        stats.allocations += 1;
        stats.last_length = size;
        stats.live.insert(address);
        Ok(address)
    }

    fn free(&mut self, address: u32) -> Result<()> {
        let mut stats = self.stats.borrow_mut();
        if !stats.live.remove(&address) {
            return Err(EngineError::InvalidFree(address));
        }
        stats.frees += 1;
        Ok(())
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}
