//! WebAssembly engine backend
//!
//! Instantiates a compiled interpreter module with `wasmi` and wires the
//! three host callbacks it imports from `env`.

use std::fs;
use std::path::Path;

use tracing::{debug, info};
use wasmi::{Caller, Extern, Linker, Memory, Module, Store, TypedFunc};

use super::bridge::BridgeError;
use super::engine::{Engine, EngineError, Result};
use super::sink::{Channel, OutputSink};
use crate::config::ExportNames;

const IMPORT_MODULE: &str = "env";
const IMPORT_TERMINAL_WRITE: &str = "jsTerminalWriteBuffer";
const IMPORT_LOG_WRITE: &str = "jsConsoleLogWrite";
const IMPORT_LOG_FLUSH: &str = "jsConsoleLogFlush";

/// Store data: the borrowed sink plus the first boundary fault seen
#[derive(Default)]
struct HostState {
    sink: OutputSink,
    memory_export: String,
    fault: Option<BridgeError>,
}

/// An instantiated interpreter module
pub struct WasmEngine {
    store: Store<HostState>,
    memory: Memory,
    init: TypedFunc<(), ()>,
    run: TypedFunc<(i32, i32), ()>,
    alloc: TypedFunc<(i32,), (i32,)>,
    free: TypedFunc<(i32,), ()>,
}

impl WasmEngine {
    /// Read and instantiate a `.wasm` file
    pub fn load(path: &Path, exports: &ExportNames) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| EngineError::Load(format!("{}: {}", path.display(), e)))?;
        info!("Loaded engine module {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(&bytes, exports)
    }

    pub fn from_bytes(bytes: &[u8], exports: &ExportNames) -> Result<Self> {
        let engine = wasmi::Engine::default();
        let module = Module::new(&engine, bytes)
            .map_err(|e| EngineError::Instantiate(e.to_string()))?;

        let state = HostState {
            memory_export: exports.memory.clone(),
            ..HostState::default()
        };
        let mut store = Store::new(&engine, state);
        let mut linker = <Linker<HostState>>::new(&engine);

        linker
            .func_wrap(
                IMPORT_MODULE,
                IMPORT_TERMINAL_WRITE,
                |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    host_write(&mut caller, Channel::Terminal, ptr, len);
                },
            )
            .map_err(|e| EngineError::Instantiate(e.to_string()))?;
        linker
            .func_wrap(
                IMPORT_MODULE,
                IMPORT_LOG_WRITE,
                |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    host_write(&mut caller, Channel::Log, ptr, len);
                },
            )
            .map_err(|e| EngineError::Instantiate(e.to_string()))?;
        linker
            .func_wrap(
                IMPORT_MODULE,
                IMPORT_LOG_FLUSH,
                |mut caller: Caller<'_, HostState>| {
                    caller.data_mut().sink.flush_log();
                },
            )
            .map_err(|e| EngineError::Instantiate(e.to_string()))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| EngineError::Instantiate(e.to_string()))?
            .start(&mut store)
            .map_err(|e| EngineError::Instantiate(e.to_string()))?;

        let memory = instance
            .get_memory(&store, &exports.memory)
            .ok_or_else(|| EngineError::MissingExport(exports.memory.clone()))?;
        let init = instance
            .get_typed_func::<(), ()>(&store, &exports.init)
            .map_err(|_| EngineError::MissingExport(exports.init.clone()))?;
        let run = instance
            .get_typed_func::<(i32, i32), ()>(&store, &exports.run)
            .map_err(|_| EngineError::MissingExport(exports.run.clone()))?;
        let alloc = instance
            .get_typed_func::<(i32,), (i32,)>(&store, &exports.alloc)
            .map_err(|_| EngineError::MissingExport(exports.alloc.clone()))?;
        let free = instance
            .get_typed_func::<(i32,), ()>(&store, &exports.free)
            .map_err(|_| EngineError::MissingExport(exports.free.clone()))?;

        debug!("Engine exports resolved");
        Ok(Self {
            store,
            memory,
            init,
            run,
            alloc,
            free,
        })
    }

    /// Turn a call outcome into an engine result, surfacing any
    /// boundary fault raised by a host callback first.
    fn finish<E: std::fmt::Display>(&mut self, result: std::result::Result<(), E>) -> Result<()> {
        if let Some(fault) = self.store.data_mut().fault.take() {
            return Err(EngineError::Boundary(fault));
        }
        result.map_err(|e| EngineError::Trap(e.to_string()))
    }
}

fn host_write(caller: &mut Caller<'_, HostState>, channel: Channel, ptr: i32, len: i32) {
    let export = caller.data().memory_export.clone();
    let Some(memory) = caller.get_export(&export).and_then(Extern::into_memory) else {
        caller.data_mut().fault.get_or_insert(BridgeError::MissingMemory);
        return;
    };

    let (data, state) = memory.data_and_store_mut(&mut *caller);
    if let Err(e) = state.sink.write_bytes(channel, data, ptr as u32, len as u32) {
        state.fault.get_or_insert(e);
    }
}

impl Engine for WasmEngine {
    fn init(&mut self, sink: &mut OutputSink) -> Result<()> {
        // The sink is lent to the store only while the engine runs
        std::mem::swap(&mut self.store.data_mut().sink, sink);
        let result = self.init.call(&mut self.store, ());
        std::mem::swap(&mut self.store.data_mut().sink, sink);
        self.finish(result)
    }

    fn run(&mut self, address: u32, length: u32, sink: &mut OutputSink) -> Result<()> {
        std::mem::swap(&mut self.store.data_mut().sink, sink);
        let result = self
            .run
            .call(&mut self.store, (address as i32, length as i32));
        std::mem::swap(&mut self.store.data_mut().sink, sink);
        self.finish(result)
    }

    fn alloc(&mut self, size: u32) -> Result<u32> {
        let (address,) = self
            .alloc
            .call(&mut self.store, (size as i32,))
            .map_err(|e| EngineError::Trap(e.to_string()))?;
        Ok(address as u32)
    }

    fn free(&mut self, address: u32) -> Result<()> {
        self.free
            .call(&mut self.store, (address as i32,))
            .map_err(|e| EngineError::Trap(e.to_string()))
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }
}
