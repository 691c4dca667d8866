//! Byte bridge between host text and engine linear memory
//!
//! Commands travel into the engine as NUL-terminated UTF-8; output comes
//! back as `(address, length)` spans that are decoded here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("span {address}+{length} is outside linear memory ({memory_size} bytes)")]
    OutOfBounds {
        address: u32,
        length: u32,
        memory_size: usize,
    },

    #[error("engine does not export its linear memory")]
    MissingMemory,
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Encode command text as NUL-terminated UTF-8
pub fn encode(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    bytes
}

/// Copy `bytes` into linear memory at `address`
pub fn write(memory: &mut [u8], address: u32, bytes: &[u8]) -> Result<()> {
    let length = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    let range = span(memory.len(), address, length)?;
    memory[range].copy_from_slice(bytes);
    Ok(())
}

/// Decode `length` bytes at `address` into text.
///
/// Invalid UTF-8 sequences become U+FFFD rather than failing, so a
/// misbehaving engine still produces something readable.
pub fn decode(memory: &[u8], address: u32, length: u32) -> Result<String> {
    let range = span(memory.len(), address, length)?;
    Ok(String::from_utf8_lossy(&memory[range]).into_owned())
}

fn span(memory_size: usize, address: u32, length: u32) -> Result<std::ops::Range<usize>> {
    let start = address as usize;
    let end = start.checked_add(length as usize);
    match end {
        Some(end) if end <= memory_size => Ok(start..end),
        _ => Err(BridgeError::OutOfBounds {
            address,
            length,
            memory_size,
        }),
    }
}
