//! Host-owned side channel for values the text envelope cannot carry
//! losslessly: 64-bit integers, doubles, blobs and database images.
//!
//! The host pins a block for exactly one call and releases it after the
//! reply. Each block has a direction: the sandbox may only read an
//! [`Direction::Inbound`] block and only write an [`Direction::Outbound`]
//! one. Multi-byte scalars use native byte order, since both ends share one
//! address space.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Address of a pinned block, rendered as `0x<hex>` in envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(u64);

impl Addr {
    /// Wraps a raw address value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw address value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Addr {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Self)
    }
}

/// Which side of the call writes a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Filled by the host, read by the sandbox.
    Inbound,
    /// Zeroed by the host, written by the sandbox.
    Outbound,
}

/// Side-channel access errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MemoryError {
    /// No block is pinned at the address.
    #[error("no pinned block at {0}")]
    UnknownAddress(Addr),
    /// The block exists but flows the other way.
    #[error("block at {addr} is {direction}")]
    WrongDirection {
        /// Block address.
        addr: Addr,
        /// The block's actual direction.
        direction: Direction,
    },
    /// The access does not fit in the block.
    #[error("access of {requested} bytes exceeds block of {size} bytes at {addr}")]
    OutOfBounds {
        /// Block address.
        addr: Addr,
        /// Bytes requested.
        requested: usize,
        /// Block size.
        size: usize,
    },
}

struct Block {
    direction: Direction,
    bytes: Vec<u8>,
}

/// First address handed out; keeps `0x0` free so it never looks like `NULL`.
const BASE_ADDR: u64 = 0x1000;
const ALIGN: u64 = 8;

/// The pinned-block table shared by host and sandbox during a call.
pub struct HostMemory {
    blocks: BTreeMap<Addr, Block>,
    next: u64,
}

impl HostMemory {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            next: BASE_ADDR,
        }
    }

    // ── Host side ───────────────────────────────────────────────────────

    /// Pins `bytes` for the sandbox to read.
    pub fn pin_inbound(&mut self, bytes: Vec<u8>) -> Addr {
        self.pin(Direction::Inbound, bytes)
    }

    /// Pins a zeroed block of `len` bytes for the sandbox to fill.
    pub fn pin_outbound(&mut self, len: usize) -> Addr {
        self.pin(Direction::Outbound, vec![0; len])
    }

    /// Unpins the block at `addr`, returning its final contents.
    pub fn release(&mut self, addr: Addr) -> Option<Vec<u8>> {
        let block = self.blocks.remove(&addr)?;
        if self.blocks.is_empty() {
            self.next = BASE_ADDR;
        }
        Some(block.bytes)
    }

    /// Number of blocks currently pinned.
    #[must_use]
    pub fn pinned(&self) -> usize {
        self.blocks.len()
    }

    // ── Sandbox side ────────────────────────────────────────────────────

    /// Reads the first `len` bytes of an inbound block.
    pub fn read(&self, addr: Addr, len: usize) -> Result<&[u8], MemoryError> {
        let block = self.block(addr, Direction::Inbound)?;
        block
            .bytes
            .get(..len)
            .ok_or(MemoryError::OutOfBounds {
                addr,
                requested: len,
                size: block.bytes.len(),
            })
    }

    /// Writes `bytes` at the start of an outbound block.
    pub fn write(&mut self, addr: Addr, bytes: &[u8]) -> Result<(), MemoryError> {
        let block = self.block_mut(addr, Direction::Outbound)?;
        let size = block.bytes.len();
        let target = block
            .bytes
            .get_mut(..bytes.len())
            .ok_or(MemoryError::OutOfBounds {
                addr,
                requested: bytes.len(),
                size,
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Reads a native-endian `i64` from an inbound block.
    pub fn read_i64(&self, addr: Addr) -> Result<i64, MemoryError> {
        Ok(i64::from_ne_bytes(self.read_array(addr)?))
    }

    /// Reads a native-endian `f64` from an inbound block.
    pub fn read_f64(&self, addr: Addr) -> Result<f64, MemoryError> {
        Ok(f64::from_ne_bytes(self.read_array(addr)?))
    }

    /// Writes a native-endian `i64` into an outbound block.
    pub fn write_i64(&mut self, addr: Addr, value: i64) -> Result<(), MemoryError> {
        self.write(addr, &value.to_ne_bytes())
    }

    /// Writes a native-endian `f64` into an outbound block.
    pub fn write_f64(&mut self, addr: Addr, value: f64) -> Result<(), MemoryError> {
        self.write(addr, &value.to_ne_bytes())
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn pin(&mut self, direction: Direction, bytes: Vec<u8>) -> Addr {
        let addr = Addr(self.next);
        let span = u64::try_from(bytes.len().max(1)).unwrap_or(u64::MAX);
        self.next = self
            .next
            .saturating_add(span)
            .saturating_add(ALIGN - 1)
            & !(ALIGN - 1);
        self.blocks.insert(addr, Block { direction, bytes });
        addr
    }

    fn read_array(&self, addr: Addr) -> Result<[u8; 8], MemoryError> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.read(addr, 8)?);
        Ok(out)
    }

    fn block(&self, addr: Addr, direction: Direction) -> Result<&Block, MemoryError> {
        let block = self
            .blocks
            .get(&addr)
            .ok_or(MemoryError::UnknownAddress(addr))?;
        if block.direction != direction {
            return Err(MemoryError::WrongDirection {
                addr,
                direction: block.direction,
            });
        }
        Ok(block)
    }

    fn block_mut(&mut self, addr: Addr, direction: Direction) -> Result<&mut Block, MemoryError> {
        let block = self
            .blocks
            .get_mut(&addr)
            .ok_or(MemoryError::UnknownAddress(addr))?;
        if block.direction != direction {
            return Err(MemoryError::WrongDirection {
                addr,
                direction: block.direction,
            });
        }
        Ok(block)
    }
}

impl Default for HostMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMemory")
            .field("pinned", &self.blocks.len())
            .finish_non_exhaustive()
    }
}
