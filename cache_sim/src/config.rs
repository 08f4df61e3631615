use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::addr::AddressDecoder;

/// configuration of the whole hierarchy. sizes and associativities are log2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// log2 of block size in bytes, shared by both levels
    pub block_size: u32,
    pub l1_size: u32,
    pub l1_assoc: u32,
    pub l2_size: u32,
    pub l2_assoc: u32,
    pub mem_cycles: u32,
    pub l1_cycles: u32,
    pub l2_cycles: u32,
    #[serde(default = "default_write_allocate")]
    pub write_allocate: bool,
}

fn default_write_allocate() -> bool {
    true
}

impl CacheConfig {
    pub fn deser(file: impl std::io::Read) -> anyhow::Result<Self> {
        Ok(serde_json::from_reader(file)?)
    }
    pub fn l1_geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::new(Level::L1, self.block_size, self.l1_size, self.l1_assoc)
    }
    pub fn l2_geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::new(Level::L2, self.block_size, self.l2_size, self.l2_assoc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    L1,
    L2,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::L1 => f.write_str("L1"),
            Level::L2 => f.write_str("L2"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{level}: block of 2^{block_size} bytes does not fit in a level of 2^{size} bytes")]
    BlockLargerThanLevel {
        level: Level,
        block_size: u32,
        size: u32,
    },
    #[error("{level}: 2^{assoc} ways exceed the {blocks} blocks of the level")]
    TooManyWays { level: Level, assoc: u32, blocks: usize },
    #[error("{level}: 2^{size} bytes exceed the 32-bit address space")]
    LevelTooLarge { level: Level, size: u32 },
    #[error("{level}: 2^{block_bits} blocks exceed the limit of 2^{}", MAX_BLOCK_BITS)]
    TooManyBlocks { level: Level, block_bits: u32 },
}

/// log2 of the most lines one level may hold.
pub const MAX_BLOCK_BITS: u32 = 24;

/// concrete shape of one level, derived from the log2 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub level: Level,
    pub block_bytes: usize,
    pub ways: usize,
    pub sets: usize,
    decoder: AddressDecoder,
}

impl Geometry {
    pub fn new(
        level: Level,
        block_size: u32,
        size: u32,
        assoc: u32,
    ) -> Result<Self, ConfigError> {
        if size > u32::BITS {
            return Err(ConfigError::LevelTooLarge { level, size });
        }
        if block_size > size {
            return Err(ConfigError::BlockLargerThanLevel {
                level,
                block_size,
                size,
            });
        }
        let block_bits = size - block_size;
        if block_bits > MAX_BLOCK_BITS {
            return Err(ConfigError::TooManyBlocks { level, block_bits });
        }
        let blocks = 1usize << block_bits;
        if assoc > block_bits {
            return Err(ConfigError::TooManyWays {
                level,
                assoc,
                blocks,
            });
        }
        let set_bits = block_bits - assoc;
        Ok(Self {
            level,
            block_bytes: 1 << block_size,
            ways: 1 << assoc,
            sets: 1 << set_bits,
            decoder: AddressDecoder::new(block_size, set_bits),
        })
    }
    pub fn decoder(&self) -> &AddressDecoder {
        &self.decoder
    }
    pub fn blocks(&self) -> usize {
        self.ways * self.sets
    }
    pub fn size_bytes(&self) -> usize {
        self.blocks() * self.block_bytes
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} bytes, {}-way, {} sets of {}-byte blocks",
            self.level,
            self.size_bytes(),
            self.ways,
            self.sets,
            self.block_bytes
        )
    }
}
