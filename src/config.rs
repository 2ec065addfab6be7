use crate::constants::{
    BYTES_PER_MB, CLOCK_TICK, DEFAULT_MEMORY_MB, DEFAULT_PAGE_SIZE, DEFAULT_RANDOM_SEED,
    DISK_PENALTY,
};
use crate::error::ConfigError;
use crate::process::QueueOrder;
use crate::replace::PolicyKind;

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Physical memory size in bytes
    pub memory_bytes: u64,
    pub page_size: u64,
    pub policy: PolicyKind,
    /// Seed for the Random policy
    pub seed: u64,
    pub queue_order: QueueOrder,
    /// Ticks a page-in keeps a process Blocked
    pub disk_penalty: u64,
    pub clock_tick: u64,
    /// Jump straight to the next disk completion when nothing can run
    pub fast_forward: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            memory_bytes: DEFAULT_MEMORY_MB * BYTES_PER_MB,
            page_size: DEFAULT_PAGE_SIZE,
            policy: PolicyKind::Lru,
            seed: DEFAULT_RANDOM_SEED,
            queue_order: QueueOrder::Arrival,
            disk_penalty: DISK_PENALTY,
            clock_tick: CLOCK_TICK,
            fast_forward: true,
        }
    }
}

impl SimConfig {
    /// Default config with memory given in megabytes
    pub fn from_megabytes(memory_mb: u64, page_size: u64) -> Result<Self, ConfigError> {
        let memory_bytes = memory_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or(ConfigError::MemoryOverflow)?;
        Ok(SimConfig {
            memory_bytes,
            page_size,
            ..Default::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_bytes == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if !self.page_size.is_power_of_two() {
            return Err(ConfigError::PageSizeNotPowerOfTwo {
                page_size: self.page_size,
            });
        }
        if self.page_size > self.memory_bytes {
            return Err(ConfigError::PageLargerThanMemory {
                page_size: self.page_size,
                memory_bytes: self.memory_bytes,
            });
        }
        if self.memory_bytes % self.page_size != 0 {
            return Err(ConfigError::UnevenPageCount {
                page_size: self.page_size,
                memory_bytes: self.memory_bytes,
            });
        }
        if self.clock_tick == 0 {
            return Err(ConfigError::ZeroClockTick);
        }
        if self.disk_penalty == 0 || self.disk_penalty % self.clock_tick != 0 {
            return Err(ConfigError::InvalidDiskPenalty {
                disk_penalty: self.disk_penalty,
                clock_tick: self.clock_tick,
            });
        }
        Ok(())
    }

    /// Number of physical frames; only meaningful once validated
    pub fn total_frames(&self) -> u64 {
        self.memory_bytes / self.page_size
    }
}
