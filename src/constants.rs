// simulated time is measured in nanoseconds
pub const CLOCK_TICK: u64 = 1;

// one disk read costs 2ms
pub const DISK_PENALTY: u64 = 2_000_000 * CLOCK_TICK;

pub const DEFAULT_PAGE_SIZE: u64 = 4096;
pub const DEFAULT_MEMORY_MB: u64 = 1;
pub const BYTES_PER_MB: u64 = 0x10_0000;

pub const DEFAULT_RANDOM_SEED: u64 = 537;
