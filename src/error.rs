use std::fmt;
use std::io;

use crate::memory::Pid;

/// Rejected simulation parameters, reported before any trace is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Physical memory size was zero
    ZeroMemory,
    /// Page size was zero
    ZeroPageSize,
    /// Page size is not a power of two
    PageSizeNotPowerOfTwo { page_size: u64 },
    /// A single page does not fit in memory
    PageLargerThanMemory { page_size: u64, memory_bytes: u64 },
    /// Memory is not a whole number of pages
    UnevenPageCount { page_size: u64, memory_bytes: u64 },
    /// Memory value overflowed when converted to bytes
    MemoryOverflow,
    /// Clock tick was zero
    ZeroClockTick,
    /// Disk penalty is not a positive multiple of the clock tick
    InvalidDiskPenalty { disk_penalty: u64, clock_tick: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMemory => write!(f, "memory size must be positive"),
            ConfigError::ZeroPageSize => write!(f, "page size must be positive"),
            ConfigError::PageSizeNotPowerOfTwo { page_size } => {
                write!(f, "page size {} is not a power of two", page_size)
            }
            ConfigError::PageLargerThanMemory { page_size, memory_bytes } => write!(
                f,
                "page size {} B is larger than memory size {} B",
                page_size, memory_bytes
            ),
            ConfigError::UnevenPageCount { page_size, memory_bytes } => write!(
                f,
                "memory size {} B is not a multiple of page size {} B",
                memory_bytes, page_size
            ),
            ConfigError::MemoryOverflow => write!(f, "memory size overflows 64 bits"),
            ConfigError::ZeroClockTick => write!(f, "clock tick must be positive"),
            ConfigError::InvalidDiskPenalty { disk_penalty, clock_tick } => write!(
                f,
                "disk penalty {} is not a positive multiple of clock tick {}",
                disk_penalty, clock_tick
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal trace consistency errors. None of these are retried: each one means
/// the trace and the interval index disagree, so simulation results would be
/// meaningless past this point.
#[derive(Debug)]
pub enum SimError {
    /// Simulation parameters were rejected
    Config(ConfigError),
    /// Reading or seeking the trace failed
    Io(io::Error),
    /// Record is not two non-negative integers
    MalformedRecord { offset: u64, text: String },
    /// Record names pid 0
    ZeroPid { offset: u64 },
    /// The cursor landed on a record belonging to another process
    PidMismatch { expected: Pid, found: Pid, offset: u64 },
    /// The trace ended inside an interval that should still have records
    UnexpectedEof { pid: Pid, offset: u64 },
    /// A process's cursor is on a line no interval of it covers
    LineOutsideInterval { pid: Pid, line: u64 },
    /// The trace holds no records at all
    EmptyTrace,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "invalid configuration: {}", e),
            SimError::Io(e) => write!(f, "trace I/O error: {}", e),
            SimError::MalformedRecord { offset, text } => {
                write!(f, "malformed trace record at byte {}: {:?}", offset, text)
            }
            SimError::ZeroPid { offset } => write!(f, "invalid pid 0 at byte {}", offset),
            SimError::PidMismatch { expected, found, offset } => write!(
                f,
                "expected a record for pid {} at byte {}, found pid {}",
                expected, offset, found
            ),
            SimError::UnexpectedEof { pid, offset } => write!(
                f,
                "trace ended at byte {} while pid {} still had references",
                offset, pid
            ),
            SimError::LineOutsideInterval { pid, line } => {
                write!(f, "pid {} reached line {} outside its intervals", pid, line)
            }
            SimError::EmptyTrace => write!(f, "trace file contains no references"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Config(e) => Some(e),
            SimError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        SimError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
