use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use pfsim::constants::{DEFAULT_MEMORY_MB, DEFAULT_PAGE_SIZE, DEFAULT_RANDOM_SEED};
use pfsim::{PolicyKind, QueueOrder};

/// Replay a page reference trace against a demand-paged memory
#[derive(Debug, Parser)]
#[command(name = "pfsim", version, about)]
pub struct Cli {
    /// Trace file of `<pid> <vpn>` records, one per line
    pub trace_file: PathBuf,

    /// Physical memory size in MB
    #[arg(short, long = "memory", default_value_t = DEFAULT_MEMORY_MB)]
    pub memory_mb: u64,

    /// Page size in bytes, a power of two
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u64,

    /// Page replacement policy
    #[arg(long, value_enum, default_value_t = PolicyArg::Lru)]
    pub policy: PolicyArg,

    /// Seed for the random policy
    #[arg(long, default_value_t = DEFAULT_RANDOM_SEED)]
    pub seed: u64,

    /// Order of the runnable queue
    #[arg(long, value_enum, default_value_t = QueueOrderArg::Arrival)]
    pub queue_order: QueueOrderArg,

    /// Run every policy over the trace, one report each
    #[arg(long, conflicts_with = "policy")]
    pub all: bool,

    /// Log faults, page-ins and evictions
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Lru,
    Fifo,
    Clock,
    Random,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Lru => PolicyKind::Lru,
            PolicyArg::Fifo => PolicyKind::Fifo,
            PolicyArg::Clock => PolicyKind::Clock,
            PolicyArg::Random => PolicyKind::Random,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueOrderArg {
    /// First come, first served
    Arrival,
    /// Earliest saved trace position first
    Position,
}

impl From<QueueOrderArg> for QueueOrder {
    fn from(arg: QueueOrderArg) -> Self {
        match arg {
            QueueOrderArg::Arrival => QueueOrder::Arrival,
            QueueOrderArg::Position => QueueOrder::TracePosition,
        }
    }
}
