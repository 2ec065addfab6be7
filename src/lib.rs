pub mod config;
pub mod constants;
pub mod error;
pub mod interval;
pub mod memory;
pub mod process;
pub mod replace;
pub mod simulator;
pub mod stats;
pub mod trace;

// Re-export commonly used items for convenience
pub use config::SimConfig;
pub use error::{ConfigError, Result, SimError};
pub use process::QueueOrder;
pub use replace::{PolicyKind, ReplacementPolicy};
pub use simulator::Simulator;
pub use stats::{Report, Stats, StatsCollector};
pub use trace::TraceReader;
