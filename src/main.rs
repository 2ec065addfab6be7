//! pfsim - demand paging simulator
//!
//! Usage: pfsim [OPTIONS] <TRACE_FILE>
//!
//! Replays a trace of `<pid> <vpn>` references against a physical memory of
//! the given size and prints the run's performance figures. `RUST_LOG`
//! overrides the log filter chosen by `-v`.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use pfsim::constants::BYTES_PER_MB;
use pfsim::{PolicyKind, Report, SimConfig, Simulator, TraceReader};

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = SimConfig::from_megabytes(cli.memory_mb, cli.page_size)
        .context("invalid memory size")?;
    config.seed = cli.seed;
    config.queue_order = cli.queue_order.into();
    config.validate().context("invalid simulation parameters")?;

    print_parameters(&cli.trace_file, &config);

    let policies: Vec<PolicyKind> = if cli.all {
        PolicyKind::ALL.to_vec()
    } else {
        vec![cli.policy.into()]
    };

    for policy in policies {
        let config = SimConfig {
            policy,
            ..config.clone()
        };
        let report = simulate(&cli.trace_file, config)
            .with_context(|| format!("{} simulation of {} failed", policy, cli.trace_file.display()))?;
        println!();
        println!(" {} ", policy.name().to_uppercase());
        println!("{}", report);
    }
    Ok(())
}

fn simulate(path: &Path, config: SimConfig) -> Result<Report> {
    let trace = TraceReader::open(path)
        .with_context(|| format!("could not open trace file {}", path.display()))?;
    let mut sim = Simulator::new(config, trace)?;
    Ok(sim.run()?)
}

fn print_parameters(path: &Path, config: &SimConfig) {
    println!(" PARAMETERS ");
    println!("  {}", path.display());
    println!("  page size: {} B", config.page_size);
    if config.memory_bytes % BYTES_PER_MB == 0 {
        println!("  memory size: {} MB", config.memory_bytes / BYTES_PER_MB);
    } else {
        println!("  memory size: {} B", config.memory_bytes);
    }
    println!("  = {} pages", config.total_frames());
}
