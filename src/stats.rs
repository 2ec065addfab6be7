use std::fmt;

/// Hooks the simulator calls while it runs.
pub trait StatsCollector {
    /// One clock tick passed with `frames_allocated` frames in use
    fn on_tick(&mut self, frames_allocated: u64, any_runnable: bool);

    /// `ticks` identical ticks in a row, used when the clock fast-forwards
    fn on_ticks(&mut self, frames_allocated: u64, any_runnable: bool, ticks: u64) {
        for _ in 0..ticks {
            self.on_tick(frames_allocated, any_runnable);
        }
    }

    fn on_hit(&mut self);
    fn on_miss(&mut self);
    fn on_evict(&mut self);

    /// Summary over a run of `total_ticks`
    fn finalize(&self, total_ticks: u64) -> Report;
}

/// Running totals behind the performance report
#[derive(Debug, Clone, Default)]
pub struct Stats {
    total_frames: u64,
    // frame-ticks spent allocated
    tmu: u128,
    // ticks with at least one Runnable process
    trp: u128,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Stats {
    pub fn new(total_frames: u64) -> Self {
        Stats {
            total_frames,
            ..Default::default()
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn memory_ticks(&self) -> u128 {
        self.tmu
    }

    pub fn runnable_ticks(&self) -> u128 {
        self.trp
    }
}

impl StatsCollector for Stats {
    fn on_tick(&mut self, frames_allocated: u64, any_runnable: bool) {
        self.tmu += frames_allocated as u128;
        self.trp += any_runnable as u128;
    }

    fn on_ticks(&mut self, frames_allocated: u64, any_runnable: bool, ticks: u64) {
        self.tmu += frames_allocated as u128 * ticks as u128;
        self.trp += any_runnable as u128 * ticks as u128;
    }

    fn on_hit(&mut self) {
        self.hits += 1;
    }

    fn on_miss(&mut self) {
        self.misses += 1;
    }

    fn on_evict(&mut self) {
        self.evictions += 1;
    }

    fn finalize(&self, total_ticks: u64) -> Report {
        let (amu, arp) = if total_ticks == 0 || self.total_frames == 0 {
            (0.0, 0.0)
        } else {
            let time = total_ticks as f64;
            (
                self.tmu as f64 / time / self.total_frames as f64,
                self.trp as f64 / time,
            )
        };
        Report {
            total_frames: self.total_frames,
            amu,
            arp,
            tmr: self.hits + self.misses,
            tpi: self.misses,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            runtime: total_ticks,
        }
    }
}

/// Final performance numbers of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total_frames: u64,
    /// Average memory utilization, fraction of frames in use
    pub amu: f64,
    /// Average number of runnable processes
    pub arp: f64,
    /// Total memory references
    pub tmr: u64,
    /// Total page ins
    pub tpi: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Simulated run time in ticks
    pub runtime: u64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " PERFORMANCE ")?;
        writeln!(f, "  AMU:   {:.6}", self.amu)?;
        writeln!(f, "  ARP:   {:.6}", self.arp)?;
        writeln!(f, "  TMR:   {}", self.tmr)?;
        writeln!(f, "  TPI:   {}", self.tpi)?;
        writeln!(f, "  RTime: {}", self.runtime)?;
        write!(
            f,
            "  hits {} / misses {} / evictions {}",
            self.hits, self.misses, self.evictions
        )
    }
}
