//! The event loop.
//!
//! Each call to [`Simulator::step`] is one clock tick (or, when nothing can
//! run, one jump to the next disk completion):
//!
//! 1. advance the clock and sample statistics
//! 2. finish every page-in whose disk timer ran out
//! 3. run one reference for the head of the Runnable queue

use std::io::{BufRead, Seek};

use log::{debug, info, trace};

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::interval::IntervalIndex;
use crate::memory::{FrameId, FrameTable, PageRef, Pid};
use crate::process::{CursorStep, ProcessState, ProcessTable};
use crate::replace::{self, ReplacementPolicy};
use crate::stats::{Report, Stats, StatsCollector};
use crate::trace::{TraceReader, first_pass};

/// Everything one run mutates, owned in one place
#[derive(Debug)]
pub struct SimulatorState {
    pub frames: FrameTable,
    pub processes: ProcessTable,
    pub policy: Box<dyn ReplacementPolicy>,
    pub index: IntervalIndex,
    /// Simulated time elapsed
    pub clock: u64,
}

#[derive(Debug)]
pub struct Simulator<R, S = Stats> {
    config: SimConfig,
    state: SimulatorState,
    trace: TraceReader<R>,
    stats: S,
    last_running: Option<Pid>,
}

impl<R: BufRead + Seek> Simulator<R> {
    /// Validate `config`, scan the trace and get ready to run
    pub fn new(config: SimConfig, trace: TraceReader<R>) -> Result<Self> {
        config.validate()?;
        let stats = Stats::new(config.total_frames());
        Simulator::with_stats(config, trace, stats)
    }
}

impl<R: BufRead + Seek, S: StatsCollector> Simulator<R, S> {
    /// Like [`Simulator::new`] with a caller-supplied statistics collector
    pub fn with_stats(config: SimConfig, mut trace: TraceReader<R>, stats: S) -> Result<Self> {
        config.validate()?;
        let pass = first_pass(&mut trace, config.queue_order)?;
        let total_frames = config.total_frames();

        info!(
            "{} policy, {} frames of {} B, {} processes, {} references",
            config.policy,
            total_frames,
            config.page_size,
            pass.processes.process_count(),
            pass.records
        );

        let state = SimulatorState {
            frames: FrameTable::new(total_frames),
            processes: pass.processes,
            policy: replace::build(config.policy, total_frames, config.seed),
            index: pass.index,
            clock: 0,
        };
        Ok(Simulator {
            config,
            state,
            trace,
            stats,
            last_running: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    pub fn stats(&self) -> &S {
        &self.stats
    }

    /// Simulated time elapsed
    pub fn clock(&self) -> u64 {
        self.state.clock
    }

    /// Clock ticks elapsed
    pub fn ticks(&self) -> u64 {
        self.state.clock / self.config.clock_tick
    }

    /// True once no process is Runnable or Blocked
    pub fn is_finished(&self) -> bool {
        !self.state.processes.exists(ProcessState::Runnable)
            && !self.state.processes.exists(ProcessState::Blocked)
    }

    /// Run to completion and summarize
    pub fn run(&mut self) -> Result<Report> {
        while self.step()? {}
        let report = self.report();
        info!(
            "{} finished after {} ticks: {} hits, {} misses, {} evictions",
            self.config.policy, report.runtime, report.hits, report.misses, report.evictions
        );
        Ok(report)
    }

    /// Report for the time simulated so far
    pub fn report(&self) -> Report {
        self.stats.finalize(self.ticks())
    }

    /// Simulate one tick. Returns false, doing nothing, once every process
    /// has finished.
    pub fn step(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }

        let runnable = self.state.processes.exists(ProcessState::Runnable);
        let tick = self.config.clock_tick;
        let elapsed = match self.state.processes.next_completion() {
            Some(wait) if !runnable && self.config.fast_forward => wait.max(tick),
            _ => tick,
        };

        self.state.clock += elapsed;
        let allocated = self.state.frames.allocated_count();
        if elapsed == tick {
            self.stats.on_tick(allocated, runnable);
        } else {
            self.stats.on_ticks(allocated, runnable, elapsed / tick);
        }

        self.state.processes.tick_blocked(elapsed);
        self.service_disk_completions();

        if let Some(pid) = self.state.processes.peek(ProcessState::Runnable) {
            self.run_reference(pid)?;
        }
        Ok(true)
    }

    fn service_disk_completions(&mut self) {
        for pid in self.state.processes.completed_waits() {
            self.complete_page_in(pid);
        }
    }

    /// Bring the page `pid` is waiting on into memory and move the process
    /// past the reference that faulted.
    fn complete_page_in(&mut self, pid: Pid) {
        let Some(page_ref) = self.state.processes.process_mut(pid).pending_page.take() else {
            panic!("pid {} is blocked without a pending page", pid);
        };

        let frame = if self.state.frames.has_free_frame() {
            self.state.frames.allocate_free_frame()
        } else {
            let victim = self.state.policy.choose_victim();
            self.evict_frame(victim);
            victim
        };

        let Some(page) = self
            .state
            .processes
            .get_virtual_page_mut(page_ref.pid, page_ref.vpn)
        else {
            panic!("pending {} has no page table entry", page_ref);
        };
        self.state.frames.load(frame, page);
        self.state.policy.notify_load(page);
        debug!(
            "t={} page-in {} -> frame {}",
            self.state.clock, page_ref, frame
        );

        let process = self.state.processes.process_mut(pid);
        let resume_at = process.current_file_pos;
        match process.advance(&self.state.index, resume_at) {
            CursorStep::Exhausted => {
                self.state.processes.set_status(pid, ProcessState::Finished);
                self.finish_process(pid);
            }
            CursorStep::NextLine | CursorStep::NextInterval => {
                self.state.processes.set_status(pid, ProcessState::Runnable);
            }
        }
    }

    /// Unmap whatever page holds `frame`
    fn evict_frame(&mut self, frame: FrameId) {
        let Some(owner) = self.state.frames.resident_page(frame) else {
            panic!("{} policy chose free frame {}", self.config.policy, frame);
        };
        let Some(page) = self.state.processes.get_virtual_page_mut(owner.pid, owner.vpn) else {
            panic!("frame {} holds unknown {}", frame, owner);
        };
        self.state.frames.evict(frame, page);
        self.stats.on_evict();
        debug!("t={} evict {} from frame {}", self.state.clock, owner, frame);
    }

    /// Execute the next trace record of running process `pid`
    fn run_reference(&mut self, pid: Pid) -> Result<()> {
        if self.last_running != Some(pid) {
            if let Some(prev) = self.last_running {
                debug!("t={} switch pid {} -> pid {}", self.state.clock, prev, pid);
            }
            self.last_running = Some(pid);
        }

        let process = self.state.processes.process(pid);
        let (offset, line) = (process.current_file_pos, process.current_line);
        if self.state.index.find(pid, line).is_none() {
            return Err(SimError::LineOutsideInterval { pid, line });
        }

        self.trace.seek(offset)?;
        let Some(record) = self.trace.next_record()? else {
            return Err(SimError::UnexpectedEof { pid, offset });
        };
        if record.pid != pid {
            return Err(SimError::PidMismatch {
                expected: pid,
                found: record.pid,
                offset: record.offset,
            });
        }

        let vpn = record.vpn;
        let processes = &mut self.state.processes;
        let resident = match processes.get_virtual_page(pid, vpn) {
            Some(page) => page.is_resident(),
            None => {
                processes.alloc_virtual_page(pid, vpn, self.state.policy.as_mut());
                false
            }
        };

        if resident {
            trace!("t={} pid {} line {} vpn {} hit", self.state.clock, pid, line, vpn);
            if let Some(page) = processes.get_virtual_page(pid, vpn) {
                self.state.policy.notify_access(page);
            }
            self.stats.on_hit();

            let process = processes.process_mut(pid);
            match process.advance(&self.state.index, record.next_offset) {
                CursorStep::NextLine | CursorStep::NextInterval => {
                    processes.requeue_runnable_head();
                }
                CursorStep::Exhausted => {
                    processes.set_status(pid, ProcessState::Finished);
                    self.finish_process(pid);
                }
            }
        } else {
            trace!("t={} pid {} line {} vpn {} miss", self.state.clock, pid, line, vpn);
            self.stats.on_miss();

            let process = processes.process_mut(pid);
            process.pending_page = Some(PageRef::new(pid, vpn));
            process.wait_time_remaining = self.config.disk_penalty;
            process.current_file_pos = record.next_offset;
            processes.switch_status(ProcessState::Runnable, ProcessState::Blocked);
            debug!("t={} pid {} blocked on vpn {}", self.state.clock, pid, vpn);
        }
        Ok(())
    }

    /// Drop a finished process's pages and give their frames back
    fn finish_process(&mut self, pid: Pid) {
        let resident = self.state.processes.process(pid).resident_page_count();
        let table = self.state.processes.release_page_table(pid);
        let pages = table.len();
        for (_, mut page) in table {
            // the policy still needs the frame, so untrack before evicting
            self.state.policy.free_overhead(&page);
            if let Some(frame) = page.current_frame() {
                self.state.frames.evict(frame, &mut page);
            }
        }
        info!(
            "t={} pid {} finished, released {} pages ({} resident)",
            self.state.clock, pid, pages, resident
        );
    }

    /// Panic unless frames, page tables and the policy agree on what is
    /// resident.
    pub fn check_invariants(&self) {
        let frames = &self.state.frames;
        let mut resident: Vec<FrameId> = Vec::new();

        for page in self.state.processes.pages() {
            if let Some(frame) = page.current_frame() {
                assert_eq!(
                    frames.resident_page(frame),
                    Some(page.page_ref()),
                    "{} thinks it is in frame {}",
                    page.page_ref(),
                    frame
                );
                resident.push(frame);
            }
        }
        assert_eq!(
            frames.allocated_count(),
            resident.len() as u64,
            "allocated frames and resident pages differ"
        );
        for frame in frames.iter() {
            if let Some(owner) = frame.resident_page() {
                let page = self.state.processes.get_virtual_page(owner.pid, owner.vpn);
                assert_eq!(
                    page.and_then(|p| p.current_frame()),
                    Some(frame.frame_number),
                    "frame {} holds {} but the page disagrees",
                    frame.frame_number,
                    owner
                );
            }
        }

        if let Some(mut tracked) = self.state.policy.tracked_frames() {
            tracked.sort_unstable();
            resident.sort_unstable();
            assert_eq!(
                tracked, resident,
                "{} policy tracks the wrong frames",
                self.config.policy
            );
        }
    }
}
