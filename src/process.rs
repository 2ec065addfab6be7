use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::interval::{Interval, IntervalIndex};
use crate::memory::{PageRef, Pid, VirtualPage, Vpn};
use crate::replace::ReplacementPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    Runnable,
    Blocked,
    Finished,
}

impl ProcessState {
    pub const ALL: [ProcessState; 3] = [
        ProcessState::Runnable,
        ProcessState::Blocked,
        ProcessState::Finished,
    ];

    #[inline]
    fn index(self) -> usize {
        match self {
            ProcessState::Runnable => 0,
            ProcessState::Blocked => 1,
            ProcessState::Finished => 2,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Runnable => "RUNNABLE",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

/// How the Runnable queue is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOrder {
    /// Plain FIFO by arrival
    #[default]
    Arrival,
    /// Sorted by saved trace offset, earliest first
    TracePosition,
}

/// Map of VPN -> page for one process
pub type PageTable = BTreeMap<Vpn, VirtualPage>;

/// What happened to a process's cursor after it consumed one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Moved to the next line of the same interval
    NextLine,
    /// Jumped to the start of the following interval
    NextInterval,
    /// No records left for this process
    Exhausted,
}

/// A simulated process and its position in the trace
#[derive(Debug)]
pub struct Process {
    pub pid: Pid,
    state: ProcessState,

    // location in the trace, lines are 1-based record numbers
    pub first_line: u64,
    pub current_line: u64,
    pub last_line: u64,
    /// Byte offset of the next record this process will read
    pub current_file_pos: u64,
    pub current_interval: Interval,

    // disk wait
    pub wait_time_remaining: u64,
    pub pending_page: Option<PageRef>,

    page_table: PageTable,
}

impl Process {
    /// Process positioned at the start of `first`
    pub fn new(first: Interval, last_line: u64) -> Self {
        Process {
            pid: first.pid,
            state: ProcessState::Runnable,
            first_line: first.low,
            current_line: first.low,
            last_line,
            current_file_pos: first.file_offset,
            current_interval: first,
            wait_time_remaining: 0,
            pending_page: None,
            page_table: PageTable::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    #[inline]
    pub fn has_lines_remaining_in_file(&self) -> bool {
        self.current_line < self.last_line
    }

    #[inline]
    pub fn has_lines_remaining_in_interval(&self) -> bool {
        self.current_line < self.current_interval.high
    }

    #[inline]
    pub fn lines_remaining_in_interval(&self) -> u64 {
        self.current_interval.high - self.current_line
    }

    #[inline]
    pub fn on_last_line_in_interval(&self) -> bool {
        self.current_line == self.current_interval.high
    }

    pub fn has_intervals_remaining(&self, index: &IntervalIndex) -> bool {
        index.next_interval(&self.current_interval).is_some()
    }

    /// Move to the first line of the next interval; false if there is none
    pub fn jump_to_next_interval(&mut self, index: &IntervalIndex) -> bool {
        assert!(
            self.on_last_line_in_interval(),
            "pid {} jumped with {} lines left in its interval",
            self.pid,
            self.lines_remaining_in_interval()
        );
        match index.next_interval(&self.current_interval) {
            Some(next) => {
                self.current_interval = next;
                self.current_line = next.low;
                self.current_file_pos = next.file_offset;
                true
            }
            None => false,
        }
    }

    /// Step past the record just consumed. `next_record_pos` is the byte
    /// offset right after it, which is where the next line of the same
    /// interval starts.
    pub fn advance(&mut self, index: &IntervalIndex, next_record_pos: u64) -> CursorStep {
        if self.has_lines_remaining_in_interval() {
            self.current_line += 1;
            self.current_file_pos = next_record_pos;
            CursorStep::NextLine
        } else if self.jump_to_next_interval(index) {
            CursorStep::NextInterval
        } else {
            CursorStep::Exhausted
        }
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn resident_page_count(&self) -> usize {
        self.page_table.values().filter(|p| p.is_resident()).count()
    }
}

/// Every process plus the Runnable/Blocked/Finished queues
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: BTreeMap<Pid, Process>,
    queues: [VecDeque<Pid>; 3],
    order: QueueOrder,
}

impl ProcessTable {
    pub fn new(order: QueueOrder) -> Self {
        ProcessTable {
            order,
            ..Default::default()
        }
    }

    /// Add a new process to the Runnable queue
    pub fn insert(&mut self, mut process: Process) {
        let pid = process.pid;
        assert!(
            !self.processes.contains_key(&pid),
            "pid {} inserted twice",
            pid
        );
        process.state = ProcessState::Runnable;
        self.processes.insert(pid, process);
        self.enqueue(pid, ProcessState::Runnable);
    }

    fn enqueue(&mut self, pid: Pid, state: ProcessState) {
        if state == ProcessState::Runnable && self.order == QueueOrder::TracePosition {
            let pos = self.processes[&pid].current_file_pos;
            let queue = &self.queues[state.index()];
            let at = queue
                .iter()
                .position(|other| self.processes[other].current_file_pos > pos)
                .unwrap_or(queue.len());
            self.queues[state.index()].insert(at, pid);
        } else {
            self.queues[state.index()].push_back(pid);
        }
    }

    /// Head of the queue for `state`
    pub fn peek(&self, state: ProcessState) -> Option<Pid> {
        self.queues[state.index()].front().copied()
    }

    pub fn exists(&self, state: ProcessState) -> bool {
        !self.queues[state.index()].is_empty()
    }

    pub fn len(&self, state: ProcessState) -> usize {
        self.queues[state.index()].len()
    }

    /// Pids in `state` in queue order
    pub fn queued(&self, state: ProcessState) -> impl Iterator<Item = Pid> + '_ {
        self.queues[state.index()].iter().copied()
    }

    /// Move the head of `from` onto `to`. Panics if `from` is empty.
    pub fn switch_status(&mut self, from: ProcessState, to: ProcessState) -> Pid {
        let Some(pid) = self.queues[from.index()].pop_front() else {
            panic!("switch_status: no process in {} queue", from);
        };
        self.set_state_and_enqueue(pid, to);
        pid
    }

    /// Move `pid` from wherever it is queued onto `to`
    pub fn set_status(&mut self, pid: Pid, to: ProcessState) {
        let from = self.state_of(pid);
        let queue = &mut self.queues[from.index()];
        let Some(at) = queue.iter().position(|&p| p == pid) else {
            panic!("pid {} missing from {} queue", pid, from);
        };
        queue.remove(at);
        self.set_state_and_enqueue(pid, to);
    }

    fn set_state_and_enqueue(&mut self, pid: Pid, to: ProcessState) {
        self.process_mut(pid).state = to;
        self.enqueue(pid, to);
    }

    /// Re-sort the Runnable head after its cursor moved. No-op for FIFO order.
    pub fn requeue_runnable_head(&mut self) {
        if self.order == QueueOrder::TracePosition && self.exists(ProcessState::Runnable) {
            self.switch_status(ProcessState::Runnable, ProcessState::Runnable);
        }
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.get_mut(&pid)
    }

    /// Panics on an unknown pid
    pub fn process(&self, pid: Pid) -> &Process {
        match self.processes.get(&pid) {
            Some(p) => p,
            None => panic!("unknown pid {}", pid),
        }
    }

    /// Panics on an unknown pid
    pub fn process_mut(&mut self, pid: Pid) -> &mut Process {
        match self.processes.get_mut(&pid) {
            Some(p) => p,
            None => panic!("unknown pid {}", pid),
        }
    }

    fn state_of(&self, pid: Pid) -> ProcessState {
        self.process(pid).state
    }

    pub fn get_virtual_page(&self, pid: Pid, vpn: Vpn) -> Option<&VirtualPage> {
        self.processes.get(&pid)?.page_table.get(&vpn)
    }

    pub fn get_virtual_page_mut(&mut self, pid: Pid, vpn: Vpn) -> Option<&mut VirtualPage> {
        self.processes.get_mut(&pid)?.page_table.get_mut(&vpn)
    }

    /// Create a non-resident page for `(pid, vpn)` with policy overhead
    /// attached. Panics if the vpn is already mapped.
    pub fn alloc_virtual_page(
        &mut self,
        pid: Pid,
        vpn: Vpn,
        policy: &mut dyn ReplacementPolicy,
    ) -> &mut VirtualPage {
        let table = &mut self.process_mut(pid).page_table;
        assert!(
            !table.contains_key(&vpn),
            "pid {} already maps vpn {}",
            pid,
            vpn
        );
        let overhead = policy.init_overhead(PageRef::new(pid, vpn));
        table.entry(vpn).or_insert(VirtualPage::new(pid, vpn, overhead))
    }

    /// Take a process's page table, leaving it empty. The caller unmaps and
    /// frees what it gets back.
    pub fn release_page_table(&mut self, pid: Pid) -> PageTable {
        std::mem::take(&mut self.process_mut(pid).page_table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Number of known processes
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Every page of every process
    pub fn pages(&self) -> impl Iterator<Item = &VirtualPage> {
        self.processes.values().flat_map(|p| p.page_table.values())
    }

    /// Count down every Blocked process's disk timer by `elapsed`
    pub fn tick_blocked(&mut self, elapsed: u64) {
        for pid in &self.queues[ProcessState::Blocked.index()] {
            if let Some(p) = self.processes.get_mut(pid) {
                p.wait_time_remaining = p.wait_time_remaining.saturating_sub(elapsed);
            }
        }
    }

    /// Time until the next disk completion, if anything is Blocked
    pub fn next_completion(&self) -> Option<u64> {
        self.queued(ProcessState::Blocked)
            .map(|pid| self.processes[&pid].wait_time_remaining)
            .min()
    }

    /// Blocked pids whose disk read is done, in queue order
    pub fn completed_waits(&self) -> Vec<Pid> {
        self.queued(ProcessState::Blocked)
            .filter(|pid| self.processes[pid].wait_time_remaining == 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::{self, PolicyKind};

    fn process(index: &mut IntervalIndex, pid: Pid, ranges: &[(u64, u64, u64)]) -> Process {
        for &(low, high, off) in ranges {
            index.insert(pid, low, high, off);
        }
        Process::new(
            index.first_interval(pid).unwrap(),
            index.last_line(pid).unwrap(),
        )
    }

    #[test]
    fn test_new_process_is_runnable() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        table.insert(process(&mut index, 1, &[(1, 3, 0)]));

        assert!(table.exists(ProcessState::Runnable));
        assert!(!table.exists(ProcessState::Blocked));
        assert_eq!(table.peek(ProcessState::Runnable), Some(1));
        assert_eq!(table.get(1).unwrap().state(), ProcessState::Runnable);
    }

    #[test]
    fn test_switch_status_moves_head() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        table.insert(process(&mut index, 1, &[(1, 1, 0)]));
        table.insert(process(&mut index, 2, &[(2, 2, 4)]));

        let moved = table.switch_status(ProcessState::Runnable, ProcessState::Blocked);
        assert_eq!(moved, 1);
        assert_eq!(table.peek(ProcessState::Runnable), Some(2));
        assert_eq!(table.peek(ProcessState::Blocked), Some(1));
        assert_eq!(table.get(1).unwrap().state(), ProcessState::Blocked);

        // Back of the Runnable queue
        table.switch_status(ProcessState::Blocked, ProcessState::Runnable);
        assert_eq!(table.queued(ProcessState::Runnable).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    #[should_panic(expected = "no process in BLOCKED queue")]
    fn test_switch_status_from_empty_panics() {
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        table.switch_status(ProcessState::Blocked, ProcessState::Runnable);
    }

    #[test]
    fn test_set_status_from_middle() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        for pid in 1..=3 {
            table.insert(process(&mut index, pid, &[(pid, pid, pid * 4)]));
        }
        table.set_status(2, ProcessState::Finished);
        assert_eq!(table.queued(ProcessState::Runnable).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(table.peek(ProcessState::Finished), Some(2));
    }

    #[test]
    fn test_trace_position_order() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::TracePosition);
        table.insert(process(&mut index, 5, &[(3, 3, 30)]));
        table.insert(process(&mut index, 6, &[(1, 1, 0)]));
        table.insert(process(&mut index, 7, &[(2, 2, 15)]));

        assert_eq!(table.queued(ProcessState::Runnable).collect::<Vec<_>>(), vec![6, 7, 5]);

        // Head moves past everyone else and is re-sorted
        table.get_mut(6).unwrap().current_file_pos = 40;
        table.requeue_runnable_head();
        assert_eq!(table.queued(ProcessState::Runnable).collect::<Vec<_>>(), vec![7, 5, 6]);
    }

    #[test]
    fn test_cursor_advance_through_intervals() {
        let mut index = IntervalIndex::new();
        let mut p = process(&mut index, 1, &[(1, 2, 0), (5, 5, 40)]);
        assert_eq!(p.current_line, 1);
        assert!(p.has_lines_remaining_in_file());

        assert_eq!(p.advance(&index, 8), CursorStep::NextLine);
        assert_eq!((p.current_line, p.current_file_pos), (2, 8));
        assert!(p.on_last_line_in_interval());
        assert!(p.has_intervals_remaining(&index));

        assert_eq!(p.advance(&index, 16), CursorStep::NextInterval);
        assert_eq!((p.current_line, p.current_file_pos), (5, 40));
        assert!(!p.has_lines_remaining_in_file());

        assert_eq!(p.advance(&index, 48), CursorStep::Exhausted);
        assert_eq!(p.current_line, 5);
    }

    #[test]
    fn test_alloc_and_get_virtual_page() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        let mut policy = replace::build(PolicyKind::Lru, 2, 0);
        table.insert(process(&mut index, 1, &[(1, 1, 0)]));

        assert!(table.get_virtual_page(1, 10).is_none());
        let page = table.alloc_virtual_page(1, 10, policy.as_mut());
        assert!(!page.is_resident());
        assert_eq!(page.page_ref(), PageRef::new(1, 10));
        assert!(table.get_virtual_page(1, 10).is_some());
        assert_eq!(table.pages().count(), 1);
    }

    #[test]
    #[should_panic(expected = "already maps vpn 10")]
    fn test_duplicate_vpn_panics() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        let mut policy = replace::build(PolicyKind::Fifo, 2, 0);
        table.insert(process(&mut index, 1, &[(1, 1, 0)]));
        table.alloc_virtual_page(1, 10, policy.as_mut());
        table.alloc_virtual_page(1, 10, policy.as_mut());
    }

    #[test]
    fn test_release_page_table_empties_process() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        let mut policy = replace::build(PolicyKind::Clock, 2, 0);
        table.insert(process(&mut index, 1, &[(1, 1, 0)]));
        table.alloc_virtual_page(1, 1, policy.as_mut());
        table.alloc_virtual_page(1, 2, policy.as_mut());

        let released = table.release_page_table(1);
        assert_eq!(released.len(), 2);
        assert!(table.get(1).unwrap().page_table().is_empty());
    }

    #[test]
    fn test_disk_timers() {
        let mut index = IntervalIndex::new();
        let mut table = ProcessTable::new(QueueOrder::Arrival);
        table.insert(process(&mut index, 1, &[(1, 1, 0)]));
        table.insert(process(&mut index, 2, &[(2, 2, 4)]));
        for (pid, wait) in [(1, 5), (2, 3)] {
            table.get_mut(pid).unwrap().wait_time_remaining = wait;
            table.set_status(pid, ProcessState::Blocked);
        }

        assert_eq!(table.next_completion(), Some(3));
        table.tick_blocked(3);
        assert_eq!(table.completed_waits(), vec![2]);
        table.tick_blocked(10);
        assert_eq!(table.completed_waits(), vec![1, 2]);
        assert_eq!(table.get(1).unwrap().wait_time_remaining, 0);
    }
}
