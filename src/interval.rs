use std::collections::BTreeMap;
use std::ops::Bound;

use crate::memory::Pid;

/// A contiguous run of trace records belonging to one process.
///
/// `low` and `high` are inclusive record numbers (1-based); `file_offset` is
/// the byte offset of record `low` in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub pid: Pid,
    pub low: u64,
    pub high: u64,
    pub file_offset: u64,
}

impl Interval {
    pub fn new(pid: Pid, low: u64, high: u64, file_offset: u64) -> Self {
        assert!(low <= high, "interval [{}, {}] has low > high", low, high);
        Interval {
            pid,
            low,
            high,
            file_offset,
        }
    }

    #[inline]
    pub fn contains(&self, line: u64) -> bool {
        self.low <= line && line <= self.high
    }

    /// Number of records covered
    #[inline]
    pub fn len(&self) -> u64 {
        self.high - self.low + 1
    }

    fn overlaps(&self, low: u64, high: u64) -> bool {
        self.low <= high && low <= self.high
    }
}

#[derive(Debug, Default)]
struct ProcessIntervals {
    by_low: BTreeMap<u64, Interval>,
    last_line: u64,
}

/// Per-process ordered set of disjoint line ranges.
///
/// Ranges are kept in a map keyed by `low`, so [`next_interval`] is a
/// successor query and does not care about insertion order.
///
/// [`next_interval`]: IntervalIndex::next_interval
#[derive(Debug, Default)]
pub struct IntervalIndex {
    processes: BTreeMap<Pid, ProcessIntervals>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `pid` owns lines `low..=high`, starting at byte `file_offset`.
    ///
    /// Panics if the range overlaps one already recorded for `pid`.
    pub fn insert(&mut self, pid: Pid, low: u64, high: u64, file_offset: u64) -> Interval {
        let interval = Interval::new(pid, low, high, file_offset);
        let entry = self.processes.entry(pid).or_default();

        let before = entry.by_low.range(..=low).next_back().map(|(_, i)| *i);
        let after = entry.by_low.range(low..).next().map(|(_, i)| *i);
        for neighbour in before.iter().chain(after.iter()) {
            assert!(
                !neighbour.overlaps(low, high),
                "interval [{}, {}] for pid {} overlaps [{}, {}]",
                low,
                high,
                pid,
                neighbour.low,
                neighbour.high
            );
        }

        entry.by_low.insert(low, interval);
        entry.last_line = entry.last_line.max(high);
        interval
    }

    /// Earliest range of `pid`
    pub fn first_interval(&self, pid: Pid) -> Option<Interval> {
        self.processes
            .get(&pid)
            .and_then(|p| p.by_low.values().next().copied())
    }

    /// The range that follows `current` for the same process
    pub fn next_interval(&self, current: &Interval) -> Option<Interval> {
        self.processes.get(&current.pid).and_then(|p| {
            p.by_low
                .range((Bound::Excluded(current.low), Bound::Unbounded))
                .next()
                .map(|(_, i)| *i)
        })
    }

    /// The range of `pid` containing `line`, if any
    pub fn find(&self, pid: Pid, line: u64) -> Option<Interval> {
        self.processes.get(&pid).and_then(|p| {
            p.by_low
                .range(..=line)
                .next_back()
                .map(|(_, i)| *i)
                .filter(|i| i.contains(line))
        })
    }

    pub fn first_line(&self, pid: Pid) -> Option<u64> {
        self.first_interval(pid).map(|i| i.low)
    }

    pub fn last_line(&self, pid: Pid) -> Option<u64> {
        self.processes.get(&pid).map(|p| p.last_line)
    }

    pub fn intervals(&self, pid: Pid) -> impl Iterator<Item = &Interval> {
        self.processes
            .get(&pid)
            .into_iter()
            .flat_map(|p| p.by_low.values())
    }

    /// Pids in ascending order
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    /// Number of processes indexed
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
