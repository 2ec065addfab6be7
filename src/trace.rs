use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{Result, SimError};
use crate::interval::IntervalIndex;
use crate::memory::{Pid, Vpn};
use crate::process::{Process, ProcessTable, QueueOrder};

/// One `<pid> <vpn>` reference from the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub pid: Pid,
    pub vpn: Vpn,
    /// Byte offset where the record's line starts
    pub offset: u64,
    /// Byte offset just past the record's line
    pub next_offset: u64,
}

/// Reads trace records while keeping track of the byte offset, so callers
/// can save a position and come back to it later.
#[derive(Debug)]
pub struct TraceReader<R> {
    inner: R,
    pos: u64,
    line: String,
}

impl TraceReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(TraceReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead + Seek> TraceReader<R> {
    /// Wrap a reader positioned at the start of the trace
    pub fn new(inner: R) -> Self {
        TraceReader {
            inner,
            pos: 0,
            line: String::new(),
        }
    }

    /// Offset of the next byte to be read
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Move to `offset`; nothing is done if the reader is already there
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset != self.pos {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.pos = offset;
        }
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.pos = 0;
        Ok(())
    }

    /// Next record, skipping blank lines. `None` at end of trace.
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>> {
        loop {
            self.line.clear();
            let start = self.pos;
            let read = self.inner.read_line(&mut self.line)?;
            if read == 0 {
                return Ok(None);
            }
            self.pos += read as u64;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            let (pid, vpn) = parse_record(text, start)?;
            return Ok(Some(TraceRecord {
                pid,
                vpn,
                offset: start,
                next_offset: self.pos,
            }));
        }
    }
}

/// Parse `<pid> <vpn>`; `offset` is only used for error reporting
pub fn parse_record(text: &str, offset: u64) -> Result<(Pid, Vpn)> {
    let malformed = || SimError::MalformedRecord {
        offset,
        text: text.to_string(),
    };

    let mut tokens = text.split_whitespace();
    let (Some(pid), Some(vpn), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed());
    };
    let pid: Pid = pid.parse().map_err(|_| malformed())?;
    let vpn: Vpn = vpn.parse().map_err(|_| malformed())?;

    if pid == 0 {
        return Err(SimError::ZeroPid { offset });
    }
    Ok((pid, vpn))
}

/// Everything the simulator needs from the first scan of the trace
#[derive(Debug)]
pub struct FirstPass {
    pub index: IntervalIndex,
    pub processes: ProcessTable,
    /// Number of records in the trace
    pub records: u64,
}

/// Scan the whole trace once, closing an interval every time the pid
/// changes, and create one Runnable process per distinct pid in order of
/// first appearance. The reader is rewound afterwards.
pub fn first_pass<R: BufRead + Seek>(
    reader: &mut TraceReader<R>,
    order: QueueOrder,
) -> Result<FirstPass> {
    reader.rewind()?;

    let mut index = IntervalIndex::new();
    // (pid, first line, byte offset) of the run being read
    let mut run: Option<(Pid, u64, u64)> = None;
    let mut line = 0;

    while let Some(record) = reader.next_record()? {
        line += 1;
        match run {
            Some((pid, _, _)) if pid == record.pid => {}
            _ => {
                if let Some((pid, low, offset)) = run {
                    index.insert(pid, low, line - 1, offset);
                }
                run = Some((record.pid, line, record.offset));
            }
        }
    }
    let Some((pid, low, offset)) = run else {
        return Err(SimError::EmptyTrace);
    };
    index.insert(pid, low, line, offset);

    let mut pids: Vec<(u64, Pid)> = index
        .pids()
        .filter_map(|pid| index.first_line(pid).map(|first| (first, pid)))
        .collect();
    pids.sort_unstable();

    let mut processes = ProcessTable::new(order);
    for (_, pid) in pids {
        if let (Some(first), Some(last)) = (index.first_interval(pid), index.last_line(pid)) {
            processes.insert(Process::new(first, last));
        }
    }

    debug!(
        "first pass: {} records, {} processes",
        line,
        processes.process_count()
    );
    reader.rewind()?;

    Ok(FirstPass {
        index,
        processes,
        records: line,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::process::ProcessState;

    fn reader(text: &str) -> TraceReader<Cursor<Vec<u8>>> {
        TraceReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(parse_record("1 10", 0).unwrap(), (1, 10));
        assert_eq!(parse_record("  42\t7 ", 0).unwrap(), (42, 7));
    }

    #[test]
    fn test_parse_record_errors() {
        assert!(matches!(
            parse_record("1", 5),
            Err(SimError::MalformedRecord { offset: 5, .. })
        ));
        assert!(matches!(
            parse_record("1 2 3", 0),
            Err(SimError::MalformedRecord { .. })
        ));
        assert!(matches!(
            parse_record("a 2", 0),
            Err(SimError::MalformedRecord { .. })
        ));
        assert!(matches!(
            parse_record("1 -2", 0),
            Err(SimError::MalformedRecord { .. })
        ));
        assert!(matches!(parse_record("0 2", 9), Err(SimError::ZeroPid { offset: 9 })));
    }

    #[test]
    fn test_reader_tracks_offsets() {
        let mut r = reader("1 10\n22 3\n");
        let a = r.next_record().unwrap().unwrap();
        assert_eq!((a.pid, a.vpn, a.offset, a.next_offset), (1, 10, 0, 5));
        let b = r.next_record().unwrap().unwrap();
        assert_eq!((b.pid, b.vpn, b.offset, b.next_offset), (22, 3, 5, 10));
        assert_eq!(r.next_record().unwrap(), None);
        assert_eq!(r.position(), 10);
    }

    #[test]
    fn test_reader_seek_back() {
        let mut r = reader("1 10\n2 20\n3 30");
        r.next_record().unwrap();
        r.next_record().unwrap();
        r.seek(5).unwrap();
        let again = r.next_record().unwrap().unwrap();
        assert_eq!((again.pid, again.vpn), (2, 20));

        // Last line without trailing newline
        let last = r.next_record().unwrap().unwrap();
        assert_eq!((last.pid, last.vpn, last.next_offset), (3, 30, 14));
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let mut r = reader("\n1 1\n\n   \n2 2\n");
        assert_eq!(r.next_record().unwrap().unwrap().offset, 1);
        assert_eq!(r.next_record().unwrap().unwrap().offset, 10);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn test_first_pass_builds_intervals() {
        // lines: 1..=2 pid 1, 3 pid 2, 4..=5 pid 1
        let text = "1 1\n1 2\n2 9\n1 3\n1 4\n";
        let mut r = reader(text);
        let pass = first_pass(&mut r, QueueOrder::Arrival).unwrap();

        assert_eq!(pass.records, 5);
        let first = pass.index.first_interval(1).unwrap();
        assert_eq!((first.low, first.high, first.file_offset), (1, 2, 0));
        let second = pass.index.next_interval(&first).unwrap();
        assert_eq!((second.low, second.high, second.file_offset), (4, 5, 12));
        assert_eq!(pass.index.last_line(1), Some(5));

        let only = pass.index.first_interval(2).unwrap();
        assert_eq!((only.low, only.high, only.file_offset), (3, 3, 8));

        assert_eq!(
            pass.processes.queued(ProcessState::Runnable).collect::<Vec<_>>(),
            vec![1, 2]
        );
        let p1 = pass.processes.get(1).unwrap();
        assert_eq!((p1.first_line, p1.current_line, p1.last_line), (1, 1, 5));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_first_pass_orders_by_first_appearance() {
        let mut r = reader("9 1\n3 1\n9 2\n");
        let pass = first_pass(&mut r, QueueOrder::Arrival).unwrap();
        assert_eq!(
            pass.processes.queued(ProcessState::Runnable).collect::<Vec<_>>(),
            vec![9, 3]
        );
    }

    #[test]
    fn test_first_pass_empty_trace() {
        let mut r = reader("\n\n");
        assert!(matches!(
            first_pass(&mut r, QueueOrder::Arrival),
            Err(SimError::EmptyTrace)
        ));
    }

    #[test]
    fn test_first_pass_rejects_zero_pid() {
        let mut r = reader("1 1\n0 4\n");
        assert!(matches!(
            first_pass(&mut r, QueueOrder::Arrival),
            Err(SimError::ZeroPid { offset: 4 })
        ));
    }
}
