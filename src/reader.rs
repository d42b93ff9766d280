use std::fs::File;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::parse::{parse_line, trim_eol, Separator};
use crate::table::AggregationTable;

/// What to do with a line that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Drop the line with a warning and keep going.
    #[default]
    Skip,
    /// Stop the run at the first malformed line.
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" => Ok(MalformedPolicy::Abort),
            other => Err(format!("unknown policy {other:?}, expected skip or abort")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub separator: Separator,
    pub policy: MalformedPolicy,
}

/// Line counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub lines: u64,
    pub accepted: u64,
    pub skipped: u64,
}

/// Feeds raw lines into a table, applying the malformed-line policy.
#[derive(Debug)]
pub struct Aggregator {
    table: AggregationTable,
    options: Options,
    report: Report,
}

impl Aggregator {
    pub fn new(options: Options) -> Self {
        debug!(separator = %options.separator, policy = ?options.policy, "starting aggregation");
        Aggregator {
            table: AggregationTable::new(),
            options,
            report: Report::default(),
        }
    }

    /// Handles one line, with or without its terminator. Blank lines are
    /// not observations and are ignored.
    pub fn feed(&mut self, line: &[u8]) -> Result<()> {
        let line = trim_eol(line);
        self.report.lines += 1;
        if line.is_empty() {
            return Ok(());
        }
        match parse_line(line, &self.options.separator) {
            Ok((key, value)) => {
                self.table.update(key, value);
                self.report.accepted += 1;
                Ok(())
            }
            Err(reason) => {
                let line_no = self.report.lines;
                let line = String::from_utf8_lossy(line).into_owned();
                match self.options.policy {
                    MalformedPolicy::Skip => {
                        warn!(line_no, %line, %reason, "skipping malformed line");
                        self.report.skipped += 1;
                        Ok(())
                    }
                    MalformedPolicy::Abort => Err(Error::Malformed { line_no, line, reason }),
                }
            }
        }
    }

    pub fn finish(self) -> (AggregationTable, Report) {
        info!(
            lines = self.report.lines,
            accepted = self.report.accepted,
            skipped = self.report.skipped,
            keys = self.table.len(),
            "aggregation finished"
        );
        (self.table, self.report)
    }
}

/// Iterates the lines of an in-memory buffer, terminators excluded. A
/// trailing unterminated line is still yielded.
pub struct Lines<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Lines<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Lines { data, offset: 0 }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let start = self.offset;
        let end = memchr::memchr(b'\n', &self.data[start..])
            .map(|pos| start + pos)
            .unwrap_or(self.data.len());
        self.offset = end + 1;
        Some(&self.data[start..end])
    }
}

pub fn aggregate_bytes(data: &[u8], options: Options) -> Result<(AggregationTable, Report)> {
    let mut aggregator = Aggregator::new(options);
    for line in Lines::new(data) {
        aggregator.feed(line)?;
    }
    Ok(aggregator.finish())
}

/// Aggregates a file through a read-only memory map.
pub fn aggregate_file(path: &Path, options: Options) -> Result<(AggregationTable, Report)> {
    let open_err = |source| Error::Open { path: path.to_path_buf(), source };
    let file = File::open(path).map_err(open_err)?;
    if file.metadata().map_err(open_err)?.len() == 0 {
        return aggregate_bytes(&[], options);
    }
    // SAFETY: the map is read-only and dropped before returning; the input
    // file is not expected to be modified while a run is in progress.
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(open_err)?;
    aggregate_bytes(&mmap, options)
}

/// Aggregates any buffered source, e.g. standard input.
pub fn aggregate_reader<R: BufRead>(mut reader: R, options: Options) -> Result<(AggregationTable, Report)> {
    let mut aggregator = Aggregator::new(options);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        aggregator.feed(&buf)?;
    }
    Ok(aggregator.finish())
}
