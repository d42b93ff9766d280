use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use hashbrown::HashMap;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::parse::{trim_eol, Separator};

pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// One `key;mean;min;max` line of a summary file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expected {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Missing { key: String },
    Differs { key: String, mean: bool, min: bool, max: bool },
}

impl Mismatch {
    pub fn key(&self) -> &str {
        match self {
            Mismatch::Missing { key } | Mismatch::Differs { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub checked: usize,
    pub failures: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn parse_summary(line: &[u8], separator: &Separator) -> Option<(String, Expected)> {
    let line = std::str::from_utf8(line).ok()?;
    let mut fields = line.split(separator.as_char());
    let key = fields.next()?;
    let mut value = || fields.next().and_then(|f| fast_float::parse::<f64, _>(f).ok());
    let expected = Expected { mean: value()?, min: value()?, max: value()? };
    if fields.next().is_some() {
        return None;
    }
    Some((key.to_string(), expected))
}

/// Reads a summary file. `path` is only used in error messages.
pub fn read_summaries<R: BufRead>(mut reader: R, path: &Path, separator: &Separator) -> Result<HashMap<String, Expected>> {
    let mut summaries = HashMap::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = trim_eol(&buf);
        if line.is_empty() {
            continue;
        }
        let (key, expected) = parse_summary(line, separator).ok_or_else(|| Error::Summary {
            path: path.to_path_buf(),
            line_no,
            line: String::from_utf8_lossy(line).into_owned(),
        })?;
        summaries.insert(key, expected);
    }
    Ok(summaries)
}

fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Checks every truth key, in key order, against the calculated results
/// using an absolute tolerance. Keys only present in `calculated` are
/// ignored.
pub fn verify(truth: &HashMap<String, Expected>, calculated: &HashMap<String, Expected>, tolerance: f64) -> VerifyReport {
    let mut keys = truth.keys().collect::<Vec<_>>();
    keys.sort_unstable();

    let mut report = VerifyReport::default();
    for key in keys {
        report.checked += 1;
        let want = &truth[key];
        let Some(got) = calculated.get(key) else {
            warn!(%key, "missing from calculated results");
            report.failures.push(Mismatch::Missing { key: key.clone() });
            continue;
        };
        let mean = is_close(want.mean, got.mean, tolerance);
        let min = is_close(want.min, got.min, tolerance);
        let max = is_close(want.max, got.max, tolerance);
        if !(mean && min && max) {
            warn!(%key, mean, min, max, "values differ");
            report.failures.push(Mismatch::Differs { key: key.clone(), mean, min, max });
        }
    }
    info!(checked = report.checked, failed = report.failures.len(), "verification finished");
    report
}

pub fn verify_files(truth: &Path, calculated: &Path, separator: &Separator, tolerance: f64) -> Result<VerifyReport> {
    let open = |path: &Path| -> Result<HashMap<String, Expected>> {
        let file = File::open(path).map_err(|source| Error::Open { path: path.to_path_buf(), source })?;
        read_summaries(BufReader::new(file), path, separator)
    };
    Ok(verify(&open(truth)?, &open(calculated)?, tolerance))
}
