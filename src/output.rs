use std::io::Write;

use crate::parse::Separator;
use crate::table::Summary;

/// Layout of a summary line: `key;mean;min;max`.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    pub separator: Separator,
    /// Fixed decimal places; `None` prints the shortest form that parses
    /// back to the same value.
    pub precision: Option<usize>,
}

impl Default for Format {
    fn default() -> Self {
        Format {
            separator: Separator::default(),
            precision: Some(6),
        }
    }
}

pub fn write_summary<W: Write>(out: &mut W, summary: &Summary<'_>, format: &Format) -> std::io::Result<()> {
    let sep = format.separator;
    let Summary { key, mean, min, max, .. } = *summary;
    match format.precision {
        Some(prec) => writeln!(out, "{key}{sep}{mean:.prec$}{sep}{min:.prec$}{sep}{max:.prec$}"),
        None => writeln!(out, "{key}{sep}{mean}{sep}{min}{sep}{max}"),
    }
}

/// Writes every summary and flushes. Returns the number of lines written.
pub fn write_summaries<'a, W, I>(out: &mut W, summaries: I, format: &Format) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Summary<'a>>,
{
    let mut written = 0;
    for summary in summaries {
        write_summary(out, &summary, format)?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
