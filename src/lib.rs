//! Single-pass per-key summaries (count, min, max, mean) of `key;value`
//! lines.

pub mod error;
pub mod generate;
pub mod output;
pub mod parse;
pub mod reader;
pub mod table;
pub mod verify;

pub use error::{Error, ParseError, Result};
pub use output::{write_summaries, Format};
pub use parse::{parse_line, Separator};
pub use reader::{aggregate_bytes, aggregate_file, aggregate_reader, Aggregator, MalformedPolicy, Options, Report};
pub use table::{Accumulator, AggregationTable, Summary};
