use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use groupstat::generate::{generate, GenerateOptions, CITIES};
use groupstat::verify::{verify_files, Mismatch, DEFAULT_TOLERANCE};
use groupstat::{aggregate_file, aggregate_reader, write_summaries, Format, MalformedPolicy, Options, Separator};

#[derive(Parser)]
#[command(name = "groupstat")]
#[command(version)]
#[command(about = "Per-key count, min, max and mean of key;value lines", long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug). RUST_LOG overrides this
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an input file, or stdin when the input is "-"
    Aggregate {
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Character between key and value, also used in the output
        #[arg(short, long, default_value_t = ';', env = "GROUPSTAT_SEPARATOR")]
        separator: char,

        /// What to do with lines that do not parse: skip or abort
        #[arg(long, default_value = "skip", env = "GROUPSTAT_ON_MALFORMED")]
        on_malformed: MalformedPolicy,

        /// Decimal places of mean, min and max
        #[arg(short, long, default_value_t = 6)]
        precision: usize,

        /// Keep hash order instead of sorting by key
        #[arg(long)]
        unsorted: bool,
    },

    /// Write a random sample file and its truth summary
    Generate {
        #[arg(long, default_value = "test_sample.txt")]
        samples: PathBuf,

        #[arg(long, default_value = "test_sample_results_truth.txt")]
        truth: PathBuf,

        /// Number of cities
        #[arg(long, default_value_t = CITIES.len())]
        cities: usize,

        /// Measurements per city
        #[arg(short, long, default_value_t = 1_000_000)]
        measurements: usize,

        #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
        start: f64,

        #[arg(long, default_value_t = 50.0, allow_negative_numbers = true)]
        end: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Compare calculated results against a truth file
    Verify {
        #[arg(long, default_value = "test_sample_results_truth.txt")]
        truth: PathBuf,

        #[arg(long, default_value = "test_sample_results_calculated.txt")]
        calculated: PathBuf,

        #[arg(short, long, default_value_t = ';', env = "GROUPSTAT_SEPARATOR")]
        separator: char,

        /// Absolute tolerance for mean, min and max
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::with_capacity(1 << 20, file))
}

fn timeit<T, F: FnOnce() -> T>(f: F) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Aggregate { input, output, separator, on_malformed, precision, unsorted } => {
            let options = Options { separator: Separator::new(separator), policy: on_malformed };
            let (result, elapsed) = timeit(|| {
                if input.as_os_str() == "-" {
                    aggregate_reader(io::stdin().lock(), options)
                } else {
                    aggregate_file(&input, options)
                }
            });
            let (table, report) = result.with_context(|| format!("aggregating {}", input.display()))?;
            info!(?elapsed, skipped = report.skipped, "input consumed");

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(create(path)?),
                None => Box::new(io::stdout().lock()),
            };
            let format = Format { separator: options.separator, precision: Some(precision) };
            let written = if unsorted {
                write_summaries(&mut out, table.finalize(), &format)
            } else {
                write_summaries(&mut out, table.finalize_sorted(), &format)
            }
            .context("writing results")?;
            info!(written, "results written");
        }
        Commands::Generate { samples, truth, cities, measurements, start, end, seed } => {
            let options = GenerateOptions {
                cities,
                measurements,
                start,
                end,
                seed,
                ..GenerateOptions::default()
            };
            let mut samples_out = create(&samples)?;
            let mut truth_out = create(&truth)?;
            let (result, elapsed) = timeit(|| generate(&mut samples_out, &mut truth_out, &options));
            let table = result.context("generating samples")?;
            truth_out.flush()?;
            info!(?elapsed, keys = table.len(), samples = %samples.display(), truth = %truth.display(), "samples written");
        }
        Commands::Verify { truth, calculated, separator, tolerance } => {
            let report = verify_files(&truth, &calculated, &Separator::new(separator), tolerance)?;
            for failure in &report.failures {
                match failure {
                    Mismatch::Missing { key } => println!("Failed:: city: {key}; missing"),
                    Mismatch::Differs { key, mean, min, max } => {
                        println!("Failed:: city: {key}; mean: {mean}; min: {min}; max: {max}")
                    }
                }
            }
            if !report.is_success() {
                println!("Fail");
                return Ok(ExitCode::FAILURE);
            }
            println!("Success");
        }
    }
    Ok(ExitCode::SUCCESS)
}
