use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::output::{write_summaries, Format};
use crate::table::{Accumulator, AggregationTable};

pub const CITIES: &[&str] = &[
    "New York", "Los Angeles", "Chicago", "Houston", "Phoenix",
    "London", "Manchester", "Birmingham", "Liverpool", "Edinburgh",
    "Paris", "Marseille", "Lyon", "Toulouse", "Nice",
    "Berlin", "Munich", "Frankfurt", "Hamburg", "Cologne",
    "Rome", "Milan", "Naples", "Turin", "Florence",
    "Madrid", "Barcelona", "Valencia", "Seville", "Bilbao",
    "Lisbon", "Porto", "Braga", "Faro", "Coimbra",
    "Tokyo", "Osaka", "Kyoto", "Nagoya", "Fukuoka",
    "Beijing", "Shanghai", "Shenzhen", "Guangzhou", "Chengdu",
    "Seoul", "Busan", "Incheon", "Daegu", "Daejeon",
    "Mumbai", "Delhi", "Bangalore", "Hyderabad", "Chennai",
    "Cairo", "Alexandria", "Giza", "Luxor", "Aswan",
    "Johannesburg", "Cape Town", "Durban", "Pretoria", "Port Elizabeth",
    "Sydney", "Melbourne", "Brisbane", "Perth", "Adelaide",
    "Toronto", "Vancouver", "Montreal", "Calgary", "Ottawa",
    "Mexico City", "Guadalajara", "Monterrey", "Puebla", "Cancún",
    "Buenos Aires", "Córdoba", "Rosario", "Mendoza", "La Plata",
    "São Paulo", "Rio de Janeiro", "Brasília", "Salvador", "Recife",
    "Moscow", "Saint Petersburg", "Novosibirsk", "Yekaterinburg", "Kazan",
    "Istanbul", "Ankara", "Izmir", "Antalya", "Bursa",
];

const CHUNK_SIZE: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Number of cities, taken from the front of [`CITIES`].
    pub cities: usize,
    /// Measurements per city.
    pub measurements: usize,
    pub start: f64,
    pub end: f64,
    pub seed: u64,
    /// Layout of the truth file.
    pub truth_format: Format,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            cities: CITIES.len(),
            measurements: 1_000_000,
            start: -10.0,
            end: 50.0,
            seed: 42,
            truth_format: Format { precision: None, ..Format::default() },
        }
    }
}

impl GenerateOptions {
    fn validate(&self) -> Result<()> {
        if self.cities == 0 || self.cities > CITIES.len() {
            return Err(Error::Config(format!(
                "city count must be between 1 and {}, got {}",
                CITIES.len(),
                self.cities
            )));
        }
        if !(self.start.is_finite() && self.end.is_finite() && self.start < self.end) {
            return Err(Error::Config(format!(
                "value range [{}, {}) is empty or not finite",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// A run of consecutive measurements of one city.
#[derive(Debug, Clone, Copy)]
struct Task {
    city: usize,
    chunk: usize,
    len: usize,
}

/// Every chunk draws from its own generator so the output does not depend
/// on how rayon schedules the work.
fn chunk_rng(seed: u64, task: &Task) -> StdRng {
    StdRng::seed_from_u64(seed ^ ((task.city as u64) << 40) ^ task.chunk as u64)
}

fn run_task(task: &Task, options: &GenerateOptions) -> io::Result<(Vec<u8>, Accumulator)> {
    let mut rng = chunk_rng(options.seed, task);
    let name = CITIES[task.city];
    let mut lines = Vec::with_capacity(task.len * (name.len() + 24));
    let mut acc = Accumulator::new();
    for _ in 0..task.len {
        let value: f64 = rng.gen_range(options.start..options.end);
        acc.update(value);
        writeln!(lines, "{name};{value}")?;
    }
    Ok((lines, acc))
}

fn tasks(options: &GenerateOptions) -> Vec<Task> {
    (0..options.cities)
        .flat_map(|city| {
            (0..options.measurements.div_ceil(CHUNK_SIZE)).map(move |chunk| Task {
                city,
                chunk,
                len: CHUNK_SIZE.min(options.measurements - chunk * CHUNK_SIZE),
            })
        })
        .collect()
}

/// Writes `city;value` sample lines grouped by city and a sorted truth
/// file `city;mean;min;max` computed from the written values.
///
/// Chunks are produced in parallel, one batch at a time, and written in
/// order. Returns the truth table.
pub fn generate<S, T>(samples: &mut S, truth: &mut T, options: &GenerateOptions) -> Result<AggregationTable>
where
    S: Write,
    T: Write,
{
    options.validate()?;
    let tasks = tasks(options);
    let batch_size = rayon::current_num_threads() * 4;
    info!(
        cities = options.cities,
        measurements = options.measurements,
        chunks = tasks.len(),
        "generating samples"
    );

    let mut table = AggregationTable::with_capacity(options.cities);
    for batch in tasks.chunks(batch_size) {
        let produced = batch
            .par_iter()
            .map(|task| run_task(task, options))
            .collect::<io::Result<Vec<_>>>()?;
        for (task, (lines, acc)) in batch.iter().zip(produced) {
            samples.write_all(&lines)?;
            table.merge(CITIES[task.city], &acc);
        }
        debug!(written = batch.len(), "batch done");
    }
    samples.flush()?;

    write_summaries(truth, table.finalize_sorted(), &options.truth_format)?;
    Ok(table)
}
