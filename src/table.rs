use hashbrown::HashMap;

/// Running statistics of one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Accumulator {
    pub const fn new() -> Self {
        Accumulator {
            count: 0,
            sum: 0.,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    #[inline]
    pub fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    /// Folds a partial accumulator of the same key into this one.
    pub fn merge(&mut self, other: &Accumulator) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator::new()
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        for value in iter {
            acc.update(value);
        }
        acc
    }
}

/// Finalized result of one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary<'a> {
    pub key: &'a str,
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// One accumulator per distinct key, compared byte for byte.
#[derive(Debug, Default)]
pub struct AggregationTable {
    entries: HashMap<String, Accumulator, ahash::RandomState>,
}

impl AggregationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        AggregationTable {
            entries: HashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
        }
    }

    /// Records one observation. The key is only copied the first time it
    /// is seen.
    #[inline]
    pub fn update(&mut self, key: &str, value: f64) {
        self.entries
            .entry_ref(key)
            .or_insert_with(Accumulator::new)
            .update(value);
    }

    /// Folds a partial accumulator into the entry for `key`.
    pub fn merge(&mut self, key: &str, partial: &Accumulator) {
        self.entries
            .entry_ref(key)
            .or_insert_with(Accumulator::new)
            .merge(partial);
    }

    pub fn get(&self, key: &str) -> Option<&Accumulator> {
        self.entries.get(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Results in hash order. Nothing is mutated; the mean is derived here.
    pub fn finalize(&self) -> impl Iterator<Item = Summary<'_>> + '_ {
        self.entries.iter().filter_map(|(key, acc)| {
            acc.mean().map(|mean| Summary {
                key: key.as_str(),
                count: acc.count,
                mean,
                min: acc.min,
                max: acc.max,
            })
        })
    }

    /// Results ordered by key bytes.
    pub fn finalize_sorted(&self) -> Vec<Summary<'_>> {
        let mut summaries = self.finalize().collect::<Vec<_>>();
        summaries.sort_unstable_by(|a, b| a.key.cmp(b.key));
        summaries
    }
}
