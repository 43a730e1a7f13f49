//! FILENAME: engine/src/aggregate.rs
//! Running accumulator shared by group headers and the pivot engine.

/// Accumulates the statistics a bucket of values needs.
/// `count` counts every value offered, `count_numbers` only the numeric ones.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateAccumulator {
    pub sum: f64,
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        AggregateAccumulator::default()
    }

    /// Offers one value; `None` only bumps `count`.
    pub fn add(&mut self, value: Option<f64>) {
        match value {
            Some(v) if !v.is_nan() => self.add_number(v),
            _ => self.add_non_number(),
        }
    }

    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    pub fn has_numbers(&self) -> bool {
        self.count_numbers > 0
    }

    pub fn average(&self) -> Option<f64> {
        if self.count_numbers > 0 {
            Some(self.sum / self.count_numbers as f64)
        } else {
            None
        }
    }

    /// Merges another accumulator into this one.
    pub fn merge(&mut self, other: &AggregateAccumulator) {
        if other.count == 0 {
            return;
        }
        self.sum += other.sum;
        self.count += other.count;
        self.count_numbers += other.count_numbers;
        if let Some(other_min) = other.min {
            self.min = Some(self.min.map_or(other_min, |m| m.min(other_min)));
        }
        if let Some(other_max) = other.max {
            self.max = Some(self.max.map_or(other_max, |m| m.max(other_max)));
        }
    }
}

impl FromIterator<Option<f64>> for AggregateAccumulator {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        let mut acc = AggregateAccumulator::new();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}
