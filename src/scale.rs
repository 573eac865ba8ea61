//! Scales that turn traffic numbers into marker radius and colour bucket.

/// Square-root scale over `[domain_min, domain_max]` onto `range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqrtScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl SqrtScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    /// Maps `value`. A collapsed domain maps everything to the middle of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = (self.domain.0.sqrt(), self.domain.1.sqrt());
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 {
            0.5
        } else {
            (value.max(0.0).sqrt() - d0) / span
        };
        r0 + (r1 - r0) * t
    }
}

/// Maps a continuous domain onto a fixed set of buckets using uniform
/// thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeScale {
    domain: (f64, f64),
    buckets: Vec<f64>,
}

impl QuantizeScale {
    /// `buckets` must be non-empty.
    pub fn new(domain: (f64, f64), buckets: Vec<f64>) -> Self {
        Self { domain, buckets }
    }

    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    pub fn apply(&self, value: f64) -> f64 {
        let n = self.buckets.len();
        if n == 0 {
            return 0.0;
        }
        let (lo, hi) = self.domain;
        let step = (hi - lo) / n as f64;
        // a value sitting on a threshold belongs to the upper bucket
        let index = (1..n)
            .filter(|i| value >= lo + step * *i as f64)
            .count();
        self.buckets[index]
    }
}

impl Default for QuantizeScale {
    fn default() -> Self {
        Self::new((0.0, 1.0), vec![0.0, 0.5, 1.0])
    }
}
