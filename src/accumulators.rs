//! Running statistics used by the metric engine

/// Product beyond which the running product is flushed to the log sum.
const PRODUCT_UPPER_BOUND: f64 = 1e16;
/// Product below which the running product is flushed to the log sum.
const PRODUCT_LOWER_BOUND: f64 = 1e-16;

/// Geometric mean accumulator.
///
/// Multiplies values into a running product and moves it into a log-domain
/// sum whenever it leaves `[1e-16, 1e16]`, so that long sequences of large or
/// small ratios neither overflow nor underflow.
#[derive(Debug, Clone)]
pub struct GeometricMean {
    product: f64,
    product_log_sum: f64,
    count: usize,
}

impl Default for GeometricMean {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometricMean {
    pub fn new() -> Self {
        Self {
            product: 1.0,
            product_log_sum: 0.0,
            count: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.product *= value;
        if self.product > PRODUCT_UPPER_BOUND || self.product < PRODUCT_LOWER_BOUND {
            self.product_log_sum += self.product.ln();
            self.product = 1.0;
        }
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Natural logarithm of the geometric mean, 0 when empty.
    pub fn get_log(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.product_log_sum + self.product.ln()) / self.count as f64
    }

    /// The geometric mean, 1 when empty.
    pub fn get(&self) -> f64 {
        if self.count == 0 {
            return 1.0;
        }
        self.get_log().exp()
    }
}

/// Nearest-rank quantile over every added value.
#[derive(Debug, Clone, Default)]
pub struct Quantile {
    values: Vec<f64>,
    sorted: bool,
}

impl Quantile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.values.push(value);
        self.sorted = false;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element at `floor((n - 1) * q)` of the sorted values, 0 when empty.
    pub fn get(&mut self, quantile: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        if !self.sorted {
            self.values.sort_by(|a, b| a.total_cmp(b));
            self.sorted = true;
        }
        let last = self.values.len() - 1;
        let index = ((last as f64) * quantile.clamp(0.0, 1.0)).floor() as usize;
        self.values[index.min(last)]
    }
}
