//! Compensated floating-point summation.

/// Neumaier's variant of Kahan summation: keeps a running compensation term
/// so long sums of mixed-magnitude values stay within a few ulps.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl Extend<f64> for NeumaierSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.add(v);
        }
    }
}

pub fn neumaier_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut acc = NeumaierSum::new();
    acc.extend(values);
    acc.total()
}
