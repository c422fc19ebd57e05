/// Absorbs f64 rounding for deltas that land on the band edge.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Minimum-change filter: a value only counts as changed once it moves by
/// strictly more than `epsilon`.
#[derive(Debug, Clone, Copy)]
pub struct DeadBand {
    epsilon: f64,
}

impl DeadBand {
    pub const fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn exceeds(&self, previous: f64, next: f64) -> bool {
        (next - previous).abs() - self.epsilon > EDGE_TOLERANCE
    }
}
