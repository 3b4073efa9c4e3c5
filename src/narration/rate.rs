use serde::{Serialize, Deserialize};

/// Supported narration speeds, in cycle order
pub const RATES: [f32; 5] = [1.0, 1.25, 1.5, 2.0, 0.75];

/// Narration speed, always one of [`RATES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rate(usize);

impl Rate {
    pub fn value(self) -> f32 {
        RATES[self.0]
    }

    /// Next speed in the cycle, wrapping after the last
    pub fn next(self) -> Self {
        Self((self.0 + 1) % RATES.len())
    }

    /// Nearest supported speed
    pub fn from_value(value: f32) -> Self {
        let index = RATES
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - value)
                    .abs()
                    .partial_cmp(&(*b - value).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        Self(index)
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.value())
    }
}
