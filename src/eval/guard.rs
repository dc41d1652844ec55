//! Regression guard for benchmark scores

use tracing::info;

/// Allowed shortfall (in score points) below the expected value
pub const REGRESSION_TOLERANCE: f32 = 0.1;

/// `score > expected || |score - expected| < REGRESSION_TOLERANCE`
pub fn passes_regression_guard(score: f32, expected: f32) -> bool {
    score > expected || (score - expected).abs() < REGRESSION_TOLERANCE
}

/// A benchmark score compared against its expected value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    /// Measured score (correlation x 100)
    pub score: f32,
    /// Expected score
    pub expected: f32,
}

impl ScoreReport {
    /// Scale a raw correlation by 100 and pair it with the expectation
    pub fn from_correlation(correlation: f32, expected: f32) -> Self {
        Self { score: correlation * 100.0, expected }
    }

    /// Whether the score passes the regression guard
    pub fn passes(&self) -> bool {
        passes_regression_guard(self.score, self.expected)
    }

    /// Log the comparison and return [`Self::passes`]
    pub fn log(&self) -> bool {
        info!("STS-Test Performance: {:.2} vs. exp: {:.2}", self.score, self.expected);
        self.passes()
    }
}

impl std::fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "STS-Test Performance: {:.2} vs. exp: {:.2}", self.score, self.expected)
    }
}
