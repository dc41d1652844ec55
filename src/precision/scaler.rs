//! Gradient scaler for mixed-precision training.

use serde::{Deserialize, Serialize};

/// Default initial loss scale (2^16)
const DEFAULT_INITIAL_SCALE: f32 = 65536.0;

/// Default number of successful steps before the loss scale is increased
const DEFAULT_SCALE_GROWTH_INTERVAL: usize = 2000;

/// Persistable scaler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    /// Current loss scale
    pub scale: f32,
    /// Growth factor
    pub growth_factor: f32,
    /// Backoff factor
    pub backoff_factor: f32,
    /// Growth interval
    pub growth_interval: usize,
    /// Successful steps since the last scale change
    pub steps_since_growth: usize,
}

/// Gradient scaler for mixed-precision training
///
/// Handles loss scaling to prevent gradient underflow in fp16 training.
/// A disabled scaler has scale 1 and never reports overflow-driven changes.
#[derive(Debug, Clone)]
pub struct GradScaler {
    scale: f32,
    growth_factor: f32,
    backoff_factor: f32,
    growth_interval: usize,
    steps_since_growth: usize,
    enabled: bool,
    overflow_count: usize,
}

impl GradScaler {
    /// Create a new enabled scaler
    pub fn new(initial_scale: f32) -> Self {
        Self {
            scale: initial_scale,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            steps_since_growth: 0,
            enabled: true,
            overflow_count: 0,
        }
    }

    /// Scaler that leaves losses and gradients untouched
    pub fn disabled() -> Self {
        Self { scale: 1.0, enabled: false, ..Self::new(1.0) }
    }

    /// Enabled with default settings when `enabled`, otherwise disabled
    pub fn for_amp(enabled: bool) -> Self {
        if enabled {
            Self::default()
        } else {
            Self::disabled()
        }
    }

    /// Set growth interval
    #[must_use]
    pub fn with_growth_interval(mut self, interval: usize) -> Self {
        self.growth_interval = interval.max(1);
        self
    }

    /// Get current scale
    pub fn scale(&self) -> f32 {
        if self.enabled {
            self.scale
        } else {
            1.0
        }
    }

    /// Whether loss scaling is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Unscale gradients in place and check for overflow
    ///
    /// Returns true if gradients are valid (no overflow), false otherwise.
    pub fn unscale_and_check(&self, grads: &mut [f32]) -> bool {
        let inv_scale = 1.0 / self.scale();
        let mut valid = true;
        for grad in grads.iter_mut() {
            *grad *= inv_scale;
            if !grad.is_finite() {
                valid = false;
            }
        }
        valid
    }

    /// Update the scale after a step.
    ///
    /// Returns `true` when the scale was reduced, which means the optimizer
    /// step was skipped and the learning-rate schedule must not advance.
    pub fn update(&mut self, grads_valid: bool) -> bool {
        if !self.enabled {
            return false;
        }

        if grads_valid {
            self.steps_since_growth += 1;
            if self.steps_since_growth >= self.growth_interval {
                self.scale *= self.growth_factor;
                self.steps_since_growth = 0;
            }
            false
        } else {
            self.overflow_count += 1;
            self.scale = (self.scale * self.backoff_factor).max(1.0);
            self.steps_since_growth = 0;
            true
        }
    }

    /// Overflows seen since construction
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    /// Snapshot for checkpointing
    pub fn state(&self) -> ScalerState {
        ScalerState {
            scale: self.scale,
            growth_factor: self.growth_factor,
            backoff_factor: self.backoff_factor,
            growth_interval: self.growth_interval,
            steps_since_growth: self.steps_since_growth,
        }
    }

    /// Restore a checkpointed state. Has no effect on a disabled scaler.
    pub fn load_state(&mut self, state: &ScalerState) {
        if !self.enabled {
            return;
        }
        self.scale = state.scale;
        self.growth_factor = state.growth_factor;
        self.backoff_factor = state.backoff_factor;
        self.growth_interval = state.growth_interval.max(1);
        self.steps_since_growth = state.steps_since_growth;
    }
}

impl Default for GradScaler {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscale_and_check() {
        let scaler = GradScaler::new(4.0);
        let mut grads = vec![4.0, 8.0];
        assert!(scaler.unscale_and_check(&mut grads));
        assert_eq!(grads, vec![1.0, 2.0]);

        let mut bad = vec![f32::INFINITY, 1.0];
        assert!(!scaler.unscale_and_check(&mut bad));
    }

    #[test]
    fn test_overflow_backs_off_and_reports_skip() {
        let mut scaler = GradScaler::new(1024.0);
        assert!(scaler.update(false));
        assert_eq!(scaler.scale(), 512.0);
        assert_eq!(scaler.overflow_count(), 1);
        assert!(!scaler.update(true));
    }

    #[test]
    fn test_growth_after_interval() {
        let mut scaler = GradScaler::new(2.0).with_growth_interval(3);
        for _ in 0..3 {
            scaler.update(true);
        }
        assert_eq!(scaler.scale(), 4.0);
    }

    #[test]
    fn test_scale_floor() {
        let mut scaler = GradScaler::new(1.0);
        scaler.update(false);
        assert_eq!(scaler.scale(), 1.0);
    }

    #[test]
    fn test_disabled_scaler_is_inert() {
        let mut scaler = GradScaler::disabled();
        assert_eq!(scaler.scale(), 1.0);
        assert!(!scaler.update(false));
        assert_eq!(scaler.overflow_count(), 0);
    }

    #[test]
    fn test_state_restore() {
        let mut a = GradScaler::new(8.0).with_growth_interval(10);
        a.update(true);
        let state = a.state();
        let mut b = GradScaler::default();
        b.load_state(&state);
        assert_eq!(b.state(), state);
    }
}
