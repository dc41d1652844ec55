//! Gradient clipping utilities

use crate::models::Parameter;

/// Clip gradients by global norm
///
/// Computes the global norm of all gradients and scales them down if the norm
/// exceeds `max_norm`. Relative magnitudes across parameters are preserved.
///
/// Returns the global norm before clipping. A non-finite norm leaves the
/// gradients untouched.
pub fn clip_grad_norm(params: &mut [&mut Parameter], max_norm: f32) -> f32 {
    let total_norm_sq: f32 = params.iter().map(|p| p.grad().iter().map(|&g| g * g).sum::<f32>()).sum();
    let global_norm = total_norm_sq.sqrt();

    if global_norm.is_finite() && global_norm > max_norm {
        let clip_coef = max_norm / (global_norm + 1e-6);
        for param in params.iter_mut() {
            *param.grad_mut() *= clip_coef;
        }
    }

    global_norm
}
