//! Tests for learning rate schedulers

use super::*;
use crate::optim::{Optimizer, SGD};
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

fn at(kind: ScheduleKind, step: usize) -> f32 {
    let mut s = WarmupScheduler::new(kind, 1.0, 10, 110);
    for _ in 0..step {
        s.step();
    }
    s.get_lr()
}

#[test]
fn test_warmup_starts_at_zero() {
    assert_eq!(at(ScheduleKind::WarmupLinear, 0), 0.0);
    assert_abs_diff_eq!(at(ScheduleKind::WarmupLinear, 5), 0.5);
    assert_abs_diff_eq!(at(ScheduleKind::WarmupConstant, 5), 0.5);
}

#[test]
fn test_constant_ignores_warmup() {
    assert_eq!(at(ScheduleKind::ConstantLr, 0), 1.0);
    assert_eq!(at(ScheduleKind::ConstantLr, 500), 1.0);
}

#[test]
fn test_linear_decay() {
    assert_abs_diff_eq!(at(ScheduleKind::WarmupLinear, 10), 1.0);
    assert_abs_diff_eq!(at(ScheduleKind::WarmupLinear, 60), 0.5);
    assert_eq!(at(ScheduleKind::WarmupLinear, 110), 0.0);
    assert_eq!(at(ScheduleKind::WarmupLinear, 200), 0.0);
}

#[test]
fn test_cosine_midpoint() {
    assert_abs_diff_eq!(at(ScheduleKind::WarmupCosine, 60), 0.5, epsilon = 1e-5);
    assert_abs_diff_eq!(at(ScheduleKind::WarmupCosine, 110), 0.0, epsilon = 1e-6);
}

#[test]
fn test_hard_restarts_end_at_zero() {
    assert_abs_diff_eq!(at(ScheduleKind::WarmupCosineWithHardRestarts, 10), 1.0, epsilon = 1e-6);
    assert_eq!(at(ScheduleKind::WarmupCosineWithHardRestarts, 110), 0.0);
}

#[test]
fn test_zero_warmup_starts_at_base() {
    let s = WarmupScheduler::new(ScheduleKind::WarmupLinear, 2e-5, 0, 10);
    assert_abs_diff_eq!(s.get_lr(), 2e-5);
}

#[test]
fn test_resume_keeps_step_and_new_horizon() {
    let mut first = WarmupScheduler::new(ScheduleKind::WarmupLinear, 1.0, 2, 5);
    for _ in 0..5 {
        first.step();
    }
    let mut second = WarmupScheduler::new(ScheduleKind::WarmupLinear, 0.5, 2, 10);
    second.load_state(&first.state());
    assert_eq!(second.current_step(), 5);
    assert_abs_diff_eq!(second.get_lr(), 5.0 / 8.0);
}

#[test]
fn test_apply_sets_optimizer_lr() {
    let mut s = WarmupScheduler::new(ScheduleKind::WarmupConstant, 0.1, 4, 8);
    s.step();
    let mut opt = SGD::new(1.0, 0.0);
    s.apply(&mut opt);
    assert_abs_diff_eq!(opt.lr(), 0.025);
}

#[test]
fn test_kind_names_parse_back() {
    for kind in [
        ScheduleKind::ConstantLr,
        ScheduleKind::WarmupConstant,
        ScheduleKind::WarmupLinear,
        ScheduleKind::WarmupCosine,
        ScheduleKind::WarmupCosineWithHardRestarts,
    ] {
        assert_eq!(kind.name().parse::<ScheduleKind>().unwrap(), kind);
        let yaml = serde_yaml::to_string(&kind).unwrap();
        assert_eq!(yaml.trim(), kind.name());
    }
    assert!("linear".parse::<ScheduleKind>().is_err());
}

proptest! {
    #[test]
    fn prop_lr_within_zero_and_base(
        kind_idx in 0usize..5,
        warmup in 0usize..50,
        total in 0usize..200,
        step in 0usize..400,
    ) {
        let kind = [
            ScheduleKind::ConstantLr,
            ScheduleKind::WarmupConstant,
            ScheduleKind::WarmupLinear,
            ScheduleKind::WarmupCosine,
            ScheduleKind::WarmupCosineWithHardRestarts,
        ][kind_idx];
        let mut s = WarmupScheduler::new(kind, 3e-5, warmup, total);
        for _ in 0..step {
            s.step();
        }
        let lr = s.get_lr();
        prop_assert!(lr >= 0.0);
        prop_assert!(lr <= 3e-5 * (1.0 + 1e-5));
    }
}
