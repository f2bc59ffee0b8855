//! Pure evaluation rules: tracked-value stepping, gate combination and
//! container aggregation.
use crate::store::{Aggregation, GateRule, TrackPolicy};

/// Moves `tracked` toward `target` by at most `rate * dt`.
#[inline]
pub fn step_toward(tracked: f64, target: f64, rate: f64, dt: f64, policy: TrackPolicy) -> f64 {
    let gap = target - tracked;
    if gap == 0.0 || gap.is_nan() {
        return tracked;
    }
    let reach = rate * dt;
    match policy {
        TrackPolicy::Clamp => {
            if gap.abs() <= reach { target } else { tracked + reach.copysign(gap) }
        }
        TrackPolicy::Wrap => tracked + (gap.signum() * reach) % 1.0,
    }
}

#[inline]
fn digitize(value: f64, threshold: f64) -> bool {
    value >= threshold
}

#[inline]
fn level(bit: bool) -> f64 {
    if bit { 1.0 } else { 0.0 }
}

/// Combines a gate's tracked values. Missing slots read as `0.0`.
pub fn combine(rule: GateRule, tracked: &[f64], threshold: f64) -> f64 {
    let a = tracked.first().copied().unwrap_or(0.0);
    let b = tracked.get(1).copied().unwrap_or(0.0);
    let (x, y) = (digitize(a, threshold), digitize(b, threshold));

    match rule {
        GateRule::And => level(x && y),
        GateRule::Or => level(x || y),
        GateRule::Xor => level(x ^ y),
        GateRule::Nand => level(!(x && y)),
        GateRule::Nor => level(!(x || y)),
        GateRule::Xnor => level(x == y),
        GateRule::Not => level(!x),
        GateRule::Buffer => level(x),
        GateRule::Min => a.min(b),
        GateRule::Max => a.max(b),
        GateRule::Mean => (a + b) / 2.0,
        GateRule::Sum => a + b,
    }
}

/// Reduces the outputs of a container's terminal contents.
/// `Sink` is resolved by the caller and never reaches here.
pub fn reduce(aggregation: Aggregation, outputs: &[f64]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    match aggregation {
        Aggregation::Mean => outputs.iter().sum::<f64>() / outputs.len() as f64,
        Aggregation::Max => outputs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Min => outputs.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Sink(_) => outputs[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GateRule::And, 0.0, 0.0, 0.0)]
    #[case(GateRule::And, 1.0, 0.0, 0.0)]
    #[case(GateRule::And, 1.0, 1.0, 1.0)]
    #[case(GateRule::Or, 0.0, 0.0, 0.0)]
    #[case(GateRule::Or, 0.0, 1.0, 1.0)]
    #[case(GateRule::Xor, 1.0, 1.0, 0.0)]
    #[case(GateRule::Xor, 0.6, 0.2, 1.0)]
    #[case(GateRule::Nand, 1.0, 1.0, 0.0)]
    #[case(GateRule::Nand, 0.0, 1.0, 1.0)]
    #[case(GateRule::Nor, 0.0, 0.0, 1.0)]
    #[case(GateRule::Nor, 0.0, 0.9, 0.0)]
    #[case(GateRule::Xnor, 0.7, 0.8, 1.0)]
    #[case(GateRule::Xnor, 0.7, 0.1, 0.0)]
    #[case(GateRule::Not, 0.0, 1.0, 1.0)] // Second slot ignored
    #[case(GateRule::Not, 0.5, 0.0, 0.0)] // Threshold is inclusive
    #[case(GateRule::Buffer, 0.49, 0.0, 0.0)]
    #[case(GateRule::Min, 0.25, 0.75, 0.25)]
    #[case(GateRule::Max, 0.25, 0.75, 0.75)]
    #[case(GateRule::Mean, 0.25, 0.75, 0.5)]
    #[case(GateRule::Sum, 0.25, 0.5, 0.75)]
    fn test_gate_truth_tables(#[case] rule: GateRule, #[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        assert_eq!(combine(rule, &[a, b], 0.5), expected);
    }

    #[test]
    fn test_missing_inputs_read_low() {
        assert_eq!(combine(GateRule::Nor, &[], 0.5), 1.0);
        assert_eq!(combine(GateRule::Or, &[1.0], 0.5), 1.0);
        assert_eq!(combine(GateRule::And, &[1.0], 0.5), 0.0);
    }

    #[test]
    fn test_clamp_stops_on_target() {
        assert_eq!(step_toward(0.0, 1.0, 1.0, 0.3, TrackPolicy::Clamp), 0.3);
        assert_eq!(step_toward(0.9, 1.0, 1.0, 0.3, TrackPolicy::Clamp), 1.0);
        assert_eq!(step_toward(1.0, 0.0, 2.0, 0.25, TrackPolicy::Clamp), 0.5);
        assert_eq!(step_toward(0.4, 0.4, 5.0, 1.0, TrackPolicy::Clamp), 0.4);
    }

    #[test]
    fn test_wrap_overshoots_and_reduces_step_modulo_one() {
        let v = step_toward(0.9, 1.0, 1.0, 0.3, TrackPolicy::Wrap);
        assert!((v - 1.2).abs() < 1e-12);
        // A step of 1.25 only advances by 0.25.
        let w = step_toward(0.0, 5.0, 1.0, 1.25, TrackPolicy::Wrap);
        assert!((w - 0.25).abs() < 1e-12);
        // No movement when already on target.
        assert_eq!(step_toward(1.0, 1.0, 1.0, 0.3, TrackPolicy::Wrap), 1.0);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        for policy in [TrackPolicy::Clamp, TrackPolicy::Wrap] {
            assert_eq!(step_toward(0.2, 1.0, 3.0, 0.0, policy), 0.2);
        }
    }

    #[test]
    fn test_reductions() {
        assert_eq!(reduce(Aggregation::Mean, &[]), 0.0);
        assert_eq!(reduce(Aggregation::Mean, &[1.0, 0.0]), 0.5);
        assert_eq!(reduce(Aggregation::Max, &[0.2, 0.7, 0.1]), 0.7);
        assert_eq!(reduce(Aggregation::Min, &[0.2, 0.7, 0.1]), 0.1);
    }
}
