//! Correlation measures computed from aggregate counts and sums.
//!
//! The feature discovery engine accumulates co-activation counts and error
//! sums over a large number of decision/action cases and only afterwards
//! turns them into correlation estimates. All functions in this module
//! therefore operate on aggregates rather than raw observation vectors,
//! which keeps the accumulation pass allocation-free.
//!
//! Three measures are provided:
//!
//! - [`point_biserial`]: correlation between a binary indicator (e.g. "this
//!   feature pair was active for the case") and a continuous variable (the
//!   policy's prediction error at the case)
//! - [`phi`]: correlation between two binary indicators where one implies
//!   the other (a compound feature and one of its constituents)
//! - [`fisher_confidence_interval`]: a confidence interval for an observed
//!   correlation via the Fisher r-to-z transform
//!
//! Degenerate inputs (zero variance, empty groups) produce non-finite or
//! `NaN` results rather than panicking; callers are expected to discard
//! non-finite scores as statistically meaningless.

/// Point-biserial correlation between a binary indicator and a continuous
/// variable, from aggregate sums.
///
/// # Arguments
///
/// * `sum_active` - Sum of the continuous variable over cases where the
///   indicator is active
/// * `n_active` - Number of cases where the indicator is active
/// * `sum_all` - Sum of the continuous variable over all cases
/// * `sum_sq_all` - Sum of squares of the continuous variable over all cases
/// * `n` - Total number of cases
///
/// # Returns
///
/// The correlation in `[-1, 1]`, or a non-finite value when the indicator
/// or the variable has zero variance.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn point_biserial(sum_active: f32, n_active: u32, sum_all: f32, sum_sq_all: f32, n: u32) -> f32 {
    let n_f = n as f32;
    let n_active_f = n_active as f32;
    let n_inactive_f = (n - n_active) as f32;

    let mean_active = sum_active / n_active_f;
    let mean_inactive = (sum_all - sum_active) / n_inactive_f;
    let mean_all = sum_all / n_f;
    let variance = sum_sq_all / n_f - mean_all * mean_all;
    let std_dev = variance.sqrt();

    let p = n_active_f / n_f;
    let q = 1.0 - p;
    (mean_active - mean_inactive) / std_dev * (p * q).sqrt()
}

/// Phi coefficient between two binary indicators from their activation
/// counts, where the first indicator implies the second.
///
/// This is the special case needed when correlating a compound feature with
/// one of its constituents: every case where the compound is active also has
/// the constituent active, so the joint count equals the compound's count.
///
/// # Arguments
///
/// * `n_joint` - Number of cases where both indicators are active
/// * `n_a` - Number of cases where the first indicator is active
/// * `n_b` - Number of cases where the second indicator is active
/// * `n` - Total number of cases
///
/// # Returns
///
/// The correlation in `[-1, 1]`, or a non-finite value when either
/// indicator is constant across all cases.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn phi(n_joint: u32, n_a: u32, n_b: u32, n: u32) -> f32 {
    let n_f = n as f32;
    let n_joint_f = n_joint as f32;
    let n_a_f = n_a as f32;
    let n_b_f = n_b as f32;

    let numerator = n_f * n_joint_f - n_a_f * n_b_f;
    let denominator = (n_a_f * (n_f - n_a_f) * n_b_f * (n_f - n_b_f)).sqrt();
    numerator / denominator
}

/// Fisher r-to-z transform: `z = atanh(r)`.
///
/// # Examples
///
/// ```
/// # use exion_stats::correlation::fisher_z;
/// assert_eq!(fisher_z(0.0), 0.0);
/// assert!((fisher_z(0.5) - 0.5493).abs() < 1e-4);
/// ```
#[must_use]
pub fn fisher_z(r: f32) -> f32 {
    r.atanh()
}

/// Confidence interval for an observed correlation `r` over `n` cases at
/// the given critical value (e.g. `1.96` for 95% confidence).
///
/// The interval is computed in Fisher z-space (`z ± critical / sqrt(n - 3)`)
/// and transformed back with `tanh`, so both bounds stay in `(-1, 1)`.
///
/// # Returns
///
/// `(lower, upper)` bounds. Non-finite when `n <= 3` or `|r| >= 1`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn fisher_confidence_interval(r: f32, n: u32, critical_value: f32) -> (f32, f32) {
    let z = fisher_z(r);
    let half_width = critical_value / ((n as f32) - 3.0).sqrt();
    ((z - half_width).tanh(), (z + half_width).tanh())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_biserial_positive_association() {
        // errors [1, 2, 3, 4]; indicator active on the two largest
        let r = point_biserial(7.0, 2, 10.0, 30.0, 4);
        assert!((r - 0.894).abs() < 1e-3);
    }

    #[test]
    fn point_biserial_negative_association() {
        // same data, indicator active on the two smallest
        let r = point_biserial(3.0, 2, 10.0, 30.0, 4);
        assert!((r + 0.894).abs() < 1e-3);
    }

    #[test]
    fn point_biserial_zero_variance_is_non_finite() {
        let r = point_biserial(2.0, 2, 4.0, 4.0, 4);
        assert!(!r.is_finite());
    }

    #[test]
    fn phi_perfect_correlation() {
        assert!((phi(5, 5, 5, 10) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn phi_independence() {
        // joint count equals expected count under independence
        assert!(phi(2, 4, 5, 10).abs() < 1e-6);
    }

    #[test]
    fn phi_constant_indicator_is_non_finite() {
        assert!(!phi(10, 10, 10, 10).is_finite());
    }

    #[test]
    fn confidence_interval_brackets_r() {
        let (lo, hi) = fisher_confidence_interval(0.5, 50, 1.96);
        assert!(lo < 0.5 && 0.5 < hi);
        assert!(lo > -1.0 && hi < 1.0);
    }

    #[test]
    fn confidence_interval_narrows_with_samples() {
        let (lo_small, hi_small) = fisher_confidence_interval(0.3, 10, 1.96);
        let (lo_large, hi_large) = fisher_confidence_interval(0.3, 1000, 1.96);
        assert!(hi_large - lo_large < hi_small - lo_small);
    }
}
