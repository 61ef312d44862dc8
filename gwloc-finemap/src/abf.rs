//! Wakefield approximate Bayes factors, kept in log space.
//!
//! For an observed effect with sampling variance `V` and a normal prior on the
//! true effect with variance `W`,
//!
//! ```text
//! ln ABF = 0.5 * ln(V / (V + W)) + (z^2 / 2) * W / (V + W)
//! ```
//!
//! where `z = beta / se`. In `beta` mode `V = se^2`; in `standardized` mode
//! `V = 1 / n_eff` and `W` applies to the standardized effect.

use gwloc_core::config::{PriorConfig, PriorMode};
use gwloc_core::models::Variant;
use gwloc_core::{DropReason, VariantError};

pub fn log_abf(z: f64, v: f64, w: f64) -> f64 {
    let r = w / (v + w);
    0.5 * (v / (v + w)).ln() + 0.5 * z * z * r
}

///
/// Log Bayes factor for one variant under `prior`.
///
/// Fails only in standardized mode, for variants without a usable effective
/// sample size.
///
pub fn variant_log_abf(variant: &Variant, prior: &PriorConfig) -> Result<f64, VariantError> {
    let w = prior.variance();
    let v = match prior.mode {
        PriorMode::Beta => variant.se * variant.se,
        PriorMode::Standardized => match variant.n_eff {
            Some(n) if n.is_finite() && n > 0.0 => 1.0 / n,
            _ => {
                return Err(VariantError::new(
                    &variant.id,
                    DropReason::MissingSampleSize,
                    "standardized prior needs an effective sample size",
                )
                .at(&variant.chr, variant.pos));
            }
        },
    };
    Ok(log_abf(variant.z(), v, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    fn test_log_abf_at_zero_effect() {
        // no signal: the factor is the variance shrinkage term alone
        let v = 0.01;
        let w = 0.04;
        assert!(approx(log_abf(0.0, v, w), 0.5 * (0.2f64).ln()));
        assert!(log_abf(0.0, v, w) < 0.0);
    }

    #[rstest]
    fn test_log_abf_large_z_stays_finite() {
        let l = log_abf(60.0, 1e-4, 0.04);
        assert!(l.is_finite());
        assert!(l > 1500.0);
    }

    #[rstest]
    #[case(0.5, 0.05)]
    #[case(-0.5, 0.05)]
    fn test_sign_does_not_matter(#[case] beta: f64, #[case] se: f64) {
        let v = Variant::new("1", 1, "A", "G", beta, se, 1e-20);
        let l = variant_log_abf(&v, &PriorConfig::default()).unwrap();
        assert!(approx(l, log_abf(10.0, se * se, 0.04)));
    }

    #[rstest]
    fn test_standardized_mode() {
        let prior = PriorConfig {
            mode: PriorMode::Standardized,
            sd: 0.2,
        };
        let without_n = Variant::new("1", 1, "A", "G", 0.1, 0.02, 1e-6);
        let err = variant_log_abf(&without_n, &prior).unwrap_err();
        assert_eq!(err.reason, DropReason::MissingSampleSize);
        assert_eq!(err.site, Some(("1".to_string(), 1)));

        let with_n = without_n.with_n_eff(10_000.0);
        let l = variant_log_abf(&with_n, &prior).unwrap();
        assert!(approx(l, log_abf(5.0, 1e-4, 0.04)));
    }
}
