//! Property tests for spec.md §8 items 1-2 (phase canonicalization and
//! short-arc blending).

use proptest::prelude::*;
use swarmsync_core::phase::{blend, diff, wrap};
use std::f64::consts::TAU;

proptest! {
    #[test]
    fn wrap_always_in_range(x in -1.0e6f64..1.0e6) {
        let w = wrap(x);
        prop_assert!(w >= 0.0 && w < TAU);
    }

    #[test]
    fn wrap_is_idempotent(x in -1.0e6f64..1.0e6) {
        prop_assert!((wrap(wrap(x)) - wrap(x)).abs() < 1e-9);
    }

    #[test]
    fn blend_never_overshoots_the_short_arc(
        a in 0.0f64..TAU,
        b in 0.0f64..TAU,
        w in 0.0f64..=1.0,
    ) {
        let blended = blend(a, b, w);
        let full_arc = diff(b, a).abs();
        let moved = diff(blended, a).abs();
        prop_assert!(moved <= full_arc + 1e-9);
    }

    #[test]
    fn blend_endpoints_match_wrap(a in 0.0f64..TAU, b in 0.0f64..TAU) {
        prop_assert!((blend(a, b, 0.0) - wrap(a)).abs() < 1e-9);
        prop_assert!((blend(a, b, 1.0) - wrap(b)).abs() < 1e-9);
    }
}
