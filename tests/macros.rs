//! Shared assertions for integration tests.

/// Assert that two `f64` statistics agree within a tolerance (default `1e-10`).
///
/// ```ignore
/// assert_approx_eq!(win.variance(), 166.0);
/// assert_approx_eq!(avg.metric, 102.3, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr) => {
        assert_approx_eq!($actual, $expected, 1e-10)
    };
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let (actual, expected, epsilon): (f64, f64, f64) = ($actual, $expected, $epsilon);
        let diff = (actual - expected).abs();
        assert!(
            diff <= epsilon,
            "statistic out of tolerance\n  actual: {actual:?}\n  expected: {expected:?}\n  diff: {diff:?} > {epsilon:?}"
        );
    }};
}
