use crate::estimator::stats::{mean, median, std_dev};

#[test]
fn test_median_odd_and_even_counts() {
    assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
    assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
    assert!((median(&[7.0]) - 7.0).abs() < 1e-12);
}

#[test]
fn test_mean() {
    assert!((mean(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < 1e-12);
}

#[test]
fn test_population_std_dev() {
    // numpy.std of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
    let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert!((std_dev(&values) - 2.0).abs() < 1e-12);
}

#[test]
fn test_empty_inputs_are_nan() {
    assert!(mean(&[]).is_nan());
    assert!(median(&[]).is_nan());
    assert!(std_dev(&[]).is_nan());
}
