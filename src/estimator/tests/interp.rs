use crate::estimator::interp::{interp_at, interp_many};

#[test]
fn test_interpolates_between_samples() {
    let xs = [0.0, 1.0, 2.0];
    let ys = [0.0, 10.0, 30.0];

    assert!((interp_at(&xs, &ys, 0.5) - 5.0).abs() < 1e-12);
    assert!((interp_at(&xs, &ys, 1.5) - 20.0).abs() < 1e-12);
}

#[test]
fn test_exact_at_samples() {
    let xs = [0.0, 0.5, 2.0];
    let ys = [1.0, -3.0, 7.0];

    for (&x, &y) in xs.iter().zip(&ys) {
        assert!((interp_at(&xs, &ys, x) - y).abs() < 1e-12);
    }
}

#[test]
fn test_flat_extension_outside_range() {
    let xs = [1.0, 2.0];
    let ys = [5.0, 9.0];

    // Boundary values extend flat, no extrapolation.
    assert!((interp_at(&xs, &ys, 0.0) - 5.0).abs() < 1e-12);
    assert!((interp_at(&xs, &ys, 100.0) - 9.0).abs() < 1e-12);
}

#[test]
fn test_empty_input_is_nan() {
    assert!(interp_at(&[], &[], 1.0).is_nan());
}

#[test]
fn test_interp_many_matches_pointwise() {
    let xs = [0.0, 1.0, 2.0, 3.0];
    let ys = [0.0, 2.0, 4.0, 6.0];
    let at = [-1.0, 0.25, 2.75, 9.0];

    let many = interp_many(&xs, &ys, &at);
    for (&x, &v) in at.iter().zip(&many) {
        assert!((interp_at(&xs, &ys, x) - v).abs() < 1e-12);
    }
}
