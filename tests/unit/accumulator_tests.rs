//! Unit tests for the running statistics

use codec_compare::accumulators::{GeometricMean, Quantile};

#[test]
fn test_geometric_mean_of_tiny_values() {
    let mut mean = GeometricMean::new();
    for _ in 0..3 {
        mean.add(1e-100);
    }
    assert_eq!(mean.count(), 3);
    let expected = (1e-100f64).ln();
    assert!((mean.get_log() - expected).abs() < 1e-9 * expected.abs());
    assert!((mean.get() / 1e-100 - 1.0).abs() < 1e-9);
}

#[test]
fn test_geometric_mean_of_long_sequence() {
    let mut mean = GeometricMean::new();
    for i in 0..10_000 {
        mean.add(if i % 2 == 0 { 1e10 } else { 1e-10 });
    }
    assert!((mean.get() - 1.0).abs() < 1e-6);
}

#[test]
fn test_quantile_levels() {
    let mut quantile = Quantile::new();
    for v in [5.0, 1.0, 4.0, 2.0, 3.0, 10.0, 9.0, 8.0, 7.0, 6.0] {
        quantile.add(v);
    }
    assert_eq!(quantile.len(), 10);
    // floor(9 * 0.1) = 0, floor(9 * 0.9) = 8
    assert_eq!(quantile.get(0.1), 1.0);
    assert_eq!(quantile.get(0.9), 9.0);
    assert_eq!(quantile.get(1.0), 10.0);

    quantile.add(0.0);
    assert_eq!(quantile.get(0.0), 0.0);
}
