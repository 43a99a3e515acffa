//! Tests for Latin Hypercube stratification and the Gaussian copula
//!
//! These tests verify that:
//! - Each stratum of an uncorrelated column holds exactly one underlying uniform
//! - A declared correlation is reproduced by the sampled columns
//! - An inconsistent correlation set is repaired before sampling

use crate::analysis::{pearson, spearman};
use crate::config::{RegistryBuilder, configure};
use crate::model::{Distribution, Variable, standard_normal_cdf};
use crate::sampler::sample;

#[test]
fn test_uncorrelated_column_is_latin_hypercube() {
    let n = 1_000;
    let config = configure(vec![
        Variable::new("z1", Distribution::normal(0.0, 1.0).unwrap(), 0.0),
        Variable::new("z2", Distribution::normal(0.0, 1.0).unwrap(), 0.0),
    ])
    .unwrap();
    let table = sample(&config, n, 77);

    for j in 0..2 {
        let mut strata: Vec<usize> = table
            .column(j)
            .iter()
            .map(|&z| (standard_normal_cdf(z) * n as f64).floor() as usize)
            .collect();
        strata.sort_unstable();
        assert_eq!(strata, (0..n).collect::<Vec<_>>());
    }
}

#[test]
fn test_induced_correlation_matches_declared() {
    let config = RegistryBuilder::new()
        .normal("a", 0.0, 1.0, 0.0)
        .normal("b", 5.0, 2.0, 5.0)
        .correlate("b", "a", 0.7)
        .build()
        .unwrap();
    let table = sample(&config, 10_000, 42);

    let r = pearson(&table.column(0), &table.column(1));
    assert!((r - 0.7).abs() < 0.05, "pearson {r}");

    let empirical = table.empirical_correlation();
    assert_eq!(empirical[(0, 0)], 1.0);
    assert!((empirical[(0, 1)] - r).abs() < 1e-12);
}

#[test]
fn test_correlation_survives_nonnormal_marginals() {
    let config = RegistryBuilder::new()
        .lognormal("price_factor", -0.02, 0.2, 1.0)
        .beta("recovery", 8.0, 3.0, 0.4, 1.0, 0.75)
        .correlate("recovery", "price_factor", 0.7)
        .build()
        .unwrap();
    let table = sample(&config, 10_000, 9);

    // Rank correlation of a Gaussian copula with rho is 6/pi * asin(rho / 2)
    let expected = 6.0 / std::f64::consts::PI * (0.7f64 / 2.0).asin();
    let rho_s = spearman(&table.column(0), &table.column(1));
    assert!((rho_s - expected).abs() < 0.05, "spearman {rho_s}");
}

#[test]
fn test_inconsistent_correlations_are_repaired_then_sampled() {
    // a~b and b~c strongly positive, a~c strongly negative: not PSD
    let config = RegistryBuilder::new()
        .normal("a", 0.0, 1.0, 0.0)
        .normal("b", 0.0, 1.0, 0.0)
        .normal("c", 0.0, 1.0, 0.0)
        .correlate("b", "a", 0.9)
        .correlate("c", "b", 0.9)
        .correlate("c", "a", -0.9)
        .build()
        .unwrap();

    let repair = config.correlation().repair_outcome();
    assert!(repair.repaired());
    assert!(repair.min_eigenvalue < 0.0);

    let table = sample(&config, 5_000, 1);
    assert_eq!(table.n_faults(), 0);
    let ab = pearson(&table.column(0), &table.column(1));
    let target = config.correlation().get("a", "b").unwrap();
    assert!((ab - target).abs() < 0.05);
}
