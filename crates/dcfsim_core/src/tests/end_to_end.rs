//! Full pipeline scenarios
//!
//! These tests verify that:
//! - The two-factor revenue scenario lands where the propagated variance says
//! - Pinning every variable to its base value reproduces the direct valuation
//! - A registry document round-trips through configure and simulate

use crate::analysis::{SummaryOptions, sensitivity_ranking, summarize, summarize_with};
use crate::config::{SimulationConfig, configure};
use crate::model::{Distribution, RegistryConfig, Variable};
use crate::simulation::{MonteCarloConfig, base_case, monte_carlo_simulate, simulate};

use super::revenue_index;

fn revenue_config() -> SimulationConfig {
    configure(vec![
        Variable::new(
            "price_factor",
            Distribution::lognormal(-0.02, 0.2).unwrap(),
            1.0,
        )
        .description("Realized price relative to plan"),
        Variable::new(
            "volume_factor",
            Distribution::normal(1.0, 0.08).unwrap(),
            1.0,
        )
        .correlated_with("price_factor", 0.4),
    ])
    .unwrap()
}

#[test]
fn test_revenue_scenario_matches_propagated_variance() {
    let config = revenue_config();
    let result = simulate(&config, &revenue_index, 20_000, 42, 4).unwrap();
    assert_eq!(result.n_failed(), 0);
    assert!(result.warnings.is_empty());

    let summary = summarize(&result, "value").unwrap();
    assert!((95.0..=105.0).contains(&summary.mean), "mean {}", summary.mean);

    // First-order propagation for the product of two near-unit-mean factors
    let sd_price = (0.04f64.exp() - 1.0).sqrt();
    let sd_volume: f64 = 0.08;
    let rho = 0.4 * 0.2 / sd_price;
    let sd_value =
        100.0 * (sd_price.powi(2) + sd_volume.powi(2) + 2.0 * rho * sd_price * sd_volume).sqrt();

    assert!(((summary.std - sd_value) / sd_value).abs() < 0.05);

    let ci = summary.confidence_interval(90.0).unwrap();
    let normal_width = 2.0 * 1.6449 * sd_value;
    assert!(
        ((ci.width() - normal_width) / normal_width).abs() < 0.10,
        "ci width {}",
        ci.width()
    );
    assert!(ci.lower < summary.median && summary.median < ci.upper);

    let p10 = summary.percentile(10.0).unwrap();
    let p50 = summary.percentile(50.0).unwrap();
    let p90 = summary.percentile(90.0).unwrap();
    assert!(p10 <= p50 && p50 <= p90);
    assert!(summary.var_99 <= summary.var_95);
    assert!(summary.cvar_95 <= summary.var_95);
    // Lognormal price skews the product right
    assert!(summary.skewness > 0.0);

    let ranking = sensitivity_ranking(&result, "value").unwrap();
    assert_eq!(ranking[0].variable, "price_factor");
}

#[test]
fn test_base_values_reproduce_direct_valuation() {
    let config = revenue_config();
    let direct = base_case(&config, &revenue_index).unwrap();

    let pinned = config.at_base_values();
    let result = simulate(&pinned, &revenue_index, 64, 3, 1).unwrap();
    assert_eq!(result.n_failed(), 0);
    for it in &result.iterations {
        assert_eq!(it.outputs.as_ref(), Some(&direct));
    }

    let summary = summarize(&result, "value").unwrap();
    assert_eq!(summary.mean, direct["value"]);
    assert_eq!(summary.std, 0.0);
}

#[test]
fn test_registry_document_drives_a_run() {
    let json = r#"{
        "variables": [
            {
                "name": "price_factor",
                "distribution": { "kind": "lognormal", "mean": -0.02, "std": 0.2 },
                "base_value": 1.0
            },
            {
                "name": "volume_factor",
                "description": "Throughput relative to plan",
                "distribution": { "kind": "triangular", "min": 0.8, "mode": 1.0, "max": 1.1 },
                "base_value": 1.0,
                "correlations": [ { "with": "price_factor", "coefficient": 0.3 } ]
            }
        ]
    }"#;
    let document: RegistryConfig = serde_json::from_str(json).unwrap();
    let config = SimulationConfig::try_from(document).unwrap();

    let options = SummaryOptions::default().with_thresholds([80.0]);
    let result =
        monte_carlo_simulate(&config, &revenue_index, &MonteCarloConfig::new(5_000, 8)).unwrap();
    let summary = summarize_with(&result, "value", &options).unwrap();

    assert_eq!(summary.n_valid, 5_000);
    let (threshold, probability) = summary.probability_below[0];
    assert_eq!(threshold, 80.0);
    assert!(probability > 0.0 && probability < 0.5);
}
