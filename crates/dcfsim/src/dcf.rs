//! Demo discounted-cash-flow valuation
//!
//! A single-asset producer: realized price times produced volume gives revenue,
//! margin and opex give EBITDA, tax and capex give free cash flow. Cash flows
//! are discounted over an explicit horizon and closed with a Gordon terminal
//! value; net debt is deducted to reach equity and a per-share price.
//!
//! Sampled inputs act on the base assumptions:
//!
//! | parameter         | effect                                   | neutral |
//! |-------------------|------------------------------------------|---------|
//! | `price_factor`    | multiplies the base price                | 1.0     |
//! | `fx_factor`       | multiplies the base price                | 1.0     |
//! | `volume_factor`   | multiplies base volume                   | 1.0     |
//! | `execution`       | multiplies base volume                   | 1.0     |
//! | `ebitda_margin`   | margin on revenue                        | assumption |
//! | `opex_factor`     | multiplies fixed costs                   | 1.0     |
//! | `capex_factor`    | multiplies capex                         | 1.0     |
//! | `discount_rate`   | WACC                                     | assumption |
//! | `terminal_growth` | perpetual growth after the horizon       | assumption |
//! | `tax_rate`        | cash tax on positive EBITDA              | assumption |
//!
//! A parameter missing from the input mapping takes its neutral value.

use dcfsim_core::error::ValuationError;
use dcfsim_core::model::{Outputs, Parameters};
use dcfsim_core::simulation::Valuation;
use serde::{Deserialize, Serialize};

pub const SHARE_PRICE: &str = "share_price";
pub const NPV: &str = "npv";
pub const TERMINAL_VALUE: &str = "terminal_value";
pub const EBITDA_YEAR1: &str = "ebitda_year1";
pub const FCF_YEAR1: &str = "fcf_year1";

/// Metrics produced by [`DcfModel`], in report order
pub const OUTPUT_METRICS: [&str; 5] = [SHARE_PRICE, NPV, TERMINAL_VALUE, EBITDA_YEAR1, FCF_YEAR1];

/// Deterministic plan figures the sampled factors perturb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfAssumptions {
    /// Price per unit in reporting currency
    pub price: f64,
    /// Units produced in year one
    pub volume: f64,
    /// Annual volume growth
    pub volume_growth: f64,
    /// Explicit forecast horizon in years
    pub years: u32,
    pub ebitda_margin: f64,
    /// Annual fixed operating costs
    pub fixed_costs: f64,
    /// Annual sustaining capex
    pub capex: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
    pub terminal_growth: f64,
    pub net_debt: f64,
    pub shares_outstanding: f64,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            price: 70.0,
            volume: 10.0,
            volume_growth: 0.02,
            years: 10,
            ebitda_margin: 0.35,
            fixed_costs: 50.0,
            capex: 60.0,
            tax_rate: 0.25,
            discount_rate: 0.09,
            terminal_growth: 0.02,
            net_debt: 400.0,
            shares_outstanding: 100.0,
        }
    }
}

/// Valuation function over [`DcfAssumptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcfModel {
    pub assumptions: DcfAssumptions,
}

/// One forecast year
#[derive(Debug, Clone, Copy, PartialEq)]
struct YearCashFlow {
    ebitda: f64,
    fcf: f64,
}

impl DcfModel {
    #[must_use]
    pub fn new(assumptions: DcfAssumptions) -> Self {
        Self { assumptions }
    }

    fn project(
        &self,
        price: f64,
        volume: f64,
        margin: f64,
        fixed_costs: f64,
        capex: f64,
        tax_rate: f64,
    ) -> Vec<YearCashFlow> {
        let a = &self.assumptions;
        (0..a.years)
            .map(|t| {
                let revenue = price * volume * (1.0 + a.volume_growth).powi(t as i32);
                let ebitda = revenue * margin - fixed_costs;
                let tax = ebitda.max(0.0) * tax_rate;
                YearCashFlow {
                    ebitda,
                    fcf: ebitda - tax - capex,
                }
            })
            .collect()
    }
}

fn factor(inputs: &Parameters, name: &str) -> f64 {
    inputs.get(name).copied().unwrap_or(1.0)
}

fn rate(inputs: &Parameters, name: &str, default: f64) -> f64 {
    inputs.get(name).copied().unwrap_or(default)
}

impl Valuation for DcfModel {
    fn evaluate(&self, inputs: &Parameters) -> Result<Outputs, ValuationError> {
        let a = &self.assumptions;

        let price = a.price * factor(inputs, "price_factor") * factor(inputs, "fx_factor");
        let volume = a.volume * factor(inputs, "volume_factor") * factor(inputs, "execution");
        let margin = rate(inputs, "ebitda_margin", a.ebitda_margin);
        let fixed_costs = a.fixed_costs * factor(inputs, "opex_factor");
        let capex = a.capex * factor(inputs, "capex_factor");
        let tax_rate = rate(inputs, "tax_rate", a.tax_rate);
        let discount_rate = rate(inputs, "discount_rate", a.discount_rate);
        let growth = rate(inputs, "terminal_growth", a.terminal_growth);

        if price < 0.0 {
            return Err(format!("negative price {price:.4}").into());
        }
        if volume < 0.0 {
            return Err(format!("negative volume {volume:.4}").into());
        }
        if discount_rate <= -1.0 {
            return Err(format!("discount rate {discount_rate:.4} is not above -100%").into());
        }
        if discount_rate - growth <= 0.0 {
            return Err(format!(
                "discount rate {discount_rate:.4} does not exceed terminal growth {growth:.4}"
            )
            .into());
        }
        if a.years == 0 {
            return Err("forecast horizon is empty".into());
        }

        let flows = self.project(price, volume, margin, fixed_costs, capex, tax_rate);

        let mut discount = 1.0;
        let mut pv_explicit = 0.0;
        for flow in &flows {
            discount /= 1.0 + discount_rate;
            pv_explicit += flow.fcf * discount;
        }

        let last = flows[flows.len() - 1];
        let terminal_value = last.fcf * (1.0 + growth) / (discount_rate - growth);
        let npv = pv_explicit + terminal_value * discount;
        let share_price = (npv - a.net_debt) / a.shares_outstanding;

        Ok(Outputs::from([
            (SHARE_PRICE.to_string(), share_price),
            (NPV.to_string(), npv),
            (TERMINAL_VALUE.to_string(), terminal_value),
            (EBITDA_YEAR1.to_string(), flows[0].ebitda),
            (FCF_YEAR1.to_string(), flows[0].fcf),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_year() -> DcfModel {
        DcfModel::new(DcfAssumptions {
            price: 10.0,
            volume: 10.0,
            volume_growth: 0.0,
            years: 1,
            ebitda_margin: 0.5,
            fixed_costs: 10.0,
            capex: 5.0,
            tax_rate: 0.2,
            discount_rate: 0.1,
            terminal_growth: 0.0,
            net_debt: 20.0,
            shares_outstanding: 10.0,
        })
    }

    #[test]
    fn test_hand_computed_single_year() {
        // revenue 100, ebitda 40, tax 8, fcf 27
        let outputs = one_year().evaluate(&Parameters::new()).unwrap();

        assert!((outputs[EBITDA_YEAR1] - 40.0).abs() < 1e-12);
        assert!((outputs[FCF_YEAR1] - 27.0).abs() < 1e-12);
        assert!((outputs[TERMINAL_VALUE] - 270.0).abs() < 1e-9);
        // (27 + 270) / 1.1 = 270
        assert!((outputs[NPV] - 270.0).abs() < 1e-9);
        assert!((outputs[SHARE_PRICE] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_factors_scale_revenue() {
        let model = one_year();
        let inputs = Parameters::from([
            ("price_factor".to_string(), 1.2),
            ("fx_factor".to_string(), 0.5),
            ("volume_factor".to_string(), 2.0),
        ]);
        // revenue 10 * 1.2 * 0.5 * 20 = 120 -> ebitda 50
        let outputs = model.evaluate(&inputs).unwrap();
        assert!((outputs[EBITDA_YEAR1] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_inputs_match_missing_inputs() {
        let model = DcfModel::default();
        let neutral = Parameters::from([
            ("price_factor".to_string(), 1.0),
            ("volume_factor".to_string(), 1.0),
            ("discount_rate".to_string(), 0.09),
            ("tax_rate".to_string(), 0.25),
        ]);
        assert_eq!(
            model.evaluate(&neutral).unwrap(),
            model.evaluate(&Parameters::new()).unwrap()
        );
    }

    #[test]
    fn test_default_plan_is_positive() {
        let outputs = DcfModel::default().evaluate(&Parameters::new()).unwrap();
        assert!(outputs[SHARE_PRICE] > 0.0);
        assert!(outputs[NPV] > 0.0);
        assert_eq!(outputs.len(), OUTPUT_METRICS.len());
    }

    #[test]
    fn test_rejects_growth_at_or_above_discount_rate() {
        let model = DcfModel::default();
        let inputs = Parameters::from([
            ("discount_rate".to_string(), 0.03),
            ("terminal_growth".to_string(), 0.03),
        ]);
        let err = model.evaluate(&inputs).unwrap_err();
        assert!(err.message.contains("does not exceed terminal growth"));
    }

    #[test]
    fn test_rejects_negative_price() {
        let inputs = Parameters::from([("price_factor".to_string(), -0.1)]);
        let err = DcfModel::default().evaluate(&inputs).unwrap_err();
        assert!(err.message.starts_with("negative price"));
    }
}
