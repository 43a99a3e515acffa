//! Scenario tests for the sampling and aggregation pipeline
//!
//! Tests are organized by topic:
//! - `marginals` - Per-column distributions and bounded supports
//! - `copula` - Latin Hypercube stratification and induced correlation
//! - `determinism` - Seeded reproducibility across execution modes
//! - `failures` - Per-iteration failure isolation and degraded runs
//! - `end_to_end` - Full configure / simulate / summarize scenarios

mod copula;
mod end_to_end;

use crate::model::{Outputs, Parameters};

/// `value = 100 * price_factor * volume_factor`
pub(crate) fn revenue_index(p: &Parameters) -> Result<Outputs, String> {
    let price = p.get("price_factor").ok_or("missing price_factor")?;
    let volume = p.get("volume_factor").ok_or("missing volume_factor")?;
    Ok(Outputs::from([("value".to_string(), 100.0 * price * volume)]))
}
