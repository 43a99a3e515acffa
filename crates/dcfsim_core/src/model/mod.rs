mod distribution;
mod progress;
mod results;
mod variable;

pub use distribution::{
    Distribution, DistributionSpec, standard_normal_cdf, standard_normal_quantile,
};
pub use progress::{Progress, SimulationProgress};
pub use results::{
    ConvergenceWarning, IterationResult, MonteCarloResult, Outputs, Parameters, ResultRow,
    ResultTable,
};
pub use variable::{CorrelationSpec, RegistryConfig, Variable, VariableRegistry};
