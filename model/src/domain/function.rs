use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::specification::FunctionSpecification;

/// Empirical percentile profile summarizing one dimension (runtime in
/// milliseconds or memory in MiB) of a function's historical behavior.
/// Stands in for the raw sample set the trace provider aggregated away.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStats {
    pub average: f64,
    pub count:   i64,

    pub percentile0:   f64,
    pub percentile1:   f64,
    pub percentile25:  f64,
    pub percentile50:  f64,
    pub percentile75:  f64,
    pub percentile99:  f64,
    pub percentile100: f64,
}

/// One workload unit of the trace. The endpoint is written by the external
/// deployer before the replay starts; the engine only ever reads it.
#[derive(Debug, Clone)]
pub struct Function {
    pub name:     String,
    pub endpoint: String,

    /// One scheduled invocation count per trace window, its length is the
    /// trace duration.
    pub invocations_per_minute: Vec<usize>,

    pub runtime_stats: FunctionStats,
    pub memory_stats:  FunctionStats,

    /// None until the specification generator ran, immutable afterwards.
    pub specification: Option<Arc<FunctionSpecification>>,
}

impl Function {
    pub fn total_invocations(&self) -> usize {
        self.invocations_per_minute.iter().sum()
    }
}
