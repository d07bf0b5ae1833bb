use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ONE_SECOND_IN_MICRO: f64 = 1_000_000.0;
pub const ONE_MINUTE_IN_MICRO: f64 = 60.0 * ONE_SECOND_IN_MICRO;

pub const MIN_EXEC_TIME_MILLI: u32 = 1;
pub const MAX_EXEC_TIME_MILLI: u32 = 60_000;
pub const MIN_MEM_QUOTA_MIB: u32 = 128;
pub const MAX_MEM_QUOTA_MIB: u32 = 10_240;

/// Shape of the inter-arrival times drawn for each scheduling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IatDistribution {
    /// Perfectly regular spacing, for synthetic stress workloads.
    Equidistant,
    Uniform,
    /// Unit-rate exponential gaps, the Poisson arrival model.
    Exponential,
}

/// The time window one IAT sequence is normalized against. Second
/// granularity compresses a trace "minute" into one second for fast
/// debugging runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceGranularity {
    Minute,
    Second,
}

impl TraceGranularity {
    pub fn window_micro(&self) -> f64 {
        match self {
            TraceGranularity::Minute => ONE_MINUTE_IN_MICRO,
            TraceGranularity::Second => ONE_SECOND_IN_MICRO,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            TraceGranularity::Minute => Duration::from_secs(60),
            TraceGranularity::Second => Duration::from_secs(1),
        }
    }
}

/// What one invocation asks of the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpecification {
    pub runtime_milli: u32,
    pub memory_mib:    u32,
}

/// The concrete, reproducible realization of one function's future
/// invocations: generated once per function before the replay starts,
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionSpecification {
    /// Microsecond gaps per window; each non-empty window starts with a
    /// zero-length entry (the first invocation fires at the window start)
    /// followed by one drawn gap per scheduled invocation.
    pub iats: Vec<Vec<f64>>,

    /// Pre-normalization totals of the drawn gaps, one per window.
    pub raw_durations: Vec<f64>,

    /// Requested runtime/memory per scheduled invocation, outer index is
    /// the window, inner index the invocation within it.
    pub runtimes: Vec<Vec<RuntimeSpecification>>,
}
