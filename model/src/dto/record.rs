use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::function::Function;
use crate::domain::specification::RuntimeSpecification;

/// Distinguishes warmup rows from measurement rows in the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Warmup,
    Execution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Warmup => write!(f, "warmup"),
            Phase::Execution => write!(f, "execution"),
        }
    }
}

/// One immutable outcome row per invocation attempt, produced on success
/// and failure alike, consumed exactly once by the metrics sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub phase:    Phase,
    pub instance: String,

    /// `min<M>.inv<N>`, the invocation's place in the specification.
    pub invocation_id: String,

    /// Microseconds since the Unix epoch.
    pub start_time: i64,

    /// Requested duration in microseconds, requested memory in MiB.
    pub requested_duration: i64,
    pub requested_memory:   u32,

    /// Observed client-side roundtrip, microseconds.
    pub response_time: i64,

    /// What the function reported it actually did.
    pub actual_duration: i64,
    pub actual_memory:   u32,

    pub connection_timeout:        bool,
    pub function_timeout:          bool,
    pub memory_allocation_timeout: bool,
}

impl ExecutionRecord {
    /// A fresh record carrying the attempt's identity and requested
    /// resources; timings and flags are filled in by the invoker.
    pub fn new(
        function: &Function,
        spec: &RuntimeSpecification,
        phase: Phase,
        minute: usize,
        index: usize,
    ) -> Self {
        Self {
            phase,
            instance: function.name.clone(),
            invocation_id: format!("min{}.inv{}", minute, index),
            start_time: 0,
            requested_duration: i64::from(spec.runtime_milli) * 1_000,
            requested_memory: spec.memory_mib,
            response_time: 0,
            actual_duration: 0,
            actual_memory: 0,
            connection_timeout: false,
            function_timeout: false,
            memory_allocation_timeout: false,
        }
    }
}
