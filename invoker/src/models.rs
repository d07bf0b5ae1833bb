use serde::{Deserialize, Serialize};

/// Body POSTed to a workload function: how long to run and how much
/// memory to allocate.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub runtime_milli: u32,
    pub memory_mib:    u32,
}

/// What the workload function reports back once it ran.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub duration_micro: i64,
    pub memory_mib:     u32,
    #[serde(default)]
    pub allocation_timeout: bool,
}

/// Immediate answer of a platform that resolves activations later.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationAccepted {
    pub activation_id: String,
}
