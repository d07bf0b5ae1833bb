use async_trait::async_trait;
use chrono::Utc;
use helper::queue::LockFreeQueue;
use model::domain::function::Function;
use model::domain::specification::RuntimeSpecification;
use model::dto::record::{ExecutionRecord, Phase};
use tokio::time::timeout;
use tracing::{instrument, trace, warn};

use crate::models::{
    ActivationAccepted, InvocationRequest, InvocationResponse,
};
use crate::{success_or_error, Configuration, Error, Invoker};

/// Adapter for platforms that acknowledge an invocation immediately and
/// expose its outcome at a result endpoint later. Accepted activations are
/// buffered in the wait-free queue so the attempts that registered them
/// never block on the resolution step; the experiment drains the queue
/// once no attempt is left running.
#[derive(Debug)]
pub struct DeferredHttpInvoker {
    configuration: Configuration,
    client:        reqwest::Client,
    pending:       LockFreeQueue<PendingActivation>,
}

#[derive(Debug)]
struct PendingActivation {
    activation_id: String,
    endpoint:      String,
    specification: RuntimeSpecification,
    record:        ExecutionRecord,
}

impl DeferredHttpInvoker {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            client: reqwest::Client::new(),
            pending: LockFreeQueue::new(),
        }
    }

    pub fn outstanding(&self) -> usize { self.pending.len() }

    /// Fetches the outcome of every buffered activation. The batch size is
    /// read once up front, which is exactly the availability guarantee the
    /// queue contract asks of its callers: no attempt is still enqueuing
    /// when the resolution step runs.
    pub async fn resolve_outstanding(&self) -> Vec<ExecutionRecord> {
        let batch = self.pending.len();
        let mut resolved = Vec::with_capacity(batch);
        for _ in 0..batch {
            let pending = self.pending.dequeue();
            resolved.push(self.resolve(pending).await);
        }
        resolved
    }

    async fn resolve(&self, pending: PendingActivation) -> ExecutionRecord {
        let mut record = pending.record;
        let url = format!(
            "{}/result/{}",
            pending.endpoint, pending.activation_id
        );
        let deadline = self.configuration.deadline(&pending.specification);

        let outcome = timeout(deadline, async {
            trace!("Polling {}", url);
            let response = self.client.get(&url).send().await?;
            let response = success_or_error(response).await?;
            Ok::<InvocationResponse, Error>(response.json().await?)
        })
        .await;

        match outcome {
            Err(_) => {
                warn!(
                    "Activation {} was not resolved within {:?}",
                    pending.activation_id, deadline
                );
                record.function_timeout = true;
            }
            Ok(Err(err)) => {
                warn!(
                    "Failed to resolve activation {}: {}",
                    pending.activation_id, err
                );
                record.connection_timeout = true;
            }
            Ok(Ok(response)) => {
                record.actual_duration = response.duration_micro;
                record.actual_memory = response.memory_mib;
                record.memory_allocation_timeout = response.allocation_timeout;
            }
        }
        record
    }
}

#[async_trait]
impl Invoker for DeferredHttpInvoker {
    #[instrument(level = "trace", skip(self, function), fields(function = %function.name))]
    async fn invoke(
        &self,
        function: &Function,
        spec: &RuntimeSpecification,
        phase: Phase,
        minute: usize,
        index: usize,
    ) -> (bool, ExecutionRecord) {
        let mut record =
            ExecutionRecord::new(function, spec, phase, minute, index);
        let request = InvocationRequest {
            runtime_milli: spec.runtime_milli,
            memory_mib:    spec.memory_mib,
        };
        let url = format!("{}/async", function.endpoint);
        // The platform only has to acknowledge here, not run the function.
        let deadline = self.configuration.submission_deadline();

        record.start_time = Utc::now().timestamp_micros();
        let outcome = timeout(deadline, async {
            let response =
                self.client.post(&url).json(&request).send().await?;
            let response = success_or_error(response).await?;
            Ok::<ActivationAccepted, Error>(response.json().await?)
        })
        .await;
        record.response_time =
            Utc::now().timestamp_micros() - record.start_time;

        match outcome {
            Err(_) => {
                warn!(
                    "Submission for {} exceeded its deadline of {:?}",
                    function.name, deadline
                );
                record.function_timeout = true;
                (false, record)
            }
            Ok(Err(err)) => {
                warn!("Failed to submit {}: {}", function.name, err);
                record.connection_timeout = true;
                (false, record)
            }
            Ok(Ok(accepted)) => {
                self.pending.enqueue(PendingActivation {
                    activation_id: accepted.activation_id,
                    endpoint:      function.endpoint.clone(),
                    specification: *spec,
                    record:        record.clone(),
                });
                (true, record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nothing_outstanding_resolves_to_nothing() {
        let adapter = DeferredHttpInvoker::new(Configuration::default());

        assert_eq!(adapter.outstanding(), 0);
        assert!(adapter.resolve_outstanding().await.is_empty());
    }
}

