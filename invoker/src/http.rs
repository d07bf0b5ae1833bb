use async_trait::async_trait;
use chrono::Utc;
use model::domain::function::Function;
use model::domain::specification::RuntimeSpecification;
use model::dto::record::{ExecutionRecord, Phase};
use tokio::time::timeout;
use tracing::{instrument, trace, warn};

use crate::models::{InvocationRequest, InvocationResponse};
use crate::{success_or_error, Configuration, Error, Invoker};

/// Adapter for platforms that hold the connection open until the function
/// finished: one POST, one fully resolved answer.
#[derive(Debug)]
pub struct HttpInvoker {
    configuration: Configuration,
    client:        reqwest::Client,
}

impl HttpInvoker {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration, client: reqwest::Client::new() }
    }

    async fn call(
        &self,
        endpoint: &str,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, Error> {
        trace!("Requesting {}", endpoint);
        let response = self.client.post(endpoint).json(request).send().await?;
        Ok(success_or_error(response).await?.json().await?)
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
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
        let deadline = self.configuration.deadline(spec);

        record.start_time = Utc::now().timestamp_micros();
        let outcome =
            timeout(deadline, self.call(&function.endpoint, &request)).await;
        record.response_time =
            Utc::now().timestamp_micros() - record.start_time;

        match outcome {
            Err(_) => {
                warn!(
                    "Function {} exceeded its deadline of {:?}",
                    function.name, deadline
                );
                record.function_timeout = true;
                (false, record)
            }
            Ok(Err(err)) => {
                warn!("Failed to invoke {}: {}", function.name, err);
                record.connection_timeout = true;
                (false, record)
            }
            Ok(Ok(response)) => {
                record.actual_duration = response.duration_micro;
                record.actual_memory = response.memory_mib;
                record.memory_allocation_timeout = response.allocation_timeout;
                (!response.allocation_timeout, record)
            }
        }
    }
}
