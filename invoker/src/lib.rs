use std::fmt::Debug;

use async_trait::async_trait;
use model::domain::function::Function;
use model::domain::specification::RuntimeSpecification;
use model::dto::record::{ExecutionRecord, Phase};

pub use crate::configuration::Configuration;
pub use crate::deferred::DeferredHttpInvoker;
pub use crate::http::HttpInvoker;

mod configuration;
mod deferred;
mod http;
pub mod models;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("The platform answered with status {0}: {1}")]
    Status(reqwest::StatusCode, String),
}

/// The one capability the replay engine needs from a platform: fire an
/// invocation and report what happened. Implementations enforce their own
/// completion deadline so a hung call can never stall a scheduler, and
/// always return a record, with the matching timeout flag set on failure.
#[async_trait]
pub trait Invoker: Debug + Sync + Send {
    async fn invoke(
        &self,
        function: &Function,
        spec: &RuntimeSpecification,
        phase: Phase,
        minute: usize,
        index: usize,
    ) -> (bool, ExecutionRecord);
}

async fn success_or_error(
    response: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Status(status, body))
    }
}
