#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use helper::init::init_subscriber;
use invoker::{Configuration, DeferredHttpInvoker, HttpInvoker, Invoker};

use crate::config::Settings;
use crate::service::experiment::Experiment;
use crate::service::synthetic;

mod config;
mod repository;
mod service;

fn main() -> Result<()> {
    let _guard = init_subscriber("loader".to_string(), "info".to_string())
        .context("Failed to initialize the tracing subscriber")?;

    let settings = Settings::load_from_env()?;
    debug!("Loaded settings: {:?}", settings);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .expect("build runtime failed")
        .block_on(run(settings))
}

async fn run(settings: Settings) -> Result<()> {
    let configuration = Configuration::default();
    let (invoker, deferred): (
        Arc<dyn Invoker>,
        Option<Arc<DeferredHttpInvoker>>,
    ) = if settings.deferred_resolution {
        info!("Using the deferred-resolution invoker");
        let adapter = Arc::new(DeferredHttpInvoker::new(configuration));
        (adapter.clone() as Arc<dyn Invoker>, Some(adapter))
    } else {
        (Arc::new(HttpInvoker::new(configuration)), None)
    };

    let functions = synthetic::stress_functions(
        settings.function_count.into_inner(),
        settings.duration.into_inner(),
        settings.invocations_per_minute,
        settings.runtime_milli,
        settings.memory_mib,
        settings.gateway.clone().into_inner().as_str(),
    );

    let experiment = Experiment::new(
        invoker,
        deferred,
        settings.phase,
        settings.granularity,
        settings.duration.into_inner(),
        PathBuf::from(&settings.output_path),
    );
    let summary = experiment
        .run(functions, settings.seed, settings.iat_distribution)
        .await?;

    info!(
        "Replay complete: {}/{} invocations succeeded, {} failed, {} \
         records written to {}",
        summary.successful,
        summary.issued,
        summary.failed,
        summary.records_written,
        settings.output_path
    );
    if summary.deferred_resolved > 0 {
        info!(
            "Resolved {} deferred activations",
            summary.deferred_resolved
        );
    }

    Ok(())
}
