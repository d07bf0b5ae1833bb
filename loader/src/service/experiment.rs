use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use helper::err::IndividualErrorList;
use invoker::{DeferredHttpInvoker, Invoker};
use model::domain::function::Function;
use model::domain::specification::{IatDistribution, TraceGranularity};
use model::dto::record::Phase;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::repository::sink::MetricsSink;
use crate::service::scheduler::{
    global_timekeeper, FunctionScheduler, FunctionTally,
};
use crate::service::specification::SpecificationGenerator;

/// Aggregated outcome of a whole replay run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub issued:            u64,
    pub successful:        u64,
    pub failed:            u64,
    pub records_written:   u64,
    pub deferred_resolved: u64,
}

/// Top-level orchestration: generates every function's specification,
/// replays the whole trace with one scheduler per function, then waits on
/// the two completion barriers, schedulers drained and records written.
#[derive(Debug)]
pub struct Experiment {
    invoker:     Arc<dyn Invoker>,
    deferred:    Option<Arc<DeferredHttpInvoker>>,
    phase:       Phase,
    granularity: TraceGranularity,
    duration:    usize,
    output_path: PathBuf,
}

impl Experiment {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        deferred: Option<Arc<DeferredHttpInvoker>>,
        phase: Phase,
        granularity: TraceGranularity,
        duration: usize,
        output_path: PathBuf,
    ) -> Self {
        Self { invoker, deferred, phase, granularity, duration, output_path }
    }

    pub async fn run(
        &self,
        functions: Vec<Function>,
        seed: u64,
        iat_distribution: IatDistribution,
    ) -> Result<RunSummary> {
        if self.duration < 1 {
            bail!("The trace must cover at least one window");
        }

        let mut generator = SpecificationGenerator::new(seed);
        let mut scheduled = Vec::with_capacity(functions.len());
        let mut expected = 0u64;
        for mut function in functions {
            if function.invocations_per_minute.len() != self.duration {
                bail!(
                    "Function {} covers {} windows, the trace lasts {}",
                    function.name,
                    function.invocations_per_minute.len(),
                    self.duration
                );
            }
            let specification = generator.generate_invocation_data(
                &function,
                iat_distribution,
                self.granularity,
            )?;
            expected += function.total_invocations() as u64;
            function.specification = Some(Arc::new(specification));
            scheduled.push(Arc::new(function));
        }

        let sink = MetricsSink::start(&self.output_path, expected)?;
        info!(
            "Replaying {} functions over {} windows, {} invocations \
             expected",
            scheduled.len(),
            self.duration,
            expected
        );

        let start = Instant::now();
        tokio::spawn(global_timekeeper(self.duration, self.granularity));

        let mut schedulers = JoinSet::new();
        for function in scheduled {
            let scheduler = FunctionScheduler::new(
                self.invoker.clone(),
                sink.records(),
                self.phase,
                self.granularity,
            );
            schedulers
                .spawn(async move { scheduler.replay(function, start).await });
        }

        // First barrier: every scheduler has drained its attempts.
        let mut tally = FunctionTally::default();
        let mut failures = Vec::new();
        while let Some(joined) = schedulers.join_next().await {
            match joined.context("A function scheduler panicked")? {
                Ok(function_tally) => {
                    tally.successful += function_tally.successful;
                    tally.failed += function_tally.failed;
                }
                Err(err) => failures.push(err),
            }
        }
        if !failures.is_empty() {
            return Err(anyhow!(
                "{} function schedulers failed:\n{}",
                failures.len(),
                IndividualErrorList::from(failures)
            ));
        }

        // Second barrier: every record has been durably written.
        let records_written = sink.wait_all_written().await?;

        let deferred_resolved = match &self.deferred {
            Some(adapter) if adapter.outstanding() > 0 => {
                self.resolve_deferred(adapter).await?
            }
            _ => 0,
        };

        Ok(RunSummary {
            issued: expected,
            successful: tally.successful,
            failed: tally.failed,
            records_written,
            deferred_resolved,
        })
    }

    /// Drains the pending-activation queue and writes the resolved rows
    /// through their own single-writer sink, to a sibling output file.
    async fn resolve_deferred(
        &self,
        adapter: &Arc<DeferredHttpInvoker>,
    ) -> Result<u64> {
        let outstanding = adapter.outstanding();
        info!("Resolving {} outstanding activations", outstanding);

        let resolved = adapter.resolve_outstanding().await;
        let path = self.output_path.with_extension("async.csv");
        let sink = MetricsSink::start(&path, resolved.len() as u64)?;
        let records = sink.records();
        for record in resolved {
            records
                .send(record)
                .expect("The deferred sink outlives this loop");
        }
        drop(records);
        sink.wait_all_written().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use model::domain::function::FunctionStats;
    use model::domain::specification::RuntimeSpecification;
    use model::dto::record::ExecutionRecord;

    use super::*;

    fn flat_stats(value: f64) -> FunctionStats {
        FunctionStats {
            average: value,
            count: 1_000,
            percentile0: value,
            percentile1: value,
            percentile25: value,
            percentile50: value,
            percentile75: value,
            percentile99: value,
            percentile100: value,
        }
    }

    fn traced_function(name: &str, invocations: Vec<usize>) -> Function {
        Function {
            name: name.to_string(),
            endpoint: "http://127.0.0.1:1".to_string(),
            invocations_per_minute: invocations,
            runtime_stats: flat_stats(100.0),
            memory_stats: flat_stats(256.0),
            specification: None,
        }
    }

    /// Fails every second invocation, so the run exercises both tallies.
    #[derive(Debug, Default)]
    struct FlakyInvoker {
        calls: AtomicU64,
    }

    #[async_trait]
    impl Invoker for FlakyInvoker {
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
            let failed = self.calls.fetch_add(1, Ordering::Relaxed) % 2 == 1;
            record.connection_timeout = failed;
            (!failed, record)
        }
    }

    fn output_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("{}_{}.csv", name, std::process::id()))
    }

    #[tokio::test]
    async fn every_invocation_is_recorded_exactly_once() {
        let path = output_path("experiment_exactly_once");
        let experiment = Experiment::new(
            Arc::new(FlakyInvoker::default()),
            None,
            Phase::Execution,
            TraceGranularity::Second,
            2,
            path.clone(),
        );

        let functions = vec![
            traced_function("replay-a", vec![1, 2]),
            traced_function("replay-b", vec![2, 1]),
        ];
        let summary = experiment
            .run(functions, 99, IatDistribution::Equidistant)
            .await
            .unwrap();

        assert_eq!(summary.issued, 6);
        assert_eq!(summary.records_written, 6);
        assert_eq!(summary.successful + summary.failed, 6);
        assert_eq!(summary.deferred_resolved, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows.len(), 6);

        // Within one function, every (minute, index) pair shows up once.
        for name in ["replay-a", "replay-b"] {
            let mut ids: Vec<&str> = rows
                .iter()
                .filter(|row| row.split(',').nth(1) == Some(name))
                .map(|row| row.split(',').nth(2).unwrap())
                .collect();
            assert_eq!(ids.len(), 3);
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 3);
        }

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn mismatched_trace_duration_is_fatal_before_replay() {
        let path = output_path("experiment_mismatch");
        let experiment = Experiment::new(
            Arc::new(FlakyInvoker::default()),
            None,
            Phase::Execution,
            TraceGranularity::Second,
            3,
            path.clone(),
        );

        let result = experiment
            .run(
                vec![traced_function("short", vec![1])],
                1,
                IatDistribution::Uniform,
            )
            .await;

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
