use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use invoker::Invoker;
use model::domain::function::Function;
use model::domain::specification::{RuntimeSpecification, TraceGranularity};
use model::dto::record::{ExecutionRecord, Phase};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

/// Final success/failure tally of one function's replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FunctionTally {
    pub successful: u64,
    pub failed:     u64,
}

/// Shared by every in-flight attempt of one function, hence atomic.
#[derive(Debug, Default)]
struct AtomicTally {
    successful: AtomicU64,
    failed:     AtomicU64,
}

impl AtomicTally {
    fn snapshot(&self) -> FunctionTally {
        FunctionTally {
            successful: self.successful.load(Ordering::Relaxed),
            failed:     self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Walks one function's generated specification window by window, firing
/// every scheduled invocation at its generated offset. Suspension between
/// two slots is purely time-based: attempts overlap on purpose, the trace
/// prescribes bursty concurrent arrival, not request/response lockstep.
#[derive(Debug)]
pub struct FunctionScheduler {
    invoker:     Arc<dyn Invoker>,
    records:     UnboundedSender<ExecutionRecord>,
    phase:       Phase,
    granularity: TraceGranularity,
}

impl FunctionScheduler {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        records: UnboundedSender<ExecutionRecord>,
        phase: Phase,
        granularity: TraceGranularity,
    ) -> Self {
        Self { invoker, records, phase, granularity }
    }

    /// Replays the whole trace for one function, then drains every attempt
    /// it launched before reporting the tally. All waiting targets
    /// absolute instants derived from `start`, so timing never drifts with
    /// the number of events fired.
    pub async fn replay(
        &self,
        function: Arc<Function>,
        start: Instant,
    ) -> Result<FunctionTally> {
        let specification = function
            .specification
            .clone()
            .with_context(|| {
                format!(
                    "Function {} has no generated specification",
                    function.name
                )
            })?;

        let window = self.granularity.window();
        let tally = Arc::new(AtomicTally::default());
        let mut attempts = JoinSet::new();

        for (minute, iats) in specification.iats.iter().enumerate() {
            let minute_start = start + window * minute as u32;

            if iats.is_empty() {
                // Nothing scheduled: suspend for the whole window.
                sleep_until(minute_start + window).await;
                continue;
            }

            let count = specification.runtimes[minute].len();
            let mut offset = 0.0;
            for (index, iat) in iats.iter().enumerate() {
                offset += iat;
                sleep_until(
                    minute_start + Duration::from_micros(offset as u64),
                )
                .await;

                if index < count {
                    attempts.spawn(Self::attempt(
                        self.invoker.clone(),
                        self.records.clone(),
                        tally.clone(),
                        function.clone(),
                        specification.runtimes[minute][index],
                        self.phase,
                        minute,
                        index,
                    ));
                }
            }
        }

        debug!(
            "Function {} fired its whole trace, draining attempts",
            function.name
        );
        while let Some(joined) = attempts.join_next().await {
            joined.context("An invocation attempt panicked")?;
        }

        Ok(tally.snapshot())
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        invoker: Arc<dyn Invoker>,
        records: UnboundedSender<ExecutionRecord>,
        tally: Arc<AtomicTally>,
        function: Arc<Function>,
        spec: RuntimeSpecification,
        phase: Phase,
        minute: usize,
        index: usize,
    ) {
        let (success, record) = invoker
            .invoke(&function, &spec, phase, minute, index)
            .await;

        if success {
            tally.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            tally.failed.fetch_add(1, Ordering::Relaxed);
        }

        records
            .send(record)
            .expect("The metrics sink outlives every attempt");
    }
}

/// Trace-wide heartbeat, one tick per window. Purely informative, nothing
/// waits on it.
pub async fn global_timekeeper(
    duration: usize,
    granularity: TraceGranularity,
) {
    let mut interval = tokio::time::interval(granularity.window());
    // The first tick of an interval completes immediately.
    interval.tick().await;

    for minute in 0..duration {
        interval.tick().await;
        info!("Trace window {}/{} elapsed", minute + 1, duration);
    }
    info!("The trace duration elapsed, timekeeper out");
}
