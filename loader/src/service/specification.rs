use anyhow::{bail, Context, Result};
use model::domain::function::{Function, FunctionStats};
use model::domain::specification::{
    FunctionSpecification, IatDistribution, RuntimeSpecification,
    TraceGranularity, MAX_EXEC_TIME_MILLI, MAX_MEM_QUOTA_MIB,
    MIN_EXEC_TIME_MILLI, MIN_MEM_QUOTA_MIB,
};
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;
use rand_pcg::Pcg64;

/// Quantile bucket boundaries, mapped onto the profile's stored
/// percentiles {0, 1, 25, 50, 75, 99, 100}. The runtime table tops its
/// p75..p99 bucket out at 0.95, the memory table at 0.99.
const RUNTIME_QUANTILES: [f64; 7] = [0.0, 0.01, 0.25, 0.50, 0.75, 0.95, 1.0];
const MEMORY_QUANTILES: [f64; 7] = [0.0, 0.01, 0.25, 0.50, 0.75, 0.99, 1.0];

/// Turns per-window invocation counts and percentile profiles into
/// concrete inter-arrival times and runtime/memory requests. Two
/// independently seeded sources keep the IAT stream and the resource
/// stream reproducible for a fixed seed.
pub struct SpecificationGenerator {
    iat_rand:  Pcg64,
    spec_rand: Pcg64,
}

impl SpecificationGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            iat_rand:  Pcg64::seed_from_u64(seed),
            spec_rand: Pcg64::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    pub fn generate_invocation_data(
        &mut self,
        function: &Function,
        iat_distribution: IatDistribution,
        granularity: TraceGranularity,
    ) -> Result<FunctionSpecification> {
        let mut specification = FunctionSpecification::default();

        for (minute, &count) in
            function.invocations_per_minute.iter().enumerate()
        {
            let (iats, raw_duration) = self
                .generate_iats(count, iat_distribution, granularity)
                .with_context(|| {
                    format!(
                        "Failed to generate the IATs of minute {} of \
                         function {}",
                        minute, function.name
                    )
                })?;
            specification.iats.push(iats);
            specification.raw_durations.push(raw_duration);

            let mut runtimes = Vec::with_capacity(count);
            for _ in 0..count {
                runtimes.push(self.generate_execution_spec(function)?);
            }
            specification.runtimes.push(runtimes);
        }

        Ok(specification)
    }

    /// One window's gaps. Uniform and Exponential draws are divided by
    /// their own total and multiplied by the window length, so the drawn
    /// gaps sum to the window exactly and never spill into the next one;
    /// the returned raw duration is the pre-normalization total.
    fn generate_iats(
        &mut self,
        count: usize,
        iat_distribution: IatDistribution,
        granularity: TraceGranularity,
    ) -> Result<(Vec<f64>, f64)> {
        if count == 0 {
            return Ok((Vec::new(), 0.0));
        }

        let window = granularity.window_micro();
        let mut iats = Vec::with_capacity(count + 1);
        let mut total = 0.0;

        for _ in 0..count {
            let iat: f64 = match iat_distribution {
                IatDistribution::Equidistant => window / count as f64,
                IatDistribution::Uniform => self.iat_rand.gen(),
                IatDistribution::Exponential => self.iat_rand.sample(Exp1),
            };
            if iat == 0.0 {
                bail!(
                    "Generated an IAT equal to zero, the clock precision \
                     is insufficient"
                );
            }
            total += iat;
            iats.push(iat);
        }

        if matches!(
            iat_distribution,
            IatDistribution::Uniform | IatDistribution::Exponential
        ) {
            for iat in iats.iter_mut() {
                *iat = *iat / total * window;
            }
        }

        // The first invocation of a window fires at the window start; the
        // zero-length entry is not part of the normalization.
        iats.insert(0, 0.0);

        Ok((iats, total))
    }

    fn generate_execution_spec(
        &mut self,
        function: &Function,
    ) -> Result<RuntimeSpecification> {
        let runtime = Self::sample_profile(
            &mut self.spec_rand,
            &function.runtime_stats,
            &RUNTIME_QUANTILES,
        )
        .with_context(|| {
            format!(
                "Failed to sample a runtime for function {}",
                function.name
            )
        })?;
        let memory = Self::sample_profile(
            &mut self.spec_rand,
            &function.memory_stats,
            &MEMORY_QUANTILES,
        )
        .with_context(|| {
            format!(
                "Failed to sample a memory quota for function {}",
                function.name
            )
        })?;

        Ok(RuntimeSpecification {
            runtime_milli: (runtime as u32)
                .clamp(MIN_EXEC_TIME_MILLI, MAX_EXEC_TIME_MILLI),
            memory_mib:    (memory as u32)
                .clamp(MIN_MEM_QUOTA_MIB, MAX_MEM_QUOTA_MIB),
        })
    }

    /// Piecewise reconstruction of the empirical distribution: select the
    /// bucket a uniform quantile falls into, then pick uniformly between
    /// the bucket's stored percentiles. Equal bounds yield that value
    /// exactly.
    fn sample_profile(
        rand: &mut Pcg64,
        stats: &FunctionStats,
        quantiles: &[f64; 7],
    ) -> Result<f64> {
        if stats.count <= 0 {
            bail!("The percentile profile has no samples to draw from");
        }

        let values = [
            stats.percentile0,
            stats.percentile1,
            stats.percentile25,
            stats.percentile50,
            stats.percentile75,
            stats.percentile99,
            stats.percentile100,
        ];

        let quantile: f64 = rand.gen();
        for bucket in 1..quantiles.len() {
            if quantile < quantiles[bucket] {
                let (low, high) = (values[bucket - 1], values[bucket]);
                return Ok(if low < high {
                    rand.gen_range(low..high)
                } else {
                    low
                });
            }
        }
        Ok(values[values.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::*;

    fn profiled_function(invocations: Vec<usize>) -> Function {
        Function {
            name: "profiled".to_string(),
            endpoint: String::new(),
            invocations_per_minute: invocations,
            runtime_stats: FunctionStats {
                average: 120.0,
                count: 10_000,
                percentile0: 10.0,
                percentile1: 20.0,
                percentile25: 50.0,
                percentile50: 100.0,
                percentile75: 200.0,
                percentile99: 500.0,
                percentile100: 1_000.0,
            },
            memory_stats: FunctionStats {
                average: 400.0,
                count: 10_000,
                percentile0: 150.0,
                percentile1: 170.0,
                percentile25: 256.0,
                percentile50: 400.0,
                percentile75: 512.0,
                percentile99: 1_024.0,
                percentile100: 2_048.0,
            },
            specification: None,
        }
    }

    #[test]
    fn equidistant_spacing_is_exact() {
        let mut generator = SpecificationGenerator::new(42);
        let specification = generator
            .generate_invocation_data(
                &profiled_function(vec![5]),
                IatDistribution::Equidistant,
                TraceGranularity::Minute,
            )
            .unwrap();

        assert_eq!(
            specification.iats[0],
            vec![
                0.0,
                12_000_000.0,
                12_000_000.0,
                12_000_000.0,
                12_000_000.0,
                12_000_000.0,
            ]
        );
    }

    #[parameterized(
        equidistant = { IatDistribution::Equidistant },
        uniform = { IatDistribution::Uniform },
        exponential = { IatDistribution::Exponential },
    )]
    fn iats_never_overflow_the_window(distribution: IatDistribution) {
        let mut generator = SpecificationGenerator::new(7);
        let specification = generator
            .generate_invocation_data(
                &profiled_function(vec![1, 17, 60, 250]),
                distribution,
                TraceGranularity::Minute,
            )
            .unwrap();

        for (minute, iats) in specification.iats.iter().enumerate() {
            let sum: f64 = iats.iter().sum();
            assert!(
                sum <= 60_000_000.0 + 1e-3,
                "minute {} overflows its window: {}",
                minute,
                sum
            );
            assert_eq!(iats[0], 0.0);
        }
    }

    #[parameterized(
        equidistant = { IatDistribution::Equidistant },
        uniform = { IatDistribution::Uniform },
        exponential = { IatDistribution::Exponential },
    )]
    fn generation_is_deterministic_per_seed(distribution: IatDistribution) {
        let function = profiled_function(vec![3, 0, 25]);

        let first = SpecificationGenerator::new(1234)
            .generate_invocation_data(
                &function,
                distribution,
                TraceGranularity::Minute,
            )
            .unwrap();
        let second = SpecificationGenerator::new(1234)
            .generate_invocation_data(
                &function,
                distribution,
                TraceGranularity::Minute,
            )
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn runtime_and_memory_are_clamped() {
        let mut function = profiled_function(vec![500]);
        function.runtime_stats.percentile0 = 0.0;
        function.runtime_stats.percentile100 = 1_000_000.0;
        function.memory_stats.percentile0 = 1.0;
        function.memory_stats.percentile100 = 100_000.0;

        let mut generator = SpecificationGenerator::new(99);
        let specification = generator
            .generate_invocation_data(
                &function,
                IatDistribution::Exponential,
                TraceGranularity::Minute,
            )
            .unwrap();

        for spec in specification.runtimes.iter().flatten() {
            assert!(spec.runtime_milli >= MIN_EXEC_TIME_MILLI);
            assert!(spec.runtime_milli <= MAX_EXEC_TIME_MILLI);
            assert!(spec.memory_mib >= MIN_MEM_QUOTA_MIB);
            assert!(spec.memory_mib <= MAX_MEM_QUOTA_MIB);
        }
    }

    #[test]
    fn zero_invocation_windows_stay_empty() {
        let mut generator = SpecificationGenerator::new(5);
        let specification = generator
            .generate_invocation_data(
                &profiled_function(vec![0, 3, 0]),
                IatDistribution::Uniform,
                TraceGranularity::Minute,
            )
            .unwrap();

        assert!(specification.iats[0].is_empty());
        // Leading zero entry plus one drawn gap per invocation.
        assert_eq!(specification.iats[1].len(), 4);
        assert!(specification.iats[2].is_empty());
        assert_eq!(specification.raw_durations.len(), 3);
        assert_eq!(specification.raw_durations[0], 0.0);
        assert_eq!(specification.runtimes[1].len(), 3);
    }

    #[test]
    fn degenerate_profile_returns_the_percentile_exactly() {
        let mut function = profiled_function(vec![20]);
        function.runtime_stats = FunctionStats {
            average: 300.0,
            count: 50,
            percentile0: 300.0,
            percentile1: 300.0,
            percentile25: 300.0,
            percentile50: 300.0,
            percentile75: 300.0,
            percentile99: 300.0,
            percentile100: 300.0,
        };

        let mut generator = SpecificationGenerator::new(17);
        let specification = generator
            .generate_invocation_data(
                &function,
                IatDistribution::Uniform,
                TraceGranularity::Minute,
            )
            .unwrap();

        for spec in specification.runtimes[0].iter() {
            assert_eq!(spec.runtime_milli, 300);
        }
    }

    #[test]
    fn profile_without_samples_is_rejected() {
        let mut function = profiled_function(vec![1]);
        function.runtime_stats.count = 0;

        let result = SpecificationGenerator::new(3)
            .generate_invocation_data(
                &function,
                IatDistribution::Uniform,
                TraceGranularity::Minute,
            );

        assert!(result.is_err());
    }
}
