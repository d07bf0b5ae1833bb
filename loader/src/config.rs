use std::env::var;

use anyhow::{bail, Context, Result};
use helper::{env_load, env_var};
use model::domain::specification::{IatDistribution, TraceGranularity};
use model::dto::record::Phase;
use nutype::nutype;

env_var!(GATEWAY_URL);
env_var!(OUTPUT_PATH);
env_var!(TRACE_DURATION);
env_var!(FUNCTION_COUNT);
env_var!(INVOCATIONS_PER_MINUTE);
env_var!(IAT_DISTRIBUTION);
env_var!(TRACE_GRANULARITY);
env_var!(EXPERIMENT_PHASE);
env_var!(RANDOM_SEED);
env_var!(DEFERRED_RESOLUTION);
env_var!(FUNCTION_RUNTIME_MILLI);
env_var!(FUNCTION_MEMORY_MIB);

#[nutype(derive(Clone, Copy, Debug), validate(greater_or_equal = 1))]
pub struct TraceDuration(usize);

#[nutype(derive(Clone, Copy, Debug), validate(greater_or_equal = 1))]
pub struct FunctionCount(usize);

#[nutype(derive(Clone, Debug), validate(not_empty))]
pub struct GatewayUrl(String);

/// The whole run configuration, read from the environment once at start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway:     GatewayUrl,
    pub output_path: String,

    pub duration:               TraceDuration,
    pub function_count:         FunctionCount,
    pub invocations_per_minute: usize,

    pub iat_distribution: IatDistribution,
    pub granularity:      TraceGranularity,
    pub phase:            Phase,
    pub seed:             u64,

    pub deferred_resolution: bool,
    pub runtime_milli:       u32,
    pub memory_mib:          u32,
}

impl Settings {
    pub fn load_from_env() -> Result<Self> {
        let gateway = env_load!(GatewayUrl, GATEWAY_URL);
        let output_path = var(OUTPUT_PATH)
            .unwrap_or_else(|_| "loader_output.csv".to_string());

        let duration = TraceDuration::try_new(
            var(TRACE_DURATION)
                .unwrap_or_else(|_| "1".to_string())
                .parse::<usize>()
                .context("TRACE_DURATION is not an integer")?,
        )
        .context("TRACE_DURATION must cover at least one window")?;
        let function_count = FunctionCount::try_new(
            var(FUNCTION_COUNT)
                .unwrap_or_else(|_| "1".to_string())
                .parse::<usize>()
                .context("FUNCTION_COUNT is not an integer")?,
        )
        .context("FUNCTION_COUNT must name at least one function")?;
        let invocations_per_minute = var(INVOCATIONS_PER_MINUTE)
            .unwrap_or_else(|_| "60".to_string())
            .parse::<usize>()
            .context("INVOCATIONS_PER_MINUTE is not an integer")?;

        let iat_distribution = parse_distribution(
            &var(IAT_DISTRIBUTION)
                .unwrap_or_else(|_| "exponential".to_string()),
        )?;
        let granularity = parse_granularity(
            &var(TRACE_GRANULARITY).unwrap_or_else(|_| "minute".to_string()),
        )?;
        let phase = parse_phase(
            &var(EXPERIMENT_PHASE)
                .unwrap_or_else(|_| "execution".to_string()),
        )?;
        let seed = var(RANDOM_SEED)
            .unwrap_or_else(|_| "42".to_string())
            .parse::<u64>()
            .context("RANDOM_SEED is not an integer")?;

        let deferred_resolution = var(DEFERRED_RESOLUTION)
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .context("DEFERRED_RESOLUTION is not a boolean")?;
        let runtime_milli = var(FUNCTION_RUNTIME_MILLI)
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u32>()
            .context("FUNCTION_RUNTIME_MILLI is not an integer")?;
        let memory_mib = var(FUNCTION_MEMORY_MIB)
            .unwrap_or_else(|_| "256".to_string())
            .parse::<u32>()
            .context("FUNCTION_MEMORY_MIB is not an integer")?;

        Ok(Self {
            gateway,
            output_path,
            duration,
            function_count,
            invocations_per_minute,
            iat_distribution,
            granularity,
            phase,
            seed,
            deferred_resolution,
            runtime_milli,
            memory_mib,
        })
    }
}

fn parse_distribution(tag: &str) -> Result<IatDistribution> {
    Ok(match tag.to_lowercase().as_str() {
        "equidistant" => IatDistribution::Equidistant,
        "uniform" => IatDistribution::Uniform,
        "exponential" => IatDistribution::Exponential,
        other => bail!("Unsupported IAT distribution {}", other),
    })
}

fn parse_granularity(tag: &str) -> Result<TraceGranularity> {
    Ok(match tag.to_lowercase().as_str() {
        "minute" => TraceGranularity::Minute,
        "second" => TraceGranularity::Second,
        other => bail!("Unsupported trace granularity {}", other),
    })
}

fn parse_phase(tag: &str) -> Result<Phase> {
    Ok(match tag.to_lowercase().as_str() {
        "warmup" => Phase::Warmup,
        "execution" => Phase::Execution,
        other => bail!("Unsupported experiment phase {}", other),
    })
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::*;

    #[parameterized(
        equidistant = { "Equidistant", IatDistribution::Equidistant },
        uniform = { "uniform", IatDistribution::Uniform },
        exponential = { "EXPONENTIAL", IatDistribution::Exponential },
    )]
    fn known_distributions_parse(tag: &str, expected: IatDistribution) {
        assert_eq!(parse_distribution(tag).unwrap(), expected);
    }

    #[test]
    fn unsupported_distribution_is_refused() {
        assert!(parse_distribution("gaussian").is_err());
    }

    #[test]
    fn granularity_and_phase_parse() {
        assert_eq!(
            parse_granularity("second").unwrap(),
            TraceGranularity::Second
        );
        assert!(parse_granularity("hour").is_err());
        assert_eq!(parse_phase("warmup").unwrap(), Phase::Warmup);
        assert!(parse_phase("cooldown").is_err());
    }

    #[test]
    fn an_empty_trace_is_refused() {
        assert!(TraceDuration::try_new(0).is_err());
        assert!(TraceDuration::try_new(1).is_ok());
    }
}
