use model::domain::function::{Function, FunctionStats};

fn flat_profile(value: f64) -> FunctionStats {
    FunctionStats {
        average: value,
        count: 1,
        percentile0: value,
        percentile1: value,
        percentile25: value,
        percentile50: value,
        percentile75: value,
        percentile99: value,
        percentile100: value,
    }
}

/// Builds the flat stress workload the binary can replay without an
/// external trace: every window schedules the same invocation count and
/// both profiles collapse to constants, so the generated specification is
/// fully determined by the IAT distribution and the seed.
pub fn stress_functions(
    count: usize,
    duration: usize,
    invocations_per_minute: usize,
    runtime_milli: u32,
    memory_mib: u32,
    gateway: &str,
) -> Vec<Function> {
    let gateway = gateway.trim_end_matches('/');
    (0..count)
        .map(|index| {
            let name = format!("stress-fn-{}", index);
            Function {
                endpoint: format!("{}/function/{}", gateway, name),
                name,
                invocations_per_minute: vec![
                    invocations_per_minute;
                    duration
                ],
                runtime_stats: flat_profile(f64::from(runtime_milli)),
                memory_stats: flat_profile(f64::from(memory_mib)),
                specification: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_flat_function_per_slot() {
        let functions =
            stress_functions(3, 5, 12, 800, 512, "http://gateway:8080/");

        assert_eq!(functions.len(), 3);
        for (index, function) in functions.iter().enumerate() {
            assert_eq!(function.name, format!("stress-fn-{}", index));
            assert_eq!(
                function.endpoint,
                format!("http://gateway:8080/function/stress-fn-{}", index)
            );
            assert_eq!(function.invocations_per_minute, vec![12; 5]);
            assert_eq!(function.total_invocations(), 60);
            assert_eq!(function.runtime_stats.percentile50, 800.0);
            assert_eq!(function.memory_stats.percentile50, 512.0);
            assert!(function.specification.is_none());
        }
    }
}
