use std::time::Duration;

use model::domain::specification::RuntimeSpecification;

/// Client-side tuning shared by the HTTP adapters.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Budget for reaching the platform at all, milliseconds.
    pub connection_grace_milli: u64,
    /// The completion deadline is this many times the requested runtime,
    /// on top of the connection grace.
    pub deadline_multiplier: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self { connection_grace_milli: 5_000, deadline_multiplier: 5 }
    }
}

impl Configuration {
    pub fn deadline(&self, spec: &RuntimeSpecification) -> Duration {
        Duration::from_millis(
            self.connection_grace_milli
                + u64::from(spec.runtime_milli) * self.deadline_multiplier,
        )
    }

    pub fn submission_deadline(&self) -> Duration {
        Duration::from_millis(self.connection_grace_milli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_scales_with_the_requested_runtime() {
        let configuration = Configuration {
            connection_grace_milli: 1_000,
            deadline_multiplier:    3,
        };
        let spec =
            RuntimeSpecification { runtime_milli: 2_000, memory_mib: 128 };
        assert_eq!(
            configuration.deadline(&spec),
            Duration::from_millis(7_000)
        );
    }
}
