use std::time::Duration;

/// Tunables for the simulated build.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Wall-clock length of one build unit. Reported build time is in units.
    pub time_unit: Duration,
    /// Shortest build, in units.
    pub min_units: u64,
    /// Longest build, in units.
    pub max_units: u64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            min_units: 1,
            max_units: 10,
        }
    }
}

impl AssemblyConfig {
    /// Inclusive bounds of the build length, tolerating swapped limits.
    pub(crate) fn unit_bounds(&self) -> (u64, u64) {
        let low = self.min_units.min(self.max_units);
        let high = self.min_units.max(self.max_units);
        (low, high)
    }
}
