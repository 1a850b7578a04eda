//! Solver configuration.

use serde::{Deserialize, Serialize};

/// Options applied to every model before it is handed to CBC.
///
/// Model-specific switches (`subtour_elimination`, `integer_quantities`,
/// `big_m`) are ignored by models they do not concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Time limit in seconds, rounded up to whole seconds by CBC. `None`
    /// means no limit.
    pub time_limit: Option<f64>,
    /// Relative MIP gap tolerance. `None` uses the solver default.
    pub mip_gap: Option<f64>,
    /// Number of solver threads. `None` uses the solver default.
    pub threads: Option<u32>,
    /// Forward CBC's own log to stdout.
    pub solver_log: bool,
    /// Big-M constant for the scheduling model. `None` derives a tight value
    /// from the deadline and the largest communication weight.
    pub big_m: Option<f64>,
    /// Add Miller-Tucker-Zemlin rows to the routing models.
    pub subtour_elimination: bool,
    /// Restrict product quantities to whole units.
    pub integer_quantities: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            mip_gap: None,
            threads: None,
            solver_log: false,
            big_m: None,
            subtour_elimination: true,
            integer_quantities: false,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }

    pub fn with_threads(mut self, count: u32) -> Self {
        self.threads = Some(count);
        self
    }

    pub fn with_solver_log(mut self, enabled: bool) -> Self {
        self.solver_log = enabled;
        self
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    pub fn with_subtour_elimination(mut self, enabled: bool) -> Self {
        self.subtour_elimination = enabled;
        self
    }

    pub fn with_integer_quantities(mut self, enabled: bool) -> Self {
        self.integer_quantities = enabled;
        self
    }

    /// Raw CBC parameters for `CoinCbcProblem::set_parameter`. The time
    /// limit and MIP gap go through `good_lp`'s limit traits instead.
    pub fn cbc_parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("log", if self.solver_log { "1" } else { "0" }.to_string())];
        if let Some(threads) = self.threads {
            params.push(("threads", threads.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet_with_cuts() {
        let config = SolverConfig::default();
        assert!(config.subtour_elimination);
        assert!(!config.integer_quantities);
        assert_eq!(config.cbc_parameters(), vec![("log", "0".to_string())]);
    }

    #[test]
    fn builder_sets_parameters() {
        let config = SolverConfig::new()
            .with_time_limit(2.5)
            .with_mip_gap(0.01)
            .with_threads(4)
            .with_solver_log(true);
        assert_eq!(config.time_limit, Some(2.5));
        assert_eq!(config.mip_gap, Some(0.01));
        assert_eq!(
            config.cbc_parameters(),
            vec![("log", "1".to_string()), ("threads", "4".to_string())]
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{ "big_m": 500.0 }"#).unwrap();
        assert_eq!(config.big_m, Some(500.0));
        assert!(config.subtour_elimination);
        assert_eq!(config.time_limit, None);
    }
}
