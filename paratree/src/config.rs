use std::time::Duration;

use paratree_core::{ParamValue, ParameterSet};

/// The engine-level settings every run needs, pulled out of a
/// [`ParameterSet`] once it has been populated from a parameter file and
/// CLI overrides (§4.9, §6). Declares its own keys with the defaults
/// below; unknown keys a client declares alongside these are left alone.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Number of worker processes (ranks `1..=workers`; the hub is rank 0).
    pub workers: usize,
    /// Node-pool size the hub seeds to before distributing (§4.7 step 2).
    pub initial_frontier_size: usize,
    /// Nodes processed per bounded-unit slice between message polls (§4.3).
    pub bounded_unit: usize,
    /// Wall-clock period between hub coordination ticks (§4.7).
    pub coord_period: Duration,
    /// `donor-threshold` in the load-balance test (§4.7).
    pub donor_threshold: f64,
    /// `receiver-threshold` in the load-balance test (§4.7).
    pub receiver_threshold: f64,
    /// Termination's `zero-threshold` on summed load (§4.7).
    pub zero_threshold: f64,
    /// `ρ`, the load metric's exponent (§4.7).
    pub load_exponent: f64,
    /// Bound on the shared solution pool's capacity (§4.5); 0 = unbounded.
    pub solution_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            workers: 1,
            initial_frontier_size: 4,
            bounded_unit: 8,
            coord_period: Duration::from_millis(50),
            donor_threshold: 2.0,
            receiver_threshold: 0.5,
            zero_threshold: 1e-9,
            load_exponent: 1.0,
            solution_capacity: 1,
        }
    }
}

impl RunConfig {
    /// Declares this config's keys, with their defaults, onto `params` so
    /// a parameter file or CLI override can address them by name.
    pub fn declare(params: &mut ParameterSet) {
        let defaults = RunConfig::default();
        params.declare("Workers", ParamValue::Int(defaults.workers as i64));
        params.declare(
            "InitialFrontierSize",
            ParamValue::Int(defaults.initial_frontier_size as i64),
        );
        params.declare("BoundedUnit", ParamValue::Int(defaults.bounded_unit as i64));
        params.declare(
            "CoordPeriodMs",
            ParamValue::Int(defaults.coord_period.as_millis() as i64),
        );
        params.declare("DonorThreshold", ParamValue::Real(defaults.donor_threshold));
        params.declare(
            "ReceiverThreshold",
            ParamValue::Real(defaults.receiver_threshold),
        );
        params.declare("ZeroThreshold", ParamValue::Real(defaults.zero_threshold));
        params.declare("LoadExponent", ParamValue::Real(defaults.load_exponent));
        params.declare(
            "SolutionCapacity",
            ParamValue::Int(defaults.solution_capacity as i64),
        );
    }

    /// Reads this config's keys back out of `params`, falling back to the
    /// default for any key missing or of the wrong kind.
    pub fn from_params(params: &ParameterSet) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            workers: get_int(params, "Workers").unwrap_or(defaults.workers as i64).max(1) as usize,
            initial_frontier_size: get_int(params, "InitialFrontierSize")
                .unwrap_or(defaults.initial_frontier_size as i64)
                .max(0) as usize,
            bounded_unit: get_int(params, "BoundedUnit")
                .unwrap_or(defaults.bounded_unit as i64)
                .max(1) as usize,
            coord_period: Duration::from_millis(
                get_int(params, "CoordPeriodMs")
                    .unwrap_or(defaults.coord_period.as_millis() as i64)
                    .max(1) as u64,
            ),
            donor_threshold: get_real(params, "DonorThreshold").unwrap_or(defaults.donor_threshold),
            receiver_threshold: get_real(params, "ReceiverThreshold")
                .unwrap_or(defaults.receiver_threshold),
            zero_threshold: get_real(params, "ZeroThreshold").unwrap_or(defaults.zero_threshold),
            load_exponent: get_real(params, "LoadExponent").unwrap_or(defaults.load_exponent),
            solution_capacity: get_int(params, "SolutionCapacity")
                .unwrap_or(defaults.solution_capacity as i64)
                .max(0) as usize,
        }
    }
}

fn get_int(params: &ParameterSet, key: &str) -> Option<i64> {
    match params.get(key) {
        Some(ParamValue::Int(v)) => Some(*v),
        _ => None,
    }
}

fn get_real(params: &ParameterSet, key: &str) -> Option<f64> {
    match params.get(key) {
        Some(ParamValue::Real(v)) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_defaults_round_trip_through_from_params() {
        let mut params = ParameterSet::new();
        RunConfig::declare(&mut params);
        let config = RunConfig::from_params(&params);
        assert_eq!(config.workers, 1);
        assert_eq!(config.initial_frontier_size, 4);
        assert_eq!(config.load_exponent, 1.0);
    }

    #[test]
    fn overridden_keys_are_picked_up() {
        let mut params = ParameterSet::new();
        RunConfig::declare(&mut params);
        params.read_args(&["Workers".to_string(), "4".to_string()]);
        params.read_args(&["DonorThreshold".to_string(), "3.5".to_string()]);
        let config = RunConfig::from_params(&params);
        assert_eq!(config.workers, 4);
        assert_eq!(config.donor_threshold, 3.5);
    }
}
