//! Energy-system data model.
//!
//! An [`EnergySystem`] describes the assets of a local energy system over a
//! discrete time horizon: dispatchable generation, storage, demand, retail
//! (grid buy/sell) contracts, and network lines including candidate lines
//! that carry an investment decision.
//!
//! Cases are stored on disk as a single `system.toml` per case directory and
//! deserialized with serde.

use crate::error::{EmixError, EmixResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Discrete time horizon of the optimization.
///
/// `hours_per_period` is the power-to-energy conversion factor: a constant
/// power of 1 MW over one period amounts to `hours_per_period` MWh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Horizon {
    /// Number of periods in the horizon.
    pub periods: usize,
    /// Duration of each period in hours.
    #[serde(default = "default_hours_per_period")]
    pub hours_per_period: f64,
}

fn default_hours_per_period() -> f64 {
    1.0
}

/// A dispatchable generation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    /// Bus this unit is connected to.
    pub bus: String,
    pub max_power_mw: f64,
    #[serde(default)]
    pub min_power_mw: f64,
    /// Variable cost per MWh produced (fuel + O&M).
    pub linear_cost: f64,
    /// Fixed cost per period while committed.
    #[serde(default)]
    pub constant_cost: f64,
    #[serde(default)]
    pub startup_cost: f64,
    #[serde(default)]
    pub shutdown_cost: f64,
    /// Emission rate in tCO2 per MWh.
    #[serde(default)]
    pub co2_rate: f64,
    /// Emission price in currency per tCO2.
    #[serde(default)]
    pub emission_cost_per_ton: f64,
    /// Maximum upward change in output between periods (MW). Zero disables
    /// the ramp constraint.
    #[serde(default)]
    pub ramp_up_mw: f64,
    /// Maximum downward change in output between periods (MW).
    #[serde(default)]
    pub ramp_down_mw: f64,
}

/// An energy storage unit (battery, pumped hydro, thermal store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub name: String,
    pub bus: String,
    pub max_charge_mw: f64,
    pub max_discharge_mw: f64,
    pub capacity_mwh: f64,
    #[serde(default)]
    pub initial_soc_mwh: f64,
    /// Round-trip charge efficiency in (0, 1].
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Exogenous energy inflow per period (e.g. hydro), MWh.
    #[serde(default)]
    pub inflow_mwh: f64,
}

fn default_efficiency() -> f64 {
    1.0
}

/// An electricity demand with a per-period profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    pub name: String,
    pub bus: String,
    /// Demand per period in MW; length must equal the horizon.
    pub profile_mw: Vec<f64>,
    /// Flexible demands may be reshaped across the horizon as long as the
    /// total energy requirement is preserved; firm demands must be served
    /// per period as profiled.
    #[serde(default)]
    pub flexible: bool,
    /// Penalty for non-served energy, currency per MWh.
    #[serde(default = "default_nse_cost")]
    pub nse_cost: f64,
}

fn default_nse_cost() -> f64 {
    10_000.0
}

/// A retail contract for buying from / selling to the upstream market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retail {
    pub name: String,
    pub bus: String,
    /// Purchase price per period, currency per MWh.
    pub buy_price: Vec<f64>,
    /// Sale price per period, currency per MWh.
    pub sell_price: Vec<f64>,
    pub max_buy_mw: f64,
    pub max_sell_mw: f64,
}

/// A network line between two buses (DC approximation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub name: String,
    pub from_bus: String,
    pub to_bus: String,
    /// Susceptance in per-unit; flow = susceptance * angle difference.
    pub susceptance: f64,
    pub capacity_mw: f64,
    /// Candidate lines are not built yet; building one incurs `invest_cost`.
    #[serde(default)]
    pub candidate: bool,
    #[serde(default)]
    pub invest_cost: f64,
}

/// The full asset inventory of one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySystem {
    // Field order matters for TOML output: plain values (buses) must be
    // emitted before the horizon table and the asset arrays.
    pub buses: Vec<String>,
    pub horizon: Horizon,
    #[serde(default)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    pub storages: Vec<Storage>,
    #[serde(default)]
    pub demands: Vec<Demand>,
    #[serde(default)]
    pub retails: Vec<Retail>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl EnergySystem {
    /// Load a case from a `system.toml` file.
    pub fn from_toml_file(path: &Path) -> EmixResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let system: EnergySystem = toml::from_str(&contents)?;
        system.validate()?;
        Ok(system)
    }

    /// Validate cross-references and profile lengths.
    pub fn validate(&self) -> EmixResult<()> {
        if self.horizon.periods == 0 {
            return Err(EmixError::Validation("horizon has zero periods".into()));
        }
        if self.horizon.hours_per_period <= 0.0 {
            return Err(EmixError::Validation(
                "hours_per_period must be positive".into(),
            ));
        }
        if self.buses.is_empty() {
            return Err(EmixError::Validation("system has no buses".into()));
        }

        let has_bus = |bus: &str| self.buses.iter().any(|b| b == bus);
        let n = self.horizon.periods;

        for gen in &self.generators {
            if !has_bus(&gen.bus) {
                return Err(EmixError::Validation(format!(
                    "generator '{}' references unknown bus '{}'",
                    gen.name, gen.bus
                )));
            }
            if gen.min_power_mw > gen.max_power_mw {
                return Err(EmixError::Validation(format!(
                    "generator '{}' has min power above max power",
                    gen.name
                )));
            }
        }
        for st in &self.storages {
            if !has_bus(&st.bus) {
                return Err(EmixError::Validation(format!(
                    "storage '{}' references unknown bus '{}'",
                    st.name, st.bus
                )));
            }
            if st.efficiency <= 0.0 || st.efficiency > 1.0 {
                return Err(EmixError::Validation(format!(
                    "storage '{}' efficiency must be in (0, 1]",
                    st.name
                )));
            }
            if st.initial_soc_mwh > st.capacity_mwh {
                return Err(EmixError::Validation(format!(
                    "storage '{}' initial state of charge exceeds capacity",
                    st.name
                )));
            }
        }
        for dem in &self.demands {
            if !has_bus(&dem.bus) {
                return Err(EmixError::Validation(format!(
                    "demand '{}' references unknown bus '{}'",
                    dem.name, dem.bus
                )));
            }
            if dem.profile_mw.len() != n {
                return Err(EmixError::Validation(format!(
                    "demand '{}' profile has {} entries, horizon has {} periods",
                    dem.name,
                    dem.profile_mw.len(),
                    n
                )));
            }
        }
        for ret in &self.retails {
            if !has_bus(&ret.bus) {
                return Err(EmixError::Validation(format!(
                    "retail '{}' references unknown bus '{}'",
                    ret.name, ret.bus
                )));
            }
            if ret.buy_price.len() != n || ret.sell_price.len() != n {
                return Err(EmixError::Validation(format!(
                    "retail '{}' price profiles must have {} entries",
                    ret.name, n
                )));
            }
        }
        for line in &self.lines {
            if !has_bus(&line.from_bus) || !has_bus(&line.to_bus) {
                return Err(EmixError::Validation(format!(
                    "line '{}' references an unknown bus",
                    line.name
                )));
            }
            if line.from_bus == line.to_bus {
                return Err(EmixError::Validation(format!(
                    "line '{}' connects a bus to itself",
                    line.name
                )));
            }
        }
        Ok(())
    }

    /// Index of a bus name, if present.
    pub fn bus_index(&self, bus: &str) -> Option<usize> {
        self.buses.iter().position(|b| b == bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_system() -> EnergySystem {
        EnergySystem {
            horizon: Horizon {
                periods: 2,
                hours_per_period: 1.0,
            },
            buses: vec!["b1".into(), "b2".into()],
            generators: vec![Generator {
                name: "gas".into(),
                bus: "b1".into(),
                max_power_mw: 100.0,
                min_power_mw: 10.0,
                linear_cost: 50.0,
                constant_cost: 0.0,
                startup_cost: 0.0,
                shutdown_cost: 0.0,
                co2_rate: 0.4,
                emission_cost_per_ton: 25.0,
                ramp_up_mw: 0.0,
                ramp_down_mw: 0.0,
            }],
            storages: vec![],
            demands: vec![Demand {
                name: "load".into(),
                bus: "b2".into(),
                profile_mw: vec![40.0, 60.0],
                flexible: false,
                nse_cost: 10_000.0,
            }],
            retails: vec![],
            lines: vec![Line {
                name: "l12".into(),
                from_bus: "b1".into(),
                to_bus: "b2".into(),
                susceptance: 10.0,
                capacity_mw: 80.0,
                candidate: false,
                invest_cost: 0.0,
            }],
        }
    }

    #[test]
    fn valid_system_passes_validation() {
        assert!(two_bus_system().validate().is_ok());
    }

    #[test]
    fn unknown_bus_is_rejected() {
        let mut system = two_bus_system();
        system.generators[0].bus = "nowhere".into();
        let err = system.validate().unwrap_err();
        assert!(err.to_string().contains("unknown bus"));
    }

    #[test]
    fn profile_length_mismatch_is_rejected() {
        let mut system = two_bus_system();
        system.demands[0].profile_mw = vec![40.0];
        assert!(system.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let system = two_bus_system();
        let text = toml::to_string(&system).unwrap();
        let parsed: EnergySystem = toml::from_str(&text).unwrap();
        assert_eq!(parsed.buses, system.buses);
        assert_eq!(parsed.generators.len(), 1);
        assert_eq!(parsed.demands[0].profile_mw, vec![40.0, 60.0]);
    }

    #[test]
    fn flexible_defaults_to_false_and_round_trips() {
        let text = r#"
buses = ["b1"]

[horizon]
periods = 1

[[demands]]
name = "firm"
bus = "b1"
profile_mw = [5.0]

[[demands]]
name = "shiftable"
bus = "b1"
profile_mw = [5.0]
flexible = true
"#;
        let parsed: EnergySystem = toml::from_str(text).unwrap();
        assert!(!parsed.demands[0].flexible);
        assert!(parsed.demands[1].flexible);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.toml");
        std::fs::write(&path, toml::to_string(&two_bus_system()).unwrap()).unwrap();
        let system = EnergySystem::from_toml_file(&path).unwrap();
        assert_eq!(system.horizon.periods, 2);
    }
}
