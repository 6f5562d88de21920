//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – engine options (integrator selection)
//! - [`ParametersConfig`] – time grid and integrator tolerances
//! - [`ScenarioConfig`]   – top-level wrapper: numeric constants, initial
//!   conditions, and where to write the scene document
//!
//! # YAML format
//! A scenario YAML matching these types:
//!
//! ```yaml
//! engine:
//!   integrator: "rk4"       # or "rkf45"
//!
//! parameters:
//!   t_end: 8.0              # total simulation time
//!   samples: 100            # output grid points (including t = 0)
//!   atol: 1.0e-8            # absolute error tolerance (rkf45)
//!   rtol: 1.0e-8            # relative error tolerance (rkf45)
//!
//! constants:
//!   m: 10.0                 # block mass
//!   g: 9.8                  # gravitational acceleration
//!   c: 5.0                  # damping coefficient
//!   k: 10.0                 # spring stiffness
//!
//! initial_conditions:
//!   x: 0.0                  # displacement below the ceiling
//!   v: 0.0                  # speed
//!
//! scene_output: "scene.json"
//! ```
//!
//! Symbol names are resolved against the model when the runtime scenario
//! is built; an unknown name is a configuration error, not a default.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Which integrator method is used by the engine
/// integrator: "rk4" or "rkf45"
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorConfig {
    #[serde(rename = "rk4")] // Classical 4th-order Runge-Kutta, one fixed step per grid interval
    Rk4,

    #[serde(rename = "rkf45")] // Embedded Runge-Kutta-Fehlberg 4(5), adaptive substeps between grid points
    Rkf45,
}

/// High-level engine configuration
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    pub integrator: IntegratorConfig, // time integrator used for advancing the system state
}

/// Time grid and numerical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub t_end: f64,     // total simulation time
    pub samples: usize, // number of output grid points, including t = 0
    pub atol: f64,      // absolute error tolerance
    pub rtol: f64,      // relative error tolerance
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,                     // engine-level configuration
    pub parameters: ParametersConfig,             // time grid and tolerances
    pub constants: BTreeMap<String, f64>,         // numeric value per constant symbol
    pub initial_conditions: BTreeMap<String, f64>, // initial value per state symbol
    pub scene_output: Option<String>,             // where to write the scene JSON
}
