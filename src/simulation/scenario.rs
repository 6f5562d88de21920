//! Build a fully-initialized simulation scenario from configuration.
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! consumed by `main`:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the mass-spring-damper model with both derivations
//! - a `System` with every constant and initial condition bound
//! - a `Scene` binding the model's geometry to renderable shapes
//!
//! Config keys are symbol *names*; they are resolved against the model's
//! equations here, and an unknown or missing name is an error rather than
//! a default value.

use thiserror::Error;

use crate::configuration::config::ScenarioConfig;
use crate::mechanics::msd::{MassSpringDamper, ModelError};
use crate::symbolic::expr::{Expr, Symbol};
use crate::visualization::scene::{Scene, VisualFrame};
use crate::visualization::shapes::{Geometry, PerspectiveCamera, Shape};

use super::engine::Engine;
use super::params::Parameters;
use super::system::{System, SystemError};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("`{0}` does not name a constant of the model")]
    UnknownConstantName(String),

    #[error("`{0}` does not name a state of the model")]
    UnknownStateName(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Runtime bundle for one simulation run
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub system: System,
    pub scene: Scene,

    /// Newton-path state derivatives, kept for the pre-integration
    /// cross-check against the Kane bundle
    pub manual_rhs: Vec<Expr>,

    pub coordinate: Symbol,
    pub speed: Symbol,
    pub scene_output: Option<String>,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, ScenarioError> {
        let model = MassSpringDamper::build()?;

        // System: resolve config names against the bundle's symbols
        let mut system = System::new(model.bundle.clone());

        let constant_symbols = system.bundle().constant_symbols();
        for (name, value) in &cfg.constants {
            let sym = constant_symbols
                .iter()
                .find(|s| s.name() == name.as_str())
                .cloned()
                .ok_or_else(|| ScenarioError::UnknownConstantName(name.clone()))?;
            system.set_constant(&sym, *value)?;
        }

        let state_symbols = system.bundle().state_symbols();
        for (name, value) in &cfg.initial_conditions {
            let sym = state_symbols
                .iter()
                .find(|s| s.name() == name.as_str())
                .cloned()
                .ok_or_else(|| ScenarioError::UnknownStateName(name.clone()))?;
            system.set_initial_condition(&sym, *value)?;
        }

        // Scene: ceiling plane fixed at the origin, block as a sphere
        // tracking the particle; camera on the +z axis looking back at
        // the motion
        let camera = PerspectiveCamera::new("camera", [0.0, 0.0, 30.0]);
        let scene = Scene::new("mass-spring-damper", &model.ceiling, &model.origin, camera)
            .with(VisualFrame::new(
                "ceiling",
                &model.ceiling,
                &model.origin,
                Shape::new(
                    "ceiling",
                    "grey",
                    "default",
                    Geometry::Plane {
                        length: 4.0,
                        width: 4.0,
                    },
                ),
            ))
            .with(VisualFrame::new(
                "block",
                &model.ceiling,
                &model.block,
                Shape::new("block", "blue", "metal", Geometry::Sphere { radius: 1.0 }),
            ));

        Ok(Scenario {
            engine: Engine {
                integrator: cfg.engine.integrator,
            },
            parameters: Parameters {
                t_end: cfg.parameters.t_end,
                samples: cfg.parameters.samples,
                atol: cfg.parameters.atol,
                rtol: cfg.parameters.rtol,
            },
            system,
            scene,
            manual_rhs: model.manual_rhs,
            coordinate: model.x,
            speed: model.v,
            scene_output: cfg.scene_output,
        })
    }
}
