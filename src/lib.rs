pub mod configuration;
pub mod mechanics;
pub mod simulation;
pub mod symbolic;
pub mod visualization;

pub use symbolic::expr::{DynamicRegistry, Expr, Symbol};
pub use symbolic::solve::solve_linear;

pub use mechanics::body::Particle;
pub use mechanics::forces::{Force, ForceSet};
pub use mechanics::frame::{Axis, Frame, FrameVector};
pub use mechanics::kane::{EomBundle, KanesMethod};
pub use mechanics::msd::MassSpringDamper;
pub use mechanics::newton::force_balance;
pub use mechanics::point::Point;

pub use simulation::engine::Engine;
pub use simulation::params::Parameters;
pub use simulation::scenario::Scenario;
pub use simulation::states::Trajectory;
pub use simulation::system::{Specified, System};

pub use configuration::config::{
    EngineConfig, IntegratorConfig, ParametersConfig, ScenarioConfig,
};

pub use visualization::scene::{Scene, SceneDocument, VisualFrame};
pub use visualization::shapes::{Geometry, PerspectiveCamera, Shape};
