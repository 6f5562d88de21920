//! High-level runtime engine settings
//!
//! Selects the integrator used when advancing a `System` over its
//! time grid

use crate::configuration::config::IntegratorConfig;

#[derive(Debug, Clone)]
pub struct Engine {
    pub integrator: IntegratorConfig, // rk4 or rkf45
}
