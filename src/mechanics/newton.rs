//! Manual equation derivation via Newton's second law.
//!
//! The direct path: project the force balance `0 = ΣF − m·a` onto one axis
//! of the inertial frame and solve symbolically for the speed's time
//! derivative. The automated path (Kane's method, `kane.rs`) must agree
//! with the result; the demo cross-checks the two before integrating.

use std::collections::HashMap;

use crate::symbolic::expr::{DynamicRegistry, Expr, Symbol};
use crate::symbolic::solve::{solve_linear, SolveError};

use super::body::Particle;
use super::forces::ForceSet;
use super::frame::{Axis, Frame, KinematicsError};
use super::point::Point;

#[derive(Debug, thiserror::Error)]
pub enum NewtonError {
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Solve the scalar force balance along `axis` of `frame` for the time
/// derivative of `speed`.
///
/// The particle's acceleration is derived from its velocity, with the
/// kinematic identity `q̇ = u` substituted so the balance is expressed in
/// the generalized speed. Returns the symbolic `du/dt`.
pub fn force_balance(
    particle: &Particle,
    forces: &ForceSet,
    origin: &Point,
    frame: &Frame,
    axis: Axis,
    coordinate: &Symbol,
    speed: &Symbol,
    reg: &DynamicRegistry,
) -> Result<Expr, NewtonError> {
    let i = axis.index();

    let net = forces.net_on(&particle.point, frame)?.components[i].clone();

    // a = dv/dt with q' rewritten as u at each step, leaving u' as the
    // only unknown derivative
    let mut kd: HashMap<Symbol, Expr> = HashMap::new();
    kd.insert(reg.derivative(coordinate), Expr::sym(speed));
    let vel = particle.point.velocity_in(origin, frame, reg)?.components[i].subs(&kd);
    let accel = reg.dt(&vel).subs(&kd);

    // 0 = ΣF - m*a, solved for u'
    let balance = net - &particle.mass * &accel;
    let udot = reg.derivative(speed);
    Ok(solve_linear(&balance, &udot)?)
}
