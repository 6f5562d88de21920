//! The mass-spring-damper model.
//!
//! A block of mass `m` hangs from a ceiling on a spring of stiffness `k`
//! with a parallel damper of coefficient `c`, under gravity `g`. The
//! coordinate `x` measures displacement down from the attachment point
//! (down is +x of the ceiling frame); the speed `v` is its derivative.
//!
//! Applied forces on the block, all along the ceiling's x axis:
//! gravity `m·g`, spring `−k·x`, damper `−c·v`.
//!
//! The equations of motion are derived twice: once by the direct Newton
//! force balance, once by Kane's method. Both live in the returned model
//! so callers can cross-check them before integrating.

use crate::symbolic::expr::{DynamicRegistry, Expr, Symbol};

use super::body::Particle;
use super::forces::{Force, ForceSet};
use super::frame::{Axis, Frame, FrameVector};
use super::kane::{EomBundle, FormationError, KanesMethod};
use super::newton::{force_balance, NewtonError};
use super::point::Point;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Formation(#[from] FormationError),

    #[error(transparent)]
    Newton(#[from] NewtonError),
}

/// The assembled model: symbols, geometry, and both derivations
pub struct MassSpringDamper {
    pub reg: DynamicRegistry,

    // states
    pub x: Symbol,
    pub v: Symbol,

    // constants
    pub mass: Symbol,
    pub gravity: Symbol,
    pub damping: Symbol,
    pub stiffness: Symbol,

    // geometry
    pub ceiling: Frame,
    pub origin: Point,
    pub block: Point,
    pub particle: Particle,

    /// Kane's-method equations of motion
    pub bundle: EomBundle,

    /// Newton-path state derivatives `[dx/dt, dv/dt]`, for cross-checking
    pub manual_rhs: Vec<Expr>,
}

impl MassSpringDamper {
    pub fn build() -> Result<Self, ModelError> {
        let mut reg = DynamicRegistry::new();
        let (x, xd) = reg.dynamic("x");
        let (v, _vd) = reg.dynamic("v");

        let mass = Symbol::new("m");
        let gravity = Symbol::new("g");
        let damping = Symbol::new("c");
        let stiffness = Symbol::new("k");

        // ceiling frame, origin at the attachment point, block hanging
        // x below it
        let ceiling = Frame::inertial("N");
        let origin = Point::fixed("O");
        let block = origin
            .locate("P", FrameVector::along(&ceiling, Axis::X, Expr::sym(&x)))
            .with_velocity(&ceiling, FrameVector::along(&ceiling, Axis::X, Expr::sym(&v)));
        let particle = Particle::new("block", &block, Expr::sym(&mass));

        // net applied force: gravity down, spring and damper opposing
        let along = |e: Expr| FrameVector::along(&ceiling, Axis::X, e);
        let forces = ForceSet::new().with(Force::new(
            &block,
            along(
                Expr::sym(&mass) * Expr::sym(&gravity)
                    - Expr::sym(&stiffness) * Expr::sym(&x)
                    - Expr::sym(&damping) * Expr::sym(&v),
            ),
        ));

        // manual Newton path: solve 0 = ΣF − m·a for v'
        let dvdt = force_balance(
            &particle, &forces, &origin, &ceiling, Axis::X, &x, &v, &reg,
        )?;
        let manual_rhs = vec![Expr::sym(&v), dvdt];

        // Kane path: kinematic equation x' = v, then the full bundle
        let kindiffs = vec![Expr::Sym(xd) - Expr::sym(&v)];
        let kane = KanesMethod::new(
            &ceiling,
            &origin,
            vec![x.clone()],
            vec![v.clone()],
            &kindiffs,
            reg.clone(),
        )?;
        let bundle = kane.kanes_equations(&[particle.clone()], &forces)?;

        Ok(MassSpringDamper {
            reg,
            x,
            v,
            mass,
            gravity,
            damping,
            stiffness,
            ceiling,
            origin,
            block,
            particle,
            bundle,
            manual_rhs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kane_bundle_has_expected_shape() {
        let model = MassSpringDamper::build().unwrap();
        let b = &model.bundle;
        assert_eq!(b.dim(), 2);

        // kinematic row: 1 * x' = v
        assert_eq!(b.mass_matrix[0][0], Expr::one());
        assert_eq!(b.forcing[0], Expr::sym(&model.v));

        // dynamic row: m * v' = m*g - k*x - c*v
        assert_eq!(b.mass_matrix[1][1], Expr::sym(&model.mass));
        assert!(b.mass_matrix[1][0].is_zero());
    }

    #[test]
    fn both_derivations_agree() {
        let model = MassSpringDamper::build().unwrap();
        assert!(model
            .bundle
            .state_derivatives_agree(&model.manual_rhs, 1e-9));
    }

    #[test]
    fn formation_is_constant_agnostic() {
        // constants appear symbolically; their numeric values are not
        // consulted during formation
        let a = MassSpringDamper::build().unwrap();
        let b = MassSpringDamper::build().unwrap();
        assert_eq!(a.bundle.mass_matrix, b.bundle.mass_matrix);
        assert_eq!(a.bundle.forcing, b.bundle.forcing);
    }
}
