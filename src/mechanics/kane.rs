//! Automated equation formation via Kane's method.
//!
//! Given independent generalized coordinates and speeds plus the kinematic
//! differential equations relating them, [`KanesMethod`] forms the
//! equations of motion for a set of particles under applied forces:
//!
//! 1. each particle's inertial velocity is expressed in the speeds,
//! 2. partial velocities `v_r = ∂v/∂u_r` are taken,
//! 3. applied and inertial forces are projected onto them
//!    (`F_r = Σ v_r·R`, `F_r* = Σ v_r·(−m·a)`),
//! 4. `F_r + F_r* = 0` is rearranged into `M·u̇ = f`.
//!
//! The result is an [`EomBundle`]: the full-state mass matrix and forcing
//! vector with `M · d(state)/dt = f(state)` over coordinates-then-speeds.

use std::collections::{BTreeSet, HashMap};

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::symbolic::expr::{DynamicRegistry, EvalError, Expr, Symbol};
use crate::symbolic::solve::{solve_linear, SolveError};

use super::body::Particle;
use super::forces::ForceSet;
use super::frame::{Frame, FrameVector, KinematicsError};
use super::point::Point;

#[derive(Debug, Error)]
pub enum FormationError {
    #[error("under-determined kinematics: {0}")]
    UnderDetermined(String),

    #[error("mass matrix is symbolically singular")]
    SingularMassMatrix,

    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Kane's method over a set of particles
#[derive(Debug)]
pub struct KanesMethod {
    inertial: Frame,
    origin: Point,
    coordinates: Vec<Symbol>,
    speeds: Vec<Symbol>,
    qdot_map: HashMap<Symbol, Expr>, // q' -> expression in (q, u)
    reg: DynamicRegistry,
}

impl KanesMethod {
    /// `kindiffs` are the kinematic differential equations, each an
    /// expression equal to zero (e.g. `x' - v`). They must uniquely relate
    /// every coordinate's derivative to the speeds.
    pub fn new(
        inertial: &Frame,
        origin: &Point,
        coordinates: Vec<Symbol>,
        speeds: Vec<Symbol>,
        kindiffs: &[Expr],
        reg: DynamicRegistry,
    ) -> Result<Self, FormationError> {
        if kindiffs.len() != coordinates.len() {
            return Err(FormationError::UnderDetermined(format!(
                "{} coordinates but {} kinematic equations",
                coordinates.len(),
                kindiffs.len()
            )));
        }

        // Solve each equation for one coordinate derivative
        let mut qdot_map: HashMap<Symbol, Expr> = HashMap::new();
        let mut used = vec![false; kindiffs.len()];
        for q in &coordinates {
            let qd = reg.derivative(q);
            let mut solved = None;
            for (i, eq) in kindiffs.iter().enumerate() {
                if used[i] || !eq.contains(&qd) {
                    continue;
                }
                if let Ok(e) = solve_linear(eq, &qd) {
                    solved = Some(e);
                    used[i] = true;
                    break;
                }
            }
            match solved {
                Some(e) => {
                    qdot_map.insert(qd, e);
                }
                None => {
                    return Err(FormationError::UnderDetermined(format!(
                        "no kinematic equation determines {qd}"
                    )))
                }
            }
        }

        // Eliminate coupled coordinate derivatives from the right-hand
        // sides, then verify none remain
        for _ in 0..coordinates.len() {
            let snapshot = qdot_map.clone();
            for rhs in qdot_map.values_mut() {
                *rhs = rhs.subs(&snapshot);
            }
        }
        for (qd, rhs) in &qdot_map {
            for other in qdot_map.keys() {
                if rhs.contains(other) {
                    return Err(FormationError::UnderDetermined(format!(
                        "{qd} resolves to an expression still involving {other}"
                    )));
                }
            }
        }

        Ok(KanesMethod {
            inertial: inertial.clone(),
            origin: origin.clone(),
            coordinates,
            speeds,
            qdot_map,
            reg,
        })
    }

    /// Form the equations of motion for `particles` under `forces`
    pub fn kanes_equations(
        &self,
        particles: &[Particle],
        forces: &ForceSet,
    ) -> Result<EomBundle, FormationError> {
        let n = self.speeds.len();
        let udots: Vec<Symbol> = self.speeds.iter().map(|u| self.reg.derivative(u)).collect();

        let mut fr = vec![Expr::zero(); n]; // generalized active forces
        let mut fr_star_neg = vec![Expr::zero(); n]; // Σ m v_r·a  (= −F_r*)

        for p in particles {
            // inertial velocity expressed in the speeds
            let raw = p
                .point
                .velocity_in(&self.origin, &self.inertial, &self.reg)?;
            let mut comps: [Expr; 3] = Default::default();
            for (i, c) in raw.components.iter().enumerate() {
                comps[i] = c.subs(&self.qdot_map);
            }
            let vel = FrameVector::new(&self.inertial, comps);

            // inertial acceleration, again with q̇ eliminated
            let mut comps: [Expr; 3] = Default::default();
            for (i, c) in vel.components.iter().enumerate() {
                comps[i] = self.reg.dt(c).subs(&self.qdot_map);
            }
            let acc = FrameVector::new(&self.inertial, comps);

            let net = forces.net_on(&p.point, &self.inertial)?;

            for (r, u_r) in self.speeds.iter().enumerate() {
                // partial velocity for this speed, projected onto the
                // applied and inertia forces
                let vr = vel.diff(u_r);
                fr[r] = fr[r].clone() + vr.dot(&net)?;
                fr_star_neg[r] = fr_star_neg[r].clone() + &p.mass * &vr.dot(&acc)?;
            }
        }

        // Σ m v_r·a = M·u̇ + h; Kane's equations F_r + F_r* = 0 become
        // M·u̇ = F_r − h
        let mut m_u = vec![vec![Expr::zero(); n]; n];
        for r in 0..n {
            for (s, uds) in udots.iter().enumerate() {
                m_u[r][s] = fr_star_neg[r].diff(uds);
            }
        }
        let udot_zero: HashMap<Symbol, Expr> =
            udots.iter().map(|ud| (ud.clone(), Expr::zero())).collect();
        let forcing_u: Vec<Expr> = (0..n)
            .map(|r| fr[r].clone() - fr_star_neg[r].subs(&udot_zero))
            .collect();

        if speed_block_is_singular(&m_u) {
            return Err(FormationError::SingularMassMatrix);
        }

        // Full-state form over [q; u]: identity rows pair each coordinate
        // derivative with its kinematic expression
        let dim = self.coordinates.len() + n;
        let mut mass_matrix = vec![vec![Expr::zero(); dim]; dim];
        let mut forcing = vec![Expr::zero(); dim];
        for (i, q) in self.coordinates.iter().enumerate() {
            mass_matrix[i][i] = Expr::one();
            forcing[i] = self.qdot_map[&self.reg.derivative(q)].clone();
        }
        for r in 0..n {
            let row = self.coordinates.len() + r;
            for s in 0..n {
                mass_matrix[row][self.coordinates.len() + s] = m_u[r][s].clone();
            }
            forcing[row] = forcing_u[r].clone();
        }

        Ok(EomBundle {
            coordinates: self.coordinates.clone(),
            speeds: self.speeds.clone(),
            mass_matrix,
            forcing,
            reg: self.reg.clone(),
        })
    }
}

/// Equations-of-motion bundle: `M · d(state)/dt = f(state)` with state
/// ordered coordinates first, speeds second.
#[derive(Clone, Debug)]
pub struct EomBundle {
    coordinates: Vec<Symbol>,
    speeds: Vec<Symbol>,
    pub mass_matrix: Vec<Vec<Expr>>,
    pub forcing: Vec<Expr>,
    reg: DynamicRegistry,
}

impl EomBundle {
    pub fn coordinates(&self) -> &[Symbol] {
        &self.coordinates
    }

    pub fn speeds(&self) -> &[Symbol] {
        &self.speeds
    }

    /// Coordinates followed by speeds; the integration state order
    pub fn state_symbols(&self) -> Vec<Symbol> {
        self.coordinates
            .iter()
            .chain(self.speeds.iter())
            .cloned()
            .collect()
    }

    pub fn dim(&self) -> usize {
        self.coordinates.len() + self.speeds.len()
    }

    pub fn registry(&self) -> &DynamicRegistry {
        &self.reg
    }

    fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for row in &self.mass_matrix {
            for e in row {
                out.extend(e.free_symbols());
            }
        }
        for e in &self.forcing {
            out.extend(e.free_symbols());
        }
        out
    }

    /// Constant (time-invariant) symbols appearing in `M` and `f`
    pub fn constant_symbols(&self) -> BTreeSet<Symbol> {
        self.free_symbols()
            .into_iter()
            .filter(|s| !self.reg.is_dynamic(s) && s != self.reg.time())
            .collect()
    }

    /// Time-varying symbols in `M`/`f` that are neither states nor state
    /// derivatives: exogenous inputs that must be specified numerically
    pub fn specified_symbols(&self) -> BTreeSet<Symbol> {
        let states: BTreeSet<Symbol> = self.state_symbols().into_iter().collect();
        let state_derivs: BTreeSet<Symbol> =
            states.iter().map(|s| self.reg.derivative(s)).collect();
        self.free_symbols()
            .into_iter()
            .filter(|s| {
                self.reg.is_dynamic(s) && !states.contains(s) && !state_derivs.contains(s)
            })
            .collect()
    }

    /// Evaluate `M` and `f` at one numeric binding and solve for the state
    /// derivative. `None` when the numeric mass matrix is singular.
    pub fn solve_at(
        &self,
        bindings: &HashMap<Symbol, f64>,
    ) -> Result<Option<DVector<f64>>, EvalError> {
        let dim = self.dim();
        let mut m = DMatrix::zeros(dim, dim);
        for (i, row) in self.mass_matrix.iter().enumerate() {
            for (j, e) in row.iter().enumerate() {
                m[(i, j)] = e.eval(bindings)?;
            }
        }
        let mut f = DVector::zeros(dim);
        for (i, e) in self.forcing.iter().enumerate() {
            f[i] = e.eval(bindings)?;
        }
        Ok(m.lu().solve(&f))
    }

    /// Cross-check against a manually derived state-derivative vector by
    /// deterministic sampling: evaluate `M⁻¹·f` and `manual` over a grid of
    /// parameter values and compare. Samples where either side fails to
    /// evaluate (singular matrix, division by zero) are skipped; at least
    /// one sample must survive for the check to pass.
    pub fn state_derivatives_agree(&self, manual: &[Expr], tol: f64) -> bool {
        if manual.len() != self.dim() {
            return false;
        }

        let mut symbols = self.free_symbols();
        for e in manual {
            symbols.extend(e.free_symbols());
        }
        let symbols: Vec<Symbol> = symbols.into_iter().collect();

        let mut checked = 0usize;
        for round in 0..7 {
            let bindings: HashMap<Symbol, f64> = symbols
                .iter()
                .enumerate()
                .map(|(j, s)| (s.clone(), sample_value(round, j)))
                .collect();

            let Ok(Some(xdot)) = self.solve_at(&bindings) else {
                continue;
            };
            let mut ok = true;
            for (i, e) in manual.iter().enumerate() {
                let Ok(want) = e.eval(&bindings) else {
                    ok = false;
                    break;
                };
                if (xdot[i] - want).abs() > tol * (1.0 + want.abs()) {
                    return false;
                }
            }
            if ok {
                checked += 1;
            }
        }
        checked > 0
    }
}

// Deterministic, well-spread sample values for equivalence and
// singularity probing
fn sample_value(round: usize, j: usize) -> f64 {
    0.4 + 0.23 * (j as f64 + 1.0) + 0.57 * (round as f64 + 1.0)
}

/// Determinant by Laplace expansion; matrices here are tiny
fn symbolic_det(m: &[Vec<Expr>]) -> Expr {
    let n = m.len();
    if n == 0 {
        return Expr::one();
    }
    if n == 1 {
        return m[0][0].clone();
    }
    let mut terms = Vec::new();
    for j in 0..n {
        if m[0][j].is_zero() {
            continue;
        }
        let minor: Vec<Vec<Expr>> = m[1..]
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(c, _)| *c != j)
                    .map(|(_, e)| e.clone())
                    .collect()
            })
            .collect();
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        terms.push(Expr::mul(vec![
            Expr::num(sign),
            m[0][j].clone(),
            symbolic_det(&minor),
        ]));
    }
    Expr::add(terms)
}

/// The speed block is singular when its determinant vanishes identically:
/// probe the determinant at several deterministic parameter values.
fn speed_block_is_singular(m_u: &[Vec<Expr>]) -> bool {
    let det = symbolic_det(m_u);
    if det.is_zero() {
        return true;
    }
    let symbols: Vec<Symbol> = det.free_symbols().into_iter().collect();
    let mut evaluated = 0usize;
    for round in 0..5 {
        let bindings: HashMap<Symbol, f64> = symbols
            .iter()
            .enumerate()
            .map(|(j, s)| (s.clone(), sample_value(round, j)))
            .collect();
        match det.eval(&bindings) {
            Ok(v) => {
                if v.abs() > 1e-9 {
                    return false;
                }
                evaluated += 1;
            }
            Err(_) => continue,
        }
    }
    // vanished at every evaluable probe
    evaluated > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanics::forces::Force;
    use crate::mechanics::frame::{Axis, FrameVector};

    #[test]
    fn rejects_missing_kinematic_equation() {
        let mut reg = DynamicRegistry::new();
        let (x, _xd) = reg.dynamic("x");
        let (v, _vd) = reg.dynamic("v");
        let n = Frame::inertial("N");
        let o = Point::fixed("O");

        let err = KanesMethod::new(&n, &o, vec![x], vec![v], &[], reg).unwrap_err();
        assert!(matches!(err, FormationError::UnderDetermined(_)));
    }

    #[test]
    fn massless_particle_is_singular() {
        let mut reg = DynamicRegistry::new();
        let (x, xd) = reg.dynamic("x");
        let (v, _vd) = reg.dynamic("v");
        let n = Frame::inertial("N");
        let o = Point::fixed("O");

        let p = o
            .locate("P", FrameVector::along(&n, Axis::X, Expr::sym(&x)))
            .with_velocity(&n, FrameVector::along(&n, Axis::X, Expr::sym(&v)));
        let particle = Particle::new("block", &p, Expr::zero());

        let kd = vec![Expr::Sym(xd) - Expr::sym(&v)];
        let km = KanesMethod::new(&n, &o, vec![x], vec![v], &kd, reg).unwrap();
        let forces = ForceSet::new().with(Force::new(
            &p,
            FrameVector::along(&n, Axis::X, Expr::one()),
        ));
        let err = km.kanes_equations(&[particle], &forces).unwrap_err();
        assert!(matches!(err, FormationError::SingularMassMatrix));
    }
}
