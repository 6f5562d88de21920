//! Time integrators over a fixed output grid.
//!
//! Both integrators advance `M·ẋ = f` between consecutive grid points and
//! record one sample per point:
//! - `rk4`   – classical 4th-order Runge-Kutta, one step per interval
//! - `rkf45` – embedded Runge-Kutta-Fehlberg 4(5) with adaptive substeps
//!             controlled by `atol`/`rtol`
//!
//! The right-hand side is evaluated by binding the state numerically and
//! solving the mass matrix with an LU factorization at each stage. All
//! failures (singular matrix, non-finite state, step-size collapse) abort
//! the run; no partial trajectory is returned.

use nalgebra::DVector;
use thiserror::Error;

use crate::configuration::config::IntegratorConfig;
use crate::symbolic::expr::EvalError;

use super::engine::Engine;
use super::params::Parameters;
use super::system::System;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("mass matrix is numerically singular at t = {t}")]
    SingularMassMatrix { t: f64 },

    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },

    #[error("adaptive integrator failed to converge at t = {t}")]
    NonConvergence { t: f64 },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// d(state)/dt at one point, by numeric mass-matrix solve
fn eval_rhs(system: &System, t: f64, x: &DVector<f64>) -> Result<DVector<f64>, IntegrationError> {
    let bindings = system.bindings_at(t, x);
    match system.bundle().solve_at(&bindings)? {
        Some(xdot) => Ok(xdot),
        None => Err(IntegrationError::SingularMassMatrix { t }),
    }
}

/// Integrate over the whole grid, one state vector per grid point
pub(crate) fn integrate_grid(
    system: &System,
    times: &[f64],
    x0: DVector<f64>,
    engine: &Engine,
    params: &Parameters,
) -> Result<Vec<DVector<f64>>, IntegrationError> {
    let mut states = Vec::with_capacity(times.len());
    let mut x = x0;
    states.push(x.clone());

    for w in times.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        x = match engine.integrator {
            IntegratorConfig::Rk4 => rk4_span(system, t0, t1, &x)?,
            IntegratorConfig::Rkf45 => rkf45_span(system, t0, t1, &x, params)?,
        };
        if x.iter().any(|v| !v.is_finite()) {
            return Err(IntegrationError::NonFiniteState { t: t1 });
        }
        states.push(x.clone());
    }

    Ok(states)
}

/// One classical RK4 step across [t0, t1]
fn rk4_span(
    system: &System,
    t0: f64,
    t1: f64,
    x: &DVector<f64>,
) -> Result<DVector<f64>, IntegrationError> {
    let h = t1 - t0;
    let half = 0.5 * h;

    let k1 = eval_rhs(system, t0, x)?;
    let k2 = eval_rhs(system, t0 + half, &(x + &k1 * half))?;
    let k3 = eval_rhs(system, t0 + half, &(x + &k2 * half))?;
    let k4 = eval_rhs(system, t1, &(x + &k3 * h))?;

    Ok(x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0))
}

// Fehlberg 4(5) tableau
const B3: [f64; 2] = [3.0 / 32.0, 9.0 / 32.0];
const B4: [f64; 3] = [1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0];
const B5: [f64; 4] = [439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0];
const B6: [f64; 5] = [
    -8.0 / 27.0,
    2.0,
    -3544.0 / 2565.0,
    1859.0 / 4104.0,
    -11.0 / 40.0,
];
const C5: [f64; 6] = [
    16.0 / 135.0,
    0.0,
    6656.0 / 12825.0,
    28561.0 / 56430.0,
    -9.0 / 50.0,
    2.0 / 55.0,
];
const C4: [f64; 6] = [
    25.0 / 216.0,
    0.0,
    1408.0 / 2565.0,
    2197.0 / 4104.0,
    -1.0 / 5.0,
    0.0,
];

const MAX_SUBSTEPS: usize = 10_000;

/// Adaptive RKF45 across [t0, t1]; substep sizes are controlled by the
/// embedded error estimate against atol/rtol
fn rkf45_span(
    system: &System,
    t0: f64,
    t1: f64,
    x0: &DVector<f64>,
    params: &Parameters,
) -> Result<DVector<f64>, IntegrationError> {
    let span = t1 - t0;
    let min_step = 1e-12 * span;
    let mut t = t0;
    let mut x = x0.clone();
    let mut h = span;

    for _ in 0..MAX_SUBSTEPS {
        let remaining = t1 - t;
        if remaining <= min_step {
            return Ok(x);
        }
        let h_step = h.min(remaining);

        let k1 = eval_rhs(system, t, &x)?;
        let k2 = eval_rhs(system, t + 0.25 * h_step, &(&x + &k1 * (0.25 * h_step)))?;
        let k3 = eval_rhs(
            system,
            t + 0.375 * h_step,
            &(&x + &k1 * (B3[0] * h_step) + &k2 * (B3[1] * h_step)),
        )?;
        let k4 = eval_rhs(
            system,
            t + 12.0 / 13.0 * h_step,
            &(&x + &k1 * (B4[0] * h_step) + &k2 * (B4[1] * h_step) + &k3 * (B4[2] * h_step)),
        )?;
        let k5 = eval_rhs(
            system,
            t + h_step,
            &(&x
                + &k1 * (B5[0] * h_step)
                + &k2 * (B5[1] * h_step)
                + &k3 * (B5[2] * h_step)
                + &k4 * (B5[3] * h_step)),
        )?;
        let k6 = eval_rhs(
            system,
            t + 0.5 * h_step,
            &(&x
                + &k1 * (B6[0] * h_step)
                + &k2 * (B6[1] * h_step)
                + &k3 * (B6[2] * h_step)
                + &k4 * (B6[3] * h_step)
                + &k5 * (B6[4] * h_step)),
        )?;

        let ks = [&k1, &k2, &k3, &k4, &k5, &k6];
        let mut x5 = x.clone();
        let mut x4 = x.clone();
        for (i, k) in ks.iter().enumerate() {
            x5 += *k * (C5[i] * h_step);
            x4 += *k * (C4[i] * h_step);
        }

        // max component of |error| relative to the tolerance scale
        let mut ratio: f64 = 0.0;
        for i in 0..x.len() {
            let scale = params.atol + params.rtol * x5[i].abs();
            ratio = ratio.max((x5[i] - x4[i]).abs() / scale);
        }

        if ratio <= 1.0 {
            t += h_step;
            x = x5;
        }

        // standard step-size update, clamped so one bad estimate cannot
        // stall or explode the step; a step driven below the floor by
        // error control means the tolerances cannot be met
        let factor = if ratio > 0.0 {
            0.9 * ratio.powf(-0.2)
        } else {
            5.0
        };
        h = h_step * factor.clamp(0.2, 5.0);
        if h < min_step {
            return Err(IntegrationError::NonConvergence { t });
        }
    }

    Err(IntegrationError::NonConvergence { t })
}
