//! Numeric binding and simulation of an equations-of-motion bundle.
//!
//! A [`System`] pairs an [`EomBundle`] with the numeric values its symbols
//! need: constants, initial conditions for every state, and specified
//! (exogenous, time-varying) inputs. Bindings are validated on insertion —
//! a symbol that is not actually a constant/state/specified of the bundle
//! is rejected — and completeness is validated before integration starts:
//! a symbol left without a value is an error, never a silent default.

use std::collections::HashMap;

use nalgebra::DVector;
use thiserror::Error;

use crate::mechanics::kane::EomBundle;
use crate::symbolic::expr::Symbol;

use super::engine::Engine;
use super::integrator::{integrate_grid, IntegrationError};
use super::params::Parameters;
use super::states::Trajectory;

/// Value for a specified (non-state, time-varying) symbol
pub enum Specified {
    Constant(f64),
    TimeFn(Box<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Specified {
    fn at(&self, t: f64) -> f64 {
        match self {
            Specified::Constant(v) => *v,
            Specified::TimeFn(f) => f(t),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SystemError {
    #[error("symbol `{0}` is not a constant of this system")]
    UnknownConstant(Symbol),

    #[error("symbol `{0}` is not a state of this system")]
    UnknownState(Symbol),

    #[error("symbol `{0}` is not a specified input of this system")]
    UnknownSpecified(Symbol),

    #[error("constant `{0}` has no numeric value")]
    MissingConstant(Symbol),

    #[error("state `{0}` has no initial condition")]
    MissingInitialCondition(Symbol),

    #[error("specified input `{0}` has no value")]
    MissingSpecified(Symbol),

    #[error("bad time grid: {0}")]
    BadTimeGrid(String),
}

/// Failure of a simulation run, from binding checks or from the
/// integrator itself
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

/// An equations-of-motion bundle plus everything needed to integrate it
pub struct System {
    bundle: EomBundle,
    constants: HashMap<Symbol, f64>,
    initial_conditions: HashMap<Symbol, f64>,
    specifieds: HashMap<Symbol, Specified>,
}

impl System {
    pub fn new(bundle: EomBundle) -> Self {
        System {
            bundle,
            constants: HashMap::new(),
            initial_conditions: HashMap::new(),
            specifieds: HashMap::new(),
        }
    }

    pub fn bundle(&self) -> &EomBundle {
        &self.bundle
    }

    pub fn constants(&self) -> &HashMap<Symbol, f64> {
        &self.constants
    }

    /// Bind a constant; the symbol must actually appear as a constant in
    /// the equations
    pub fn set_constant(&mut self, symbol: &Symbol, value: f64) -> Result<(), SystemError> {
        if !self.bundle.constant_symbols().contains(symbol) {
            return Err(SystemError::UnknownConstant(symbol.clone()));
        }
        self.constants.insert(symbol.clone(), value);
        Ok(())
    }

    /// Bind a state's initial value
    pub fn set_initial_condition(
        &mut self,
        symbol: &Symbol,
        value: f64,
    ) -> Result<(), SystemError> {
        if !self.bundle.state_symbols().contains(symbol) {
            return Err(SystemError::UnknownState(symbol.clone()));
        }
        self.initial_conditions.insert(symbol.clone(), value);
        Ok(())
    }

    /// Bind a specified input
    pub fn set_specified(
        &mut self,
        symbol: &Symbol,
        value: Specified,
    ) -> Result<(), SystemError> {
        if !self.bundle.specified_symbols().contains(symbol) {
            return Err(SystemError::UnknownSpecified(symbol.clone()));
        }
        self.specifieds.insert(symbol.clone(), value);
        Ok(())
    }

    /// Every symbol the equations reference must have a value before
    /// integration starts
    pub fn validate(&self) -> Result<(), SystemError> {
        for s in self.bundle.constant_symbols() {
            if !self.constants.contains_key(&s) {
                return Err(SystemError::MissingConstant(s));
            }
        }
        for s in self.bundle.state_symbols() {
            if !self.initial_conditions.contains_key(&s) {
                return Err(SystemError::MissingInitialCondition(s));
            }
        }
        for s in self.bundle.specified_symbols() {
            if !self.specifieds.contains_key(&s) {
                return Err(SystemError::MissingSpecified(s));
            }
        }
        Ok(())
    }

    /// Initial state vector in bundle order (coordinates then speeds)
    pub fn initial_state(&self) -> Result<DVector<f64>, SystemError> {
        let symbols = self.bundle.state_symbols();
        let mut x0 = DVector::zeros(symbols.len());
        for (i, s) in symbols.iter().enumerate() {
            match self.initial_conditions.get(s) {
                Some(v) => x0[i] = *v,
                None => return Err(SystemError::MissingInitialCondition(s.clone())),
            }
        }
        Ok(x0)
    }

    /// Numeric bindings for evaluating the equations at time `t` with
    /// state `x`
    pub fn bindings_at(&self, t: f64, x: &DVector<f64>) -> HashMap<Symbol, f64> {
        let mut bindings = self.constants.clone();
        for (i, s) in self.bundle.state_symbols().iter().enumerate() {
            bindings.insert(s.clone(), x[i]);
        }
        for (s, v) in &self.specifieds {
            bindings.insert(s.clone(), v.at(t));
        }
        bindings.insert(self.bundle.registry().time().clone(), t);
        bindings
    }

    /// Integrate over `times` (strictly increasing, `times[0]` is where the
    /// initial conditions apply). One sample per grid point; any failure
    /// discards the partial trajectory.
    pub fn integrate(
        &self,
        times: &[f64],
        engine: &Engine,
        params: &Parameters,
    ) -> Result<Trajectory, SimulationError> {
        self.validate()?;
        if times.len() < 2 {
            return Err(SystemError::BadTimeGrid(format!(
                "need at least 2 grid points, got {}",
                times.len()
            ))
            .into());
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SystemError::BadTimeGrid("not strictly increasing".into()).into());
        }

        let x0 = self.initial_state()?;
        let states = integrate_grid(self, times, x0, engine, params)?;

        Ok(Trajectory {
            times: times.to_vec(),
            states,
            symbols: self.bundle.state_symbols(),
        })
    }
}
