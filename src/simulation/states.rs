//! Trajectory produced by integration.
//!
//! One state vector per time-grid point; the state is the bundle's
//! coordinates followed by its speeds. Samples are immutable once the
//! integrator hands the trajectory back.

use nalgebra::DVector;

use crate::symbolic::expr::Symbol;

#[derive(Debug, Clone)]
pub struct Trajectory {
    pub times: Vec<f64>,           // grid the samples were taken on
    pub states: Vec<DVector<f64>>, // one state vector per grid point
    pub symbols: Vec<Symbol>,      // state ordering (coordinates then speeds)
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// State vector at sample `i`
    pub fn state(&self, i: usize) -> &DVector<f64> {
        &self.states[i]
    }

    /// Time series of one state symbol across all samples
    pub fn series(&self, symbol: &Symbol) -> Option<Vec<f64>> {
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(self.states.iter().map(|x| x[idx]).collect())
    }
}
