//! Numerical parameters for a simulation run
//!
//! `Parameters` holds runtime settings:
//! - end time and sample count for the output grid,
//! - error tolerances for the adaptive integrator

#[derive(Debug, Clone)]
pub struct Parameters {
    pub t_end: f64,     // time end
    pub samples: usize, // number of grid points (including t = 0)
    pub atol: f64,      // absolute error tolerance
    pub rtol: f64,      // relative error tolerance
}

impl Parameters {
    /// Evenly spaced output grid over [0, t_end]
    pub fn time_grid(&self) -> Vec<f64> {
        let n = self.samples.max(2);
        let dt = self.t_end / (n - 1) as f64;
        (0..n).map(|i| i as f64 * dt).collect()
    }
}
