//! Applied force contributions.
//!
//! Each contribution is a symbolic vector acting at a point (gravity,
//! spring, damper, ...). A [`ForceSet`] collects them; the net applied
//! force on a point is the sum of its contributions, resolved in a
//! requested frame.

use super::frame::{Frame, FrameVector, KinematicsError};
use super::point::Point;

/// One force contribution: a vector quantity applied at a point
#[derive(Clone, Debug)]
pub struct Force {
    pub point: Point,
    pub vector: FrameVector,
}

impl Force {
    pub fn new(point: &Point, vector: FrameVector) -> Self {
        Force {
            point: point.clone(),
            vector,
        }
    }
}

/// Collection of force contributions. Contributions on the same point are
/// summed when the net force is requested.
pub struct ForceSet {
    terms: Vec<Force>,
}

impl ForceSet {
    pub fn new() -> Self {
        ForceSet { terms: Vec::new() }
    }

    /// Add a contribution
    pub fn with(mut self, force: Force) -> Self {
        self.terms.push(force);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Net applied force on `point`, resolved in `frame`. Zero when no
    /// contribution acts there.
    pub fn net_on(&self, point: &Point, frame: &Frame) -> Result<FrameVector, KinematicsError> {
        let mut acc = FrameVector::zero(frame);
        for f in &self.terms {
            if Point::same(&f.point, point) {
                acc = acc.add(&f.vector.in_frame(frame)?)?;
            }
        }
        Ok(acc)
    }
}

impl Default for ForceSet {
    fn default() -> Self {
        Self::new()
    }
}
