//! Scene assembly and pose evaluation.
//!
//! A [`VisualFrame`] binds a shape to a (reference frame, point) pair; a
//! [`Scene`] owns the bindings plus a camera and knows how to evaluate
//! every binding's homogeneous pose at every trajectory sample. The result
//! is a [`SceneDocument`]: a self-contained, renderer-agnostic description
//! with static shape/camera metadata and one 4×4 transform per visual
//! frame per time sample.

use serde::Serialize;
use thiserror::Error;

use crate::mechanics::frame::{Frame, KinematicsError};
use crate::mechanics::point::Point;
use crate::simulation::states::Trajectory;
use crate::simulation::system::System;
use crate::symbolic::expr::EvalError;

use super::shapes::{PerspectiveCamera, Shape};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("visual frame cannot be posed: {0}")]
    Chain(#[from] KinematicsError),

    #[error("pose evaluation failed: {0}")]
    Eval(#[from] EvalError),
}

/// Binds a renderable shape to a frame (orientation) and a point
/// (position) so its pose can be evaluated along the trajectory
#[derive(Clone, Debug)]
pub struct VisualFrame {
    pub name: String,
    pub frame: Frame,
    pub point: Point,
    pub shape: Shape,
}

impl VisualFrame {
    pub fn new(name: &str, frame: &Frame, point: &Point, shape: Shape) -> Self {
        VisualFrame {
            name: name.to_string(),
            frame: frame.clone(),
            point: point.clone(),
            shape,
        }
    }
}

/// Aggregate of visual frames plus a camera, rooted at a base frame and
/// origin point
pub struct Scene {
    pub name: String,
    base_frame: Frame,
    origin: Point,
    frames: Vec<VisualFrame>,
    camera: PerspectiveCamera,
}

impl Scene {
    pub fn new(name: &str, base_frame: &Frame, origin: &Point, camera: PerspectiveCamera) -> Self {
        Scene {
            name: name.to_string(),
            base_frame: base_frame.clone(),
            origin: origin.clone(),
            frames: Vec::new(),
            camera,
        }
    }

    /// Add a visual frame
    pub fn with(mut self, frame: VisualFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn frames(&self) -> &[VisualFrame] {
        &self.frames
    }

    /// Evaluate every binding's pose at every trajectory sample and
    /// assemble the serializable document
    pub fn render(
        &self,
        system: &System,
        trajectory: &Trajectory,
    ) -> Result<SceneDocument, SceneError> {
        let mut records = Vec::with_capacity(self.frames.len());

        for vf in &self.frames {
            // symbolic pose: rotation from the binding's frame into the
            // base frame, translation from the origin to the bound point
            let rot = vf.frame.dcm_to(&self.base_frame)?;
            let pos = vf.point.position_from(&self.origin, &self.base_frame)?;

            let mut transforms = Vec::with_capacity(trajectory.len());
            for (i, t) in trajectory.times.iter().enumerate() {
                let bindings = system.bindings_at(*t, trajectory.state(i));

                let mut m = [0.0_f64; 16];
                for r in 0..3 {
                    for c in 0..3 {
                        m[4 * r + c] = rot[r][c].eval(&bindings)?;
                    }
                    m[4 * r + 3] = pos.components[r].eval(&bindings)?;
                }
                m[15] = 1.0;
                transforms.push(m);
            }

            records.push(FrameRecord {
                name: vf.name.clone(),
                shape: vf.shape.clone(),
                transforms,
            });
        }

        Ok(SceneDocument {
            name: self.name.clone(),
            times: trajectory.times.clone(),
            camera: self.camera.clone(),
            frames: records,
        })
    }
}

/// Per-frame output: static shape metadata plus one row-major 4×4
/// transform per time sample
#[derive(Serialize, Debug)]
pub struct FrameRecord {
    pub name: String,
    pub shape: Shape,
    pub transforms: Vec<[f64; 16]>,
}

/// The self-contained scene description written to disk
#[derive(Serialize, Debug)]
pub struct SceneDocument {
    pub name: String,
    pub times: Vec<f64>,
    pub camera: PerspectiveCamera,
    pub frames: Vec<FrameRecord>,
}
