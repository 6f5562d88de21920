//! Reference frames and frame-resolved symbolic vectors.
//!
//! A [`Frame`] is an oriented basis. One frame per model is the inertial
//! root; every other frame is oriented relative to a parent by a rotation
//! about one of the parent's coordinate axes through a (possibly symbolic)
//! angle. Direction cosine matrices are composed along the orientation
//! chain, so any two frames hanging off the same root can be related.
//!
//! A [`FrameVector`] is three expression components resolved in a named
//! frame. Re-expression into another frame multiplies by the DCM;
//! differentiation in a frame differentiates the components resolved in
//! that frame (whose basis vectors are fixed by definition).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::symbolic::expr::{DynamicRegistry, Expr, Symbol};

/// Kinematic-chain failures: two entities that cannot be related because
/// they do not hang off a common root.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KinematicsError {
    #[error("frames `{0}` and `{1}` are not connected by orientations")]
    DisconnectedFrames(String, String),

    #[error("no kinematic chain from point `{0}` to point `{1}`")]
    IncompleteChain(String, String),
}

/// Coordinate axis of a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

struct Orientation {
    parent: Frame,
    axis: Axis,
    angle: Expr,
}

struct FrameInner {
    name: String,
    orientation: Option<Orientation>,
}

/// An oriented coordinate basis. Clones share identity; frame equality is
/// identity, not name.
#[derive(Clone)]
pub struct Frame(Arc<FrameInner>);

impl Frame {
    /// A root frame with no parent; the model's inertial frame
    pub fn inertial(name: &str) -> Frame {
        Frame(Arc::new(FrameInner {
            name: name.to_string(),
            orientation: None,
        }))
    }

    /// A frame rotated from `parent` about one of the parent's axes by
    /// `angle` (radians, possibly symbolic)
    pub fn oriented(name: &str, parent: &Frame, axis: Axis, angle: Expr) -> Frame {
        Frame(Arc::new(FrameInner {
            name: name.to_string(),
            orientation: Some(Orientation {
                parent: parent.clone(),
                axis,
                angle,
            }),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    fn root(&self) -> Frame {
        let mut cur = self.clone();
        while let Some(o) = &cur.0.orientation {
            let parent = o.parent.clone();
            cur = parent;
        }
        cur
    }

    /// Rotation matrix taking components in `self` to components in the
    /// root frame
    fn dcm_to_root(&self) -> Mat3 {
        let mut r = mat_identity();
        let mut cur = self.clone();
        while let Some(o) = &cur.0.orientation {
            // components_parent = R(axis, angle) * components_child
            r = mat_mul(&axis_rotation(o.axis, &o.angle), &r);
            let parent = o.parent.clone();
            cur = parent;
        }
        r
    }

    /// Rotation matrix taking components resolved in `self` to components
    /// resolved in `target`
    pub fn dcm_to(&self, target: &Frame) -> Result<Mat3, KinematicsError> {
        if !Frame::same(&self.root(), &target.root()) {
            return Err(KinematicsError::DisconnectedFrames(
                self.name().to_string(),
                target.name().to_string(),
            ));
        }
        // v_target = R(root<-target)^T * R(root<-self) * v_self
        Ok(mat_mul(
            &mat_transpose(&target.dcm_to_root()),
            &self.dcm_to_root(),
        ))
    }

    pub fn same(a: &Frame, b: &Frame) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0.name)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        Frame::same(self, other)
    }
}

/// 3x3 matrix of expressions
pub type Mat3 = [[Expr; 3]; 3];

pub fn mat_identity() -> Mat3 {
    let mut m: Mat3 = Default::default();
    for (i, row) in m.iter_mut().enumerate() {
        for (j, e) in row.iter_mut().enumerate() {
            *e = if i == j { Expr::one() } else { Expr::zero() };
        }
    }
    m
}

pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out: Mat3 = Default::default();
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = Expr::add(
                (0..3)
                    .map(|k| Expr::mul(vec![a[i][k].clone(), b[k][j].clone()]))
                    .collect(),
            );
        }
    }
    out
}

pub fn mat_transpose(a: &Mat3) -> Mat3 {
    let mut out: Mat3 = Default::default();
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[j][i].clone();
        }
    }
    out
}

pub fn mat_vec(a: &Mat3, v: &[Expr; 3]) -> [Expr; 3] {
    let mut out: [Expr; 3] = Default::default();
    for i in 0..3 {
        out[i] = Expr::add(
            (0..3)
                .map(|k| Expr::mul(vec![a[i][k].clone(), v[k].clone()]))
                .collect(),
        );
    }
    out
}

/// Rotation about a coordinate axis: maps components fixed in the rotated
/// (child) frame to components in the parent frame
fn axis_rotation(axis: Axis, angle: &Expr) -> Mat3 {
    let c = Expr::cos(angle.clone());
    let s = Expr::sin(angle.clone());
    match axis {
        Axis::X => [
            [Expr::one(), Expr::zero(), Expr::zero()],
            [Expr::zero(), c.clone(), -&s],
            [Expr::zero(), s, c],
        ],
        Axis::Y => [
            [c.clone(), Expr::zero(), s.clone()],
            [Expr::zero(), Expr::one(), Expr::zero()],
            [-&s, Expr::zero(), c],
        ],
        Axis::Z => [
            [c.clone(), -&s, Expr::zero()],
            [s, c, Expr::zero()],
            [Expr::zero(), Expr::zero(), Expr::one()],
        ],
    }
}

/// Three expression components resolved in a frame
#[derive(Clone, Debug)]
pub struct FrameVector {
    pub frame: Frame,
    pub components: [Expr; 3],
}

impl FrameVector {
    pub fn new(frame: &Frame, components: [Expr; 3]) -> Self {
        FrameVector {
            frame: frame.clone(),
            components,
        }
    }

    pub fn zero(frame: &Frame) -> Self {
        FrameVector::new(frame, Default::default())
    }

    /// `magnitude` along one of `frame`'s axes
    pub fn along(frame: &Frame, axis: Axis, magnitude: Expr) -> Self {
        let mut c: [Expr; 3] = Default::default();
        c[axis.index()] = magnitude;
        FrameVector::new(frame, c)
    }

    /// Re-express in `target`'s basis
    pub fn in_frame(&self, target: &Frame) -> Result<FrameVector, KinematicsError> {
        if Frame::same(&self.frame, target) {
            return Ok(self.clone());
        }
        let r = self.frame.dcm_to(target)?;
        Ok(FrameVector::new(target, mat_vec(&r, &self.components)))
    }

    pub fn add(&self, other: &FrameVector) -> Result<FrameVector, KinematicsError> {
        let o = other.in_frame(&self.frame)?;
        let mut c: [Expr; 3] = Default::default();
        for i in 0..3 {
            c[i] = &self.components[i] + &o.components[i];
        }
        Ok(FrameVector::new(&self.frame, c))
    }

    pub fn scale(&self, by: &Expr) -> FrameVector {
        let mut c: [Expr; 3] = Default::default();
        for i in 0..3 {
            c[i] = by * &self.components[i];
        }
        FrameVector::new(&self.frame, c)
    }

    pub fn dot(&self, other: &FrameVector) -> Result<Expr, KinematicsError> {
        let o = other.in_frame(&self.frame)?;
        Ok(Expr::add(
            (0..3)
                .map(|i| &self.components[i] * &o.components[i])
                .collect(),
        ))
    }

    /// Time derivative observed from `frame`: resolve there, differentiate
    /// componentwise
    pub fn dt(&self, frame: &Frame, reg: &DynamicRegistry) -> Result<FrameVector, KinematicsError> {
        let resolved = self.in_frame(frame)?;
        let mut c: [Expr; 3] = Default::default();
        for i in 0..3 {
            c[i] = reg.dt(&resolved.components[i]);
        }
        Ok(FrameVector::new(frame, c))
    }

    /// Partial derivative of each component with respect to `sym`
    pub fn diff(&self, sym: &Symbol) -> FrameVector {
        let mut c: [Expr; 3] = Default::default();
        for i in 0..3 {
            c[i] = self.components[i].diff(sym);
        }
        FrameVector::new(&self.frame, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn quarter_turn_about_z_maps_x_to_y() {
        let n = Frame::inertial("N");
        let theta = Symbol::new("theta");
        let a = Frame::oriented("A", &n, Axis::Z, Expr::sym(&theta));

        // a_x expressed in N at theta = pi/2 should be n_y
        let ax = FrameVector::along(&a, Axis::X, Expr::one());
        let in_n = ax.in_frame(&n).unwrap();

        let mut bind: HashMap<Symbol, f64> = HashMap::new();
        bind.insert(theta, FRAC_PI_2);
        let x = in_n.components[0].eval(&bind).unwrap();
        let y = in_n.components[1].eval(&bind).unwrap();
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disconnected_frames_error() {
        let n = Frame::inertial("N");
        let m = Frame::inertial("M");
        let v = FrameVector::along(&n, Axis::X, Expr::one());
        assert!(matches!(
            v.in_frame(&m),
            Err(KinematicsError::DisconnectedFrames(_, _))
        ));
    }
}
