//! Points and their kinematics.
//!
//! A point is a labeled location. Every point except a root is located
//! relative to a parent point by a symbolic offset vector, so positions
//! form a tree; relating two points walks both branches to the shared
//! root. Velocities can be declared explicitly per frame (the usual move
//! for generalized speeds) or derived by differentiating the position.
//!
//! Points are immutable: `locate` and `with_velocity` return new points
//! rather than mutating, preserving the functional semantics of the
//! expression graph.

use std::fmt;
use std::sync::Arc;

use crate::symbolic::expr::{DynamicRegistry, Expr};

use super::frame::{Frame, FrameVector, KinematicsError};

struct PointInner {
    name: String,
    rel: Option<(Point, FrameVector)>,
    velocities: Vec<(Frame, FrameVector)>,
}

/// A labeled location in the kinematic tree. Clones share identity.
#[derive(Clone)]
pub struct Point(Arc<PointInner>);

impl Point {
    /// A root point, fixed by convention (the scene origin, the ceiling
    /// attachment, ...)
    pub fn fixed(name: &str) -> Point {
        Point(Arc::new(PointInner {
            name: name.to_string(),
            rel: None,
            velocities: Vec::new(),
        }))
    }

    /// A new point at `offset` from `self`
    pub fn locate(&self, name: &str, offset: FrameVector) -> Point {
        Point(Arc::new(PointInner {
            name: name.to_string(),
            rel: Some((self.clone(), offset)),
            velocities: Vec::new(),
        }))
    }

    /// The same location with an explicitly declared velocity in `frame`.
    /// Returns a new point; declare velocities before wiring the point into
    /// particles or scenes.
    pub fn with_velocity(&self, frame: &Frame, v: FrameVector) -> Point {
        let mut velocities = self.0.velocities.clone();
        velocities.push((frame.clone(), v));
        Point(Arc::new(PointInner {
            name: self.0.name.clone(),
            rel: self.0.rel.as_ref().map(|(p, o)| (p.clone(), o.clone())),
            velocities,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn same(a: &Point, b: &Point) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn root(&self) -> Point {
        let mut cur = self.clone();
        while let Some((parent, _)) = &cur.0.rel {
            let parent = parent.clone();
            cur = parent;
        }
        cur
    }

    /// Sum of offsets from `self` up to its root, resolved in `frame`
    fn offset_to_root(&self, frame: &Frame) -> Result<FrameVector, KinematicsError> {
        let mut acc = FrameVector::zero(frame);
        let mut cur = self.clone();
        while let Some((parent, offset)) = &cur.0.rel {
            acc = acc.add(&offset.in_frame(frame)?)?;
            let parent = parent.clone();
            cur = parent;
        }
        Ok(acc)
    }

    /// Position of `self` relative to `origin`, resolved in `frame`.
    /// Errors when the two points do not share a kinematic root.
    pub fn position_from(
        &self,
        origin: &Point,
        frame: &Frame,
    ) -> Result<FrameVector, KinematicsError> {
        if !Point::same(&self.root(), &origin.root()) {
            return Err(KinematicsError::IncompleteChain(
                self.name().to_string(),
                origin.name().to_string(),
            ));
        }
        let here = self.offset_to_root(frame)?;
        let there = origin.offset_to_root(frame)?;
        here.add(&there.scale(&Expr::num(-1.0)))
    }

    /// Velocity of `self` observed from `frame`: the declared velocity when
    /// one was set for that frame, otherwise the time derivative of the
    /// position from `origin`
    pub fn velocity_in(
        &self,
        origin: &Point,
        frame: &Frame,
        reg: &DynamicRegistry,
    ) -> Result<FrameVector, KinematicsError> {
        for (f, v) in &self.0.velocities {
            if Frame::same(f, frame) {
                return Ok(v.clone());
            }
        }
        self.position_from(origin, frame)?.dt(frame, reg)
    }

    /// Acceleration of `self` observed from `frame`: time derivative of the
    /// velocity
    pub fn acceleration_in(
        &self,
        origin: &Point,
        frame: &Frame,
        reg: &DynamicRegistry,
    ) -> Result<FrameVector, KinematicsError> {
        self.velocity_in(origin, frame, reg)?.dt(frame, reg)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", self.0.name)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        Point::same(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanics::frame::Axis;
    use crate::symbolic::expr::{DynamicRegistry, Expr, Symbol};
    use std::collections::HashMap;

    #[test]
    fn derived_velocity_matches_declared() {
        let mut reg = DynamicRegistry::new();
        let (x, xd) = reg.dynamic("x");

        let n = Frame::inertial("N");
        let o = Point::fixed("O");
        let p = o.locate("P", FrameVector::along(&n, Axis::X, Expr::sym(&x)));

        let v = p.velocity_in(&o, &n, &reg).unwrap();
        let mut bind: HashMap<Symbol, f64> = HashMap::new();
        bind.insert(xd, 3.5);
        assert_eq!(v.components[0].eval(&bind).unwrap(), 3.5);
        assert!(v.components[1].is_zero() && v.components[2].is_zero());
    }

    #[test]
    fn unrelated_points_error() {
        let n = Frame::inertial("N");
        let o = Point::fixed("O");
        let q = Point::fixed("Q");
        assert!(matches!(
            q.position_from(&o, &n),
            Err(KinematicsError::IncompleteChain(_, _))
        ));
    }
}
