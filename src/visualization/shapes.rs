//! Renderable shapes and the camera.
//!
//! Static metadata only: geometry parameters, color and material tags, and
//! the camera's optics. All of it serializes straight into the scene
//! document; motion lives in the per-sample transforms, not here.

use serde::Serialize;

/// Geometry of a renderable shape
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Sphere { radius: f64 },
    Cube { length: f64 },
    Cylinder { radius: f64, length: f64 },
    Plane { length: f64, width: f64 },
}

/// A shape with its rendering attributes
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Shape {
    pub name: String,
    pub color: String,    // named color, renderer-interpreted
    pub material: String, // material tag, renderer-interpreted
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Shape {
    pub fn new(name: &str, color: &str, material: &str, geometry: Geometry) -> Self {
        Shape {
            name: name.to_string(),
            color: color.to_string(),
            material: material.to_string(),
            geometry,
        }
    }
}

/// Perspective camera with a static pose
#[derive(Serialize, Clone, Debug)]
pub struct PerspectiveCamera {
    pub name: String,
    pub fov: f64,  // vertical field of view, degrees
    pub near: f64, // near clip plane
    pub far: f64,  // far clip plane
    pub position: [f64; 3],
}

impl PerspectiveCamera {
    pub fn new(name: &str, position: [f64; 3]) -> Self {
        PerspectiveCamera {
            name: name.to_string(),
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            position,
        }
    }
}
