pub mod scene;
pub mod shapes;
