pub mod point;
pub mod segment;
pub mod vector;

/// Geometric precision
pub(crate) const EPS: f64 = 1e-13;
