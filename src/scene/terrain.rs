use crate::geom::EPS;
use crate::{Point, Vector};
use serde::{Deserialize, Serialize};

/// Terrain triangle with absolute vertex altitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Self { a, b, c }
    }

    /// The three edges in vertex order.
    pub fn edges(&self) -> [(Point, Point); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// True when the plan position falls inside the footprint, edges included.
    pub fn contains_2d(&self, x: f64, y: f64) -> bool {
        let d1 = edge_sign(x, y, &self.a, &self.b);
        let d2 = edge_sign(x, y, &self.b, &self.c);
        let d3 = edge_sign(x, y, &self.c, &self.a);
        let has_neg = d1 < -EPS || d2 < -EPS || d3 < -EPS;
        let has_pos = d1 > EPS || d2 > EPS || d3 > EPS;
        !(has_neg && has_pos)
    }

    /// Altitude of the triangle plane at a plan position.
    ///
    /// Falls back to the first vertex altitude for a degenerate or vertical
    /// triangle.
    pub fn elevation_at(&self, x: f64, y: f64) -> f64 {
        let normal = match Vector::normal(self.a, self.b, self.c) {
            Some(n) if n.dz.abs() > EPS => n,
            _ => return self.a.z,
        };
        self.a.z - (normal.dx * (x - self.a.x) + normal.dy * (y - self.a.y)) / normal.dz
    }
}

fn edge_sign(x: f64, y: f64, p0: &Point, p1: &Point) -> f64 {
    (x - p1.x) * (p0.y - p1.y) - (p0.x - p1.x) * (y - p1.y)
}

/// Piecewise planar terrain model.
///
/// An empty terrain is flat at altitude zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Terrain {
    pub triangles: Vec<Triangle>,
}

impl Terrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Ground altitude at a plan position.
    ///
    /// Positions outside every triangle sit at altitude zero.
    pub fn elevation_at(&self, x: f64, y: f64) -> f64 {
        for triangle in &self.triangles {
            if triangle.contains_2d(x, y) {
                return triangle.elevation_at(x, y);
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sloped() -> Triangle {
        // Plane z = x
        Triangle::new(
            Point::new(0., 0., 0.),
            Point::new(10., 0., 10.),
            Point::new(0., 10., 0.),
        )
    }

    #[test]
    fn test_contains_2d() {
        let t = sloped();
        assert!(t.contains_2d(2., 2.));
        assert!(t.contains_2d(0., 0.), "vertices count as inside");
        assert!(t.contains_2d(5., 0.), "edges count as inside");
        assert!(!t.contains_2d(8., 8.));
        assert!(!t.contains_2d(-1., 0.));
    }

    #[test]
    fn test_elevation_interpolates_the_plane() {
        let t = sloped();
        assert!((t.elevation_at(4., 2.) - 4.0).abs() < 1e-12);
        assert!((t.elevation_at(0., 5.) - 0.0).abs() < 1e-12);
        assert!((t.elevation_at(7., 1.) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_falls_back() {
        let t = Triangle::new(
            Point::new(1., 1., 3.),
            Point::new(2., 2., 3.),
            Point::new(3., 3., 3.),
        );
        assert_eq!(t.elevation_at(0., 0.), 3.0);
    }

    #[test]
    fn test_terrain_lookup() {
        let terrain = Terrain::from_triangles(vec![sloped()]);
        assert!((terrain.elevation_at(4., 2.) - 4.0).abs() < 1e-12);
        assert_eq!(
            terrain.elevation_at(50., 50.),
            0.0,
            "outside the mesh the ground is flat zero"
        );
        assert_eq!(Terrain::new().elevation_at(4., 2.), 0.0);
    }
}
