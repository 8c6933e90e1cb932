//! Vertical cut between a source and a receiver.
//!
//! A cut profile lists everything the straight source-receiver line meets in
//! plan view: obstacle crossings, terrain edges and ground absorption
//! boundaries. Derived queries turn the profile into the inputs of an
//! attenuation formula: the mean ground absorption, the free field test and
//! the ground silhouette re-projected into the cut plane.

use crate::geom::segment::distance_point_to_segment;
use crate::geom::EPS;
use crate::profile::cutpoint::{CutPoint, CutPointKind};
use crate::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered description of a vertical cut.
///
/// Points run from the source at index 0 to the receiver at the last index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutProfile {
    pub points: Vec<CutPoint>,
    /// True when an obstacle blocks the direct line.
    pub has_building_intersection: bool,
    /// True when the terrain blocks the direct line.
    pub has_topography_intersection: bool,
}

impl CutProfile {
    /// Two-point profile from a source to a receiver.
    pub fn new(source: CutPoint, receiver: CutPoint) -> Self {
        Self {
            points: vec![source, receiver],
            has_building_intersection: false,
            has_topography_intersection: false,
        }
    }

    /// Source point, when the profile has one.
    pub fn source(&self) -> Option<&CutPoint> {
        self.points.iter().find(|p| p.is_source())
    }

    /// Receiver point, when the profile has one.
    pub fn receiver(&self) -> Option<&CutPoint> {
        self.points.iter().find(|p| p.is_receiver())
    }

    /// True when nothing blocks the direct source-receiver line.
    pub fn is_free_field(&self) -> bool {
        !self.has_building_intersection && !self.has_topography_intersection
    }

    /// Inserts intermediate points after the source.
    ///
    /// With `sort` set, points are then ordered by distance from the source
    /// and the source and receiver are pinned back to the first and last
    /// position.
    pub fn insert_points<I>(&mut self, sort: bool, points: I)
    where
        I: IntoIterator<Item = CutPoint>,
    {
        let mut at = self.points.len().min(1);
        for p in points {
            self.points.insert(at, p);
            at += 1;
        }
        if sort {
            self.sort_from_source();
        }
    }

    fn sort_from_source(&mut self) {
        let origin = match self.source() {
            Some(s) => s.coordinate,
            None => return,
        };
        self.points.sort_by(|a, b| {
            let da = a.coordinate.distance_to(&origin);
            let db = b.coordinate.distance_to(&origin);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        });
        if let Some(i) = self.points.iter().position(|p| p.is_source()) {
            if i != 0 {
                let source = self.points.remove(i);
                self.points.insert(0, source);
            }
        }
        if let Some(i) = self.points.iter().position(|p| p.is_receiver()) {
            if i + 1 != self.points.len() {
                let receiver = self.points.remove(i);
                self.points.push(receiver);
            }
        }
    }

    /// Length-weighted ground coefficient of the segments between two point
    /// indexes. Each segment takes the coefficient of its starting point.
    ///
    /// Returns 0 for an empty or degenerate range.
    pub fn ground_coefficient_between(&self, from: usize, to: usize) -> f64 {
        if from >= to || to >= self.points.len() {
            return 0.0;
        }
        let mut total_length = 0.0;
        let mut weighted = 0.0;
        for i in from..to {
            let length = self.points[i]
                .coordinate
                .distance_to(&self.points[i + 1].coordinate);
            weighted += length * self.points[i].ground_coefficient;
            total_length += length;
        }
        if total_length > 0.0 {
            weighted / total_length
        } else {
            0.0
        }
    }

    /// Length-weighted ground coefficient of the whole profile.
    pub fn ground_coefficient(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.ground_coefficient_between(0, self.points.len() - 1)
    }

    /// Walks the ground silhouette seen by the direct line.
    ///
    /// Wall points contribute the obstacle top, everything else the ground
    /// altitude below it. Terrain crossings under an obstacle footprint are
    /// left out, ground absorption boundaries always are.
    pub fn silhouette_points(&self) -> SilhouettePoints<'_> {
        SilhouettePoints::new(&self.points)
    }

    /// Re-projects the ground silhouette into the vertical cut plane.
    ///
    /// Output points carry the cumulative horizontal distance from the source
    /// as x and the silhouette altitude as y.
    pub fn ground_profile_2d(&self, tolerance: f64) -> Vec<Point> {
        let silhouette: Vec<Point> = self.silhouette_points().collect();
        flatten_profile(&silhouette, tolerance)
    }
}

/// Iterator over the silhouette vertices of a cut profile.
pub struct SilhouettePoints<'a> {
    points: std::slice::Iter<'a, CutPoint>,
    over_obstacle: Option<usize>,
}

impl<'a> SilhouettePoints<'a> {
    fn new(points: &'a [CutPoint]) -> Self {
        // A cut can start mid-obstacle when taken from a sub-range
        let over_obstacle = match points.first() {
            Some(CutPoint {
                kind: CutPointKind::Wall { obstacle },
                ..
            }) => Some(*obstacle),
            _ => None,
        };
        Self {
            points: points.iter(),
            over_obstacle,
        }
    }
}

impl Iterator for SilhouettePoints<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        for cut in self.points.by_ref() {
            match cut.kind {
                CutPointKind::GroundEffect => continue,
                CutPointKind::Wall { obstacle } => {
                    if (cut.coordinate.z - cut.z_ground).abs() < EPS {
                        // Ground-level wall foot: entering or leaving the footprint
                        self.over_obstacle = match self.over_obstacle {
                            None => Some(obstacle),
                            Some(_) => None,
                        };
                    }
                    return Some(cut.coordinate);
                }
                CutPointKind::Topography => {
                    if self.over_obstacle.is_some() {
                        continue;
                    }
                    return Some(Point::new(cut.coordinate.x, cut.coordinate.y, cut.z_ground));
                }
                _ => {
                    return Some(Point::new(cut.coordinate.x, cut.coordinate.y, cut.z_ground));
                }
            }
        }
        None
    }
}

/// Re-projects a polyline into a 2D profile.
///
/// x is the cumulative horizontal distance along the line, y the altitude.
/// With a positive tolerance, points closer than the tolerance to the segment
/// joining their kept neighbours are dropped. The first and last point are
/// always kept.
pub fn flatten_profile(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut flat = Vec::with_capacity(points.len());
    let mut chainage = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            chainage += points[i - 1].distance_2d(p);
        }
        flat.push(Point::new(chainage, p.z, 0.0));
    }
    if tolerance <= 0.0 || flat.len() < 3 {
        return flat;
    }
    let mut kept = Vec::with_capacity(flat.len());
    kept.push(flat[0]);
    for i in 1..flat.len() - 1 {
        let prev = kept[kept.len() - 1];
        let next = flat[i + 1];
        if distance_point_to_segment(flat[i], prev, next) >= tolerance {
            kept.push(flat[i]);
        }
    }
    kept.push(flat[flat.len() - 1]);
    kept
}
