use crate::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a point along the cut line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CutPointKind {
    /// Emission point at the start of the profile.
    Source {
        /// In-memory source index.
        id: usize,
        /// External primary key, when the source comes from a table.
        pk: Option<i64>,
        /// Power share of the source segment this point samples.
        li: f64,
    },
    /// Listening point at the end of the profile.
    Receiver {
        /// In-memory receiver index.
        id: usize,
        /// External primary key, when the receiver comes from a table.
        pk: Option<i64>,
    },
    /// Crossing of a wall or building edge. All crossings of one obstacle
    /// share the same index.
    Wall { obstacle: usize },
    /// Crossing of a terrain triangle edge.
    Topography,
    /// Crossing of a ground absorption region boundary.
    GroundEffect,
}

/// One point of a vertical cut between a source and a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    /// Position. `z` is the altitude of the point itself, which sits above
    /// the ground on top of an obstacle.
    pub coordinate: Point,
    /// Ground altitude below the point (m).
    pub z_ground: f64,
    /// Ground absorption of the segment starting here, 0 reflective to 1 absorbing.
    pub ground_coefficient: f64,
    pub kind: CutPointKind,
}

impl CutPoint {
    pub fn source(coordinate: Point, id: usize, pk: Option<i64>, li: f64) -> Self {
        Self {
            coordinate,
            z_ground: coordinate.z,
            ground_coefficient: 0.0,
            kind: CutPointKind::Source { id, pk, li },
        }
    }

    pub fn receiver(coordinate: Point, id: usize, pk: Option<i64>) -> Self {
        Self {
            coordinate,
            z_ground: coordinate.z,
            ground_coefficient: 0.0,
            kind: CutPointKind::Receiver { id, pk },
        }
    }

    /// Wall crossing. `coordinate.z` carries the obstacle top altitude at the
    /// crossing, `z_ground` the terrain below it.
    pub fn wall(coordinate: Point, z_ground: f64, obstacle: usize) -> Self {
        Self {
            coordinate,
            z_ground,
            ground_coefficient: 0.0,
            kind: CutPointKind::Wall { obstacle },
        }
    }

    pub fn topography(coordinate: Point) -> Self {
        Self {
            coordinate,
            z_ground: coordinate.z,
            ground_coefficient: 0.0,
            kind: CutPointKind::Topography,
        }
    }

    pub fn ground_effect(coordinate: Point, ground_coefficient: f64) -> Self {
        Self {
            coordinate,
            z_ground: coordinate.z,
            ground_coefficient,
            kind: CutPointKind::GroundEffect,
        }
    }

    /// Altitude of the point itself (m).
    pub fn altitude(&self) -> f64 {
        self.coordinate.z
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, CutPointKind::Source { .. })
    }

    pub fn is_receiver(&self) -> bool {
        matches!(self.kind, CutPointKind::Receiver { .. })
    }

    /// Identifier used in output records: the external key when one exists,
    /// the in-memory index otherwise.
    ///
    /// None for points that are neither a source nor a receiver.
    pub fn external_key(&self) -> Option<i64> {
        match self.kind {
            CutPointKind::Source { id, pk, .. } | CutPointKind::Receiver { id, pk } => {
                Some(pk.unwrap_or(id as i64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            CutPointKind::Source { .. } => "source",
            CutPointKind::Receiver { .. } => "receiver",
            CutPointKind::Wall { .. } => "wall",
            CutPointKind::Topography => "topography",
            CutPointKind::GroundEffect => "ground effect",
        };
        write!(
            f,
            "{kind} at {:.2}, ground {:.2} m, g={:.2}",
            self.coordinate, self.z_ground, self.ground_coefficient
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_ground_altitude() {
        let src = CutPoint::source(Point::new(0., 0., 1.5), 0, None, 1.0);
        assert_eq!(src.z_ground, 1.5);

        let wall = CutPoint::wall(Point::new(5., 0., 8.0), 1.5, 0);
        assert_eq!(wall.altitude(), 8.0);
        assert_eq!(wall.z_ground, 1.5);

        let topo = CutPoint::topography(Point::new(2., 0., 3.0));
        assert_eq!(topo.z_ground, topo.altitude());
    }

    #[test]
    fn test_external_key_prefers_primary_key() {
        let with_pk = CutPoint::source(Point::new(0., 0., 0.), 3, Some(412), 1.0);
        assert_eq!(with_pk.external_key(), Some(412));

        let without_pk = CutPoint::receiver(Point::new(0., 0., 0.), 7, None);
        assert_eq!(without_pk.external_key(), Some(7));

        let wall = CutPoint::wall(Point::new(0., 0., 0.), 0.0, 0);
        assert_eq!(wall.external_key(), None);
    }

    #[test]
    fn test_role_predicates() {
        let src = CutPoint::source(Point::new(0., 0., 0.), 0, None, 1.0);
        assert!(src.is_source());
        assert!(!src.is_receiver());

        let rcv = CutPoint::receiver(Point::new(1., 0., 0.), 0, None);
        assert!(rcv.is_receiver());
        assert!(!rcv.is_source());
    }

    #[test]
    fn test_display() {
        let wall = CutPoint::wall(Point::new(5., 0., 8.), 1.5, 0);
        assert_eq!(
            wall.to_string(),
            "wall at Point(5.00, 0.00, 8.00), ground 1.50 m, g=0.00"
        );
    }
}
