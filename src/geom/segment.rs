//! Line segment operations for the vertical cut plane.
//!
//! Crossing detection works in plan view (x, y): the cut line between a
//! source and a receiver spans a vertical plane, so obstacle and terrain
//! edges cross it at plan intersections regardless of altitude.

use crate::Point;
use crate::geom::EPS;

/// Finds the plan-view intersection of two segments.
///
/// Altitudes are ignored. Returns the parameters `(t, u)` of the crossing
/// along `p1->p2` and `p3->p4`, both in [0, 1], or `None` when the segments
/// are parallel in plan or do not reach each other. Endpoint contact counts
/// as a crossing.
pub fn segment_intersection_2d(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<(f64, f64)> {
    let d1x = p2.x - p1.x;
    let d1y = p2.y - p1.y;
    let d2x = p4.x - p3.x;
    let d2y = p4.y - p3.y;

    let denom = d1x * d2y - d1y * d2x;
    if denom.abs() < EPS {
        return None;
    }

    let rx = p3.x - p1.x;
    let ry = p3.y - p1.y;
    let t = (rx * d2y - ry * d2x) / denom;
    let u = (rx * d1y - ry * d1x) / denom;

    if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
        Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Calculates the distance between a point and a line segment.
///
/// Returns the minimum distance from the point to any point on the segment.
pub fn distance_point_to_segment(pt: Point, p1: Point, p2: Point) -> f64 {
    let seg_vec = p2 - p1;
    let pt_vec = pt - p1;

    let seg_len_sq = seg_vec.dot(seg_vec);

    if seg_len_sq < EPS * EPS {
        // Segment is a point
        return pt_vec.length();
    }

    // Project pt onto the line, clamped to segment
    let t = (pt_vec.dot(seg_vec) / seg_len_sq).clamp(0.0, 1.0);
    let closest = p1 + seg_vec * t;

    (pt - closest).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_at_midpoints() {
        let p1 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(10.0, 0.0, 0.0);
        let p3 = Point::new(5.0, -1.0, 0.0);
        let p4 = Point::new(5.0, 1.0, 0.0);

        let (t, u) = segment_intersection_2d(p1, p2, p3, p4)
            .expect("perpendicular segments must cross");
        assert!((t - 0.5).abs() < 1e-12);
        assert!((u - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_ignores_altitude() {
        // Same plan layout, wildly different z
        let p1 = Point::new(0.0, 0.0, 100.0);
        let p2 = Point::new(10.0, 0.0, -30.0);
        let p3 = Point::new(2.0, -1.0, 55.0);
        let p4 = Point::new(2.0, 3.0, 0.0);

        let (t, u) = segment_intersection_2d(p1, p2, p3, p4)
            .expect("plan-view crossing must be found");
        assert!((t - 0.2).abs() < 1e-12);
        assert!((u - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_endpoint_touch_counts() {
        // T shape: second segment starts exactly on the first
        let p1 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(2.0, 0.0, 0.0);
        let p3 = Point::new(1.0, 0.0, 0.0);
        let p4 = Point::new(1.0, 1.0, 0.0);

        let (t, u) = segment_intersection_2d(p1, p2, p3, p4)
            .expect("endpoint contact counts as a crossing");
        assert!((t - 0.5).abs() < 1e-12);
        assert!(u.abs() < 1e-12);
    }

    #[test]
    fn test_parallel_segments() {
        let p1 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(1.0, 0.0, 0.0);
        let p3 = Point::new(0.0, 1.0, 0.0);
        let p4 = Point::new(1.0, 1.0, 0.0);

        assert!(segment_intersection_2d(p1, p2, p3, p4).is_none());
    }

    #[test]
    fn test_segments_out_of_reach() {
        // Lines would cross at x=5, beyond the end of the first segment
        let p1 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(1.0, 0.0, 0.0);
        let p3 = Point::new(5.0, -1.0, 0.0);
        let p4 = Point::new(5.0, 1.0, 0.0);

        assert!(segment_intersection_2d(p1, p2, p3, p4).is_none());
    }

    #[test]
    fn test_distance_point_to_segment() {
        let p1 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(2.0, 0.0, 0.0);

        // Point directly above middle of segment
        let pt = Point::new(1.0, 1.0, 0.0);
        assert!((distance_point_to_segment(pt, p1, p2) - 1.0).abs() < 1e-12);

        // Point beyond segment end clamps to the endpoint
        let pt = Point::new(3.0, 0.0, 0.0);
        assert!((distance_point_to_segment(pt, p1, p2) - 1.0).abs() < 1e-12);

        // Point at segment start
        let pt = Point::new(0.0, 0.0, 0.0);
        assert!(distance_point_to_segment(pt, p1, p2) < 1e-12);

        // Degenerate segment
        let pt = Point::new(0.0, 3.0, 4.0);
        assert_eq!(distance_point_to_segment(pt, p1, p1), 5.0);
    }
}
