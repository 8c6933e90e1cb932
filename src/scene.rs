//! Scene model: sources, receivers, obstacles, terrain and ground regions.
//!
//! The scene owns the plan-view geometry and turns a source-receiver pair
//! into a [`CutProfile`] by cutting a straight line through everything it
//! stores. All crossings work in plan view; altitudes come from the terrain
//! and the obstacle tops.

pub mod emission;
pub mod terrain;

use crate::acoustics::Spectrum;
use crate::geom::segment::segment_intersection_2d;
use crate::geom::EPS;
use crate::profile::cutpoint::CutPoint;
use crate::scene::emission::EmissionStore;
use crate::scene::terrain::Terrain;
use crate::{CutProfile, Point};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Plan offset of the ground-level points bracketing an obstacle crossing (m).
const FOOT_OFFSET: f64 = 0.001;

/// Sound source position with its optional external key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub position: Point,
    /// External primary key, when the source comes from a table.
    pub pk: Option<i64>,
    /// Power share of the source segment this point samples.
    pub li: f64,
}

/// Receiver position with its optional external key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub position: Point,
    pub pk: Option<i64>,
}

/// Obstacle in plan view: a standalone wall or a closed building outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Wall segments in plan view.
    pub segments: Vec<(Point, Point)>,
    /// Absolute altitude of the top edge (m).
    pub altitude: f64,
}

/// Region of uniform ground absorption, a closed plan-view ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundRegion {
    pub ring: Vec<Point>,
    /// Ground absorption inside the ring, 0 reflective to 1 absorbing.
    pub g: f64,
}

impl GroundRegion {
    /// Even-odd test of a plan position against the ring.
    fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = &self.ring[i];
            let pj = &self.ring[j];
            if (pi.y > y) != (pj.y > y)
                && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Everything the cut profile builder needs to know about the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub sources: Vec<Source>,
    pub receivers: Vec<Receiver>,
    pub obstacles: Vec<Obstacle>,
    pub ground_regions: Vec<GroundRegion>,
    pub terrain: Terrain,
    pub emission: EmissionStore,
    /// Ground absorption outside every region, 0 reflective to 1 absorbing.
    pub g_default: f64,
    /// Sources beyond this distance from a receiver are not computed (m).
    pub maximum_source_distance: f64,
    /// Silhouette simplification tolerance handed to path builders (m).
    pub profile_tolerance: f64,
    /// Treat low source-side screens as obstacles, for formulas that
    /// distinguish them. The reference path builder does not.
    pub body_barrier: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            receivers: Vec::new(),
            obstacles: Vec::new(),
            ground_regions: Vec::new(),
            terrain: Terrain::new(),
            emission: EmissionStore::new(),
            g_default: 0.0,
            maximum_source_distance: 1200.0,
            profile_tolerance: 0.0,
            body_barrier: false,
        }
    }

    /// Adds a point source emitting the same spectrum in every period (dB).
    ///
    /// Returns the source index.
    pub fn add_source(&mut self, position: Point, pk: Option<i64>, level_db: &Spectrum) -> usize {
        self.emission.push_uniform(level_db);
        self.sources.push(Source {
            position,
            pk,
            li: 1.0,
        });
        self.sources.len() - 1
    }

    /// Adds a point source with per-period spectra (dB) and a power share.
    pub fn add_source_periods(
        &mut self,
        position: Point,
        pk: Option<i64>,
        li: f64,
        day_db: &Spectrum,
        evening_db: &Spectrum,
        night_db: &Spectrum,
    ) -> usize {
        self.emission.push_periods(day_db, evening_db, night_db);
        self.sources.push(Source { position, pk, li });
        self.sources.len() - 1
    }

    /// Adds a receiver. Returns the receiver index.
    pub fn add_receiver(&mut self, position: Point, pk: Option<i64>) -> usize {
        self.receivers.push(Receiver { position, pk });
        self.receivers.len() - 1
    }

    /// Adds a standalone wall with its top at an absolute altitude.
    ///
    /// Returns the obstacle index.
    pub fn add_wall(&mut self, p0: Point, p1: Point, altitude: f64) -> usize {
        self.obstacles.push(Obstacle {
            segments: vec![(p0, p1)],
            altitude,
        });
        self.obstacles.len() - 1
    }

    /// Adds a building from its plan footprint, closed automatically.
    pub fn add_building(&mut self, footprint: &[Point], altitude: f64) -> Result<usize> {
        if footprint.len() < 3 {
            bail!(
                "building footprint needs at least 3 points, got {}",
                footprint.len()
            );
        }
        let mut segments = Vec::with_capacity(footprint.len());
        for i in 0..footprint.len() {
            segments.push((footprint[i], footprint[(i + 1) % footprint.len()]));
        }
        self.obstacles.push(Obstacle {
            segments,
            altitude,
        });
        Ok(self.obstacles.len() - 1)
    }

    /// Adds a ground absorption region. Later regions override earlier ones.
    pub fn add_ground_region(&mut self, ring: Vec<Point>, g: f64) -> Result<()> {
        if ring.len() < 3 {
            bail!("ground region ring needs at least 3 points, got {}", ring.len());
        }
        if !(0.0..=1.0).contains(&g) {
            bail!("ground coefficient must be within [0, 1], got {g}");
        }
        self.ground_regions.push(GroundRegion { ring, g });
        Ok(())
    }

    /// Ground absorption at a plan position.
    pub fn ground_coefficient_at(&self, x: f64, y: f64) -> f64 {
        for region in self.ground_regions.iter().rev() {
            if region.contains(x, y) {
                return region.g;
            }
        }
        self.g_default
    }

    /// Builds the vertical cut between a source and a receiver.
    ///
    /// The profile starts at the source, ends at the receiver and lists every
    /// obstacle, terrain and ground region crossing in between, ordered by
    /// distance from the source. Blocking flags are raised when the direct
    /// line dips below an obstacle top or the terrain.
    pub fn cut_profile(&self, source: usize, receiver: usize) -> CutProfile {
        let src = &self.sources[source];
        let rcv = &self.receivers[receiver];
        let mut profile = CutProfile::new(
            CutPoint::source(src.position, source, src.pk, src.li),
            CutPoint::receiver(rcv.position, receiver, rcv.pk),
        );

        let s = src.position;
        let r = rcv.position;
        let span = s.distance_2d(&r);
        if span < EPS {
            // Vertical line: nothing crosses a zero-length plan segment
            self.assign_ground_coefficients(&mut profile);
            return profile;
        }

        let mut cuts: Vec<CutPoint> = Vec::new();
        self.cut_obstacles(&mut profile, &mut cuts, s, r, span);
        self.cut_terrain(&mut profile, &mut cuts, s, r);
        self.cut_ground_regions(&mut cuts, s, r);
        profile.insert_points(true, cuts);
        self.assign_ground_coefficients(&mut profile);

        tracing::trace!(
            source,
            receiver,
            points = profile.points.len(),
            blocked = !profile.is_free_field(),
            "cut profile built"
        );
        profile
    }

    fn cut_obstacles(
        &self,
        profile: &mut CutProfile,
        cuts: &mut Vec<CutPoint>,
        s: Point,
        r: Point,
        span: f64,
    ) {
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            let mut crossings: Vec<f64> = obstacle
                .segments
                .iter()
                .filter_map(|(w0, w1)| segment_intersection_2d(s, r, *w0, *w1).map(|(t, _)| t))
                .collect();
            if crossings.is_empty() {
                continue;
            }
            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

            // Ground-level feet just outside the crossing run keep the
            // silhouette walk in step with the distance ordering
            let dt = FOOT_OFFSET / span;
            for t in [crossings[0] - dt, crossings[crossings.len() - 1] + dt] {
                if t <= 0.0 || t >= 1.0 {
                    continue; // endpoint sits inside the footprint
                }
                let plan = Point::new_between_2_points(s, r, t);
                let ground = self.terrain.elevation_at(plan.x, plan.y);
                cuts.push(CutPoint::wall(
                    Point::new(plan.x, plan.y, ground),
                    ground,
                    index,
                ));
            }

            for t in crossings {
                let plan = Point::new_between_2_points(s, r, t);
                let ground = self.terrain.elevation_at(plan.x, plan.y);
                cuts.push(CutPoint::wall(
                    Point::new(plan.x, plan.y, obstacle.altitude),
                    ground,
                    index,
                ));
                // plan.z interpolates the direct line altitude at the crossing
                if plan.z < obstacle.altitude - EPS {
                    profile.has_building_intersection = true;
                }
            }
        }
    }

    fn cut_terrain(&self, profile: &mut CutProfile, cuts: &mut Vec<CutPoint>, s: Point, r: Point) {
        let mut crossings: Vec<(f64, f64)> = Vec::new(); // (t, ground altitude)
        for triangle in &self.terrain.triangles {
            for (e0, e1) in triangle.edges() {
                if let Some((t, u)) = segment_intersection_2d(s, r, e0, e1) {
                    // Adjacent triangles share edges: keep each crossing once
                    if crossings.iter().any(|(seen, _)| (seen - t).abs() < 1e-9) {
                        continue;
                    }
                    let ground = e0.z + (e1.z - e0.z) * u;
                    crossings.push((t, ground));
                }
            }
        }
        for (t, ground) in crossings {
            let plan = Point::new_between_2_points(s, r, t);
            cuts.push(CutPoint::topography(Point::new(plan.x, plan.y, ground)));
            if plan.z < ground - EPS {
                profile.has_topography_intersection = true;
            }
        }
    }

    fn cut_ground_regions(&self, cuts: &mut Vec<CutPoint>, s: Point, r: Point) {
        for region in &self.ground_regions {
            let n = region.ring.len();
            for i in 0..n {
                let e0 = region.ring[i];
                let e1 = region.ring[(i + 1) % n];
                if let Some((t, _)) = segment_intersection_2d(s, r, e0, e1) {
                    if t <= 0.0 || t >= 1.0 {
                        continue;
                    }
                    let plan = Point::new_between_2_points(s, r, t);
                    let ground = self.terrain.elevation_at(plan.x, plan.y);
                    cuts.push(CutPoint::ground_effect(
                        Point::new(plan.x, plan.y, ground),
                        region.g,
                    ));
                }
            }
        }
    }

    /// Samples the ground absorption at the middle of each segment, so a
    /// boundary point starts its segment with the coefficient of the region
    /// the segment actually runs through.
    fn assign_ground_coefficients(&self, profile: &mut CutProfile) {
        let n = profile.points.len();
        for i in 0..n {
            let here = profile.points[i].coordinate;
            let (x, y) = if i + 1 < n {
                let next = profile.points[i + 1].coordinate;
                ((here.x + next.x) / 2.0, (here.y + next.y) / 2.0)
            } else {
                (here.x, here.y)
            };
            profile.points[i].ground_coefficient = self.ground_coefficient_at(x, y);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
