//! Attenuation paths and the builders that derive them from cut profiles.

use crate::acoustics::{Spectrum, TimePeriod, NUM_OCTAVE_BANDS, OCTAVE_BAND_FREQUENCIES, SOUND_SPEED};
use crate::geom::EPS;
use crate::profile::cutpoint::CutPointKind;
use crate::{CutProfile, Point};
use serde::{Deserialize, Serialize};

/// Acoustic description of one source-receiver path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttenuationPath {
    /// External identifier of the source.
    pub source: i64,
    /// External identifier of the receiver.
    pub receiver: i64,
    /// In-memory source index.
    pub source_index: usize,
    /// In-memory receiver index.
    pub receiver_index: usize,
    /// Power share of the source segment this path samples.
    pub li: f64,
    /// Straight source-receiver distance (m).
    pub distance: f64,
    /// Attenuation per band, air absorption excluded (dB).
    pub attenuation: Spectrum,
    pub free_field: bool,
    /// Period tag of attenuation matrix exports, None otherwise.
    pub time_period: Option<TimePeriod>,
}

/// Derives an attenuation path from a cut profile.
///
/// Implementations own the formula-specific knobs. Returning None rejects a
/// degenerate or unusable profile and the engine moves on to the next one.
pub trait PathBuilder {
    fn build(&self, profile: &CutProfile) -> Option<AttenuationPath>;
}

/// Reference formula: geometric divergence, mean ground effect and single
/// edge diffraction over the profile silhouette.
#[derive(Debug, Clone, Default)]
pub struct ReferencePathBuilder {
    /// Silhouette simplification tolerance (m).
    pub tolerance: f64,
}

impl ReferencePathBuilder {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Path length difference over the highest silhouette vertex protruding
    /// above the direct line (m). Zero when nothing protrudes.
    fn diffraction_delta(&self, profile: &CutProfile, source_z: f64, receiver_z: f64) -> f64 {
        let flat = profile.ground_profile_2d(self.tolerance);
        if flat.len() < 3 {
            return 0.0;
        }
        let src = Point::new(0.0, source_z, 0.0);
        let rcv = Point::new(flat[flat.len() - 1].x, receiver_z, 0.0);
        if rcv.x < EPS {
            return 0.0;
        }
        let direct = src.distance_to(&rcv);

        let mut delta: f64 = 0.0;
        for p in &flat[1..flat.len() - 1] {
            // Clearance above the direct line at this chainage
            let line_y = src.y + (rcv.y - src.y) * p.x / rcv.x;
            if p.y > line_y {
                let detour = src.distance_to(p) + p.distance_to(&rcv) - direct;
                delta = delta.max(detour);
            }
        }
        delta
    }
}

impl PathBuilder for ReferencePathBuilder {
    fn build(&self, profile: &CutProfile) -> Option<AttenuationPath> {
        let source = profile.source()?;
        let receiver = profile.receiver()?;
        let (source_index, li) = match source.kind {
            CutPointKind::Source { id, li, .. } => (id, li),
            _ => return None,
        };
        let receiver_index = match receiver.kind {
            CutPointKind::Receiver { id, .. } => id,
            _ => return None,
        };
        let source_key = source.external_key()?;
        let receiver_key = receiver.external_key()?;

        let distance = source.coordinate.distance_to(&receiver.coordinate);
        if distance < EPS {
            return None;
        }

        // Geometric divergence of a point source
        let divergence = 20.0 * distance.log10() + 11.0;

        // Mean ground effect, -3 dB over fully reflective ground
        let ground = -3.0 * (1.0 - profile.ground_coefficient());

        let free_field = profile.is_free_field();
        let delta = if free_field {
            0.0
        } else {
            self.diffraction_delta(profile, source.altitude(), receiver.altitude())
        };

        let mut attenuation = [0.0; NUM_OCTAVE_BANDS];
        for (band, out) in attenuation.iter_mut().enumerate() {
            let mut total = divergence + ground;
            if !free_field {
                total += screen_attenuation(delta, OCTAVE_BAND_FREQUENCIES[band]);
            }
            *out = total.max(0.0);
        }

        Some(AttenuationPath {
            source: source_key,
            receiver: receiver_key,
            source_index,
            receiver_index,
            li,
            distance,
            attenuation,
            free_field,
            time_period: None,
        })
    }
}

/// Screen attenuation for a path length difference, Maekawa formula (dB).
///
/// Clamped to the 0 to 25 dB range of a thin screen.
fn screen_attenuation(delta: f64, frequency: f64) -> f64 {
    let wavelength = SOUND_SPEED / frequency;
    let fresnel = 2.0 * delta / wavelength;
    (10.0 * (3.0 + 20.0 * fresnel).log10()).clamp(0.0, 25.0)
}
