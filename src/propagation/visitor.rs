use crate::acoustics::{self, Spectrum, TimePeriod, NUM_OCTAVE_BANDS};
use crate::propagation::conditions::PropagationConditions;
use crate::propagation::path::AttenuationPath;

/// Applies one period's propagation conditions to built paths.
///
/// The visitor is stateless: it turns a path and the matching source emission
/// into received power, and the caller owns all accumulation.
#[derive(Debug, Clone)]
pub struct AttenuationVisitor {
    pub period: TimePeriod,
    pub conditions: PropagationConditions,
}

impl AttenuationVisitor {
    pub fn new(period: TimePeriod, conditions: PropagationConditions) -> Self {
        Self { period, conditions }
    }

    /// Received power of one path (linear W).
    ///
    /// `emission` is the source power spectrum of this visitor's period,
    /// in linear W per band.
    pub fn attenuate(&self, path: &AttenuationPath, emission: &Spectrum) -> Spectrum {
        let air = self.conditions.attenuation_over(path.distance);
        let mut out = [0.0; NUM_OCTAVE_BANDS];
        for i in 0..NUM_OCTAVE_BANDS {
            let gain = acoustics::dba_to_w(-(path.attenuation[i] + air[i]));
            out[i] = emission[i] * path.li * gain;
        }
        out
    }
}
