use crate::acoustics::{self, Spectrum, TimePeriod, NUM_OCTAVE_BANDS};
use serde::{Deserialize, Serialize};

/// Per-period emission spectra of every source, stored as linear power.
///
/// Indexes follow the scene source order. Levels come in as dB and are
/// converted once on insert, so the hot path never leaves the linear domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmissionStore {
    day: Vec<Spectrum>,
    evening: Vec<Spectrum>,
    night: Vec<Spectrum>,
}

impl EmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_empty()
    }

    /// Appends a source with the same level spectrum in every period (dB).
    pub fn push_uniform(&mut self, level_db: &Spectrum) {
        self.push_periods(level_db, level_db, level_db);
    }

    /// Appends a source with one level spectrum per period (dB).
    pub fn push_periods(&mut self, day_db: &Spectrum, evening_db: &Spectrum, night_db: &Spectrum) {
        self.day.push(acoustics::spectrum_dba_to_w(day_db));
        self.evening.push(acoustics::spectrum_dba_to_w(evening_db));
        self.night.push(acoustics::spectrum_dba_to_w(night_db));
    }

    /// Emission power of one source for one period (linear W).
    ///
    /// Unknown sources are silent.
    pub fn emission(&self, period: TimePeriod, source: usize) -> Spectrum {
        let table = match period {
            TimePeriod::Day => &self.day,
            TimePeriod::Evening => &self.evening,
            TimePeriod::Night => &self.night,
        };
        table.get(source).copied().unwrap_or([0.0; NUM_OCTAVE_BANDS])
    }
}
