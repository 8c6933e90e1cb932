//! Octave band constants and sound power arithmetic.
//!
//! Levels cross this crate in two domains: decibels for inputs and outputs,
//! linear watts for everything that gets summed. Converting early and summing
//! in the linear domain keeps multi-source aggregation a plain addition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of octave bands used throughout the crate.
pub const NUM_OCTAVE_BANDS: usize = 8;

/// Center frequencies of the octave bands (Hz).
pub const OCTAVE_BAND_FREQUENCIES: [f64; NUM_OCTAVE_BANDS] =
    [63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0];

/// Speed of sound in outdoor air (m/s).
pub const SOUND_SPEED: f64 = 340.0;

/// Per-band values, one entry per octave band.
pub type Spectrum = [f64; NUM_OCTAVE_BANDS];

/// Fraction of the 24h day covered by the day period (06-18).
pub const DAY_RATIO: f64 = 12.0 / 24.0;
/// Fraction of the 24h day covered by the evening period (18-22).
pub const EVENING_RATIO: f64 = 4.0 / 24.0;
/// Fraction of the 24h day covered by the night period (22-06).
pub const NIGHT_RATIO: f64 = 8.0 / 24.0;

/// Evening penalty of the day-evening-night composite (dB).
pub const EVENING_PENALTY_DB: f64 = 5.0;
/// Night penalty of the day-evening-night composite (dB).
pub const NIGHT_PENALTY_DB: f64 = 10.0;

/// One of the three emission periods of a 24h day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Day,
    Evening,
    Night,
}

impl TimePeriod {
    /// All periods, in day, evening, night order.
    pub fn all() -> [TimePeriod; 3] {
        [TimePeriod::Day, TimePeriod::Evening, TimePeriod::Night]
    }

    /// Fraction of the 24h day covered by this period.
    pub fn ratio(&self) -> f64 {
        match self {
            TimePeriod::Day => DAY_RATIO,
            TimePeriod::Evening => EVENING_RATIO,
            TimePeriod::Night => NIGHT_RATIO,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimePeriod::Day => "day",
            TimePeriod::Evening => "evening",
            TimePeriod::Night => "night",
        };
        write!(f, "{name}")
    }
}

/// Converts a level in dB to linear power.
pub fn dba_to_w(dba: f64) -> f64 {
    10f64.powf(dba / 10.0)
}

/// Converts linear power to a level in dB.
///
/// Zero power maps to negative infinity.
pub fn w_to_dba(w: f64) -> f64 {
    10.0 * w.log10()
}

/// Converts a spectrum of levels in dB to linear powers.
pub fn spectrum_dba_to_w(dba: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for (o, v) in out.iter_mut().zip(dba.iter()) {
        *o = dba_to_w(*v);
    }
    out
}

/// Converts a spectrum of linear powers to levels in dB.
pub fn spectrum_w_to_dba(w: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for (o, v) in out.iter_mut().zip(w.iter()) {
        *o = w_to_dba(*v);
    }
    out
}

/// Element-wise sum of two spectra.
pub fn sum_spectrum(a: &Spectrum, b: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for i in 0..NUM_OCTAVE_BANDS {
        out[i] = a[i] + b[i];
    }
    out
}

/// Element-wise product of two spectra.
pub fn multiply_spectrum(a: &Spectrum, b: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for i in 0..NUM_OCTAVE_BANDS {
        out[i] = a[i] * b[i];
    }
    out
}

/// Multiplies every band by a scalar.
pub fn scale_spectrum(a: &Spectrum, factor: f64) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for (o, v) in out.iter_mut().zip(a.iter()) {
        *o = v * factor;
    }
    out
}

/// Energetic sum of two spectra given in dB.
pub fn sum_db_spectrum(a: &Spectrum, b: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for i in 0..NUM_OCTAVE_BANDS {
        out[i] = w_to_dba(dba_to_w(a[i]) + dba_to_w(b[i]));
    }
    out
}

/// Sum of all bands of a linear power spectrum.
pub fn total_power(w: &Spectrum) -> f64 {
    w.iter().sum()
}

/// Time-weighted daily average of the three period powers, without penalties.
///
/// All spectra are linear powers.
pub fn period_weighted(day: &Spectrum, evening: &Spectrum, night: &Spectrum) -> Spectrum {
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for i in 0..NUM_OCTAVE_BANDS {
        out[i] = day[i] * DAY_RATIO + evening[i] * EVENING_RATIO + night[i] * NIGHT_RATIO;
    }
    out
}

/// Day-evening-night composite of the three period powers.
///
/// Evening and night carry their 5 dB and 10 dB penalties. All spectra are
/// linear powers.
pub fn den_composite(day: &Spectrum, evening: &Spectrum, night: &Spectrum) -> Spectrum {
    let evening_gain = dba_to_w(EVENING_PENALTY_DB);
    let night_gain = dba_to_w(NIGHT_PENALTY_DB);
    let mut out = [0.0; NUM_OCTAVE_BANDS];
    for i in 0..NUM_OCTAVE_BANDS {
        out[i] = day[i] * DAY_RATIO
            + evening[i] * evening_gain * EVENING_RATIO
            + night[i] * night_gain * NIGHT_RATIO;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_power_round_trip() {
        for dba in [-30.0, 0.0, 45.0, 90.0] {
            let w = dba_to_w(dba);
            assert!(
                (w_to_dba(w) - dba).abs() < 1e-9,
                "round trip must preserve {dba} dB"
            );
        }
        assert_eq!(dba_to_w(0.0), 1.0);
        assert_eq!(dba_to_w(10.0), 10.0);
    }

    #[test]
    fn test_zero_power_is_minus_infinity() {
        assert_eq!(w_to_dba(0.0), f64::NEG_INFINITY);
        let silent = spectrum_w_to_dba(&[0.0; NUM_OCTAVE_BANDS]);
        assert!(silent.iter().all(|v| *v == f64::NEG_INFINITY));
    }

    #[test]
    fn test_energetic_sum_of_equal_levels() {
        // Two equal sources are 3 dB louder than one
        let a = [60.0; NUM_OCTAVE_BANDS];
        let sum = sum_db_spectrum(&a, &a);
        for v in sum {
            assert!(
                (v - 63.0103).abs() < 1e-3,
                "60 dB + 60 dB must give 63.01 dB, got {v}"
            );
        }
    }

    #[test]
    fn test_linear_sum_commutes_and_associates() {
        let a = spectrum_dba_to_w(&[50.0; NUM_OCTAVE_BANDS]);
        let b = spectrum_dba_to_w(&[60.0; NUM_OCTAVE_BANDS]);
        let c = spectrum_dba_to_w(&[55.0; NUM_OCTAVE_BANDS]);

        let ab = sum_spectrum(&a, &b);
        let ba = sum_spectrum(&b, &a);
        assert_eq!(ab, ba);

        let ab_c = sum_spectrum(&ab, &c);
        let a_bc = sum_spectrum(&a, &sum_spectrum(&b, &c));
        for i in 0..NUM_OCTAVE_BANDS {
            assert!((ab_c[i] - a_bc[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_period_ratios_cover_the_day() {
        let total: f64 = TimePeriod::all().iter().map(|p| p.ratio()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_period_weighted_of_equal_periods_is_identity() {
        let w = spectrum_dba_to_w(&[70.0; NUM_OCTAVE_BANDS]);
        let avg = period_weighted(&w, &w, &w);
        for i in 0..NUM_OCTAVE_BANDS {
            assert!((avg[i] - w[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_den_composite_penalties() {
        let w = spectrum_dba_to_w(&[70.0; NUM_OCTAVE_BANDS]);
        let den = den_composite(&w, &w, &w);
        let level = w_to_dba(den[0]);

        // (12 + 4 * 10^0.5 + 8 * 10) / 24 above the flat level
        let expected = 70.0 + w_to_dba((12.0 + 4.0 * 10f64.powf(0.5) + 8.0 * 10.0) / 24.0);
        assert!(
            (level - expected).abs() < 1e-9,
            "composite must apply 5 dB and 10 dB penalties, got {level}, expected {expected}"
        );
        // Penalties always push the composite above the plain average
        assert!(den[0] > period_weighted(&w, &w, &w)[0]);
    }

    #[test]
    fn test_scale_and_multiply() {
        let a = [2.0; NUM_OCTAVE_BANDS];
        let b = [3.0; NUM_OCTAVE_BANDS];
        assert_eq!(multiply_spectrum(&a, &b), [6.0; NUM_OCTAVE_BANDS]);
        assert_eq!(scale_spectrum(&a, 0.5), [1.0; NUM_OCTAVE_BANDS]);
        assert_eq!(total_power(&a), 16.0);
    }
}
