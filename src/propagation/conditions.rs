use crate::acoustics::{Spectrum, NUM_OCTAVE_BANDS, OCTAVE_BAND_FREQUENCIES};

/// Reference atmospheric pressure (Pa).
const REFERENCE_PRESSURE: f64 = 101_325.0;
/// Reference air temperature (K).
const REFERENCE_TEMPERATURE: f64 = 293.15;
/// Triple point isotherm temperature of water (K).
const TRIPLE_POINT_TEMPERATURE: f64 = 273.16;
const CELSIUS_OFFSET: f64 = 273.15;

/// Atmospheric state of one emission period.
///
/// Carries the air absorption spectrum derived from temperature and humidity
/// following ISO 9613-1.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationConditions {
    /// Air temperature (deg C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    /// Air absorption per band (dB/km).
    pub alpha_atmo: Spectrum,
}

impl PropagationConditions {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        let mut alpha_atmo = [0.0; NUM_OCTAVE_BANDS];
        for (alpha, freq) in alpha_atmo.iter_mut().zip(OCTAVE_BAND_FREQUENCIES.iter()) {
            *alpha = atmospheric_absorption(*freq, temperature, humidity, REFERENCE_PRESSURE);
        }
        Self {
            temperature,
            humidity,
            alpha_atmo,
        }
    }

    /// 15 deg C and 70% relative humidity.
    pub fn standard() -> Self {
        Self::new(15.0, 70.0)
    }

    /// Air absorption over a propagation distance, in dB per band.
    pub fn attenuation_over(&self, distance: f64) -> Spectrum {
        let mut out = [0.0; NUM_OCTAVE_BANDS];
        for (o, alpha) in out.iter_mut().zip(self.alpha_atmo.iter()) {
            *o = alpha * distance / 1000.0;
        }
        out
    }
}

impl Default for PropagationConditions {
    fn default() -> Self {
        Self::standard()
    }
}

/// Pure tone air absorption coefficient following ISO 9613-1 (dB/km).
fn atmospheric_absorption(frequency: f64, temperature: f64, humidity: f64, pressure: f64) -> f64 {
    let t_kel = CELSIUS_OFFSET + temperature;
    let p_rel = pressure / REFERENCE_PRESSURE;
    let t_rel = t_kel / REFERENCE_TEMPERATURE;

    // Molar concentration of water vapour (%)
    let c_sat = 4.6151 - 6.8346 * (TRIPLE_POINT_TEMPERATURE / t_kel).powf(1.261);
    let h_molar = humidity * 10f64.powf(c_sat) / p_rel;

    // Oxygen and nitrogen relaxation frequencies (Hz)
    let f_oxygen = p_rel * (24.0 + 40_400.0 * h_molar * (0.02 + h_molar) / (0.391 + h_molar));
    let f_nitrogen = p_rel
        * t_rel.powf(-0.5)
        * (9.0 + 280.0 * h_molar * (-4.17 * (t_rel.powf(-1.0 / 3.0) - 1.0)).exp());

    let oxygen_relax =
        0.01275 * (-2239.1 / t_kel).exp() / (f_oxygen + frequency * frequency / f_oxygen);
    let nitrogen_relax =
        0.1068 * (-3352.0 / t_kel).exp() / (f_nitrogen + frequency * frequency / f_nitrogen);
    let classical = 1.84e-11 / p_rel * t_rel.sqrt();

    8686.0 * frequency * frequency * (classical + t_rel.powf(-2.5) * (oxygen_relax + nitrogen_relax))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorption_grows_with_frequency() {
        let conditions = PropagationConditions::standard();
        for i in 1..NUM_OCTAVE_BANDS {
            assert!(
                conditions.alpha_atmo[i] > conditions.alpha_atmo[i - 1],
                "absorption must grow with frequency, band {i}: {} <= {}",
                conditions.alpha_atmo[i],
                conditions.alpha_atmo[i - 1]
            );
        }
        assert!(conditions.alpha_atmo.iter().all(|a| *a > 0.0));
    }

    #[test]
    fn test_absorption_magnitude_at_1khz() {
        // ISO 9613-1 tables put 1 kHz at a few dB/km in temperate conditions
        let conditions = PropagationConditions::standard();
        let at_1khz = conditions.alpha_atmo[4];
        assert!(
            (2.0..6.0).contains(&at_1khz),
            "1 kHz absorption out of the expected range: {at_1khz} dB/km"
        );
    }

    #[test]
    fn test_attenuation_over_distance() {
        let conditions = PropagationConditions::standard();

        let none = conditions.attenuation_over(0.0);
        assert!(none.iter().all(|a| *a == 0.0));

        let one_km = conditions.attenuation_over(1000.0);
        assert_eq!(one_km, conditions.alpha_atmo, "1 km must give the dB/km spectrum");

        let half = conditions.attenuation_over(500.0);
        for i in 0..NUM_OCTAVE_BANDS {
            assert!((half[i] * 2.0 - one_km[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_conditions_differ_with_temperature() {
        let cold = PropagationConditions::new(0.0, 70.0);
        let warm = PropagationConditions::new(30.0, 70.0);
        assert_ne!(
            cold.alpha_atmo, warm.alpha_atmo,
            "temperature must change the absorption spectrum"
        );
    }
}
