//! Aggregation engine settings.

use crate::acoustics::TimePeriod;
use crate::propagation::conditions::PropagationConditions;

/// Where finished attenuation paths go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPathsMethod {
    /// Paths are dropped once levels are computed.
    None,
    /// Paths go to the shared output queue for a consumer to drain.
    ToQueue,
    /// Paths accumulate in memory behind a lock.
    ToMemory,
}

/// Engine settings.
///
/// The defaults compute all three periods plus the day-evening-night
/// composite, merge sources into one record per receiver and never stop
/// early.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Compute day period levels.
    pub compute_day: bool,
    /// Compute evening period levels.
    pub compute_evening: bool,
    /// Compute night period levels.
    pub compute_night: bool,
    /// Compute the day-evening-night composite.
    pub compute_den: bool,
    /// Collapse all sources of a receiver into one record.
    pub merge_sources: bool,
    /// Stop a receiver once the remaining sources cannot move its level by
    /// more than this many dB. Zero disables the heuristic.
    pub maximum_error: f64,
    /// Destination of finished attenuation paths.
    pub export_paths: ExportPathsMethod,
    /// Retain one tagged path copy per requested period instead of one
    /// untagged copy per cut plane.
    pub export_attenuation_matrix: bool,
    /// Records the output queues hold before producers block.
    pub output_maximum_queue: usize,
    /// Cap on exported paths across the whole run. Zero means no cap.
    pub maximum_paths_count: usize,
    /// Atmosphere during the day period.
    pub day_conditions: PropagationConditions,
    /// Atmosphere during the evening period.
    pub evening_conditions: PropagationConditions,
    /// Atmosphere during the night period.
    pub night_conditions: PropagationConditions,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            compute_day: true,
            compute_evening: true,
            compute_night: true,
            compute_den: true,
            merge_sources: true,
            maximum_error: 0.0,
            export_paths: ExportPathsMethod::None,
            export_attenuation_matrix: false,
            output_maximum_queue: 50_000,
            maximum_paths_count: 0,
            day_conditions: PropagationConditions::standard(),
            evening_conditions: PropagationConditions::standard(),
            night_conditions: PropagationConditions::standard(),
        }
    }

    /// True when a period's levels feed any requested output.
    ///
    /// The composite needs all three periods, so requesting it pulls in
    /// periods whose direct output is off.
    pub fn period_requested(&self, period: TimePeriod) -> bool {
        let direct = match period {
            TimePeriod::Day => self.compute_day,
            TimePeriod::Evening => self.compute_evening,
            TimePeriod::Night => self.compute_night,
        };
        direct || self.compute_den
    }

    /// Atmosphere of one period.
    pub fn conditions(&self, period: TimePeriod) -> &PropagationConditions {
        match period {
            TimePeriod::Day => &self.day_conditions,
            TimePeriod::Evening => &self.evening_conditions,
            TimePeriod::Night => &self.night_conditions,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new();
        assert!(config.compute_day && config.compute_evening);
        assert!(config.compute_night && config.compute_den);
        assert!(config.merge_sources, "sources should merge out of the box");
        assert_eq!(config.maximum_error, 0.0, "early stop should be off");
        assert_eq!(config.export_paths, ExportPathsMethod::None);
        assert!(!config.export_attenuation_matrix);
        assert_eq!(config.output_maximum_queue, 50_000);
        assert_eq!(config.maximum_paths_count, 0, "no path cap");
    }

    #[test]
    fn test_period_requested_follows_den() {
        let mut config = EngineConfig::new();
        config.compute_day = false;
        config.compute_evening = false;
        config.compute_night = false;
        for period in TimePeriod::all() {
            assert!(
                config.period_requested(period),
                "composite should pull in {period}"
            );
        }

        config.compute_den = false;
        for period in TimePeriod::all() {
            assert!(
                !config.period_requested(period),
                "{period} should be off with everything disabled"
            );
        }

        config.compute_night = true;
        assert!(!config.period_requested(TimePeriod::Day));
        assert!(config.period_requested(TimePeriod::Night));
    }

    #[test]
    fn test_conditions_lookup() {
        let mut config = EngineConfig::new();
        config.night_conditions = PropagationConditions::new(5.0, 90.0);
        assert_eq!(
            config.conditions(TimePeriod::Night).temperature,
            5.0,
            "night lookup should hit the night conditions"
        );
        assert_eq!(config.conditions(TimePeriod::Day).temperature, 15.0);
    }
}
