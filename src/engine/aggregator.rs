//! Per-receiver aggregation state machine.

use crate::acoustics::{self, Spectrum, TimePeriod, NUM_OCTAVE_BANDS};
use crate::engine::config::{EngineConfig, ExportPathsMethod};
use crate::engine::output::{OutputChannel, ProgressCallback, ReceiverLevel};
use crate::engine::{CutPlaneVisitor, PathSearchStrategy, ReceiverPointInfo, SourcePointInfo};
use crate::propagation::path::{AttenuationPath, PathBuilder};
use crate::propagation::visitor::AttenuationVisitor;
use crate::{CutPoint, CutProfile, Point, Scene};
use std::collections::HashMap;
use std::mem;
use std::sync::atomic::Ordering;

/// Received power per period (linear W).
#[derive(Debug, Clone, Copy)]
pub struct PeriodLevels {
    pub day: Spectrum,
    pub evening: Spectrum,
    pub night: Spectrum,
}

impl PeriodLevels {
    fn zero() -> Self {
        Self {
            day: [0.0; NUM_OCTAVE_BANDS],
            evening: [0.0; NUM_OCTAVE_BANDS],
            night: [0.0; NUM_OCTAVE_BANDS],
        }
    }

    fn add(&mut self, other: &PeriodLevels) {
        self.day = acoustics::sum_spectrum(&self.day, &other.day);
        self.evening = acoustics::sum_spectrum(&self.evening, &other.evening);
        self.night = acoustics::sum_spectrum(&self.night, &other.night);
    }

    /// Time-weighted combination without penalties (linear W).
    fn combined(&self) -> Spectrum {
        acoustics::period_weighted(&self.day, &self.evening, &self.night)
    }
}

/// Folds the cut planes of one receiver at a time into level records.
///
/// One aggregator lives on one worker thread and is reused across
/// receivers. `start_receiver` clears all per-receiver state, so a skip
/// latched for one receiver never leaks into the next.
pub struct ReceiverAggregator<'a> {
    scene: &'a Scene,
    config: &'a EngineConfig,
    builder: &'a (dyn PathBuilder + Sync),
    output: &'a OutputChannel,
    progress: &'a dyn ProgressCallback,
    day_visitor: AttenuationVisitor,
    evening_visitor: AttenuationVisitor,
    night_visitor: AttenuationVisitor,
    /// Received power per source key, keyed `None` when sources merge.
    levels_per_source: HashMap<Option<usize>, PeriodLevels>,
    retained_paths: Vec<AttenuationPath>,
    /// Combined power already received, for the early stop test.
    power_at_receiver: Spectrum,
    /// Best-case power still expected from each pending source.
    max_expected_power: HashMap<usize, f64>,
    sum_max_expected_power: f64,
    skip_latched: bool,
}

impl<'a> ReceiverAggregator<'a> {
    pub fn new(
        scene: &'a Scene,
        config: &'a EngineConfig,
        builder: &'a (dyn PathBuilder + Sync),
        output: &'a OutputChannel,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            scene,
            config,
            builder,
            output,
            progress,
            day_visitor: AttenuationVisitor::new(TimePeriod::Day, config.day_conditions.clone()),
            evening_visitor: AttenuationVisitor::new(
                TimePeriod::Evening,
                config.evening_conditions.clone(),
            ),
            night_visitor: AttenuationVisitor::new(
                TimePeriod::Night,
                config.night_conditions.clone(),
            ),
            levels_per_source: HashMap::new(),
            retained_paths: Vec::new(),
            power_at_receiver: [0.0; NUM_OCTAVE_BANDS],
            max_expected_power: HashMap::new(),
            sum_max_expected_power: 0.0,
            skip_latched: false,
        }
    }

    /// Received power of one path in every requested period.
    ///
    /// Periods that feed no output stay at zero so their records never
    /// carry energy.
    fn received_levels(&self, path: &AttenuationPath) -> PeriodLevels {
        let mut levels = PeriodLevels::zero();
        if self.config.period_requested(TimePeriod::Day) {
            let emission = self.scene.emission.emission(TimePeriod::Day, path.source_index);
            levels.day = self.day_visitor.attenuate(path, &emission);
        }
        if self.config.period_requested(TimePeriod::Evening) {
            let emission = self
                .scene
                .emission
                .emission(TimePeriod::Evening, path.source_index);
            levels.evening = self.evening_visitor.attenuate(path, &emission);
        }
        if self.config.period_requested(TimePeriod::Night) {
            let emission = self
                .scene
                .emission
                .emission(TimePeriod::Night, path.source_index);
            levels.night = self.night_visitor.attenuate(path, &emission);
        }
        levels
    }

    fn retain_path(&mut self, path: &AttenuationPath) {
        if self.config.export_paths == ExportPathsMethod::None {
            return;
        }
        if self.config.export_attenuation_matrix {
            for period in TimePeriod::all() {
                if self.config.period_requested(period) {
                    let mut tagged = path.clone();
                    tagged.time_period = Some(period);
                    self.retained_paths.push(tagged);
                }
            }
        } else {
            self.retained_paths.push(path.clone());
        }
    }

    /// Replaces the source's best-case bound with its real contribution and
    /// decides whether the remaining sources are still worth cutting.
    fn update_early_stop(
        &mut self,
        path: &AttenuationPath,
        levels: &PeriodLevels,
    ) -> PathSearchStrategy {
        let combined = levels.combined();
        self.power_at_receiver = acoustics::sum_spectrum(&self.power_at_receiver, &combined);
        let current_level = acoustics::w_to_dba(acoustics::total_power(&self.power_at_receiver));

        if let Some(bound) = self.max_expected_power.remove(&path.source_index) {
            self.sum_max_expected_power -= bound;
        }
        self.sum_max_expected_power += acoustics::total_power(&combined);

        let best_case = acoustics::w_to_dba(self.sum_max_expected_power);
        if best_case - current_level < self.config.maximum_error {
            self.skip_latched = true;
            PathSearchStrategy::SkipReceiver
        } else {
            PathSearchStrategy::Continue
        }
    }
}

impl CutPlaneVisitor for ReceiverAggregator<'_> {
    fn start_receiver(&mut self, receiver: &ReceiverPointInfo, sources: &[SourcePointInfo]) {
        self.skip_latched = false;
        self.power_at_receiver = [0.0; NUM_OCTAVE_BANDS];
        self.sum_max_expected_power = 0.0;
        self.max_expected_power.clear();
        self.levels_per_source.clear();
        self.retained_paths.clear();

        if self.config.maximum_error <= 0.0 {
            return;
        }
        // Bound each source by its direct line over reflective ground, the
        // loudest that source can ever get at this receiver.
        for source in sources {
            let direct = CutProfile::new(
                CutPoint::source(source.position, source.index, source.pk, source.li),
                CutPoint::receiver(receiver.position, receiver.index, receiver.pk),
            );
            if let Some(path) = self.builder.build(&direct) {
                let levels = self.received_levels(&path);
                let power = acoustics::total_power(&levels.combined());
                *self.max_expected_power.entry(source.index).or_insert(0.0) += power;
                self.sum_max_expected_power += power;
            }
        }
    }

    fn on_new_cut_plane(&mut self, profile: &CutProfile) -> PathSearchStrategy {
        if self.skip_latched {
            return PathSearchStrategy::SkipReceiver;
        }
        let path = match self.builder.build(profile) {
            Some(path) => path,
            None => return PathSearchStrategy::Continue,
        };
        self.output.path_count.fetch_add(1, Ordering::SeqCst);

        let levels = self.received_levels(&path);
        let strategy = if self.config.maximum_error > 0.0 {
            self.update_early_stop(&path, &levels)
        } else {
            PathSearchStrategy::Continue
        };

        self.retain_path(&path);
        let key = if self.config.merge_sources {
            None
        } else {
            Some(path.source_index)
        };
        self.levels_per_source
            .entry(key)
            .or_insert_with(PeriodLevels::zero)
            .add(&levels);
        strategy
    }

    fn finalize_receiver(&mut self, receiver: usize) {
        if !self.retained_paths.is_empty() {
            let batch = mem::take(&mut self.retained_paths);
            match self.config.export_paths {
                ExportPathsMethod::ToQueue => self.output.push_paths(batch, self.progress),
                ExportPathsMethod::ToMemory => self.output.store_paths_in_memory(batch),
                ExportPathsMethod::None => {}
            }
        }

        let (receiver_key, position) = match self.scene.receivers.get(receiver) {
            Some(r) => (r.pk.unwrap_or(receiver as i64), r.position),
            None => (receiver as i64, Point::new(0.0, 0.0, 0.0)),
        };

        let levels = mem::take(&mut self.levels_per_source);
        for (key, period_levels) in levels {
            let source_key = match key {
                None => -1,
                Some(index) => self
                    .scene
                    .sources
                    .get(index)
                    .map(|s| s.pk.unwrap_or(index as i64))
                    .unwrap_or(index as i64),
            };
            let record = |levels_w: &Spectrum| ReceiverLevel {
                receiver: receiver_key,
                source: source_key,
                position,
                levels: acoustics::spectrum_w_to_dba(levels_w),
            };
            if self.config.compute_day {
                self.output
                    .push_level(&self.output.day_levels, record(&period_levels.day), self.progress);
            }
            if self.config.compute_evening {
                self.output.push_level(
                    &self.output.evening_levels,
                    record(&period_levels.evening),
                    self.progress,
                );
            }
            if self.config.compute_night {
                self.output.push_level(
                    &self.output.night_levels,
                    record(&period_levels.night),
                    self.progress,
                );
            }
            if self.config.compute_den {
                let den = acoustics::den_composite(
                    &period_levels.day,
                    &period_levels.evening,
                    &period_levels.night,
                );
                self.output
                    .push_level(&self.output.den_levels, record(&den), self.progress);
            }
        }
    }
}
