//! Parallel driver: cuts vertical planes and feeds them through aggregators.

use crate::engine::aggregator::ReceiverAggregator;
use crate::engine::config::EngineConfig;
use crate::engine::output::{NoProgress, OutputChannel, ProgressCallback, ReceiverLevel};
use crate::engine::{CutPlaneVisitor, PathSearchStrategy, ReceiverPointInfo, SourcePointInfo};
use crate::propagation::path::{AttenuationPath, PathBuilder, ReferencePathBuilder};
use crate::Scene;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Wait between consumer sweeps over the output queues.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything a finished run produced.
#[derive(Debug)]
pub struct ComputeResult {
    pub day_levels: Vec<ReceiverLevel>,
    pub evening_levels: Vec<ReceiverLevel>,
    pub night_levels: Vec<ReceiverLevel>,
    pub den_levels: Vec<ReceiverLevel>,
    /// Paths drained from the export queue.
    pub paths: Vec<AttenuationPath>,
    /// Paths collected by the in-memory export.
    pub memory_paths: Vec<AttenuationPath>,
    /// Cut planes that produced a path.
    pub paths_computed: usize,
    pub aborted: bool,
}

/// Levels and paths swept off the queues by the consumer thread.
#[derive(Default)]
struct DrainedRecords {
    day: Vec<ReceiverLevel>,
    evening: Vec<ReceiverLevel>,
    night: Vec<ReceiverLevel>,
    den: Vec<ReceiverLevel>,
    paths: Vec<AttenuationPath>,
}

/// Runs the engine over every receiver with the reference path builder.
pub fn run(scene: &Scene, config: &EngineConfig) -> ComputeResult {
    let builder = ReferencePathBuilder::new(scene.profile_tolerance);
    run_with(scene, config, &builder, &NoProgress)
}

/// Runs the engine with a caller-supplied path builder and progress callback.
///
/// Receivers are split across the rayon pool; each worker reuses one
/// aggregator for all the receivers it picks up. A consumer thread sweeps
/// the shared output channel while the workers run, so producers blocked on
/// the queue bound always make progress.
pub fn run_with(
    scene: &Scene,
    config: &EngineConfig,
    builder: &(dyn PathBuilder + Sync),
    progress: &dyn ProgressCallback,
) -> ComputeResult {
    let output = OutputChannel::new(config);
    let sources: Vec<SourcePointInfo> = scene
        .sources
        .iter()
        .enumerate()
        .map(|(index, s)| SourcePointInfo {
            index,
            pk: s.pk,
            li: s.li,
            position: s.position,
        })
        .collect();

    tracing::debug!(
        receivers = scene.receivers.len(),
        sources = sources.len(),
        "starting attenuation run"
    );

    let workers_done = AtomicBool::new(false);
    let drained = thread::scope(|scope| {
        let consumer = scope.spawn(|| {
            let mut records = DrainedRecords::default();
            loop {
                records.day.append(&mut output.drain_levels(&output.day_levels));
                records
                    .evening
                    .append(&mut output.drain_levels(&output.evening_levels));
                records
                    .night
                    .append(&mut output.drain_levels(&output.night_levels));
                records.den.append(&mut output.drain_levels(&output.den_levels));
                records.paths.append(&mut output.drain_paths());
                if workers_done.load(Ordering::SeqCst) {
                    if output.queue_size.load(Ordering::SeqCst) == 0 {
                        break;
                    }
                } else {
                    thread::sleep(DRAIN_POLL_INTERVAL);
                }
            }
            records
        });

        (0..scene.receivers.len()).into_par_iter().for_each_init(
            || ReceiverAggregator::new(scene, config, builder, &output, progress),
            |aggregator, receiver| {
                if output.is_aborted() || progress.is_canceled() {
                    return;
                }
                process_receiver(aggregator, scene, &sources, receiver);
                progress.step();
            },
        );

        workers_done.store(true, Ordering::SeqCst);
        match consumer.join() {
            Ok(records) => records,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    let result = ComputeResult {
        day_levels: drained.day,
        evening_levels: drained.evening,
        night_levels: drained.night,
        den_levels: drained.den,
        paths: drained.paths,
        memory_paths: output.take_memory_paths(),
        paths_computed: output.path_count.load(Ordering::SeqCst),
        aborted: output.is_aborted(),
    };
    tracing::debug!(
        paths = result.paths_computed,
        aborted = result.aborted,
        "attenuation run finished"
    );
    result
}

fn process_receiver(
    aggregator: &mut ReceiverAggregator<'_>,
    scene: &Scene,
    sources: &[SourcePointInfo],
    receiver: usize,
) {
    let info = ReceiverPointInfo {
        index: receiver,
        pk: scene.receivers[receiver].pk,
        position: scene.receivers[receiver].position,
    };

    // Nearest first, so the early stop can trigger as soon as possible.
    let mut candidates: Vec<SourcePointInfo> = sources
        .iter()
        .filter(|s| s.position.distance_to(&info.position) <= scene.maximum_source_distance)
        .cloned()
        .collect();
    candidates.sort_by(|a, b| {
        let da = a.position.distance_to(&info.position);
        let db = b.position.distance_to(&info.position);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    aggregator.start_receiver(&info, &candidates);
    for source in &candidates {
        let profile = scene.cut_profile(source.index, receiver);
        if aggregator.on_new_cut_plane(&profile) == PathSearchStrategy::SkipReceiver {
            break;
        }
    }
    aggregator.finalize_receiver(receiver);
}
