//! Concurrent attenuation aggregation engine.
//!
//! Receivers are processed in parallel. Each worker owns a
//! [`aggregator::ReceiverAggregator`] that folds the cut planes of one
//! receiver at a time into per-period levels, and every worker publishes
//! finished records into a shared bounded [`output::OutputChannel`].

pub mod aggregator;
pub mod config;
pub mod output;
pub mod runner;

use crate::{CutProfile, Point};

/// Verdict of a visitor after one cut plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSearchStrategy {
    /// Keep feeding cut planes for this receiver.
    Continue,
    /// Remaining sources cannot change the result; stop early.
    SkipReceiver,
}

/// Source handed to a visitor, with everything needed to cut and weight it.
#[derive(Debug, Clone)]
pub struct SourcePointInfo {
    pub index: usize,
    pub pk: Option<i64>,
    pub li: f64,
    pub position: Point,
}

/// Receiver handed to a visitor.
#[derive(Debug, Clone)]
pub struct ReceiverPointInfo {
    pub index: usize,
    pub pk: Option<i64>,
    pub position: Point,
}

/// Receives the cut planes of one receiver at a time.
///
/// The driver calls `start_receiver`, feeds one cut plane per candidate
/// source through `on_new_cut_plane` until it returns
/// [`PathSearchStrategy::SkipReceiver`], then calls `finalize_receiver`.
pub trait CutPlaneVisitor {
    fn start_receiver(&mut self, receiver: &ReceiverPointInfo, sources: &[SourcePointInfo]);
    fn on_new_cut_plane(&mut self, profile: &CutProfile) -> PathSearchStrategy;
    fn finalize_receiver(&mut self, receiver: usize);
}
