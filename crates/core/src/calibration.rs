//! Automatic discovery of delay and per-source buffer sizes.
//!
//! Calibration watches the live behavior of a source group against its
//! reference clock. It first excludes sources whose timestamps sit far from
//! the majority, then raises the group delay until every remaining source has
//! received data for the present time, then grows each source's buffer until
//! it retains enough history to answer presentation requests.
//!
//! The algorithm is resumable: each call to [`Calibrator::step`] performs one
//! check and hands control back, because convergence needs real time to pass
//! between checks while buffers fill.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::source::{SharedDataSource, SharedTimecodeSource};
use crate::timecode::{FrameTime, FrameTimeWithRate};

fn default_outlier_threshold() -> u32 {
    100
}

fn default_required_good_samples() -> u32 {
    60
}

fn default_step_budget() -> Option<u32> {
    Some(1800)
}

/// Tuning parameters for a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Frame distance beyond which a source's newest sample is considered an
    /// outlier and the source is excluded from calibration.
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: u32,

    /// Consecutive good checks required before a phase is considered
    /// converged.
    #[serde(default = "default_required_good_samples")]
    pub required_good_samples: u32,

    /// Total steps allowed before the run is abandoned as failed, or `None`
    /// to run unbounded. A source that never advances would otherwise stall
    /// the run forever.
    #[serde(default = "default_step_budget")]
    pub step_budget: Option<u32>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            outlier_threshold: default_outlier_threshold(),
            required_good_samples: default_required_good_samples(),
            step_budget: default_step_budget(),
        }
    }
}

/// State of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// The run needs more steps to converge.
    InProgress,
    /// The run converged; the reported delay and the applied buffer sizes are
    /// good.
    Completed,
    /// The run was abandoned. Already-applied delay and buffer sizes are left
    /// in place.
    Failed,
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Outcome of one calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationResult {
    /// State of the run after this step.
    pub status: CalibrationStatus,
    /// The delay discovered so far, in the reference clock's rate.
    pub delay: FrameTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    DelayConvergence,
    SeedBufferSizes,
    BufferConvergence,
}

/// A resumable calibration run over a fixed set of sources.
///
/// Call [`Calibrator::step`] once per external tick until the returned status
/// is no longer [`CalibrationStatus::InProgress`]. Once terminal, further
/// steps return the same result.
pub struct Calibrator {
    config: CalibrationConfig,
    clock: Option<SharedTimecodeSource>,
    sources: Vec<SharedDataSource>,
    cluster: Vec<usize>,
    delay: FrameTime,
    streak: u32,
    steps_taken: u32,
    phase: Phase,
    terminal: Option<CalibrationStatus>,
}

impl Calibrator {
    /// Creates a run over the given clock and sources. Nothing happens until
    /// the first [`Calibrator::step`].
    pub fn new(
        config: CalibrationConfig,
        clock: Option<SharedTimecodeSource>,
        sources: Vec<SharedDataSource>,
    ) -> Self {
        Self {
            config,
            clock,
            sources,
            cluster: Vec::new(),
            delay: FrameTime::default(),
            streak: 0,
            steps_taken: 0,
            phase: Phase::Init,
            terminal: None,
        }
    }

    /// State of the run: the last terminal status, or in progress.
    pub fn status(&self) -> CalibrationStatus {
        self.terminal.unwrap_or(CalibrationStatus::InProgress)
    }

    /// The delay discovered so far, in the reference clock's rate.
    pub fn delay(&self) -> FrameTime {
        self.delay
    }

    /// Number of steps performed so far.
    pub fn steps_taken(&self) -> u32 {
        self.steps_taken
    }

    /// Performs one calibration check and reports the run's state.
    pub fn step(&mut self) -> CalibrationResult {
        if let Some(status) = self.terminal {
            return self.result(status);
        }
        self.steps_taken += 1;
        if let Some(budget) = self.config.step_budget {
            if self.steps_taken > budget {
                warn!(steps = self.steps_taken, "calibration exceeded its step budget");
                return self.finish(CalibrationStatus::Failed);
            }
        }
        let Some(now) = self.current_clock_time() else {
            warn!("reference clock unavailable, calibration abandoned");
            return self.finish(CalibrationStatus::Failed);
        };
        match self.phase {
            Phase::Init => self.step_init(&now),
            Phase::DelayConvergence => self.step_delay(&now),
            Phase::SeedBufferSizes => self.step_seed(&now),
            Phase::BufferConvergence => self.step_buffer(&now),
        }
    }

    fn current_clock_time(&self) -> Option<FrameTimeWithRate> {
        let time = self.clock.as_ref()?.borrow().current_time()?;
        if !time.rate.is_valid() {
            return None;
        }
        Some(time)
    }

    /// Excludes outlier sources and takes an initial delay guess from the
    /// most-delayed source of the winning cluster.
    fn step_init(&mut self, now: &FrameTimeWithRate) -> CalibrationResult {
        let mut candidates: Vec<(usize, FrameTime)> = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = source.borrow();
            if let Some((_, newest)) = source.buffer_range() {
                let newest = FrameTime::remap(newest, source.frame_rate(), now.rate);
                candidates.push((index, newest));
            }
        }
        if candidates.is_empty() {
            debug!("no source has sample data, nothing to calibrate");
            return self.finish(CalibrationStatus::Completed);
        }

        // Each candidate anchors a cluster of candidates within the outlier
        // threshold of it. The biggest cluster wins, ties broken by the
        // anchor closest to the clock.
        let threshold = f64::from(self.config.outlier_threshold);
        let now_frame = now.time.to_f64();
        let mut cluster: Vec<(usize, FrameTime)> = Vec::new();
        let mut best_distance = f64::INFINITY;
        for &(_, anchor_time) in &candidates {
            let anchor = anchor_time.to_f64();
            let members: Vec<(usize, FrameTime)> = candidates
                .iter()
                .filter(|&&(_, time)| (time.to_f64() - anchor).abs() <= threshold)
                .copied()
                .collect();
            let distance = (anchor - now_frame).abs();
            if members.len() > cluster.len()
                || (members.len() == cluster.len() && distance < best_distance)
            {
                cluster = members;
                best_distance = distance;
            }
        }

        if let Some(straggler) = cluster.iter().map(|&(_, time)| time).min() {
            self.delay = (now.time - straggler).ceil();
        }
        info!(
            cluster = cluster.len(),
            excluded = candidates.len() - cluster.len(),
            delay = %self.delay,
            "calibration cluster selected"
        );
        self.cluster = cluster.into_iter().map(|(index, _)| index).collect();
        self.phase = Phase::DelayConvergence;
        self.streak = 0;
        self.result(CalibrationStatus::InProgress)
    }

    /// Grows the delay while any cluster source has not yet received data for
    /// the present time.
    fn step_delay(&mut self, now: &FrameTimeWithRate) -> CalibrationResult {
        let present = *now - self.delay;
        let mut lagging = false;
        for &index in &self.cluster {
            let source = self.sources[index].borrow();
            let Some((_, newest)) = source.buffer_range() else {
                continue;
            };
            let newest = FrameTime::remap(newest, source.frame_rate(), now.rate);
            if newest < present.time {
                lagging = true;
            }
        }
        if lagging {
            self.delay = self.delay + FrameTime::new(1);
            self.streak = 0;
            trace!(delay = %self.delay, "a source lags the present time, delay grown");
        } else {
            self.streak += 1;
            if self.streak >= self.config.required_good_samples {
                info!(delay = %self.delay, "delay converged");
                self.phase = Phase::SeedBufferSizes;
                self.streak = 0;
            }
        }
        self.result(CalibrationStatus::InProgress)
    }

    /// Gives every cluster source a starting buffer size covering the span
    /// from one frame before the present time up to its newest sample.
    fn step_seed(&mut self, now: &FrameTimeWithRate) -> CalibrationResult {
        let target = (*now - self.delay).time - FrameTime::new(1);
        for &index in &self.cluster {
            let mut source = self.sources[index].borrow_mut();
            let Some((_, newest)) = source.buffer_range() else {
                continue;
            };
            let target_local = FrameTime::remap(target, now.rate, source.frame_rate());
            let span = i64::from(newest.round().frame_number())
                - i64::from(target_local.round().frame_number());
            let min = source.min_buffer_size().unwrap_or(1).max(1);
            let max = source.max_buffer_size().unwrap_or(usize::MAX).max(min);
            let size = (span.max(0) as usize).clamp(min, max);
            source.set_buffer_size(size);
            debug!(source = source.display_name(), size, "seeded buffer size");
        }
        self.phase = Phase::BufferConvergence;
        self.streak = 0;
        self.result(CalibrationStatus::InProgress)
    }

    /// Grows buffer sizes until every cluster source retains history back to
    /// one frame before the present time.
    fn step_buffer(&mut self, now: &FrameTimeWithRate) -> CalibrationResult {
        let target = (*now - self.delay).time - FrameTime::new(1);
        let mut grew = false;
        let mut waiting = false;
        for &index in &self.cluster {
            let mut source = self.sources[index].borrow_mut();
            let size = source.buffer_size();
            if let Some(max) = source.max_buffer_size() {
                // Cannot grow further, leave it as good as it gets.
                if size >= max {
                    continue;
                }
            }
            let Some((oldest, newest)) = source.buffer_range() else {
                waiting = true;
                continue;
            };
            let span = i64::from(newest.round().frame_number())
                - i64::from(oldest.round().frame_number());
            if span < size as i64 - 1 {
                // The buffer has not filled to its new size yet, so whether
                // it reaches far enough back cannot be judged.
                waiting = true;
                continue;
            }
            let target_local = FrameTime::remap(target, now.rate, source.frame_rate());
            if oldest.round() > target_local.round() {
                source.set_buffer_size(size + 1);
                grew = true;
                trace!(source = source.display_name(), size = size + 1, "buffer grown");
            }
        }
        if grew {
            self.streak = 0;
        } else if !waiting {
            self.streak += 1;
            if self.streak >= self.config.required_good_samples {
                info!(delay = %self.delay, "calibration completed");
                return self.finish(CalibrationStatus::Completed);
            }
        }
        self.result(CalibrationStatus::InProgress)
    }

    fn result(&self, status: CalibrationStatus) -> CalibrationResult {
        CalibrationResult {
            status,
            delay: self.delay,
        }
    }

    fn finish(&mut self, status: CalibrationStatus) -> CalibrationResult {
        self.terminal = Some(status);
        self.result(status)
    }
}
