//! Session report emitted after a rehearsal.

use serde::Serialize;

use framelock_core::{
    CalibrationStatus, FrameRate, StatusSummary, Timecode, TimedSampleStatus,
};

/// Everything a rehearsal learned, ready to serialize as JSON.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Scenario label.
    pub scenario: String,
    /// The reference clock at the end of the run.
    pub clock: ClockReport,
    /// How calibration went.
    pub calibration: CalibrationReport,
    /// What the steady-state window observed.
    pub steady_state: SteadyStateReport,
    /// Per-source outcomes, in registration order.
    pub sources: Vec<SourceReport>,
}

/// Reference-clock summary.
#[derive(Debug, Serialize)]
pub struct ClockReport {
    /// Display name.
    pub name: String,
    /// Rate the clock counts in.
    pub frame_rate: FrameRate,
    /// The clock's position when the run ended, as a timecode label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_timecode: Option<String>,
}

impl ClockReport {
    /// Builds the clock summary, labeling the final position when the clock
    /// still has a signal.
    pub fn new(name: String, frame_rate: FrameRate, final_timecode: Option<Timecode>) -> Self {
        Self {
            name,
            frame_rate,
            final_timecode: final_timecode.map(|timecode| timecode.to_string()),
        }
    }
}

/// Calibration outcome.
#[derive(Debug, Serialize)]
pub struct CalibrationReport {
    /// Terminal status of the run.
    pub status: CalibrationStatus,
    /// Steps pulled before the run terminated.
    pub steps: u32,
    /// Discovered delay in reference-clock frames.
    pub delay_frames: f64,
    /// The same delay in seconds.
    pub delay_seconds: f64,
}

/// Steady-state window summary.
#[derive(Debug, Serialize)]
pub struct SteadyStateReport {
    /// Ticks the window ran for.
    pub ticks: u32,
    /// Union of every status flag observed across the window.
    pub status_flags: Vec<String>,
}

/// One source's outcome.
#[derive(Debug, Serialize)]
pub struct SourceReport {
    /// Display name.
    pub name: String,
    /// Rate the source stamps samples in.
    pub frame_rate: FrameRate,
    /// Buffer size after calibration.
    pub buffer_size: usize,
    /// Presentation offset in source frames.
    pub presentation_offset_frames: f64,
    /// How often each status was observed across the steady-state window.
    pub statuses: StatusTally,
}

/// Counts of each presentation status.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusTally {
    /// Ticks that presented a usable sample.
    pub ok: u32,
    /// Ticks where only older data was buffered.
    pub behind: u32,
    /// Ticks where only newer data was buffered.
    pub ahead: u32,
    /// Ticks with an empty buffer.
    pub data_missing: u32,
}

impl StatusTally {
    /// Counts one observation.
    pub fn record(&mut self, status: TimedSampleStatus) {
        match status {
            TimedSampleStatus::Ok => self.ok += 1,
            TimedSampleStatus::Behind => self.behind += 1,
            TimedSampleStatus::Ahead => self.ahead += 1,
            TimedSampleStatus::DataMissing => self.data_missing += 1,
        }
    }
}

/// Lowercase names of the set flags, in declaration order.
pub fn flag_names(summary: StatusSummary) -> Vec<String> {
    summary
        .iter_names()
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect()
}
