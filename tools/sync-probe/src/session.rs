//! Drives one scenario end to end.

use anyhow::{bail, Context, Result};
use tracing::info;

use framelock_core::{CalibrationStatus, StatusSummary, Synchronizer};
use framelock_sources::{SimulatedClock, SimulatedSource, SourceRegistry};

use crate::report::{
    flag_names, CalibrationReport, ClockReport, Report, SourceReport, StatusTally,
    SteadyStateReport,
};
use crate::scenario::Scenario;

/// A scenario bound to live actors and a synchronizer, ready to run.
pub struct Session {
    scenario: Scenario,
    clock: Box<dyn SimulatedClock>,
    sources: Vec<Box<dyn SimulatedSource>>,
    synchronizer: Synchronizer,
}

impl Session {
    /// Builds the scenario's clock and sources through the registry and
    /// registers everything with a fresh synchronizer.
    pub fn build(scenario: Scenario, registry: &SourceRegistry) -> Result<Self> {
        let clock = registry
            .create_clock(
                &scenario.clock.kind,
                scenario.clock.display_name(),
                &scenario.clock.params,
            )
            .with_context(|| format!("failed to build clock '{}'", scenario.clock.display_name()))?;

        let mut synchronizer = Synchronizer::new();
        synchronizer.set_timecode_source(Some(clock.timecode_source()));

        let mut sources = Vec::with_capacity(scenario.sources.len());
        for spec in &scenario.sources {
            let source = registry
                .create_source(&spec.kind, spec.display_name(), &spec.params)
                .with_context(|| format!("failed to build source '{}'", spec.display_name()))?;
            if !synchronizer.add_data_source(&source.data_source()) {
                bail!("source '{}' could not be registered", spec.display_name());
            }
            sources.push(source);
        }

        Ok(Self {
            scenario,
            clock,
            sources,
            synchronizer,
        })
    }

    /// Runs warmup, calibration and the steady-state window, then reports.
    pub fn run(mut self) -> Result<Report> {
        info!(
            scenario = self.scenario.display_name(),
            sources = self.sources.len(),
            "rehearsal starting"
        );

        for _ in 0..self.scenario.warmup_ticks {
            self.tick();
        }

        let calibration = self.run_calibration()?;
        let (steady_state, tallies) = self.run_steady_state();

        let sources = self
            .sources
            .iter()
            .zip(tallies)
            .map(|(source, statuses)| {
                let handle = source.data_source();
                let source = handle.borrow();
                SourceReport {
                    name: source.display_name().to_string(),
                    frame_rate: source.frame_rate(),
                    buffer_size: source.buffer_size(),
                    presentation_offset_frames: source.presentation_offset().to_f64(),
                    statuses,
                }
            })
            .collect();

        let clock_handle = self.clock.timecode_source();
        let clock_ref = clock_handle.borrow();
        let clock = ClockReport::new(
            clock_ref.display_name().to_string(),
            clock_ref.frame_rate(),
            clock_ref.current_time().map(|time| time.to_timecode()),
        );

        Ok(Report {
            scenario: self.scenario.display_name().to_string(),
            clock,
            calibration,
            steady_state,
            sources,
        })
    }

    /// One simulated tick: the clock moves, then every source delivers what
    /// would have arrived by the new time.
    fn tick(&mut self) {
        self.clock.tick(self.scenario.tick_seconds());
        let now = self.clock.timecode_source().borrow().current_time();
        if let Some(now) = now {
            for source in &mut self.sources {
                source.advance(&now);
            }
        }
    }

    /// Pulls one calibration step per tick until the run terminates.
    fn run_calibration(&mut self) -> Result<CalibrationReport> {
        if !self.synchronizer.start_calibration(self.scenario.calibration.clone()) {
            bail!("a calibration is already in progress");
        }

        let mut steps = 0u32;
        let status = loop {
            self.tick();
            let result = self
                .synchronizer
                .step_calibration()
                .context("calibration stopped unexpectedly")?;
            steps += 1;
            if result.status != CalibrationStatus::InProgress {
                break result.status;
            }
        };

        let delay_frames = self.synchronizer.delay().to_f64();
        let delay_seconds = self
            .synchronizer
            .frame_rate()
            .filter(|rate| rate.is_valid())
            .map_or(0.0, |rate| delay_frames * rate.frame_interval());
        Ok(CalibrationReport {
            status,
            steps,
            delay_frames,
            delay_seconds,
        })
    }

    /// Presents every tick of the steady-state window and tallies what each
    /// source reported.
    fn run_steady_state(&mut self) -> (SteadyStateReport, Vec<StatusTally>) {
        let mut tallies = vec![StatusTally::default(); self.sources.len()];
        let mut flags = StatusSummary::empty();

        for _ in 0..self.scenario.steady_ticks {
            self.tick();
            self.synchronizer.update();
            for (index, tally) in tallies.iter_mut().enumerate() {
                if let Some(status) = self.synchronizer.current_data_status(index) {
                    tally.record(status);
                }
            }
            flags |= self.synchronizer.status_summary();
        }

        info!(
            ticks = self.scenario.steady_ticks,
            flags = ?flag_names(flags),
            "steady-state window finished"
        );
        let report = SteadyStateReport {
            ticks: self.scenario.steady_ticks,
            status_flags: flag_names(flags),
        };
        (report, tallies)
    }
}
