//! Per-tick presentation of a group of data sources against one clock.

use std::rc::Rc;

use bitflags::bitflags;
use tracing::{debug, info, warn};

use crate::buffer::TimedSampleStatus;
use crate::calibration::{CalibrationConfig, CalibrationResult, CalibrationStatus, Calibrator};
use crate::source::{SharedDataSource, SharedTimecodeSource, SynchronizerId};
use crate::timecode::{FrameRate, FrameTime, FrameTimeWithRate};

bitflags! {
    /// Union of the per-source sample statuses observed on the last update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusSummary: u8 {
        /// At least one source presented a usable sample.
        const OK = 0b0001;
        /// At least one source only held data older than the request.
        const BEHIND = 0b0010;
        /// At least one source only held data newer than the request.
        const AHEAD = 0b0100;
        /// At least one source held no data at all.
        const MISSING = 0b1000;
    }
}

impl From<TimedSampleStatus> for StatusSummary {
    fn from(status: TimedSampleStatus) -> Self {
        match status {
            TimedSampleStatus::Ok => Self::OK,
            TimedSampleStatus::Behind => Self::BEHIND,
            TimedSampleStatus::Ahead => Self::AHEAD,
            TimedSampleStatus::DataMissing => Self::MISSING,
        }
    }
}

/// A registered source together with its last observed status and whether the
/// user wants it synchronized.
///
/// Intent and applied state are separate so a paused group remembers which
/// sources to re-enable.
struct SourceBinding {
    source: SharedDataSource,
    status: TimedSampleStatus,
    sync_requested: bool,
}

impl SourceBinding {
    fn new(source: SharedDataSource) -> Self {
        Self {
            source,
            status: TimedSampleStatus::DataMissing,
            sync_requested: true,
        }
    }

    fn set_sync_requested(&mut self, requested: bool) {
        if self.sync_requested != requested {
            self.sync_requested = requested;
            self.status = TimedSampleStatus::DataMissing;
        }
    }

    fn pause(&self) {
        self.source.borrow_mut().set_synchronized(false);
    }

    fn present_at(&mut self, present_time: &FrameTimeWithRate) {
        let mut source = self.source.borrow_mut();
        source.set_synchronized(self.sync_requested);
        if self.sync_requested {
            self.status = source.present_at(present_time);
        }
    }
}

/// Drives a group of [`TimedDataSource`](crate::source::TimedDataSource)s to
/// present a common delay-compensated time, once per external tick.
///
/// The present time is the reference clock's current time minus
/// [`Synchronizer::delay`]. The delay is usually discovered by
/// [calibration](crate::calibration) rather than set by hand.
pub struct Synchronizer {
    id: SynchronizerId,
    timecode_source: Option<SharedTimecodeSource>,
    delay: FrameTime,
    bindings: Vec<SourceBinding>,
    calibrator: Option<Calibrator>,
    calibration_status: Option<CalibrationStatus>,
}

impl Synchronizer {
    /// Creates a synchronizer with no clock and no sources.
    pub fn new() -> Self {
        Self {
            id: SynchronizerId::new(),
            timecode_source: None,
            delay: FrameTime::default(),
            bindings: Vec::new(),
            calibrator: None,
            calibration_status: None,
        }
    }

    /// Identity used to record source ownership.
    pub fn id(&self) -> SynchronizerId {
        self.id
    }

    /// The reference clock, if one is assigned.
    pub fn timecode_source(&self) -> Option<&SharedTimecodeSource> {
        self.timecode_source.as_ref()
    }

    /// Assigns or clears the reference clock.
    pub fn set_timecode_source(&mut self, source: Option<SharedTimecodeSource>) {
        self.timecode_source = source;
    }

    /// The reference clock's rate, if a clock is assigned.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.timecode_source
            .as_ref()
            .map(|source| source.borrow().frame_rate())
    }

    /// Frames subtracted from the clock time to give sources time to receive
    /// the matching sample.
    pub fn delay(&self) -> FrameTime {
        self.delay
    }

    /// Sets the delay directly, overriding any calibrated value.
    pub fn set_delay(&mut self, delay: FrameTime) {
        self.delay = delay;
    }

    /// The clock's current position, or `None` without a clock or a signal.
    pub fn current_time(&self) -> Option<FrameTimeWithRate> {
        self.timecode_source
            .as_ref()
            .and_then(|source| source.borrow().current_time())
    }

    /// The delay-compensated time sources are asked to present, or `None`
    /// when no usable clock time exists.
    pub fn present_time(&self) -> Option<FrameTimeWithRate> {
        let current = self.current_time()?;
        if !current.rate.is_valid() {
            return None;
        }
        Some(current - self.delay)
    }

    /// Number of registered sources.
    pub fn data_source_count(&self) -> usize {
        self.bindings.len()
    }

    /// The source at the given registration index.
    pub fn data_source(&self, index: usize) -> Option<SharedDataSource> {
        self.bindings.get(index).map(|binding| Rc::clone(&binding.source))
    }

    /// True when the source is already registered with this synchronizer.
    pub fn contains_data_source(&self, source: &SharedDataSource) -> bool {
        self.position_of(source).is_some()
    }

    /// Registers a source, claiming ownership of it.
    ///
    /// Returns false when the source is already registered here or belongs to
    /// another synchronizer.
    pub fn add_data_source(&mut self, source: &SharedDataSource) -> bool {
        if self.contains_data_source(source) {
            return false;
        }
        {
            let mut borrowed = source.borrow_mut();
            if let Some(owner) = borrowed.synchronizer() {
                if owner != self.id {
                    warn!(
                        source = borrowed.display_name(),
                        "source already belongs to another synchronizer"
                    );
                    return false;
                }
            }
            borrowed.set_synchronizer(Some(self.id));
            borrowed.set_synchronized(true);
            info!(source = borrowed.display_name(), "added data source");
        }
        self.bindings.push(SourceBinding::new(Rc::clone(source)));
        true
    }

    /// Unregisters a source and releases ownership of it. Returns false when
    /// the source was not registered here.
    pub fn remove_data_source(&mut self, source: &SharedDataSource) -> bool {
        let Some(index) = self.position_of(source) else {
            return false;
        };
        self.bindings.remove(index);
        let mut borrowed = source.borrow_mut();
        borrowed.set_synchronized(false);
        borrowed.set_synchronizer(None);
        debug!(source = borrowed.display_name(), "removed data source");
        true
    }

    /// Whether the source at the given index should take part in updates.
    pub fn sync_requested(&self, index: usize) -> Option<bool> {
        self.bindings.get(index).map(|binding| binding.sync_requested)
    }

    /// Marks whether the source at the given index should take part in
    /// updates. Changing the intent resets the source's observed status.
    pub fn set_sync_requested(&mut self, index: usize, requested: bool) {
        if let Some(binding) = self.bindings.get_mut(index) {
            binding.set_sync_requested(requested);
        }
    }

    /// The status observed for the source at the given index on the last
    /// update, or `None` when the index is out of range.
    pub fn current_data_status(&self, index: usize) -> Option<TimedSampleStatus> {
        self.bindings.get(index).map(|binding| binding.status)
    }

    /// Union of all per-source statuses from the last update.
    pub fn status_summary(&self) -> StatusSummary {
        self.bindings
            .iter()
            .fold(StatusSummary::empty(), |summary, binding| {
                summary | StatusSummary::from(binding.status)
            })
    }

    /// Presents every requested source at the current present time.
    ///
    /// Does nothing while calibration is in progress or while no usable clock
    /// time exists; in that case the per-source statuses keep their previous
    /// values.
    pub fn update(&mut self) {
        if self.is_calibrating() {
            return;
        }
        let Some(present_time) = self.present_time() else {
            return;
        };
        for binding in &mut self.bindings {
            binding.present_at(&present_time);
        }
    }

    /// Halts synchronization on every source without forgetting which sources
    /// were requested. The next [`Synchronizer::update`] resumes them.
    pub fn pause(&mut self) {
        for binding in &self.bindings {
            binding.pause();
        }
    }

    /// True while a started calibration has not yet finished.
    pub fn is_calibrating(&self) -> bool {
        matches!(
            self.calibration_status,
            Some(CalibrationStatus::InProgress)
        )
    }

    /// Status of the most recent calibration, or `None` when none was run.
    pub fn calibration_status(&self) -> Option<CalibrationStatus> {
        self.calibration_status
    }

    /// Begins calibrating delay and buffer sizes for the currently
    /// synchronized sources. Returns false when a calibration is already in
    /// progress.
    ///
    /// Progress requires pulling [`Synchronizer::step_calibration`] once per
    /// tick; updates are suspended until the calibration finishes.
    pub fn start_calibration(&mut self, config: CalibrationConfig) -> bool {
        if self.is_calibrating() {
            return false;
        }
        let sources: Vec<SharedDataSource> = self
            .bindings
            .iter()
            .filter(|binding| binding.source.borrow().is_synchronized())
            .map(|binding| Rc::clone(&binding.source))
            .collect();
        info!(sources = sources.len(), "starting calibration");
        self.calibrator = Some(Calibrator::new(
            config,
            self.timecode_source.clone(),
            sources,
        ));
        self.calibration_status = Some(CalibrationStatus::InProgress);
        true
    }

    /// Advances a running calibration by one step and applies the delay it
    /// reports. Returns `None` when no calibration is running.
    pub fn step_calibration(&mut self) -> Option<CalibrationResult> {
        let calibrator = self.calibrator.as_mut()?;
        let result = calibrator.step();
        self.delay = result.delay;
        self.calibration_status = Some(result.status);
        if result.status != CalibrationStatus::InProgress {
            self.calibrator = None;
            info!(
                status = %result.status,
                delay = %result.delay,
                "calibration finished"
            );
        }
        Some(result)
    }

    /// Cancels a running calibration, leaving any already-applied delay and
    /// buffer sizes in place. The calibration is reported as failed.
    pub fn stop_calibration(&mut self) {
        if self.calibrator.take().is_some() {
            self.calibration_status = Some(CalibrationStatus::Failed);
            warn!("calibration cancelled");
        }
    }

    fn position_of(&self, source: &SharedDataSource) -> Option<usize> {
        self.bindings
            .iter()
            .position(|binding| Rc::ptr_eq(&binding.source, source))
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TimedDataBuffer;
    use crate::source::{SourceId, TimecodeSource, TimedDataSource};
    use std::cell::RefCell;

    struct FakeSource {
        id: SourceId,
        name: String,
        rate: FrameRate,
        buffer: TimedDataBuffer<u32>,
        offset: FrameTime,
        synchronized: bool,
        owner: Option<SynchronizerId>,
        present_calls: usize,
    }

    impl FakeSource {
        fn new(name: &str, rate: FrameRate) -> Self {
            Self {
                id: SourceId::new(),
                name: name.to_string(),
                rate,
                buffer: TimedDataBuffer::new(rate),
                offset: FrameTime::default(),
                synchronized: false,
                owner: None,
                present_calls: 0,
            }
        }

        fn shared(self) -> (Rc<RefCell<FakeSource>>, SharedDataSource) {
            let concrete = Rc::new(RefCell::new(self));
            let shared: SharedDataSource = concrete.clone();
            (concrete, shared)
        }
    }

    impl TimedDataSource for FakeSource {
        fn id(&self) -> SourceId {
            self.id
        }

        fn display_name(&self) -> &str {
            &self.name
        }

        fn frame_rate(&self) -> FrameRate {
            self.rate
        }

        fn buffer_size(&self) -> usize {
            self.buffer.capacity()
        }

        fn set_buffer_size(&mut self, size: usize) {
            self.buffer.set_capacity(size);
        }

        fn presentation_offset(&self) -> FrameTime {
            self.offset
        }

        fn set_presentation_offset(&mut self, offset: FrameTime) {
            self.offset = offset;
        }

        fn is_synchronized(&self) -> bool {
            self.synchronized
        }

        fn set_synchronized(&mut self, synchronized: bool) {
            self.synchronized = synchronized;
        }

        fn synchronizer(&self) -> Option<SynchronizerId> {
            self.owner
        }

        fn set_synchronizer(&mut self, synchronizer: Option<SynchronizerId>) {
            self.owner = synchronizer;
        }

        fn buffer_range(&self) -> Option<(FrameTime, FrameTime)> {
            self.buffer
                .frame_range()
                .map(|(oldest, newest)| (oldest + self.offset, newest + self.offset))
        }

        fn present_at(&mut self, present_time: &FrameTimeWithRate) -> TimedSampleStatus {
            self.present_calls += 1;
            let local = present_time.remap(self.rate);
            let (status, _) = self.buffer.try_get_sample(local.time - self.offset);
            status
        }
    }

    struct FakeClock {
        id: SourceId,
        rate: FrameRate,
        time: Option<FrameTime>,
    }

    impl FakeClock {
        fn shared(rate: FrameRate, time: Option<FrameTime>) -> (Rc<RefCell<FakeClock>>, SharedTimecodeSource) {
            let concrete = Rc::new(RefCell::new(FakeClock {
                id: SourceId::new(),
                rate,
                time,
            }));
            let shared: SharedTimecodeSource = concrete.clone();
            (concrete, shared)
        }
    }

    impl TimecodeSource for FakeClock {
        fn id(&self) -> SourceId {
            self.id
        }

        fn display_name(&self) -> &str {
            "fake clock"
        }

        fn frame_rate(&self) -> FrameRate {
            self.rate
        }

        fn current_time(&self) -> Option<FrameTimeWithRate> {
            self.time.map(|time| FrameTimeWithRate::new(time, self.rate))
        }
    }

    fn fps30() -> FrameRate {
        FrameRate::new(30, 1)
    }

    #[test]
    fn test_add_and_look_up_sources() {
        let mut synchronizer = Synchronizer::new();
        let (_, source) = FakeSource::new("a", fps30()).shared();

        assert!(synchronizer.add_data_source(&source));
        assert_eq!(synchronizer.data_source_count(), 1);
        assert!(Rc::ptr_eq(&synchronizer.data_source(0).unwrap(), &source));
        assert!(source.borrow().is_synchronized());
        assert_eq!(source.borrow().synchronizer(), Some(synchronizer.id()));
        assert_eq!(
            synchronizer.current_data_status(0),
            Some(TimedSampleStatus::DataMissing)
        );
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut synchronizer = Synchronizer::new();
        let (_, source) = FakeSource::new("a", fps30()).shared();

        assert!(synchronizer.add_data_source(&source));
        assert!(!synchronizer.add_data_source(&source));
        assert_eq!(synchronizer.data_source_count(), 1);
    }

    #[test]
    fn test_source_owned_elsewhere_is_rejected() {
        let mut first = Synchronizer::new();
        let mut second = Synchronizer::new();
        let (_, source) = FakeSource::new("a", fps30()).shared();

        assert!(first.add_data_source(&source));
        assert!(!second.add_data_source(&source));
        assert_eq!(second.data_source_count(), 0);
        assert_eq!(source.borrow().synchronizer(), Some(first.id()));
    }

    #[test]
    fn test_remove_releases_ownership() {
        let mut synchronizer = Synchronizer::new();
        let (_, source) = FakeSource::new("a", fps30()).shared();

        synchronizer.add_data_source(&source);
        assert!(synchronizer.remove_data_source(&source));
        assert_eq!(synchronizer.data_source_count(), 0);
        assert_eq!(source.borrow().synchronizer(), None);
        assert!(!source.borrow().is_synchronized());
        assert!(!synchronizer.remove_data_source(&source));
    }

    #[test]
    fn test_update_without_clock_time_presents_nothing() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        synchronizer.add_data_source(&source);

        // No clock at all.
        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 0);

        // A clock without a signal.
        let (_, clock) = FakeClock::shared(fps30(), None);
        synchronizer.set_timecode_source(Some(clock));
        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 0);
    }

    #[test]
    fn test_update_presents_at_delay_compensated_time() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        for frame in 95..=100 {
            concrete
                .borrow_mut()
                .buffer
                .add_in_rate(FrameTime::new(frame), frame as u32);
        }
        synchronizer.add_data_source(&source);

        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(105)));
        synchronizer.set_timecode_source(Some(clock));
        synchronizer.set_delay(FrameTime::new(7));
        assert_eq!(
            synchronizer.present_time().unwrap().time,
            FrameTime::new(98)
        );

        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 1);
        assert_eq!(
            synchronizer.current_data_status(0),
            Some(TimedSampleStatus::Ok)
        );
    }

    #[test]
    fn test_repeated_updates_are_idempotent() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        concrete
            .borrow_mut()
            .buffer
            .add_in_rate(FrameTime::new(100), 100);
        synchronizer.add_data_source(&source);

        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(100)));
        synchronizer.set_timecode_source(Some(clock));

        synchronizer.update();
        let first = synchronizer.current_data_status(0);
        synchronizer.update();
        assert_eq!(synchronizer.current_data_status(0), first);
    }

    #[test]
    fn test_pause_keeps_intent_and_update_resumes() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        synchronizer.add_data_source(&source);
        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(10)));
        synchronizer.set_timecode_source(Some(clock));

        synchronizer.pause();
        assert!(!concrete.borrow().synchronized);
        assert_eq!(synchronizer.sync_requested(0), Some(true));

        synchronizer.update();
        assert!(concrete.borrow().synchronized);
    }

    #[test]
    fn test_unrequested_source_is_not_presented() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        synchronizer.add_data_source(&source);
        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(10)));
        synchronizer.set_timecode_source(Some(clock));

        synchronizer.set_sync_requested(0, false);
        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 0);
        assert!(!concrete.borrow().synchronized);
        assert_eq!(
            synchronizer.current_data_status(0),
            Some(TimedSampleStatus::DataMissing)
        );
    }

    #[test]
    fn test_update_skipped_while_calibrating() {
        let mut synchronizer = Synchronizer::new();
        let (concrete, source) = FakeSource::new("a", fps30()).shared();
        synchronizer.add_data_source(&source);
        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(10)));
        synchronizer.set_timecode_source(Some(clock));

        assert!(synchronizer.start_calibration(CalibrationConfig::default()));
        assert!(synchronizer.is_calibrating());
        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 0);

        synchronizer.stop_calibration();
        assert_eq!(
            synchronizer.calibration_status(),
            Some(CalibrationStatus::Failed)
        );
        synchronizer.update();
        assert_eq!(concrete.borrow().present_calls, 1);
    }

    #[test]
    fn test_status_summary_unions_source_statuses() {
        let mut synchronizer = Synchronizer::new();

        let (ok_source, ok_shared) = FakeSource::new("ok", fps30()).shared();
        ok_source
            .borrow_mut()
            .buffer
            .add_in_rate(FrameTime::new(98), 98);
        synchronizer.add_data_source(&ok_shared);

        let (behind_source, behind_shared) = FakeSource::new("behind", fps30()).shared();
        behind_source
            .borrow_mut()
            .buffer
            .add_in_rate(FrameTime::new(90), 90);
        synchronizer.add_data_source(&behind_shared);

        let (_, empty_shared) = FakeSource::new("empty", fps30()).shared();
        synchronizer.add_data_source(&empty_shared);

        let (_, clock) = FakeClock::shared(fps30(), Some(FrameTime::new(98)));
        synchronizer.set_timecode_source(Some(clock));
        synchronizer.update();

        let summary = synchronizer.status_summary();
        assert!(summary.contains(StatusSummary::OK));
        assert!(summary.contains(StatusSummary::BEHIND));
        assert!(summary.contains(StatusSummary::MISSING));
        assert!(!summary.contains(StatusSummary::AHEAD));
    }
}
