//! Buffer-backed chassis for data sources.

use framelock_core::{
    FrameRate, FrameTime, FrameTimeWithRate, SourceId, SynchronizerId, TimedDataBuffer,
    TimedDataSource, TimedSampleStatus,
};
use tracing::trace;

/// A ready-made [`TimedDataSource`] body.
///
/// Owns the sample buffer, the source identity and the synchronization
/// bookkeeping, so an adapter only has to feed samples in through
/// [`BufferedDataSource::add_sample`] as they arrive. Presentation requests
/// are remapped into the source's rate and shifted by the presentation
/// offset before the buffer lookup; range queries report buffered times
/// shifted the other way, so callers always see source time.
pub struct BufferedDataSource<T> {
    id: SourceId,
    name: String,
    buffer: TimedDataBuffer<T>,
    min_buffer_size: Option<usize>,
    max_buffer_size: Option<usize>,
    presentation_offset: FrameTime,
    synchronized: bool,
    synchronizer: Option<SynchronizerId>,
}

impl<T> BufferedDataSource<T> {
    /// Creates an unbounded source with the default buffer capacity.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            buffer: TimedDataBuffer::new(frame_rate),
            min_buffer_size: None,
            max_buffer_size: None,
            presentation_offset: FrameTime::default(),
            synchronized: false,
            synchronizer: None,
        }
    }

    /// Restricts how far the buffer size may be resized, and re-clamps the
    /// current capacity into the new bounds.
    pub fn with_buffer_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_buffer_size = min;
        self.max_buffer_size = max;
        let capacity = self.buffer.capacity();
        self.buffer.set_capacity(self.clamp_size(capacity));
        self
    }

    /// Adds a sample stamped in the source's own rate.
    ///
    /// Returns false when the monotonic-write policy discards it.
    pub fn add_sample(&mut self, time: FrameTime, value: T) -> bool {
        self.buffer.add_in_rate(time, value)
    }

    /// Adds a sample stamped in another rate.
    pub fn add_sample_at(&mut self, time: FrameTimeWithRate, value: T) -> bool {
        self.buffer.add(time, value)
    }

    /// Looks up the sample presentation would pick for `present_time`.
    pub fn sample_at(&self, present_time: &FrameTimeWithRate) -> (TimedSampleStatus, Option<&T>) {
        let local = present_time.remap(self.buffer.frame_rate());
        self.buffer
            .try_get_sample(local.time - self.presentation_offset)
    }

    /// The buffered samples.
    pub fn buffer(&self) -> &TimedDataBuffer<T> {
        &self.buffer
    }

    /// Discards every buffered sample.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn clamp_size(&self, size: usize) -> usize {
        let min = self.min_buffer_size.unwrap_or(1).max(1);
        let max = self.max_buffer_size.unwrap_or(usize::MAX).max(min);
        size.clamp(min, max)
    }
}

impl<T> TimedDataSource for BufferedDataSource<T> {
    fn id(&self) -> SourceId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> FrameRate {
        self.buffer.frame_rate()
    }

    fn buffer_size(&self) -> usize {
        self.buffer.capacity()
    }

    fn set_buffer_size(&mut self, size: usize) {
        let applied = self.clamp_size(size);
        if applied != size {
            trace!(
                source = self.name.as_str(),
                requested = size,
                applied,
                "buffer size clamped to source bounds"
            );
        }
        self.buffer.set_capacity(applied);
    }

    fn min_buffer_size(&self) -> Option<usize> {
        self.min_buffer_size
    }

    fn max_buffer_size(&self) -> Option<usize> {
        self.max_buffer_size
    }

    fn presentation_offset(&self) -> FrameTime {
        self.presentation_offset
    }

    fn set_presentation_offset(&mut self, offset: FrameTime) {
        self.presentation_offset = offset;
    }

    fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    fn set_synchronized(&mut self, synchronized: bool) {
        self.synchronized = synchronized;
    }

    fn synchronizer(&self) -> Option<SynchronizerId> {
        self.synchronizer
    }

    fn set_synchronizer(&mut self, synchronizer: Option<SynchronizerId>) {
        self.synchronizer = synchronizer;
    }

    fn buffer_range(&self) -> Option<(FrameTime, FrameTime)> {
        self.buffer.frame_range().map(|(oldest, newest)| {
            (
                oldest + self.presentation_offset,
                newest + self.presentation_offset,
            )
        })
    }

    fn present_at(&mut self, present_time: &FrameTimeWithRate) -> TimedSampleStatus {
        self.sample_at(present_time).0
    }
}
