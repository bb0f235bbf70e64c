//! Monotonic ring buffers for timed sample data.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::timecode::{FrameRate, FrameTime, FrameTimeWithRate};

/// Number of samples a buffer retains when no explicit capacity is given.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Outcome of asking a buffer for the sample nearest a requested time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedSampleStatus {
    /// A sample near the requested time was found.
    Ok,
    /// Every buffered sample is older than the request; the matching data has
    /// not arrived yet.
    Behind,
    /// Every buffered sample is newer than the request; the matching data was
    /// already evicted or never buffered.
    Ahead,
    /// The buffer holds no samples at all.
    DataMissing,
}

impl fmt::Display for TimedSampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Behind => "behind",
            Self::Ahead => "ahead",
            Self::DataMissing => "data missing",
        };
        f.write_str(text)
    }
}

/// A value stamped with the frame time it belongs to, in its buffer's rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedSample<T> {
    /// Position of the sample in the buffer's frame rate.
    pub time: FrameTime,
    /// The sample payload.
    pub value: T,
}

/// A bounded queue of samples ordered by frame time.
///
/// Samples are kept in the buffer's own frame rate; times arriving in a
/// different rate are remapped on insertion. Insertion order must be strictly
/// increasing, and once the buffer is full the oldest sample is evicted to
/// make room.
#[derive(Debug, Clone)]
pub struct TimedDataBuffer<T> {
    frame_rate: FrameRate,
    capacity: usize,
    samples: VecDeque<TimedSample<T>>,
}

impl<T> TimedDataBuffer<T> {
    /// Creates a buffer with [`DEFAULT_BUFFER_CAPACITY`].
    pub fn new(frame_rate: FrameRate) -> Self {
        Self::with_capacity(frame_rate, DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a buffer retaining at most `capacity` samples. A zero capacity
    /// is bumped to 1.
    pub fn with_capacity(frame_rate: FrameRate, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frame_rate,
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// The rate sample times are stored in.
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the retention limit, evicting oldest samples when shrinking.
    /// A zero capacity is bumped to 1.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Discards all samples. The capacity is unchanged.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// The sample with the smallest time, if any.
    pub fn oldest(&self) -> Option<&TimedSample<T>> {
        self.samples.front()
    }

    /// The sample with the largest time, if any.
    pub fn newest(&self) -> Option<&TimedSample<T>> {
        self.samples.back()
    }

    /// Oldest and newest sample times, in the buffer's rate.
    pub fn frame_range(&self) -> Option<(FrameTime, FrameTime)> {
        match (self.samples.front(), self.samples.back()) {
            (Some(oldest), Some(newest)) => Some((oldest.time, newest.time)),
            _ => None,
        }
    }

    /// Adds a sample whose time is given with its own rate, remapping it into
    /// the buffer's rate first. Returns false when the sample is dropped for
    /// arriving out of order.
    pub fn add(&mut self, time: FrameTimeWithRate, value: T) -> bool {
        self.add_in_rate(time.remap(self.frame_rate).time, value)
    }

    /// Adds a sample whose time is already in the buffer's rate. Returns
    /// false when the sample is dropped for arriving out of order.
    pub fn add_in_rate(&mut self, time: FrameTime, value: T) -> bool {
        if let Some(newest) = self.samples.back() {
            if time <= newest.time {
                trace!(
                    frame = time.frame_number(),
                    newest = newest.time.frame_number(),
                    "dropping out-of-order sample"
                );
                return false;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(TimedSample { time, value });
        true
    }

    /// Finds the sample closest to `time`, which must be in the buffer's rate.
    ///
    /// Requests outside the retained range clamp to the nearest end and report
    /// [`TimedSampleStatus::Ahead`] or [`TimedSampleStatus::Behind`]. When two
    /// samples are equally close the earlier one wins.
    pub fn try_get_sample(&self, time: FrameTime) -> (TimedSampleStatus, Option<&T>) {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return (TimedSampleStatus::DataMissing, None);
        };
        if time < oldest.time {
            return (TimedSampleStatus::Ahead, Some(&oldest.value));
        }
        if time > newest.time {
            return (TimedSampleStatus::Behind, Some(&newest.value));
        }

        let target = time.to_f64();
        let mut best: Option<(&TimedSample<T>, f64)> = None;
        for sample in &self.samples {
            let difference = (sample.time.to_f64() - target).abs();
            match best {
                Some((_, best_difference)) if difference >= best_difference => {}
                _ => best = Some((sample, difference)),
            }
            if sample.time > time {
                break;
            }
        }
        match best {
            Some((sample, _)) => (TimedSampleStatus::Ok, Some(&sample.value)),
            None => (TimedSampleStatus::DataMissing, None),
        }
    }

    /// Iterates the samples with times in `[from, to]`, oldest first.
    pub fn samples_in_range(
        &self,
        from: FrameTime,
        to: FrameTime,
    ) -> impl Iterator<Item = &TimedSample<T>> {
        self.samples
            .iter()
            .skip_while(move |sample| sample.time < from)
            .take_while(move |sample| sample.time <= to)
    }

    /// Iterates all retained samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TimedSample<T>> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps30() -> FrameRate {
        FrameRate::new(30, 1)
    }

    fn filled_buffer() -> TimedDataBuffer<i32> {
        let mut buffer = TimedDataBuffer::new(fps30());
        for frame in 10..=12 {
            assert!(buffer.add_in_rate(FrameTime::new(frame), frame));
        }
        buffer
    }

    #[test]
    fn test_query_statuses() {
        let buffer = filled_buffer();

        let (status, value) = buffer.try_get_sample(FrameTime::new(11));
        assert_eq!(status, TimedSampleStatus::Ok);
        assert_eq!(value, Some(&11));

        let (status, value) = buffer.try_get_sample(FrameTime::new(5));
        assert_eq!(status, TimedSampleStatus::Ahead);
        assert_eq!(value, Some(&10), "clamps to the oldest sample");

        let (status, value) = buffer.try_get_sample(FrameTime::new(20));
        assert_eq!(status, TimedSampleStatus::Behind);
        assert_eq!(value, Some(&12), "clamps to the newest sample");

        let empty: TimedDataBuffer<i32> = TimedDataBuffer::new(fps30());
        let (status, value) = empty.try_get_sample(FrameTime::new(12));
        assert_eq!(status, TimedSampleStatus::DataMissing);
        assert_eq!(value, None);
    }

    #[test]
    fn test_nearest_sample_wins() {
        let mut buffer = TimedDataBuffer::new(fps30());
        buffer.add_in_rate(FrameTime::new(10), 10);
        buffer.add_in_rate(FrameTime::new(12), 12);

        let (status, value) = buffer.try_get_sample(FrameTime::from_f64(11.4));
        assert_eq!(status, TimedSampleStatus::Ok);
        assert_eq!(value, Some(&12));
    }

    #[test]
    fn test_equidistant_tie_prefers_earlier_sample() {
        let mut buffer = TimedDataBuffer::new(fps30());
        buffer.add_in_rate(FrameTime::new(10), 10);
        buffer.add_in_rate(FrameTime::new(12), 12);

        let (status, value) = buffer.try_get_sample(FrameTime::new(11));
        assert_eq!(status, TimedSampleStatus::Ok);
        assert_eq!(value, Some(&10));

        let mut integers = TimedDataBuffer::new(fps30());
        integers.add_in_rate(FrameTime::new(12), 12);
        integers.add_in_rate(FrameTime::new(13), 13);
        let (_, value) = integers.try_get_sample(FrameTime::from_f64(12.5));
        assert_eq!(value, Some(&12));
    }

    #[test]
    fn test_out_of_order_samples_are_dropped() {
        let mut buffer = TimedDataBuffer::new(fps30());
        assert!(buffer.add_in_rate(FrameTime::new(10), 10));
        assert!(!buffer.add_in_rate(FrameTime::new(10), 10));
        assert!(!buffer.add_in_rate(FrameTime::new(9), 9));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut buffer = TimedDataBuffer::with_capacity(fps30(), 3);
        for frame in 1..=4 {
            buffer.add_in_rate(FrameTime::new(frame), frame);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(
            buffer.frame_range(),
            Some((FrameTime::new(2), FrameTime::new(4)))
        );
    }

    #[test]
    fn test_set_capacity_evicts_oldest() {
        let mut buffer = filled_buffer();
        buffer.set_capacity(2);
        assert_eq!(
            buffer.frame_range(),
            Some((FrameTime::new(11), FrameTime::new(12)))
        );

        buffer.set_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_add_remaps_into_buffer_rate() {
        let mut buffer = TimedDataBuffer::new(fps30());
        let time = FrameTimeWithRate::new(FrameTime::new(60), FrameRate::new(60, 1));
        assert!(buffer.add(time, 1));
        assert_eq!(
            buffer.frame_range(),
            Some((FrameTime::new(30), FrameTime::new(30)))
        );
    }

    #[test]
    fn test_samples_in_range() {
        let buffer = filled_buffer();
        let frames: Vec<i32> = buffer
            .samples_in_range(FrameTime::new(11), FrameTime::new(13))
            .map(|sample| sample.value)
            .collect();
        assert_eq!(frames, vec![11, 12]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = filled_buffer();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), DEFAULT_BUFFER_CAPACITY);
    }
}
