//! Source abstractions the synchronizer drives.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::TimedSampleStatus;
use crate::timecode::{FrameRate, FrameTime, FrameTimeWithRate};

/// Stable identity of a timed data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    /// Generates a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identity of a synchronizer, used to record source ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynchronizerId(Uuid);

impl SynchronizerId {
    /// Generates a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SynchronizerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SynchronizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stream of timed sample data that can be asked to present the sample for
/// a given time.
///
/// Implementations buffer incoming samples and map a presentation request
/// onto their own frame rate. A source belongs to at most one synchronizer
/// at a time, recorded through [`TimedDataSource::synchronizer`].
pub trait TimedDataSource {
    /// Stable identity of this source.
    fn id(&self) -> SourceId;

    /// Human-readable name for logs and reports.
    fn display_name(&self) -> &str;

    /// Rate the source's samples are timed in.
    fn frame_rate(&self) -> FrameRate;

    /// Current sample retention limit.
    fn buffer_size(&self) -> usize;

    /// Changes the sample retention limit.
    fn set_buffer_size(&mut self, size: usize);

    /// Smallest retention limit the source supports, if bounded.
    fn min_buffer_size(&self) -> Option<usize> {
        None
    }

    /// Largest retention limit the source supports, if bounded.
    fn max_buffer_size(&self) -> Option<usize> {
        None
    }

    /// Offset added to presentation requests, in the source's rate.
    fn presentation_offset(&self) -> FrameTime;

    /// Sets the offset added to presentation requests.
    fn set_presentation_offset(&mut self, offset: FrameTime);

    /// True while a synchronizer is actively presenting this source.
    fn is_synchronized(&self) -> bool;

    /// Marks whether a synchronizer is actively presenting this source.
    fn set_synchronized(&mut self, synchronized: bool);

    /// The synchronizer this source belongs to, if any.
    fn synchronizer(&self) -> Option<SynchronizerId>;

    /// Records which synchronizer this source belongs to.
    fn set_synchronizer(&mut self, synchronizer: Option<SynchronizerId>);

    /// Oldest and newest buffered sample times, in the source's rate.
    fn buffer_range(&self) -> Option<(FrameTime, FrameTime)>;

    /// Presents the sample nearest the given time and reports how well the
    /// buffer covered the request.
    fn present_at(&mut self, present_time: &FrameTimeWithRate) -> TimedSampleStatus;
}

/// A reference clock that reports the current position on a shared timeline.
pub trait TimecodeSource {
    /// Stable identity of this clock.
    fn id(&self) -> SourceId;

    /// Human-readable name for logs and reports.
    fn display_name(&self) -> &str;

    /// Rate the clock counts in.
    fn frame_rate(&self) -> FrameRate;

    /// The clock's current position, or `None` while it has no signal.
    fn current_time(&self) -> Option<FrameTimeWithRate>;
}

/// Shared handle to a timed data source.
pub type SharedDataSource = Rc<RefCell<dyn TimedDataSource>>;

/// Shared handle to a reference clock.
pub type SharedTimecodeSource = Rc<RefCell<dyn TimecodeSource>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SourceId::new(), SourceId::new());
        assert_ne!(SynchronizerId::new(), SynchronizerId::new());
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let id = SourceId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
