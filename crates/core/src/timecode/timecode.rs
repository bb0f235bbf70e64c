//! Absolute timecode labels

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::{FrameRate, FrameTime, Subframe, DEFAULT_SUBFRAME_RESOLUTION};

/// An absolute `HH:MM:SS:FF` label for a frame position, wrapped into a
/// 24-hour day.
///
/// Drop-frame labeling (2 skipped numbers per minute at 29.97, 4 at 59.94,
/// minutes divisible by ten exempt) keeps the label aligned with wall time
/// at the NTSC rates. The sub-frame part of the source position is carried
/// through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timecode {
    hours: i32,
    minutes: i32,
    seconds: i32,
    frames: i32,
    subframe: Subframe,
    is_drop_frame: bool,
}

impl Timecode {
    /// Builds a label from raw fields. Fields are not range-checked; they
    /// wrap when converted back to a frame position.
    pub const fn from_hmsf(
        hours: i32,
        minutes: i32,
        seconds: i32,
        frames: i32,
        is_drop_frame: bool,
    ) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
            subframe: Subframe::zero(DEFAULT_SUBFRAME_RESOLUTION),
            is_drop_frame,
        }
    }

    /// Labels a frame position at the given rate.
    ///
    /// Returns the zero label when the rate is invalid or has no whole-frame
    /// nominal rate.
    pub fn from_frame_time(rate: FrameRate, frame_time: FrameTime) -> Self {
        let Some(layout) = DropFrameLayout::of(rate) else {
            return Self::default();
        };
        let (adjusted, is_drop_frame) = layout.to_nominal_numbering(frame_time.frame_number());
        let nominal = layout.nominal;
        Self {
            hours: ((adjusted / (nominal * 3600)) % 24) as i32,
            minutes: ((adjusted / (nominal * 60)) % 60) as i32,
            seconds: ((adjusted / nominal) % 60) as i32,
            frames: (adjusted % nominal) as i32,
            subframe: frame_time.subframe(),
            is_drop_frame,
        }
    }

    /// Labels an elapsed-seconds position at the given rate.
    pub fn from_seconds(rate: FrameRate, seconds: f64) -> Self {
        Self::from_frame_time(rate, FrameTime::from_f64(seconds * rate.as_f64()))
    }

    /// The frame position of this label at the given rate.
    ///
    /// Returns zero when the rate is invalid or has no whole-frame nominal
    /// rate.
    pub fn to_frame_time(&self, rate: FrameRate) -> FrameTime {
        let Some(layout) = DropFrameLayout::of(rate) else {
            return FrameTime::default();
        };
        let nominal = layout.nominal;
        let total_seconds =
            i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds);
        let nominal_total = total_seconds * nominal + i64::from(self.frames);
        let total = if self.is_drop_frame && layout.dropped_per_minute > 0 {
            let total_minutes = i64::from(self.hours) * 60 + i64::from(self.minutes);
            nominal_total - layout.dropped_per_minute * (total_minutes - total_minutes / 10)
        } else {
            nominal_total
        };
        let frame = total.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        FrameTime::with_subframe(frame, self.subframe)
    }

    /// The label as elapsed seconds at the given rate.
    pub fn to_seconds(&self, rate: FrameRate) -> f64 {
        self.to_frame_time(rate).to_f64() * rate.frame_interval()
    }

    /// Hours field.
    pub const fn hours(&self) -> i32 {
        self.hours
    }

    /// Minutes field.
    pub const fn minutes(&self) -> i32 {
        self.minutes
    }

    /// Seconds field.
    pub const fn seconds(&self) -> i32 {
        self.seconds
    }

    /// Frames field.
    pub const fn frames(&self) -> i32 {
        self.frames
    }

    /// Sub-frame part carried from the source position.
    pub const fn subframe(&self) -> Subframe {
        self.subframe
    }

    /// True when this label uses drop-frame numbering.
    pub const fn is_drop_frame(&self) -> bool {
        self.is_drop_frame
    }
}

/// Frame-numbering layout of a rate: nominal whole fps plus how many labels
/// each drop-frame minute skips.
struct DropFrameLayout {
    nominal: i64,
    dropped_per_minute: i64,
}

impl DropFrameLayout {
    fn of(rate: FrameRate) -> Option<Self> {
        if !rate.is_valid() {
            return None;
        }
        let nominal = rate.as_f64().round() as i64;
        if nominal <= 0 {
            return None;
        }
        // Only 29.97 and 59.94 have a SMPTE drop rule; 23.976 labels as
        // non-drop even when the flag is set.
        let dropped_per_minute = if rate.is_drop_frame() {
            match rate.numerator() {
                30000 => 2,
                60000 => 4,
                _ => 0,
            }
        } else {
            0
        };
        Some(Self {
            nominal,
            dropped_per_minute,
        })
    }

    /// Wraps a frame number into one day and re-expresses it in nominal
    /// numbering (the numbering that includes the skipped labels).
    fn to_nominal_numbering(&self, frame_number: i32) -> (i64, bool) {
        let frame = i64::from(frame_number);
        if self.dropped_per_minute == 0 {
            let frames_per_day = self.nominal * 86_400;
            return (frame.rem_euclid(frames_per_day), false);
        }
        let drop = self.dropped_per_minute;
        let frames_per_minute = self.nominal * 60 - drop;
        let frames_per_ten_minutes = frames_per_minute * 10 + drop;
        let frames_per_day = frames_per_ten_minutes * 144;
        let frame = frame.rem_euclid(frames_per_day);
        let ten_minute_chunks = frame / frames_per_ten_minutes;
        let within_chunk = frame % frames_per_ten_minutes;
        let extra_minutes = if within_chunk < drop {
            0
        } else {
            (within_chunk - drop) / frames_per_minute
        };
        let adjusted = frame + drop * (9 * ten_minute_chunks + extra_minutes);
        (adjusted, true)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.is_drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, separator, self.frames
        )
    }
}

impl FromStr for Timecode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse_error = |reason: &str| Error::ParseTimecode {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (body, frames_part, is_drop_frame) = if let Some(index) = trimmed.rfind(';') {
            (&trimmed[..index], &trimmed[index + 1..], true)
        } else if let Some(index) = trimmed.rfind(':') {
            (&trimmed[..index], &trimmed[index + 1..], false)
        } else {
            return Err(parse_error("expected HH:MM:SS:FF or HH:MM:SS;FF"));
        };

        let mut fields = body.split(':');
        let mut next_field = |name: &str| {
            fields
                .next()
                .ok_or_else(|| parse_error(&format!("missing {name}")))
                .and_then(|text| {
                    text.parse::<i32>()
                        .map_err(|_| parse_error(&format!("{name} is not a number")))
                })
        };

        let hours = next_field("hours")?;
        let minutes = next_field("minutes")?;
        let seconds = next_field("seconds")?;
        if fields.next().is_some() {
            return Err(parse_error("too many fields"));
        }
        let frames = frames_part
            .parse::<i32>()
            .map_err(|_| parse_error("frames is not a number"))?;

        if !(0..24).contains(&hours) {
            return Err(parse_error("hours out of range"));
        }
        if !(0..60).contains(&minutes) {
            return Err(parse_error("minutes out of range"));
        }
        if !(0..60).contains(&seconds) {
            return Err(parse_error("seconds out of range"));
        }
        if frames < 0 {
            return Err(parse_error("frames out of range"));
        }

        Ok(Self::from_hmsf(hours, minutes, seconds, frames, is_drop_frame))
    }
}
