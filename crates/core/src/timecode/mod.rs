//! Frame-accurate time primitives.
//!
//! Positions on a timeline are counted in frames at a [`FrameRate`], with a
//! [`Subframe`] fraction for positions between frame boundaries. A
//! [`FrameTime`] is such a position without a rate, a [`FrameTimeWithRate`]
//! pairs the two so it can be remapped between rates, and a [`Timecode`]
//! renders a position as an `HH:MM:SS:FF` label with SMPTE drop-frame
//! numbering at the NTSC rates.

mod frame_rate;
mod frame_time;
mod rate_time;
mod standard;
mod subframe;
#[allow(clippy::module_inception)]
mod timecode;

pub use frame_rate::FrameRate;
pub use frame_time::FrameTime;
pub use rate_time::FrameTimeWithRate;
pub use standard::StandardFrameRate;
pub use subframe::{Subframe, DEFAULT_SUBFRAME_RESOLUTION};
pub use timecode::Timecode;

/// Greatest common divisor, used to keep rational rates and subframe
/// fractions in lowest terms.
pub(crate) const fn gcd_u32(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    a
}
