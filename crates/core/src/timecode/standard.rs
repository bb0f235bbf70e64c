//! Catalog of broadcast frame rates

use std::fmt;

use super::FrameRate;

/// The standard broadcast and film frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFrameRate {
    /// 24000/1001 fps (NTSC film)
    Fps23_976,
    /// 24 fps (film)
    Fps24,
    /// 25 fps (PAL)
    Fps25,
    /// 30000/1001 fps, non-drop
    Fps29_97,
    /// 30000/1001 fps, drop-frame
    Fps29_97Df,
    /// 30 fps
    Fps30,
    /// 48 fps
    Fps48,
    /// 50 fps
    Fps50,
    /// 60000/1001 fps, non-drop
    Fps59_94,
    /// 60000/1001 fps, drop-frame
    Fps59_94Df,
    /// 60 fps
    Fps60,
}

impl StandardFrameRate {
    /// Every catalog entry, in ascending rate order.
    pub const ALL: [StandardFrameRate; 11] = [
        StandardFrameRate::Fps23_976,
        StandardFrameRate::Fps24,
        StandardFrameRate::Fps25,
        StandardFrameRate::Fps29_97,
        StandardFrameRate::Fps29_97Df,
        StandardFrameRate::Fps30,
        StandardFrameRate::Fps48,
        StandardFrameRate::Fps50,
        StandardFrameRate::Fps59_94,
        StandardFrameRate::Fps59_94Df,
        StandardFrameRate::Fps60,
    ];

    /// The rational rate for this entry.
    pub const fn rate(self) -> FrameRate {
        match self {
            StandardFrameRate::Fps23_976 => FrameRate::new(24000, 1001),
            StandardFrameRate::Fps24 => FrameRate::new(24, 1),
            StandardFrameRate::Fps25 => FrameRate::new(25, 1),
            StandardFrameRate::Fps29_97 => FrameRate::new(30000, 1001),
            StandardFrameRate::Fps29_97Df => FrameRate::with_drop_frame(30000, 1001, true),
            StandardFrameRate::Fps30 => FrameRate::new(30, 1),
            StandardFrameRate::Fps48 => FrameRate::new(48, 1),
            StandardFrameRate::Fps50 => FrameRate::new(50, 1),
            StandardFrameRate::Fps59_94 => FrameRate::new(60000, 1001),
            StandardFrameRate::Fps59_94Df => FrameRate::with_drop_frame(60000, 1001, true),
            StandardFrameRate::Fps60 => FrameRate::new(60, 1),
        }
    }
}

impl From<StandardFrameRate> for FrameRate {
    fn from(standard: StandardFrameRate) -> Self {
        standard.rate()
    }
}

impl fmt::Display for StandardFrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.rate().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_rates_are_valid() {
        for standard in StandardFrameRate::ALL {
            assert!(standard.rate().is_valid(), "{standard:?} must be valid");
        }
    }

    #[test]
    fn test_catalog_is_ascending() {
        for pair in StandardFrameRate::ALL.windows(2) {
            assert!(
                pair[0].rate() <= pair[1].rate(),
                "{:?} should not exceed {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_drop_frame_entries() {
        assert!(StandardFrameRate::Fps29_97Df.rate().is_drop_frame());
        assert!(StandardFrameRate::Fps59_94Df.rate().is_drop_frame());
        assert!(!StandardFrameRate::Fps29_97.rate().is_drop_frame());
    }

    #[test]
    fn test_conversion_into_frame_rate() {
        let rate: FrameRate = StandardFrameRate::Fps25.into();
        assert_eq!(rate, FrameRate::new(25, 1));
    }
}
