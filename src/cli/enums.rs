//! CLI enum types for device profile and character set options.

use clap::ValueEnum;

use crate::display;

/// Built-in camera profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Profile {
    /// 7x5 sensor, 16-bit samples
    #[default]
    Agfa35,
    /// 4x3 sensor, 8-bit samples
    Kodak12,
}

impl Profile {
    /// Name understood by `DeviceProfile::by_name`.
    pub fn key(&self) -> &'static str {
        match self {
            Profile::Agfa35 => "agfa35",
            Profile::Kodak12 => "kodak12",
        }
    }
}

/// ASCII character set for the live preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CharacterSet {
    Standard,
    #[default]
    Blocks,
    Minimal,
}

impl From<CharacterSet> for display::CharSet {
    fn from(c: CharacterSet) -> Self {
        match c {
            CharacterSet::Standard => display::CharSet::Standard,
            CharacterSet::Blocks => display::CharSet::Blocks,
            CharacterSet::Minimal => display::CharSet::Minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DeviceProfile;

    #[test]
    fn test_profile_keys_resolve() {
        for p in [Profile::Agfa35, Profile::Kodak12] {
            assert!(DeviceProfile::by_name(p.key()).is_ok());
        }
    }

    #[test]
    fn test_charset_to_display_charset() {
        assert_eq!(
            display::CharSet::from(CharacterSet::Standard),
            display::CharSet::Standard
        );
        assert_eq!(
            display::CharSet::from(CharacterSet::Blocks),
            display::CharSet::Blocks
        );
        assert_eq!(
            display::CharSet::from(CharacterSet::Minimal),
            display::CharSet::Minimal
        );
    }
}
