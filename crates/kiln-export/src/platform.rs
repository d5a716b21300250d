//! Export target platforms

use crate::error::ExportError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Android,
    Mac,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Ios, Platform::Android, Platform::Mac, Platform::Linux];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Mac => "mac",
            Platform::Linux => "linux",
        }
    }

    /// Platform of the machine running the tool, when it is an export target
    pub fn host() -> Option<Platform> {
        if cfg!(target_os = "macos") {
            Some(Platform::Mac)
        } else if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else {
            None
        }
    }

    /// Xcode projects (ios, mac)
    pub fn is_xcode(self) -> bool {
        matches!(self, Platform::Ios | Platform::Mac)
    }

    /// Generator output format
    pub fn generator_style(self) -> &'static str {
        match self {
            Platform::Ios | Platform::Mac => "xcode",
            Platform::Android => "cmake-linux",
            Platform::Linux => "make-linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ExportError::UnsupportedPlatform(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ios", Platform::Ios, "xcode")]
    #[case("mac", Platform::Mac, "xcode")]
    #[case("android", Platform::Android, "cmake-linux")]
    #[case("linux", Platform::Linux, "make-linux")]
    fn test_parse_and_style(#[case] name: &str, #[case] platform: Platform, #[case] style: &str) {
        let parsed: Platform = name.parse().unwrap();
        assert_eq!(parsed, platform);
        assert_eq!(parsed.generator_style(), style);
        assert_eq!(parsed.to_string(), name);
    }

    #[rstest]
    #[case("windows")]
    #[case("iOS")]
    #[case("")]
    fn test_unsupported(#[case] name: &str) {
        assert!(matches!(
            name.parse::<Platform>(),
            Err(ExportError::UnsupportedPlatform(_))
        ));
    }
}
