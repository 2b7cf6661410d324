//! Host platform detection.
//!
//! The operating system and CPU architecture are detected at compile time
//! and matched against catalog entries. Both can be overridden from the
//! command line, which is mainly useful for testing a catalog for a
//! platform other than the current host.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::failure::Failure;

/// Operating system family a release artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    #[serde(alias = "darwin")]
    #[value(alias = "darwin")]
    Macos,
    Linux,
    Windows,
}

/// CPU architecture a release artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[serde(alias = "aarch64")]
    #[value(name = "arm64", alias = "aarch64")]
    Arm64,
    #[serde(alias = "amd64")]
    #[value(name = "x86_64", alias = "amd64")]
    X86_64,
}

impl Os {
    /// Compile-time detection of the host OS. Returns `None` on targets
    /// the catalog format has no name for.
    pub fn detect() -> Option<Self> {
        #[cfg(target_os = "macos")]
        {
            Some(Os::Macos)
        }
        #[cfg(target_os = "linux")]
        {
            Some(Os::Linux)
        }
        #[cfg(target_os = "windows")]
        {
            Some(Os::Windows)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}

impl Arch {
    /// Compile-time detection of the host CPU architecture. Returns `None`
    /// on targets the catalog format has no name for.
    pub fn detect() -> Option<Self> {
        #[cfg(target_arch = "aarch64")]
        {
            Some(Arch::Arm64)
        }
        #[cfg(target_arch = "x86_64")]
        {
            Some(Arch::X86_64)
        }
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
        {
            None
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Macos => write!(f, "macos"),
            Os::Linux => write!(f, "linux"),
            Os::Windows => write!(f, "windows"),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Arm64 => write!(f, "arm64"),
            Arch::X86_64 => write!(f, "x86_64"),
        }
    }
}

impl FromStr for Os {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "macos" | "darwin" => Ok(Os::Macos),
            "linux" => Ok(Os::Linux),
            "windows" => Ok(Os::Windows),
            other => bail!("unknown operating system: {}", other),
        }
    }
}

impl FromStr for Arch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            other => bail!("unknown CPU architecture: {}", other),
        }
    }
}

/// The (os, arch) pair a catalog lookup is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detect the current platform, failing with an unsupported-platform
    /// error when the host does not map onto the catalog's names.
    pub fn detect() -> anyhow::Result<Self> {
        match (Os::detect(), Arch::detect()) {
            (Some(os), Some(arch)) => Ok(Platform { os, arch }),
            _ => Err(Failure::UnsupportedPlatform {
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect().unwrap();

        #[cfg(target_os = "macos")]
        assert_eq!(platform.os, Os::Macos);

        #[cfg(target_os = "linux")]
        assert_eq!(platform.os, Os::Linux);

        #[cfg(target_os = "windows")]
        assert_eq!(platform.os, Os::Windows);

        #[cfg(target_arch = "x86_64")]
        assert_eq!(platform.arch, Arch::X86_64);

        #[cfg(target_arch = "aarch64")]
        assert_eq!(platform.arch, Arch::Arm64);
    }

    #[test]
    fn test_os_from_str_accepts_aliases() {
        assert_eq!(Os::from_str("macos").unwrap(), Os::Macos);
        assert_eq!(Os::from_str("Darwin").unwrap(), Os::Macos);
        assert_eq!(Os::from_str("linux").unwrap(), Os::Linux);
        assert!(Os::from_str("plan9").is_err());
    }

    #[test]
    fn test_arch_from_str_accepts_aliases() {
        assert_eq!(Arch::from_str("arm64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_str("aarch64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_str("x86_64").unwrap(), Arch::X86_64);
        assert_eq!(Arch::from_str("AMD64").unwrap(), Arch::X86_64);
        assert!(Arch::from_str("i686").is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for os in [Os::Macos, Os::Linux, Os::Windows] {
            assert_eq!(Os::from_str(&os.to_string()).unwrap(), os);
        }
        for arch in [Arch::Arm64, Arch::X86_64] {
            assert_eq!(Arch::from_str(&arch.to_string()).unwrap(), arch);
        }
    }

    #[test]
    fn test_serde_names_match_catalog_format() {
        let os: Os = serde_json::from_str(r#""macos""#).unwrap();
        assert_eq!(os, Os::Macos);
        let os: Os = serde_json::from_str(r#""darwin""#).unwrap();
        assert_eq!(os, Os::Macos);

        let arch: Arch = serde_json::from_str(r#""x86_64""#).unwrap();
        assert_eq!(arch, Arch::X86_64);
        let arch: Arch = serde_json::from_str(r#""aarch64""#).unwrap();
        assert_eq!(arch, Arch::Arm64);

        assert_eq!(serde_json::to_string(&Os::Linux).unwrap(), r#""linux""#);
        assert_eq!(serde_json::to_string(&Arch::Arm64).unwrap(), r#""arm64""#);
    }
}
