//! The release catalog: an immutable table mapping (os, arch) pairs to a
//! download URL and SHA-256 checksum.
//!
//! The catalog is generated at release-publish time. A copy for the current
//! release is embedded in the binary; `--catalog` points at an alternative
//! JSON file with the same shape.

use anyhow::{Context, Result, bail};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::failure::Failure;
use crate::platform::{Arch, Os, Platform};
use crate::runtime::Runtime;

/// Release catalog baked in at build time.
const BUILTIN_CATALOG: &str = include_str!("../catalog.json");

/// One platform's artifact: where to fetch it and what it must hash to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub os: Os,
    pub arch: Arch,
    pub url: String,
    pub checksum: String,
}

impl CatalogEntry {
    fn validate(&self) -> Result<()> {
        if self.url.starts_with("http://") {
            // Tolerated for local mirrors and tests; release catalogs use https.
            warn!("Catalog entry for {}/{} uses plain http: {}", self.os, self.arch, self.url);
        } else if !self.url.starts_with("https://") {
            bail!(
                "catalog entry for {}/{} has a non-https url: {}",
                self.os,
                self.arch,
                self.url
            );
        }
        if self.checksum.len() != 64 || !self.checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!(
                "catalog entry for {}/{} has a malformed sha256 checksum: {}",
                self.os,
                self.arch,
                self.checksum
            );
        }
        Ok(())
    }
}

/// Immutable set of catalog entries, at most one per (os, arch) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Validates and wraps a list of entries. Fails on malformed entries or
    /// a duplicate (os, arch) pair, so lookups are always unambiguous.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            entry.validate()?;
            if entries[..i]
                .iter()
                .any(|e| e.os == entry.os && e.arch == entry.arch)
            {
                bail!("duplicate catalog entry for {}/{}", entry.os, entry.arch);
            }
        }
        Ok(Self { entries })
    }

    /// Parses a catalog from its JSON representation: a flat array of
    /// `{os, arch, url, checksum}` records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).context("Failed to parse catalog JSON")?;
        Self::new(entries)
    }

    /// The catalog embedded at build time.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG).context("Embedded release catalog is invalid")
    }

    /// Loads a catalog from a JSON file.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read catalog at {:?}", path))?;
        Self::from_json_str(&content)
    }

    /// Looks up the unique entry for a platform. Performs no I/O; an absent
    /// pair fails with [`Failure::UnsupportedPlatform`].
    pub fn resolve(&self, platform: &Platform) -> Result<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.os == platform.os && e.arch == platform.arch)
            .ok_or_else(|| {
                Failure::UnsupportedPlatform {
                    os: platform.os.to_string(),
                    arch: platform.arch.to_string(),
                }
                .into()
            })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}
