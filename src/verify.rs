//! SHA-256 integrity verification of downloaded archives.

use anyhow::{Context, Result};
use log::debug;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::failure::Failure;
use crate::runtime::Runtime;

/// Streams the file at `path` through SHA-256 and compares the digest to
/// `expected` (64 hex characters, case-insensitive). A mismatch fails with
/// [`Failure::Integrity`]; the caller must discard the artifact and never
/// install it.
#[tracing::instrument(skip(runtime, path))]
pub fn verify_checksum<R: Runtime>(
    runtime: &R,
    path: &Path,
    expected: &str,
    url: &str,
) -> Result<()> {
    let mut reader = runtime
        .open(path)
        .with_context(|| format!("Failed to open downloaded archive at {:?}", path))?;

    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).context("Failed to hash downloaded archive")?;
    let actual = hex::encode(hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Failure::Integrity {
            url: url.to_string(),
            expected: expected.to_lowercase(),
            actual,
        }
        .into());
    }

    debug!("Checksum verified: {}", actual);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[test]
    fn test_verify_checksum_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        std::fs::write(&path, b"archive bytes").unwrap();

        let expected = sha256_hex(b"archive bytes");
        let result = verify_checksum(
            &RealRuntime,
            &path,
            &expected,
            "https://example.com/archive.tar.gz",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_checksum_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        std::fs::write(&path, b"archive bytes").unwrap();

        let expected = sha256_hex(b"archive bytes").to_uppercase();
        let result = verify_checksum(
            &RealRuntime,
            &path,
            &expected,
            "https://example.com/archive.tar.gz",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        std::fs::write(&path, b"tampered bytes").unwrap();

        let expected = sha256_hex(b"archive bytes");
        let error = verify_checksum(
            &RealRuntime,
            &path,
            &expected,
            "https://example.com/archive.tar.gz",
        )
        .unwrap_err();

        assert_eq!(failure::exit_code(&error), 4);
        let msg = error.to_string();
        assert!(msg.contains("https://example.com/archive.tar.gz"));
        assert!(msg.contains(&expected));
    }

    #[test]
    fn test_verify_checksum_missing_file() {
        let result = verify_checksum(
            &RealRuntime,
            Path::new("/nonexistent/archive.tar.gz"),
            "00",
            "https://example.com/archive.tar.gz",
        );
        assert!(result.is_err());
    }
}
