//! Terminal failure taxonomy with one distinct process exit code per kind.
//!
//! Every failure here aborts the current invocation; nothing is recovered
//! internally. The enum is carried inside `anyhow::Error` chains and
//! recovered by downcast when the process picks its exit code.

/// Exit code used when an error chain contains no classified failure.
pub const EXIT_UNKNOWN: i32 = 1;

#[derive(Debug)]
pub enum Failure {
    /// No catalog entry matches the host (os, arch) pair.
    UnsupportedPlatform { os: String, arch: String },
    /// Network failure or non-success HTTP status while fetching the archive.
    Download { url: String, reason: String },
    /// Downloaded bytes do not hash to the catalog checksum.
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },
    /// Malformed archive, or not exactly one executable inside it.
    Extraction { reason: String },
    /// Filesystem failure while moving the executable into place.
    Install { reason: String },
}

impl Failure {
    /// Stable exit code for scripting; one distinct code per kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::UnsupportedPlatform { .. } => 2,
            Failure::Download { .. } => 3,
            Failure::Integrity { .. } => 4,
            Failure::Extraction { .. } => 5,
            Failure::Install { .. } => 6,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::UnsupportedPlatform { os, arch } => {
                write!(f, "unsupported platform: no catalog entry for {}/{}", os, arch)
            }
            Failure::Download { url, reason } => {
                write!(f, "download failed for {}: {}", url, reason)
            }
            Failure::Integrity {
                url,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "checksum mismatch for {}: expected sha256 {}, got {}",
                    url, expected, actual
                )
            }
            Failure::Extraction { reason } => {
                write!(f, "extraction failed: {}", reason)
            }
            Failure::Install { reason } => {
                write!(f, "install failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for Failure {}

/// Exit code for an error chain: the classified failure's code when one is
/// present anywhere in the chain, [`EXIT_UNKNOWN`] otherwise.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(failure) = cause.downcast_ref::<Failure>() {
            return failure.exit_code();
        }
    }
    EXIT_UNKNOWN
}

/// Wraps an error into the given failure kind unless a classified failure
/// is already present in its chain.
pub fn ensure_failure(
    error: anyhow::Error,
    wrap: impl FnOnce(String) -> Failure,
) -> anyhow::Error {
    if error
        .chain()
        .any(|cause| cause.downcast_ref::<Failure>().is_some())
    {
        error
    } else {
        anyhow::Error::new(wrap(format!("{:#}", error)))
    }
}
