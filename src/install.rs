//! Install use case: resolve, download, verify, extract, move into place.
//!
//! The steps run strictly in sequence. Any failure aborts the invocation
//! and leaves the destination untouched; everything up to the final move
//! happens inside a scratch directory that is removed on drop.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use log::{debug, info};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveExtractor, ArchiveExtractorImpl};
use crate::binary::find_single_executable;
use crate::catalog::{Catalog, CatalogEntry};
use crate::download::download_file;
use crate::failure::{Failure, ensure_failure};
use crate::http::HttpClient;
use crate::platform::{Arch, Os, Platform};
use crate::runtime::Runtime;
use crate::scratch::Scratch;
use crate::verify::verify_checksum;

/// Options for the install use case.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Destination directory (defaults to the user executable directory).
    pub dest: Option<PathBuf>,
    /// Override the detected operating system.
    pub os: Option<Os>,
    /// Override the detected CPU architecture.
    pub arch: Option<Arch>,
    /// Catalog file to use instead of the embedded release catalog.
    pub catalog: Option<PathBuf>,
}

/// CLI entry point: resolve the host platform against the catalog and
/// install the matching artifact.
pub async fn install<R: Runtime + 'static>(runtime: &R, options: InstallOptions) -> Result<()> {
    let platform = resolve_platform(&options)?;
    debug!("Resolved platform: {}", platform);

    let catalog = match &options.catalog {
        Some(path) => Catalog::load(runtime, path)?,
        None => Catalog::builtin()?,
    };
    let entry = catalog.resolve(&platform)?;

    let dest_dir = match options.dest {
        Some(ref dir) => dir.clone(),
        None => default_dest_dir(runtime)?,
    };

    let client = HttpClient::new(reqwest::Client::new());
    let installed = fetch_and_install(runtime, &client, entry, &dest_dir).await?;

    info!("Installed {:?}", installed);
    println!("Installed {}", installed.display());
    Ok(())
}

/// Downloads, verifies, extracts, and installs a catalog entry. Returns
/// the path of the installed executable.
#[tracing::instrument(skip(runtime, client, entry, dest_dir))]
pub async fn fetch_and_install<R: Runtime + 'static>(
    runtime: &R,
    client: &HttpClient,
    entry: &CatalogEntry,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let scratch = Scratch::create(runtime, "bindl")?;

    let archive_path = scratch.file(&archive_file_name(&entry.url));
    download_file(runtime, &entry.url, &archive_path, client).await?;

    // A mismatching artifact is discarded with the scratch dir and never
    // extracted or installed.
    verify_checksum(runtime, &archive_path, &entry.checksum, &entry.url)?;

    let extract_dir = scratch.dir("extracted")?;
    let extractor = ArchiveExtractorImpl::new();
    extractor
        .extract(runtime, &archive_path, &extract_dir)
        .map_err(|e| ensure_failure(e, |reason| Failure::Extraction { reason }))?;

    let executable = find_single_executable(runtime, &extract_dir)?;
    install_executable(runtime, &executable, dest_dir)
}

/// Moves the executable into the destination directory and sets the
/// executable bit. The move holds an exclusive lock on the destination so
/// concurrent installs do not interleave writes.
fn install_executable<R: Runtime>(
    runtime: &R,
    source: &Path,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let file_name: &OsStr = source.file_name().ok_or_else(|| Failure::Extraction {
        reason: format!("executable has no file name: {:?}", source),
    })?;

    let result = (|| -> Result<PathBuf> {
        runtime.create_dir_all(dest_dir)?;

        let _lock = DestLock::acquire(dest_dir)?;
        let dest = dest_dir.join(file_name);

        if runtime.exists(&dest) {
            debug!("Overwriting existing executable at {:?}", dest);
        }

        // rename is atomic on the same filesystem; the scratch dir may live
        // on another one, so fall back to copy + remove
        if runtime.rename(source, &dest).is_err() {
            runtime.copy(source, &dest)?;
            runtime.remove_file(source)?;
        }

        runtime.set_permissions(&dest, 0o755)?;
        Ok(dest)
    })();

    result.map_err(|e| ensure_failure(e, |reason| Failure::Install { reason }))
}

/// Exclusive advisory lock on the destination directory, held for the
/// duration of the move.
///
/// The lock file stays in place after release. Unlinking it would let a
/// process blocked on the old inode and a process locking a fresh file at
/// the same path hold the lock at the same time.
struct DestLock {
    file: std::fs::File,
}

impl DestLock {
    fn acquire(dest_dir: &Path) -> Result<Self> {
        let path = dest_dir.join(".bindl.lock");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to create lock file at {:?}", path))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {:?}", path))?;
        Ok(Self { file })
    }
}

impl Drop for DestLock {
    fn drop(&mut self) {
        let _ = fs4::fs_std::FileExt::unlock(&self.file);
    }
}

fn resolve_platform(options: &InstallOptions) -> Result<Platform> {
    if let (Some(os), Some(arch)) = (options.os, options.arch) {
        return Ok(Platform { os, arch });
    }
    let detected = Platform::detect()?;
    Ok(Platform {
        os: options.os.unwrap_or(detected.os),
        arch: options.arch.unwrap_or(detected.arch),
    })
}

fn default_dest_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if let Some(dir) = runtime.executable_dir() {
        return Ok(dir);
    }
    if let Some(home) = runtime.home_dir() {
        return Ok(home.join(".local").join("bin"));
    }
    Err(Failure::Install {
        reason: "could not determine a destination directory; pass --dest".to_string(),
    }
    .into())
}

/// Last path segment of the URL, used as the scratch file name so the
/// extractor can dispatch on the archive extension. Query strings and
/// fragments are not part of the file name.
fn archive_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("artifact")
        .to_string()
}
