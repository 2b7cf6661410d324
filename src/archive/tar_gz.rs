use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::path::{Component, Path};
use tar::{Archive, EntryType};

use crate::runtime::Runtime;

use super::ArchiveExtractor;

/// Extractor for .tar.gz and .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let decoder = GzDecoder::new(file);
        let mut archive = Archive::new(decoder);

        let entries = archive
            .entries()
            .with_context(|| format!("Malformed tar.gz archive {:?}", archive_path))?;

        for entry in entries {
            let mut entry =
                entry.with_context(|| format!("Malformed entry in archive {:?}", archive_path))?;
            let rel_path = entry
                .path()
                .context("Archive entry has an invalid path")?
                .to_path_buf();

            if rel_path.is_absolute()
                || rel_path
                    .components()
                    .any(|c| matches!(c, Component::ParentDir))
            {
                debug!("Skipping entry with unsafe path: {:?}", rel_path);
                continue;
            }

            let full_path = extract_to.join(&rel_path);

            match entry.header().entry_type() {
                EntryType::Directory => runtime.create_dir_all(&full_path)?,
                EntryType::Regular => {
                    if let Some(parent) = full_path.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    let mut dest_file = runtime.create_file(&full_path)?;
                    std::io::copy(&mut entry, &mut dest_file)
                        .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                    #[cfg(unix)]
                    if let Ok(mode) = entry.header().mode()
                        && let Err(e) = runtime.set_permissions(&full_path, mode)
                    {
                        debug!("Failed to set permissions on {:?}: {}", full_path, e);
                    }
                }
                other => {
                    debug!("Skipping {:?} entry: {:?}", other, rel_path);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::{self, File};
    use tar::Builder;
    use tempfile::tempdir;

    fn create_archive(path: &Path, files: &[(&str, &str, u32)]) {
        let file = File::create(path).unwrap();
        let enc = GzEncoder::new(file, Compression::default());
        let mut tar = Builder::new(enc);

        for (name, content, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            tar.append(&header, content.as_bytes()).unwrap();
        }

        tar.finish().unwrap();
    }

    #[test]
    fn test_can_handle() {
        let extractor = TarGzExtractor;
        assert!(extractor.can_handle(Path::new("file.tar.gz")));
        assert!(extractor.can_handle(Path::new("FILE.TGZ")));
        assert!(!extractor.can_handle(Path::new("file.zip")));
        assert!(!extractor.can_handle(Path::new("file.tar")));
    }

    #[test]
    fn test_extract_preserves_modes() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("test.tar.gz");
        let extract_path = dir.path().join("out");
        fs::create_dir(&extract_path).unwrap();

        create_archive(
            &archive_path,
            &[("cli", "#!binary", 0o755), ("README.md", "docs", 0o644)],
        );

        TarGzExtractor
            .extract(&RealRuntime, &archive_path, &extract_path)
            .unwrap();

        let binary = extract_path.join("cli");
        assert_eq!(fs::read_to_string(&binary).unwrap(), "#!binary");

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let mode = fs::metadata(&binary).unwrap().mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[test]
    fn test_extract_nested_paths() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("test.tar.gz");
        let extract_path = dir.path().join("out");
        fs::create_dir(&extract_path).unwrap();

        create_archive(&archive_path, &[("sub/dir/tool", "content", 0o755)]);

        TarGzExtractor
            .extract(&RealRuntime, &archive_path, &extract_path)
            .unwrap();

        assert!(extract_path.join("sub/dir/tool").exists());
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("bogus.tar.gz");
        let extract_path = dir.path().join("out");
        fs::create_dir(&extract_path).unwrap();
        fs::write(&archive_path, b"this is not a gzip stream").unwrap();

        let result = TarGzExtractor.extract(&RealRuntime, &archive_path, &extract_path);
        assert!(result.is_err());
    }
}
