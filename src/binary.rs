//! Locating the one executable inside an extracted archive.

use anyhow::Result;
use log::debug;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::failure::Failure;
use crate::runtime::Runtime;

/// Finds the single executable in an extracted archive tree.
///
/// A file counts as an executable when its unix mode has an execute bit set
/// or when it parses as a native binary (ELF, Mach-O, PE). An archive
/// holding exactly one regular file in total is taken to contain that
/// executable even when the format recorded no mode, which is common for
/// archives produced on Windows.
///
/// Fails with [`Failure::Extraction`] unless exactly one executable is
/// identified.
#[tracing::instrument(skip(runtime))]
pub fn find_single_executable<R: Runtime>(runtime: &R, dir: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    collect_files(runtime, dir, &mut files)?;
    files.sort();

    let executables: Vec<&PathBuf> = files
        .iter()
        .filter(|path| is_executable(runtime, path))
        .collect();

    match executables.as_slice() {
        [single] => {
            debug!("Found executable: {:?}", single);
            Ok((*single).clone())
        }
        [] => match files.as_slice() {
            [only] => {
                debug!("No marked executable; archive holds a single file: {:?}", only);
                Ok(only.clone())
            }
            [] => Err(Failure::Extraction {
                reason: "archive contains no files".to_string(),
            }
            .into()),
            _ => Err(Failure::Extraction {
                reason: format!(
                    "no executable found among {} files in archive",
                    files.len()
                ),
            }
            .into()),
        },
        many => Err(Failure::Extraction {
            reason: format!(
                "expected exactly one executable in archive, found {}",
                many.len()
            ),
        }
        .into()),
    }
}

fn collect_files<R: Runtime>(runtime: &R, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for path in runtime.read_dir(dir)? {
        if runtime.is_dir(&path) {
            collect_files(runtime, &path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn is_executable<R: Runtime>(runtime: &R, path: &Path) -> bool {
    if let Ok(Some(mode)) = runtime.file_mode(path)
        && mode & 0o111 != 0
    {
        return true;
    }
    is_native_binary(runtime, path)
}

/// Check if a file is a native binary by parsing its format with goblin.
fn is_native_binary<R: Runtime>(runtime: &R, path: &Path) -> bool {
    let mut file = match runtime.open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buffer = Vec::new();
    if file.read_to_end(&mut buffer).is_err() {
        return false;
    }

    matches!(
        goblin::Object::parse(&buffer),
        Ok(goblin::Object::Elf(_) | goblin::Object::Mach(_) | goblin::Object::PE(_))
    )
}
