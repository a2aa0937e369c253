use crate::error::GrabError;
use crate::logging::Diagnostics;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Unpack the single file an archive carries and return where it was written.
///
/// The file goes to `target_dir`, or next to the working directory when absent.
/// An archive without entries, or one starting with a directory, is rejected.
pub fn unpack_single_file(
    zip_path: &Path,
    target_dir: Option<&Path>,
    log: &Diagnostics,
) -> Result<PathBuf> {
    log.emit(format_args!("unpack \"{}\"", zip_path.display()));

    let file = fs::File::open(zip_path)
        .with_context(|| format!("Failed to open zip file: {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive: {}", zip_path.display()))?;

    if archive.len() == 0 {
        return Err(GrabError::EmptyArchive {
            path: zip_path.to_path_buf(),
        }
        .into());
    }

    let mut entry = archive
        .by_index(0)
        .with_context(|| format!("Failed to access the first entry of {}", zip_path.display()))?;

    if entry.is_dir() {
        return Err(GrabError::DirectoryInArchive {
            path: zip_path.to_path_buf(),
            entry: entry.name().to_string(),
        }
        .into());
    }

    let relative = entry
        .enclosed_name()
        .map(Path::to_path_buf)
        .with_context(|| format!("Unsafe path in archive: {}", entry.name()))?;
    let outpath = match target_dir {
        Some(dir) => dir.join(&relative),
        None => relative,
    };

    if let Some(parent) = outpath.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    log.emit(format_args!("write \"{}\"", outpath.display()));
    let mut outfile = fs::File::create(&outpath)
        .with_context(|| format!("Failed to create extracted file: {}", outpath.display()))?;
    std::io::copy(&mut entry, &mut outfile)
        .with_context(|| format!("Failed to extract file: {}", outpath.display()))?;

    Ok(outpath)
}
