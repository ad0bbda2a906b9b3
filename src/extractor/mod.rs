//! Archive extraction into a destination directory.
//!
//! The archive format (tar+gzip vs. zip) is determined from the file name,
//! falling back to the leading magic bytes - never from a user flag. When
//! the archive wraps everything in a single enclosing top-level directory
//! (typical of source-release archives) that one level is stripped; an
//! archive with multiple top-level entries is extracted root-as-is.
//!
//! Failure modes are deliberately coarse:
//! - a zero-byte or entry-less archive is [`ScaffoldError::EmptyArchive`];
//! - a structurally invalid archive is [`ScaffoldError::CorruptArchive`];
//! - an unwritable destination is [`ScaffoldError::TargetNotWritable`];
//! - everything else collapses to [`ScaffoldError::ExtractionFailed`] with
//!   the underlying cause. Callers must not assume finer distinctions.
//!
//! [`extract`] also reports whether anything was actually written; the
//! pipeline promotes a silent `false` to `ExtractionFailed` because a
//! partial no-op is not an acceptable terminal state.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::core::ScaffoldError;

/// Archive container formats we can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    Zip,
}

/// Extract `archive_path` into `dest_dir`, creating it as needed.
///
/// Returns whether any entry was written.
///
/// # Errors
///
/// See the module documentation for the failure taxonomy.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<bool, ScaffoldError> {
    let metadata = std::fs::metadata(archive_path)
        .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
    if metadata.len() == 0 {
        return Err(ScaffoldError::EmptyArchive {
            path: archive_path.display().to_string(),
        });
    }

    let format = detect_format(archive_path)?;
    debug!(archive = %archive_path.display(), ?format, "extracting archive");

    std::fs::create_dir_all(dest_dir).map_err(|e| classify_io(&e, archive_path, dest_dir))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
    }
}

/// Decide the container format from the file name, then the magic bytes.
fn detect_format(archive_path: &Path) -> Result<ArchiveFormat, ScaffoldError> {
    let name = archive_path.to_string_lossy();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return Ok(ArchiveFormat::TarGz);
    }
    if name.ends_with(".zip") {
        return Ok(ArchiveFormat::Zip);
    }

    let mut magic = [0u8; 2];
    let mut file = std::fs::File::open(archive_path)?;
    file.read_exact(&mut magic)
        .map_err(|_| ScaffoldError::CorruptArchive {
            path: archive_path.display().to_string(),
        })?;
    match &magic {
        [0x1f, 0x8b] => Ok(ArchiveFormat::TarGz),
        b"PK" => Ok(ArchiveFormat::Zip),
        _ => Err(ScaffoldError::CorruptArchive {
            path: archive_path.display().to_string(),
        }),
    }
}

/// Map an IO error from the unpack path onto the error taxonomy.
fn classify_io(error: &std::io::Error, archive_path: &Path, dest_dir: &Path) -> ScaffoldError {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => ScaffoldError::TargetNotWritable {
            path: dest_dir.display().to_string(),
        },
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
            ScaffoldError::CorruptArchive {
                path: archive_path.display().to_string(),
            }
        }
        _ => ScaffoldError::ExtractionFailed {
            reason: error.to_string(),
        },
    }
}

/// Reject absolute paths and parent-directory references.
fn sanitize_entry_path(path: &Path) -> Result<(), ScaffoldError> {
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ScaffoldError::ExtractionFailed {
            reason: format!("refusing to extract unsafe entry path: {}", path.display()),
        });
    }
    Ok(())
}

/// Strip the shared root from an entry path, skipping the root entry itself.
///
/// Entry paths are normalized first so `./`-prefixed archives (produced by
/// `tar -C dir .`) strip consistently with [`common_root`]'s view of them.
fn strip_root(path: &Path, root: Option<&PathBuf>) -> Option<PathBuf> {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        return None;
    }
    match root {
        Some(prefix) => match normalized.strip_prefix(prefix) {
            Ok(p) if p.as_os_str().is_empty() => None,
            Ok(p) => Some(p.to_path_buf()),
            Err(_) => Some(normalized),
        },
        None => Some(normalized),
    }
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<bool, ScaffoldError> {
    let entry_paths = list_tar_entries(archive_path)?;
    if entry_paths.is_empty() {
        return Err(ScaffoldError::EmptyArchive {
            path: archive_path.display().to_string(),
        });
    }
    let root = common_root(&entry_paths);

    let file = std::fs::File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut wrote_anything = false;

    let entries = archive
        .entries()
        .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| classify_io(&e, archive_path, dest_dir))?;
        let entry_path = entry
            .path()
            .map_err(|e| ScaffoldError::ExtractionFailed { reason: e.to_string() })?
            .into_owned();
        sanitize_entry_path(&entry_path)?;

        let Some(relative) = strip_root(&entry_path, root.as_ref()) else {
            continue;
        };
        let output_path = dest_dir.join(relative);

        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            wrote_anything = true;
        } else {
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            }
            entry
                .unpack(&output_path)
                .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            wrote_anything = true;
        }
    }

    Ok(wrote_anything)
}

/// First pass over a tar.gz: collect entry paths for root detection.
fn list_tar_entries(archive_path: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut paths = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| classify_io(&e, archive_path, archive_path))?;
    for entry in entries {
        let entry = entry.map_err(|e| classify_io(&e, archive_path, archive_path))?;
        let path = entry
            .path()
            .map_err(|e| ScaffoldError::ExtractionFailed { reason: e.to_string() })?
            .into_owned();
        paths.push(path);
    }

    Ok(paths)
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<bool, ScaffoldError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|_| ScaffoldError::CorruptArchive {
            path: archive_path.display().to_string(),
        })?;

    if archive.is_empty() {
        return Err(ScaffoldError::EmptyArchive {
            path: archive_path.display().to_string(),
        });
    }

    let mut entry_paths = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|_| ScaffoldError::CorruptArchive {
            path: archive_path.display().to_string(),
        })?;
        let Some(path) = entry.enclosed_name() else {
            return Err(ScaffoldError::ExtractionFailed {
                reason: format!("unsafe entry path in archive: entry {i}"),
            });
        };
        entry_paths.push(path);
    }
    let root = common_root(&entry_paths);

    let mut wrote_anything = false;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|_| ScaffoldError::CorruptArchive {
            path: archive_path.display().to_string(),
        })?;
        // Presence validated in the first pass
        let entry_path = entry.enclosed_name().unwrap_or_default();

        let Some(relative) = strip_root(&entry_path, root.as_ref()) else {
            continue;
        };
        let output_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            wrote_anything = true;
        } else {
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            }
            let mut outfile = std::fs::File::create(&output_path)
                .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            std::io::copy(&mut entry, &mut outfile)
                .map_err(|e| classify_io(&e, archive_path, dest_dir))?;
            wrote_anything = true;
        }
    }

    Ok(wrote_anything)
}

/// Find the single enclosing root directory shared by all entries.
///
/// Returns `Some(root)` only when every entry lives under the same first
/// component *and* at least one entry is nested beneath it - a flat archive
/// whose only entry happens to be a file must not have that file "stripped".
fn common_root(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    let mut has_nested = false;

    for path in paths {
        // `./` prefixes (tar -C dir .) are invisible to stripping
        let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
        let Some(first) = components.next() else {
            continue;
        };
        if components.next().is_some() {
            has_nested = true;
        }

        let first = PathBuf::from(first.as_os_str());
        match &root {
            None => root = Some(first),
            Some(existing) if existing != &first => return None,
            Some(_) => {}
        }
    }

    if has_nested { root } else { None }
}
