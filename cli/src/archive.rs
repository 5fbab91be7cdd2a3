//! App packaging — builds the `upload.zip` artifact.
//!
//! Every regular file under the app root is added with its root-relative
//! path; directories themselves are not entries. Re-running overwrites the
//! same destination, so a failed pack is retried by re-invoking. Partial
//! archives are left on disk.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Conventional archive name inside the app root.
pub const ARCHIVE_NAME: &str = "upload.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot create archive {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Package `root` into `{root}/upload.zip` and return the archive path.
///
/// # Errors
///
/// Returns [`ArchiveError`] if any source file cannot be opened or the
/// destination cannot be written.
pub fn pack(root: &Path) -> Result<PathBuf, ArchiveError> {
    let dest = root.join(ARCHIVE_NAME);
    let file = File::create(&dest).map_err(|source| ArchiveError::Create {
        path: dest.clone(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_dir(&mut zip, root, root, &dest, options)?;

    zip.finish().map_err(|source| ArchiveError::Entry {
        name: ARCHIVE_NAME.to_string(),
        source,
    })?;
    Ok(dest)
}

fn add_dir(
    zip: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    dest: &Path,
    options: SimpleFileOptions,
) -> Result<(), ArchiveError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ArchiveError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ArchiveError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        // The archive under construction lives inside the tree being walked.
        if path == dest {
            continue;
        }
        let file_type = entry.file_type().map_err(|source| ArchiveError::Read {
            path: path.clone(),
            source,
        })?;
        if file_type.is_dir() {
            add_dir(zip, root, &path, dest, options)?;
        } else if file_type.is_file() {
            add_file(zip, root, &path, options)?;
        }
    }
    Ok(())
}

fn add_file(
    zip: &mut ZipWriter<File>,
    root: &Path,
    path: &Path,
    options: SimpleFileOptions,
) -> Result<(), ArchiveError> {
    let name = entry_name(root, path);
    zip.start_file(name.clone(), options)
        .map_err(|source| ArchiveError::Entry {
            name: name.clone(),
            source,
        })?;

    let mut file = File::open(path).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|source| ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        zip.write_all(&buf[..n])
            .map_err(|source| ArchiveError::Entry {
                name: name.clone(),
                source: source.into(),
            })?;
    }
    Ok(())
}

/// Root-relative entry name with `/` separators regardless of platform.
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
