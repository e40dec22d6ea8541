//! Library of imported `.swf` files.
//!
//! Files are copied from wherever the user picked them into a private
//! directory. Only the copy is ever served, so the original can disappear
//! afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Only files with this extension (case-insensitive) are accepted.
pub const ALLOWED_EXTENSION: &str = "swf";

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Failed to create library directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read library directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Temporary permission to read a file outside the library directory.
///
/// `start_accessing` returns whether access was granted. Every granted
/// access is paired with exactly one `stop_accessing`.
pub trait ScopedAccess {
    fn start_accessing(&self, source: &Path) -> bool;
    fn stop_accessing(&self, source: &Path);
}

/// Grants access to any readable regular file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemAccess;

impl ScopedAccess for FilesystemAccess {
    fn start_accessing(&self, source: &Path) -> bool {
        fs::metadata(source).is_ok_and(|m| m.is_file())
    }

    fn stop_accessing(&self, source: &Path) {
        debug!("Released access to {}", source.display());
    }
}

/// Releases the grant when dropped, whatever happened in between.
struct AccessGuard<'a> {
    access: &'a dyn ScopedAccess,
    source: &'a Path,
}

impl<'a> AccessGuard<'a> {
    fn acquire(access: &'a dyn ScopedAccess, source: &'a Path) -> Option<Self> {
        access
            .start_accessing(source)
            .then_some(Self { access, source })
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.access.stop_accessing(self.source);
    }
}

/// A file previously copied into the library.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImportedFile {
    path: PathBuf,
}

impl ImportedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, e.g. `game.swf`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name without extension, used for tiles.
    pub fn display_name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotSwf,
    AlreadyExists,
    AccessDenied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(ImportedFile),
    Skipped(SkipReason),
}

#[derive(Clone, Debug)]
pub struct FileLibrary {
    dir: PathBuf,
}

impl FileLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` into the library.
    ///
    /// Wrong extension, duplicate names and denied access are skips, not
    /// errors. Only filesystem failures come back as `Err`.
    pub fn import(
        &self,
        source: &Path,
        access: &dyn ScopedAccess,
    ) -> Result<ImportOutcome, LibraryError> {
        if !has_allowed_extension(source) {
            info!("Non-SWF file, ignored: {}", source.display());
            return Ok(ImportOutcome::Skipped(SkipReason::NotSwf));
        }

        fs::create_dir_all(&self.dir).map_err(|source| LibraryError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let Some(file_name) = source.file_name() else {
            warn!("Import source has no file name: {}", source.display());
            return Ok(ImportOutcome::Skipped(SkipReason::NotSwf));
        };
        let destination = self.dir.join(file_name);

        if destination.exists() {
            info!("File already exists at destination: {}", destination.display());
            return Ok(ImportOutcome::Skipped(SkipReason::AlreadyExists));
        }

        let Some(_guard) = AccessGuard::acquire(access, source) else {
            warn!("Failed to access scoped resource: {}", source.display());
            return Ok(ImportOutcome::Skipped(SkipReason::AccessDenied));
        };

        fs::copy(source, &destination).map_err(|e| LibraryError::Copy {
            from: source.to_path_buf(),
            to: destination.clone(),
            source: e,
        })?;

        info!("Imported {} into library", destination.display());
        Ok(ImportOutcome::Imported(ImportedFile::new(destination)))
    }

    /// Imports each source independently; a failure never stops the rest.
    pub fn import_all<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a Path>,
        access: &dyn ScopedAccess,
    ) -> Vec<ImportedFile> {
        let mut imported = Vec::new();
        for source in sources {
            match self.import(source, access) {
                Ok(ImportOutcome::Imported(file)) => imported.push(file),
                Ok(ImportOutcome::Skipped(reason)) => {
                    debug!("Skipped {}: {:?}", source.display(), reason)
                }
                Err(e) => error!("Error importing file: {}", e),
            }
        }
        imported
    }

    /// All imported files sorted by case-insensitive name. Hidden files are skipped.
    pub fn list(&self) -> Result<Vec<ImportedFile>, LibraryError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Library directory {} does not exist yet", self.dir.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(LibraryError::ReadDir {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LibraryError::ReadDir {
                path: self.dir.clone(),
                source,
            })?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().is_ok_and(|t| t.is_file()) {
                files.push(ImportedFile::new(entry.path()));
            }
        }

        files.sort_by_key(|f| f.file_name().to_lowercase());
        Ok(files)
    }

    pub fn delete(&self, file: &ImportedFile) -> Result<(), LibraryError> {
        fs::remove_file(file.path()).map_err(|source| LibraryError::Delete {
            path: file.path().to_path_buf(),
            source,
        })?;
        info!("Deleted {}", file.path().display());
        Ok(())
    }

    /// Deletes every file in `files`; returns the ones that are actually gone.
    pub fn delete_all(&self, files: &HashSet<ImportedFile>) -> Vec<ImportedFile> {
        let mut deleted = Vec::new();
        for file in files {
            match self.delete(file) {
                Ok(()) => deleted.push(file.clone()),
                Err(e) => error!("Failed to delete file: {}", e),
            }
        }
        deleted
    }
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}
