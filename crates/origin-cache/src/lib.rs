//! Disk cache.
//!
//! Takes a designated directory and uses it as a key-value store: items are
//! stored under and retrieved from deterministic filenames at runtime. The
//! cache is designed for code that performs expensive operations whose
//! results can be persisted for later execution — compiled templates in
//! particular.
//!
//! Writers take an exclusive, non-blocking lock on the target file; a
//! writer that cannot get the lock skips its write and reports as much,
//! leaving the caller to treat the situation as a transient cache miss.
//! Content lands via a temp file in the cache directory followed by an
//! atomic rename, so a concurrent reader observes either the old entry or
//! the new one, never a torn write.

use std::fs;
use std::fs::File;
use std::fs::TryLockError;
use std::io::Write;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures accessing the cache directory or its files.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write to directory \"{path}\"")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to file \"{path}\"")]
    WriteFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A key-value store backed by a directory of files.
pub struct Disk {
    directory: Utf8PathBuf,
    file_extension: Option<String>,
    directory_mode: u32,
    file_mode: u32,
}

impl Disk {
    pub const DEFAULT_DIRECTORY_MODE: u32 = 0o750;
    pub const DEFAULT_FILE_MODE: u32 = 0o640;

    /// A cache rooted at `directory`, with the default directory and file
    /// modes. `file_extension` (without the dot) is appended to every
    /// generated filename.
    #[must_use]
    pub fn new(directory: impl Into<Utf8PathBuf>, file_extension: Option<&str>) -> Self {
        Self::with_modes(
            directory,
            file_extension,
            Self::DEFAULT_DIRECTORY_MODE,
            Self::DEFAULT_FILE_MODE,
        )
    }

    /// A cache with explicit (octal) modes for the directories and files it
    /// creates.
    #[must_use]
    pub fn with_modes(
        directory: impl Into<Utf8PathBuf>,
        file_extension: Option<&str>,
        directory_mode: u32,
        file_mode: u32,
    ) -> Self {
        Disk {
            directory: directory.into(),
            file_extension: file_extension.map(ToString::to_string),
            directory_mode,
            file_mode,
        }
    }

    /// The root directory for this cache instance.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// The mode for directories created within the cache directory.
    #[must_use]
    pub fn directory_mode(&self) -> u32 {
        self.directory_mode
    }

    /// The mode for files created within the cache directory.
    #[must_use]
    pub fn file_mode(&self) -> u32 {
        self.file_mode
    }

    /// The configured file extension. With `include_dot`, the separator is
    /// included unless the extension is absent.
    #[must_use]
    pub fn file_extension(&self, include_dot: bool) -> String {
        match &self.file_extension {
            Some(extension) if include_dot => format!(".{extension}"),
            Some(extension) => extension.clone(),
            None => String::new(),
        }
    }

    /// The filename an index maps to: `{root}/{index}{.ext}`. Indexes may
    /// contain `/` to nest entries under the cache root.
    #[must_use]
    pub fn filename(&self, index: &str) -> Utf8PathBuf {
        self.directory
            .join(format!("{index}{}", self.file_extension(true)))
    }

    /// Store `contents` under `index`.
    ///
    /// Parent directories are created as needed. Returns `Ok(false)` when
    /// another writer holds the lock on the entry — nothing was written,
    /// and the caller should fall back as if the entry were missing.
    pub fn put(&self, index: &str, contents: &str) -> Result<bool, CacheError> {
        let filename = self.filename(index);
        let directory = filename.parent().unwrap_or(&self.directory).to_owned();
        self.create_directory_if_missing(&directory)?;

        let write_error = |source| CacheError::WriteFile {
            path: filename.clone(),
            source,
        };

        // The lock lives on the target file and serializes writers; the
        // content itself arrives by atomic rename so readers never see a
        // partial entry.
        let target = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(filename.as_std_path())
            .map_err(write_error)?;

        match target.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("cache entry '{index}' is locked by another writer; skipping");
                return Ok(false);
            }
            Err(TryLockError::Error(source)) => return Err(write_error(source)),
        }

        let mut staged = tempfile::NamedTempFile::new_in(directory.as_std_path())
            .map_err(write_error)?;
        staged
            .write_all(contents.as_bytes())
            .map_err(write_error)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            staged
                .as_file()
                .set_permissions(fs::Permissions::from_mode(self.file_mode))
                .map_err(write_error)?;
        }
        staged
            .persist(filename.as_std_path())
            .map_err(|error| write_error(error.error))?;

        tracing::debug!("wrote cache entry '{index}'");
        Ok(true)
    }

    fn create_directory_if_missing(&self, directory: &Utf8Path) -> Result<(), CacheError> {
        if directory.is_dir() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;

            builder.mode(self.directory_mode);
        }
        builder
            .create(directory.as_std_path())
            .map_err(|source| CacheError::CreateDirectory {
                path: directory.to_owned(),
                source,
            })
    }
}
