//! Capability-scoped file locations shared by record and log files.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::{Dir, File, OpenOptions};

use crate::error::RecordStoreError;

/// A file name bound to a handle on its parent directory.
#[derive(Debug)]
pub(crate) struct FileLocation {
    dir: Dir,
    file_name: String,
    path: Utf8PathBuf,
}

impl FileLocation {
    pub(crate) fn open(path: &Utf8Path) -> Result<Self, RecordStoreError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| RecordStoreError::InvalidPath {
                path: path.to_path_buf(),
            })?
            .to_owned();
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|error| RecordStoreError::io(path, &error))?;

        Ok(Self {
            dir,
            file_name,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub(crate) fn exists(&self) -> bool {
        self.dir.exists(&self.file_name)
    }

    pub(crate) fn remove(&self) -> Result<bool, RecordStoreError> {
        match self.dir.remove_file(&self.file_name) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(RecordStoreError::io(&self.path, &error)),
        }
    }

    pub(crate) fn open_append(&self) -> Result<File, RecordStoreError> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        self.dir
            .open_with(&self.file_name, &options)
            .map_err(|error| RecordStoreError::io(&self.path, &error))
    }

    pub(crate) fn open_read(&self) -> Result<File, RecordStoreError> {
        self.dir
            .open(&self.file_name)
            .map_err(|error| RecordStoreError::io(&self.path, &error))
    }
}
