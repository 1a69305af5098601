//! JSON-lines record files.

use std::io::{BufRead, BufReader, Lines, Write};
use std::marker::PhantomData;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs::File;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RecordStoreError;
use crate::location::FileLocation;

/// An append-only file holding one serialised record per line.
///
/// Entries are separated by a single `\n`; the file never starts or ends with
/// a blank line.
#[derive(Debug)]
pub struct RecordFile {
    location: FileLocation,
}

impl RecordFile {
    /// Bind to the record file at `path`.
    ///
    /// The file itself does not need to exist yet, but its parent directory
    /// does.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidPath`] when `path` has no file name
    /// and [`RecordStoreError::Io`] when the parent directory cannot be opened.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, RecordStoreError> {
        Ok(Self {
            location: FileLocation::open(path.as_ref())?,
        })
    }

    /// Path the file was opened with.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.location.path()
    }

    /// Whether the file is present on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.location.exists()
    }

    /// Delete the file, returning whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Io`] when an existing file cannot be deleted.
    pub fn remove(&self) -> Result<bool, RecordStoreError> {
        self.location.remove()
    }

    /// Append `record` as a new line.
    ///
    /// A separator is written ahead of the record only when the file already
    /// holds content. Separator and payload go out in one write so concurrent
    /// appenders sharing a lock never produce partial lines.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Serialize`] when the record cannot be encoded
    /// and [`RecordStoreError::Io`] when the write fails.
    pub fn append<T>(&self, record: &T) -> Result<(), RecordStoreError>
    where
        T: Serialize + ?Sized,
    {
        let payload =
            serde_json::to_string(record).map_err(|error| RecordStoreError::Serialize {
                path: self.path().to_path_buf(),
                message: error.to_string(),
            })?;

        let mut file = self.location.open_append()?;
        let has_content = file
            .metadata()
            .map_err(|error| RecordStoreError::io(self.path(), &error))?
            .len()
            > 0;

        let mut entry = String::with_capacity(payload.len() + 1);
        if has_content {
            entry.push('\n');
        }
        entry.push_str(&payload);

        file.write_all(entry.as_bytes())
            .map_err(|error| RecordStoreError::io(self.path(), &error))
    }

    /// Open the file for a fresh pass over its records.
    ///
    /// Records are decoded lazily, one line at a time. Whitespace-only lines
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Io`] when the file cannot be opened.
    pub fn read_all<T>(&self) -> Result<RecordLines<T>, RecordStoreError>
    where
        T: DeserializeOwned,
    {
        let file = self.location.open_read()?;
        Ok(RecordLines {
            lines: BufReader::new(file).lines(),
            path: self.path().to_path_buf(),
            line: 0,
            _record: PhantomData,
        })
    }
}

/// Lazy iterator over the records of a [`RecordFile`].
///
/// A line that cannot be decoded yields [`RecordStoreError::Parse`]; callers
/// should treat the whole file as corrupt at that point.
#[derive(Debug)]
pub struct RecordLines<T> {
    lines: Lines<BufReader<File>>,
    path: Utf8PathBuf,
    line: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Iterator for RecordLines<T>
where
    T: DeserializeOwned,
{
    type Item = Result<T, RecordStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;

            let text = match raw {
                Ok(text) => text,
                Err(error) => return Some(Err(RecordStoreError::io(&self.path, &error))),
            };
            if text.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(&text).map_err(|error| RecordStoreError::Parse {
                    path: self.path.clone(),
                    line: self.line,
                    message: error.to_string(),
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for record framing and parse failures.
    #![expect(
        clippy::expect_used,
        reason = "test code uses expect for clear failure messages"
    )]

    use std::fs;

    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    struct Scratch {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("records")).expect("utf-8 path");
        Scratch { _dir: dir, path }
    }

    #[rstest]
    fn first_append_writes_no_separator(scratch: Scratch) {
        let file = RecordFile::open(&scratch.path).expect("open");
        file.append(&json!({"name": "g1"})).expect("append");

        let raw = fs::read_to_string(&scratch.path).expect("read raw");
        assert_eq!(raw, r#"{"name":"g1"}"#);
    }

    #[rstest]
    fn later_appends_are_newline_separated_without_trailing_blank(scratch: Scratch) {
        let file = RecordFile::open(&scratch.path).expect("open");
        file.append(&json!({"name": "g1"})).expect("append first");
        file.append(&json!({"name": "g2"})).expect("append second");

        let raw = fs::read_to_string(&scratch.path).expect("read raw");
        assert_eq!(raw, "{\"name\":\"g1\"}\n{\"name\":\"g2\"}");
    }

    #[rstest]
    fn append_to_empty_existing_file_writes_no_separator(scratch: Scratch) {
        fs::write(&scratch.path, "").expect("create empty file");
        let file = RecordFile::open(&scratch.path).expect("open");
        file.append(&json!({"name": "g1"})).expect("append");

        let raw = fs::read_to_string(&scratch.path).expect("read raw");
        assert!(!raw.starts_with('\n'));
    }

    #[rstest]
    fn malformed_line_reports_its_line_number(scratch: Scratch) {
        fs::write(&scratch.path, "{\"name\":\"g1\"}\nnot json\n{\"name\":\"g3\"}")
            .expect("write fixture");
        let file = RecordFile::open(&scratch.path).expect("open");

        let result = file
            .read_all::<Value>()
            .expect("open for reading")
            .collect::<Result<Vec<_>, _>>();

        let error = result.expect_err("second line should fail");
        assert!(
            matches!(error, RecordStoreError::Parse { line: 2, .. }),
            "unexpected error: {error:?}"
        );
    }

    #[rstest]
    fn blank_lines_are_ignored(scratch: Scratch) {
        fs::write(&scratch.path, "{\"name\":\"g1\"}\n\n   \n{\"name\":\"g2\"}\n")
            .expect("write fixture");
        let file = RecordFile::open(&scratch.path).expect("open");

        let records = file
            .read_all::<Value>()
            .expect("open for reading")
            .collect::<Result<Vec<_>, _>>()
            .expect("records parse");

        assert_eq!(records, vec![json!({"name": "g1"}), json!({"name": "g2"})]);
    }

    #[rstest]
    fn reading_a_missing_file_is_an_io_error(scratch: Scratch) {
        let file = RecordFile::open(&scratch.path).expect("open");
        let error = file.read_all::<Value>().expect_err("missing file");
        assert!(matches!(error, RecordStoreError::Io { .. }));
    }

    #[rstest]
    fn remove_reports_whether_a_file_was_deleted(scratch: Scratch) {
        let file = RecordFile::open(&scratch.path).expect("open");
        assert!(!file.remove().expect("remove absent"));

        file.append(&json!({"name": "g1"})).expect("append");
        assert!(file.exists());
        assert!(file.remove().expect("remove present"));
        assert!(!file.exists());
    }

    #[test]
    fn rejects_paths_without_a_file_name() {
        let error = RecordFile::open("..").expect_err("no file name");
        assert!(matches!(error, RecordStoreError::InvalidPath { .. }));
    }
}
