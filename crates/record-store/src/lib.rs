//! Append-only line files backing the usermigrate caches and import logs.
//!
//! Two file shapes are supported:
//!
//! - [`RecordFile`]: one JSON document per line. Used for the discovery cache
//!   and the per-type retry caches, so a retry cache can be fed straight back
//!   in as an input file.
//! - [`LogFile`]: free-text lines. Used for the per-type import logs.
//!
//! Writes never rewrite existing content. Reads are lazy and restartable:
//! every call to [`RecordFile::read_all`] reopens the file.
//!
//! # Example
//!
//! ```
//! use camino::Utf8PathBuf;
//! use record_store::RecordFile;
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().expect("temp dir");
//! let path = Utf8PathBuf::from_path_buf(dir.path().join("user_cache")).expect("utf-8 path");
//! let file = RecordFile::open(&path).expect("open record file");
//!
//! file.append(&json!({"username": "a"})).expect("append first");
//! file.append(&json!({"username": "b"})).expect("append second");
//!
//! let records = file
//!     .read_all::<serde_json::Value>()
//!     .expect("open for reading")
//!     .collect::<Result<Vec<_>, _>>()
//!     .expect("records parse");
//! assert_eq!(records.len(), 2);
//! ```

mod error;
mod location;
mod log_file;
mod record_file;

pub use error::RecordStoreError;
pub use log_file::LogFile;
pub use record_file::{RecordFile, RecordLines};
