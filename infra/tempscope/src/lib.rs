//! Scoped temporary storage.
//!
//! A [`TempScope`] owns one private directory for the lifetime of a value: it hands out
//! uniquely named paths and open handles inside that directory, optionally records what
//! it issued, and removes the whole tree when dropped. The [`adhoc`] helpers cover the
//! one-file case without any scope.
//!
//! # Core Features
//!
//! - **Private scope directory**: `<parent>/<prefix><tick>`, created eagerly; construction
//!   fails loudly if the directory cannot be made.
//! - **Unique names**: `<id><extension>` with a ~129-bit random id per call.
//! - **Optional registry**: issued paths are recorded in call order when tracking is on,
//!   by default or per call.
//! - **Self-cleaning handles**: streams delete their file on release unless kept.
//! - **Best-effort teardown**: [`TempScope::clear`] and `Drop` never fail because of a
//!   file that refuses to go away; they log and move on.
//! - **Stale scope sweep**: optionally removes leftovers of earlier runs with the same prefix.
//!
//! # Examples
//!
//! ```rust
//! use mhub_tempscope::{TempScope, TempScopeError};
//! use std::io::{Read, Seek, SeekFrom, Write};
//!
//! fn main() -> Result<(), TempScopeError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let mut scope = TempScope::builder()
//!         .parent(tmp.path())
//!         .prefix("worker_")
//!         .store_names(true)
//!         .create()?;
//!
//!     let mut scratch = scope.temp_file_stream_with(".bin")?;
//!     scratch.write_all(b"intermediate").unwrap();
//!     scratch.seek(SeekFrom::Start(0)).unwrap();
//!     let mut back = Vec::new();
//!     scratch.read_to_end(&mut back).unwrap();
//!     assert_eq!(back, b"intermediate");
//!
//!     assert_eq!(scope.issued_names().len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ```rust
//! let stream = mhub_tempscope::adhoc::create(false).unwrap();
//! let path = stream.path().to_path_buf();
//! drop(stream);
//! assert!(!path.exists());
//! ```

pub mod adhoc;
mod builder;
mod config;
mod error;
mod maintenance;
mod naming;
mod scope;
mod stream;

pub use crate::builder::TempScopeBuilder;
pub use crate::config::{ENV_PREFIX, ScopeConfig, load_config};
pub use crate::error::{Result, TempScopeError, TempScopeErrorExt};
pub use crate::naming::{
    DEFAULT_EXTENSION, UNIQUE_ID_LEN, naming_prefix, reset_naming_prefix, set_naming_prefix,
    unique_id,
};
pub use crate::scope::{FileRequest, TempScope};
pub use crate::stream::{TempFileStream, default_open};
