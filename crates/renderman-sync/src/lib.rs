//! Renderman Sync
//!
//! Brings a render result and the output tree together:
//!
//! - [`DiffEngine`] compares rendered units with the files on disk
//! - [`apply`] writes rendered units, skipping files that are already current
//!
//! Both share the stale-file scan: manifest files inside the render scope
//! that no selected unit produces anymore.

pub mod diff;
pub mod error;
pub mod scan;
pub mod writer;

pub use diff::{
    ChangeType, DiffContent, DiffEngine, DiffLine, DiffReport, DiffStatus, DocumentChange,
    FileDiff, LineType, UnreadableFile,
};
pub use error::{Result, SyncError};
pub use scan::{SkippedUnit, skipped_units, stale_paths};
pub use writer::{WriteAction, WriteFailure, WriteReport, WrittenFile, apply};
