#![forbid(unsafe_code)]

pub mod json_bank;
pub mod repository;
pub mod snapshots;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, KeyValueStore, QuestionStore, Storage, StorageError, SubjectInfo,
};
pub use snapshots::{SnapshotLookup, SnapshotRepository};
