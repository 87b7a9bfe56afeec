//! kvnotes Core Library
//!
//! Shared functionality for the kvnotes web service:
//! - Key-value store abstraction (sqlite-backed and in-memory)
//! - Session lifecycle and validation
//! - Shared-password verification and rotation
//! - Notes index maintenance and note CRUD
//! - Common error types

pub mod credential;
pub mod error;
pub mod index;
pub mod keys;
pub mod kv;
pub mod note;
pub mod notes;
pub mod session;
pub mod tracing_init;

pub use credential::CredentialManager;
pub use error::{Error, Result};
pub use index::NotesIndex;
pub use kv::{KvError, KvStore, MemoryKv, SqliteKv};
pub use note::{IndexEntry, Note};
pub use notes::{NoteStore, SaveOutcome};
pub use session::SessionManager;
