//! kvnotes HTTP server.
//!
//! Serves the HTML pages (directory, editor, login, admin) and the JSON API
//! for note create/update/delete, gated behind a single shared password
//! with session-cookie authentication. All state lives in the
//! [`kvnotes_core::KvStore`] backend; request handlers are stateless.

pub mod pages;
pub mod routes;
