//! Storage abstractions for service layer
//!
//! Contains the reusable file-backed document store underneath the
//! domain stores that persist their state as JSON.

pub mod json_doc_store;
