//! Integration tests module
//!
//! End-to-end tests for the import engine over in-memory repositories and
//! a mock job board.

pub mod fixtures;
pub mod import_test;
pub mod publishing_test;
pub mod sync_test;
