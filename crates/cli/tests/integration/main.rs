//! CLI integration tests.

mod builds_tests;
mod common;
mod document_tests;
mod preview_tests;
