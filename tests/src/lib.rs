//! Shared helpers for the end-to-end poll loop tests.

pub mod fixtures;
pub mod mocks;
