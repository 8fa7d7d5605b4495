// File: socialai-core/src/test_utils/mod.rs
//
// In-memory collaborators for unit and integration tests.

pub mod helpers;

pub use helpers::{FakeTransport, FixedClock, SentMessage};
