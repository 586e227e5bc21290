//! STAKEPLAN: two-book stake allocation and betting-journey tracking.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod allocator;
pub mod journey;
pub mod storage;
pub mod api;
