//! Integration test crate for the Constellation accounting core.
//!
//! This crate has no library code. It only contains integration tests that
//! drive [`constel_protocol::host::Protocol`] through end-to-end flows
//! spanning the vault, distributor, oracle, streamer and auth crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p constel-integration-tests
//! ```
