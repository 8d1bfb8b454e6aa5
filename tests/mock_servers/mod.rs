//! Mock servers for integration testing
//!
//! Simulate an upstream Icecast/SHOUTcast source so the fetcher and the HTTP
//! API can be exercised end to end without a real radio stream.

#![allow(dead_code)]

pub mod icecast;

pub use icecast::{MockIcecastServer, MockStream, RecordedRequest};
