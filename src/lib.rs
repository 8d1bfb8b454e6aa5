//! Radio Calico - ICY now-playing metadata proxy
//!
//! Connects to an Icecast/SHOUTcast stream, reads one in-band metadata block
//! per refresh and serves the current `{title, artist}` as JSON.
//!
//! This library provides:
//! - ICY frame and StreamTitle decoding (`icy`)
//! - A bounded upstream fetcher (`fetcher`)
//! - A time-bounded, single-flight metadata cache (`cache`)
//! - The `/metadata`, `/config` and `/status` HTTP API (`api`)

pub mod api;
pub mod cache;
pub mod config;
pub mod fetcher;
pub mod icy;
pub mod metadata;
pub mod service;
