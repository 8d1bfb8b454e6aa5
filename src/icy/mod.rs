//! ICY (Icecast/SHOUTcast) in-band metadata
//!
//! A client that sends `Icy-MetaData: 1` receives the audio interleaved with
//! short text blocks:
//!
//! ```text
//! [metaint bytes of audio][1 byte length code][code * 16 bytes of text]...
//! ```
//!
//! The interval is advertised by the `icy-metaint` response header. The text
//! follows a `KEY='VALUE';` convention; only `StreamTitle` is consumed here.
//!
//! This module is pure: no I/O, no state.
//! - `frame`: header parsing and block geometry inside a byte buffer
//! - `title`: Latin-1 decoding, StreamTitle extraction, artist/title split

pub mod frame;
pub mod title;

pub use frame::{
    block_bytes, locate_block, parse_metaint, BlockGeometry, FrameError, MAX_METADATA_BLOCK_LEN,
    METADATA_BLOCK_UNIT,
};
pub use title::{decode_latin1, decode_stream_title, split_artist_title, DecodedTitle};
