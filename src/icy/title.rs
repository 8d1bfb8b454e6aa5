//! StreamTitle decoding
//!
//! Metadata text is treated as Latin-1: every byte maps to the code point of
//! the same value. Blocks are not reliably UTF-8, and a UTF-8 decode can
//! mangle a title that was cut at a 16-byte boundary.

use std::sync::LazyLock;

use regex::Regex;

/// Separator between artist and title in "Artist - Title" announcements
const ARTIST_SEPARATOR: &str = " - ";

#[allow(clippy::expect_used)] // Constant pattern, covered by tests
static STREAM_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"StreamTitle='([^']+)'").expect("valid StreamTitle pattern"));

/// StreamTitle value split into artist and title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTitle {
    /// Raw value between the quotes
    pub full_title: String,
    pub artist: String,
    pub title: String,
}

/// Decode bytes one-to-one into chars, dropping NUL padding
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Extract and split the StreamTitle field of a raw metadata block.
///
/// Returns `None` when the field is missing or its value is empty.
pub fn decode_stream_title(block: &[u8]) -> Option<DecodedTitle> {
    let text = decode_latin1(block);
    let value = STREAM_TITLE_RE.captures(&text)?.get(1)?.as_str();
    Some(split_artist_title(value))
}

/// Split "Artist - Title" on the first separator only.
///
/// Without a separator the whole value is the title and the artist is empty.
pub fn split_artist_title(full_title: &str) -> DecodedTitle {
    let (artist, title) = match full_title.split_once(ARTIST_SEPARATOR) {
        Some((artist, title)) => (artist.trim(), title.trim()),
        None => ("", full_title.trim()),
    };

    DecodedTitle {
        full_title: full_title.to_string(),
        artist: artist.to_string(),
        title: title.to_string(),
    }
}
