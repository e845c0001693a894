//! Compact header index over large PGN collections.
//!
//! Each [`Entry`] keeps the Event, Site, Date, Round, White, Black, Result
//! and Variant tags of one game together with the byte offset and line
//! number where its move text starts, so a multi-gigabyte file can be
//! browsed, filtered and cached without keeping any move text in memory.

pub mod codec;
mod error;
pub mod filter;
mod log;
pub mod reader;
mod result;
pub mod stream;
mod types;
mod visitor;

pub use error::{Error, ErrorAccumulator, Result};
pub use filter::{GameFilter, Substring, WildcardPattern};
pub use reader::{
    CompressionMode, Entries, IndexOptions, IndexSummary, IndexedFile, PgnIndex, index_file,
    index_paths, read_movetext,
};
pub use result::GameResult;
pub use stream::{PgnStream, TagPair};
pub use types::{Entry, MAX_TAG_LEN, TagBuffer, TagType};
pub use visitor::ReadOutcome;
