use crate::error::{Error, Result};
use crate::stream::PgnStream;
use crate::types::{Entry, TagBuffer, TagType};
use std::io::BufRead;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    GameReady,
    /// Input ended before another tag block was found.
    Exhausted,
}

/// Collects the known tags of one header block into fixed slots, so the
/// order tags appear in the source does not matter.
#[derive(Default)]
struct HeaderFields {
    tags: TagBuffer,
}

impl HeaderFields {
    /// First non-empty value of a repeated tag wins.
    fn set_known_tag(&mut self, key: &[u8], value: &str) {
        let Some(tag) = TagType::from_name(key) else {
            return;
        };
        if !self.tags.get(tag).is_empty() || value.is_empty() {
            return;
        }
        self.tags.set(tag, value);
    }
}

impl Entry {
    /// Reads the next game header from `stream` into this entry.
    ///
    /// Any move text left from the previous game is skipped first. The
    /// header ends at the first non-tag token or blank line. On success the
    /// entry's position is the first byte of the game's move text, or of
    /// whatever follows the header when it has none. On error the entry is left
    /// cleared; after a malformed tag the rest of the broken header is
    /// skipped so the next call resumes at the following game.
    pub fn read_pgn<R: BufRead>(&mut self, stream: &mut PgnStream<R>) -> Result<ReadOutcome> {
        self.clear();
        match self.read_header(stream) {
            Ok(outcome) => Ok(outcome),
            Err(err @ Error::MalformedTag { .. }) => {
                self.clear();
                stream.skip_tag_block()?;
                Err(err)
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Convenience wrapper around [`Entry::read_pgn`].
    pub fn from_pgn<R: BufRead>(stream: &mut PgnStream<R>) -> Result<Option<Entry>> {
        let mut entry = Entry::new();
        match entry.read_pgn(stream)? {
            ReadOutcome::GameReady => Ok(Some(entry)),
            ReadOutcome::Exhausted => Ok(None),
        }
    }

    fn read_header<R: BufRead>(&mut self, stream: &mut PgnStream<R>) -> Result<ReadOutcome> {
        if !stream.skip_game()? {
            return Ok(ReadOutcome::Exhausted);
        }

        self.pos = stream.pos();
        self.line_number = stream.line_number();

        let mut headers = HeaderFields::default();
        while let Some(pair) = stream.next_tag()? {
            headers.set_known_tag(pair.name.as_bytes(), &pair.value);
        }

        self.pos = stream.pos();
        self.line_number = stream.line_number();
        self.tags = headers.tags;
        Ok(ReadOutcome::GameReady)
    }
}
