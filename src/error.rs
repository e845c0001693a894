use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading PGN text, decoding index records or
/// compiling filters.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open file '{}': {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Bracket or quote syntax violation inside a tag block.
    #[error("Malformed tag at line {line}: {reason}")]
    MalformedTag { line: u64, reason: &'static str },

    /// Truncated or inconsistent binary index data.
    #[error("Corrupt index record: {0}")]
    CorruptRecord(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid compression value '{0}'. Supported values: 'zstd' or omitted.")]
    InvalidCompression(String),

    #[error("Invalid path pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptRecord(msg.into())
    }

    /// Maps a short read on a fully-buffered record to a decode failure.
    pub(crate) fn from_record_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt("unexpected end of data")
        } else {
            Self::Io(err)
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorAccumulator};
    use std::io;

    #[test]
    fn test_push_multiple_messages_uses_separator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("first");
        accumulator.push("second");

        assert_eq!(accumulator.take().as_deref(), Some("first; second"));
    }

    #[test]
    fn test_take_consumes_accumulator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("error");

        assert_eq!(accumulator.take().as_deref(), Some("error"));
        assert!(accumulator.is_empty());
        assert!(accumulator.take().is_none());
    }

    #[test]
    fn test_short_read_maps_to_corrupt_record() {
        let err = Error::from_record_io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, Error::CorruptRecord(_)));

        let err = Error::from_record_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_malformed_tag_message_names_line() {
        let err = Error::MalformedTag {
            line: 7,
            reason: "unterminated string",
        };
        assert_eq!(err.to_string(), "Malformed tag at line 7: unterminated string");
    }
}
