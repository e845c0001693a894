use crate::error::{Error, Result};
use std::io::{self, BufRead};

/// One `[Name "Value"]` pair with escapes resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPair {
    pub name: String,
    pub value: String,
}

/// Byte-level PGN reader that tracks the byte offset and 1-based line
/// number of the next unread byte.
///
/// Reads one byte at a time through `fill_buf`/`consume`, so the inner
/// reader should already be buffered.
pub struct PgnStream<R> {
    reader: R,
    pos: u64,
    line_number: u64,
    at_line_start: bool,
}

impl<R: BufRead> PgnStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_position(reader, 0, 1)
    }

    /// Wraps a reader that has already been positioned at `pos`, for
    /// example after seeking to an indexed game.
    pub fn with_position(reader: R, pos: u64, line_number: u64) -> Self {
        Self {
            reader,
            pos,
            line_number: line_number.max(1),
            at_line_start: true,
        }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    pub fn is_at_end(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Reads the next tag pair of the current header block.
    ///
    /// Returns `None` once the block ends: the next token is not a `[`
    /// (move text or end of input), or a blank line comes before it. The
    /// stream is left positioned on that token.
    pub fn next_tag(&mut self) -> Result<Option<TagPair>> {
        let crossed_blank_line = self.skip_whitespace()?;
        if crossed_blank_line || self.peek()? != Some(b'[') {
            return Ok(None);
        }
        self.bump()?;
        let line = self.line_number;
        let malformed = |reason| Error::MalformedTag { line, reason };

        self.skip_inline_space()?;
        let mut name = Vec::new();
        while let Some(b) = self.peek()?
            && is_symbol_byte(b)
        {
            name.push(b);
            self.bump()?;
        }
        if name.is_empty() {
            return Err(malformed("missing tag name"));
        }

        self.skip_inline_space()?;
        match self.bump()? {
            Some(b'"') => {}
            None => return Err(malformed("truncated tag")),
            Some(_) => return Err(malformed("expected quoted tag value")),
        }

        let mut value = Vec::new();
        loop {
            match self.bump()? {
                None | Some(b'\n') => return Err(malformed("unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => match self.bump()? {
                    None | Some(b'\n') => return Err(malformed("unterminated string")),
                    Some(escaped @ (b'\\' | b'"')) => value.push(escaped),
                    Some(other) => value.extend_from_slice(&[b'\\', other]),
                },
                Some(b) => value.push(b),
            }
        }

        self.skip_inline_space()?;
        match self.bump()? {
            Some(b']') => {}
            None => return Err(malformed("truncated bracket")),
            Some(_) => return Err(malformed("missing closing bracket")),
        }

        Ok(Some(TagPair {
            name: String::from_utf8_lossy(&name).into_owned(),
            value: String::from_utf8_lossy(&value).into_owned(),
        }))
    }

    /// Skips move text up to the next game's tag block.
    ///
    /// Returns `true` when positioned on a line-leading `[` and `false` at
    /// end of input. Brackets inside `{}` or `;` comments are not game starts.
    pub fn skip_game(&mut self) -> Result<bool> {
        Ok(self.scan_movetext(None)?)
    }

    /// Skips the rest of a header block: the current line, then every line
    /// that starts with `[` up to the first blank line. Used to recover from
    /// a malformed tag.
    pub fn skip_tag_block(&mut self) -> Result<()> {
        if !self.at_line_start {
            self.skip_line(None)?;
        }
        loop {
            let crossed_blank_line = self.skip_whitespace()?;
            if crossed_blank_line || self.peek()? != Some(b'[') {
                return Ok(());
            }
            self.skip_line(None)?;
        }
    }

    /// Reads the move text from the current position up to the next game,
    /// with surrounding whitespace trimmed. `%` escape lines are dropped.
    pub fn read_movetext(&mut self) -> Result<String> {
        let mut movetext = Vec::new();
        self.scan_movetext(Some(&mut movetext))?;
        Ok(String::from_utf8_lossy(&movetext).trim().to_string())
    }

    fn scan_movetext(&mut self, mut out: Option<&mut Vec<u8>>) -> io::Result<bool> {
        if self.pos == 0 {
            self.skip_bom()?;
        }
        let mut in_comment = false;
        loop {
            let Some(b) = self.peek()? else {
                return Ok(false);
            };

            if !in_comment && self.at_line_start {
                if b == b'[' {
                    return Ok(true);
                }
                if b == b'%' {
                    self.skip_line(None)?;
                    continue;
                }
            }

            self.bump()?;
            if let Some(out) = out.as_deref_mut() {
                out.push(b);
            }

            match b {
                b'{' if !in_comment => in_comment = true,
                b'}' if in_comment => in_comment = false,
                b';' if !in_comment => self.skip_line(out.as_deref_mut())?,
                _ => {}
            }
        }
    }

    fn skip_bom(&mut self) -> io::Result<()> {
        const BOM: &[u8] = b"\xEF\xBB\xBF";
        if self.reader.fill_buf()?.starts_with(BOM) {
            self.reader.consume(BOM.len());
            self.pos += BOM.len() as u64;
        }
        Ok(())
    }

    /// Returns whether a line holding only whitespace was consumed.
    fn skip_whitespace(&mut self) -> io::Result<bool> {
        let mut crossed_blank_line = false;
        while let Some(b) = self.peek()? {
            if b == b'%' && self.at_line_start {
                self.skip_line(None)?;
            } else if b.is_ascii_whitespace() {
                crossed_blank_line |= b == b'\n' && self.at_line_start;
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(crossed_blank_line)
    }

    fn skip_inline_space(&mut self) -> io::Result<()> {
        while let Some(b' ' | b'\t') = self.peek()? {
            self.bump()?;
        }
        Ok(())
    }

    /// Consumes through the end of the current line, newline included.
    fn skip_line(&mut self, mut out: Option<&mut Vec<u8>>) -> io::Result<()> {
        while let Some(b) = self.bump()? {
            if let Some(out) = out.as_deref_mut() {
                out.push(b);
            }
            if b == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn bump(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek()?;
        if let Some(b) = byte {
            self.reader.consume(1);
            self.pos += 1;
            match b {
                b'\n' => {
                    self.line_number += 1;
                    self.at_line_start = true;
                }
                b' ' | b'\t' | b'\r' => {}
                _ => self.at_line_start = false,
            }
        }
        Ok(byte)
    }
}

fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'#' | b'=' | b':' | b'-')
}
