use crate::result::GameResult;
use chrono::NaiveDate;

/// Longest value, in bytes, a tag slot keeps.
pub const MAX_TAG_LEN: usize = u8::MAX as usize;

/// The eight tags an index entry keeps, in canonical slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagType {
    Event = 0,
    Site = 1,
    Date = 2,
    Round = 3,
    White = 4,
    Black = 5,
    Result = 6,
    Variant = 7,
}

impl TagType {
    pub const COUNT: usize = 8;

    pub const ALL: [TagType; Self::COUNT] = [
        Self::Event,
        Self::Site,
        Self::Date,
        Self::Round,
        Self::White,
        Self::Black,
        Self::Result,
        Self::Variant,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Site => "Site",
            Self::Date => "Date",
            Self::Round => "Round",
            Self::White => "White",
            Self::Black => "Black",
            Self::Result => "Result",
            Self::Variant => "Variant",
        }
    }

    /// Exact, case-sensitive lookup of a PGN tag name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"Event" => Self::Event,
            b"Site" => Self::Site,
            b"Date" => Self::Date,
            b"Round" => Self::Round,
            b"White" => Self::White,
            b"Black" => Self::Black,
            b"Result" => Self::Result,
            b"Variant" => Self::Variant,
            _ => return None,
        })
    }
}

/// Fixed-order tag slots of one entry. A missing tag is an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TagBuffer {
    slots: [String; TagType::COUNT],
}

impl TagBuffer {
    pub fn get(&self, tag: TagType) -> &str {
        &self.slots[tag.index()]
    }

    /// Stores `value`, truncated to [`MAX_TAG_LEN`] bytes on a char boundary.
    pub fn set(&mut self, tag: TagType, value: &str) {
        let slot = &mut self.slots[tag.index()];
        slot.clear();
        slot.push_str(truncate_to_boundary(value, MAX_TAG_LEN));
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(String::clear);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(String::is_empty)
    }

    /// Values in canonical slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TagType, &str)> {
        TagType::ALL.into_iter().zip(self.slots.iter().map(String::as_str))
    }
}

fn truncate_to_boundary(value: &str, max_len: usize) -> &str {
    if value.len() <= max_len {
        return value;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Header metadata of one game in a PGN collection, plus where its move
/// text starts.
///
/// `pos` is the byte offset of the first move-text byte and `line_number`
/// the 1-based line it sits on. A cleared entry has empty tags, offset 0 and
/// line 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    pub(crate) tags: TagBuffer,
    pub(crate) pos: u64,
    pub(crate) line_number: u64,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            tags: TagBuffer::default(),
            pos: 0,
            line_number: 1,
        }
    }
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.pos = 0;
        self.line_number = 1;
    }

    pub fn is_cleared(&self) -> bool {
        self.tags.is_empty() && self.pos == 0 && self.line_number == 1
    }

    pub fn with_position(mut self, pos: u64, line_number: u64) -> Self {
        self.pos = pos;
        self.line_number = line_number.max(1);
        self
    }

    pub fn with_tag(mut self, tag: TagType, value: &str) -> Self {
        self.tags.set(tag, value);
        self
    }

    pub fn set_tag(&mut self, tag: TagType, value: &str) {
        self.tags.set(tag, value);
    }

    pub fn tag(&self, tag: TagType) -> &str {
        self.tags.get(tag)
    }

    pub fn tags(&self) -> &TagBuffer {
        &self.tags
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn event(&self) -> &str {
        self.tag(TagType::Event)
    }

    pub fn site(&self) -> &str {
        self.tag(TagType::Site)
    }

    /// Calendar date from the `Date` tag. Unknown (`?`) or malformed
    /// components give `None`.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_pgn_date(self.tag(TagType::Date))
    }

    /// Round number, `None` unless the tag is a plain decimal integer
    /// (no sign, no surrounding spaces).
    pub fn round(&self) -> Option<u32> {
        let raw = self.tag(TagType::Round);
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok()
    }

    pub fn white(&self) -> &str {
        self.tag(TagType::White)
    }

    pub fn black(&self) -> &str {
        self.tag(TagType::Black)
    }

    pub fn result(&self) -> GameResult {
        GameResult::from_tag(self.tag(TagType::Result))
    }

    pub fn variant(&self) -> &str {
        self.tag(TagType::Variant)
    }
}

fn parse_pgn_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.contains('?') {
        return None;
    }

    let mut parts = s.split('.');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<u32>().ok()?;
    let day = day.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip_through_lookup() {
        for tag in TagType::ALL {
            assert_eq!(TagType::from_name(tag.name().as_bytes()), Some(tag));
        }
        assert_eq!(TagType::from_name(b"event"), None);
        assert_eq!(TagType::from_name(b"WhiteElo"), None);
    }

    #[test]
    fn test_slots_are_independent_of_insertion_order() {
        let mut buffer = TagBuffer::default();
        buffer.set(TagType::Variant, "chess960");
        buffer.set(TagType::Event, "Open");

        assert_eq!(buffer.get(TagType::Event), "Open");
        assert_eq!(buffer.get(TagType::Variant), "chess960");
        assert_eq!(buffer.get(TagType::Site), "");

        let order: Vec<TagType> = buffer.iter().map(|(tag, _)| tag).collect();
        assert_eq!(order, TagType::ALL.to_vec());
    }

    #[test]
    fn test_set_truncates_on_char_boundary() {
        let mut buffer = TagBuffer::default();
        let long = "é".repeat(200);
        buffer.set(TagType::White, &long);

        let stored = buffer.get(TagType::White);
        assert!(stored.len() <= MAX_TAG_LEN);
        assert_eq!(stored.len(), 254);
        assert!(long.starts_with(stored));
    }

    #[test]
    fn test_default_entry_is_cleared() {
        let mut entry = Entry::new()
            .with_tag(TagType::Event, "Ch")
            .with_position(120, 9);
        assert!(!entry.is_cleared());

        entry.clear();
        assert!(entry.is_cleared());
        assert_eq!(entry, Entry::default());
    }

    #[test]
    fn test_date_decoding() {
        let entry = Entry::new().with_tag(TagType::Date, "1985.11.09");
        assert_eq!(entry.date(), NaiveDate::from_ymd_opt(1985, 11, 9));

        for raw in ["", "1985.??.??", "????.??.??", "1985-11-09", "1985.02.30", "1985.11"] {
            let entry = Entry::new().with_tag(TagType::Date, raw);
            assert_eq!(entry.date(), None, "date {raw:?}");
        }
    }

    #[test]
    fn test_round_decoding() {
        assert_eq!(Entry::new().with_tag(TagType::Round, "16").round(), Some(16));
        assert_eq!(Entry::new().with_tag(TagType::Round, "").round(), None);
        assert_eq!(Entry::new().with_tag(TagType::Round, "?").round(), None);
        assert_eq!(Entry::new().with_tag(TagType::Round, "3.1").round(), None);
    }

    #[test]
    fn test_round_rejects_sign_and_padding() {
        for raw in ["+5", " 5", "5 ", " +5 ", "-1", "99999999999"] {
            let entry = Entry::new().with_tag(TagType::Round, raw);
            assert_eq!(entry.round(), None, "round {raw:?}");
        }
        assert_eq!(Entry::new().with_tag(TagType::Round, "007").round(), Some(7));
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        let entry = Entry::new();
        assert_eq!(entry.event(), "");
        assert_eq!(entry.round(), None);
        assert_eq!(entry.date(), None);
        assert_eq!(entry.result(), GameResult::NoResult);
    }
}
