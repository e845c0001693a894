use crate::error::{Error, Result};
use crate::result::GameResult;
use crate::types::Entry;
use chrono::NaiveDate;
use regex::Regex;
use shakmaty::Color;

/// Joins tag values in the rendering that wildcard patterns run against.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Case-insensitive `*`/`?` wildcard over an entry's tags.
///
/// The entry is rendered as its eight tag values in canonical order joined
/// by [`FIELD_SEPARATOR`]. The pattern has to match from a field start to a
/// field end: `?` matches one character inside a field, `*` matches any
/// run and may cross fields. Case folding is Unicode simple case folding.
/// The empty pattern matches every entry.
#[derive(Clone, Debug)]
pub struct WildcardPattern {
    raw: String,
    regex: Option<Regex>,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPattern {
            pattern: pattern.escape_debug().to_string(),
            reason,
        };

        if pattern.contains(FIELD_SEPARATOR) {
            return Err(invalid("contains the field separator U+001F".to_string()));
        }
        if pattern.is_empty() {
            return Ok(Self {
                raw: String::new(),
                regex: None,
            });
        }

        let mut source = String::with_capacity(pattern.len() * 2 + 32);
        source.push_str(r"(?is)(?:\A|\x1F)");
        let mut literal = String::new();
        for c in pattern.chars() {
            match c {
                '*' | '?' => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push_str(if c == '*' { ".*" } else { r"[^\x1F]" });
                }
                _ => literal.push(c),
            }
        }
        source.push_str(&regex::escape(&literal));
        source.push_str(r"(?:\x1F|\z)");

        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex: Some(regex),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, entry: &Entry) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&entry.rendered_tags()),
            None => true,
        }
    }
}

/// Case-insensitive substring criterion, folded the same way as
/// [`WildcardPattern`]. An empty needle matches everything.
#[derive(Clone, Debug)]
pub struct Substring {
    raw: String,
    regex: Regex,
}

impl Substring {
    pub fn new(needle: &str) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){}", regex::escape(needle))).map_err(|e| {
            Error::InvalidPattern {
                pattern: needle.escape_debug().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            raw: needle.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl Entry {
    /// Tag values in canonical order, joined by [`FIELD_SEPARATOR`].
    pub fn rendered_tags(&self) -> String {
        let mut out = String::with_capacity(64);
        for (i, (_, value)) in self.tags().iter().enumerate() {
            if i > 0 {
                out.push(FIELD_SEPARATOR);
            }
            out.push_str(value);
        }
        out
    }

    pub fn matches(&self, pattern: &WildcardPattern) -> bool {
        pattern.is_match(self)
    }

    pub fn player(&self, side: Color) -> &str {
        match side {
            Color::White => self.white(),
            Color::Black => self.black(),
        }
    }
}

/// Field-level criteria for browsing a collection. Unset criteria accept
/// everything; an entry passes when it satisfies all set criteria.
#[derive(Clone, Debug, Default)]
pub struct GameFilter {
    pub pattern: Option<WildcardPattern>,
    pub event: Option<Substring>,
    pub site: Option<Substring>,
    pub player: Option<Substring>,
    pub opponent: Option<Substring>,
    /// Restricts `player` to one color, `opponent` to the other.
    pub player_side: Option<Color>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub min_round: Option<u32>,
    pub max_round: Option<u32>,
    pub result: Option<GameResult>,
    /// Accept every result except `result`.
    pub result_inverted: bool,
}

impl GameFilter {
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Some(WildcardPattern::new(pattern)?),
            ..Self::default()
        })
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(entry)
        {
            return false;
        }

        contains(entry.event(), self.event.as_ref())
            && contains(entry.site(), self.site.as_ref())
            && self.players_match(entry)
            && self.date_matches(entry)
            && self.round_matches(entry)
            && self.result_matches(entry)
    }

    fn players_match(&self, entry: &Entry) -> bool {
        if self.player.is_none() && self.opponent.is_none() {
            return true;
        }

        [Color::White, Color::Black]
            .into_iter()
            .filter(|side| self.player_side.is_none_or(|wanted| wanted == *side))
            .any(|side| {
                contains(entry.player(side), self.player.as_ref())
                    && contains(entry.player(side.other()), self.opponent.as_ref())
            })
    }

    fn date_matches(&self, entry: &Entry) -> bool {
        if self.min_date.is_none() && self.max_date.is_none() {
            return true;
        }
        let Some(date) = entry.date() else {
            return false;
        };
        self.min_date.is_none_or(|min| date >= min) && self.max_date.is_none_or(|max| date <= max)
    }

    fn round_matches(&self, entry: &Entry) -> bool {
        if self.min_round.is_none() && self.max_round.is_none() {
            return true;
        }
        let Some(round) = entry.round() else {
            return false;
        };
        self.min_round.is_none_or(|min| round >= min)
            && self.max_round.is_none_or(|max| round <= max)
    }

    fn result_matches(&self, entry: &Entry) -> bool {
        match self.result {
            Some(wanted) => (entry.result() == wanted) != self.result_inverted,
            None => true,
        }
    }
}

fn contains(haystack: &str, needle: Option<&Substring>) -> bool {
    needle.is_none_or(|needle| needle.is_match(haystack))
}
