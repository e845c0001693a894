use shakmaty::Color;
use std::fmt;
use std::str::FromStr;

/// Outcome recorded in a game's `Result` tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    /// `*`, an empty tag, or anything unrecognized.
    #[default]
    NoResult,
}

impl GameResult {
    pub fn from_tag(raw: &str) -> Self {
        match raw.trim() {
            "1-0" => Self::WhiteWins,
            "0-1" => Self::BlackWins,
            "1/2-1/2" => Self::Draw,
            _ => Self::NoResult,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Self::WhiteWins => Some(Color::White),
            Self::BlackWins => Some(Color::Black),
            Self::Draw | Self::NoResult => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::NoResult => "*",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::WhiteWins => "White wins",
            Self::BlackWins => "Black wins",
            Self::Draw => "Drawn game",
            Self::NoResult => "No result",
        }
    }
}

impl FromStr for GameResult {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
