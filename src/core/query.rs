use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color the caller wants to solve as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverColor {
    White,
    Black,
}

impl SolverColor {
    pub fn inverse(self) -> Self {
        match self {
            SolverColor::White => SolverColor::Black,
            SolverColor::Black => SolverColor::White,
        }
    }

    /// FEN side-to-move token for this color
    pub fn fen_token(self) -> char {
        match self {
            SolverColor::White => 'w',
            SolverColor::Black => 'b',
        }
    }

    pub fn from_fen_token(token: char) -> Option<Self> {
        match token {
            'w' => Some(SolverColor::White),
            'b' => Some(SolverColor::Black),
            _ => None,
        }
    }
}

/// Requested color constraint (`white | black | either`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFilter {
    White,
    Black,
    #[default]
    Either,
}

impl ColorFilter {
    pub fn solver(self) -> Option<SolverColor> {
        match self {
            ColorFilter::White => Some(SolverColor::White),
            ColorFilter::Black => Some(SolverColor::Black),
            ColorFilter::Either => None,
        }
    }
}

impl FromStr for ColorFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "white" | "w" => Ok(ColorFilter::White),
            "black" | "b" => Ok(ColorFilter::Black),
            "either" | "any" | "" => Ok(ColorFilter::Either),
            other => Err(format!("unknown color '{}'", other)),
        }
    }
}

/// Remote partition a query is addressed against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum Partition {
    Theme(String),
    Opening(String),
}

impl Partition {
    /// Path segment naming the partition kind
    pub fn kind(&self) -> &'static str {
        match self {
            Partition::Theme(_) => "theme",
            Partition::Opening(_) => "opening",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Partition::Theme(key) | Partition::Opening(key) => key,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

/// Caller-supplied puzzle query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleQuery {
    /// Target rating, clamped into the configured domain
    pub rating: i32,

    #[serde(default)]
    pub theme: Option<String>,

    #[serde(default)]
    pub opening_family: Option<String>,

    #[serde(default)]
    pub color: ColorFilter,

    /// Desired number of puzzles, capped at the configured maximum
    #[serde(default)]
    pub count: Option<usize>,
}

impl PuzzleQuery {
    pub fn new(rating: i32) -> Self {
        Self {
            rating,
            ..Default::default()
        }
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn opening(mut self, family: impl Into<String>) -> Self {
        self.opening_family = Some(family.into());
        self
    }

    pub fn color(mut self, color: ColorFilter) -> Self {
        self.color = color;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}
