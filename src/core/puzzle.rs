use serde::{Deserialize, Serialize};

use crate::core::query::SolverColor;

/// Rating assigned to raw records that carry none
pub const DEFAULT_PUZZLE_RATING: i32 = 1500;

/// Deserialize a space-separated string or a JSON array into a token list
fn deserialize_tokens<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TokenValue {
        List(Vec<String>),
        String(String),
        Null,
    }

    match TokenValue::deserialize(deserializer)? {
        TokenValue::List(items) => Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        TokenValue::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        TokenValue::Null => Ok(Vec::new()),
    }
}

/// Deserialize an integer that may arrive as a number, a numeric string or null
fn deserialize_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntValue {
        Int(i64),
        Float(f64),
        String(String),
        Null,
    }

    match IntValue::deserialize(deserializer)? {
        IntValue::Int(i) => Ok(Some(i)),
        IntValue::Float(f) => Ok(Some(f.round() as i64)),
        IntValue::String(s) if s.trim().is_empty() => Ok(None),
        IntValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::custom(format!("Invalid integer string: {}", s))),
        IntValue::Null => Ok(None),
    }
}

/// Raw puzzle object as served by the remote store.
///
/// Field spellings vary between dumps (camelCase, snake_case, the Lichess CSV
/// headers), so every field is optional and aliased.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPuzzle {
    #[serde(default, alias = "PuzzleId", alias = "puzzleId", alias = "puzzle_id")]
    pub id: Option<String>,

    #[serde(default, alias = "FEN", alias = "Fen")]
    pub fen: Option<String>,

    #[serde(default, alias = "Moves", deserialize_with = "deserialize_tokens")]
    pub moves: Vec<String>,

    #[serde(default, alias = "Rating", deserialize_with = "deserialize_lenient_int")]
    pub rating: Option<i64>,

    #[serde(
        default,
        alias = "RatingDeviation",
        alias = "ratingDeviation",
        deserialize_with = "deserialize_lenient_int"
    )]
    pub rating_deviation: Option<i64>,

    #[serde(default, alias = "Popularity", deserialize_with = "deserialize_lenient_int")]
    pub popularity: Option<i64>,

    #[serde(
        default,
        alias = "NbPlays",
        alias = "nbPlays",
        alias = "plays",
        deserialize_with = "deserialize_lenient_int"
    )]
    pub nb_plays: Option<i64>,

    #[serde(default, alias = "Themes", deserialize_with = "deserialize_tokens")]
    pub themes: Vec<String>,

    #[serde(default, alias = "openingFamily", alias = "OpeningFamily")]
    pub opening_family: Option<String>,

    #[serde(default, alias = "openingVariation", alias = "OpeningVariation")]
    pub opening_variation: Option<String>,

    #[serde(
        default,
        alias = "OpeningTags",
        alias = "openingTags",
        deserialize_with = "deserialize_tokens"
    )]
    pub opening_tags: Vec<String>,

    #[serde(default, alias = "GameUrl", alias = "gameUrl")]
    pub game_url: Option<String>,
}

/// Canonical puzzle record. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    /// Opaque puzzle id
    pub id: String,

    /// Position in FEN. The side to move is the side playing the setup move.
    pub fen: String,

    /// Space-separated UCI moves, setup move first
    pub moves: String,

    /// Puzzle rating
    pub rating: i32,

    #[serde(default)]
    pub rating_deviation: Option<i32>,

    #[serde(default)]
    pub popularity: i32,

    #[serde(default)]
    pub nb_plays: u32,

    /// Theme tags
    #[serde(default)]
    pub themes: Vec<String>,

    #[serde(default)]
    pub opening_family: Option<String>,

    #[serde(default)]
    pub opening_variation: Option<String>,

    /// Originating game
    #[serde(default)]
    pub game_url: Option<String>,
}

impl From<RawPuzzle> for Puzzle {
    fn from(raw: RawPuzzle) -> Self {
        let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let mut themes: Vec<String> = Vec::with_capacity(raw.themes.len());
        for theme in raw.themes {
            if !themes.contains(&theme) {
                themes.push(theme);
            }
        }

        // Lichess packs "Family Family_Variation" into one tag list
        let mut tags = raw.opening_tags.into_iter();
        let opening_family = non_empty(raw.opening_family).or_else(|| tags.next());
        let opening_variation = non_empty(raw.opening_variation).or_else(|| tags.next());

        Self {
            id: non_empty(raw.id).unwrap_or_default(),
            fen: non_empty(raw.fen).unwrap_or_default(),
            moves: raw.moves.join(" "),
            rating: raw
                .rating
                .and_then(|r| i32::try_from(r).ok())
                .unwrap_or(DEFAULT_PUZZLE_RATING),
            rating_deviation: raw.rating_deviation.and_then(|r| i32::try_from(r).ok()),
            popularity: raw
                .popularity
                .and_then(|p| i32::try_from(p).ok())
                .unwrap_or(0),
            nb_plays: raw.nb_plays.and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
            themes,
            opening_family,
            opening_variation,
            game_url: non_empty(raw.game_url),
        }
    }
}

impl Puzzle {
    /// Create a puzzle with the required fields
    pub fn new(id: impl Into<String>, fen: impl Into<String>, moves: impl Into<String>, rating: i32) -> Self {
        Self {
            id: id.into(),
            fen: fen.into(),
            moves: moves.into(),
            rating,
            rating_deviation: None,
            popularity: 0,
            nb_plays: 0,
            themes: Vec::new(),
            opening_family: None,
            opening_variation: None,
            game_url: None,
        }
    }

    /// Builder-style theme tagging
    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    /// Side-to-move token of the FEN (`w`/`b`), if the FEN has one
    pub fn side_to_move(&self) -> Option<char> {
        match self.fen.split_whitespace().nth(1) {
            Some("w") => Some('w'),
            Some("b") => Some('b'),
            _ => None,
        }
    }

    /// Color that actually solves the puzzle: the opposite of the FEN side to
    /// move, since the first move of the line is the opponent's setup move.
    pub fn solver_color(&self) -> Option<SolverColor> {
        self.side_to_move().and_then(SolverColor::from_fen_token).map(SolverColor::inverse)
    }

    /// The opponent's setup move
    pub fn setup_move(&self) -> Option<&str> {
        self.moves.split_whitespace().next()
    }

    /// The line to find, setup move excluded
    pub fn solution_moves(&self) -> Vec<&str> {
        self.moves.split_whitespace().skip(1).collect()
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.themes.iter().any(|t| t.eq_ignore_ascii_case(theme))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORK_FEN: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    #[test]
    fn test_raw_lichess_headers() {
        let json = r#"{
            "PuzzleId": "00sHx",
            "FEN": "q3k1nr/1pp1nQpp/3p4/1P2p3/4P3/B1PP1b2/B5PP/5K2 b k - 0 17",
            "Moves": "e8d7 a2e6 d7d8 f7f8",
            "Rating": 1760,
            "RatingDeviation": 80,
            "Popularity": 83,
            "NbPlays": 72,
            "Themes": "mate mateIn2 middlegame short",
            "GameUrl": "https://lichess.org/yyznGmXs/black#34",
            "OpeningTags": "Italian_Game Italian_Game_Classical_Variation"
        }"#;

        let raw: RawPuzzle = serde_json::from_str(json).unwrap();
        let puzzle = Puzzle::from(raw);

        assert_eq!(puzzle.id, "00sHx");
        assert_eq!(puzzle.rating, 1760);
        assert_eq!(puzzle.rating_deviation, Some(80));
        assert_eq!(puzzle.nb_plays, 72);
        assert_eq!(puzzle.themes, vec!["mate", "mateIn2", "middlegame", "short"]);
        assert_eq!(puzzle.opening_family.as_deref(), Some("Italian_Game"));
        assert_eq!(
            puzzle.opening_variation.as_deref(),
            Some("Italian_Game_Classical_Variation")
        );
        assert_eq!(puzzle.setup_move(), Some("e8d7"));
        assert_eq!(puzzle.solution_moves(), vec!["a2e6", "d7d8", "f7f8"]);
    }

    #[test]
    fn test_raw_defaults() {
        let raw: RawPuzzle = serde_json::from_str(r#"{"id": "abc", "fen": "8/8/8/8/8/8/8/8 w - - 0 1"}"#).unwrap();
        let puzzle = Puzzle::from(raw);

        assert_eq!(puzzle.rating, DEFAULT_PUZZLE_RATING);
        assert_eq!(puzzle.popularity, 0);
        assert_eq!(puzzle.nb_plays, 0);
        assert!(puzzle.themes.is_empty());
        assert!(puzzle.rating_deviation.is_none());
        assert!(puzzle.game_url.is_none());
    }

    #[test]
    fn test_raw_array_fields_and_string_numbers() {
        let json = r#"{
            "id": "x1",
            "fen": "8/8/8/8/8/8/8/8 b - - 0 1",
            "moves": ["e2e4", "e7e5"],
            "rating": "1620",
            "themes": ["fork", "fork", "short"],
            "openingFamily": "Sicilian_Defense"
        }"#;
        let puzzle = Puzzle::from(serde_json::from_str::<RawPuzzle>(json).unwrap());

        assert_eq!(puzzle.moves, "e2e4 e7e5");
        assert_eq!(puzzle.rating, 1620);
        assert_eq!(puzzle.themes, vec!["fork", "short"]);
        assert_eq!(puzzle.opening_family.as_deref(), Some("Sicilian_Defense"));
        assert!(puzzle.opening_variation.is_none());
    }

    #[test]
    fn test_solver_color_is_inverse_of_side_to_move() {
        let puzzle = Puzzle::new("p1", FORK_FEN, "h5f7 e8f7", 1500);
        assert_eq!(puzzle.side_to_move(), Some('w'));
        assert_eq!(puzzle.solver_color(), Some(SolverColor::Black));

        let broken = Puzzle::new("p2", "not a fen", "", 1500);
        assert_eq!(broken.side_to_move(), None);
        assert_eq!(broken.solver_color(), None);
    }

    #[test]
    fn test_has_theme_case_insensitive() {
        let puzzle = Puzzle::new("p1", FORK_FEN, "", 1500).with_themes(["mateIn2", "fork"]);
        assert!(puzzle.has_theme("matein2"));
        assert!(puzzle.has_theme("fork"));
        assert!(!puzzle.has_theme("pin"));
    }

    #[test]
    fn test_serialization() {
        let puzzle = Puzzle::new("p1", FORK_FEN, "h5f7", 1500).with_themes(["fork"]);
        let json = puzzle.to_json().unwrap();
        assert!(json.contains("\"nbPlays\":0"));
        assert_eq!(Puzzle::from_json(&json).unwrap(), puzzle);
    }
}
