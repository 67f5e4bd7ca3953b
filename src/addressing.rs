//! Rating-bucket addressing.
//!
//! Maps a rating to its fixed-width bucket and a `(bucket, partition)` pair to
//! the content address of one shard document in the remote store:
//!
//! ```text
//! {base}/{shard}/{kind}/{key}/{key}_{lower}_{upper}.json
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::Partition;
use crate::error::{PuzzleEngineError, Result};

/// Shard namespace for opening-indexed content
pub const OPENING_SHARD: &str = "puzzles-openings";

/// Theme shards by first letter of the theme, inclusive ranges
pub const THEME_SHARDS: &[(char, char, &str)] = &[
    ('a', 'h', "puzzles-themes-a-h"),
    ('i', 'o', "puzzles-themes-i-o"),
    ('p', 'z', "puzzles-themes-p-z"),
];

/// One fixed-width rating interval, identified by its lower bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RatingBucket {
    pub lower: i32,
    pub upper: i32,
}

impl RatingBucket {
    pub fn contains(&self, rating: i32) -> bool {
        (self.lower..=self.upper).contains(&rating)
    }
}

impl fmt::Display for RatingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.lower, self.upper)
    }
}

/// Bucket width and the global rating domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketScheme {
    pub width: i32,
    pub min_rating: i32,
    pub max_rating: i32,
}

impl BucketScheme {
    pub fn new(width: i32, min_rating: i32, max_rating: i32) -> Self {
        Self {
            width,
            min_rating,
            max_rating,
        }
    }

    pub fn clamp(&self, rating: i32) -> i32 {
        rating.clamp(self.min_rating, self.max_rating)
    }

    /// Bucket holding `rating` once clamped into the domain
    pub fn bucket_of(&self, rating: i32) -> RatingBucket {
        self.bucket_at(self.clamp(rating).div_euclid(self.width) * self.width)
    }

    fn bucket_at(&self, lower: i32) -> RatingBucket {
        RatingBucket {
            lower,
            upper: lower + self.width - 1,
        }
    }

    /// Fallback search order: the start bucket, every bucket above it up to
    /// the maximum, then every bucket below it down to the minimum.
    pub fn bucket_sequence(&self, rating: i32) -> Vec<RatingBucket> {
        let start = self.bucket_of(rating);
        let top = self.bucket_of(self.max_rating).lower;
        let bottom = self.bucket_of(self.min_rating).lower;

        let mut sequence = vec![start];

        let mut lower = start.lower + self.width;
        while lower <= top {
            sequence.push(self.bucket_at(lower));
            lower += self.width;
        }

        let mut lower = start.lower - self.width;
        while lower >= bottom {
            sequence.push(self.bucket_at(lower));
            lower -= self.width;
        }

        sequence
    }
}

/// Pick the partition that drives addressing. An opening family wins over a
/// theme; blank strings count as absent.
pub fn resolve_partition(theme: Option<&str>, opening_family: Option<&str>) -> Result<Partition> {
    let present = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(family) = present(opening_family) {
        return Ok(Partition::Opening(family));
    }
    if let Some(theme) = present(theme) {
        return Ok(Partition::Theme(theme));
    }

    Err(PuzzleEngineError::Addressing(
        "neither theme nor opening family supplied".to_string(),
    ))
}

/// Shard namespace holding a partition
pub fn shard_for(partition: &Partition) -> Result<&'static str> {
    match partition {
        Partition::Opening(_) => Ok(OPENING_SHARD),
        Partition::Theme(theme) => {
            let first = theme
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .ok_or_else(|| PuzzleEngineError::Addressing("empty theme".to_string()))?;

            THEME_SHARDS
                .iter()
                .find(|(from, to, _)| (*from..=*to).contains(&first))
                .map(|(_, _, shard)| *shard)
                .ok_or_else(|| {
                    PuzzleEngineError::Addressing(format!("no theme shard for '{}'", theme))
                })
        }
    }
}

/// Content address of one bucket within a partition
pub fn address_for(base_url: &str, bucket: RatingBucket, partition: &Partition) -> Result<String> {
    let shard = shard_for(partition)?;
    let key = urlencoding::encode(partition.key());

    Ok(format!(
        "{}/{}/{}/{}/{}_{}.json",
        base_url.trim_end_matches('/'),
        shard,
        partition.kind(),
        key,
        key,
        bucket
    ))
}

/// Content address from the raw theme/opening pair
pub fn address_of(
    base_url: &str,
    bucket: RatingBucket,
    theme: Option<&str>,
    opening_family: Option<&str>,
) -> Result<String> {
    let partition = resolve_partition(theme, opening_family)?;
    address_for(base_url, bucket, &partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn scheme() -> BucketScheme {
        BucketScheme::new(20, 400, 3000)
    }

    #[test]
    fn test_bucket_of_floors_to_width() {
        let s = scheme();
        assert_eq!(s.bucket_of(1500), RatingBucket { lower: 1500, upper: 1519 });
        assert_eq!(s.bucket_of(1519), RatingBucket { lower: 1500, upper: 1519 });
        assert_eq!(s.bucket_of(1537).lower, 1520);
    }

    #[test]
    fn test_bucket_of_clamps() {
        let s = scheme();
        assert_eq!(s.bucket_of(-50).lower, 400);
        assert_eq!(s.bucket_of(100).lower, 400);
        assert_eq!(s.bucket_of(9999).lower, 3000);
    }

    #[test]
    fn test_bucket_of_property() {
        let s = scheme();
        for rating in (-100..3300).step_by(7) {
            let bucket = s.bucket_of(rating);
            assert_eq!(bucket.lower % s.width, 0);
            assert!(bucket.contains(s.clamp(rating)), "rating {} not in {}", rating, bucket);
        }
    }

    #[test]
    fn test_bucket_sequence_shape() {
        let s = scheme();
        let seq = s.bucket_sequence(1500);

        assert_eq!(seq[0].lower, 1500);
        let up_len = ((3000 - 1500) / 20) as usize;
        for pair in seq[..=up_len].windows(2) {
            assert_eq!(pair[1].lower - pair[0].lower, 20);
        }
        assert_eq!(seq[up_len].lower, 3000);
        assert_eq!(seq[up_len + 1].lower, 1480);
        for pair in seq[up_len + 1..].windows(2) {
            assert_eq!(pair[0].lower - pair[1].lower, 20);
        }
        assert_eq!(seq.last().unwrap().lower, 400);

        let unique: HashSet<_> = seq.iter().map(|b| b.lower).collect();
        assert_eq!(unique.len(), seq.len());
        assert_eq!(seq.len(), ((3000 - 400) / 20 + 1) as usize);
    }

    #[test]
    fn test_bucket_sequence_edges() {
        let s = scheme();

        let top = s.bucket_sequence(5000);
        assert_eq!(top[0].lower, 3000);
        assert_eq!(top[1].lower, 2980);

        let bottom = s.bucket_sequence(0);
        assert_eq!(bottom[0].lower, 400);
        assert_eq!(bottom[1].lower, 420);
        assert_eq!(bottom.last().unwrap().lower, 3000);
    }

    #[test]
    fn test_resolve_partition() {
        assert_eq!(
            resolve_partition(Some("fork"), None).unwrap(),
            Partition::Theme("fork".into())
        );
        assert_eq!(
            resolve_partition(Some("fork"), Some("Italian_Game")).unwrap(),
            Partition::Opening("Italian_Game".into())
        );
        assert_eq!(
            resolve_partition(Some("pin"), Some("  ")).unwrap(),
            Partition::Theme("pin".into())
        );
        assert!(matches!(
            resolve_partition(None, Some("")),
            Err(PuzzleEngineError::Addressing(_))
        ));
    }

    #[test]
    fn test_theme_shards() {
        assert_eq!(shard_for(&Partition::Theme("fork".into())).unwrap(), "puzzles-themes-a-h");
        assert_eq!(shard_for(&Partition::Theme("hangingPiece".into())).unwrap(), "puzzles-themes-a-h");
        assert_eq!(shard_for(&Partition::Theme("mateIn2".into())).unwrap(), "puzzles-themes-i-o");
        assert_eq!(shard_for(&Partition::Theme("Pin".into())).unwrap(), "puzzles-themes-p-z");
        assert_eq!(shard_for(&Partition::Theme("zugzwang".into())).unwrap(), "puzzles-themes-p-z");
        assert_eq!(shard_for(&Partition::Opening("Sicilian_Defense".into())).unwrap(), OPENING_SHARD);
        assert!(shard_for(&Partition::Theme("1move".into())).is_err());
    }

    #[test]
    fn test_address_layout() {
        let s = scheme();
        let address = address_of("https://cdn.example.com/", s.bucket_of(1510), Some("fork"), None).unwrap();
        assert_eq!(
            address,
            "https://cdn.example.com/puzzles-themes-a-h/theme/fork/fork_1500_1519.json"
        );

        let address = address_of("https://cdn.example.com", s.bucket_of(1200), None, Some("Sicilian_Defense")).unwrap();
        assert_eq!(
            address,
            "https://cdn.example.com/puzzles-openings/opening/Sicilian_Defense/Sicilian_Defense_1200_1219.json"
        );
    }

    #[test]
    fn test_address_requires_partition() {
        let s = scheme();
        assert!(matches!(
            address_of("https://cdn.example.com", s.bucket_of(1500), None, None),
            Err(PuzzleEngineError::Addressing(_))
        ));
    }
}
