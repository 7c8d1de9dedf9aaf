// Genre labels, profiles and the per-call score table
//
// The 15 genre labels are fixed; every lookup table in the classifier is
// indexed by the Genre enum so the scoring passes stay exhaustive. Profiles
// are data, not code: canonical BPM ranges and feature targets live in one
// static table that tests can probe directly.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Number of genre labels the classifier ranks
pub const GENRE_COUNT: usize = 15;

/// Fixed genre label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Rock,
    Pop,
    Jazz,
    Blues,
    Classical,
    Electronic,
    HipHop,
    Reggae,
    Country,
    Folk,
    Metal,
    Latin,
    IndianClassical,
    Indigenous,
    Ambient,
}

impl Genre {
    /// All genres in table order
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::Rock,
        Genre::Pop,
        Genre::Jazz,
        Genre::Blues,
        Genre::Classical,
        Genre::Electronic,
        Genre::HipHop,
        Genre::Reggae,
        Genre::Country,
        Genre::Folk,
        Genre::Metal,
        Genre::Latin,
        Genre::IndianClassical,
        Genre::Indigenous,
        Genre::Ambient,
    ];

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "Rock",
            Genre::Pop => "Pop",
            Genre::Jazz => "Jazz",
            Genre::Blues => "Blues",
            Genre::Classical => "Classical",
            Genre::Electronic => "Electronic",
            Genre::HipHop => "Hip-Hop",
            Genre::Reggae => "Reggae",
            Genre::Country => "Country",
            Genre::Folk => "Folk",
            Genre::Metal => "Metal",
            Genre::Latin => "Latin",
            Genre::IndianClassical => "Indian Classical",
            Genre::Indigenous => "Indigenous",
            Genre::Ambient => "Ambient",
        }
    }

    /// Position in the score table
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parse an adapter-provided label, case-insensitively
    pub fn from_label(label: &str) -> Option<Genre> {
        let normalized = label.trim().to_ascii_lowercase();
        Genre::ALL
            .iter()
            .find(|g| g.as_str().to_ascii_lowercase() == normalized)
            .copied()
    }

    /// Feature-sensitivity profile for this genre
    pub fn profile(&self) -> &'static GenreProfile {
        &GENRE_PROFILES[self.index()]
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical feature expectations for one genre
#[derive(Debug, Clone, Copy)]
pub struct GenreProfile {
    /// Canonical tempo range in BPM
    pub bpm_range: (f32, f32),
    /// Expected pulse regularity in [0, 1]
    pub target_regularity: f32,
    /// Expected brightness in [0, 1]
    pub target_brightness: f32,
    /// How characteristic polyrhythm is, in [0, 1]
    pub polyrhythm_affinity: f32,
}

impl GenreProfile {
    /// Whether a tempo falls inside the canonical range
    pub fn tempo_in_range(&self, tempo: f32) -> bool {
        tempo >= self.bpm_range.0 && tempo <= self.bpm_range.1
    }
}

/// Profiles in `Genre::ALL` order
pub static GENRE_PROFILES: Lazy<[GenreProfile; GENRE_COUNT]> = Lazy::new(|| {
    [
        // Rock
        GenreProfile {
            bpm_range: (90.0, 140.0),
            target_regularity: 0.8,
            target_brightness: 0.5,
            polyrhythm_affinity: 0.1,
        },
        // Pop
        GenreProfile {
            bpm_range: (96.0, 132.0),
            target_regularity: 0.85,
            target_brightness: 0.55,
            polyrhythm_affinity: 0.05,
        },
        // Jazz
        GenreProfile {
            bpm_range: (80.0, 160.0),
            target_regularity: 0.5,
            target_brightness: 0.45,
            polyrhythm_affinity: 0.5,
        },
        // Blues
        GenreProfile {
            bpm_range: (60.0, 120.0),
            target_regularity: 0.6,
            target_brightness: 0.35,
            polyrhythm_affinity: 0.2,
        },
        // Classical
        GenreProfile {
            bpm_range: (50.0, 120.0),
            target_regularity: 0.55,
            target_brightness: 0.3,
            polyrhythm_affinity: 0.3,
        },
        // Electronic
        GenreProfile {
            bpm_range: (118.0, 150.0),
            target_regularity: 0.95,
            target_brightness: 0.7,
            polyrhythm_affinity: 0.1,
        },
        // Hip-Hop
        GenreProfile {
            bpm_range: (80.0, 115.0),
            target_regularity: 0.85,
            target_brightness: 0.45,
            polyrhythm_affinity: 0.15,
        },
        // Reggae
        GenreProfile {
            bpm_range: (70.0, 100.0),
            target_regularity: 0.45,
            target_brightness: 0.4,
            polyrhythm_affinity: 0.35,
        },
        // Country
        GenreProfile {
            bpm_range: (90.0, 130.0),
            target_regularity: 0.8,
            target_brightness: 0.5,
            polyrhythm_affinity: 0.05,
        },
        // Folk
        GenreProfile {
            bpm_range: (70.0, 110.0),
            target_regularity: 0.5,
            target_brightness: 0.4,
            polyrhythm_affinity: 0.3,
        },
        // Metal
        GenreProfile {
            bpm_range: (120.0, 180.0),
            target_regularity: 0.85,
            target_brightness: 0.65,
            polyrhythm_affinity: 0.1,
        },
        // Latin
        GenreProfile {
            bpm_range: (90.0, 135.0),
            target_regularity: 0.7,
            target_brightness: 0.55,
            polyrhythm_affinity: 0.6,
        },
        // Indian Classical
        GenreProfile {
            bpm_range: (40.0, 100.0),
            target_regularity: 0.3,
            target_brightness: 0.4,
            polyrhythm_affinity: 0.55,
        },
        // Indigenous
        GenreProfile {
            bpm_range: (40.0, 90.0),
            target_regularity: 0.35,
            target_brightness: 0.55,
            polyrhythm_affinity: 0.8,
        },
        // Ambient
        GenreProfile {
            bpm_range: (40.0, 80.0),
            target_regularity: 0.3,
            target_brightness: 0.25,
            polyrhythm_affinity: 0.05,
        },
    ]
});

/// Additive per-genre score accumulator, local to one classification call
///
/// Scores may go negative mid-pipeline (penalties); they are clamped to
/// zero only at normalization time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenreScores([f32; GENRE_COUNT]);

impl GenreScores {
    /// Fresh table with every genre at zero
    pub fn new() -> Self {
        Self([0.0; GENRE_COUNT])
    }

    /// Add a (possibly negative) delta to one genre
    pub fn add(&mut self, genre: Genre, delta: f32) {
        self.0[genre.index()] += delta;
    }

    /// Current score of one genre
    pub fn get(&self, genre: Genre) -> f32 {
        self.0[genre.index()]
    }

    /// Overwrite one genre's score
    pub fn set(&mut self, genre: Genre, value: f32) {
        self.0[genre.index()] = value;
    }

    /// (genre, score) pairs in table order
    pub fn entries(&self) -> impl Iterator<Item = (Genre, f32)> + '_ {
        Genre::ALL.iter().copied().zip(self.0.iter().copied())
    }

    /// Genres ranked by descending score (ties keep table order)
    pub fn ranked(&self) -> Vec<(Genre, f32)> {
        let mut ranked: Vec<(Genre, f32)> = self.entries().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Highest raw score in the table
    pub fn max_score(&self) -> f32 {
        self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

impl Default for GenreScores {
    fn default() -> Self {
        Self::new()
    }
}

/// One ranked prediction handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenrePrediction {
    /// Genre label; may be a hyphenated blend such as "Rock-Blues"
    pub genre: String,
    /// Confidence percentage, 0-100
    pub confidence: u8,
}
