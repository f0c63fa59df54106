//! Library category selection.
//!
//! Materialization and cleanup both call [`classify`] so cleanup can find the
//! directory materialization chose without a saved path.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

const SERIES_TOKENS: &[&str] = &["сериалы", "серіали", "serials", "series", "tv", "tv shows"];
const FILM_TOKENS: &[&str] = &["фильмы", "фільми", "movies", "films"];

static SEASON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s\d+|season\s+\d+").expect("season pattern compiles"));
static EPISODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)e\d+|episode\s+\d+").expect("episode pattern compiles"));

/// Top-level library directory a torrent is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryCategory {
    /// Episodic content.
    Serials,
    /// Everything else.
    Films,
}

impl LibraryCategory {
    /// Every category, in directory order.
    pub const ALL: [Self; 2] = [Self::Serials, Self::Films];

    /// Directory name under the library base.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Serials => "torrSerials",
            Self::Films => "torrFilms",
        }
    }

    /// Whether `name` is one of the category directory names.
    #[must_use]
    pub fn is_category_dir(name: &str) -> bool {
        Self::ALL.iter().any(|category| category.dir_name() == name)
    }
}

impl fmt::Display for LibraryCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.dir_name())
    }
}

/// Choose a category from an explicit label, falling back to season and
/// episode markers in `title`.
#[must_use]
pub fn classify(category: &str, title: &str) -> LibraryCategory {
    let label = category.trim().to_lowercase();
    if SERIES_TOKENS.contains(&label.as_str()) {
        return LibraryCategory::Serials;
    }
    if FILM_TOKENS.contains(&label.as_str()) {
        return LibraryCategory::Films;
    }

    if SEASON_PATTERN.is_match(title) || EPISODE_PATTERN.is_match(title) {
        LibraryCategory::Serials
    } else {
        LibraryCategory::Films
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_labels_win_in_every_locale() {
        for label in ["сериалы", "Серіали", "SERIALS", "series", " tv ", "TV Shows"] {
            assert_eq!(classify(label, "Movie.2020"), LibraryCategory::Serials, "{label}");
        }
        for label in ["Фильмы", "фільми", "movies", "Films"] {
            assert_eq!(classify(label, "Show.S01E02"), LibraryCategory::Films, "{label}");
        }
    }

    #[test]
    fn titles_fall_back_to_episode_markers() {
        assert_eq!(classify("", "Show.S01E02.mkv"), LibraryCategory::Serials);
        assert_eq!(classify("", "Show Season 2"), LibraryCategory::Serials);
        assert_eq!(classify("", "Show episode 10"), LibraryCategory::Serials);
        assert_eq!(classify("unknown", "Movie"), LibraryCategory::Films);
    }

    #[test]
    fn bare_letter_digit_runs_count_as_markers() {
        // The markers are unanchored, so a year after an `e` still matches.
        assert_eq!(classify("", "Movie.2020.mkv"), LibraryCategory::Films);
        assert_eq!(classify("", "Some Title 2020"), LibraryCategory::Films);
        assert_eq!(classify("", "Movie e2020"), LibraryCategory::Serials);
    }

    #[test]
    fn category_dirs_are_recognised() {
        assert!(LibraryCategory::is_category_dir("torrSerials"));
        assert!(LibraryCategory::is_category_dir("torrFilms"));
        assert!(!LibraryCategory::is_category_dir("Custom"));
        assert_eq!(LibraryCategory::Films.to_string(), "torrFilms");
    }
}
