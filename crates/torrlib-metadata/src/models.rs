use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RawPaginatedResponse {
    #[serde(default)]
    pub(crate) results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TvShow {
    pub(crate) name: String,
    pub(crate) poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Movie {
    pub(crate) title: String,
    pub(crate) poster_path: Option<String>,
}

/// Movie or TV result from the multi search endpoint.
#[derive(Debug)]
pub(crate) enum SearchMultiResult {
    Tv(TvShow),
    Movie(Movie),
}

impl SearchMultiResult {
    pub(crate) fn from_value(value: serde_json::Value) -> Option<Self> {
        let media_type = value.get("media_type")?.as_str()?;
        match media_type {
            "tv" => serde_json::from_value(value).ok().map(Self::Tv),
            "movie" => serde_json::from_value(value).ok().map(Self::Movie),
            _ => None,
        }
    }

    pub(crate) fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::Tv(show) => (show.name, show.poster_path),
            Self::Movie(movie) => (movie.title, movie.poster_path),
        }
    }
}
