use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Server-assigned movie identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub i64);

impl std::fmt::Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MovieId {
    fn from(id: i64) -> Self {
        MovieId(id)
    }
}

/// A movie as the backend describes it. Never constructed from user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default, alias = "average_rating", deserialize_with = "lenient_f64")]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default, deserialize_with = "genre_names")]
    pub genres: Vec<String>,
}

/// A 1–5 star rating. Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(Error::InvalidRating(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Filled and empty stars, e.g. `★★★☆☆`.
    pub fn stars(self) -> String {
        let filled = self.0 as usize;
        format!(
            "{}{}",
            "★".repeat(filled),
            "☆".repeat(Self::MAX as usize - filled)
        )
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Rating::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        rating.0 as i64
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted user rating as returned by the preference list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preference {
    pub movie: Movie,
    pub rating: Rating,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The preference list arrives either paginated or as a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PreferenceList {
    Paginated { results: Vec<Preference> },
    Bare(Vec<Preference>),
}

impl PreferenceList {
    pub fn into_vec(self) -> Vec<Preference> {
        match self {
            PreferenceList::Paginated { results } => results,
            PreferenceList::Bare(results) => results,
        }
    }
}

/// A movie together with the rating this session gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedMovie {
    pub movie: Movie,
    pub rating: Rating,
}

/// Whether a preference write created a new row or replaced an old rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingAction {
    Created,
    Updated,
}

/// Summary counters from the statistics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    #[serde(default)]
    pub total_movies_rated: u32,
    #[serde(default)]
    pub analysis_ready: bool,
    #[serde(default = "default_min_movies")]
    pub min_movies_required: u32,
}

fn default_min_movies() -> u32 {
    crate::error::MIN_RATINGS_FOR_ANALYSIS as u32
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MovieList {
    #[serde(default)]
    pub results: Vec<Movie>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SavedMoviesBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub movies: Vec<Movie>,
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenreRepr {
    Name(String),
    Object { name: String },
}

fn genre_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<GenreRepr>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|genre| match genre {
            GenreRepr::Name(name) | GenreRepr::Object { name } => name,
        })
        .collect())
}
