use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{
    credentials::SessionCredentials,
    error::{Error, MIN_RATINGS_FOR_ANALYSIS, Result},
    model::{AnalysisStatistics, Movie, MovieId, Preference, Rating, RatingAction},
};

/// Result of a create-and-fetch lookup against the external catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedMovies {
    pub message: String,
    pub movies: Vec<Movie>,
}

/// The remote movie personality API.
///
/// Every call carries the caller's session explicitly. Analysis payloads are
/// returned as raw JSON because their shape is not stable; see
/// [`crate::interpreter`].
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search_movies(&self, session: &SessionCredentials, query: &str) -> Result<Vec<Movie>>;
    async fn search_and_save(
        &self,
        session: &SessionCredentials,
        query: &str,
    ) -> Result<SavedMovies>;
    async fn list_preferences(&self, session: &SessionCredentials) -> Result<Vec<Preference>>;
    async fn save_preference(
        &self,
        session: &SessionCredentials,
        movie_id: MovieId,
        rating: Rating,
    ) -> Result<RatingAction>;
    async fn trigger_analysis(&self, session: &SessionCredentials) -> Result<Value>;
    async fn latest_analysis(&self, session: &SessionCredentials) -> Result<Value>;
    async fn statistics(&self, session: &SessionCredentials) -> Result<AnalysisStatistics>;
    async fn current_user(&self, session: &SessionCredentials) -> Result<Value>;
}

/// Operations that can be scripted to fail on [`InMemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SearchMovies,
    SearchAndSave,
    ListPreferences,
    SavePreference,
    TriggerAnalysis,
    LatestAnalysis,
    Statistics,
    CurrentUser,
}

#[derive(Debug, Default)]
struct UserData {
    ratings: Vec<(MovieId, Rating)>,
    latest_analysis: Option<Value>,
}

/// In-memory implementation of [`Backend`] mirroring the remote contract:
/// sessions are keyed by session id, writes need a CSRF token, preferences
/// are update-or-create per movie, and analysis needs five ratings.
pub struct InMemoryBackend {
    catalog: Arc<DashMap<MovieId, Movie>>,
    external: Arc<DashMap<String, Vec<Movie>>>,
    users: Arc<DashMap<String, UserData>>,
    failures: Mutex<HashMap<Operation, Error>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(DashMap::new()),
            external: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Add movies to the local catalog.
    pub fn with_movies(self, movies: impl IntoIterator<Item = Movie>) -> Self {
        for movie in movies {
            self.catalog.insert(movie.id, movie);
        }
        self
    }

    /// Movies the external lookup returns (and saves) for `query`.
    pub fn with_external(self, query: impl Into<String>, movies: Vec<Movie>) -> Self {
        self.external.insert(query.into().to_lowercase(), movies);
        self
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: Error) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(op, error);
        }
    }

    /// Ratings stored for a session id, in insertion order.
    pub fn stored_ratings(&self, session_id: &str) -> Vec<(MovieId, Rating)> {
        self.users
            .get(session_id)
            .map(|user| user.ratings.clone())
            .unwrap_or_default()
    }

    fn take_failure(&self, op: Operation) -> Result<()> {
        let scripted = self.failures.lock().ok().and_then(|mut f| f.remove(&op));
        match scripted {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn authenticate<'a>(&self, session: &'a SessionCredentials) -> Result<&'a str> {
        session.session_id.as_deref().ok_or_else(|| {
            Error::from_status(403, "Authentication credentials were not provided.".into())
        })
    }

    fn authenticate_write<'a>(&self, session: &'a SessionCredentials) -> Result<&'a str> {
        let session_id = self.authenticate(session)?;
        if session.csrf_token.is_none() {
            return Err(Error::from_status(
                403,
                "CSRF Failed: CSRF token missing.".into(),
            ));
        }
        Ok(session_id)
    }

    fn compute_analysis(&self, ratings: &[(MovieId, Rating)]) -> Value {
        let count = ratings.len();
        let mean = ratings.iter().map(|(_, r)| r.get() as f64).sum::<f64>() / count as f64;
        let base = (mean - 1.0) / 4.0;
        let score = |offset: f64| (base + offset).clamp(0.0, 1.0);
        let confidence = (count as f64 / 10.0).min(1.0);

        json!({
            "success": true,
            "message": format!("{count}편의 영화를 분석하여 성격 특성을 도출했습니다."),
            "confidence": confidence,
            "data": {
                "personality": {
                    "openness": score(0.10),
                    "conscientiousness": score(0.02),
                    "extraversion": score(0.05),
                    "agreeableness": score(0.0),
                    "neuroticism": score(-0.20),
                    "movies_analyzed": count,
                },
                "values": {
                    "creativity_innovation": score(0.15),
                    "social_connection": score(0.05),
                    "achievement_success": score(-0.05),
                    "harmony_stability": score(-0.10),
                    "authenticity_depth": score(0.0),
                }
            }
        })
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn search_movies(&self, _session: &SessionCredentials, query: &str) -> Result<Vec<Movie>> {
        self.take_failure(Operation::SearchMovies)?;
        let needle = query.to_lowercase();
        let mut movies: Vec<Movie> = self
            .catalog
            .iter()
            .filter(|entry| entry.title.to_lowercase().contains(&needle))
            .map(|entry| entry.value().clone())
            .collect();
        movies.sort_by_key(|m| m.id);
        movies.truncate(20);
        Ok(movies)
    }

    async fn search_and_save(
        &self,
        session: &SessionCredentials,
        query: &str,
    ) -> Result<SavedMovies> {
        self.take_failure(Operation::SearchAndSave)?;
        self.authenticate_write(session)?;
        let movies = self
            .external
            .get(&query.to_lowercase())
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        for movie in &movies {
            self.catalog.insert(movie.id, movie.clone());
        }
        Ok(SavedMovies {
            message: format!("\"{query}\" 검색 완료"),
            movies,
        })
    }

    async fn list_preferences(&self, session: &SessionCredentials) -> Result<Vec<Preference>> {
        self.take_failure(Operation::ListPreferences)?;
        let session_id = self.authenticate(session)?;
        let ratings = self.stored_ratings(session_id);
        ratings
            .into_iter()
            .map(|(movie_id, rating)| {
                let movie = self
                    .catalog
                    .get(&movie_id)
                    .map(|m| m.value().clone())
                    .ok_or_else(|| Error::NotFound(format!("movie {movie_id}")))?;
                Ok(Preference {
                    movie,
                    rating,
                    created_at: None,
                })
            })
            .collect()
    }

    async fn save_preference(
        &self,
        session: &SessionCredentials,
        movie_id: MovieId,
        rating: Rating,
    ) -> Result<RatingAction> {
        self.take_failure(Operation::SavePreference)?;
        let session_id = self.authenticate_write(session)?;
        if !self.catalog.contains_key(&movie_id) {
            return Err(Error::NotFound(format!(
                "movie_id {movie_id}에 해당하는 영화가 없습니다."
            )));
        }
        let mut user = self.users.entry(session_id.to_string()).or_default();
        match user.ratings.iter_mut().find(|(id, _)| *id == movie_id) {
            Some(existing) => {
                existing.1 = rating;
                Ok(RatingAction::Updated)
            }
            None => {
                user.ratings.push((movie_id, rating));
                Ok(RatingAction::Created)
            }
        }
    }

    async fn trigger_analysis(&self, session: &SessionCredentials) -> Result<Value> {
        self.take_failure(Operation::TriggerAnalysis)?;
        let session_id = self.authenticate_write(session)?;
        let mut user = self.users.entry(session_id.to_string()).or_default();
        if user.ratings.len() < MIN_RATINGS_FOR_ANALYSIS {
            return Err(Error::BadRequest(format!(
                "분석을 위해 최소 {MIN_RATINGS_FOR_ANALYSIS}편의 영화 평가가 필요합니다."
            )));
        }
        let analysis = self.compute_analysis(&user.ratings);
        user.latest_analysis = Some(analysis.clone());
        Ok(analysis)
    }

    async fn latest_analysis(&self, session: &SessionCredentials) -> Result<Value> {
        self.take_failure(Operation::LatestAnalysis)?;
        let session_id = self.authenticate(session)?;
        self.users
            .get(session_id)
            .and_then(|user| user.latest_analysis.clone())
            .ok_or_else(|| Error::NotFound("분석 결과가 없습니다.".into()))
    }

    async fn statistics(&self, session: &SessionCredentials) -> Result<AnalysisStatistics> {
        self.take_failure(Operation::Statistics)?;
        let session_id = self.authenticate(session)?;
        let total = self.stored_ratings(session_id).len();
        Ok(AnalysisStatistics {
            total_movies_rated: total as u32,
            analysis_ready: total >= MIN_RATINGS_FOR_ANALYSIS,
            min_movies_required: MIN_RATINGS_FOR_ANALYSIS as u32,
        })
    }

    async fn current_user(&self, session: &SessionCredentials) -> Result<Value> {
        self.take_failure(Operation::CurrentUser)?;
        let session_id = self.authenticate(session)?;
        Ok(json!({ "session": session_id, "is_authenticated": true }))
    }
}
