//! Client-side view of which movies this session has rated.
//!
//! [`PreferenceTracker`] owns an [`EvaluationState`]: a rating map keyed by
//! movie id plus the ordered list of evaluated movies. Both are kept behind a
//! single lock and only change after the backend confirms a call, so an
//! observer never sees one updated without the other.
//!
//! Concurrent ratings for the same movie are sequenced: each call takes a
//! ticket before it goes out, and a confirmation carrying an older ticket
//! than one already applied for that movie is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::{
    backend::Backend,
    credentials::SessionCredentials,
    error::{Error, MIN_RATINGS_FOR_ANALYSIS, Result},
    known::KnownMovies,
    model::{EvaluatedMovie, Movie, MovieId, Preference, Rating, RatingAction},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationState {
    ratings: HashMap<MovieId, Rating>,
    evaluated: Vec<EvaluatedMovie>,
}

impl EvaluationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full replace from the persisted preference list. A repeated movie
    /// keeps its position and takes the later rating.
    pub fn from_preferences(preferences: Vec<Preference>) -> Self {
        let mut state = Self::new();
        for pref in preferences {
            state.apply(pref.movie, pref.rating);
        }
        state
    }

    pub fn rating(&self, id: MovieId) -> Option<Rating> {
        self.ratings.get(&id).copied()
    }

    pub fn ratings(&self) -> &HashMap<MovieId, Rating> {
        &self.ratings
    }

    pub fn evaluated(&self) -> &[EvaluatedMovie] {
        &self.evaluated
    }

    pub fn len(&self) -> usize {
        self.evaluated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluated.is_empty()
    }

    pub fn can_analyze(&self) -> bool {
        self.evaluated.len() >= MIN_RATINGS_FOR_ANALYSIS
    }

    /// Ratings still needed before an analysis may be requested.
    pub fn remaining(&self) -> usize {
        MIN_RATINGS_FOR_ANALYSIS.saturating_sub(self.evaluated.len())
    }

    /// Every map key has exactly one list entry with the same rating, and
    /// vice versa.
    pub fn is_consistent(&self) -> bool {
        self.ratings.len() == self.evaluated.len()
            && self
                .evaluated
                .iter()
                .all(|e| self.ratings.get(&e.movie.id) == Some(&e.rating))
    }

    fn apply(&mut self, movie: Movie, rating: Rating) -> Option<Rating> {
        let previous = self.ratings.insert(movie.id, rating);
        match self.evaluated.iter_mut().find(|e| e.movie.id == movie.id) {
            Some(entry) => entry.rating = rating,
            None => self.evaluated.push(EvaluatedMovie { movie, rating }),
        }
        debug_assert!(self.is_consistent());
        previous
    }
}

/// What a confirmed rating did to the local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    Applied {
        action: RatingAction,
        previous: Option<Rating>,
    },
    /// A later rating for the same movie was already applied.
    Superseded,
}

#[derive(Debug, Default)]
struct Inner {
    state: EvaluationState,
    applied_tickets: HashMap<MovieId, u64>,
}

pub struct PreferenceTracker {
    backend: Arc<dyn Backend>,
    session: SessionCredentials,
    known: KnownMovies,
    inner: RwLock<Inner>,
    next_ticket: AtomicU64,
}

impl PreferenceTracker {
    pub fn new(backend: Arc<dyn Backend>, session: SessionCredentials, known: KnownMovies) -> Self {
        Self {
            backend,
            session,
            known,
            inner: RwLock::new(Inner::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &SessionCredentials {
        &self.session
    }

    pub fn known(&self) -> &KnownMovies {
        &self.known
    }

    /// Cold load of persisted preferences; replaces the state on success.
    ///
    /// A 403 becomes [`Error::AuthRequired`]. Any failure leaves the state
    /// untouched.
    pub async fn load_initial(&self) -> Result<usize> {
        let preferences = self
            .backend
            .list_preferences(&self.session)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to load preferences");
                e.into_auth_required()
            })?;

        self.known.remember_all(preferences.iter().map(|p| &p.movie));
        let state = EvaluationState::from_preferences(preferences);
        let count = state.len();
        {
            let mut inner = self.write();
            inner.state = state;
            inner.applied_tickets.clear();
        }

        info!(count, "loaded persisted preferences");
        Ok(count)
    }

    /// Persist a rating, then mirror it locally.
    ///
    /// `rating` outside 1..=5 and movies never seen are rejected before any
    /// request. On failure nothing changes; a 403 becomes
    /// [`Error::AuthExpired`].
    pub async fn record_rating(&self, movie_id: MovieId, rating: i64) -> Result<RatingOutcome> {
        let rating = Rating::new(rating)?;
        let movie = self
            .known
            .get(movie_id)
            .or_else(|| {
                self.read()
                    .state
                    .evaluated
                    .iter()
                    .find(|e| e.movie.id == movie_id)
                    .map(|e| e.movie.clone())
            })
            .ok_or(Error::UnknownMovie(movie_id))?;

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%movie_id, rating = rating.get(), ticket, "submitting rating");

        let action = self
            .backend
            .save_preference(&self.session, movie_id, rating)
            .await
            .map_err(|e| {
                warn!(%movie_id, error = %e, "failed to save rating");
                e.into_auth_expired()
            })?;

        let mut inner = self.write();
        let last = inner.applied_tickets.get(&movie_id).copied().unwrap_or(0);
        if last > ticket {
            info!(%movie_id, ticket, last, "discarding superseded rating confirmation");
            return Ok(RatingOutcome::Superseded);
        }
        inner.applied_tickets.insert(movie_id, ticket);
        let previous = inner.state.apply(movie, rating);

        info!(%movie_id, rating = rating.get(), ?action, "rating recorded");
        Ok(RatingOutcome::Applied { action, previous })
    }

    pub fn can_analyze(&self) -> bool {
        self.read().state.can_analyze()
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> EvaluationState {
        self.read().state.clone()
    }

    pub fn rating(&self, movie_id: MovieId) -> Option<Rating> {
        self.read().state.rating(movie_id)
    }

    pub fn evaluated_count(&self) -> usize {
        self.read().state.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixtures::{GatedBackend, catalog, movie, session};
    use crate::backend::{InMemoryBackend, Operation};
    use crate::error::ForbiddenCause;

    fn tracker_with(backend: Arc<InMemoryBackend>, known_ids: i64) -> PreferenceTracker {
        let known = KnownMovies::new();
        known.remember_all(&catalog(known_ids));
        PreferenceTracker::new(backend, session(), known)
    }

    fn backend(n: i64) -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::new().with_movies(catalog(n)))
    }

    #[tokio::test]
    async fn new_rating_appends_and_repeat_rating_replaces() {
        let tracker = tracker_with(backend(3), 3);

        tracker.record_rating(MovieId(1), 4).await.unwrap();
        assert_eq!(tracker.evaluated_count(), 1);

        tracker.record_rating(MovieId(2), 5).await.unwrap();
        assert_eq!(tracker.evaluated_count(), 2);

        let outcome = tracker.record_rating(MovieId(1), 2).await.unwrap();
        assert_eq!(
            outcome,
            RatingOutcome::Applied {
                action: RatingAction::Updated,
                previous: Some(Rating::new(4).unwrap()),
            }
        );

        let state = tracker.snapshot();
        assert_eq!(state.len(), 2);
        assert_eq!(state.rating(MovieId(1)), Rating::new(2).ok());
        assert_eq!(
            state
                .evaluated()
                .iter()
                .filter(|e| e.movie.id == MovieId(1))
                .count(),
            1
        );
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn can_analyze_boundary_is_five() {
        let tracker = tracker_with(backend(6), 6);
        assert!(!tracker.can_analyze());

        for id in 1..=4 {
            tracker.record_rating(MovieId(id), 3).await.unwrap();
        }
        assert_eq!(tracker.evaluated_count(), 4);
        assert!(!tracker.can_analyze());
        assert_eq!(tracker.snapshot().remaining(), 1);

        tracker.record_rating(MovieId(5), 3).await.unwrap();
        assert!(tracker.can_analyze());

        tracker.record_rating(MovieId(6), 3).await.unwrap();
        assert!(tracker.can_analyze());
        assert_eq!(tracker.snapshot().remaining(), 0);
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_before_any_request() {
        let backend = backend(1);
        let tracker = tracker_with(backend.clone(), 1);

        for bad in [0, 6, -1] {
            assert_eq!(
                tracker.record_rating(MovieId(1), bad).await.unwrap_err(),
                Error::InvalidRating(bad)
            );
        }
        assert!(backend.stored_ratings("session-1").is_empty());
    }

    #[tokio::test]
    async fn unknown_movie_is_rejected() {
        let tracker = tracker_with(backend(2), 1);
        assert_eq!(
            tracker.record_rating(MovieId(2), 3).await.unwrap_err(),
            Error::UnknownMovie(MovieId(2))
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let backend = backend(2);
        let tracker = tracker_with(backend.clone(), 2);
        tracker.record_rating(MovieId(1), 4).await.unwrap();
        let before = tracker.snapshot();

        backend.fail_next(
            Operation::SavePreference,
            Error::ServerError {
                status: 500,
                detail: "Internal Server Error".into(),
            },
        );
        let err = tracker.record_rating(MovieId(2), 5).await.unwrap_err();
        assert!(matches!(err, Error::ServerError { status: 500, .. }));
        assert_eq!(tracker.snapshot(), before);

        backend.fail_next(
            Operation::SavePreference,
            Error::ServerError {
                status: 500,
                detail: "Internal Server Error".into(),
            },
        );
        tracker.record_rating(MovieId(1), 1).await.unwrap_err();
        assert_eq!(tracker.snapshot(), before);
    }

    #[tokio::test]
    async fn forbidden_write_is_auth_expired() {
        let backend = backend(1);
        let known = KnownMovies::new();
        known.remember(movie(1, "Movie 1"));
        let no_csrf = SessionCredentials {
            session_id: Some("session-1".into()),
            csrf_token: None,
        };
        let tracker = PreferenceTracker::new(backend, no_csrf, known);

        let err = tracker.record_rating(MovieId(1), 3).await.unwrap_err();
        assert_eq!(err, Error::AuthExpired(ForbiddenCause::CsrfMismatch));
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn load_initial_replaces_state() {
        let backend = backend(3);
        let s = session();
        backend
            .save_preference(&s, MovieId(2), Rating::new(5).unwrap())
            .await
            .unwrap();
        backend
            .save_preference(&s, MovieId(3), Rating::new(1).unwrap())
            .await
            .unwrap();

        let tracker = PreferenceTracker::new(backend, s, KnownMovies::new());
        assert_eq!(tracker.load_initial().await.unwrap(), 2);

        let state = tracker.snapshot();
        assert_eq!(state.rating(MovieId(2)), Rating::new(5).ok());
        assert!(state.is_consistent());
        // movies from the preference list can be re-rated without a search
        tracker.record_rating(MovieId(3), 4).await.unwrap();
        assert_eq!(tracker.rating(MovieId(3)), Rating::new(4).ok());
    }

    #[tokio::test]
    async fn load_initial_starts_ticket_history_over() {
        let backend = backend(2);
        let tracker = tracker_with(backend, 2);
        tracker.record_rating(MovieId(1), 4).await.unwrap();
        assert_eq!(tracker.read().applied_tickets.len(), 1);

        tracker.load_initial().await.unwrap();
        assert!(tracker.read().applied_tickets.is_empty());
        assert_eq!(tracker.rating(MovieId(1)), Rating::new(4).ok());

        // ratings issued after the reload still apply
        tracker.record_rating(MovieId(1), 5).await.unwrap();
        assert_eq!(tracker.rating(MovieId(1)), Rating::new(5).ok());
    }

    #[tokio::test]
    async fn load_without_credentials_is_auth_required() {
        let tracker =
            PreferenceTracker::new(backend(1), SessionCredentials::anonymous(), KnownMovies::new());
        let err = tracker.load_initial().await.unwrap_err();
        assert_eq!(err, Error::AuthRequired(ForbiddenCause::MissingCredentials));
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn load_failure_is_surfaced_and_state_stays_empty() {
        let backend = backend(1);
        backend.fail_next(
            Operation::ListPreferences,
            Error::NetworkUnreachable("connection refused".into()),
        );
        let tracker = PreferenceTracker::new(backend, session(), KnownMovies::new());
        assert!(matches!(
            tracker.load_initial().await,
            Err(Error::NetworkUnreachable(_))
        ));
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn duplicate_preferences_collapse_on_load() {
        let prefs = vec![
            Preference {
                movie: movie(1, "a"),
                rating: Rating::new(4).unwrap(),
                created_at: None,
            },
            Preference {
                movie: movie(2, "b"),
                rating: Rating::new(3).unwrap(),
                created_at: None,
            },
            Preference {
                movie: movie(1, "a"),
                rating: Rating::new(2).unwrap(),
                created_at: None,
            },
        ];
        let state = EvaluationState::from_preferences(prefs);
        assert_eq!(state.len(), 2);
        assert_eq!(state.evaluated()[0].rating, Rating::new(2).unwrap());
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn late_confirmation_of_older_rating_is_discarded() {
        let backend = Arc::new(GatedBackend::new(
            InMemoryBackend::new().with_movies(catalog(1)),
        ));
        let known = KnownMovies::new();
        known.remember(movie(1, "Movie 1"));
        let tracker = Arc::new(PreferenceTracker::new(backend.clone(), session(), known));

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.record_rating(MovieId(1), 4).await }
        });
        // let the first call take its ticket and park at the gate
        backend.wait_until_held().await;

        let second = tracker.record_rating(MovieId(1), 2).await.unwrap();
        assert!(matches!(second, RatingOutcome::Applied { .. }));

        backend.release();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, RatingOutcome::Superseded);

        let state = tracker.snapshot();
        assert_eq!(state.len(), 1);
        assert_eq!(state.rating(MovieId(1)), Rating::new(2).ok());
    }
}
