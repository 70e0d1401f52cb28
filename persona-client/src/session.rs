//! EvaluationSession – one user's rating page, wired to one backend.
//!
//! Bundles the [`PreferenceTracker`], [`MovieCatalog`] and
//! [`AnalysisService`] over a shared backend, session and known-movie cache
//! so callers don't have to keep the three in sync by hand.
//!
//! ```rust,no_run
//! # async fn demo() -> persona_client::Result<()> {
//! use persona_client::{ClientConfig, EvaluationSession, SessionCredentials};
//!
//! let session = EvaluationSession::http(
//!     &ClientConfig::default(),
//!     SessionCredentials::from_cookie_header("sessionid=abc; csrftoken=xyz"),
//! )?;
//! session.load().await?;
//! let found = session.search("parasite").await?;
//! if let Some(movie) = found.movies.first() {
//!     session.rate(movie.id, 5).await?;
//! }
//! if session.progress().can_analyze {
//!     let summary = session.analyze().await?;
//!     println!("{}% confidence", summary.confidence_percent);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::info;

use crate::{
    analysis::{AnalysisService, TriggerSummary},
    auth::{self, AuthStatus},
    backend::Backend,
    catalog::{MovieCatalog, SearchOutcome},
    config::ClientConfig,
    credentials::SessionCredentials,
    error::{Error, MIN_RATINGS_FOR_ANALYSIS, Result},
    http::HttpBackend,
    interpreter::AnalysisResult,
    known::KnownMovies,
    model::{AnalysisStatistics, MovieId},
    tracker::{EvaluationState, PreferenceTracker, RatingOutcome},
};

/// How far the user is from being allowed to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub evaluated: usize,
    pub required: usize,
    pub remaining: usize,
    pub can_analyze: bool,
}

pub struct EvaluationSession {
    backend: Arc<dyn Backend>,
    credentials: SessionCredentials,
    tracker: Arc<PreferenceTracker>,
    catalog: MovieCatalog,
    analysis: AnalysisService,
}

impl EvaluationSession {
    pub fn new(backend: Arc<dyn Backend>, credentials: SessionCredentials) -> Self {
        let known = KnownMovies::new();
        Self {
            tracker: Arc::new(PreferenceTracker::new(
                backend.clone(),
                credentials.clone(),
                known.clone(),
            )),
            catalog: MovieCatalog::new(backend.clone(), credentials.clone(), known),
            analysis: AnalysisService::new(backend.clone(), credentials.clone()),
            backend,
            credentials,
        }
    }

    pub fn http(config: &ClientConfig, credentials: SessionCredentials) -> Result<Self> {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config)?);
        Ok(Self::new(backend, credentials))
    }

    /// Shared handle for calls that must outlive a view (see [`crate::ViewScope`]).
    pub fn tracker(&self) -> Arc<PreferenceTracker> {
        self.tracker.clone()
    }

    pub async fn load(&self) -> Result<usize> {
        self.tracker.load_initial().await
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        self.catalog.search(query).await
    }

    pub async fn rate(&self, movie_id: MovieId, rating: i64) -> Result<RatingOutcome> {
        self.tracker.record_rating(movie_id, rating).await
    }

    pub fn state(&self) -> EvaluationState {
        self.tracker.snapshot()
    }

    pub fn progress(&self) -> Progress {
        let state = self.tracker.snapshot();
        Progress {
            evaluated: state.len(),
            required: MIN_RATINGS_FOR_ANALYSIS,
            remaining: state.remaining(),
            can_analyze: state.can_analyze(),
        }
    }

    /// Run an analysis if enough movies are rated locally; the backend's own
    /// minimum check still applies.
    pub async fn analyze(&self) -> Result<TriggerSummary> {
        let progress = self.progress();
        if !progress.can_analyze {
            info!(
                evaluated = progress.evaluated,
                remaining = progress.remaining,
                "analysis not available yet"
            );
            return Err(Error::InsufficientRatings(format!(
                "{} of {} movies rated",
                progress.evaluated, progress.required
            )));
        }
        self.analysis.trigger(progress.evaluated).await
    }

    pub async fn results(&self) -> Result<AnalysisResult> {
        self.analysis.latest().await
    }

    pub async fn statistics(&self) -> Result<AnalysisStatistics> {
        self.analysis.statistics().await
    }

    pub async fn check_auth(&self) -> AuthStatus {
        auth::check_auth(&self.backend, &self.credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::backend::fixtures::{GatedBackend, catalog, session};
    use crate::model::Rating;
    use crate::scope::ViewScope;
    use std::time::Duration;

    fn page() -> (EvaluationSession, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new().with_movies(catalog(6)));
        (EvaluationSession::new(backend.clone(), session()), backend)
    }

    #[tokio::test]
    async fn full_flow_from_search_to_results() {
        let (page, _) = page();
        assert_eq!(page.load().await.unwrap(), 0);
        assert!(matches!(page.results().await, Err(Error::NotFound(_))));

        let found = page.search("Movie").await.unwrap();
        assert_eq!(found.movies.len(), 6);

        for movie in found.movies.iter().take(4) {
            page.rate(movie.id, 4).await.unwrap();
        }
        assert_eq!(
            page.progress(),
            Progress {
                evaluated: 4,
                required: 5,
                remaining: 1,
                can_analyze: false
            }
        );
        assert!(matches!(
            page.analyze().await,
            Err(Error::InsufficientRatings(_))
        ));

        page.rate(found.movies[4].id, 2).await.unwrap();
        assert!(page.progress().can_analyze);

        let summary = page.analyze().await.unwrap();
        assert_eq!(summary.movies_analyzed, 5);
        let results = page.results().await.unwrap();
        assert_eq!(results.movies_analyzed, "5");
        assert_eq!(page.statistics().await.unwrap().total_movies_rated, 5);
    }

    #[tokio::test]
    async fn reload_restores_persisted_ratings() {
        let (first, backend) = page();
        first.search("Movie 3").await.unwrap();
        first.rate(MovieId(3), 5).await.unwrap();

        let second = EvaluationSession::new(backend, session());
        second.load().await.unwrap();
        assert_eq!(second.state().rating(MovieId(3)).map(|r| r.get()), Some(5));
    }

    #[tokio::test]
    async fn detached_scope_does_not_start_a_rating() {
        let (page, backend) = page();
        page.search("Movie 1").await.unwrap();

        let scope = ViewScope::new();
        scope.detach();
        let tracker = page.tracker();
        let delivered = scope
            .run(async move { tracker.record_rating(MovieId(1), 3).await })
            .await;
        assert!(delivered.is_none());
        assert_eq!(page.progress().evaluated, 0);
        assert!(backend.stored_ratings("session-1").is_empty());

        let live = ViewScope::new();
        let tracker = page.tracker();
        let delivered = live
            .run(async move { tracker.record_rating(MovieId(1), 3).await })
            .await;
        assert!(matches!(delivered, Some(Ok(RatingOutcome::Applied { .. }))));
        assert_eq!(page.progress().evaluated, 1);
    }

    #[tokio::test]
    async fn view_detached_mid_flight_still_lets_tracker_apply_result() {
        let backend = Arc::new(GatedBackend::new(
            InMemoryBackend::new().with_movies(catalog(2)),
        ));
        let page = EvaluationSession::new(backend.clone(), session());
        page.search("Movie 1").await.unwrap();

        let scope = ViewScope::new();
        let view = tokio::spawn({
            let scope = scope.clone();
            let tracker = page.tracker();
            async move {
                scope
                    .run(async move { tracker.record_rating(MovieId(1), 4).await })
                    .await
            }
        });

        backend.wait_until_held().await;
        scope.detach();
        assert!(view.await.unwrap().is_none());
        assert_eq!(page.progress().evaluated, 0);

        backend.release();
        tokio::time::timeout(Duration::from_secs(5), async {
            while page.tracker().rating(MovieId(1)).is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(page.tracker().rating(MovieId(1)), Rating::new(4).ok());
        assert_eq!(page.progress().evaluated, 1);
        assert!(page.state().is_consistent());
        assert_eq!(
            backend.stored_ratings("session-1"),
            vec![(MovieId(1), Rating::new(4).unwrap())]
        );
    }

    #[tokio::test]
    async fn auth_check_uses_session_credentials() {
        let backend: Arc<dyn Backend> = Arc::new(InMemoryBackend::new());
        let page = EvaluationSession::new(backend, SessionCredentials::anonymous());
        assert!(matches!(page.check_auth().await, AuthStatus::Denied(_)));
    }
}
