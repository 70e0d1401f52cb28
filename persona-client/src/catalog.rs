use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    backend::Backend,
    credentials::SessionCredentials,
    error::{Error, Result},
    known::KnownMovies,
    model::Movie,
};

/// Where a set of search results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    /// The backend's own catalog.
    Local,
    /// Fetched from the external lookup and saved by the backend.
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub movies: Vec<Movie>,
    pub source: SearchSource,
    pub message: String,
}

/// Title search with an external fallback for cold starts.
pub struct MovieCatalog {
    backend: Arc<dyn Backend>,
    session: SessionCredentials,
    known: KnownMovies,
}

impl MovieCatalog {
    pub fn new(backend: Arc<dyn Backend>, session: SessionCredentials, known: KnownMovies) -> Self {
        Self {
            backend,
            session,
            known,
        }
    }

    /// Search the local catalog; when it has nothing, ask the backend to
    /// look the title up externally. Results are remembered for rating.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let local = self.backend.search_movies(&self.session, query).await?;
        let outcome = if local.is_empty() {
            debug!(query, "no local match, falling back to external lookup");
            let saved = self.backend.search_and_save(&self.session, query).await?;
            let message = if saved.movies.is_empty() {
                "No results. Try a different title.".to_string()
            } else {
                saved.message
            };
            SearchOutcome {
                movies: saved.movies,
                source: SearchSource::External,
                message,
            }
        } else {
            SearchOutcome {
                message: format!("Found {} movies.", local.len()),
                movies: local,
                source: SearchSource::Local,
            }
        };

        self.known.remember_all(&outcome.movies);
        info!(
            query,
            count = outcome.movies.len(),
            source = ?outcome.source,
            "search finished"
        );
        Ok(outcome)
    }
}
