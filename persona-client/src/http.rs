use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    backend::{Backend, SavedMovies},
    config::ClientConfig,
    credentials::{CSRF_HEADER, SessionCredentials},
    error::{Error, Result},
    model::{
        AnalysisStatistics, Movie, MovieId, MovieList, Preference, PreferenceList, Rating,
        RatingAction, SavedMoviesBody,
    },
};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

mod paths {
    pub const MOVIES: &str = "api/movies/";
    pub const SEARCH_AND_SAVE: &str = "api/movies/search_and_save/";
    pub const PREFERENCES: &str = "api/preferences/";
    pub const ANALYZE: &str = "api/analysis/personality/analyze/";
    pub const LATEST: &str = "api/analysis/personality/latest/";
    pub const STATISTICS: &str = "api/analysis/personality/statistics/";
    pub const CURRENT_USER: &str = "api/auth/user/";
}

/// [`Backend`] over HTTP.
///
/// Attaches the session cookie to every request, the CSRF header to mutating
/// ones, and logs each request/response pair under a fresh request id.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn request(
        &self,
        session: &SessionCredentials,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid path {path}: {e}")))?;
        let request_id = Uuid::new_v4().to_string();
        let mutating = is_mutating(&method);

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, &request_id)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(cookie) = session.cookie_header() {
            builder = builder.header(header::COOKIE, cookie);
        }
        if mutating {
            match &session.csrf_token {
                Some(token) => builder = builder.header(CSRF_HEADER, token),
                None => warn!(%request_id, path, "mutating request without a CSRF token"),
            }
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        info!(%request_id, %method, path, "API request");
        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!(%request_id, path, error = %e, "API request failed without a response");
            Error::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            info!(%request_id, status = status.as_u16(), elapsed_ms, "API response");
            let value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            Ok((status, value))
        } else {
            let detail = error_detail(&text);
            warn!(%request_id, status = status.as_u16(), elapsed_ms, %detail, "API error response");
            Err(Error::from_status(status.as_u16(), detail))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        session: &SessionCredentials,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let (_, value) = self.request(session, Method::GET, path, query, None).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn is_mutating(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

/// Pull a human-readable reason from an error body: `detail`, then
/// `error`, then the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("detail")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.trim().to_string(),
    }
}

/// Create-or-update result of a preference write: the `created` flag, then
/// `preference.action` ("저장" / "수정"), then a 201 status.
fn rating_action(status: StatusCode, body: &Value) -> RatingAction {
    let created = body.get("created").and_then(Value::as_bool).or_else(|| {
        match body.pointer("/preference/action").and_then(Value::as_str) {
            Some("저장") => Some(true),
            Some("수정") => Some(false),
            _ => None,
        }
    });
    match created {
        Some(true) => RatingAction::Created,
        Some(false) => RatingAction::Updated,
        None if status == StatusCode::CREATED => RatingAction::Created,
        None => RatingAction::Updated,
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn search_movies(&self, session: &SessionCredentials, query: &str) -> Result<Vec<Movie>> {
        let list: MovieList = self
            .get(session, paths::MOVIES, &[("search", query)])
            .await?;
        debug!(query, count = list.results.len(), "movie search results");
        Ok(list.results)
    }

    async fn search_and_save(
        &self,
        session: &SessionCredentials,
        query: &str,
    ) -> Result<SavedMovies> {
        let (_, value) = self
            .request(
                session,
                Method::POST,
                paths::SEARCH_AND_SAVE,
                &[],
                Some(json!({ "query": query })),
            )
            .await?;
        let saved: SavedMoviesBody = serde_json::from_value(value)?;
        Ok(SavedMovies {
            message: saved.message,
            movies: saved.movies,
        })
    }

    async fn list_preferences(&self, session: &SessionCredentials) -> Result<Vec<Preference>> {
        let list: PreferenceList = self.get(session, paths::PREFERENCES, &[]).await?;
        Ok(list.into_vec())
    }

    async fn save_preference(
        &self,
        session: &SessionCredentials,
        movie_id: MovieId,
        rating: Rating,
    ) -> Result<RatingAction> {
        let (status, value) = self
            .request(
                session,
                Method::POST,
                paths::PREFERENCES,
                &[],
                Some(json!({ "movie_id": movie_id, "rating": rating })),
            )
            .await?;

        Ok(rating_action(status, &value))
    }

    async fn trigger_analysis(&self, session: &SessionCredentials) -> Result<Value> {
        let (_, value) = self
            .request(session, Method::POST, paths::ANALYZE, &[], None)
            .await?;
        Ok(value)
    }

    async fn latest_analysis(&self, session: &SessionCredentials) -> Result<Value> {
        self.get(session, paths::LATEST, &[]).await
    }

    async fn statistics(&self, session: &SessionCredentials) -> Result<AnalysisStatistics> {
        self.get(session, paths::STATISTICS, &[]).await
    }

    async fn current_user(&self, session: &SessionCredentials) -> Result<Value> {
        self.get(session, paths::CURRENT_USER, &[]).await
    }
}
