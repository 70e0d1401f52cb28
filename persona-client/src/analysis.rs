use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    backend::Backend,
    credentials::SessionCredentials,
    error::{Error, Result},
    interpreter::{AnalysisResult, interpret},
    model::AnalysisStatistics,
};

/// What to show right after an analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSummary {
    pub movies_analyzed: usize,
    pub confidence_percent: u32,
    pub result: AnalysisResult,
}

impl TriggerSummary {
    /// Prefers a non-zero `data.personality.movies_analyzed` count and
    /// falls back to the caller's evaluated-movie count.
    pub fn from_response(raw: &Value, evaluated_count: usize) -> Self {
        let movies_analyzed = raw
            .pointer("/data/personality/movies_analyzed")
            .and_then(Value::as_u64)
            .filter(|&n| n > 0)
            .map(|n| n as usize)
            .unwrap_or(evaluated_count);
        let result = interpret(raw);
        Self {
            movies_analyzed,
            confidence_percent: result.confidence_percent(),
            result,
        }
    }
}

/// Triggers analyses and fetches their results for one session.
pub struct AnalysisService {
    backend: Arc<dyn Backend>,
    session: SessionCredentials,
}

impl AnalysisService {
    pub fn new(backend: Arc<dyn Backend>, session: SessionCredentials) -> Self {
        Self { backend, session }
    }

    /// Ask the backend to compute a new analysis.
    ///
    /// The backend enforces its own minimum; its 400 comes back as
    /// [`Error::InsufficientRatings`] even when the local gate passed.
    pub async fn trigger(&self, evaluated_count: usize) -> Result<TriggerSummary> {
        info!(evaluated_count, "requesting personality analysis");
        let raw = self
            .backend
            .trigger_analysis(&self.session)
            .await
            .map_err(|e| {
                warn!(error = %e, "analysis request failed");
                match e {
                    Error::BadRequest(detail) => Error::InsufficientRatings(detail),
                    other => other.into_auth_expired(),
                }
            })?;

        let summary = TriggerSummary::from_response(&raw, evaluated_count);
        info!(
            movies_analyzed = summary.movies_analyzed,
            confidence = summary.confidence_percent,
            "analysis completed"
        );
        Ok(summary)
    }

    /// Latest analysis, normalized. `NotFound` means none has run yet.
    pub async fn latest(&self) -> Result<AnalysisResult> {
        let raw = self
            .backend
            .latest_analysis(&self.session)
            .await
            .map_err(Error::into_auth_required)?;
        Ok(interpret(&raw))
    }

    pub async fn statistics(&self) -> Result<AnalysisStatistics> {
        self.backend
            .statistics(&self.session)
            .await
            .map_err(Error::into_auth_required)
    }
}
