pub mod analysis;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod interpreter;
pub mod known;
pub mod model;
pub mod scope;
pub mod session;
pub mod tracker;

// Re-export commonly used types
pub use analysis::{AnalysisService, TriggerSummary};
pub use auth::{AuthStatus, DenialReason, check_auth, current_user};
pub use backend::{Backend, InMemoryBackend, Operation, SavedMovies};
pub use catalog::{MovieCatalog, SearchOutcome, SearchSource};
pub use config::ClientConfig;
pub use credentials::SessionCredentials;
pub use error::{Error, ForbiddenCause, MIN_RATINGS_FOR_ANALYSIS, Result};
pub use http::HttpBackend;
pub use interpreter::{
    AnalysisResult, PersonalityScores, PersonalityTrait, ValueDimension, ValueScores, interpret,
};
pub use known::KnownMovies;
pub use model::{
    AnalysisStatistics, EvaluatedMovie, Movie, MovieId, Preference, Rating, RatingAction,
};
pub use scope::ViewScope;
pub use session::{EvaluationSession, Progress};
pub use tracker::{EvaluationState, PreferenceTracker, RatingOutcome};
