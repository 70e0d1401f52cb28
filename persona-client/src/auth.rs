use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    backend::Backend,
    credentials::SessionCredentials,
    error::{Error, ForbiddenCause, Result},
};

#[derive(Debug, Clone, PartialEq)]
pub enum DenialReason {
    MissingCredentials,
    CsrfMismatch,
    Forbidden(String),
    Http { status: Option<u16>, detail: String },
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Authenticated,
    Denied(DenialReason),
}

impl DenialReason {
    pub fn guidance(&self) -> String {
        match self {
            DenialReason::MissingCredentials => {
                "No credentials were sent. Log in to the backend admin, copy the session cookie, and retry.".into()
            }
            DenialReason::CsrfMismatch => {
                "The CSRF token was rejected. Clear the site cookies, log in again, and retry.".into()
            }
            DenialReason::Forbidden(detail) => format!("403 Forbidden: {detail}"),
            DenialReason::Http { status, detail } => match status {
                Some(status) => format!("HTTP {status}: {detail}"),
                None => detail.clone(),
            },
            DenialReason::Unreachable => {
                "Cannot connect to the server. Check that the backend is running.".into()
            }
        }
    }
}

/// Probe an authenticated endpoint and explain why access fails, if it does.
pub async fn check_auth(backend: &Arc<dyn Backend>, session: &SessionCredentials) -> AuthStatus {
    match backend.list_preferences(session).await {
        Ok(_) => {
            info!("session is authenticated");
            AuthStatus::Authenticated
        }
        Err(err) => {
            warn!(error = %err, "authentication check failed");
            AuthStatus::Denied(denial_reason(err))
        }
    }
}

/// Raw user object from the auth endpoint.
pub async fn current_user(backend: &Arc<dyn Backend>, session: &SessionCredentials) -> Result<Value> {
    backend
        .current_user(session)
        .await
        .map_err(Error::into_auth_required)
}

fn denial_reason(err: Error) -> DenialReason {
    match err {
        Error::Forbidden(cause) | Error::AuthRequired(cause) | Error::AuthExpired(cause) => {
            match cause {
                ForbiddenCause::MissingCredentials => DenialReason::MissingCredentials,
                ForbiddenCause::CsrfMismatch => DenialReason::CsrfMismatch,
                ForbiddenCause::Other(detail) => DenialReason::Forbidden(detail),
            }
        }
        Error::NetworkUnreachable(_) => DenialReason::Unreachable,
        Error::NotFound(detail) | Error::BadRequest(detail) => DenialReason::Http {
            status: None,
            detail,
        },
        Error::ServerError { status, detail } => DenialReason::Http {
            status: Some(status),
            detail,
        },
        Error::Unclassified { status, detail } => DenialReason::Http { status, detail },
        other => DenialReason::Http {
            status: None,
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixtures::session;
    use crate::backend::{InMemoryBackend, Operation};

    #[tokio::test]
    async fn valid_session_is_authenticated() {
        let backend: Arc<dyn Backend> = Arc::new(InMemoryBackend::new());
        assert_eq!(check_auth(&backend, &session()).await, AuthStatus::Authenticated);
        assert!(current_user(&backend, &session()).await.is_ok());
    }

    #[tokio::test]
    async fn denial_reasons_are_distinguished() {
        let backend: Arc<dyn Backend> = Arc::new(InMemoryBackend::new());
        assert_eq!(
            check_auth(&backend, &SessionCredentials::anonymous()).await,
            AuthStatus::Denied(DenialReason::MissingCredentials)
        );
        assert!(matches!(
            current_user(&backend, &SessionCredentials::anonymous()).await,
            Err(Error::AuthRequired(ForbiddenCause::MissingCredentials))
        ));

        let scripted = InMemoryBackend::new();
        scripted.fail_next(
            Operation::ListPreferences,
            Error::from_status(403, "CSRF Failed: Origin checking failed.".into()),
        );
        let scripted: Arc<dyn Backend> = Arc::new(scripted);
        assert_eq!(
            check_auth(&scripted, &session()).await,
            AuthStatus::Denied(DenialReason::CsrfMismatch)
        );
    }

    #[test]
    fn other_failures_map_to_http_or_unreachable() {
        assert_eq!(
            denial_reason(Error::NetworkUnreachable("refused".into())),
            DenialReason::Unreachable
        );
        assert_eq!(
            denial_reason(Error::ServerError {
                status: 500,
                detail: "x".into()
            }),
            DenialReason::Http {
                status: Some(500),
                detail: "x".into()
            }
        );
        assert!(
            DenialReason::Forbidden("nope".into())
                .guidance()
                .contains("403")
        );
    }
}
