//! Session identity passed explicitly into the client.
//!
//! The backend authenticates with a cookie session and expects the CSRF
//! token from the `csrftoken` cookie echoed in an `X-CSRFToken` header on
//! every mutating request.

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
}

impl SessionCredentials {
    pub fn new(session_id: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            csrf_token: Some(csrf_token.into()),
        }
    }

    /// No session at all; every protected call answers 403.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Parse a browser-style `Cookie` header (`a=1; sessionid=...; csrftoken=...`).
    pub fn from_cookie_header(header: &str) -> Self {
        let mut credentials = Self::default();
        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match name.trim() {
                SESSION_COOKIE => credentials.session_id = Some(value.to_string()),
                CSRF_COOKIE => credentials.csrf_token = Some(value.to_string()),
                _ => {}
            }
        }
        credentials
    }

    /// Value for the outgoing `Cookie` header, if there is anything to send.
    pub fn cookie_header(&self) -> Option<String> {
        let parts: Vec<String> = [
            (SESSION_COOKIE, &self.session_id),
            (CSRF_COOKIE, &self.csrf_token),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}={v}")))
        .collect();

        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookie_header() {
        let creds =
            SessionCredentials::from_cookie_header("theme=dark; sessionid=abc123 ; csrftoken=tok");
        assert_eq!(creds, SessionCredentials::new("abc123", "tok"));
        assert_eq!(
            creds.cookie_header().as_deref(),
            Some("sessionid=abc123; csrftoken=tok")
        );
    }

    #[test]
    fn anonymous_sends_nothing() {
        assert!(SessionCredentials::anonymous().cookie_header().is_none());
        let only_csrf = SessionCredentials::from_cookie_header("csrftoken=t; sessionid=");
        assert_eq!(only_csrf.session_id, None);
        assert_eq!(only_csrf.cookie_header().as_deref(), Some("csrftoken=t"));
    }
}
