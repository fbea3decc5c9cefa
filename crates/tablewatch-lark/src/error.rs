//! Error taxonomy for Lark API calls.
//!
//! Every failure is either transient (worth retrying later) or fatal. The
//! split is exposed through [`LarkError::is_retryable`] so background pollers
//! can decide between backing off and giving up.
use reqwest::StatusCode;

/// Credential failures reported by the auth and drive endpoints.
pub const CODE_INVALID_APP_ID: i64 = 99991600;
pub const CODE_INVALID_APP_SECRET: i64 = 99991601;

/// Codes returned when a bitable endpoint was handed a wiki node token.
const WIKI_HINT_CODES: [i64; 3] = [91402, 99991663, 1254003];

/// Rate limiting, write conflicts, and internal errors that clear up on their own.
const TRANSIENT_CODES: [i64; 7] = [
    99991400, 1254290, 1254291, 1254607, 1255001, 1255002, 1255040,
];

pub type LarkResult<T> = Result<T, LarkError>;

#[derive(Debug, thiserror::Error)]
pub enum LarkError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("lark api error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl LarkError {
    /// Whether the failure is likely to clear up if the same call is repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            LarkError::Http(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            LarkError::Status { status, .. } => StatusCode::from_u16(*status)
                .map(is_transient_status)
                .unwrap_or(false),
            LarkError::Api { code, .. } => TRANSIENT_CODES.contains(code),
            LarkError::InvalidCredentials(_) | LarkError::Decode(_) | LarkError::NotFound(_) => {
                false
            }
        }
    }

    /// Whether the error suggests the token passed was a wiki node rather than a bitable.
    pub fn is_wiki_hint(&self) -> bool {
        matches!(self, LarkError::Api { code, .. } if WIKI_HINT_CODES.contains(code))
    }

    pub fn is_auth_failure(&self) -> bool {
        match self {
            LarkError::InvalidCredentials(_) => true,
            LarkError::Api { code, .. } => {
                *code == CODE_INVALID_APP_ID || *code == CODE_INVALID_APP_SECRET
            }
            _ => false,
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
    ) || status.as_u16() == 425
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: i64) -> LarkError {
        LarkError::Api {
            code,
            msg: "test".to_string(),
        }
    }

    fn status(status: u16) -> LarkError {
        LarkError::Status {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn server_side_statuses_are_retryable() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(status(code).is_retryable(), "status {code}");
        }
        for code in [400, 401, 403, 404, 422] {
            assert!(!status(code).is_retryable(), "status {code}");
        }
    }

    #[test]
    fn api_codes_split_into_transient_and_fatal() {
        assert!(api(99991400).is_retryable());
        assert!(api(1255040).is_retryable());
        assert!(!api(1254004).is_retryable());
        assert!(!api(CODE_INVALID_APP_ID).is_retryable());
    }

    #[test]
    fn wiki_hint_codes_are_recognized() {
        assert!(api(91402).is_wiki_hint());
        assert!(api(1254003).is_wiki_hint());
        assert!(!api(1254004).is_wiki_hint());
        assert!(!status(404).is_wiki_hint());
    }

    #[test]
    fn auth_failures_cover_codes_and_local_checks() {
        assert!(api(CODE_INVALID_APP_SECRET).is_auth_failure());
        assert!(LarkError::InvalidCredentials("short".into()).is_auth_failure());
        assert!(!api(91402).is_auth_failure());
        assert!(!LarkError::NotFound("x".into()).is_retryable());
    }
}
