use reqwest::StatusCode;
use thiserror::Error;

/// Non-success response from one of the REST APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{system}: authentication failed ({status})")]
    Unauthorized {
        system: &'static str,
        status: StatusCode,
    },
    #[error("{system}: {what} not found")]
    NotFound { system: &'static str, what: String },
    #[error("{system} rejected request ({status}): {body}")]
    Rejected {
        system: &'static str,
        status: StatusCode,
        body: String,
    },
}

impl ApiError {
    pub fn from_status(system: &'static str, what: &str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { system, status },
            StatusCode::NOT_FOUND => Self::NotFound {
                system,
                what: what.to_string(),
            },
            _ => Self::Rejected {
                system,
                status,
                body,
            },
        }
    }
}

/// Turn a non-success response into an [`ApiError`], passing successful ones through.
pub async fn check_response(
    system: &'static str,
    what: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_status(system, what, status, body))
}
