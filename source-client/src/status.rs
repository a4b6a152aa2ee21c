use painpoint_core::{CoreError, Source, SourceApiError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Map a non-success HTTP status to the error callers classify on.
pub(crate) fn error_for_status(
    source: Source,
    status: StatusCode,
    headers: &HeaderMap,
    endpoint: &str,
    subreddit: Option<&str>,
) -> CoreError {
    let error = match status.as_u16() {
        429 => SourceApiError::RateLimitExceeded {
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 => SourceApiError::InvalidToken,
        403 => SourceApiError::Blocked {
            source_name: source,
            status_code: 403,
        },
        404 => match subreddit {
            Some(subreddit) => SourceApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            },
            None => SourceApiError::HttpStatus {
                status_code: 404,
                endpoint: endpoint.to_string(),
            },
        },
        code if status.is_server_error() => SourceApiError::ServerError { status_code: code },
        code => SourceApiError::HttpStatus {
            status_code: code,
            endpoint: endpoint.to_string(),
        },
    };
    error.into()
}

/// Transport failures before any status was received.
pub(crate) fn error_for_send(error: reqwest::Error) -> CoreError {
    if error.is_timeout() {
        SourceApiError::RequestTimeout.into()
    } else {
        CoreError::Network(error)
    }
}
