// src/session/error.rs
//! Guest API error taxonomy and classification.
//!
//! The service mostly signals limit conditions through human-readable
//! message text; newer deployments also send a structured `error_code`.
//! Classification checks the code first, then falls back to substring
//! matching in strict priority order: rate-limit, daily-limit,
//! insufficient-credits, raw passthrough. Rate-limit wins ties because
//! it is the most restrictive condition (24h lockout vs same-day reset).

use thiserror::Error;

use crate::types::session::ApiErrorBody;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestError {
    #[error("Too many guest sessions from this location. Try again in 24 hours or sign in.")]
    RateLimitExceeded,

    #[error("The free daily analysis limit has been reached. Come back tomorrow or sign in.")]
    DailyLimitExceeded,

    #[error("No free analyses left on this guest session. Sign up to keep going.")]
    InsufficientCredits,

    #[error("Guest session expired or not recognized")]
    SessionInvalid,

    #[error("The analysis service took too long to respond")]
    ConnectionTimeout,

    #[error("Could not reach the analysis service")]
    NetworkFailure,

    #[error("Could not start a guest session: {0}")]
    SessionCreation(String),

    #[error("{0}")]
    Generic(String),
}

const RATE_LIMIT_PHRASES: [&str; 2] = ["rate limit", "rate_limit"];
const DAILY_LIMIT_PHRASES: [&str; 2] = ["daily limit", "daily_limit"];
const CREDIT_PHRASES: [&str; 2] = ["insufficient credit", "insufficient_credit"];

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// Classify a server-supplied error. `error_code` wins when present and
/// recognized; unknown codes fall through to message matching so a new
/// backend code never degrades below the text-based behavior.
pub fn classify(error_code: Option<&str>, message: &str) -> GuestError {
    if let Some(code) = error_code {
        match code {
            "RATE_LIMIT_EXCEEDED" => return GuestError::RateLimitExceeded,
            "DAILY_LIMIT_EXCEEDED" => return GuestError::DailyLimitExceeded,
            "INSUFFICIENT_CREDITS" => return GuestError::InsufficientCredits,
            "SESSION_INVALID" | "SESSION_EXPIRED" => return GuestError::SessionInvalid,
            _ => {}
        }
    }

    let lower = message.to_lowercase();
    if contains_any(&lower, &RATE_LIMIT_PHRASES) {
        GuestError::RateLimitExceeded
    } else if contains_any(&lower, &DAILY_LIMIT_PHRASES) {
        GuestError::DailyLimitExceeded
    } else if contains_any(&lower, &CREDIT_PHRASES) {
        GuestError::InsufficientCredits
    } else {
        GuestError::Generic(message.to_string())
    }
}

/// Classify an error response body. Plain-text bodies classify on the
/// raw text; JSON bodies classify on `error_code` plus the best message
/// field.
pub fn classify_body(body: &str) -> GuestError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => classify(
            parsed.error_code.as_deref(),
            parsed.text().unwrap_or(body),
        ),
        Err(_) => classify(None, body),
    }
}

impl From<reqwest::Error> for GuestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GuestError::ConnectionTimeout
        } else if err.is_connect() {
            GuestError::NetworkFailure
        } else {
            GuestError::Generic(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_beats_daily_limit() {
        // Overlapping wording classifies as the most restrictive condition.
        let err = classify(
            None,
            "Rate limit exceeded: daily limit for guest sessions reached",
        );
        assert_eq!(err, GuestError::RateLimitExceeded);
    }

    #[test]
    fn test_daily_limit_beats_credits() {
        let err = classify(None, "Daily limit hit, insufficient credits remain");
        assert_eq!(err, GuestError::DailyLimitExceeded);
    }

    #[test]
    fn test_screaming_snake_message_matches() {
        let err = classify(None, "INSUFFICIENT_CREDITS: upgrade to continue");
        assert_eq!(err, GuestError::InsufficientCredits);
    }

    #[test]
    fn test_error_code_checked_first() {
        // Code contradicts the text; the code wins.
        let err = classify(Some("INSUFFICIENT_CREDITS"), "rate limit exceeded");
        assert_eq!(err, GuestError::InsufficientCredits);
    }

    #[test]
    fn test_unknown_code_falls_back_to_text() {
        let err = classify(Some("BRAND_NEW_CODE"), "daily limit reached");
        assert_eq!(err, GuestError::DailyLimitExceeded);
    }

    #[test]
    fn test_unmatched_message_passes_through() {
        let err = classify(None, "the parser choked on page 3");
        assert_eq!(err, GuestError::Generic("the parser choked on page 3".to_string()));
    }

    #[test]
    fn test_classify_json_body() {
        let body = r#"{"error_code": "DAILY_LIMIT_EXCEEDED", "error": "limit hit"}"#;
        assert_eq!(classify_body(body), GuestError::DailyLimitExceeded);
    }

    #[test]
    fn test_classify_plain_text_body() {
        assert_eq!(
            classify_body("rate limit exceeded for this address"),
            GuestError::RateLimitExceeded
        );
    }
}
