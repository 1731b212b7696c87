//! Authentication gates: HMAC request signing and the login cookie.
//!
//! # Signature scheme
//!
//! Signature-authenticated requests carry three headers:
//!
//! | Header | Content |
//! |--------|---------|
//! | `X-Client-ID` | configured client id |
//! | `X-Timestamp` | unix seconds, within the tolerance window |
//! | `X-Signature` | hex HMAC-SHA256 over the canonical payload |
//!
//! The signed payload is
//! `METHOD\nPATH\nQUERY\nBODY\nTIMESTAMP\nCLIENT_ID`, with the body
//! canonicalized as sorted-key compact JSON. Verification is
//! constant-time; the expected signature never leaves the debug log.
//!
//! # Login cookie
//!
//! `username|expiry|sig` where `sig` is the hex HMAC-SHA256 of
//! `username|expiry` under the server secret key.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::ApiSettings;

use super::{ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Name of the login session cookie.
pub const SESSION_COOKIE: &str = "gateway_session";

/// Signed bodies are canonical JSON and never legitimately large.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Why a request was turned away at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// One or more signature headers missing.
    MissingCredentials,
    /// No valid login cookie on a login-only route.
    NotLoggedIn,
    /// Neither a login cookie nor signature headers.
    NotAuthenticated,
    /// Timestamp header was not an integer.
    BadTimestamp,
    /// Timestamp outside the tolerance window.
    TimestampExpired,
    /// Client id not configured.
    UnknownClient,
    /// Signature did not verify.
    BadSignature,
}

impl AuthRejection {
    /// Caller-facing message; deliberately generic.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing signature headers",
            Self::NotLoggedIn => "not logged in",
            Self::NotAuthenticated => "not logged in and missing signature headers",
            Self::BadTimestamp => "invalid timestamp format",
            Self::TimestampExpired => "request timestamp expired",
            Self::UnknownClient => "unknown client id",
            Self::BadSignature => "signature verification failed",
        }
    }
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        Self::unauthorized(rejection.message())
    }
}

/// Canonical form of a JSON body: compact, object keys sorted.
///
/// Non-JSON or empty bodies canonicalize to the empty string.
#[must_use]
pub fn canonical_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) if !value.is_null() => {
            let mut out = String::new();
            write_canonical(&value, &mut out);
            out
        }
        _ => String::new(),
    }
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Hex HMAC-SHA256 signature over the canonical request payload.
#[must_use]
pub fn compute_signature(
    secret: &str,
    method: &str,
    path: &str,
    query: &str,
    canonical_body: &str,
    timestamp: &str,
    client_id: &str,
) -> String {
    let payload =
        format!("{method}\n{path}\n{query}\n{canonical_body}\n{timestamp}\n{client_id}");
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check the signature headers of a request against its raw body.
///
/// Pure over `now` so the tolerance window is testable with a pinned
/// clock.
pub fn check_signature(
    api: &ApiSettings,
    parts: &Parts,
    body: &[u8],
    now: i64,
) -> Result<(), AuthRejection> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    };
    let (Some(client_id), Some(timestamp), Some(signature)) = (
        header("x-client-id"),
        header("x-timestamp"),
        header("x-signature"),
    ) else {
        tracing::warn!("request missing signature headers");
        return Err(AuthRejection::MissingCredentials);
    };

    let request_time: i64 = timestamp
        .parse()
        .map_err(|_| AuthRejection::BadTimestamp)?;
    if (now - request_time).abs() > api.signature_timeout_secs {
        tracing::warn!(timestamp, "request timestamp outside tolerance window");
        return Err(AuthRejection::TimestampExpired);
    }

    if !api.is_valid_client(client_id) {
        tracing::warn!(client_id, "unknown signing client");
        return Err(AuthRejection::UnknownClient);
    }
    let secret = api.client_secret(client_id).unwrap_or_default();

    let path = parts.uri.path();
    let query = parts.uri.query().unwrap_or_default();
    let canonical = canonical_body(body);
    let payload = format!(
        "{}\n{path}\n{query}\n{canonical}\n{timestamp}\n{client_id}",
        parts.method.as_str()
    );

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Err(AuthRejection::BadSignature);
    };
    mac.update(payload.as_bytes());
    let expected_mac = mac.clone();

    let verified = hex::decode(signature)
        .ok()
        .is_some_and(|sig| mac.verify_slice(&sig).is_ok());
    if !verified {
        tracing::warn!(client_id, path, "signature verification failed");
        // Diagnostic detail stays out of the response.
        tracing::debug!(
            expected = %hex::encode(expected_mac.finalize().into_bytes()),
            payload = %payload,
            "signature mismatch detail"
        );
        return Err(AuthRejection::BadSignature);
    }

    tracing::debug!(client_id, path, "signature accepted");
    Ok(())
}

/// Build a login cookie value expiring at `expires_at` (unix seconds).
#[must_use]
pub fn issue_session_cookie(secret_key: &str, username: &str, expires_at: i64) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret_key.as_bytes()) else {
        return String::new();
    };
    mac.update(format!("{username}|{expires_at}").as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());
    format!("{username}|{expires_at}|{sig}")
}

/// Verify a login cookie value; returns the username while valid.
#[must_use]
pub fn verify_session_cookie(secret_key: &str, value: &str, now: i64) -> Option<String> {
    if secret_key.is_empty() {
        return None;
    }
    let mut parts = value.splitn(3, '|');
    let username = parts.next()?;
    let expires_at: i64 = parts.next()?.parse().ok()?;
    let sig = parts.next()?;
    if expires_at < now {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).ok()?;
    mac.update(format!("{username}|{expires_at}").as_bytes());
    let sig_bytes = hex::decode(sig).ok()?;
    mac.verify_slice(&sig_bytes).ok()?;
    Some(username.to_string())
}

/// The session cookie value from a request's headers, if present.
#[must_use]
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn is_logged_in(state: &AppState, parts: &Parts, now: i64) -> bool {
    session_cookie(&parts.headers)
        .and_then(|value| {
            verify_session_cookie(&state.settings.auth.secret_key, &value, now)
        })
        .is_some()
}

/// Gate: valid signature required.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::bad_request("unreadable request body"))?;

    check_signature(&state.settings.api, &parts, &bytes, Utc::now().timestamp())?;

    Ok(next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await)
}

/// Gate: valid login cookie required.
pub async fn require_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    if !is_logged_in(&state, &parts, Utc::now().timestamp()) {
        return Err(AuthRejection::NotLoggedIn.into());
    }
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Gate: login cookie or valid signature.
pub async fn require_login_or_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let now = Utc::now().timestamp();
    if is_logged_in(&state, &parts, now) {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let has_headers = parts.headers.contains_key("x-client-id")
        || parts.headers.contains_key("x-signature");
    if !has_headers {
        return Err(AuthRejection::NotAuthenticated.into());
    }

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::bad_request("unreadable request body"))?;
    check_signature(&state.settings.api, &parts, &bytes, now)?;

    Ok(next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await)
}
