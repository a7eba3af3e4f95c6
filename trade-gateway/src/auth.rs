//! HMAC-SHA256 request signing.
//!
//! The signing string is
//! `METHOD\nPATH\nQUERY_STRING\nBODY\nTIMESTAMP\nCLIENT_ID`, where BODY is
//! the request JSON re-serialized compactly with object keys sorted at every
//! level (empty string for bodyless requests). Key ordering is part of the
//! wire contract shared with clients, not an implementation detail.

use std::collections::HashMap;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::{info, warn};
use sha2::Sha256;
use thiserror::Error;

use crate::error::ApiError;
use crate::params::ValidationError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const CLIENT_ID_HEADER: &str = "X-Client-ID";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Signature";

const MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing signature headers")]
    MissingHeaders,

    #[error("invalid timestamp format: {0}")]
    BadTimestamp(String),

    #[error("request timestamp outside allowed window ({age_secs}s old)")]
    StaleTimestamp { age_secs: i64 },

    #[error("unknown client id: {0}")]
    UnknownClient(String),

    #[error("signature is not valid hex")]
    MalformedSignature,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("signature computation failed: {0}")]
    Crypto(String),
}

/// Verifies request signatures against the configured client credentials.
/// Read-only after construction; shared across requests.
pub struct SignatureVerifier {
    clients: HashMap<String, String>,
    max_skew_secs: i64,
}

impl SignatureVerifier {
    pub fn new(clients: HashMap<String, String>, max_skew_secs: i64) -> Self {
        Self {
            clients,
            max_skew_secs,
        }
    }

    /// Compute the hex signature for a signing string. Also used by test
    /// clients; determinism here is what makes the scheme verifiable.
    pub fn sign(secret_key: &str, message: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| AuthError::Crypto(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn signing_string(
        method: &str,
        path: &str,
        query_string: &str,
        body: &str,
        timestamp: &str,
        client_id: &str,
    ) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, query_string, body, timestamp, client_id
        )
    }

    /// Verify one request. `now` is unix seconds, injected for testability.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        query_string: &str,
        body: &str,
        timestamp: &str,
        client_id: &str,
        signature: &str,
        now: i64,
    ) -> Result<(), AuthError> {
        let request_time: i64 = timestamp
            .parse()
            .map_err(|_| AuthError::BadTimestamp(timestamp.to_string()))?;
        let age_secs = now - request_time;
        if age_secs.abs() > self.max_skew_secs {
            return Err(AuthError::StaleTimestamp { age_secs });
        }

        let secret_key = self
            .clients
            .get(client_id)
            .ok_or_else(|| AuthError::UnknownClient(client_id.to_string()))?;

        let message =
            Self::signing_string(method, path, query_string, body, timestamp, client_id);
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| AuthError::Crypto(e.to_string()))?;
        mac.update(message.as_bytes());

        let provided = hex::decode(signature).map_err(|_| AuthError::MalformedSignature)?;
        // Constant-time comparison.
        mac.verify_slice(&provided)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

/// Canonical body for signing: compact JSON with sorted keys.
///
/// `serde_json`'s default map is ordered, so parsing and re-serializing
/// yields sorted keys at every nesting level.
pub fn canonical_body(raw: &[u8]) -> Result<String, ValidationError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
    serde_json::to_string(&value).map_err(|e| ValidationError::InvalidJson(e.to_string()))
}

/// Axum layer rejecting any request without a valid signature. Buffers the
/// body for canonicalization and reinjects it for the handler.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ValidationError::EmptyBody)?;

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingHeaders)
    };
    let client_id = header(CLIENT_ID_HEADER)?;
    let timestamp = header(TIMESTAMP_HEADER)?;
    let signature = header(SIGNATURE_HEADER)?;

    let body_string = canonical_body(&bytes)?;
    let verified = state.verifier.verify(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        &body_string,
        timestamp,
        client_id,
        signature,
        Utc::now().timestamp(),
    );
    if let Err(e) = verified {
        warn!(
            "signature rejected for {} {} (client {}): {}",
            parts.method,
            parts.uri.path(),
            client_id,
            e
        );
        return Err(e.into());
    }
    info!("signature verified for client {}", client_id);

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SignatureVerifier {
        let mut clients = HashMap::new();
        clients.insert("outer_client_001".to_string(), "secret_key_001".to_string());
        SignatureVerifier::new(clients, 300)
    }

    fn sign_request(
        secret: &str,
        method: &str,
        path: &str,
        body: &str,
        timestamp: &str,
        client_id: &str,
    ) -> String {
        let message =
            SignatureVerifier::signing_string(method, path, "", body, timestamp, client_id);
        SignatureVerifier::sign(secret, &message).unwrap()
    }

    #[test]
    fn signing_is_deterministic() {
        let a = sign_request("k", "POST", "/buy", "{\"a\":1}", "1700000000", "c");
        let b = sign_request("k", "POST", "/buy", "{\"a\":1}", "1700000000", "c");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn valid_signature_verifies() {
        let v = verifier();
        let body = r#"{"symbol":"000001","trade_price":10.5}"#;
        let ts = "1700000000";
        let sig = sign_request(
            "secret_key_001",
            "POST",
            "/trade",
            body,
            ts,
            "outer_client_001",
        );
        assert!(v
            .verify(
                "POST",
                "/trade",
                "",
                body,
                ts,
                "outer_client_001",
                &sig,
                1_700_000_010,
            )
            .is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let v = verifier();
        let body = r#"{"symbol":"000001"}"#;
        let ts = "1700000000";
        let sig = sign_request("wrong_key", "POST", "/trade", body, ts, "outer_client_001");
        assert!(matches!(
            v.verify(
                "POST",
                "/trade",
                "",
                body,
                ts,
                "outer_client_001",
                &sig,
                1_700_000_000,
            ),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn altered_body_is_rejected() {
        let v = verifier();
        let ts = "1700000000";
        let sig = sign_request(
            "secret_key_001",
            "POST",
            "/trade",
            r#"{"order_num":500}"#,
            ts,
            "outer_client_001",
        );
        assert!(matches!(
            v.verify(
                "POST",
                "/trade",
                "",
                r#"{"order_num":600}"#,
                ts,
                "outer_client_001",
                &sig,
                1_700_000_000,
            ),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn stale_timestamp_is_rejected_even_with_valid_signature() {
        let v = verifier();
        let ts = "1700000000";
        let sig = sign_request("secret_key_001", "GET", "/accounts", "", ts, "outer_client_001");
        let result = v.verify(
            "GET",
            "/accounts",
            "",
            "",
            ts,
            "outer_client_001",
            &sig,
            1_700_000_000 + 301,
        );
        assert!(matches!(result, Err(AuthError::StaleTimestamp { .. })));

        // Clocks ahead of the server are bounded too.
        let result = v.verify(
            "GET",
            "/accounts",
            "",
            "",
            ts,
            "outer_client_001",
            &sig,
            1_700_000_000 - 301,
        );
        assert!(matches!(result, Err(AuthError::StaleTimestamp { .. })));
    }

    #[test]
    fn unknown_client_is_rejected() {
        let v = verifier();
        assert!(matches!(
            v.verify("GET", "/accounts", "", "", "1700000000", "nobody", "00", 1_700_000_000),
            Err(AuthError::UnknownClient(_))
        ));
    }

    #[test]
    fn garbage_timestamp_and_signature_are_rejected() {
        let v = verifier();
        assert!(matches!(
            v.verify("GET", "/accounts", "", "", "soon", "outer_client_001", "00", 0),
            Err(AuthError::BadTimestamp(_))
        ));
        assert!(matches!(
            v.verify(
                "GET",
                "/accounts",
                "",
                "",
                "1700000000",
                "outer_client_001",
                "not-hex",
                1_700_000_000,
            ),
            Err(AuthError::MalformedSignature)
        ));
    }

    #[test]
    fn canonical_body_sorts_keys_recursively() {
        let raw = br#"{ "b": 1, "a": { "z": true, "m": [3, 2] } }"#;
        assert_eq!(
            canonical_body(raw).unwrap(),
            r#"{"a":{"m":[3,2],"z":true},"b":1}"#
        );
        assert_eq!(canonical_body(b"").unwrap(), "");
        assert!(canonical_body(b"{not json").is_err());
    }
}
