//! Verification of `X-Slack-Signature` request signing.

use bootcamp_core::signing::{hmac_sha256_hex, verify_hmac_sha256_hex};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_VERSION: &str = "v0";

/// Requests signed further than this from the local clock are treated as replays.
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix timestamp")]
    InvalidTimestamp(String),
    #[error("request timestamp is {age_secs}s away from server time")]
    Stale { age_secs: i64 },
    #[error("signature does not match request body")]
    Mismatch,
}

#[derive(Clone)]
pub struct SlackRequestVerifier {
    signing_secret: Vec<u8>,
}

impl SlackRequestVerifier {
    pub fn new(signing_secret: impl AsRef<[u8]>) -> Self {
        Self { signing_secret: signing_secret.as_ref().to_vec() }
    }

    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;
        let age_secs = now_unix.saturating_sub(sent_at);
        if age_secs.abs() > MAX_REQUEST_AGE_SECS {
            return Err(SignatureError::Stale { age_secs });
        }

        let Some(provided) = signature.trim().strip_prefix("v0=") else {
            return Err(SignatureError::Mismatch);
        };

        if verify_hmac_sha256_hex(&self.signing_secret, &base_string(timestamp.trim(), body), provided)
        {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Produces the header value Slack would send for `body`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        format!(
            "{SIGNATURE_VERSION}={}",
            hmac_sha256_hex(&self.signing_secret, &base_string(timestamp, body))
        )
    }
}

fn base_string(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut base = Vec::with_capacity(body.len() + timestamp.len() + 4);
    base.extend_from_slice(SIGNATURE_VERSION.as_bytes());
    base.push(b':');
    base.extend_from_slice(timestamp.as_bytes());
    base.push(b':');
    base.extend_from_slice(body);
    base
}
