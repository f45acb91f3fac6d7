//! Shared access signature tokens.
//!
//! The registry authenticates requests with a token signed by the policy's
//! shared key:
//!
//! ```text
//! SharedAccessSignature sr={resource}&sig={signature}&se={expiry}&skn={policy}
//! ```
//!
//! where `resource` is the url-encoded host name, `expiry` is seconds since the
//! Unix epoch, and `signature` is the url-encoded base64 HMAC-SHA256 of
//! `"{resource}\n{expiry}"`.

use super::ConnectionString;
use crate::error::{ValidationError, ValidationResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Issues shared access signature tokens for one registry credential.
#[derive(Clone)]
pub struct SasTokenProvider {
    credential: ConnectionString,
    ttl: Duration,
    mac: HmacSha256,
}

impl fmt::Debug for SasTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasTokenProvider")
            .field("credential", &self.credential)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SasTokenProvider {
    /// Create a provider issuing tokens valid for `ttl`.
    ///
    /// The signing key is prepared once here.
    pub fn new(credential: ConnectionString, ttl: Duration) -> ValidationResult<Self> {
        let mac = HmacSha256::new_from_slice(&credential.key_bytes())
            .map_err(|_| ValidationError::InvalidSharedAccessKey)?;
        Ok(Self {
            credential,
            ttl,
            mac,
        })
    }

    /// The credential tokens are signed with.
    pub fn credential(&self) -> &ConnectionString {
        &self.credential
    }

    /// A token expiring `ttl` from now.
    ///
    /// Lifetimes past the end of the representable calendar saturate.
    pub fn token(&self) -> String {
        let now = Utc::now();
        let expiry = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.token_at(expiry)
    }

    /// A token expiring at `expiry`.
    pub fn token_at(&self, expiry: DateTime<Utc>) -> String {
        let resource = url_encode(self.credential.host_name());
        let expiry = expiry.timestamp();
        let signature = url_encode(&self.sign(&format!("{}\n{}", resource, expiry)));

        format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            resource,
            signature,
            expiry,
            self.credential.policy_name()
        )
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
