//! Chain collaborator seam.
//!
//! The flow needs three things from the chain side: the current epoch, the
//! address derivation, and the nonce commitment. [`ChainClient`] is the seam
//! for all three, so a chain-SDK-backed client can replace the bundled
//! [`JsonRpc`] implementation without touching the flow.

use crate::zklogin::claim::IdentityClaim;
use crate::zklogin::error::Error;
use crate::zklogin::APP_USER_AGENT;
use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::VerifyingKey;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// External chain collaborator: one async query plus two pure functions.
pub trait ChainClient: Send + Sync {
    /// Current epoch of the chain, used to bound ephemeral key lifetime.
    fn current_epoch(&self) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Deterministic account address for `(token, salt)`. Pure: identical
    /// inputs always yield identical output.
    fn derive_address(&self, jwt: &str, salt: &str) -> Result<String, Error>;

    /// Nonce commitment binding the ephemeral key and validity window into
    /// the authorization request. Pure.
    fn generate_nonce(&self, public_key: &VerifyingKey, max_epoch: u64, randomness: u128)
        -> String;
}

/// Nonce length in characters, 20 bytes of digest as unpadded base64url.
pub const NONCE_LENGTH: usize = 27;

/// Address derivation over the claim's issuer, subject and the salt.
///
/// Hashing the claims rather than the raw token keeps the address stable
/// across token refreshes: `iat`/`exp` change on every login, `iss` and
/// `sub` do not.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the token payload cannot be decoded.
pub fn zk_address(jwt: &str, salt: &str) -> Result<String, Error> {
    let claim = IdentityClaim::decode(jwt)?;
    let issuer = claim.issuer.unwrap_or_default();
    let subject = claim.subject_id.unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(b"zklogin_address_v1");
    for part in [issuer.as_str(), "sub", subject.as_str(), salt] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }

    let digest = hasher.finalize();
    let mut address = String::with_capacity(2 + digest.len() * 2);
    address.push_str("0x");
    for byte in digest {
        let _ = write!(address, "{byte:02x}");
    }

    Ok(address)
}

/// Nonce commitment over the ephemeral public key, validity window and
/// randomness.
#[must_use]
pub fn zk_nonce(public_key: &VerifyingKey, max_epoch: u64, randomness: u128) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"zklogin_nonce_v1");
    hasher.update(public_key.as_bytes());
    hasher.update(max_epoch.to_be_bytes());
    hasher.update(randomness.to_be_bytes());

    let digest = hasher.finalize();
    Base64UrlUnpadded::encode_string(&digest[..20])
}

/// JSON-RPC backed chain client for a fullnode endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpc {
    url: String,
    client: Client,
}

impl JsonRpc {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl ChainClient for JsonRpc {
    async fn current_epoch(&self) -> Result<u64, Error> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "suix_getLatestSuiSystemState",
            "params": []
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(Error::Rpc(format!("{} - {status}, {body}", self.url)));
        }

        let body: Value = response.json().await?;

        // fullnodes serialize the epoch as a decimal string
        let epoch = body["result"]["epoch"]
            .as_str()
            .and_then(|epoch| epoch.parse::<u64>().ok())
            .or_else(|| body["result"]["epoch"].as_u64())
            .ok_or_else(|| Error::Rpc("no epoch in system state response".to_string()))?;

        debug!("current epoch: {epoch}");

        Ok(epoch)
    }

    fn derive_address(&self, jwt: &str, salt: &str) -> Result<String, Error> {
        zk_address(jwt, salt)
    }

    fn generate_nonce(
        &self,
        public_key: &VerifyingKey,
        max_epoch: u64,
        randomness: u128,
    ) -> String {
        zk_nonce(public_key, max_epoch, randomness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64UrlUnpadded, Encoding};
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    fn token(email: &str, sub: &str) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256"}"#);
        let payload = Base64UrlUnpadded::encode_string(
            json!({
                "iss": "https://accounts.google.com",
                "sub": sub,
                "email": email,
                "iat": 1_700_000_000,
            })
            .to_string()
            .as_bytes(),
        );
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn address_is_deterministic() -> Result<(), Error> {
        let jwt = token("student@example.com", "sub-1");
        assert_eq!(zk_address(&jwt, "12345")?, zk_address(&jwt, "12345")?);
        Ok(())
    }

    #[test]
    fn address_changes_with_salt() -> Result<(), Error> {
        let jwt = token("student@example.com", "sub-1");
        assert_ne!(zk_address(&jwt, "1")?, zk_address(&jwt, "2")?);
        Ok(())
    }

    #[test]
    fn address_is_stable_across_token_refresh() -> Result<(), Error> {
        // same identity, different iat
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256"}"#);
        let first = format!(
            "{header}.{}.sig",
            Base64UrlUnpadded::encode_string(
                json!({"iss": "https://accounts.google.com", "sub": "sub-1", "iat": 1}).to_string().as_bytes()
            )
        );
        let second = format!(
            "{header}.{}.sig",
            Base64UrlUnpadded::encode_string(
                json!({"iss": "https://accounts.google.com", "sub": "sub-1", "iat": 2}).to_string().as_bytes()
            )
        );

        assert_eq!(zk_address(&first, "9")?, zk_address(&second, "9")?);
        Ok(())
    }

    #[test]
    fn address_shape() -> Result<(), Error> {
        let jwt = token("student@example.com", "sub-1");
        let address = zk_address(&jwt, "12345")?;
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 66);
        Ok(())
    }

    #[test]
    fn nonce_is_deterministic_and_sized() {
        let key = SigningKey::from_bytes(&[7u8; 32]).verifying_key();

        let a = zk_nonce(&key, 102, 42);
        let b = zk_nonce(&key, 102, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), NONCE_LENGTH);

        // any input change moves the commitment
        assert_ne!(a, zk_nonce(&key, 103, 42));
        assert_ne!(a, zk_nonce(&key, 102, 43));
    }
}
