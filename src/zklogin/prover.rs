//! Remote prover client: exchanges the identity token plus ephemeral key
//! material for a zero-knowledge signing credential.

use crate::zklogin::error::Error;
use crate::zklogin::session::EphemeralSession;
use crate::zklogin::APP_USER_AGENT;
use base64ct::{Base64, Encoding};
use ed25519_dalek::VerifyingKey;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Claim the prover binds the credential to.
pub const KEY_CLAIM_NAME: &str = "sub";

/// The prover call is the only unbounded network wait in the flow, cap it.
pub const PROVER_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequest<'a> {
    jwt: &'a str,
    extended_ephemeral_public_key: String,
    /// the prover wire format carries this as a decimal string
    max_epoch: String,
    jwt_randomness: &'a str,
    salt: &'a str,
    key_claim_name: &'a str,
}

/// Signing credential returned by the prover. Held in memory for the session
/// only, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProofCredential {
    pub proof_points: ProofPoints,
    pub iss_base64_details: ClaimDetails,
    pub header_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDetails {
    pub value: String,
    pub index_mod4: u8,
}

/// Scheme flag prepended to the ephemeral public key, standard base64.
#[must_use]
pub fn extended_ephemeral_public_key(public_key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(33);
    bytes.push(0x00); // ed25519 flag
    bytes.extend_from_slice(public_key.as_bytes());
    Base64::encode_string(&bytes)
}

/// POST the proof request. Non-2xx is an application-level error carrying the
/// HTTP status and body text; the caller's derived address remains valid
/// either way.
///
/// At-least-once semantics: the prover does not guarantee idempotence, a
/// retry simply issues a fresh credential.
///
/// # Errors
///
/// Returns [`Error::Proof`] for a non-2xx response, [`Error::Http`] for
/// transport failures (including the timeout), and [`Error::Storage`] if the
/// stored session material cannot be decoded.
#[instrument(skip_all)]
pub async fn request_proof(
    prover_url: &str,
    jwt: &SecretString,
    salt: &str,
    session: &EphemeralSession,
) -> Result<ProofCredential, Error> {
    let signing_key = session.signing_key()?;

    let body = ProofRequest {
        jwt: jwt.expose_secret(),
        extended_ephemeral_public_key: extended_ephemeral_public_key(&signing_key.verifying_key()),
        max_epoch: session.max_epoch.to_string(),
        jwt_randomness: &session.randomness,
        salt,
        key_claim_name: KEY_CLAIM_NAME,
    };

    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(PROVER_TIMEOUT)
        .build()?;

    let response = client.post(prover_url).json(&body).send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        return Err(Error::Proof { status, body });
    }

    debug!("proof issued");

    Ok(response.json().await?)
}
