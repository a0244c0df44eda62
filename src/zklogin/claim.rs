//! Structural decode of the identity token returned by the provider.
//!
//! The token's signature and audience are NOT verified here: in this
//! protocol the claim is never trusted for authorization locally, it is only
//! folded into the deterministic salt/address derivations, and the prover and
//! the chain verify the token on their side. Do not reuse this decoder as an
//! authentication check.

use crate::zklogin::error::Error;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

/// Decoded payload of an externally issued identity token.
///
/// All fields are optional: the provider decides what it puts in the token,
/// and the fallback policy for missing identity fields lives in
/// [`crate::zklogin::salt::derive_salt`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaim {
    #[serde(rename = "sub", skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "picture", skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(rename = "iss", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(rename = "aud", skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,
}

/// `aud` may be a single value or a list, depending on provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl IdentityClaim {
    /// Decode the payload of a `header.payload.signature` token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the token does not have exactly three
    /// segments, the payload is not valid base64url, or the payload is not a
    /// JSON object. Malformed tokens are a recoverable condition, they occur
    /// during passive page-load processing.
    pub fn decode(token: &str) -> Result<Self, Error> {
        let mut parts = token.split('.');
        let header = parts.next().unwrap_or_default();
        let payload = parts
            .next()
            .ok_or_else(|| Error::Decode("missing payload segment".to_string()))?;
        let _signature = parts
            .next()
            .ok_or_else(|| Error::Decode("missing signature segment".to_string()))?;

        if header.is_empty() {
            return Err(Error::Decode("missing header segment".to_string()));
        }

        if parts.next().is_some() {
            return Err(Error::Decode("too many segments".to_string()));
        }

        let bytes = Base64UrlUnpadded::decode_vec(payload)
            .map_err(|_| Error::Decode("payload is not valid base64url".to_string()))?;

        serde_json::from_slice(&bytes)
            .map_err(|err| Error::Decode(format!("payload is not a claim object: {err}")))
    }
}
