//! Flow orchestration.
//!
//! `begin_login` and `complete_login` are two separate entry points on
//! purpose: in the browser rendition of this protocol a full-page redirect
//! sits between them and discards every in-memory value, so the only state
//! they may share is the persisted [`EphemeralSession`]. The CLI keeps the
//! same shape across its process/request boundary.

use crate::zklogin::chain::ChainClient;
use crate::zklogin::claim::IdentityClaim;
use crate::zklogin::error::Error;
use crate::zklogin::prover::{self, ProofCredential};
use crate::zklogin::redirect::{self, CapturedReturn};
use crate::zklogin::salt::derive_salt;
use crate::zklogin::session::{begin_session, load_session, EphemeralSession, SessionStore};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};
use url::Url;

/// Default authorization endpoint.
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default prover endpoint.
pub const PROVER_URL: &str = "https://prover-dev.mystenlabs.com/v1";

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub client_id: String,
    pub redirect_url: String,
    pub auth_endpoint: String,
    pub prover_url: String,
}

impl FlowConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_url: redirect_url.into(),
            auth_endpoint: AUTH_ENDPOINT.to_string(),
            prover_url: PROVER_URL.to_string(),
        }
    }
}

/// Address resolution outcome. Valid with or without a proof.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub address: String,
    pub salt: String,
    pub claim: IdentityClaim,
}

/// A completed login round-trip. `proof` is `None` when the prover could not
/// issue a credential; the address is still usable for read and display
/// purposes, only signing capability is missing.
#[derive(Debug)]
pub struct LoginSession {
    pub resolved: Resolved,
    pub session: EphemeralSession,
    pub proof: Option<ProofCredential>,
    pub proof_error: Option<Error>,
}

pub struct Flow<C, S> {
    config: FlowConfig,
    chain: C,
    store: S,
}

impl<C: ChainClient, S: SessionStore> Flow<C, S> {
    pub fn new(config: FlowConfig, chain: C, store: S) -> Self {
        Self {
            config,
            chain,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// First entry point: generate and persist the ephemeral session, then
    /// return the authorization URL to navigate to.
    ///
    /// The session record is written before this function returns; the
    /// caller may discard the process or browser context immediately after
    /// navigating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] before any network call if the client id is
    /// absent, [`Error::Rpc`] if the epoch cannot be fetched, and
    /// [`Error::Storage`] if the session record cannot be persisted.
    #[instrument(skip_all)]
    pub async fn begin_login(&self) -> Result<Url, Error> {
        if self.config.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is not configured".to_string()));
        }

        let current_epoch = self.chain.current_epoch().await?;

        // persist first: nothing in memory survives the redirect
        let session = begin_session(&self.store, current_epoch)?;

        let signing_key = session.signing_key()?;
        let nonce = self.chain.generate_nonce(
            &signing_key.verifying_key(),
            session.max_epoch,
            session.randomness_value()?,
        );

        debug!(max_epoch = session.max_epoch, "ephemeral session persisted");

        redirect::auth_url(&self.config, &nonce)
    }

    /// Inspect a page-load URL for a returned credential. Runs on every page
    /// load and never fails.
    #[must_use]
    pub fn capture_return(&self, current_url: &Url) -> CapturedReturn {
        redirect::capture_return(current_url)
    }

    /// Decode the claim and derive salt and address. Needs no session:
    /// resolution works even when proof-fetching is impossible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for a malformed token.
    pub fn resolve(&self, id_token: &SecretString) -> Result<Resolved, Error> {
        let claim = IdentityClaim::decode(id_token.expose_secret())?;
        let salt = derive_salt(&claim);
        let address = self.chain.derive_address(id_token.expose_secret(), &salt)?;

        Ok(Resolved {
            address,
            salt,
            claim,
        })
    }

    /// Second entry point: combine the returned credential with the
    /// persisted session, derive the address, and request the proof.
    ///
    /// Proof failures (prover non-2xx, transport errors) are downgraded: the
    /// login session is still returned with the valid address and the error
    /// preserved in `proof_error`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for a malformed token,
    /// [`Error::SessionMissing`] when no ephemeral session is persisted
    /// (redirect completed in a different context, or storage was cleared),
    /// and [`Error::Storage`] when the store itself fails.
    #[instrument(skip_all)]
    pub async fn complete_login(&self, id_token: &SecretString) -> Result<LoginSession, Error> {
        let resolved = self.resolve(id_token)?;

        let session = load_session(&self.store)?.ok_or(Error::SessionMissing)?;

        let (proof, proof_error) = match prover::request_proof(
            &self.config.prover_url,
            id_token,
            &resolved.salt,
            &session,
        )
        .await
        {
            Ok(proof) => (Some(proof), None),
            Err(err @ (Error::Proof { .. } | Error::Http(_))) => {
                warn!("proof request failed, address remains usable: {err}");
                (None, Some(err))
            }
            Err(err) => return Err(err),
        };

        Ok(LoginSession {
            resolved,
            session,
            proof,
            proof_error,
        })
    }
}
