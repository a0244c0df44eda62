use thiserror::Error;

/// Failure modes of the login flow.
///
/// `Config` and `Decode` are handled at the point of detection and turned
/// into user-facing status text. `Proof` is recoverable: the derived address
/// stays valid, only signing capability is lost until the request is retried.
/// `Storage` and `SessionMissing` are fatal to the current login attempt but
/// never to anything else.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing configuration: {0}")]
    Config(String),
    #[error("invalid identity token: {0}")]
    Decode(String),
    #[error("no ephemeral session found, please retry login")]
    SessionMissing,
    #[error("prover rejected request: {status} {body}")]
    Proof { status: u16, body: String },
    #[error("session storage failed: {0}")]
    Storage(String),
    #[error("chain rpc failed: {0}")]
    Rpc(String),
    #[error("http request failed")]
    Http(#[from] reqwest::Error),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("invalid url")]
    Url(#[from] url::ParseError),
}
