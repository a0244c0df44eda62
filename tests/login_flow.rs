use axum::{http::StatusCode, routing::post, Json, Router};
use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::VerifyingKey;
use secrecy::SecretString;
use serde_json::json;
use tokio::net::TcpListener;
use zkportal::zklogin::{
    chain::{zk_address, zk_nonce, ChainClient},
    prover::request_proof,
    session::load_session,
    Error, Flow, FlowConfig, MemoryStore,
};

struct FakeChain {
    epoch: u64,
}

impl ChainClient for FakeChain {
    async fn current_epoch(&self) -> Result<u64, Error> {
        Ok(self.epoch)
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

fn make_jwt(email: Option<&str>, sub: &str) -> String {
    let header = json!({"alg": "RS256", "typ": "JWT", "kid": "test"});
    let mut payload = json!({
        "iss": "https://accounts.google.com",
        "aud": "client123",
        "sub": sub,
    });
    if let Some(email) = email {
        payload["email"] = json!(email);
    }

    format!(
        "{}.{}.{}",
        Base64UrlUnpadded::encode_string(header.to_string().as_bytes()),
        Base64UrlUnpadded::encode_string(payload.to_string().as_bytes()),
        Base64UrlUnpadded::encode_string(b"signature")
    )
}

async fn spawn_prover(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("mock prover must serve");
    });

    format!("http://{addr}/v1")
}

fn flow_with_prover(epoch: u64, prover_url: String) -> Flow<FakeChain, MemoryStore> {
    let mut config = FlowConfig::new("client123", "https://app.test");
    config.prover_url = prover_url;
    Flow::new(config, FakeChain { epoch }, MemoryStore::default())
}

#[tokio::test]
async fn full_login_persists_session_and_builds_the_auth_url() {
    let flow = flow_with_prover(100, "http://unused.test/v1".to_string());

    let url = flow.begin_login().await.expect("begin_login must succeed");

    assert!(url
        .as_str()
        .starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(url.as_str().contains(
        "client_id=client123&redirect_uri=https%3A%2F%2Fapp.test&response_type=id_token&scope=openid+email+profile&nonce="
    ));

    let session = load_session(flow.store())
        .expect("store must be readable")
        .expect("session must be persisted before the URL is handed out");

    assert_eq!(session.max_epoch, 102);
    session
        .randomness
        .parse::<u128>()
        .expect("randomness must be a decimal string");
    session
        .signing_key()
        .expect("secret key must decode to 32 bytes");
}

#[tokio::test]
async fn successful_prover_round_trip_yields_a_signing_credential() {
    let prover = Router::new().route(
        "/v1",
        post(|| async {
            Json(json!({
                "proofPoints": {
                    "a": ["1", "2", "3"],
                    "b": [["4", "5"], ["6", "7"], ["8", "9"]],
                    "c": ["10", "11", "12"],
                },
                "issBase64Details": {"value": "aXNz", "indexMod4": 2},
                "headerBase64": "eyJhbGciOiJSUzI1NiJ9",
            }))
        }),
    );
    let prover_url = spawn_prover(prover).await;

    let flow = flow_with_prover(100, prover_url);
    flow.begin_login().await.expect("begin_login must succeed");

    let token = SecretString::from(make_jwt(Some("student@example.com"), "sub-1"));
    let login = flow
        .complete_login(&token)
        .await
        .expect("complete_login must succeed");

    assert!(login.resolved.address.starts_with("0x"));
    assert!(login.proof_error.is_none());
    let proof = login.proof.expect("proof must be issued");
    assert_eq!(proof.iss_base64_details.index_mod4, 2);
}

#[tokio::test]
async fn prover_failure_does_not_block_the_address() {
    let prover = Router::new().route(
        "/v1",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "prover exploded") }),
    );
    let prover_url = spawn_prover(prover).await;

    let flow = flow_with_prover(7, prover_url);
    flow.begin_login().await.expect("begin_login must succeed");

    let token = SecretString::from(make_jwt(Some("student@example.com"), "sub-1"));

    // the address resolves with or without the prover
    let resolved = flow.resolve(&token).expect("resolve must succeed");
    assert!(resolved.address.starts_with("0x"));

    // the direct proof request surfaces the status and body
    let session = load_session(flow.store())
        .expect("store must be readable")
        .expect("session must be present");
    let err = request_proof(&flow.config().prover_url, &token, &resolved.salt, &session)
        .await
        .expect_err("prover must reject");
    match err {
        Error::Proof { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "prover exploded");
        }
        other => panic!("expected a proof error, got {other:?}"),
    }

    // the full flow downgrades the failure and keeps the address
    let login = flow
        .complete_login(&token)
        .await
        .expect("complete_login must downgrade proof failures");
    assert_eq!(login.resolved.address, resolved.address);
    assert!(login.proof.is_none());
    assert!(matches!(
        login.proof_error,
        Some(Error::Proof { status: 500, .. })
    ));
}

#[tokio::test]
async fn resolution_is_idempotent_and_identity_sensitive() {
    let flow = flow_with_prover(1, "http://unused.test/v1".to_string());

    let token = SecretString::from(make_jwt(Some("x@example.com"), "sub-1"));
    let first = flow.resolve(&token).expect("resolve must succeed");
    let second = flow.resolve(&token).expect("resolve must succeed");
    assert_eq!(first.address, second.address);

    let other = SecretString::from(make_jwt(Some("y@example.com"), "sub-1"));
    let third = flow.resolve(&other).expect("resolve must succeed");
    assert_ne!(first.salt, third.salt);
    assert_ne!(first.address, third.address);
}

#[tokio::test]
async fn completing_in_a_fresh_context_requires_a_retry() {
    // redirect came back, but the session lives in another browser context
    let flow = flow_with_prover(1, "http://unused.test/v1".to_string());

    let token = SecretString::from(make_jwt(None, "sub-1"));
    let result = flow.complete_login(&token).await;

    assert!(matches!(result, Err(Error::SessionMissing)));
}
