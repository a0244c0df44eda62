use crate::zklogin::handlers::{escape_html, AppState};
use crate::zklogin::{CapturedReturn, LoginSession};
use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Served when the callback is hit without a query token. The provider
/// delivers the credential in the URL fragment, which never reaches an HTTP
/// server, so this page reposts the fragment as the query string and the
/// second hit takes the query-fallback capture path.
const FORWARD_PAGE: &str = r"<!doctype html>
<html>
<head><title>zkportal</title></head>
<body>
<p>Completing sign-in&hellip;</p>
<script>
  var fragment = window.location.hash.substring(1);
  if (fragment) {
    window.location.replace(window.location.pathname + '?' + fragment);
  } else {
    document.body.innerHTML = '<p>No credential present on this URL.</p>';
  }
</script>
</body>
</html>";

// axum handler for the provider redirect
#[instrument(skip_all)]
pub async fn callback(State(state): State<Arc<AppState>>, uri: Uri) -> impl IntoResponse {
    // the Uri extractor carries origin-form path + query
    let current_url = match Url::parse(&format!("http://localhost{uri}")) {
        Ok(url) => url,
        Err(err) => {
            warn!("unparseable callback URL: {err}");
            return Html(status_page("The callback URL could not be parsed.")).into_response();
        }
    };

    match state.flow.capture_return(&current_url) {
        CapturedReturn::NotPresent => Html(FORWARD_PAGE).into_response(),
        CapturedReturn::Token { id_token, scrubbed } => {
            debug!("login return captured at {scrubbed}");

            let body = match state.flow.complete_login(&id_token).await {
                Ok(login) => result_page(&login),
                Err(err) => {
                    warn!("login not completed: {err}");
                    status_page(&err.to_string())
                }
            };

            state.request_shutdown();

            Html(body).into_response()
        }
    }
}

fn result_page(login: &LoginSession) -> String {
    let identity = login
        .resolved
        .claim
        .email
        .as_deref()
        .or(login.resolved.claim.name.as_deref())
        .unwrap_or("anonymous");

    let proof_status = match (&login.proof, &login.proof_error) {
        (Some(_), _) => "Signing credential issued, this session can sign transactions.".to_string(),
        (None, Some(err)) => format!(
            "Your address was derived, but the proof request failed: {}. Signing is unavailable until it is retried.",
            escape_html(&err.to_string())
        ),
        (None, None) => "No proof was requested.".to_string(),
    };

    format!(
        r"<!doctype html>
<html>
<head><title>zkportal</title></head>
<body>
<h1>Signed in</h1>
<p>Welcome, {identity}.</p>
<p>Your address:</p>
<pre>{address}</pre>
<p>{proof_status}</p>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>",
        identity = escape_html(identity),
        address = escape_html(&login.resolved.address),
    )
}

fn status_page(message: &str) -> String {
    format!(
        r"<!doctype html>
<html>
<head><title>zkportal</title></head>
<body>
<h1>Sign-in not completed</h1>
<p>{}</p>
</body>
</html>",
        escape_html(message)
    )
}
