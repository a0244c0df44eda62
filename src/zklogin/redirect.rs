//! Outbound authorization URL and inbound return capture.
//!
//! The provider returns the credential appended to the redirect URL, as a
//! fragment (`#id_token=...`) in the primary integration and as a query
//! parameter in alternate configurations. Capture checks the fragment first
//! and always produces a scrubbed URL so the caller can rewrite history
//! without the token ever staying visible.

use crate::zklogin::error::Error;
use crate::zklogin::flow::FlowConfig;
use secrecy::SecretString;
use url::{form_urlencoded, Url};

/// Query parameter carrying the credential on the return URL.
const ID_TOKEN_PARAM: &str = "id_token";

/// Result of inspecting a page-load URL for a login return.
#[derive(Debug)]
pub enum CapturedReturn {
    /// A credential was present. `scrubbed` is the same URL with the
    /// credential stripped (fragment dropped, or `id_token` removed from the
    /// query); unrelated parameters are preserved.
    Token {
        id_token: SecretString,
        scrubbed: Url,
    },
    /// Not a login return. The input URL is left untouched.
    NotPresent,
}

/// Build the authorization URL for the identity provider.
///
/// Parameter names and values are the provider's wire contract, including
/// `response_type=id_token` and the space-separated scope.
///
/// # Errors
///
/// Returns [`Error::Config`] if the client id is empty and [`Error::Url`] if
/// the configured endpoint is not a valid URL.
pub fn auth_url(config: &FlowConfig, nonce: &str) -> Result<Url, Error> {
    if config.client_id.trim().is_empty() {
        return Err(Error::Config("client_id is not configured".to_string()));
    }

    let mut url = Url::parse(&config.auth_endpoint)?;

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("response_type", "id_token")
        .append_pair("scope", "openid email profile")
        .append_pair("nonce", nonce);

    Ok(url)
}

/// Look for a returned credential on `current_url`, fragment first, query as
/// fallback. Never fails: this runs on every page load.
#[must_use]
pub fn capture_return(current_url: &Url) -> CapturedReturn {
    if let Some(token) = fragment_token(current_url) {
        // drop the fragment AND any query-delivered copy of the credential:
        // the scrubbed URL must never carry a token on either path
        let mut scrubbed = without_query_token(current_url);
        scrubbed.set_fragment(None);

        return CapturedReturn::Token {
            id_token: SecretString::from(token),
            scrubbed,
        };
    }

    if let Some(token) = query_token(current_url) {
        return CapturedReturn::Token {
            id_token: SecretString::from(token),
            scrubbed: without_query_token(current_url),
        };
    }

    CapturedReturn::NotPresent
}

fn fragment_token(url: &Url) -> Option<String> {
    let fragment = url.fragment()?;

    form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == ID_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn query_token(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == ID_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn without_query_token(url: &Url) -> Url {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != ID_TOKEN_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut scrubbed = url.clone();
    scrubbed.set_query(None);

    if !remaining.is_empty() {
        scrubbed.query_pairs_mut().extend_pairs(remaining);
    }

    scrubbed
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn config() -> FlowConfig {
        FlowConfig::new("client123", "https://app.test")
    }

    #[test]
    fn auth_url_carries_the_fixed_parameters() -> Result<(), Error> {
        let url = auth_url(&config(), "nonce-value")?;

        assert!(url
            .as_str()
            .starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.as_str().contains(
            "client_id=client123&redirect_uri=https%3A%2F%2Fapp.test&response_type=id_token&scope=openid+email+profile&nonce=nonce-value"
        ));
        Ok(())
    }

    #[test]
    fn auth_url_rejects_malformed_endpoint() {
        let mut config = config();
        config.auth_endpoint = "not a url".to_string();

        let result = auth_url(&config, "nonce");
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn auth_url_rejects_missing_client_id() {
        let mut config = config();
        config.client_id = "  ".to_string();

        let result = auth_url(&config, "nonce");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn fragment_takes_precedence_over_query() {
        let url = Url::parse("https://app.test/?id_token=B#id_token=A&authuser=0")
            .expect("static url");

        match capture_return(&url) {
            CapturedReturn::Token { id_token, scrubbed } => {
                assert_eq!(id_token.expose_secret(), "A");
                // fragment dropped, and the query-delivered copy goes too
                assert!(!scrubbed.as_str().contains("id_token"));
                assert_eq!(scrubbed.as_str(), "https://app.test/");
            }
            CapturedReturn::NotPresent => panic!("token must be captured"),
        }
    }

    #[test]
    fn fragment_path_scrubs_the_query_but_keeps_unrelated_params() {
        let url = Url::parse("https://app.test/?id_token=B&authuser=0#id_token=A")
            .expect("static url");

        match capture_return(&url) {
            CapturedReturn::Token { id_token, scrubbed } => {
                assert_eq!(id_token.expose_secret(), "A");
                assert_eq!(scrubbed.as_str(), "https://app.test/?authuser=0");
            }
            CapturedReturn::NotPresent => panic!("token must be captured"),
        }
    }

    #[test]
    fn query_fallback_scrubs_only_the_token() {
        let url = Url::parse("https://app.test/?authuser=0&id_token=abc&prompt=none")
            .expect("static url");

        match capture_return(&url) {
            CapturedReturn::Token { id_token, scrubbed } => {
                assert_eq!(id_token.expose_secret(), "abc");
                assert_eq!(scrubbed.as_str(), "https://app.test/?authuser=0&prompt=none");
            }
            CapturedReturn::NotPresent => panic!("token must be captured"),
        }
    }

    #[test]
    fn query_fallback_with_token_only_clears_the_query() {
        let url = Url::parse("https://app.test/?id_token=abc").expect("static url");

        match capture_return(&url) {
            CapturedReturn::Token { scrubbed, .. } => {
                assert_eq!(scrubbed.as_str(), "https://app.test/");
            }
            CapturedReturn::NotPresent => panic!("token must be captured"),
        }
    }

    #[test]
    fn absence_is_not_present_and_does_not_mutate() {
        let url = Url::parse("https://app.test/?authuser=0#section").expect("static url");
        let before = url.clone();

        assert!(matches!(capture_return(&url), CapturedReturn::NotPresent));
        assert_eq!(url, before);
    }

    #[test]
    fn unrelated_fragment_params_are_not_a_token() {
        let url = Url::parse("https://app.test/#state=xyz&authuser=0").expect("static url");
        assert!(matches!(capture_return(&url), CapturedReturn::NotPresent));
    }
}
