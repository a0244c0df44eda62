pub mod health;
pub use self::health::health;

pub mod callback;
pub use self::callback::callback;

// common state for the handlers
use crate::zklogin::{FileStore, Flow, JsonRpc};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::error;

pub struct AppState {
    pub flow: Flow<JsonRpc, FileStore>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl AppState {
    pub fn new(flow: Flow<JsonRpc, FileStore>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            flow,
            shutdown: Mutex::new(Some(shutdown)),
        }
    }

    /// Stop the callback server once a return has been processed. Safe to
    /// call more than once, only the first call has an effect.
    pub fn request_shutdown(&self) {
        match self.shutdown.lock() {
            Ok(mut guard) => {
                if let Some(sender) = guard.take() {
                    let _ = sender.send(());
                }
            }
            Err(e) => {
                error!("shutdown lock poisoned: {:?}", e);
            }
        }
    }
}

/// Minimal HTML escaping for values echoed back in result pages.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
