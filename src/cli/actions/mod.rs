pub mod login;

use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Login {
        client_id: String,
        port: u16,
        redirect_url: Option<String>,
        rpc_url: String,
        prover_url: String,
        session_dir: Option<PathBuf>,
    },
}
