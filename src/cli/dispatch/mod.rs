use crate::cli::actions::Action;
use anyhow::Result;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Login {
        client_id: matches
            .get_one("client-id")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --client-id"))?,
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        redirect_url: matches
            .get_one("redirect-url")
            .map(|s: &String| s.to_string()),
        rpc_url: matches
            .get_one("rpc-url")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --rpc-url"))?,
        prover_url: matches
            .get_one("prover-url")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --prover-url"))?,
        session_dir: matches.get_one::<PathBuf>("session-dir").cloned(),
    })
}
