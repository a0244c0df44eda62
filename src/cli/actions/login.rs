use crate::cli::actions::Action;
use crate::zklogin::{self, FileStore, Flow, FlowConfig, JsonRpc};
use anyhow::Result;
use tracing::info;

/// Handle the login action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Login {
            client_id,
            port,
            redirect_url,
            rpc_url,
            prover_url,
            session_dir,
        } => {
            let redirect_url =
                redirect_url.unwrap_or_else(|| format!("http://localhost:{port}/callback"));

            let session_dir =
                session_dir.unwrap_or_else(|| std::env::temp_dir().join("zkportal"));

            let mut config = FlowConfig::new(client_id, redirect_url);
            config.prover_url = prover_url;

            let chain = JsonRpc::new(rpc_url)?;
            let store = FileStore::new(session_dir);
            let flow = Flow::new(config, chain, store);

            // The session record is persisted before the URL is handed out,
            // so the process could even exit here and a later callback-only
            // invocation would still be able to finish the login.
            let url = flow.begin_login().await?;

            info!("authorization URL ready, waiting for the provider redirect");

            println!("Open the following URL in your browser to sign in:\n");
            println!("{url}\n");
            println!("Waiting for the identity provider to redirect back to http://localhost:{port}/callback ...");

            zklogin::serve(port, flow).await?;
        }
    }

    Ok(())
}
