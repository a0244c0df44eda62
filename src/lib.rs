//! zkLogin identity and session flow: deterministic address derivation from
//! an OAuth identity, ephemeral key lifecycle across the redirect boundary,
//! and proof issuance against a remote prover.

pub mod cli;
pub mod zklogin;
