use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("zkportal")
        .about("zkLogin identity and session flow")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("client-id")
                .short('c')
                .long("client-id")
                .help("OAuth client id used for the authorization request")
                .env("ZKPORTAL_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port for the local login callback server")
                .default_value("8080")
                .env("ZKPORTAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("redirect-url")
                .long("redirect-url")
                .help("Redirect URL registered with the identity provider, defaults to http://localhost:<port>/callback")
                .env("ZKPORTAL_REDIRECT_URL"),
        )
        .arg(
            Arg::new("rpc-url")
                .long("rpc-url")
                .help("Fullnode JSON-RPC URL used to fetch the current epoch")
                .default_value("https://fullnode.testnet.sui.io:443")
                .env("ZKPORTAL_RPC_URL"),
        )
        .arg(
            Arg::new("prover-url")
                .long("prover-url")
                .help("zk prover endpoint, exchanges the identity token for a signing credential")
                .default_value("https://prover-dev.mystenlabs.com/v1")
                .env("ZKPORTAL_PROVER_URL"),
        )
        .arg(
            Arg::new("session-dir")
                .long("session-dir")
                .help("Directory holding the ephemeral session record between the two login phases")
                .env("ZKPORTAL_SESSION_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ZKPORTAL_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
