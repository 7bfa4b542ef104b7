//! # CLI Interface
//!
//! Defines the command-line argument structure for `foresight` using
//! `clap` derive. Every connection setting can also come from a
//! `FORESIGHT_*` environment variable.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use foresight_auth::config::{
    DEFAULT_AUTHORIZE_ENDPOINT, DEFAULT_EPOCH_MARGIN, DEFAULT_KEY_CLAIM_NAME,
    DEFAULT_LEDGER_RPC_URL, DEFAULT_PROVER_URL,
};

/// Foresight account tool.
///
/// Signs in with an OAuth provider via zkLogin, shows the resulting session,
/// and places bets or claims winnings with it. State lives in the data
/// directory between invocations, so `login` and `callback` can run in
/// separate processes.
#[derive(Parser, Debug)]
#[command(
    name = "foresight",
    about = "Foresight zkLogin account tool",
    version,
    propagate_version = true
)]
pub struct ForesightCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a login and print the provider URL to open.
    Login,
    /// Finish a login with the URL the provider redirected to.
    Callback(CallbackArgs),
    /// Re-issue the provider URL for the current pending login.
    Retry,
    /// Show the current session.
    Status(StatusArgs),
    /// Place a bet on a market outcome.
    Bet(BetArgs),
    /// Claim winnings from a resolved market.
    Claim(ClaimArgs),
    /// Transfer funds to another address.
    Transfer(TransferArgs),
    /// Clear the session and every pending login.
    Logout,
    /// Print version information and exit.
    Version,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding the session database.
    #[arg(long, short = 'd', env = "FORESIGHT_DATA_DIR", default_value = ".foresight")]
    pub data_dir: PathBuf,

    /// OAuth client id registered with the identity provider.
    #[arg(long, env = "FORESIGHT_CLIENT_ID", default_value = "")]
    pub client_id: String,

    #[arg(long, env = "FORESIGHT_AUTHORIZE_ENDPOINT", default_value = DEFAULT_AUTHORIZE_ENDPOINT)]
    pub authorize_endpoint: String,

    #[arg(
        long,
        env = "FORESIGHT_REDIRECT_URI",
        default_value = "http://localhost:5173/auth/callback"
    )]
    pub redirect_uri: String,

    #[arg(long, env = "FORESIGHT_PROVER_URL", default_value = DEFAULT_PROVER_URL)]
    pub prover_url: String,

    #[arg(long, env = "FORESIGHT_LEDGER_URL", default_value = DEFAULT_LEDGER_RPC_URL)]
    pub ledger_url: String,

    /// Hex-encoded 32-byte seed for locally derived salts.
    ///
    /// Rotating it moves every user to a new address.
    #[arg(long, env = "FORESIGHT_SALT_SEED")]
    pub salt_seed: Option<String>,

    /// Salt service endpoint. Takes precedence over `--salt-seed`.
    #[arg(long, env = "FORESIGHT_SALT_URL")]
    pub salt_url: Option<String>,

    /// How many epochs past the current one a new session stays valid.
    #[arg(long, env = "FORESIGHT_EPOCH_MARGIN", default_value_t = DEFAULT_EPOCH_MARGIN)]
    pub epoch_margin: u64,

    #[arg(long, env = "FORESIGHT_KEY_CLAIM", default_value = DEFAULT_KEY_CLAIM_NAME)]
    pub key_claim_name: String,

    #[arg(long, env = "FORESIGHT_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(long, env = "FORESIGHT_LOG_LEVEL", default_value = "foresight=info,foresight_auth=info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Args, Debug)]
pub struct CallbackArgs {
    /// The full redirect URL, or just its `#fragment`.
    pub url: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the session as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BetArgs {
    #[arg(long)]
    pub market: String,

    #[arg(long)]
    pub outcome: u8,

    /// Stake in base units.
    #[arg(long)]
    pub stake: u64,

    #[arg(long)]
    pub gas_budget: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[arg(long)]
    pub market: String,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    #[arg(long)]
    pub to: String,

    #[arg(long)]
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        ForesightCli::command().debug_assert();
    }

    #[test]
    fn parses_bet() {
        let cli = ForesightCli::try_parse_from([
            "foresight",
            "--client-id",
            "abc",
            "bet",
            "--market",
            "0xm",
            "--outcome",
            "1",
            "--stake",
            "250",
        ])
        .unwrap();
        assert_eq!(cli.global.client_id, "abc");
        match cli.command {
            Commands::Bet(args) => {
                assert_eq!(args.market, "0xm");
                assert_eq!(args.outcome, 1);
                assert_eq!(args.stake, 250);
                assert!(args.gas_budget.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn json_log_format() {
        let cli =
            ForesightCli::try_parse_from(["foresight", "--log-format", "json", "logout"]).unwrap();
        assert_eq!(cli.global.log_format, LogFormatArg::Json);
    }
}
