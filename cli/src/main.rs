// Copyright (c) 2026 Foresight Markets. MIT License.
// See LICENSE for details.

//! # Foresight CLI
//!
//! Entry point for the `foresight` binary. Parses CLI arguments, initializes
//! logging, wires the session manager to a sled database, the ledger's
//! JSON-RPC endpoint and the prover, then runs one subcommand.
//!
//! - `login`    — start a login and print the provider URL
//! - `callback` — finish it with the redirect URL
//! - `retry`    — re-issue the provider URL after a failed callback
//! - `status`   — show the current session
//! - `bet`, `claim`, `transfer` — sign and submit a transaction
//! - `logout`   — clear everything
//! - `version`  — print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;

use foresight_auth::config::{OAuthConfig, ZkLoginConfig};
use foresight_auth::identity::scrub_fragment;
use foresight_auth::ledger::{JsonRpcLedgerClient, TransactionResponse};
use foresight_auth::storage::SledStore;
use foresight_auth::transaction::{Transaction, TransactionBuilder};
use foresight_auth::zklogin::{
    DerivedSaltProvider, HttpProverClient, RemoteSaltProvider, SaltProvider,
};
use foresight_auth::{AuthError, AuthFacade, LoginOutcome, ZkLoginSession};

use cli::{Commands, ForesightCli, GlobalArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ForesightCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    logging::init_logging(&cli.global.log_level, cli.global.log_format.into());

    let result = run(cli).await;
    if let Err(err) = &result {
        if let Some(auth) = err.downcast_ref::<AuthError>() {
            if auth.is_expiry() {
                eprintln!("session expired; run `foresight login` to sign in again");
            } else if auth.is_recoverable() {
                eprintln!("temporary failure; `foresight retry` reuses the pending login");
            }
        }
    }
    result
}

async fn run(cli: ForesightCli) -> Result<()> {
    let facade = open_facade(&cli.global)?;
    let session = facade.zklogin();

    match cli.command {
        Commands::Login => {
            let redirect = session.begin_login().await?;
            tracing::info!(max_epoch = redirect.max_epoch, "open the URL below to sign in");
            println!("{}", redirect.url);
        }
        Commands::Callback(args) => {
            match session.complete_login(&args.url).await? {
                LoginOutcome::Authenticated(record) => {
                    println!("Signed in.");
                    println!("  Address    : {}", record.address);
                    println!("  Issuer     : {}", record.issuer);
                    println!("  Valid until: epoch {}", record.max_epoch);
                }
                LoginOutcome::AlreadyHandled => {
                    println!("Callback already processed; nothing to do.");
                }
            }
            tracing::debug!(url = %scrub_fragment(&args.url), "callback consumed");
        }
        Commands::Retry => {
            let redirect = session.restart_identity_exchange().await?;
            println!("{}", redirect.url);
        }
        Commands::Status(args) => print_status(&facade, args.json).await?,
        Commands::Bet(args) => {
            let mut builder = TransactionBuilder::place_bet(args.market, args.outcome, args.stake);
            if let Some(budget) = args.gas_budget {
                builder = builder.gas_budget(budget);
            }
            submit(&facade, builder.build()).await?;
        }
        Commands::Claim(args) => {
            submit(&facade, TransactionBuilder::claim_winnings(args.market).build()).await?;
        }
        Commands::Transfer(args) => {
            submit(&facade, TransactionBuilder::transfer(args.to, args.amount).build()).await?;
        }
        Commands::Logout => {
            let report = facade.logout().await?;
            tracing::info!(?report, "logout complete");
            println!("Signed out.");
        }
        Commands::Version => print_version(),
    }
    Ok(())
}

/// Build the session manager and facade from CLI settings.
fn open_facade(args: &GlobalArgs) -> Result<AuthFacade> {
    let config = ZkLoginConfig {
        oauth: OAuthConfig {
            authorize_endpoint: args.authorize_endpoint.clone(),
            client_id: args.client_id.clone(),
            redirect_uri: args.redirect_uri.clone(),
            ..OAuthConfig::default()
        },
        prover_url: args.prover_url.clone(),
        epoch_margin: args.epoch_margin,
        key_claim_name: args.key_claim_name.clone(),
    };

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;
    let db_path = args.data_dir.join("session.db");
    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open session database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "session database opened");

    let salt: Arc<dyn SaltProvider> = match (&args.salt_url, &args.salt_seed) {
        (Some(url), _) => Arc::new(RemoteSaltProvider::new(url.clone())),
        (None, Some(seed)) => Arc::new(
            DerivedSaltProvider::from_hex(seed).context("FORESIGHT_SALT_SEED is not valid")?,
        ),
        (None, None) => bail!("either --salt-url or --salt-seed is required"),
    };

    let session = ZkLoginSession::new(
        config,
        Arc::new(store),
        Arc::new(JsonRpcLedgerClient::new(args.ledger_url.clone())),
        salt,
        Arc::new(HttpProverClient::new(args.prover_url.clone())),
    )
    .context("invalid zkLogin configuration")?;

    Ok(AuthFacade::new(Arc::new(session)))
}

async fn print_status(facade: &AuthFacade, json: bool) -> Result<()> {
    let Some(status) = facade.zklogin().status().await? else {
        println!("Not signed in.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status.summary())?);
        return Ok(());
    }

    let record = &status.record;
    println!("Signed in.");
    println!("  Address      : {}", record.address);
    println!("  Issuer       : {}", record.issuer);
    if let Some(email) = &record.display.email {
        println!("  Email        : {email}");
    }
    println!("  Current epoch: {}", status.current_epoch);
    println!(
        "  Valid until  : epoch {} ({} remaining)",
        record.max_epoch, status.epochs_remaining
    );
    println!(
        "  Signed in at : {}",
        record.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
    );
    if status.is_near_expiry() {
        println!("  Session ends next epoch. Sign in again soon.");
    }
    Ok(())
}

async fn submit(facade: &AuthFacade, mut tx: Transaction) -> Result<TransactionResponse> {
    let kind = tx.kind.to_string();
    let response = facade.sign_and_submit(&mut tx).await?;
    tracing::info!(kind = %kind, digest = %response.digest, "transaction submitted");

    println!("Transaction {}: {}", response.digest, response.status);
    if let Some(error) = &response.error {
        println!("  Error: {error}");
    }
    Ok(response)
}

fn print_version() {
    println!("foresight {}", env!("CARGO_PKG_VERSION"));
    println!("rustc     {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
