//! Command-line entry point.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use steamrs::{Config, Currency, GameOptions, SteamClient};

#[derive(Parser)]
#[command(name = "steamrs", version, about = "Steam web login, trading and confirmations")]
struct Cli {
    /// Config file path (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account name; overrides the config file.
    #[arg(long, global = true, env = "STEAMRS_USERNAME")]
    username: Option<String>,

    /// Guard secrets file path or inline JSON; overrides the config file.
    #[arg(long, global = true, env = "STEAMRS_GUARD")]
    guard: Option<String>,

    /// Web API key; overrides the config file.
    #[arg(long, global = true, env = "STEAMRS_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and verify the session is alive.
    Login,
    /// Approve the pending mobile confirmation for a trade offer.
    ConfirmTrade {
        /// The trade offer id to approve.
        trade_offer_id: String,
    },
    /// Approve the pending mobile confirmation for a market sell listing.
    ConfirmListing {
        /// The listed item's asset id.
        asset_id: String,
    },
    /// Fetch a price overview for an item (no login required).
    Price {
        /// App id of the game the item belongs to.
        #[arg(long, default_value = "730")]
        app_id: String,
        /// Inventory context id.
        #[arg(long, default_value = "2")]
        context_id: String,
        /// The item's market hash name.
        name: String,
    },
    /// List active trade offers.
    Offers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let username = cli.username.or(config.username);
    let guard = cli.guard.or(config.guard_file);
    let api_key = cli.api_key.or(config.api_key);

    let mut client = SteamClient::new(api_key)?;

    match cli.command {
        Command::Login => {
            login(&mut client, username, guard).await?;
            println!("session alive: {}", client.is_session_alive().await?);
        }
        Command::ConfirmTrade { trade_offer_id } => {
            login(&mut client, username, guard).await?;
            let outcome = client.confirm_trade_offer(&trade_offer_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::ConfirmListing { asset_id } => {
            login(&mut client, username, guard).await?;
            let outcome = client.confirm_sell_listing(&asset_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Price {
            app_id,
            context_id,
            name,
        } => {
            let game = GameOptions::new(app_id, context_id);
            let price = client.market().fetch_price(&name, &game, Currency::Usd).await?;
            println!("{}", serde_json::to_string_pretty(&price)?);
        }
        Command::Offers => {
            login(&mut client, username, guard).await?;
            let offers = client.get_trade_offers(true).await?;
            println!("{}", serde_json::to_string_pretty(&offers)?);
        }
    }
    Ok(())
}

async fn login(
    client: &mut SteamClient,
    username: Option<String>,
    guard: Option<String>,
) -> anyhow::Result<()> {
    let Some(username) = username else {
        bail!("no username given; pass --username or set it in the config file");
    };
    let Some(guard) = guard else {
        bail!("no guard secrets given; pass --guard or set guard_file in the config file");
    };
    let password = rpassword::prompt_password(format!("password for {username}: "))
        .context("could not read password")?;
    client.login(&username, &password, &guard).await?;
    Ok(())
}
