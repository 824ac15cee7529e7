//! TuckBox CLI - order lunch from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Register
//! tuckbox sign-up -e ana@example.nz -p '...' --first-name Ana
//!
//! # Browse
//! tuckbox cities
//! tuckbox --email ana@example.nz --password '...' menu
//!
//! # Order
//! tuckbox --google add-address "12 Queen St"
//! tuckbox --google order --city akl --slot s1 --address <ID> --item f1=2
//!
//! # Review
//! tuckbox --google history
//! tuckbox --google current
//! ```
//!
//! # Commands
//!
//! - `sign-up` - Create an account and profile
//! - `cities`, `menu` - Reference data
//! - `add-address`, `order` - Place orders
//! - `history`, `current` - Past orders
//! - `profile`, `update-profile` - The stored profile
//!
//! Configuration comes from the environment (see `config.rs`); set
//! `RUST_LOG` to change log verbosity.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod agent;
mod commands;
mod config;
mod mirror;

use commands::account::{ProfileArgs, SignUpArgs};
use commands::ordering::{ItemArg, OrderArgs, parse_item};
use commands::{AuthArgs, Context};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "tuckbox")]
#[command(author, version, about = "TuckBox lunch ordering")]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and its profile
    SignUp {
        /// Account email
        #[arg(short = 'e', long)]
        new_email: String,

        /// Password, at least 6 characters
        #[arg(short = 'p', long)]
        new_password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        mobile: String,
    },
    /// List delivery cities
    Cities,
    /// Show cities, delivery times, food and saved addresses
    Menu,
    /// Save a delivery address
    AddAddress {
        /// The address as it should appear on the order
        text: String,
    },
    /// Place an order
    Order {
        /// City id or name
        #[arg(long)]
        city: Option<String>,

        /// Time slot id or label
        #[arg(long)]
        slot: Option<String>,

        /// Saved address id or text
        #[arg(long)]
        address: Option<String>,

        /// FOOD_ID=QTY or FOOD_ID=QTY:OPTION
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<ItemArg>,
    },
    /// List past orders, newest first
    History,
    /// Show the most recent order
    Current,
    /// Show the stored profile
    Profile,
    /// Change profile fields
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        mobile: Option<String>,

        /// Default delivery address text
        #[arg(long)]
        address: Option<String>,

        /// City id or name
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tuckbox=info,tuckbox_client=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::from_env()?;
    let mut ctx = Context::new(config)?;
    let auth = &cli.auth;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::SignUp {
            new_email,
            new_password,
            first_name,
            last_name,
            mobile,
        } => {
            let args = SignUpArgs {
                email: new_email,
                password: new_password,
                first_name,
                last_name,
                mobile,
            };
            commands::account::sign_up(&mut ctx, args, &mut out).await?;
        }
        Commands::Cities => commands::ordering::cities(&mut ctx, auth, &mut out).await?,
        Commands::Menu => commands::ordering::menu(&mut ctx, auth, &mut out).await?,
        Commands::AddAddress { text } => {
            commands::ordering::add_address(&mut ctx, auth, &text, &mut out).await?;
        }
        Commands::Order {
            city,
            slot,
            address,
            items,
        } => {
            let args = OrderArgs {
                city,
                slot,
                address,
                items,
            };
            commands::ordering::order(&mut ctx, auth, args, &mut out).await?;
        }
        Commands::History => commands::history::history(&mut ctx, auth, &mut out).await?,
        Commands::Current => commands::history::current(&mut ctx, auth, &mut out).await?,
        Commands::Profile => commands::account::show_profile(&mut ctx, auth, &mut out).await?,
        Commands::UpdateProfile {
            first_name,
            last_name,
            mobile,
            address,
            city,
        } => {
            let args = ProfileArgs {
                first_name,
                last_name,
                mobile,
                address,
                city,
            };
            commands::account::update_profile(&mut ctx, auth, args, &mut out).await?;
        }
    }

    ctx.sessions.sign_out();
    Ok(())
}
