use std::sync::Arc;

use anyhow::Result;
use casagram::cli;
use clap::{Parser, Subcommand};
use casagram::config::CasagramConfig;
use casagram::models::PropertyDraft;
use casagram::platform::{AuthGateway, Platform, PropertyStore, SignupInput};
use casagram::store::Store;
use casagram::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Casagram property feed client")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive CLI for browsing and posting listings
    Cli,
    /// Populate the database with a demo account and a few listings
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();
    let config = CasagramConfig::from_env();
    let store = Store::open(&config.db_path)?;
    tracing::info!(db = %config.db_path.display(), "store ready");
    let platform: Arc<dyn Platform> = Arc::new(store);

    match args.command.unwrap_or(Command::Cli) {
        Command::Cli => cli::run_cli(config, platform).await,
        Command::Seed => seed(platform.as_ref()).await,
    }
}

async fn seed(platform: &dyn Platform) -> Result<()> {
    let session = platform
        .sign_up(&SignupInput {
            email: "demo@casagram.test".into(),
            password: "demo-password".into(),
            full_name: Some("Demo Seller".into()),
            username: Some("demo".into()),
        })
        .await?;
    let drafts = [
        ("Sunny two-bedroom flat", 235_000.0, false, "Lisbon"),
        ("Riverside studio", 1_200.0, true, "Porto"),
        ("Family house with garden", 410_000.0, false, "Braga"),
    ];
    for (title, price, is_for_rent, location) in drafts {
        let property = platform
            .insert_property(
                &session.user_id,
                &PropertyDraft {
                    title: title.into(),
                    price,
                    currency: "EUR".into(),
                    is_for_rent,
                    location: Some(location.into()),
                    ..PropertyDraft::default()
                },
            )
            .await?;
        tracing::info!(id = %property.id, title, "seeded listing");
    }
    println!("Seeded demo account demo@casagram.test (password: demo-password)");
    Ok(())
}
