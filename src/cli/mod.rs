pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::cli::client::ApiClient;

#[derive(Parser)]
#[command(name = "battles")]
#[command(about = "Battles CLI - query the Battle Stats API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "BATTLE_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API server"
    )]
    pub server: String,

    #[arg(long, global = true, env = "BATTLE_API_TOKEN", help = "Access token for protected endpoints")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Request an access token for a user")]
    Token {
        #[arg(help = "User name")]
        uname: String,
    },

    #[command(about = "Total number of battles")]
    Count,

    #[command(about = "Distinct battle locations")]
    List,

    #[command(about = "Battles matching a king, location and/or type")]
    Search {
        #[arg(long, help = "Attacking or defending king")]
        king: Option<String>,
        #[arg(long, help = "Battle location")]
        location: Option<String>,
        #[arg(long = "type", help = "Battle type, e.g. siege")]
        battle_type: Option<String>,
    },

    #[command(about = "Aggregate statistics over all battles")]
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server, cli.token.clone())?;

    match cli.command {
        Commands::Token { uname } => commands::token::handle(&client, &uname, output_format).await,
        Commands::Count => commands::battles::count(&client, output_format).await,
        Commands::List => commands::battles::list(&client, output_format).await,
        Commands::Search { king, location, battle_type } => {
            let search = crate::filter::SearchFilter { king, location, battle_type };
            commands::battles::search(&client, &search, output_format).await
        }
        Commands::Stats => commands::battles::stats(&client, output_format).await,
    }
}
