//! # Weir DNS
//!
//! Command line entry point for the filtering forwarder

mod bootstrap;
mod commands;
mod di;

use bootstrap::{init_logging, load_config, log_config_summary, ConfigOverrides};
use clap::{Parser, Subcommand};
use commands::{run_check, run_query, run_watch, QueryArgs};
use di::Services;
use tracing::info;
use weir_dns_domain::config::DEFAULT_GROUP;

#[derive(Parser)]
#[command(name = "weir")]
#[command(version)]
#[command(about = "Filtering DNS forwarder with pluggable rule stores")]
struct Cli {
    /// Configuration file (default: weir.toml, then /etc/weir/weir.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<String>,

    /// Data directory for sessions and downloaded lists
    #[arg(long, global = true)]
    home: Option<String>,

    /// Rule store backend (memory, hash64, hash32, bloom, radix, sqlite)
    #[arg(short = 's', long, global = true)]
    store: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the rule store and print rule counts per list
    Check,

    /// Evaluate a name against the rules, then resolve it
    Query {
        domain: String,

        /// Record type to ask for
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: String,

        /// Group whose lists are consulted
        #[arg(short = 'g', long, default_value = DEFAULT_GROUP)]
        group: String,

        /// Resolvers to try in order (default: "default")
        #[arg(short = 'r', long = "resolver")]
        resolvers: Vec<String>,
    },

    /// Run reload and cache jobs until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        home: cli.home,
        store: cli.store,
        log_level: cli.log_level,
    };
    let config = load_config(cli.config.as_deref(), overrides)?;
    init_logging(&config);
    log_config_summary(cli.config.as_deref(), &config);

    let services = Services::build(config).await?;

    let result = match cli.command {
        Command::Check => run_check(&services),
        Command::Query {
            domain,
            record_type,
            group,
            resolvers,
        } => {
            let args = QueryArgs {
                domain,
                record_type,
                group,
                resolvers,
            };
            match run_query(&services, args).await {
                Ok(outcome) => serde_json::to_string_pretty(&outcome)
                    .map(|json| println!("{json}"))
                    .map_err(anyhow::Error::from),
                Err(e) => Err(e),
            }
        }
        Command::Watch => run_watch(&services).await,
    };

    services.close().await;
    info!("Weir DNS stopped");
    result
}
