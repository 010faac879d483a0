use clap::{Parser, Subcommand};
use ipmeta::lens::ip::IpLookupArgs;
use ipmeta::lens::utils::OutputFormat;
use ipmeta::IpmetaConfig;
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.ipmeta/ipmeta.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table (default), markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate IP addresses (or hostnames with --resolve) with ASN and location, grouped by ASN.
    Lookup(IpLookupArgs),

    /// Show the effective configuration and database locations.
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match IpmetaConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Lookup(args) => commands::lookup::run(&config, args, cli.format),
        Commands::Config(args) => {
            commands::config::run(&config, cli.config.as_deref(), args, cli.format)
        }
    }
}
